//! Role-specific provisioning options.
//!
//! Each node role contributes its own additions to the run request: extra or
//! replacement port mappings, an entrypoint override, and mandatory
//! environment variables. [`RoleSpec`] is a closed enum with one pure handler
//! per variant; a role is fixed for the lifetime of a creation request.

use crate::constants::{
    ADMIN_CREDENTIALS_ENV, ADMIN_CREDENTIALS_PATH, API_SERVER_PORT, LOAD_BALANCER_ENTRYPOINT,
    LOAD_BALANCER_STATS_PORT,
};
use crate::node::{NodeRole, PortMapping, Protocol};
use std::collections::HashMap;

/// Where the cluster API server is published on the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiServerAddress {
    /// Host address to listen on.
    pub listen_address: String,
    /// Host port. 0 delegates selection to the runtime; the chosen port is
    /// not stable across container restarts.
    pub port: u16,
}

impl ApiServerAddress {
    /// Creates an API server address.
    #[must_use]
    pub fn new(listen_address: impl Into<String>, port: u16) -> Self {
        Self {
            listen_address: listen_address.into(),
            port,
        }
    }

    /// The port mapping forwarding this address to the in-container API port.
    fn port_mapping(&self) -> PortMapping {
        PortMapping {
            container_port: API_SERVER_PORT,
            host_port: self.port,
            listen_address: Some(self.listen_address.clone()),
            protocol: Some(Protocol::Tcp),
        }
    }
}

/// Role-specific additions to a node's run request.
#[derive(Debug, Clone, Default)]
pub struct RoleOptions {
    /// Final port-mapping list for the node.
    pub port_mappings: Vec<PortMapping>,
    /// Entrypoint override, if the role needs one.
    pub entrypoint: Option<Vec<String>>,
    /// Environment variables the role requires.
    pub env: HashMap<String, String>,
}

/// Role-specific provisioning inputs.
///
/// One variant per node role, carrying only the inputs that role needs. A
/// role is fixed for the lifetime of a creation request; there are no
/// transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleSpec {
    /// Control-plane node: publish the API server at the given host address.
    ControlPlane {
        /// Host address the API server is published at.
        api_server: ApiServerAddress,
    },
    /// Worker node: no role-specific additions.
    Worker,
    /// External load balancer: forward the API and statistics ports only.
    ExternalLoadBalancer {
        /// Host address the balanced API endpoint is published at.
        api_server: ApiServerAddress,
    },
}

impl RoleSpec {
    /// The role this spec provisions.
    #[must_use]
    pub const fn role(&self) -> NodeRole {
        match self {
            Self::ControlPlane { .. } => NodeRole::ControlPlane,
            Self::Worker => NodeRole::Worker,
            Self::ExternalLoadBalancer { .. } => NodeRole::ExternalLoadBalancer,
        }
    }

    /// Computes the role-specific run-request additions.
    ///
    /// `port_mappings` is the caller-supplied list. The control plane appends
    /// its API server mapping to it and requires the administrative
    /// credentials variable. Workers pass the list through unchanged. The
    /// external load balancer discards the list entirely: it forwards exactly
    /// the API port at the caller's host address and the statistics port at a
    /// runtime-assigned host port, and overrides the entrypoint to run the
    /// load-balancing process in the foreground.
    #[must_use]
    pub fn options(&self, port_mappings: Vec<PortMapping>) -> RoleOptions {
        match self {
            Self::ControlPlane { api_server } => {
                let mut ports = port_mappings;
                ports.push(api_server.port_mapping());
                RoleOptions {
                    port_mappings: ports,
                    entrypoint: None,
                    env: HashMap::from([(
                        ADMIN_CREDENTIALS_ENV.to_string(),
                        ADMIN_CREDENTIALS_PATH.to_string(),
                    )]),
                }
            }
            Self::Worker => RoleOptions {
                port_mappings,
                entrypoint: None,
                env: HashMap::new(),
            },
            Self::ExternalLoadBalancer { api_server } => {
                let stats = PortMapping {
                    container_port: LOAD_BALANCER_STATS_PORT,
                    host_port: 0,
                    listen_address: Some(api_server.listen_address.clone()),
                    protocol: Some(Protocol::Tcp),
                };
                RoleOptions {
                    port_mappings: vec![api_server.port_mapping(), stats],
                    entrypoint: Some(
                        LOAD_BALANCER_ENTRYPOINT
                            .iter()
                            .map(|s| (*s).to_string())
                            .collect(),
                    ),
                    env: HashMap::new(),
                }
            }
        }
    }
}
