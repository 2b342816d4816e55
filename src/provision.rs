//! Node provisioning: translating node creation requests into container runs.
//!
//! [`NodeProvisioner`] assembles a complete [`RunRequest`] from a creation
//! request plus the role's options, delegates to the container runtime, and
//! wraps the result in a [`Node`] handle. Every call is synchronous and
//! self-contained: no cross-call state, no retry, no timeout policy.

use crate::constants::{
    CLUSTER_LABEL_KEY, DEFAULT_NETWORK, MODULES_PATH, NODE_ROLE_LABEL_KEY, NODE_STORAGE_PATH,
    RUN_TMPFS_PATH, TMP_TMPFS_PATH, validate_node_name,
};
use crate::error::{Error, Result};
use crate::node::{ImageMapping, IpFamily, Mount, Node, PortMapping, Protocol};
use crate::roles::{ApiServerAddress, RoleSpec};
use crate::runtime::{self, ContainerRuntime, RunRequest, RuntimeRegistry};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

// =============================================================================
// Builders
// =============================================================================

/// Resolves a protocol tag to the runtime's lowercase string.
///
/// Absent tags and anything not explicitly UDP or SCTP resolve to `"tcp"`.
/// Permissive by contract, not a validation step: callers relying on strict
/// protocol checking must pre-check.
#[must_use]
pub const fn runtime_protocol(protocol: Option<Protocol>) -> &'static str {
    match protocol {
        Some(Protocol::Udp) => "udp",
        Some(Protocol::Sctp) => "sctp",
        _ => "tcp",
    }
}

/// Expands user mount bindings into the runtime representation.
///
/// User mounts keep their order; the kernel modules mount is appended last,
/// read-only, regardless of input. No deduplication happens here: duplicate
/// bindings pass through unchanged and the runtime's own semantics govern
/// collisions.
#[must_use]
pub fn build_mounts(mounts: &[Mount]) -> Vec<runtime::Mount> {
    let mut result: Vec<runtime::Mount> = mounts
        .iter()
        .map(|mount| runtime::Mount {
            source: mount.host_path.clone(),
            target: mount.container_path.clone(),
            read_only: mount.read_only,
        })
        .collect();
    // Node components want to read kernel module metadata.
    result.push(runtime::Mount {
        source: MODULES_PATH.to_string(),
        target: MODULES_PATH.to_string(),
        read_only: true,
    });
    result
}

/// Expands user port mappings into the runtime representation.
///
/// Output has the same length and order as the input; each entry's protocol
/// is resolved via [`runtime_protocol`]. Role-specific entries are added
/// upstream by the role options, never here.
#[must_use]
pub fn build_port_mappings(mappings: &[PortMapping]) -> Vec<runtime::PortMapping> {
    mappings
        .iter()
        .map(|mapping| runtime::PortMapping {
            container_port: mapping.container_port,
            host_port: mapping.host_port,
            listen_address: mapping.listen_address.clone(),
            protocol: runtime_protocol(mapping.protocol).to_string(),
        })
        .collect()
}

// =============================================================================
// Node Provisioner
// =============================================================================

/// Common caller-supplied options for a node container.
#[derive(Debug, Clone, Default)]
pub struct NodeOptions {
    /// Host paths bound into the node.
    pub mounts: Vec<Mount>,
    /// Host ports forwarded into the node.
    pub port_mappings: Vec<PortMapping>,
    /// Extra labels for the node container.
    pub labels: HashMap<String, String>,
    /// IP family for the node's network.
    pub ip_family: IpFamily,
}

/// Options for one node creation, assembled per call and consumed whole.
struct NodeCreateOpts {
    name: String,
    cluster_name: String,
    role: RoleSpec,
    mounts: Vec<Mount>,
    port_mappings: Vec<PortMapping>,
    labels: HashMap<String, String>,
    ip_family: IpFamily,
    image: ImageMapping,
}

/// Provisions cluster nodes as containers.
///
/// Holds nothing but the runtime handle; concurrent creation calls are
/// independent of one another except where they compete for the runtime's
/// own limits and for host-level port allocation.
pub struct NodeProvisioner {
    runtime: Arc<dyn ContainerRuntime>,
}

impl NodeProvisioner {
    /// Creates a provisioner backed by the given container runtime.
    #[must_use]
    pub fn new(runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self { runtime }
    }

    /// Creates a provisioner backed by the registry's active runtime.
    ///
    /// # Errors
    ///
    /// [`Error::RuntimeUnavailable`] if no registered runtime is reachable.
    pub fn from_registry(registry: &RuntimeRegistry) -> Result<Self> {
        Ok(Self::new(registry.active()?))
    }

    /// Creates a control-plane node container.
    ///
    /// The API server is published at `listen_address:port` in addition to
    /// any caller-supplied port mappings. If `port` is 0 the runtime picks a
    /// host port, and the choice is not stable across container restarts;
    /// connections to the control plane may take time to recover when the
    /// underlying container restarts.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidNodeSpec`] on invariant violations,
    /// [`Error::NodeCreateFailed`] when the runtime fails to start the node.
    pub async fn create_control_plane_node(
        &self,
        name: &str,
        cluster_name: &str,
        listen_address: &str,
        port: u16,
        options: NodeOptions,
        image: ImageMapping,
    ) -> Result<Node> {
        self.create_node(NodeCreateOpts {
            name: name.to_string(),
            cluster_name: cluster_name.to_string(),
            role: RoleSpec::ControlPlane {
                api_server: ApiServerAddress::new(listen_address, port),
            },
            mounts: options.mounts,
            port_mappings: options.port_mappings,
            labels: options.labels,
            ip_family: options.ip_family,
            image,
        })
        .await
    }

    /// Creates a worker node container.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidNodeSpec`] on invariant violations,
    /// [`Error::NodeCreateFailed`] when the runtime fails to start the node.
    pub async fn create_worker_node(
        &self,
        name: &str,
        cluster_name: &str,
        options: NodeOptions,
        image: ImageMapping,
    ) -> Result<Node> {
        self.create_node(NodeCreateOpts {
            name: name.to_string(),
            cluster_name: cluster_name.to_string(),
            role: RoleSpec::Worker,
            mounts: options.mounts,
            port_mappings: options.port_mappings,
            labels: options.labels,
            ip_family: options.ip_family,
            image,
        })
        .await
    }

    /// Creates the external load balancer container for a cluster.
    ///
    /// The image runs unmanaged: the load balancer does not take part in the
    /// managed-node protocol the other roles do, and no caller mounts, port
    /// mappings, or labels apply. It forwards exactly the API port at
    /// `listen_address:port` and its statistics port at a runtime-assigned
    /// host port. If `port` is 0 the assigned port is not stable across
    /// container restarts, which can break addresses recorded against the
    /// balanced endpoint.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidNodeSpec`] on invariant violations,
    /// [`Error::NodeCreateFailed`] when the runtime fails to start the node.
    pub async fn create_external_load_balancer_node(
        &self,
        name: &str,
        image: &str,
        cluster_name: &str,
        listen_address: &str,
        port: u16,
        ip_family: IpFamily,
    ) -> Result<Node> {
        self.create_node(NodeCreateOpts {
            name: name.to_string(),
            cluster_name: cluster_name.to_string(),
            role: RoleSpec::ExternalLoadBalancer {
                api_server: ApiServerAddress::new(listen_address, port),
            },
            mounts: Vec::new(),
            port_mappings: Vec::new(),
            labels: HashMap::new(),
            ip_family,
            image: ImageMapping::unmanaged(image),
        })
        .await
    }

    async fn create_node(&self, opts: NodeCreateOpts) -> Result<Node> {
        validate_opts(&opts)?;

        let role = opts.role.role();

        // Mandatory labels go in after caller labels so they win collisions.
        let mut labels = opts.labels;
        labels.insert(CLUSTER_LABEL_KEY.to_string(), opts.cluster_name.clone());
        labels.insert(NODE_ROLE_LABEL_KEY.to_string(), role.as_str().to_string());

        let role_options = opts.role.options(opts.port_mappings);

        let request = RunRequest {
            // Hostname matches container name.
            name: opts.name.clone(),
            image: opts.image.image.clone(),
            labels,
            entrypoint: role_options.entrypoint,
            // Persistent node state lives on a dedicated volume, not on the
            // container's own filesystem.
            volumes: HashMap::from([(NODE_STORAGE_PATH.to_string(), String::new())]),
            mounts: build_mounts(&opts.mounts),
            port_mappings: build_port_mappings(&role_options.port_mappings),
            network: DEFAULT_NETWORK.to_string(),
            tmpfs: HashMap::from([
                (TMP_TMPFS_PATH.to_string(), String::new()),
                (RUN_TMPFS_PATH.to_string(), String::new()),
            ]),
            env: role_options.env,
            ip_family: opts.ip_family,
            mode: opts.image.mode,
        };

        debug!(node = %opts.name, role = %role, ?request, "assembled container run request");

        self.runtime
            .run_container(&request)
            .await
            .map_err(|err| Error::NodeCreateFailed {
                name: opts.name.clone(),
                role,
                reason: err.to_string(),
            })?;

        info!(node = %opts.name, role = %role, image = %opts.image.image, "node container started");

        Ok(Node::new(opts.name, opts.image.image, role))
    }
}

fn validate_opts(opts: &NodeCreateOpts) -> Result<()> {
    validate_node_name(&opts.name)
        .map_err(|reason| Error::InvalidNodeSpec(format!("node name: {reason}")))?;
    validate_node_name(&opts.cluster_name)
        .map_err(|reason| Error::InvalidNodeSpec(format!("cluster name: {reason}")))?;
    if opts.image.image.is_empty() {
        return Err(Error::InvalidNodeSpec("image cannot be empty".to_string()));
    }
    for mount in &opts.mounts {
        if mount.host_path.is_empty() || mount.container_path.is_empty() {
            return Err(Error::InvalidNodeSpec(
                "mount paths cannot be empty".to_string(),
            ));
        }
    }
    for mapping in &opts.port_mappings {
        if mapping.container_port == 0 {
            return Err(Error::InvalidNodeSpec(
                "container port cannot be 0".to_string(),
            ));
        }
    }
    Ok(())
}
