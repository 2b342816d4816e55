//! Node-level types: roles, mounts, port mappings, and the node handle.
//!
//! These are the caller-facing shapes of a node creation request. The
//! provisioner expands them into the runtime representations in
//! [`crate::runtime`]: user types carry host/container path names, runtime
//! types carry source/target names, matching what the runtime consumes.

use crate::constants::{
    CONTROL_PLANE_ROLE_VALUE, EXTERNAL_LOAD_BALANCER_ROLE_VALUE, WORKER_ROLE_VALUE,
};
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Node Role
// =============================================================================

/// Functional category of a cluster node.
///
/// A role is chosen once per creation request and never changes for the
/// lifetime of the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeRole {
    /// Runs the cluster API server and control-plane components.
    ControlPlane,
    /// Runs workloads scheduled by the control plane.
    Worker,
    /// Balances API traffic across control-plane nodes from outside the
    /// managed-node lifecycle.
    ExternalLoadBalancer,
}

impl NodeRole {
    /// Returns the label value recorded on containers with this role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ControlPlane => CONTROL_PLANE_ROLE_VALUE,
            Self::Worker => WORKER_ROLE_VALUE,
            Self::ExternalLoadBalancer => EXTERNAL_LOAD_BALANCER_ROLE_VALUE,
        }
    }
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Mounts and Ports
// =============================================================================

/// A host path bound into a node container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mount {
    /// Path on the host.
    pub host_path: String,
    /// Path inside the container.
    pub container_path: String,
    /// Mount read-only.
    #[serde(default)]
    pub read_only: bool,
}

/// Transport protocol for a port mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Protocol {
    /// TCP forwarding.
    Tcp,
    /// UDP forwarding.
    Udp,
    /// SCTP forwarding.
    Sctp,
}

/// A host port forwarded into a node container.
///
/// A `host_port` of 0 delegates host port selection to the runtime. The
/// chosen port is not stable across container restarts; callers that need a
/// stable address must supply a non-zero port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortMapping {
    /// Port inside the container.
    pub container_port: u16,
    /// Port on the host (0 = runtime-assigned).
    #[serde(default)]
    pub host_port: u16,
    /// Host address to listen on; absent means all addresses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listen_address: Option<String>,
    /// Transport protocol; absent resolves to TCP.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<Protocol>,
}

impl PortMapping {
    /// Creates a TCP mapping from a host port to a container port.
    #[must_use]
    pub const fn tcp(host_port: u16, container_port: u16) -> Self {
        Self {
            container_port,
            host_port,
            listen_address: None,
            protocol: Some(Protocol::Tcp),
        }
    }
}

impl fmt::Display for PortMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host_port, self.container_port)
    }
}

// =============================================================================
// Image Selection
// =============================================================================

/// Whether a node takes part in the managed-node lifecycle protocol.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeMode {
    /// The container is managed like a cluster node.
    #[default]
    Managed,
    /// The container runs as a plain passthrough, outside the managed-node
    /// protocol (the external load balancer).
    Unmanaged,
}

/// Container image for a node plus how the resulting container is managed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageMapping {
    /// Image to run.
    pub image: String,
    /// Mode flag signaled downstream.
    pub mode: NodeMode,
}

impl ImageMapping {
    /// An image provisioned as a managed cluster node.
    #[must_use]
    pub fn managed(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            mode: NodeMode::Managed,
        }
    }

    /// An image provisioned as an unmanaged passthrough container.
    #[must_use]
    pub fn unmanaged(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            mode: NodeMode::Unmanaged,
        }
    }
}

// =============================================================================
// IP Family
// =============================================================================

/// IP family selector for a node's container network.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IpFamily {
    /// IPv4 only.
    #[default]
    Ipv4,
    /// IPv6 only.
    Ipv6,
    /// Dual-stack IPv4 + IPv6.
    Dual,
}

impl fmt::Display for IpFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ipv4 => write!(f, "ipv4"),
            Self::Ipv6 => write!(f, "ipv6"),
            Self::Dual => write!(f, "dual"),
        }
    }
}

// =============================================================================
// Node Handle
// =============================================================================

/// Caller-visible handle to a provisioned node.
///
/// The only artifact that outlives a provisioning call. The provisioner
/// retains no reference to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Container name of the node; also its hostname.
    pub name: String,
    /// Image the node is running.
    pub image: String,
    /// Role the node was provisioned with.
    pub role: NodeRole,
}

impl Node {
    /// Creates a node handle.
    #[must_use]
    pub fn new(name: impl Into<String>, image: impl Into<String>, role: NodeRole) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            role,
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
