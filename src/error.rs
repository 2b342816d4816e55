//! Error types for the node provisioner.

use crate::node::NodeRole;

/// Result type alias for provisioning operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while provisioning cluster nodes.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No container runtime is reachable.
    #[error("no container runtime available: {0}")]
    RuntimeUnavailable(String),

    /// The runtime rejected or failed to start the requested container.
    ///
    /// Returned by [`ContainerRuntime`](crate::runtime::ContainerRuntime)
    /// implementations when the image cannot be run or a declared resource
    /// is invalid.
    #[error("container run failed for '{name}': {reason}")]
    RunFailed {
        /// Name of the container that failed to run.
        name: String,
        /// Reason reported by the runtime.
        reason: String,
    },

    /// A node container could not be started.
    ///
    /// Wraps the runtime's failure with the node's name and role. Nothing is
    /// retried and no partial handle is returned; cleanup of a partially
    /// started container belongs to the runtime.
    #[error("failed to create node '{name}' ({role}): {reason}")]
    NodeCreateFailed {
        /// Name of the node that failed to start.
        name: String,
        /// Role the node was being provisioned with.
        role: NodeRole,
        /// Underlying runtime failure.
        reason: String,
    },

    /// A creation request violated a data-model invariant.
    #[error("invalid node spec: {0}")]
    InvalidNodeSpec(String),
}
