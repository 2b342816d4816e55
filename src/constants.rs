//! Provisioning constants.
//!
//! Fixed ports, paths, and label keys used when translating a node creation
//! request into a container run request. Everything here is a compile-time
//! constant: none of these values are reconfigured at runtime.

// =============================================================================
// Well-Known Ports
// =============================================================================

/// Port the cluster API server listens on inside a control-plane container.
///
/// Control-plane nodes get a host port mapping to this port, and the external
/// load balancer forwards its balanced endpoint to it.
pub const API_SERVER_PORT: u16 = 6443;

/// Port the load balancer serves its statistics endpoint on.
///
/// Always forwarded to a runtime-assigned host port. The stats endpoint is
/// diagnostic only and needs no stable host address.
pub const LOAD_BALANCER_STATS_PORT: u16 = 8404;

// =============================================================================
// Networking
// =============================================================================

/// Name of the container network every node is attached to.
pub const DEFAULT_NETWORK: &str = "noderun";

// =============================================================================
// Filesystem Layout
// =============================================================================

/// Host path of kernel modules, bind-mounted read-only into every node.
///
/// Node components read kernel module metadata and expect this path to exist
/// inside the container.
pub const MODULES_PATH: &str = "/lib/modules";

/// Container path backed by a dedicated runtime-managed volume.
///
/// Keeps persistent node state (pod data, logs) off the container's own
/// writable layer.
pub const NODE_STORAGE_PATH: &str = "/var";

/// Tmpfs mount for transient runtime state.
pub const TMP_TMPFS_PATH: &str = "/tmp";

/// Tmpfs mount for the service manager; it requires a writable /run.
pub const RUN_TMPFS_PATH: &str = "/run";

/// Environment variable naming the administrative credentials file.
pub const ADMIN_CREDENTIALS_ENV: &str = "KUBECONFIG";

/// Path of the administrative credentials file inside a control-plane node.
pub const ADMIN_CREDENTIALS_PATH: &str = "/etc/kubernetes/admin.conf";

/// Entrypoint that starts the load-balancing process in the foreground with
/// its fixed configuration path.
pub const LOAD_BALANCER_ENTRYPOINT: [&str; 5] =
    ["haproxy", "-W", "-db", "-f", "/usr/local/etc/haproxy/haproxy.cfg"];

// =============================================================================
// Container Labels
// =============================================================================

/// Label key recording which cluster a node container belongs to.
pub const CLUSTER_LABEL_KEY: &str = "io.noderun.cluster";

/// Label key recording the role of a node container.
pub const NODE_ROLE_LABEL_KEY: &str = "io.noderun.role";

/// Role label value for control-plane nodes.
pub const CONTROL_PLANE_ROLE_VALUE: &str = "control-plane";

/// Role label value for worker nodes.
pub const WORKER_ROLE_VALUE: &str = "worker";

/// Role label value for the external load balancer.
pub const EXTERNAL_LOAD_BALANCER_ROLE_VALUE: &str = "external-load-balancer";

// =============================================================================
// Name Validation
// =============================================================================

/// Valid characters for node and cluster names.
///
/// Excludes `/`, `.`, and whitespace so names are safe to use directly as
/// container names and hostnames.
pub const NODE_NAME_VALID_CHARS: &str =
    "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789-_";

/// Maximum node or cluster name length.
pub const MAX_NODE_NAME_LEN: usize = 128;

/// Validates a node or cluster name.
///
/// Names must be non-empty, at most [`MAX_NODE_NAME_LEN`] characters, and
/// drawn from [`NODE_NAME_VALID_CHARS`].
#[must_use = "validation result must be checked before using the name"]
pub fn validate_node_name(name: &str) -> std::result::Result<(), &'static str> {
    if name.is_empty() {
        return Err("name cannot be empty");
    }
    if name.len() > MAX_NODE_NAME_LEN {
        return Err("name exceeds maximum length");
    }
    if !name.chars().all(|c| NODE_NAME_VALID_CHARS.contains(c)) {
        return Err("name contains invalid characters");
    }
    Ok(())
}
