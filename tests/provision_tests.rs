//! Integration tests for node provisioning.
//!
//! A recording runtime captures the run request each creation operation
//! assembles, so tests can assert on the exact container configuration:
//! mounts, port mappings, labels, entrypoint, environment, and mode.

use async_trait::async_trait;
use noderun::runtime::{ContainerRuntime, RunRequest};
use noderun::{
    ADMIN_CREDENTIALS_ENV, ADMIN_CREDENTIALS_PATH, API_SERVER_PORT, CLUSTER_LABEL_KEY,
    DEFAULT_NETWORK, Error, ImageMapping, IpFamily, LOAD_BALANCER_STATS_PORT, MODULES_PATH,
    Mount, NODE_ROLE_LABEL_KEY, NODE_STORAGE_PATH, NodeMode, NodeOptions, NodeProvisioner,
    NodeRole, PortMapping, RUN_TMPFS_PATH, TMP_TMPFS_PATH,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

// =============================================================================
// Test Helpers
// =============================================================================

/// Runtime that records run requests instead of starting containers.
#[derive(Default)]
struct RecordingRuntime {
    requests: Mutex<Vec<RunRequest>>,
}

impl RecordingRuntime {
    fn last_request(&self) -> RunRequest {
        self.requests
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no run request recorded")
    }

    fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ContainerRuntime for RecordingRuntime {
    fn name(&self) -> &str {
        "recording"
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn run_container(&self, request: &RunRequest) -> noderun::Result<()> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(())
    }
}

/// Runtime that rejects every run request.
struct FailingRuntime;

#[async_trait]
impl ContainerRuntime for FailingRuntime {
    fn name(&self) -> &str {
        "failing"
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn run_container(&self, request: &RunRequest) -> noderun::Result<()> {
        Err(Error::RunFailed {
            name: request.name.clone(),
            reason: "image not found".to_string(),
        })
    }
}

fn recording_provisioner() -> (NodeProvisioner, Arc<RecordingRuntime>) {
    let runtime = Arc::new(RecordingRuntime::default());
    (NodeProvisioner::new(runtime.clone()), runtime)
}

// =============================================================================
// Worker Nodes
// =============================================================================

#[tokio::test]
async fn test_worker_defaults() {
    let (provisioner, runtime) = recording_provisioner();

    let node = provisioner
        .create_worker_node("w1", "c1", NodeOptions::default(), ImageMapping::managed("node:v1"))
        .await
        .unwrap();

    assert_eq!(node.name, "w1");
    assert_eq!(node.image, "node:v1");
    assert_eq!(node.role, NodeRole::Worker);

    let request = runtime.last_request();
    assert_eq!(request.name, "w1");
    assert_eq!(request.image, "node:v1");

    // Only the fixed kernel modules mount.
    assert_eq!(request.mounts.len(), 1);
    assert_eq!(request.mounts[0].source, MODULES_PATH);
    assert_eq!(request.mounts[0].target, MODULES_PATH);
    assert!(request.mounts[0].read_only);

    assert!(request.port_mappings.is_empty());
    assert!(request.entrypoint.is_none());
    assert!(request.env.is_empty());
    assert_eq!(request.mode, NodeMode::Managed);
    assert_eq!(request.ip_family, IpFamily::Ipv4);
    assert_eq!(request.network, DEFAULT_NETWORK);

    let mut labels = HashMap::new();
    labels.insert(CLUSTER_LABEL_KEY.to_string(), "c1".to_string());
    labels.insert(NODE_ROLE_LABEL_KEY.to_string(), "worker".to_string());
    assert_eq!(request.labels, labels);
}

#[tokio::test]
async fn test_worker_base_plumbing() {
    let (provisioner, runtime) = recording_provisioner();

    provisioner
        .create_worker_node("w1", "c1", NodeOptions::default(), ImageMapping::managed("node:v1"))
        .await
        .unwrap();

    let request = runtime.last_request();

    // Runtime-managed volume for persistent node state.
    assert_eq!(request.volumes.get(NODE_STORAGE_PATH), Some(&String::new()));
    assert_eq!(request.volumes.len(), 1);

    // Both tmpfs mounts, always present.
    assert!(request.tmpfs.contains_key(TMP_TMPFS_PATH));
    assert!(request.tmpfs.contains_key(RUN_TMPFS_PATH));
    assert_eq!(request.tmpfs.len(), 2);
}

#[tokio::test]
async fn test_worker_keeps_caller_mounts_and_ports() {
    let (provisioner, runtime) = recording_provisioner();

    let options = NodeOptions {
        mounts: vec![Mount {
            host_path: "/data".to_string(),
            container_path: "/mnt/data".to_string(),
            read_only: false,
        }],
        port_mappings: vec![PortMapping::tcp(30080, 30080)],
        ..Default::default()
    };
    provisioner
        .create_worker_node("w1", "c1", options, ImageMapping::managed("node:v1"))
        .await
        .unwrap();

    let request = runtime.last_request();

    // Caller mounts first and in order, fixed mount last.
    assert_eq!(request.mounts.len(), 2);
    assert_eq!(request.mounts[0].source, "/data");
    assert_eq!(request.mounts.last().unwrap().source, MODULES_PATH);

    assert_eq!(request.port_mappings.len(), 1);
    assert_eq!(request.port_mappings[0].host_port, 30080);
    assert_eq!(request.port_mappings[0].protocol, "tcp");
}

// =============================================================================
// Control-Plane Nodes
// =============================================================================

#[tokio::test]
async fn test_control_plane_appends_api_server_mapping() {
    let (provisioner, runtime) = recording_provisioner();

    let options = NodeOptions {
        port_mappings: vec![PortMapping::tcp(30080, 30080)],
        ..Default::default()
    };
    let node = provisioner
        .create_control_plane_node("cp1", "c1", "0.0.0.0", 6443, options, ImageMapping::managed("node:v1"))
        .await
        .unwrap();

    assert_eq!(node.role, NodeRole::ControlPlane);

    let request = runtime.last_request();

    // Caller mappings preserved, API server mapping appended last.
    assert_eq!(request.port_mappings.len(), 2);
    assert_eq!(request.port_mappings[0].host_port, 30080);

    let api = request.port_mappings.last().unwrap();
    assert_eq!(api.container_port, API_SERVER_PORT);
    assert_eq!(api.host_port, 6443);
    assert_eq!(api.listen_address.as_deref(), Some("0.0.0.0"));
    assert_eq!(api.protocol, "tcp");

    assert_eq!(
        request.env.get(ADMIN_CREDENTIALS_ENV).map(String::as_str),
        Some(ADMIN_CREDENTIALS_PATH)
    );
    assert!(request.entrypoint.is_none());
    assert_eq!(
        request.labels.get(NODE_ROLE_LABEL_KEY).map(String::as_str),
        Some("control-plane")
    );
}

#[tokio::test]
async fn test_control_plane_host_port_zero_passes_through() {
    let (provisioner, runtime) = recording_provisioner();

    provisioner
        .create_control_plane_node(
            "cp1",
            "c1",
            "127.0.0.1",
            0,
            NodeOptions::default(),
            ImageMapping::managed("node:v1"),
        )
        .await
        .unwrap();

    // No synthetic port is invented; the runtime gets host port 0 as-is.
    let request = runtime.last_request();
    assert_eq!(request.port_mappings.len(), 1);
    assert_eq!(request.port_mappings[0].host_port, 0);
    assert_eq!(request.port_mappings[0].container_port, API_SERVER_PORT);
}

// =============================================================================
// External Load Balancer
// =============================================================================

#[tokio::test]
async fn test_load_balancer_forwards_api_and_stats_only() {
    let (provisioner, runtime) = recording_provisioner();

    let node = provisioner
        .create_external_load_balancer_node("lb1", "haproxy:2.9", "c1", "0.0.0.0", 6443, IpFamily::Ipv4)
        .await
        .unwrap();

    assert_eq!(node.name, "lb1");
    assert_eq!(node.image, "haproxy:2.9");
    assert_eq!(node.role, NodeRole::ExternalLoadBalancer);

    let request = runtime.last_request();
    assert_eq!(request.mode, NodeMode::Unmanaged);

    assert_eq!(request.port_mappings.len(), 2);
    assert_eq!(request.port_mappings[0].container_port, API_SERVER_PORT);
    assert_eq!(request.port_mappings[0].host_port, 6443);
    assert_eq!(request.port_mappings[0].protocol, "tcp");
    assert_eq!(request.port_mappings[1].container_port, LOAD_BALANCER_STATS_PORT);
    assert_eq!(request.port_mappings[1].host_port, 0);
    assert_eq!(request.port_mappings[1].protocol, "tcp");

    let entrypoint = request.entrypoint.expect("entrypoint override");
    assert_eq!(
        entrypoint,
        vec!["haproxy", "-W", "-db", "-f", "/usr/local/etc/haproxy/haproxy.cfg"]
    );

    // Still gets the fixed modules mount and the cluster/role labels.
    assert_eq!(request.mounts.len(), 1);
    assert_eq!(request.mounts[0].source, MODULES_PATH);
    assert_eq!(
        request.labels.get(NODE_ROLE_LABEL_KEY).map(String::as_str),
        Some("external-load-balancer")
    );
    assert_eq!(
        request.labels.get(CLUSTER_LABEL_KEY).map(String::as_str),
        Some("c1")
    );
    assert!(request.env.is_empty());
}

// =============================================================================
// Labels
// =============================================================================

#[tokio::test]
async fn test_mandatory_labels_win_collisions() {
    let (provisioner, runtime) = recording_provisioner();

    let mut labels = HashMap::new();
    labels.insert(CLUSTER_LABEL_KEY.to_string(), "spoofed".to_string());
    labels.insert("team".to_string(), "infra".to_string());

    let options = NodeOptions {
        labels,
        ..Default::default()
    };
    provisioner
        .create_worker_node("w1", "c1", options, ImageMapping::managed("node:v1"))
        .await
        .unwrap();

    let request = runtime.last_request();
    assert_eq!(
        request.labels.get(CLUSTER_LABEL_KEY).map(String::as_str),
        Some("c1")
    );
    assert_eq!(request.labels.get("team").map(String::as_str), Some("infra"));
}

// =============================================================================
// Failure Semantics
// =============================================================================

#[tokio::test]
async fn test_run_failure_names_node_and_role() {
    let provisioner = NodeProvisioner::new(Arc::new(FailingRuntime));

    let err = provisioner
        .create_worker_node("w1", "c1", NodeOptions::default(), ImageMapping::managed("node:v1"))
        .await
        .unwrap_err();

    match err {
        Error::NodeCreateFailed { name, role, reason } => {
            assert_eq!(name, "w1");
            assert_eq!(role, NodeRole::Worker);
            assert!(reason.contains("image not found"), "original cause preserved");
        }
        other => panic!("expected NodeCreateFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_invalid_names_are_rejected() {
    let (provisioner, runtime) = recording_provisioner();

    let err = provisioner
        .create_worker_node("", "c1", NodeOptions::default(), ImageMapping::managed("node:v1"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidNodeSpec(_)));

    let err = provisioner
        .create_worker_node("w1", "bad cluster", NodeOptions::default(), ImageMapping::managed("node:v1"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidNodeSpec(_)));

    // Nothing reached the runtime.
    assert_eq!(runtime.request_count(), 0);
}

#[tokio::test]
async fn test_container_port_zero_is_rejected() {
    let (provisioner, runtime) = recording_provisioner();

    let options = NodeOptions {
        port_mappings: vec![PortMapping {
            container_port: 0,
            host_port: 8080,
            listen_address: None,
            protocol: None,
        }],
        ..Default::default()
    };
    let err = provisioner
        .create_worker_node("w1", "c1", options, ImageMapping::managed("node:v1"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InvalidNodeSpec(_)));
    assert_eq!(runtime.request_count(), 0);
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test]
async fn test_concurrent_worker_creations_are_independent() {
    let (provisioner, runtime) = recording_provisioner();

    let (a, b, c) = tokio::join!(
        provisioner.create_worker_node("w1", "c1", NodeOptions::default(), ImageMapping::managed("node:v1")),
        provisioner.create_worker_node("w2", "c1", NodeOptions::default(), ImageMapping::managed("node:v1")),
        provisioner.create_worker_node("w3", "c1", NodeOptions::default(), ImageMapping::managed("node:v1")),
    );

    assert_eq!(a.unwrap().name, "w1");
    assert_eq!(b.unwrap().name, "w2");
    assert_eq!(c.unwrap().name, "w3");
    assert_eq!(runtime.request_count(), 3);
}
