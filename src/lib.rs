//! # noderun
//!
//! **Container-Backed Cluster Node Provisioner**
//!
//! This crate represents the nodes of a logical cluster (control-plane
//! nodes, worker nodes, and an external load balancer) as isolated
//! container instances, and deterministically translates each "create this
//! node" request into one fully assembled container run: image, entrypoint,
//! network, ports, mounts, environment, and labels.
//!
//! # Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          noderun                            │
//! │  ┌───────────────────────────────────────────────────────┐  │
//! │  │                    NodeProvisioner                    │  │
//! │  │   create_control_plane_node / create_worker_node /    │  │
//! │  │          create_external_load_balancer_node           │  │
//! │  └───────────────────────────┬───────────────────────────┘  │
//! │         ┌───────────────────┼────────────────────┐          │
//! │  ┌──────┴──────┐     ┌──────┴───────┐     ┌──────┴──────┐   │
//! │  │  RoleSpec   │     │ mount / port │     │ label / env │   │
//! │  │  additions  │     │   builders   │     │    merge    │   │
//! │  └─────────────┘     └──────────────┘     └─────────────┘   │
//! │                              │                              │
//! │  ┌───────────────────────────┴───────────────────────────┐  │
//! │  │               ContainerRuntime trait                  │  │
//! │  │           run_container(&RunRequest) → Result         │  │
//! │  └───────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Role Topology
//!
//! | Role                 | Port mappings                     | Entrypoint | Environment |
//! |----------------------|-----------------------------------|------------|-------------|
//! | ControlPlane         | caller's + API server mapping     | image's    | KUBECONFIG  |
//! | Worker               | caller's, unchanged               | image's    | none        |
//! | ExternalLoadBalancer | API + stats only, caller's dropped| haproxy    | none        |
//!
//! Every node additionally gets the same base plumbing: attachment to the
//! fixed container network, a read-only `/lib/modules` bind mount appended
//! last, `/tmp` and `/run` tmpfs mounts, a runtime-managed volume at `/var`,
//! and labels identifying its cluster and role.
//!
//! # Runtime Seam
//!
//! The container runtime is an external collaborator consumed through the
//! narrow [`ContainerRuntime`] trait, so alternate isolation backends can be
//! substituted without touching the provisioning logic. [`RuntimeRegistry`]
//! resolves the active backend.
//!
//! # Example
//!
//! ```rust,ignore
//! use noderun::{ImageMapping, NodeOptions, NodeProvisioner, RuntimeRegistry};
//!
//! #[tokio::main]
//! async fn main() -> noderun::Result<()> {
//!     let mut registry = RuntimeRegistry::new();
//!     registry.register(my_backend);
//!
//!     let provisioner = NodeProvisioner::from_registry(&registry)?;
//!     let node = provisioner
//!         .create_control_plane_node(
//!             "demo-control-plane-0",
//!             "demo",
//!             "0.0.0.0",
//!             6443,
//!             NodeOptions::default(),
//!             ImageMapping::managed("node:v1.30.0"),
//!         )
//!         .await?;
//!     println!("started {node}");
//!     Ok(())
//! }
//! ```

pub mod constants;
pub mod error;
pub mod node;
pub mod provision;
pub mod roles;
pub mod runtime;

// Re-exports
pub use constants::*;
pub use error::{Error, Result};
pub use node::{ImageMapping, IpFamily, Mount, Node, NodeMode, NodeRole, PortMapping, Protocol};
pub use provision::{NodeOptions, NodeProvisioner, build_mounts, build_port_mappings, runtime_protocol};
pub use roles::{ApiServerAddress, RoleOptions, RoleSpec};
pub use runtime::{ContainerRuntime, RunRequest, RuntimeRegistry};
