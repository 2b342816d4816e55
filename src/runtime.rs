//! Container runtime abstraction.
//!
//! The provisioner talks to the container runtime through the narrow
//! [`ContainerRuntime`] trait: one operation that starts a container from a
//! fully assembled [`RunRequest`]. Alternate isolation backends substitute at
//! this seam without touching the provisioning logic.
//!
//! [`RuntimeRegistry`] resolves which runtime a provisioning call uses: the
//! first registered runtime that reports itself available.

use crate::error::{Error, Result};
use crate::node::{IpFamily, NodeMode};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

// =============================================================================
// Runtime Representations
// =============================================================================

/// A bind mount in the runtime's representation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mount {
    /// Source path on the host.
    pub source: String,
    /// Target path inside the container.
    pub target: String,
    /// Mount read-only.
    pub read_only: bool,
}

/// A port forwarding entry in the runtime's representation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortMapping {
    /// Port inside the container.
    pub container_port: u16,
    /// Port on the host (0 = runtime-assigned).
    pub host_port: u16,
    /// Host address to listen on; absent means all addresses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listen_address: Option<String>,
    /// Lowercase protocol string: `"tcp"`, `"udp"`, or `"sctp"`.
    pub protocol: String,
}

/// Fully assembled container run invocation.
///
/// Built once per provisioning call and handed to the runtime unchanged;
/// nothing mutates it after assembly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRequest {
    /// Container name; the container's hostname matches it.
    pub name: String,
    /// Image to run.
    pub image: String,
    /// Labels attached to the container.
    pub labels: HashMap<String, String>,
    /// Entrypoint override; `None` keeps the image entrypoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entrypoint: Option<Vec<String>>,
    /// Volume declarations, target path to source. An empty source asks the
    /// runtime for a runtime-managed volume.
    pub volumes: HashMap<String, String>,
    /// Bind mounts.
    pub mounts: Vec<Mount>,
    /// Host-to-container port forwardings.
    pub port_mappings: Vec<PortMapping>,
    /// Named network to attach to.
    pub network: String,
    /// Tmpfs declarations, target path to mount options.
    pub tmpfs: HashMap<String, String>,
    /// Environment variables to inject.
    pub env: HashMap<String, String>,
    /// IP family for the container network.
    pub ip_family: IpFamily,
    /// Whether the container takes part in the managed-node protocol.
    pub mode: NodeMode,
}

// =============================================================================
// Container Runtime Trait
// =============================================================================

/// Container runtime interface.
///
/// Implementations must support named networks, volume declarations with an
/// empty source (runtime-managed), tmpfs mounts, bind mounts with a read-only
/// flag, host-to-container port forwarding with optional listen address and
/// protocol, label attachment, entrypoint override, and environment variable
/// injection.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Returns the runtime name.
    fn name(&self) -> &str;

    /// Checks if this runtime is reachable on the current host.
    fn is_available(&self) -> bool;

    /// Returns the reason why this runtime is unavailable (if any).
    fn unavailable_reason(&self) -> Option<String> {
        None
    }

    /// Starts a container matching the run request.
    ///
    /// # Errors
    ///
    /// [`Error::RunFailed`] if the image cannot be run or any declared
    /// resource is invalid. Cleanup of a partially started container is the
    /// runtime's concern; the caller sees only the error.
    async fn run_container(&self, request: &RunRequest) -> Result<()>;
}

impl std::fmt::Debug for dyn ContainerRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerRuntime")
            .field("name", &self.name())
            .finish()
    }
}

// =============================================================================
// Runtime Registry
// =============================================================================

/// Registry of container runtimes.
///
/// Resolution order is registration order: [`RuntimeRegistry::active`]
/// returns the first runtime that reports itself available.
pub struct RuntimeRegistry {
    runtimes: Vec<Arc<dyn ContainerRuntime>>,
}

impl RuntimeRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            runtimes: Vec::new(),
        }
    }

    /// Registers a container runtime.
    pub fn register(&mut self, runtime: Arc<dyn ContainerRuntime>) {
        self.runtimes.push(runtime);
    }

    /// Returns all registered runtimes.
    #[must_use]
    pub fn all(&self) -> &[Arc<dyn ContainerRuntime>] {
        &self.runtimes
    }

    /// Returns all runtimes passing their availability check.
    #[must_use]
    pub fn available(&self) -> Vec<&dyn ContainerRuntime> {
        self.runtimes
            .iter()
            .filter(|r| r.is_available())
            .map(|r| r.as_ref())
            .collect()
    }

    /// Gets a runtime by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn ContainerRuntime>> {
        self.runtimes.iter().find(|r| r.name() == name).cloned()
    }

    /// Resolves the active runtime: the first registered runtime that is
    /// available.
    ///
    /// # Errors
    ///
    /// [`Error::RuntimeUnavailable`] if nothing is registered or every
    /// registered runtime is unavailable; the message carries each runtime's
    /// reported reason.
    pub fn active(&self) -> Result<Arc<dyn ContainerRuntime>> {
        if self.runtimes.is_empty() {
            return Err(Error::RuntimeUnavailable(
                "no runtime registered".to_string(),
            ));
        }
        self.runtimes
            .iter()
            .find(|r| r.is_available())
            .cloned()
            .ok_or_else(|| {
                let reasons: Vec<String> = self
                    .runtimes
                    .iter()
                    .map(|r| {
                        format!(
                            "{}: {}",
                            r.name(),
                            r.unavailable_reason()
                                .unwrap_or_else(|| "unavailable".to_string())
                        )
                    })
                    .collect();
                Error::RuntimeUnavailable(reasons.join("; "))
            })
    }
}

impl Default for RuntimeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
