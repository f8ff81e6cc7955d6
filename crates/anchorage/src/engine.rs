//! Boundary to the external Capstan provisioning engine.
//!
//! The engine itself is out of scope: it is a separate binary that reads a
//! cluster document from a workspace directory, converges the cluster onto
//! it and leaves its state behind as files. This module pins down only the
//! invocation contract: the trait, the fixed workspace file names, the
//! error classification and the diagnostic log sink.
//!
//! Every operation is a single blocking call. The orchestrator owns
//! timeouts and serializes passes per resource, so implementations do not
//! need internal locking.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use snafu::Snafu;

use crate::model::{ClusterConfig, SystemImages};

/// Cluster document file name inside a workspace.
pub const CLUSTER_CONFIG_FILE: &str = "cluster.yml";

/// Engine state file name inside a workspace. Its absence after a lookup
/// means the cluster does not exist.
pub const CLUSTER_STATE_FILE: &str = "cluster.state";

/// Admin kubeconfig file name inside a workspace.
pub const KUBE_CONFIG_FILE: &str = "kube_config.yml";

pub type Result<T, E = EngineError> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum EngineError {
    /// The engine has no prior state for this cluster. Only a lookup may
    /// report this; callers treat it as "absent", never as a failure.
    #[snafu(display("no cluster state found"))]
    StateNotFound,

    /// An opaque engine failure. The message is whatever the engine said;
    /// the caller attaches the captured diagnostic log when surfacing it.
    #[snafu(display("engine {operation} failed: {message}"))]
    Operation {
        operation: &'static str,
        message: String,
    },
}

impl EngineError {
    /// Shorthand for engine implementations reporting an opaque failure.
    pub fn operation(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Operation {
            operation,
            message: message.into(),
        }
    }
}

/// Diagnostic lines captured across one reconciliation pass.
///
/// The engine is opaque, so these lines are the only engine-side context an
/// operator gets when a pass fails. The reconciler threads one log through
/// every invocation of a pass and folds it into the surfaced error.
#[derive(Debug, Default)]
pub struct DiagnosticLog {
    lines: Vec<String>,
}

impl DiagnosticLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// The captured lines as one newline-joined block, ready to append to
    /// an error message.
    pub fn to_text(&self) -> String {
        self.lines.join("\n")
    }
}

/// Everything an engine implementation may touch during one invocation: the
/// workspace holding the cluster files and the log sink for its output.
pub struct EngineInvocation<'a> {
    pub workspace: &'a Path,
    pub log: &'a mut DiagnosticLog,
}

impl EngineInvocation<'_> {
    pub fn config_path(&self) -> PathBuf {
        self.workspace.join(CLUSTER_CONFIG_FILE)
    }

    pub fn state_path(&self) -> PathBuf {
        self.workspace.join(CLUSTER_STATE_FILE)
    }

    pub fn kube_config_path(&self) -> PathBuf {
        self.workspace.join(KUBE_CONFIG_FILE)
    }
}

/// The external cluster-provisioning engine.
///
/// Implementations read [`CLUSTER_CONFIG_FILE`] from the invocation
/// workspace and leave [`CLUSTER_STATE_FILE`] and [`KUBE_CONFIG_FILE`]
/// behind after a successful apply.
pub trait ProvisioningEngine {
    /// Prepares certificates and tunnels for a following [`apply`].
    ///
    /// [`apply`]: ProvisioningEngine::apply
    fn initialize(&self, invocation: &mut EngineInvocation<'_>) -> Result<()>;

    /// Converges the cluster onto the configuration in the workspace.
    fn apply(&self, invocation: &mut EngineInvocation<'_>) -> Result<ClusterSnapshot>;

    /// Fetches the engine's current view of the cluster, or
    /// [`EngineError::StateNotFound`] when it was never provisioned.
    fn lookup(&self, invocation: &mut EngineInvocation<'_>) -> Result<ClusterSnapshot>;

    /// Tears the cluster down and discards its state.
    fn teardown(&self, invocation: &mut EngineInvocation<'_>) -> Result<()>;
}

/// The engine-native view of a provisioned cluster: the configuration it
/// converged onto plus everything it derived while doing so.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct ClusterSnapshot {
    pub config: ClusterConfig,
    pub api_server_url: String,
    pub ca_crt: String,
    pub client_cert: String,
    pub client_key: String,
    pub certificates: Vec<CertificateBundle>,
    pub etcd_hosts: Vec<HostAddress>,
    pub control_plane_hosts: Vec<HostAddress>,
    pub worker_hosts: Vec<HostAddress>,
    pub inactive_hosts: Vec<HostAddress>,
    pub running_system_images: SystemImages,
}

/// One issued certificate, identified by the engine's canonical id string.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct CertificateBundle {
    pub id: String,
    pub certificate: String,
    pub key: String,
}

/// A host as the engine reports it back, by node name and address.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct HostAddress {
    pub node_name: String,
    pub address: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invocation_paths_use_the_fixed_file_names() {
        let mut log = DiagnosticLog::new();
        let invocation = EngineInvocation {
            workspace: Path::new("/work/pass-1"),
            log: &mut log,
        };

        assert_eq!(invocation.config_path(), Path::new("/work/pass-1/cluster.yml"));
        assert_eq!(invocation.state_path(), Path::new("/work/pass-1/cluster.state"));
        assert_eq!(
            invocation.kube_config_path(),
            Path::new("/work/pass-1/kube_config.yml")
        );
    }

    #[test]
    fn diagnostic_log_joins_lines_in_order() {
        let mut log = DiagnosticLog::new();
        assert!(log.is_empty());

        log.record("building cluster state");
        log.record("tunneling to 192.2.0.1");
        assert_eq!(log.to_text(), "building cluster state\ntunneling to 192.2.0.1");
    }
}
