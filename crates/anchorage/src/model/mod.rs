//! The canonical cluster configuration accepted by the Capstan provisioning
//! engine.
//!
//! These types mirror the engine's documented YAML input one to one. They
//! are produced fresh on every reconciliation pass by
//! [`crate::transcode::expand_cluster`] and are never persisted; the tree
//! handed over by the orchestrator is the durable representation.
//!
//! Serialization deliberately skips every zero value so that the rendered
//! document only carries keys the operator (or a previous pass) actually
//! set. Three substructures are not serialized here at all: the audit-log
//! policy, the event-rate-limit configuration and the secrets-encryption
//! custom configuration are open, version-dependent documents that the
//! engine validates itself. They are carried as untyped [`Document`] values
//! and spliced into the rendered output by [`crate::patch`].

use serde::{Deserialize, Serialize};

mod auth;
mod cloud;
mod dns;
mod images;
mod ingress;
mod network;
mod node;
mod ops;
mod services;

pub use auth::{AuthWebhook, Authentication, Authorization};
pub use cloud::{
    AwsCloudProvider, AwsGlobalOptions, AwsServiceOverride, CloudProvider, VirtualCenter,
    VsphereCloudProvider, VsphereDisk, VsphereGlobalOptions, VsphereNetwork, VsphereWorkspace,
};
pub use dns::{Dns, Nodelocal};
pub use images::{PrivateRegistry, SystemImages};
pub use ingress::Ingress;
pub use network::{
    CalicoNetworkProvider, CanalNetworkProvider, FlannelNetworkProvider, Network,
    WeaveNetworkProvider,
};
pub use node::{Node, NodeRole, Taint};
pub use ops::{BastionHost, Monitoring, Restore, RotateCertificates};
pub use services::{
    AuditLog, AuditLogConfig, BackupConfig, BaseService, Etcd, EventRateLimit, KubeApi,
    KubeController, Kubelet, Kubeproxy, S3BackupConfig, Scheduler, SecretsEncryptionConfig,
    Services,
};

/// An untyped, engine-validated document embedded in the configuration.
pub type Document = serde_yaml::Value;

/// Serialization predicate: a field at its zero value is not written.
pub(crate) fn is_default<T: Default + PartialEq>(value: &T) -> bool {
    *value == T::default()
}

/// The root of the engine's configuration document.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct ClusterConfig {
    #[serde(skip_serializing_if = "is_default")]
    pub nodes: Vec<Node>,

    #[serde(skip_serializing_if = "is_default")]
    pub services: Services,

    #[serde(skip_serializing_if = "is_default")]
    pub network: Network,

    #[serde(skip_serializing_if = "is_default")]
    pub authentication: Authentication,

    /// Inlined addon manifests, deployed after the control plane is up.
    #[serde(skip_serializing_if = "is_default")]
    pub addons: String,

    /// Addon manifest URLs or paths, deployed in the given order.
    #[serde(skip_serializing_if = "is_default")]
    pub addons_include: Vec<String>,

    #[serde(skip_serializing_if = "is_default")]
    pub addon_job_timeout: i64,

    #[serde(skip_serializing_if = "is_default")]
    pub system_images: SystemImages,

    #[serde(skip_serializing_if = "is_default")]
    pub ssh_key_path: String,

    #[serde(skip_serializing_if = "is_default")]
    pub ssh_cert_path: String,

    #[serde(skip_serializing_if = "is_default")]
    pub ssh_agent_auth: bool,

    #[serde(skip_serializing_if = "is_default")]
    pub authorization: Authorization,

    #[serde(skip_serializing_if = "is_default")]
    pub ignore_docker_version: Option<bool>,

    #[serde(skip_serializing_if = "is_default")]
    pub kubernetes_version: String,

    #[serde(skip_serializing_if = "is_default")]
    pub private_registries: Vec<PrivateRegistry>,

    #[serde(skip_serializing_if = "is_default")]
    pub ingress: Ingress,

    #[serde(skip_serializing_if = "is_default")]
    pub cluster_name: String,

    /// Installation prefix for engine-managed binaries on the hosts.
    #[serde(skip_serializing_if = "is_default")]
    pub prefix_path: String,

    #[serde(skip_serializing_if = "is_default")]
    pub dns: Option<Dns>,

    #[serde(skip_serializing_if = "is_default")]
    pub bastion_host: BastionHost,

    #[serde(skip_serializing_if = "is_default")]
    pub monitoring: Monitoring,

    #[serde(skip_serializing_if = "is_default")]
    pub restore: Restore,

    #[serde(skip_serializing_if = "is_default")]
    pub rotate_certificates: Option<RotateCertificates>,

    #[serde(skip_serializing_if = "is_default")]
    pub cloud_provider: CloudProvider,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_config_serializes_to_empty_document() {
        let rendered = serde_yaml::to_string(&ClusterConfig::default())
            .expect("default config always serializes");
        assert_eq!(rendered, "{}\n");
    }

    #[test]
    fn unknown_keys_from_the_engine_are_tolerated() {
        // Engine versions may echo back keys this build does not model yet.
        let config: ClusterConfig = serde_yaml::from_str(
            "cluster_name: staging\nfuture_engine_knob: true\n",
        )
        .expect("unknown keys must not fail deserialization");
        assert_eq!(config.cluster_name, "staging");
    }
}
