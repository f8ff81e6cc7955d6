use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Document, is_default};

/// Per-component settings for everything the engine runs on the nodes.
///
/// The engine expects hyphenated keys for the API server and the controller
/// manager, hence the explicit renames.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct Services {
    #[serde(skip_serializing_if = "is_default")]
    pub etcd: Etcd,

    #[serde(rename = "kube-api", skip_serializing_if = "is_default")]
    pub kube_api: KubeApi,

    #[serde(rename = "kube-controller", skip_serializing_if = "is_default")]
    pub kube_controller: KubeController,

    #[serde(skip_serializing_if = "is_default")]
    pub scheduler: Scheduler,

    #[serde(skip_serializing_if = "is_default")]
    pub kubelet: Kubelet,

    #[serde(skip_serializing_if = "is_default")]
    pub kubeproxy: Kubeproxy,
}

/// Settings every service shares: the container image and extra runtime
/// flags, mounts and environment.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct BaseService {
    #[serde(skip_serializing_if = "is_default")]
    pub image: String,

    #[serde(skip_serializing_if = "is_default")]
    pub extra_args: BTreeMap<String, String>,

    #[serde(skip_serializing_if = "is_default")]
    pub extra_binds: Vec<String>,

    #[serde(skip_serializing_if = "is_default")]
    pub extra_env: Vec<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct Etcd {
    #[serde(flatten)]
    pub base: BaseService,

    /// Endpoints of an externally managed etcd; when set, the engine does
    /// not run its own.
    #[serde(skip_serializing_if = "is_default")]
    pub external_urls: Vec<String>,

    #[serde(skip_serializing_if = "is_default")]
    pub ca_cert: String,

    #[serde(skip_serializing_if = "is_default")]
    pub cert: String,

    #[serde(skip_serializing_if = "is_default")]
    pub key: String,

    #[serde(skip_serializing_if = "is_default")]
    pub path: String,

    /// Absent when zero; the engine then keeps the image default.
    #[serde(skip_serializing_if = "is_default")]
    pub uid: i64,

    #[serde(skip_serializing_if = "is_default")]
    pub gid: i64,

    /// Tri-state: `None` defers to the engine default, `Some(false)`
    /// actively disables recurring snapshots.
    #[serde(skip_serializing_if = "is_default")]
    pub snapshot: Option<bool>,

    #[serde(skip_serializing_if = "is_default")]
    pub retention: String,

    /// Snapshot creation interval, e.g. `12h`.
    #[serde(skip_serializing_if = "is_default")]
    pub creation: String,

    #[serde(skip_serializing_if = "is_default")]
    pub backup_config: Option<BackupConfig>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct BackupConfig {
    #[serde(skip_serializing_if = "is_default")]
    pub interval_hours: i64,

    /// Number of snapshots to keep.
    #[serde(skip_serializing_if = "is_default")]
    pub retention: i64,

    #[serde(skip_serializing_if = "is_default")]
    pub s3_backup_config: Option<S3BackupConfig>,

    #[serde(skip_serializing_if = "is_default")]
    pub enabled: Option<bool>,

    /// Use a timestamp safe for object-store key names.
    #[serde(skip_serializing_if = "is_default")]
    pub safe_timestamp: bool,

    #[serde(skip_serializing_if = "is_default")]
    pub timeout: i64,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct S3BackupConfig {
    #[serde(skip_serializing_if = "is_default")]
    pub access_key: String,

    #[serde(skip_serializing_if = "is_default")]
    pub secret_key: String,

    #[serde(skip_serializing_if = "is_default")]
    pub bucket_name: String,

    #[serde(skip_serializing_if = "is_default")]
    pub region: String,

    #[serde(skip_serializing_if = "is_default")]
    pub endpoint: String,

    #[serde(skip_serializing_if = "is_default")]
    pub custom_ca: String,

    #[serde(skip_serializing_if = "is_default")]
    pub folder: String,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct KubeApi {
    #[serde(flatten)]
    pub base: BaseService,

    #[serde(skip_serializing_if = "is_default")]
    pub service_cluster_ip_range: String,

    #[serde(skip_serializing_if = "is_default")]
    pub service_node_port_range: String,

    #[serde(skip_serializing_if = "is_default")]
    pub pod_security_policy: bool,

    #[serde(skip_serializing_if = "is_default")]
    pub always_pull_images: bool,

    #[serde(skip_serializing_if = "is_default")]
    pub secrets_encryption_config: Option<SecretsEncryptionConfig>,

    #[serde(skip_serializing_if = "is_default")]
    pub audit_log: Option<AuditLog>,

    #[serde(skip_serializing_if = "is_default")]
    pub event_rate_limit: Option<EventRateLimit>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct SecretsEncryptionConfig {
    #[serde(skip_serializing_if = "is_default")]
    pub enabled: bool,

    /// Full `EncryptionConfiguration` document; spliced into the rendered
    /// output by the patcher, not serialized here.
    #[serde(skip)]
    pub custom_config: Option<Document>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct AuditLog {
    #[serde(skip_serializing_if = "is_default")]
    pub enabled: bool,

    #[serde(skip_serializing_if = "is_default")]
    pub configuration: Option<AuditLogConfig>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct AuditLogConfig {
    #[serde(skip_serializing_if = "is_default")]
    pub max_age: i64,

    #[serde(skip_serializing_if = "is_default")]
    pub max_backup: i64,

    #[serde(skip_serializing_if = "is_default")]
    pub max_size: i64,

    #[serde(skip_serializing_if = "is_default")]
    pub path: String,

    #[serde(skip_serializing_if = "is_default")]
    pub format: String,

    /// Audit `Policy` document; spliced in by the patcher.
    #[serde(skip)]
    pub policy: Option<Document>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct EventRateLimit {
    #[serde(skip_serializing_if = "is_default")]
    pub enabled: bool,

    /// Admission `Configuration` document; spliced in by the patcher.
    #[serde(skip)]
    pub configuration: Option<Document>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct KubeController {
    #[serde(flatten)]
    pub base: BaseService,

    #[serde(skip_serializing_if = "is_default")]
    pub cluster_cidr: String,

    #[serde(skip_serializing_if = "is_default")]
    pub service_cluster_ip_range: String,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct Scheduler {
    #[serde(flatten)]
    pub base: BaseService,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct Kubelet {
    #[serde(flatten)]
    pub base: BaseService,

    #[serde(skip_serializing_if = "is_default")]
    pub cluster_domain: String,

    #[serde(skip_serializing_if = "is_default")]
    pub infra_container_image: String,

    #[serde(skip_serializing_if = "is_default")]
    pub cluster_dns_server: String,

    #[serde(skip_serializing_if = "is_default")]
    pub fail_swap_on: bool,

    /// Ask the API server to sign the kubelet serving certificate.
    #[serde(skip_serializing_if = "is_default")]
    pub generate_serving_certificate: bool,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct Kubeproxy {
    #[serde(flatten)]
    pub base: BaseService,
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;

    #[test]
    fn api_server_and_controller_use_hyphenated_keys() {
        let services = Services {
            kube_api: KubeApi {
                service_cluster_ip_range: "10.43.0.0/16".to_owned(),
                ..KubeApi::default()
            },
            kube_controller: KubeController {
                cluster_cidr: "10.42.0.0/16".to_owned(),
                ..KubeController::default()
            },
            ..Services::default()
        };

        let rendered = serde_yaml::to_string(&services).expect("services serialize");
        assert_eq!(
            rendered,
            indoc! {"
                kube-api:
                  service_cluster_ip_range: 10.43.0.0/16
                kube-controller:
                  cluster_cidr: 10.42.0.0/16
            "}
        );
    }

    #[test]
    fn untyped_documents_never_reach_the_serialized_form() {
        let config = SecretsEncryptionConfig {
            enabled: true,
            custom_config: Some(
                serde_yaml::from_str("kind: EncryptionConfiguration").expect("valid document"),
            ),
        };
        let rendered = serde_yaml::to_string(&config).expect("config serializes");
        assert_eq!(rendered, "enabled: true\n");
    }

    #[test]
    fn shared_service_settings_are_inlined() {
        let etcd = Etcd {
            base: BaseService {
                image: "quay.io/coreos/etcd:v3.5".to_owned(),
                ..BaseService::default()
            },
            retention: "72h".to_owned(),
            ..Etcd::default()
        };
        let rendered = serde_yaml::to_string(&etcd).expect("etcd serializes");
        assert_eq!(rendered, "image: quay.io/coreos/etcd:v3.5\nretention: 72h\n");
    }
}
