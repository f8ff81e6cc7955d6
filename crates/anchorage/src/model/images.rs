use serde::{Deserialize, Serialize};

use super::is_default;

/// Container images for every component the engine deploys.
///
/// Unset entries fall back to the engine's pinned defaults for the chosen
/// `kubernetes_version`; a populated table pins the whole rollout.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct SystemImages {
    #[serde(skip_serializing_if = "is_default")]
    pub etcd: String,

    #[serde(skip_serializing_if = "is_default")]
    pub alpine: String,

    #[serde(skip_serializing_if = "is_default")]
    pub nginx_proxy: String,

    #[serde(skip_serializing_if = "is_default")]
    pub cert_downloader: String,

    #[serde(skip_serializing_if = "is_default")]
    pub kubernetes_services_sidecar: String,

    #[serde(skip_serializing_if = "is_default")]
    pub kube_dns: String,

    #[serde(skip_serializing_if = "is_default")]
    pub dnsmasq: String,

    #[serde(skip_serializing_if = "is_default")]
    pub kube_dns_sidecar: String,

    #[serde(skip_serializing_if = "is_default")]
    pub kube_dns_autoscaler: String,

    #[serde(skip_serializing_if = "is_default")]
    pub coredns: String,

    #[serde(skip_serializing_if = "is_default")]
    pub coredns_autoscaler: String,

    #[serde(skip_serializing_if = "is_default")]
    pub nodelocal: String,

    #[serde(skip_serializing_if = "is_default")]
    pub kubernetes: String,

    #[serde(skip_serializing_if = "is_default")]
    pub flannel: String,

    #[serde(skip_serializing_if = "is_default")]
    pub flannel_cni: String,

    #[serde(skip_serializing_if = "is_default")]
    pub calico_node: String,

    #[serde(skip_serializing_if = "is_default")]
    pub calico_cni: String,

    #[serde(skip_serializing_if = "is_default")]
    pub calico_controllers: String,

    #[serde(skip_serializing_if = "is_default")]
    pub canal_node: String,

    #[serde(skip_serializing_if = "is_default")]
    pub canal_cni: String,

    #[serde(skip_serializing_if = "is_default")]
    pub canal_flannel: String,

    #[serde(skip_serializing_if = "is_default")]
    pub weave_node: String,

    #[serde(skip_serializing_if = "is_default")]
    pub weave_cni: String,

    #[serde(skip_serializing_if = "is_default")]
    pub pod_infra_container: String,

    #[serde(skip_serializing_if = "is_default")]
    pub ingress: String,

    #[serde(skip_serializing_if = "is_default")]
    pub ingress_backend: String,

    #[serde(skip_serializing_if = "is_default")]
    pub metrics_server: String,

    #[serde(skip_serializing_if = "is_default")]
    pub windows_pod_infra_container: String,
}

/// Credentials for a registry the engine pulls system images from.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct PrivateRegistry {
    #[serde(skip_serializing_if = "is_default")]
    pub url: String,

    #[serde(skip_serializing_if = "is_default")]
    pub user: String,

    #[serde(skip_serializing_if = "is_default")]
    pub password: String,

    /// Marks the registry used for unprefixed image names.
    #[serde(skip_serializing_if = "is_default")]
    pub is_default: bool,
}
