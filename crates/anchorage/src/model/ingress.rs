use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::is_default;

/// The ingress controller deployed onto worker nodes.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct Ingress {
    #[serde(skip_serializing_if = "is_default")]
    pub provider: String,

    #[serde(skip_serializing_if = "is_default")]
    pub options: BTreeMap<String, String>,

    #[serde(skip_serializing_if = "is_default")]
    pub node_selector: BTreeMap<String, String>,

    #[serde(skip_serializing_if = "is_default")]
    pub extra_args: BTreeMap<String, String>,

    #[serde(skip_serializing_if = "is_default")]
    pub dns_policy: String,

    #[serde(skip_serializing_if = "is_default")]
    pub http_port: i64,

    #[serde(skip_serializing_if = "is_default")]
    pub https_port: i64,

    /// `hostNetwork` or `hostPort`; empty defers to the engine default.
    #[serde(skip_serializing_if = "is_default")]
    pub network_mode: String,

    /// Tri-state: `Some(false)` actively removes the default backend that
    /// the engine would otherwise deploy.
    #[serde(skip_serializing_if = "is_default")]
    pub default_backend: Option<bool>,
}
