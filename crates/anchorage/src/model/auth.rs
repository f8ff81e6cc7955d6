use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::is_default;

/// How clients authenticate against the API server.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct Authentication {
    #[serde(skip_serializing_if = "is_default")]
    pub strategy: String,

    /// Additional subject alternative names for the API server certificate.
    #[serde(skip_serializing_if = "is_default")]
    pub sans: Vec<String>,

    #[serde(skip_serializing_if = "is_default")]
    pub webhook: Option<AuthWebhook>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct AuthWebhook {
    /// Inlined webhook kubeconfig handed to the API server.
    #[serde(skip_serializing_if = "is_default")]
    pub config_file: String,

    #[serde(skip_serializing_if = "is_default")]
    pub cache_timeout: String,
}

/// The authorization mode the API server runs with.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct Authorization {
    #[serde(skip_serializing_if = "is_default")]
    pub mode: String,

    #[serde(skip_serializing_if = "is_default")]
    pub options: BTreeMap<String, String>,
}
