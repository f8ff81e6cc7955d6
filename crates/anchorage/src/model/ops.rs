use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::is_default;

/// Jump host the engine tunnels through when nodes have no public address.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct BastionHost {
    #[serde(skip_serializing_if = "is_default")]
    pub address: String,

    #[serde(skip_serializing_if = "is_default")]
    pub port: String,

    #[serde(skip_serializing_if = "is_default")]
    pub user: String,

    #[serde(skip_serializing_if = "is_default")]
    pub ssh_key: String,

    #[serde(skip_serializing_if = "is_default")]
    pub ssh_key_path: String,

    #[serde(skip_serializing_if = "is_default")]
    pub ssh_cert: String,

    #[serde(skip_serializing_if = "is_default")]
    pub ssh_cert_path: String,

    #[serde(skip_serializing_if = "is_default")]
    pub ssh_agent_auth: bool,

    #[serde(skip_serializing_if = "is_default")]
    pub ignore_proxy_env_vars: bool,
}

/// Cluster monitoring deployment.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct Monitoring {
    #[serde(skip_serializing_if = "is_default")]
    pub provider: String,

    #[serde(skip_serializing_if = "is_default")]
    pub options: BTreeMap<String, String>,

    #[serde(skip_serializing_if = "is_default")]
    pub node_selector: BTreeMap<String, String>,

    #[serde(skip_serializing_if = "is_default")]
    pub replicas: Option<i64>,
}

/// One-shot restore from an etcd snapshot on the next engine run.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct Restore {
    #[serde(skip_serializing_if = "is_default")]
    pub restore: bool,

    #[serde(skip_serializing_if = "is_default")]
    pub snapshot_name: String,
}

/// Certificate rotation to perform on the next engine run.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct RotateCertificates {
    /// Also rotate the cluster CA, which reissues everything beneath it.
    #[serde(skip_serializing_if = "is_default")]
    pub ca_certificates: bool,

    /// Restrict rotation to the named services; empty means all.
    #[serde(skip_serializing_if = "is_default")]
    pub services: Vec<String>,
}
