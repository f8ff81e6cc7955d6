use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::is_default;

/// A host participating in the cluster, reachable over SSH.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct Node {
    /// Public address the engine connects to.
    #[serde(skip_serializing_if = "is_default")]
    pub address: String,

    /// SSH port, carried as a string in the engine contract.
    #[serde(skip_serializing_if = "is_default")]
    pub port: String,

    /// Address used for intra-cluster traffic when it differs from
    /// [`Node::address`].
    #[serde(skip_serializing_if = "is_default")]
    pub internal_address: String,

    #[serde(skip_serializing_if = "is_default")]
    pub role: Vec<NodeRole>,

    #[serde(skip_serializing_if = "is_default")]
    pub hostname_override: String,

    #[serde(skip_serializing_if = "is_default")]
    pub user: String,

    #[serde(skip_serializing_if = "is_default")]
    pub docker_socket: String,

    #[serde(skip_serializing_if = "is_default")]
    pub ssh_agent_auth: bool,

    #[serde(skip_serializing_if = "is_default")]
    pub ssh_key: String,

    #[serde(skip_serializing_if = "is_default")]
    pub ssh_key_path: String,

    #[serde(skip_serializing_if = "is_default")]
    pub ssh_cert: String,

    #[serde(skip_serializing_if = "is_default")]
    pub ssh_cert_path: String,

    #[serde(skip_serializing_if = "is_default")]
    pub labels: BTreeMap<String, String>,

    #[serde(skip_serializing_if = "is_default")]
    pub taints: Vec<Taint>,
}

/// The control-plane duties a [`Node`] takes on.
#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Eq,
    PartialEq,
    Serialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum NodeRole {
    Controlplane,
    Etcd,
    Worker,
}

/// A scheduling taint applied to a node by the engine.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct Taint {
    #[serde(skip_serializing_if = "is_default")]
    pub key: String,

    #[serde(skip_serializing_if = "is_default")]
    pub value: String,

    #[serde(skip_serializing_if = "is_default")]
    pub effect: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_render_as_lowercase_tokens() {
        let node = Node {
            address: "10.0.0.4".to_owned(),
            role: vec![NodeRole::Controlplane, NodeRole::Etcd, NodeRole::Worker],
            ..Node::default()
        };
        let rendered = serde_yaml::to_string(&node).expect("node serializes");
        assert!(rendered.contains("- controlplane\n- etcd\n- worker"));
    }

    #[test]
    fn role_tokens_parse_back() {
        assert_eq!("etcd".parse::<NodeRole>(), Ok(NodeRole::Etcd));
        assert!("master".parse::<NodeRole>().is_err());
    }
}
