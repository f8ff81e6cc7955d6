use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::is_default;

/// In-cluster DNS. `None` at the [`super::ClusterConfig`] level means the
/// engine picks its versioned default provider.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct Dns {
    #[serde(skip_serializing_if = "is_default")]
    pub provider: String,

    #[serde(skip_serializing_if = "is_default")]
    pub upstream_nameservers: Vec<String>,

    /// CIDRs answered with PTR records by the cluster resolver.
    #[serde(skip_serializing_if = "is_default")]
    pub reverse_cidrs: Vec<String>,

    #[serde(skip_serializing_if = "is_default")]
    pub node_selector: BTreeMap<String, String>,

    #[serde(skip_serializing_if = "is_default")]
    pub nodelocal: Option<Nodelocal>,
}

/// Node-local DNS cache, bound to a link-local address on every host.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct Nodelocal {
    #[serde(skip_serializing_if = "is_default")]
    pub ip_address: String,

    #[serde(skip_serializing_if = "is_default")]
    pub node_selector: BTreeMap<String, String>,
}
