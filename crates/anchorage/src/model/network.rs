use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::is_default;

/// Cluster networking: the CNI plugin and its provider-specific knobs.
///
/// The plugin name is a free string in the engine contract; the legal
/// tokens are enforced during expansion so an unknown plugin never reaches
/// the engine.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct Network {
    #[serde(skip_serializing_if = "is_default")]
    pub plugin: String,

    #[serde(skip_serializing_if = "is_default")]
    pub options: BTreeMap<String, String>,

    #[serde(skip_serializing_if = "is_default")]
    pub mtu: i64,

    #[serde(skip_serializing_if = "is_default")]
    pub calico_network_provider: Option<CalicoNetworkProvider>,

    #[serde(skip_serializing_if = "is_default")]
    pub canal_network_provider: Option<CanalNetworkProvider>,

    #[serde(skip_serializing_if = "is_default")]
    pub flannel_network_provider: Option<FlannelNetworkProvider>,

    #[serde(skip_serializing_if = "is_default")]
    pub weave_network_provider: Option<WeaveNetworkProvider>,

    #[serde(skip_serializing_if = "is_default")]
    pub node_selector: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct CalicoNetworkProvider {
    #[serde(skip_serializing_if = "is_default")]
    pub cloud_provider: String,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct CanalNetworkProvider {
    /// Host interface the overlay binds to.
    #[serde(skip_serializing_if = "is_default")]
    pub iface: String,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct FlannelNetworkProvider {
    #[serde(skip_serializing_if = "is_default")]
    pub iface: String,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct WeaveNetworkProvider {
    #[serde(skip_serializing_if = "is_default")]
    pub password: String,
}
