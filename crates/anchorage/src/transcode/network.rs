use super::{Result, require_member};
use crate::{
    model::{
        CalicoNetworkProvider, CanalNetworkProvider, FlannelNetworkProvider, Network,
        WeaveNetworkProvider,
    },
    tree::Tree,
};

const NETWORK_PLUGINS: [&str; 5] = ["calico", "canal", "flannel", "none", "weave"];

pub fn expand_network(tree: &Tree) -> Result<Network> {
    let mut network = Network::default();

    if let Some(plugin) = tree.str("plugin") {
        require_member("network plugin", plugin, &NETWORK_PLUGINS)?;
        network.plugin = plugin.to_owned();
    }
    if let Some(options) = tree.string_map("options") {
        network.options = options;
    }
    if let Some(mtu) = tree.int("mtu") {
        network.mtu = mtu;
    }
    if let Some(calico) = tree.subtree("calico_network_provider") {
        network.calico_network_provider = Some(CalicoNetworkProvider {
            cloud_provider: calico.str("cloud_provider").unwrap_or_default().to_owned(),
        });
    }
    if let Some(canal) = tree.subtree("canal_network_provider") {
        network.canal_network_provider = Some(CanalNetworkProvider {
            iface: canal.str("iface").unwrap_or_default().to_owned(),
        });
    }
    if let Some(flannel) = tree.subtree("flannel_network_provider") {
        network.flannel_network_provider = Some(FlannelNetworkProvider {
            iface: flannel.str("iface").unwrap_or_default().to_owned(),
        });
    }
    if let Some(weave) = tree.subtree("weave_network_provider") {
        network.weave_network_provider = Some(WeaveNetworkProvider {
            password: weave.str("password").unwrap_or_default().to_owned(),
        });
    }
    if let Some(selector) = tree.string_map("node_selector") {
        network.node_selector = selector;
    }

    Ok(network)
}

pub fn flatten_network(network: &Network, prior: &Tree) -> Tree {
    let mut tree = prior.clone();
    let empty = Tree::new();
    let seed = |key: &str| prior.subtree(key).unwrap_or(&empty).clone();

    tree.set_nonempty("plugin", &network.plugin);
    tree.set_nonempty_map("options", &network.options);
    tree.set_positive("mtu", network.mtu);
    if let Some(calico) = &network.calico_network_provider {
        let mut provider = seed("calico_network_provider");
        provider.set_nonempty("cloud_provider", &calico.cloud_provider);
        tree.set("calico_network_provider", provider);
    }
    if let Some(canal) = &network.canal_network_provider {
        let mut provider = seed("canal_network_provider");
        provider.set_nonempty("iface", &canal.iface);
        tree.set("canal_network_provider", provider);
    }
    if let Some(flannel) = &network.flannel_network_provider {
        let mut provider = seed("flannel_network_provider");
        provider.set_nonempty("iface", &flannel.iface);
        tree.set("flannel_network_provider", provider);
    }
    if let Some(weave) = &network.weave_network_provider {
        let mut provider = seed("weave_network_provider");
        provider.set_nonempty("password", &weave.password);
        tree.set("weave_network_provider", provider);
    }
    tree.set_nonempty_map("node_selector", &network.node_selector);

    tree
}
