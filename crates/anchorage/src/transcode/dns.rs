use super::{Result, require_member};
use crate::{
    model::{Dns, Nodelocal},
    tree::Tree,
};

const DNS_PROVIDERS: [&str; 3] = ["coredns", "kube-dns", "none"];

pub fn expand_dns(tree: &Tree) -> Result<Dns> {
    let mut dns = Dns::default();

    if let Some(provider) = tree.str("provider") {
        require_member("dns provider", provider, &DNS_PROVIDERS)?;
        dns.provider = provider.to_owned();
    }
    if let Some(servers) = tree.string_list("upstream_nameservers") {
        dns.upstream_nameservers = servers;
    }
    if let Some(cidrs) = tree.string_list("reverse_cidrs") {
        dns.reverse_cidrs = cidrs;
    }
    if let Some(selector) = tree.string_map("node_selector") {
        dns.node_selector = selector;
    }
    if let Some(nodelocal) = tree.subtree("nodelocal") {
        let mut cache = Nodelocal::default();
        if let Some(address) = nodelocal.str("ip_address") {
            cache.ip_address = address.to_owned();
        }
        if let Some(selector) = nodelocal.string_map("node_selector") {
            cache.node_selector = selector;
        }
        dns.nodelocal = Some(cache);
    }

    Ok(dns)
}

pub fn flatten_dns(dns: &Dns, prior: &Tree) -> Tree {
    let mut tree = prior.clone();
    let empty = Tree::new();

    tree.set_nonempty("provider", &dns.provider);
    tree.set_nonempty_list("upstream_nameservers", &dns.upstream_nameservers);
    tree.set_nonempty_list("reverse_cidrs", &dns.reverse_cidrs);
    tree.set_nonempty_map("node_selector", &dns.node_selector);
    if let Some(nodelocal) = &dns.nodelocal {
        let mut cache = prior.subtree("nodelocal").unwrap_or(&empty).clone();
        cache.set_nonempty("ip_address", &nodelocal.ip_address);
        cache.set_nonempty_map("node_selector", &nodelocal.node_selector);
        tree.set("nodelocal", cache);
    }

    tree
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;

    #[test]
    fn unknown_providers_are_rejected_by_name() {
        let tree = Tree::from_yaml_str("provider: unbound\n").expect("fixture parses");
        let err = expand_dns(&tree).unwrap_err();
        assert_eq!(
            err.to_string(),
            "dns provider \"unbound\" is invalid, must be one of [coredns kube-dns none]"
        );
    }

    #[test]
    fn nodelocal_cache_round_trips() {
        let tree = Tree::from_yaml_str(indoc! {"
            provider: coredns
            upstream_nameservers: [1.1.1.1, 8.8.8.8]
            nodelocal:
              ip_address: 169.254.20.10
        "})
        .expect("fixture parses");

        let dns = expand_dns(&tree).expect("dns expands");
        assert_eq!(
            dns.nodelocal,
            Some(Nodelocal {
                ip_address: "169.254.20.10".to_owned(),
                ..Nodelocal::default()
            })
        );

        let flattened = flatten_dns(&dns, &Tree::new());
        assert_eq!(flattened, tree);
    }

    #[test]
    fn nested_nodelocal_members_survive_flattening() {
        let tree = Tree::from_yaml_str(indoc! {"
            provider: coredns
            nodelocal:
              ip_address: 169.254.20.10
              health_port: 8080
        "})
        .expect("fixture parses");

        let dns = expand_dns(&tree).expect("dns expands");
        let flattened = flatten_dns(&dns, &tree);
        assert_eq!(flattened, tree);
    }
}
