use super::{Result, require_member};
use crate::{model::Ingress, tree::Tree};

const INGRESS_PROVIDERS: [&str; 2] = ["nginx", "none"];

pub fn expand_ingress(tree: &Tree) -> Result<Ingress> {
    let mut ingress = Ingress::default();

    if let Some(provider) = tree.str("provider") {
        require_member("ingress provider", provider, &INGRESS_PROVIDERS)?;
        ingress.provider = provider.to_owned();
    }
    if let Some(options) = tree.string_map("options") {
        ingress.options = options;
    }
    if let Some(selector) = tree.string_map("node_selector") {
        ingress.node_selector = selector;
    }
    if let Some(args) = tree.string_map("extra_args") {
        ingress.extra_args = args;
    }
    if let Some(policy) = tree.str("dns_policy") {
        ingress.dns_policy = policy.to_owned();
    }
    if let Some(port) = tree.int("http_port") {
        ingress.http_port = port;
    }
    if let Some(port) = tree.int("https_port") {
        ingress.https_port = port;
    }
    if let Some(mode) = tree.str("network_mode") {
        ingress.network_mode = mode.to_owned();
    }
    ingress.default_backend = tree.bool("default_backend");

    Ok(ingress)
}

pub fn flatten_ingress(ingress: &Ingress, prior: &Tree) -> Tree {
    let mut tree = prior.clone();

    tree.set_nonempty("provider", &ingress.provider);
    tree.set_nonempty_map("options", &ingress.options);
    tree.set_nonempty_map("node_selector", &ingress.node_selector);
    tree.set_nonempty_map("extra_args", &ingress.extra_args);
    tree.set_nonempty("dns_policy", &ingress.dns_policy);
    tree.set_positive("http_port", ingress.http_port);
    tree.set_positive("https_port", ingress.https_port);
    tree.set_nonempty("network_mode", &ingress.network_mode);
    tree.set_tristate("default_backend", ingress.default_backend);

    tree
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;

    #[test]
    fn unknown_providers_are_rejected_by_name() {
        let tree = Tree::from_yaml_str("provider: traefik\n").expect("fixture parses");
        let err = expand_ingress(&tree).unwrap_err();
        assert_eq!(
            err.to_string(),
            "ingress provider \"traefik\" is invalid, must be one of [nginx none]"
        );
    }

    #[test]
    fn disabled_default_backend_round_trips() {
        let tree = Tree::from_yaml_str(indoc! {"
            provider: nginx
            http_port: 8080
            default_backend: false
        "})
        .expect("fixture parses");

        let ingress = expand_ingress(&tree).expect("ingress expands");
        assert_eq!(ingress.default_backend, Some(false));

        let flattened = flatten_ingress(&ingress, &Tree::new());
        assert_eq!(flattened, tree);
    }
}
