use super::Result;
use crate::{
    model::{BastionHost, Monitoring, Restore, RotateCertificates},
    tree::Tree,
};

pub fn expand_bastion_host(tree: &Tree) -> Result<BastionHost> {
    let mut bastion = BastionHost::default();

    if let Some(address) = tree.str("address") {
        bastion.address = address.to_owned();
    }
    if let Some(port) = tree.int("port") {
        if port > 0 {
            bastion.port = port.to_string();
        }
    }
    if let Some(user) = tree.str("user") {
        bastion.user = user.to_owned();
    }
    if let Some(key) = tree.str("ssh_key") {
        bastion.ssh_key = key.to_owned();
    }
    if let Some(path) = tree.str("ssh_key_path") {
        bastion.ssh_key_path = path.to_owned();
    }
    if let Some(cert) = tree.str("ssh_cert") {
        bastion.ssh_cert = cert.to_owned();
    }
    if let Some(path) = tree.str("ssh_cert_path") {
        bastion.ssh_cert_path = path.to_owned();
    }
    if let Some(agent) = tree.bool("ssh_agent_auth") {
        bastion.ssh_agent_auth = agent;
    }
    if let Some(ignore) = tree.bool("ignore_proxy_env_vars") {
        bastion.ignore_proxy_env_vars = ignore;
    }

    Ok(bastion)
}

pub fn flatten_bastion_host(bastion: &BastionHost, prior: &Tree) -> Tree {
    let mut tree = prior.clone();

    tree.set_nonempty("address", &bastion.address);
    if let Ok(port) = bastion.port.parse::<i64>() {
        tree.set_positive("port", port);
    }
    tree.set_nonempty("user", &bastion.user);
    tree.set_nonempty("ssh_key", &bastion.ssh_key);
    tree.set_nonempty("ssh_key_path", &bastion.ssh_key_path);
    tree.set_nonempty("ssh_cert", &bastion.ssh_cert);
    tree.set_nonempty("ssh_cert_path", &bastion.ssh_cert_path);
    tree.set_true("ssh_agent_auth", bastion.ssh_agent_auth);
    tree.set_true("ignore_proxy_env_vars", bastion.ignore_proxy_env_vars);

    tree
}

pub fn expand_monitoring(tree: &Tree) -> Result<Monitoring> {
    let mut monitoring = Monitoring::default();

    if let Some(provider) = tree.str("provider") {
        monitoring.provider = provider.to_owned();
    }
    if let Some(options) = tree.string_map("options") {
        monitoring.options = options;
    }
    if let Some(selector) = tree.string_map("node_selector") {
        monitoring.node_selector = selector;
    }
    monitoring.replicas = tree.int("replicas");

    Ok(monitoring)
}

pub fn flatten_monitoring(monitoring: &Monitoring, prior: &Tree) -> Tree {
    let mut tree = prior.clone();

    tree.set_nonempty("provider", &monitoring.provider);
    tree.set_nonempty_map("options", &monitoring.options);
    tree.set_nonempty_map("node_selector", &monitoring.node_selector);
    if let Some(replicas) = monitoring.replicas {
        tree.set_positive("replicas", replicas);
    }

    tree
}

pub fn expand_restore(tree: &Tree) -> Result<Restore> {
    let mut restore = Restore::default();

    if let Some(flag) = tree.bool("restore") {
        restore.restore = flag;
    }
    if let Some(name) = tree.str("snapshot_name") {
        restore.snapshot_name = name.to_owned();
    }

    Ok(restore)
}

pub fn flatten_restore(restore: &Restore, prior: &Tree) -> Tree {
    let mut tree = prior.clone();
    tree.set_true("restore", restore.restore);
    tree.set_nonempty("snapshot_name", &restore.snapshot_name);
    tree
}

pub fn expand_rotate_certificates(tree: &Tree) -> Result<RotateCertificates> {
    let mut rotate = RotateCertificates::default();

    if let Some(ca) = tree.bool("ca_certificates") {
        rotate.ca_certificates = ca;
    }
    if let Some(services) = tree.string_list("services") {
        rotate.services = services;
    }

    Ok(rotate)
}

pub fn flatten_rotate_certificates(rotate: &RotateCertificates, prior: &Tree) -> Tree {
    let mut tree = prior.clone();
    tree.set_true("ca_certificates", rotate.ca_certificates);
    tree.set_nonempty_list("services", &rotate.services);
    tree
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;

    #[test]
    fn bastion_port_crosses_the_int_string_boundary() {
        let tree = Tree::from_yaml_str(indoc! {"
            address: bastion.example.com
            port: 2222
            user: jump
        "})
        .expect("fixture parses");

        let bastion = expand_bastion_host(&tree).expect("bastion expands");
        assert_eq!(bastion.port, "2222");

        let flattened = flatten_bastion_host(&bastion, &Tree::new());
        assert_eq!(flattened.int("port"), Some(2222));
        assert_eq!(flattened, tree);
    }

    #[test]
    fn restore_round_trips() {
        let tree = Tree::from_yaml_str("restore: true\nsnapshot_name: nightly-2024-02-01\n")
            .expect("fixture parses");

        let restore = expand_restore(&tree).expect("restore expands");
        assert!(restore.restore);

        let flattened = flatten_restore(&restore, &Tree::new());
        assert_eq!(flattened, tree);
    }

    #[test]
    fn monitoring_replicas_survive_only_when_set() {
        let tree = Tree::from_yaml_str("provider: metrics-server\n").expect("fixture parses");
        let monitoring = expand_monitoring(&tree).expect("monitoring expands");
        assert_eq!(monitoring.replicas, None);

        let flattened = flatten_monitoring(&monitoring, &Tree::new());
        assert!(!flattened.contains_key("replicas"));
    }
}
