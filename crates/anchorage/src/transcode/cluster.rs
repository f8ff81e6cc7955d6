use super::{
    Result, expand_authentication, expand_authorization, expand_bastion_host,
    expand_cloud_provider, expand_dns, expand_ingress, expand_monitoring, expand_network,
    expand_nodes, expand_private_registries, expand_restore, expand_rotate_certificates,
    expand_services, expand_system_images, flatten_authentication, flatten_authorization,
    flatten_bastion_host, flatten_cloud_provider, flatten_dns, flatten_ingress,
    flatten_monitoring, flatten_network, flatten_nodes, flatten_private_registries,
    flatten_restore, flatten_rotate_certificates, flatten_services, flatten_system_images,
};
use crate::{
    engine::{CertificateBundle, ClusterSnapshot, HostAddress},
    model::ClusterConfig,
    tree::Tree,
};

/// Builds the canonical configuration from the declarative tree.
///
/// This runs identically on every pass: create, read, update and delete
/// all reconstruct the same configuration, because the engine is stateless
/// across invocations and must be re-told everything.
pub fn expand_cluster(tree: &Tree) -> Result<ClusterConfig> {
    let mut config = ClusterConfig::default();

    if let Some(nodes) = tree.subtrees("nodes") {
        config.nodes = expand_nodes(&nodes)?;
    }
    if let Some(services) = tree.subtree("services") {
        config.services = expand_services(services)?;
    }
    if let Some(network) = tree.subtree("network") {
        config.network = expand_network(network)?;
    }
    if let Some(authentication) = tree.subtree("authentication") {
        config.authentication = expand_authentication(authentication)?;
    }
    if let Some(addons) = tree.str("addons") {
        config.addons = addons.to_owned();
    }
    if let Some(include) = tree.string_list("addons_include") {
        config.addons_include = include;
    }
    if let Some(timeout) = tree.int("addon_job_timeout") {
        config.addon_job_timeout = timeout;
    }
    if let Some(images) = tree.subtree("system_images") {
        config.system_images = expand_system_images(images)?;
    }
    if let Some(path) = tree.str("ssh_key_path") {
        config.ssh_key_path = path.to_owned();
    }
    if let Some(path) = tree.str("ssh_cert_path") {
        config.ssh_cert_path = path.to_owned();
    }
    if let Some(agent) = tree.bool("ssh_agent_auth") {
        config.ssh_agent_auth = agent;
    }
    if let Some(authorization) = tree.subtree("authorization") {
        config.authorization = expand_authorization(authorization)?;
    }
    config.ignore_docker_version = tree.bool("ignore_docker_version");
    if let Some(version) = tree.str("kubernetes_version") {
        config.kubernetes_version = version.to_owned();
    }
    if let Some(registries) = tree.subtrees("private_registries") {
        config.private_registries = expand_private_registries(&registries)?;
    }
    if let Some(ingress) = tree.subtree("ingress") {
        config.ingress = expand_ingress(ingress)?;
    }
    if let Some(name) = tree.str("cluster_name") {
        config.cluster_name = name.to_owned();
    }
    if let Some(prefix) = tree.str("prefix_path") {
        config.prefix_path = prefix.to_owned();
    }
    if let Some(dns) = tree.subtree("dns") {
        config.dns = Some(expand_dns(dns)?);
    }
    if let Some(bastion) = tree.subtree("bastion_host") {
        config.bastion_host = expand_bastion_host(bastion)?;
    }
    if let Some(monitoring) = tree.subtree("monitoring") {
        config.monitoring = expand_monitoring(monitoring)?;
    }
    if let Some(restore) = tree.subtree("restore") {
        config.restore = expand_restore(restore)?;
    }
    if let Some(rotate) = tree.subtree("rotate_certificates") {
        config.rotate_certificates = Some(expand_rotate_certificates(rotate)?);
    }
    if let Some(cloud) = tree.subtree("cloud_provider") {
        config.cloud_provider = expand_cloud_provider(cloud)?;
    }

    Ok(config)
}

/// Writes a configuration back into a tree seeded from the prior one.
pub fn flatten_cluster(config: &ClusterConfig, prior: &Tree) -> Tree {
    let mut tree = prior.clone();
    let empty = Tree::new();
    let seed = |key: &str| prior.subtree(key).unwrap_or(&empty);

    if !config.nodes.is_empty() {
        let prior_nodes = prior.subtrees("nodes").unwrap_or_default();
        tree.set("nodes", flatten_nodes(&config.nodes, &prior_nodes));
    }
    tree.set_nonempty_tree("services", flatten_services(&config.services, seed("services")));
    tree.set_nonempty_tree("network", flatten_network(&config.network, seed("network")));
    tree.set_nonempty_tree(
        "authentication",
        flatten_authentication(&config.authentication, seed("authentication")),
    );
    tree.set_nonempty("addons", &config.addons);
    tree.set_nonempty_list("addons_include", &config.addons_include);
    tree.set_positive("addon_job_timeout", config.addon_job_timeout);
    tree.set_nonempty_tree(
        "system_images",
        flatten_system_images(&config.system_images, seed("system_images")),
    );
    tree.set_nonempty("ssh_key_path", &config.ssh_key_path);
    tree.set_nonempty("ssh_cert_path", &config.ssh_cert_path);
    tree.set_true("ssh_agent_auth", config.ssh_agent_auth);
    tree.set_nonempty_tree(
        "authorization",
        flatten_authorization(&config.authorization, seed("authorization")),
    );
    tree.set_tristate("ignore_docker_version", config.ignore_docker_version);
    tree.set_nonempty("kubernetes_version", &config.kubernetes_version);
    if !config.private_registries.is_empty() {
        tree.set(
            "private_registries",
            flatten_private_registries(&config.private_registries),
        );
    }
    tree.set_nonempty_tree("ingress", flatten_ingress(&config.ingress, seed("ingress")));
    tree.set_nonempty("cluster_name", &config.cluster_name);
    tree.set_nonempty("prefix_path", &config.prefix_path);
    if let Some(dns) = &config.dns {
        tree.set_nonempty_tree("dns", flatten_dns(dns, seed("dns")));
    }
    tree.set_nonempty_tree(
        "bastion_host",
        flatten_bastion_host(&config.bastion_host, seed("bastion_host")),
    );
    tree.set_nonempty_tree(
        "monitoring",
        flatten_monitoring(&config.monitoring, seed("monitoring")),
    );
    tree.set_nonempty_tree("restore", flatten_restore(&config.restore, seed("restore")));
    if let Some(rotate) = &config.rotate_certificates {
        tree.set_nonempty_tree(
            "rotate_certificates",
            flatten_rotate_certificates(rotate, seed("rotate_certificates")),
        );
    }
    tree.set_nonempty_tree(
        "cloud_provider",
        flatten_cloud_provider(&config.cloud_provider, seed("cloud_provider")),
    );

    tree
}

/// Flattens everything the engine reported back: the configuration it
/// converged onto plus the artifacts it derived while doing so.
pub fn flatten_snapshot(snapshot: &ClusterSnapshot, prior: &Tree) -> Tree {
    let mut tree = flatten_cluster(&snapshot.config, prior);
    let empty = Tree::new();

    tree.set_nonempty("api_server_url", &snapshot.api_server_url);
    tree.set_nonempty("ca_crt", &snapshot.ca_crt);
    tree.set_nonempty("client_cert", &snapshot.client_cert);
    tree.set_nonempty("client_key", &snapshot.client_key);

    if !snapshot.certificates.is_empty() {
        // Sorted by id so two passes over the same cluster compare equal.
        let mut bundles: Vec<&CertificateBundle> = snapshot.certificates.iter().collect();
        bundles.sort_by(|a, b| a.id.cmp(&b.id));
        tree.set(
            "certificates",
            bundles.into_iter().map(flatten_certificate).collect::<Vec<_>>(),
        );
    }

    set_host_list(&mut tree, "etcd_hosts", &snapshot.etcd_hosts);
    set_host_list(&mut tree, "control_plane_hosts", &snapshot.control_plane_hosts);
    set_host_list(&mut tree, "worker_hosts", &snapshot.worker_hosts);
    set_host_list(&mut tree, "inactive_hosts", &snapshot.inactive_hosts);

    let seed = prior.subtree("running_system_images").unwrap_or(&empty);
    tree.set_nonempty_tree(
        "running_system_images",
        flatten_system_images(&snapshot.running_system_images, seed),
    );

    tree
}

fn flatten_certificate(bundle: &CertificateBundle) -> Tree {
    let mut tree = Tree::new();
    tree.set_nonempty("id", &bundle.id);
    tree.set_nonempty("certificate", &bundle.certificate);
    tree.set_nonempty("key", &bundle.key);
    tree
}

fn set_host_list(tree: &mut Tree, key: &str, hosts: &[HostAddress]) {
    let entries = hosts
        .iter()
        .map(|host| {
            let mut entry = Tree::new();
            entry.set_nonempty("node_name", &host.node_name);
            entry.set_nonempty("address", &host.address);
            entry
        })
        .collect();
    tree.set_nonempty_trees(key, entries);
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;
    use crate::model::NodeRole;

    fn cluster_tree(document: &str) -> Tree {
        Tree::from_yaml_str(document).expect("fixture is a valid tree document")
    }

    #[test]
    fn single_node_cluster_expands_and_flattens_minimally() {
        let tree = cluster_tree(indoc! {"
            nodes:
              - address: 192.2.0.1
                role: [etcd]
        "});

        let config = expand_cluster(&tree).expect("cluster expands");
        assert_eq!(config.nodes.len(), 1);
        assert_eq!(config.nodes[0].address, "192.2.0.1");
        assert_eq!(config.nodes[0].role, [NodeRole::Etcd]);
        assert_eq!(config.cluster_name, "");

        let flattened = flatten_cluster(&config, &Tree::new());
        let keys = flattened.iter().map(|(key, _)| key).collect::<Vec<_>>();
        assert_eq!(keys, ["nodes"]);
        let node = &flattened.subtrees("nodes").expect("nodes present")[0];
        let node_keys = node.iter().map(|(key, _)| key).collect::<Vec<_>>();
        assert_eq!(node_keys, ["address", "role"]);
    }

    #[test]
    fn canonical_trees_are_flattening_fixed_points() {
        let tree = cluster_tree(indoc! {"
            cluster_name: staging
            kubernetes_version: v1.24.4-anchorage1-1
            addon_job_timeout: 45
            ignore_docker_version: false
            ssh_agent_auth: true
            nodes:
              - address: 192.2.0.1
                role: [controlplane, etcd]
                user: deploy
              - address: 192.2.0.2
                role: [worker]
                user: deploy
            services:
              etcd:
                retention: 72h
                snapshot: true
              kube_api:
                service_cluster_ip_range: 10.43.0.0/16
            network:
              plugin: canal
            authentication:
              strategy: x509
            authorization:
              mode: rbac
            ingress:
              provider: nginx
            dns:
              provider: coredns
            monitoring:
              provider: metrics-server
            private_registries:
              - url: registry.example.com
                is_default: true
            cloud_provider:
              name: aws
              aws_cloud_provider:
                global:
                  zone: eu-central-1a
        "});

        let config = expand_cluster(&tree).expect("cluster expands");
        let once = flatten_cluster(&config, &tree);
        assert_eq!(once, tree);

        let config_again = expand_cluster(&once).expect("flattened tree re-expands");
        let twice = flatten_cluster(&config_again, &once);
        assert_eq!(twice, once);
    }

    #[test]
    fn snapshot_artifacts_flatten_sorted_and_preserve_prior_keys() {
        let prior = cluster_tree(indoc! {"
            cluster_name: staging
            nodes:
              - address: 192.2.0.1
                role: [etcd]
            operator_note: keep-me
        "});

        let snapshot = ClusterSnapshot {
            config: expand_cluster(&prior).expect("prior expands"),
            api_server_url: "https://192.2.0.1:6443".to_owned(),
            ca_crt: "---ca---".to_owned(),
            certificates: vec![
                CertificateBundle {
                    id: "kube-node".to_owned(),
                    certificate: "---b---".to_owned(),
                    key: String::new(),
                },
                CertificateBundle {
                    id: "kube-admin".to_owned(),
                    certificate: "---a---".to_owned(),
                    key: String::new(),
                },
            ],
            etcd_hosts: vec![HostAddress {
                node_name: "etcd-0".to_owned(),
                address: "192.2.0.1".to_owned(),
            }],
            ..ClusterSnapshot::default()
        };

        let flattened = flatten_snapshot(&snapshot, &prior);
        assert_eq!(flattened.str("operator_note"), Some("keep-me"));
        assert_eq!(flattened.str("api_server_url"), Some("https://192.2.0.1:6443"));

        let ids = flattened
            .subtrees("certificates")
            .expect("certificates present")
            .iter()
            .map(|bundle| bundle.str("id").expect("id present").to_owned())
            .collect::<Vec<_>>();
        assert_eq!(ids, ["kube-admin", "kube-node"]);

        let hosts = flattened.subtrees("etcd_hosts").expect("etcd hosts present");
        assert_eq!(hosts[0].str("address"), Some("192.2.0.1"));
        assert!(!flattened.contains_key("worker_hosts"));
    }
}
