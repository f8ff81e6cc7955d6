use snafu::{OptionExt, ResultExt};

use super::{
    ConflictingRoleFieldsSnafu, IllegalTokenSnafu, InvalidHostnameSnafu, MissingRoleFieldSnafu,
    Result,
};
use crate::{
    model::{Node, NodeRole, Taint},
    tree::Tree,
    validation,
};

const NODE_ROLES: [&str; 3] = ["controlplane", "etcd", "worker"];

pub fn expand_nodes(trees: &[&Tree]) -> Result<Vec<Node>> {
    trees.iter().map(|tree| expand_node(tree)).collect()
}

pub fn expand_node(tree: &Tree) -> Result<Node> {
    let mut node = Node::default();

    if let Some(address) = tree.str("address") {
        node.address = address.to_owned();
    }
    if let Some(port) = tree.int("port") {
        if port > 0 {
            node.port = port.to_string();
        }
    }
    if let Some(address) = tree.str("internal_address") {
        node.internal_address = address.to_owned();
    }
    node.role = expand_roles(tree)?;
    if let Some(hostname) = tree.str("hostname_override") {
        // The override becomes the node name, a full RFC 1123 subdomain:
        // dotted FQDNs are valid here.
        validation::is_domain(hostname).context(InvalidHostnameSnafu {
            value: hostname,
        })?;
        node.hostname_override = hostname.to_owned();
    }
    if let Some(user) = tree.str("user") {
        node.user = user.to_owned();
    }
    if let Some(socket) = tree.str("docker_socket") {
        node.docker_socket = socket.to_owned();
    }
    if let Some(agent) = tree.bool("ssh_agent_auth") {
        node.ssh_agent_auth = agent;
    }
    if let Some(key) = tree.str("ssh_key") {
        node.ssh_key = key.to_owned();
    }
    if let Some(path) = tree.str("ssh_key_path") {
        node.ssh_key_path = path.to_owned();
    }
    if let Some(cert) = tree.str("ssh_cert") {
        node.ssh_cert = cert.to_owned();
    }
    if let Some(path) = tree.str("ssh_cert_path") {
        node.ssh_cert_path = path.to_owned();
    }
    if let Some(labels) = tree.string_map("labels") {
        node.labels = labels;
    }
    if let Some(taints) = tree.subtrees("taints") {
        node.taints = taints.into_iter().map(expand_taint).collect();
    }

    Ok(node)
}

/// Resolves the one-of role selection: either the `role` list or the legacy
/// comma-joined `roles` string, never both, never neither. An empty list or
/// empty string counts as not given.
fn expand_roles(tree: &Tree) -> Result<Vec<NodeRole>> {
    let list = tree.string_list("role").filter(|tokens| !tokens.is_empty());
    let legacy = tree.str("roles").filter(|joined| !joined.is_empty());

    match (list, legacy) {
        (Some(_), Some(_)) => ConflictingRoleFieldsSnafu.fail(),
        (Some(tokens), None) => tokens.iter().map(|token| parse_role(token)).collect(),
        (None, Some(joined)) => joined.split(',').map(parse_role).collect(),
        (None, None) => MissingRoleFieldSnafu.fail(),
    }
}

fn parse_role(token: &str) -> Result<NodeRole> {
    token.parse().ok().context(IllegalTokenSnafu {
        field: "node role",
        token,
        legal: NODE_ROLES.join(" "),
    })
}

fn expand_taint(tree: &Tree) -> Taint {
    let mut taint = Taint::default();
    if let Some(key) = tree.str("key") {
        taint.key = key.to_owned();
    }
    if let Some(value) = tree.str("value") {
        taint.value = value.to_owned();
    }
    if let Some(effect) = tree.str("effect") {
        taint.effect = effect.to_owned();
    }
    taint
}

/// Flattens the node list, seeding each entry from the prior entry at the
/// same position.
pub fn flatten_nodes(nodes: &[Node], prior: &[&Tree]) -> Vec<Tree> {
    let empty = Tree::new();
    nodes
        .iter()
        .enumerate()
        .map(|(index, node)| flatten_node(node, prior.get(index).copied().unwrap_or(&empty)))
        .collect()
}

pub fn flatten_node(node: &Node, prior: &Tree) -> Tree {
    let mut tree = prior.clone();

    tree.set_nonempty("address", &node.address);
    if let Ok(port) = node.port.parse::<i64>() {
        tree.set_positive("port", port);
    }
    tree.set_nonempty("internal_address", &node.internal_address);
    if !node.role.is_empty() {
        let roles = node.role.iter().map(ToString::to_string).collect::<Vec<_>>();
        tree.set("role", roles);
        // The legacy comma-joined spelling and the list are one selection;
        // leaving both behind would trip the one-of check on the next pass.
        tree.remove("roles");
    }
    tree.set_nonempty("hostname_override", &node.hostname_override);
    tree.set_nonempty("user", &node.user);
    tree.set_nonempty("docker_socket", &node.docker_socket);
    tree.set_true("ssh_agent_auth", node.ssh_agent_auth);
    tree.set_nonempty("ssh_key", &node.ssh_key);
    tree.set_nonempty("ssh_key_path", &node.ssh_key_path);
    tree.set_nonempty("ssh_cert", &node.ssh_cert);
    tree.set_nonempty("ssh_cert_path", &node.ssh_cert_path);
    tree.set_nonempty_map("labels", &node.labels);
    tree.set_nonempty_trees("taints", node.taints.iter().map(flatten_taint).collect());

    tree
}

fn flatten_taint(taint: &Taint) -> Tree {
    let mut tree = Tree::new();
    tree.set_nonempty("key", &taint.key);
    tree.set_nonempty("value", &taint.value);
    tree.set_nonempty("effect", &taint.effect);
    tree
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use indoc::indoc;
    use rstest::rstest;

    use super::*;

    fn node_tree(document: &str) -> Tree {
        Tree::from_yaml_str(document).expect("fixture is a valid tree document")
    }

    #[test]
    fn both_role_forms_are_rejected() {
        let tree = node_tree(indoc! {"
            address: 192.2.0.1
            role: [etcd]
            roles: etcd,worker
        "});
        let err = expand_node(&tree).unwrap_err();
        assert_eq!(err.to_string(), "cannot specify both role and roles for a node");
    }

    #[rstest]
    #[case::no_field("")]
    #[case::empty_list("role: []")]
    #[case::empty_legacy("roles: \"\"")]
    fn a_role_selection_is_required(#[case] roles: &str) {
        let tree = node_tree(&format!("address: 192.2.0.1\n{roles}\n"));
        let err = expand_node(&tree).unwrap_err();
        assert_eq!(err.to_string(), "either role or roles is required");
    }

    #[rstest]
    #[case::list_form("role: [xxx]")]
    #[case::legacy_form("roles: etcd,xxx")]
    fn unknown_role_tokens_are_named(#[case] roles: &str) {
        let tree = node_tree(&format!("address: 192.2.0.1\n{roles}\n"));
        let err = expand_node(&tree).unwrap_err();
        assert_eq!(
            err.to_string(),
            "node role \"xxx\" is invalid, must be one of [controlplane etcd worker]"
        );
    }

    #[test]
    fn legacy_roles_expand_in_order() {
        let tree = node_tree("roles: controlplane,etcd,worker\n");
        let node = expand_node(&tree).expect("legacy form expands");
        assert_eq!(
            node.role,
            [NodeRole::Controlplane, NodeRole::Etcd, NodeRole::Worker]
        );
    }

    #[test]
    fn hostname_override_accepts_dotted_names() {
        let tree = node_tree("role: [worker]\nhostname_override: node-1.example.com\n");
        let node = expand_node(&tree).expect("dotted hostname expands");
        assert_eq!(node.hostname_override, "node-1.example.com");
    }

    #[test]
    fn malformed_hostname_override_is_rejected() {
        let tree = node_tree("role: [worker]\nhostname_override: not_a_hostname\n");
        let err = expand_node(&tree).unwrap_err();
        assert!(err.to_string().contains("hostname_override"));
    }

    #[test]
    fn full_node_round_trips() {
        let tree = node_tree(indoc! {"
            address: 192.2.0.1
            port: 2222
            internal_address: 10.0.0.4
            role: [controlplane, etcd]
            hostname_override: control-0
            user: deploy
            ssh_agent_auth: true
            labels:
              tier: storage
            taints:
              - key: dedicated
                value: storage
                effect: NoSchedule
        "});

        let node = expand_node(&tree).expect("node expands");
        assert_eq!(node.address, "192.2.0.1");
        assert_eq!(node.port, "2222");
        assert_eq!(node.role, [NodeRole::Controlplane, NodeRole::Etcd]);
        assert_eq!(node.taints.len(), 1);
        assert_eq!(node.taints[0].effect, "NoSchedule");

        let flattened = flatten_node(&node, &Tree::new());
        assert_eq!(flattened, tree);
    }

    #[test]
    fn minimal_node_flattens_to_exactly_its_set_fields() {
        let tree = node_tree("address: 192.2.0.1\nrole: [etcd]\n");
        let nodes = expand_nodes(&[&tree]).expect("node list expands");
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].address, "192.2.0.1");
        assert_eq!(nodes[0].role, [NodeRole::Etcd]);
        assert_eq!(nodes[0].labels, BTreeMap::new());

        let flattened = flatten_nodes(&nodes, &[]);
        assert_eq!(flattened.len(), 1);
        let keys = flattened[0].iter().map(|(key, _)| key).collect::<Vec<_>>();
        assert_eq!(keys, ["address", "role"]);
    }

    #[test]
    fn flattening_replaces_the_legacy_role_spelling() {
        let prior = node_tree("address: 192.2.0.1\nroles: etcd\n");
        let node = expand_node(&prior).expect("legacy form expands");

        let flattened = flatten_node(&node, &prior);
        assert!(!flattened.contains_key("roles"));
        assert_eq!(flattened.string_list("role"), Some(vec!["etcd".to_owned()]));
    }

    #[test]
    fn engine_computed_keys_survive_flattening() {
        let prior = node_tree("address: 192.2.0.1\nrole: [etcd]\nagent_version: v1.2.3\n");
        let node = expand_node(&prior).expect("node expands");

        let flattened = flatten_node(&node, &prior);
        assert_eq!(flattened.str("agent_version"), Some("v1.2.3"));
    }
}
