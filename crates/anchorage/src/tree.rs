//! The declarative configuration tree exchanged with the host orchestrator.
//!
//! A [`Tree`] is an ordered collection of named nodes. Each node holds a
//! scalar, a flat list, a flat string-to-string mapping, a nested tree or a
//! list of nested trees. The orchestrator owns the tree between
//! reconciliation passes; this crate only reads and writes nodes by the key
//! names fixed by the schema registry.
//!
//! Shape checking is split in two: ingestion from an untrusted document
//! ([`Tree::from_yaml`]) is fallible, while the typed accessors assume the
//! registry has already enforced the field shapes. A shape mismatch at an
//! accessor is therefore a programmer error and panics instead of coercing.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use snafu::{ResultExt, Snafu};

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to parse tree document"))]
    ParseDocument { source: serde_yaml::Error },

    #[snafu(display("tree document root must be a mapping"))]
    RootNotAMapping,

    #[snafu(display("mapping key {found:?} is not a string"))]
    NonStringKey { found: String },

    #[snafu(display("node {key:?} holds an unsupported {kind} value"))]
    UnsupportedNode { key: String, kind: &'static str },
}

/// A single node value inside a [`Tree`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TreeValue {
    Str(String),
    Bool(bool),
    Int(i64),
    List(Vec<TreeValue>),
    Map(Tree),
}

impl TreeValue {
    /// The variant name used in panic and error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Str(_) => "string",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }

    pub fn expect_str(&self) -> &str {
        match self {
            Self::Str(value) => value,
            other => panic!("expected string node, found {} node", other.kind()),
        }
    }

    pub fn expect_bool(&self) -> bool {
        match self {
            Self::Bool(value) => *value,
            other => panic!("expected bool node, found {} node", other.kind()),
        }
    }

    pub fn expect_int(&self) -> i64 {
        match self {
            Self::Int(value) => *value,
            other => panic!("expected int node, found {} node", other.kind()),
        }
    }

    pub fn expect_list(&self) -> &[Self] {
        match self {
            Self::List(values) => values,
            other => panic!("expected list node, found {} node", other.kind()),
        }
    }

    pub fn expect_map(&self) -> &Tree {
        match self {
            Self::Map(tree) => tree,
            other => panic!("expected map node, found {} node", other.kind()),
        }
    }

    pub fn to_yaml(&self) -> serde_yaml::Value {
        match self {
            Self::Str(value) => serde_yaml::Value::String(value.clone()),
            Self::Bool(value) => serde_yaml::Value::Bool(*value),
            Self::Int(value) => serde_yaml::Value::Number((*value).into()),
            Self::List(values) => {
                serde_yaml::Value::Sequence(values.iter().map(Self::to_yaml).collect())
            }
            Self::Map(tree) => tree.to_yaml(),
        }
    }
}

impl From<&str> for TreeValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

impl From<String> for TreeValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<bool> for TreeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for TreeValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<Vec<String>> for TreeValue {
    fn from(values: Vec<String>) -> Self {
        Self::List(values.into_iter().map(Self::Str).collect())
    }
}

impl From<BTreeMap<String, String>> for TreeValue {
    fn from(entries: BTreeMap<String, String>) -> Self {
        let mut tree = Tree::new();
        for (key, value) in entries {
            tree.set(key, value);
        }
        Self::Map(tree)
    }
}

impl From<Tree> for TreeValue {
    fn from(tree: Tree) -> Self {
        Self::Map(tree)
    }
}

impl From<Vec<Tree>> for TreeValue {
    fn from(trees: Vec<Tree>) -> Self {
        Self::List(trees.into_iter().map(Self::Map).collect())
    }
}

/// Converts the elements of a list node into native strings.
///
/// # Panics
///
/// Panics when an element is not a string node. The schema registry
/// guarantees element shapes before transcoding runs, so a mismatch here is
/// a programmer error, not user input.
pub fn string_values(values: &[TreeValue]) -> Vec<String> {
    values
        .iter()
        .map(|value| value.expect_str().to_owned())
        .collect()
}

/// Converts a flat mapping node into native string-to-string entries.
///
/// # Panics
///
/// Panics when an entry value is not a string node, see [`string_values`].
pub fn string_entries(tree: &Tree) -> BTreeMap<String, String> {
    tree.iter()
        .map(|(key, value)| (key.to_owned(), value.expect_str().to_owned()))
        .collect()
}

/// An ordered tree of named nodes.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Tree {
    nodes: IndexMap<String, TreeValue>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.nodes.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&TreeValue> {
        self.nodes.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<TreeValue>) {
        self.nodes.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<TreeValue> {
        self.nodes.shift_remove(key)
    }

    /// Iterates nodes in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &TreeValue)> {
        self.nodes.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn str(&self, key: &str) -> Option<&str> {
        self.get(key).map(TreeValue::expect_str)
    }

    pub fn bool(&self, key: &str) -> Option<bool> {
        self.get(key).map(TreeValue::expect_bool)
    }

    pub fn int(&self, key: &str) -> Option<i64> {
        self.get(key).map(TreeValue::expect_int)
    }

    pub fn string_list(&self, key: &str) -> Option<Vec<String>> {
        self.get(key)
            .map(|value| string_values(value.expect_list()))
    }

    pub fn string_map(&self, key: &str) -> Option<BTreeMap<String, String>> {
        self.get(key).map(|value| string_entries(value.expect_map()))
    }

    /// A nested singleton tree, e.g. the `services` sub-document.
    pub fn subtree(&self, key: &str) -> Option<&Self> {
        self.get(key).map(TreeValue::expect_map)
    }

    /// A list of nested trees, e.g. the `nodes` entries.
    pub fn subtrees(&self, key: &str) -> Option<Vec<&Self>> {
        self.get(key)
            .map(|value| value.expect_list().iter().map(TreeValue::expect_map).collect())
    }

    /// Inserts a string node only when the value is non-empty.
    ///
    /// An empty string is not an observable configuration signal; writing it
    /// would manufacture a "user set this to empty" state that never
    /// occurred.
    pub fn set_nonempty(&mut self, key: impl Into<String>, value: &str) {
        if !value.is_empty() {
            self.set(key, value);
        }
    }

    /// Inserts a string list node only when the list is non-empty.
    pub fn set_nonempty_list(&mut self, key: impl Into<String>, values: &[String]) {
        if !values.is_empty() {
            self.set(key, values.to_vec());
        }
    }

    /// Inserts a flat mapping node only when the mapping is non-empty.
    pub fn set_nonempty_map(&mut self, key: impl Into<String>, entries: &BTreeMap<String, String>) {
        if !entries.is_empty() {
            self.set(key, entries.clone());
        }
    }

    /// Inserts an int node only when the value is positive.
    ///
    /// Zero-valued counters (ports, timeouts, uid/gid) mean "absent" in the
    /// canonical configuration and must not round-trip into the tree.
    pub fn set_positive(&mut self, key: impl Into<String>, value: i64) {
        if value > 0 {
            self.set(key, value);
        }
    }

    /// Inserts a bool node only when the value is true.
    ///
    /// False is the zero value of every plain boolean field, so a false node
    /// would claim a choice the operator never made. Fields where false is a
    /// real signal are tri-state, see [`Tree::set_tristate`].
    pub fn set_true(&mut self, key: impl Into<String>, value: bool) {
        if value {
            self.set(key, true);
        }
    }

    /// Inserts a bool node when the tri-state carries a value. Both `true`
    /// and `false` are observable here; only `None` stays absent.
    pub fn set_tristate(&mut self, key: impl Into<String>, value: Option<bool>) {
        if let Some(value) = value {
            self.set(key, value);
        }
    }

    /// Inserts a nested tree node only when the subtree has nodes.
    pub fn set_nonempty_tree(&mut self, key: impl Into<String>, subtree: Self) {
        if !subtree.is_empty() {
            self.set(key, subtree);
        }
    }

    /// Inserts a list-of-trees node only when the list is non-empty.
    pub fn set_nonempty_trees(&mut self, key: impl Into<String>, subtrees: Vec<Self>) {
        if !subtrees.is_empty() {
            self.set(key, subtrees);
        }
    }

    pub fn from_yaml_str(document: &str) -> Result<Self> {
        let value: serde_yaml::Value =
            serde_yaml::from_str(document).context(ParseDocumentSnafu)?;
        Self::from_yaml(&value)
    }

    pub fn from_yaml(value: &serde_yaml::Value) -> Result<Self> {
        match value {
            serde_yaml::Value::Mapping(mapping) => convert_mapping(mapping),
            _ => RootNotAMappingSnafu.fail(),
        }
    }

    pub fn to_yaml(&self) -> serde_yaml::Value {
        serde_yaml::Value::Mapping(
            self.nodes
                .iter()
                .map(|(key, value)| (serde_yaml::Value::String(key.clone()), value.to_yaml()))
                .collect(),
        )
    }
}

impl<'a> IntoIterator for &'a Tree {
    type IntoIter = std::iter::Map<
        indexmap::map::Iter<'a, String, TreeValue>,
        fn((&'a String, &'a TreeValue)) -> (&'a str, &'a TreeValue),
    >;
    type Item = (&'a str, &'a TreeValue);

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter().map(|(key, value)| (key.as_str(), value))
    }
}

fn convert_mapping(mapping: &serde_yaml::Mapping) -> Result<Tree> {
    let mut tree = Tree::new();
    for (key, value) in mapping {
        let serde_yaml::Value::String(key) = key else {
            return NonStringKeySnafu {
                found: format!("{key:?}"),
            }
            .fail();
        };
        let node = convert_value(key, value)?;
        tree.set(key.clone(), node);
    }
    Ok(tree)
}

fn convert_value(key: &str, value: &serde_yaml::Value) -> Result<TreeValue> {
    match value {
        serde_yaml::Value::Bool(value) => Ok(TreeValue::Bool(*value)),
        serde_yaml::Value::String(value) => Ok(TreeValue::Str(value.clone())),
        serde_yaml::Value::Number(number) => match number.as_i64() {
            Some(value) => Ok(TreeValue::Int(value)),
            None => UnsupportedNodeSnafu {
                key,
                kind: "non-integer number",
            }
            .fail(),
        },
        serde_yaml::Value::Sequence(items) => items
            .iter()
            .map(|item| convert_value(key, item))
            .collect::<Result<Vec<_>>>()
            .map(TreeValue::List),
        serde_yaml::Value::Mapping(mapping) => convert_mapping(mapping).map(TreeValue::Map),
        serde_yaml::Value::Null => UnsupportedNodeSnafu { key, kind: "null" }.fail(),
        serde_yaml::Value::Tagged(_) => UnsupportedNodeSnafu {
            key,
            kind: "tagged",
        }
        .fail(),
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use rstest::rstest;

    use super::*;

    #[test]
    fn nodes_keep_insertion_order() {
        let mut tree = Tree::new();
        tree.set("zulu", "z");
        tree.set("alpha", "a");
        tree.set("mike", 3i64);

        let keys = tree.iter().map(|(key, _)| key).collect::<Vec<_>>();
        assert_eq!(keys, ["zulu", "alpha", "mike"]);
    }

    #[test]
    fn typed_accessors_read_back_native_values() {
        let mut tree = Tree::new();
        tree.set("address", "192.2.0.1");
        tree.set("port", 22i64);
        tree.set("ssh_agent_auth", true);
        tree.set("role", vec!["etcd".to_owned(), "worker".to_owned()]);
        tree.set(
            "labels",
            BTreeMap::from([("tier".to_owned(), "storage".to_owned())]),
        );

        assert_eq!(tree.str("address"), Some("192.2.0.1"));
        assert_eq!(tree.int("port"), Some(22));
        assert_eq!(tree.bool("ssh_agent_auth"), Some(true));
        assert_eq!(
            tree.string_list("role"),
            Some(vec!["etcd".to_owned(), "worker".to_owned()])
        );
        assert_eq!(
            tree.string_map("labels"),
            Some(BTreeMap::from([("tier".to_owned(), "storage".to_owned())]))
        );
        assert_eq!(tree.str("missing"), None);
    }

    #[test]
    #[should_panic(expected = "expected string node, found int node")]
    fn string_accessor_panics_on_int_node() {
        let mut tree = Tree::new();
        tree.set("port", 22i64);
        tree.str("port");
    }

    #[test]
    #[should_panic(expected = "expected list node, found string node")]
    fn list_accessor_panics_on_scalar_node() {
        let mut tree = Tree::new();
        tree.set("role", "etcd");
        tree.string_list("role");
    }

    #[test]
    #[should_panic(expected = "expected string node, found bool node")]
    fn string_values_panics_on_mixed_list() {
        string_values(&[TreeValue::Str("etcd".to_owned()), TreeValue::Bool(true)]);
    }

    #[test]
    fn empty_values_are_not_observable() {
        let mut tree = Tree::new();
        tree.set_nonempty("user", "");
        tree.set_nonempty_list("role", &[]);
        tree.set_nonempty_map("labels", &BTreeMap::new());
        tree.set_positive("port", 0);
        tree.set_true("ssh_agent_auth", false);
        tree.set_tristate("snapshot", None);
        tree.set_nonempty_tree("services", Tree::new());
        tree.set_nonempty_trees("nodes", Vec::new());

        assert!(tree.is_empty());

        tree.set_nonempty("user", "deploy");
        tree.set_positive("port", 22);
        tree.set_true("ssh_agent_auth", true);
        tree.set_tristate("snapshot", Some(false));
        assert_eq!(tree.len(), 4);
        assert_eq!(tree.bool("snapshot"), Some(false));
    }

    #[test]
    fn yaml_round_trip_preserves_nesting() {
        let tree = Tree::from_yaml_str(indoc! {"
            cluster_name: staging
            nodes:
              - address: 192.2.0.1
                role: [etcd]
                ssh_agent_auth: false
            services:
              etcd:
                snapshot: true
        "})
        .expect("fixture is a valid tree document");

        assert_eq!(tree.str("cluster_name"), Some("staging"));
        let nodes = tree.subtrees("nodes").expect("nodes list present");
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].str("address"), Some("192.2.0.1"));
        assert_eq!(nodes[0].bool("ssh_agent_auth"), Some(false));
        let etcd = tree
            .subtree("services")
            .and_then(|services| services.subtree("etcd"))
            .expect("etcd sub-document present");
        assert_eq!(etcd.bool("snapshot"), Some(true));

        let round_tripped =
            Tree::from_yaml(&tree.to_yaml()).expect("egress document parses back");
        assert_eq!(round_tripped, tree);
    }

    #[rstest]
    #[case::float("replicas: 1.5", "non-integer number")]
    #[case::null("policy: null", "null")]
    fn ingestion_rejects_unsupported_scalars(#[case] document: &str, #[case] kind: &str) {
        let err = Tree::from_yaml_str(document).unwrap_err();
        assert!(err.to_string().contains("unsupported"));
        assert!(err.to_string().contains(kind));
    }

    #[test]
    fn ingestion_rejects_non_mapping_root() {
        let err = Tree::from_yaml_str("- a\n- b\n").unwrap_err();
        assert!(err.to_string().contains("must be a mapping"));
    }
}
