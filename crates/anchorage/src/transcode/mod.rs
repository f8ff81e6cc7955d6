//! Transcoding between the declarative tree and the canonical cluster
//! configuration.
//!
//! Every sub-domain has a pair of functions: `expand_*` reads the declared
//! tree fields into the typed configuration, `flatten_*` writes a
//! configuration back into a tree seeded from the prior one. Expansion is
//! where user input is validated, so the fallible expanders return the
//! one-of and enumeration errors defined here; flattening never fails.
//!
//! Flattening rules, applied per field:
//! - the output is seeded from the prior tree, so keys the configuration
//!   does not carry (because the engine computes them server-side and never
//!   echoes them back) survive unchanged
//! - strings, lists and mappings are written only when non-empty
//! - plain booleans are written only when true, tri-state booleans whenever
//!   they carry a value
//! - counters (ports, timeouts, uid/gid, retention) are written only when
//!   positive
//! - keyed collections (AWS service overrides, vSphere virtual centers,
//!   certificate bundles) are written in sorted key order

use snafu::{ResultExt, Snafu};

use crate::{model::Document, validation};

mod auth;
mod cloud;
mod cluster;
mod dns;
mod images;
mod ingress;
mod network;
mod node;
mod ops;
mod services;

pub use auth::{
    expand_authentication, expand_authorization, flatten_authentication, flatten_authorization,
};
pub use cloud::{expand_cloud_provider, flatten_cloud_provider};
pub use cluster::{expand_cluster, flatten_cluster, flatten_snapshot};
pub use dns::{expand_dns, flatten_dns};
pub use images::{
    expand_private_registries, expand_system_images, flatten_private_registries,
    flatten_system_images,
};
pub use ingress::{expand_ingress, flatten_ingress};
pub use network::{expand_network, flatten_network};
pub use node::{expand_node, expand_nodes, flatten_node, flatten_nodes};
pub use ops::{
    expand_bastion_host, expand_monitoring, expand_restore, expand_rotate_certificates,
    flatten_bastion_host, flatten_monitoring, flatten_restore, flatten_rotate_certificates,
};
pub use services::{expand_services, flatten_services};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("cannot specify both role and roles for a node"))]
    ConflictingRoleFields,

    #[snafu(display("either role or roles is required"))]
    MissingRoleField,

    #[snafu(display("{field} {token:?} is invalid, must be one of [{legal}]"))]
    IllegalToken {
        field: &'static str,
        token: String,
        legal: String,
    },

    #[snafu(display("{substructure} does not parse as a YAML document"))]
    MalformedDocument {
        substructure: &'static str,
        source: serde_yaml::Error,
    },

    #[snafu(display("node hostname_override {value:?} is invalid"))]
    InvalidHostname {
        value: String,
        source: validation::Errors,
    },

    #[snafu(display("kubelet cluster_domain {value:?} is invalid"))]
    InvalidClusterDomain {
        value: String,
        source: validation::Errors,
    },
}

/// Checks a free-form engine token against the fixed legal set for a field.
/// An empty token is allowed and defers to the engine default.
pub(crate) fn require_member(
    field: &'static str,
    token: &str,
    legal: &'static [&'static str],
) -> Result<()> {
    if token.is_empty() || legal.contains(&token) {
        Ok(())
    } else {
        IllegalTokenSnafu {
            field,
            token,
            legal: legal.join(" "),
        }
        .fail()
    }
}

/// Parses an embedded document carried as opaque text in the tree.
pub(crate) fn parse_document(substructure: &'static str, text: &str) -> Result<Document> {
    serde_yaml::from_str(text).context(MalformedDocumentSnafu { substructure })
}

/// Renders an embedded document back into the tree's text form.
pub(crate) fn document_text(document: &Document) -> String {
    // An in-memory document always re-renders; the fallible path exists for
    // foreign Serialize impls only.
    serde_yaml::to_string(document).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_errors_name_the_value_and_the_legal_set() {
        let err = require_member("network plugin", "cilium", &["calico", "canal", "flannel"])
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "network plugin \"cilium\" is invalid, must be one of [calico canal flannel]"
        );
    }

    #[test]
    fn empty_tokens_defer_to_the_engine_default() {
        require_member("network plugin", "", &["calico"]).expect("empty token is legal");
    }

    #[test]
    fn document_parsing_names_the_substructure() {
        let err = parse_document("audit log policy", "{ unclosed").unwrap_err();
        assert_eq!(
            err.to_string(),
            "audit log policy does not parse as a YAML document"
        );
    }
}
