//! Final rendering of the cluster document handed to the engine.
//!
//! Three substructures of the canonical configuration are open,
//! version-dependent documents without serialization tags: the audit-log
//! policy, the event-rate-limit configuration and the secrets-encryption
//! custom configuration. The typed serializer therefore leaves them out,
//! and this module splices each one into the rendered document tree at its
//! fixed path, injecting the engine's default `apiVersion`/`kind` markers
//! when the operator left them off.
//!
//! A failure at any step aborts the whole rendering; a partially patched
//! document is never returned.

use serde_yaml::Value;
use snafu::{OptionExt, ResultExt, Snafu, ensure};

use crate::model::{ClusterConfig, Document};

const AUDIT_LOG_POLICY: &str = "audit log policy";
const AUDIT_LOG_POLICY_PATH: [&str; 5] =
    ["services", "kube-api", "audit_log", "configuration", "policy"];

const EVENT_RATE_LIMIT: &str = "event rate limit configuration";
const EVENT_RATE_LIMIT_PATH: [&str; 4] =
    ["services", "kube-api", "event_rate_limit", "configuration"];

const SECRETS_ENCRYPTION: &str = "secrets encryption custom config";
const SECRETS_ENCRYPTION_PATH: [&str; 4] =
    ["services", "kube-api", "secrets_encryption_config", "custom_config"];

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to serialize the cluster configuration"))]
    SerializeConfig { source: serde_yaml::Error },

    #[snafu(display("failed to decode the rendered cluster document"))]
    DecodeRendered { source: serde_yaml::Error },

    #[snafu(display("failed to re-encode the cluster document"))]
    EncodeRendered { source: serde_yaml::Error },

    #[snafu(display("{substructure} must be a mapping document"))]
    DocumentNotAMapping { substructure: &'static str },

    #[snafu(display("cannot splice {substructure}: key {key:?} is missing from the rendered document"))]
    MissingPath {
        substructure: &'static str,
        key: &'static str,
    },

    #[snafu(display("cannot splice {substructure}: its parent node is not a mapping"))]
    ParentNotAMapping { substructure: &'static str },
}

/// Renders the engine's cluster document: typed serialization followed by
/// splicing of the untagged substructures.
pub fn render_cluster_document(config: &ClusterConfig) -> Result<String> {
    let rendered = serde_yaml::to_string(config).context(SerializeConfigSnafu)?;
    let mut root: Value = serde_yaml::from_str(&rendered).context(DecodeRenderedSnafu)?;

    let audit_policy = config
        .services
        .kube_api
        .audit_log
        .as_ref()
        .and_then(|audit| audit.configuration.as_ref())
        .and_then(|configuration| configuration.policy.as_ref());
    if let Some(policy) = audit_policy {
        let document = prepare_document(AUDIT_LOG_POLICY, policy, "audit.k8s.io/v1", "Policy")?;
        splice(&mut root, AUDIT_LOG_POLICY, &AUDIT_LOG_POLICY_PATH, document)?;
    }

    let rate_limit = config
        .services
        .kube_api
        .event_rate_limit
        .as_ref()
        .and_then(|limit| limit.configuration.as_ref());
    if let Some(configuration) = rate_limit {
        let document = prepare_document(
            EVENT_RATE_LIMIT,
            configuration,
            "eventratelimit.admission.k8s.io/v1alpha1",
            "Configuration",
        )?;
        splice(&mut root, EVENT_RATE_LIMIT, &EVENT_RATE_LIMIT_PATH, document)?;
    }

    let secrets = config
        .services
        .kube_api
        .secrets_encryption_config
        .as_ref()
        .and_then(|secrets| secrets.custom_config.as_ref());
    if let Some(custom) = secrets {
        let document = prepare_document(
            SECRETS_ENCRYPTION,
            custom,
            "apiserver.config.k8s.io/v1",
            "EncryptionConfiguration",
        )?;
        splice(&mut root, SECRETS_ENCRYPTION, &SECRETS_ENCRYPTION_PATH, document)?;
    }

    serde_yaml::to_string(&root).context(EncodeRenderedSnafu)
}

/// Copies a document and injects the default type/version markers when they
/// are absent. The operator's own markers always win.
fn prepare_document(
    substructure: &'static str,
    document: &Document,
    api_version: &str,
    kind: &str,
) -> Result<Value> {
    ensure!(document.is_mapping(), DocumentNotAMappingSnafu { substructure });

    let mut prepared = document.clone();
    ensure_marker(&mut prepared, "apiVersion", api_version);
    ensure_marker(&mut prepared, "kind", kind);
    Ok(prepared)
}

fn ensure_marker(document: &mut Value, key: &str, default: &str) {
    if document.get(key).is_none() {
        if let Some(mapping) = document.as_mapping_mut() {
            mapping.insert(Value::from(key), Value::from(default));
        }
    }
}

fn splice(
    root: &mut Value,
    substructure: &'static str,
    path: &[&'static str],
    document: Value,
) -> Result<()> {
    let (leaf, parents) = path.split_last().expect("splice paths are never empty");

    let mut cursor = &mut *root;
    for key in parents {
        cursor = cursor
            .get_mut(*key)
            .context(MissingPathSnafu { substructure, key: *key })?;
    }

    let parent = cursor
        .as_mapping_mut()
        .context(ParentNotAMappingSnafu { substructure })?;
    parent.insert(Value::from(*leaf), document);
    Ok(())
}
