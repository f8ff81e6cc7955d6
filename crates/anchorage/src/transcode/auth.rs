use super::{Result, require_member};
use crate::{
    model::{AuthWebhook, Authentication, Authorization},
    tree::Tree,
};

const AUTHENTICATION_STRATEGIES: [&str; 1] = ["x509"];
const AUTHORIZATION_MODES: [&str; 2] = ["none", "rbac"];

pub fn expand_authentication(tree: &Tree) -> Result<Authentication> {
    let mut authentication = Authentication::default();

    if let Some(strategy) = tree.str("strategy") {
        require_member("authentication strategy", strategy, &AUTHENTICATION_STRATEGIES)?;
        authentication.strategy = strategy.to_owned();
    }
    if let Some(sans) = tree.string_list("sans") {
        authentication.sans = sans;
    }
    if let Some(webhook) = tree.subtree("webhook") {
        let mut hook = AuthWebhook::default();
        if let Some(config) = webhook.str("config_file") {
            hook.config_file = config.to_owned();
        }
        if let Some(timeout) = webhook.str("cache_timeout") {
            hook.cache_timeout = timeout.to_owned();
        }
        authentication.webhook = Some(hook);
    }

    Ok(authentication)
}

pub fn flatten_authentication(authentication: &Authentication, prior: &Tree) -> Tree {
    let mut tree = prior.clone();

    tree.set_nonempty("strategy", &authentication.strategy);
    tree.set_nonempty_list("sans", &authentication.sans);
    if let Some(webhook) = &authentication.webhook {
        let mut hook = Tree::new();
        hook.set_nonempty("config_file", &webhook.config_file);
        hook.set_nonempty("cache_timeout", &webhook.cache_timeout);
        tree.set("webhook", hook);
    }

    tree
}

pub fn expand_authorization(tree: &Tree) -> Result<Authorization> {
    let mut authorization = Authorization::default();

    if let Some(mode) = tree.str("mode") {
        require_member("authorization mode", mode, &AUTHORIZATION_MODES)?;
        authorization.mode = mode.to_owned();
    }
    if let Some(options) = tree.string_map("options") {
        authorization.options = options;
    }

    Ok(authorization)
}

pub fn flatten_authorization(authorization: &Authorization, prior: &Tree) -> Tree {
    let mut tree = prior.clone();
    tree.set_nonempty("mode", &authorization.mode);
    tree.set_nonempty_map("options", &authorization.options);
    tree
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::authn(
        "strategy: webhook",
        "authentication strategy \"webhook\" is invalid, must be one of [x509]"
    )]
    fn unknown_strategies_are_rejected(#[case] document: &str, #[case] message: &str) {
        let tree = Tree::from_yaml_str(document).expect("fixture parses");
        let err = expand_authentication(&tree).unwrap_err();
        assert_eq!(err.to_string(), message);
    }

    #[test]
    fn unknown_modes_are_rejected() {
        let tree = Tree::from_yaml_str("mode: abac\n").expect("fixture parses");
        let err = expand_authorization(&tree).unwrap_err();
        assert_eq!(
            err.to_string(),
            "authorization mode \"abac\" is invalid, must be one of [none rbac]"
        );
    }

    #[test]
    fn webhook_round_trips() {
        let tree = Tree::from_yaml_str(
            "strategy: x509\nsans: [lb.example.com]\nwebhook:\n  cache_timeout: 5s\n",
        )
        .expect("fixture parses");

        let authentication = expand_authentication(&tree).expect("authentication expands");
        assert_eq!(
            authentication.webhook,
            Some(AuthWebhook {
                cache_timeout: "5s".to_owned(),
                ..AuthWebhook::default()
            })
        );

        let flattened = flatten_authentication(&authentication, &Tree::new());
        assert_eq!(flattened, tree);
    }
}
