use snafu::ResultExt;

use super::{InvalidClusterDomainSnafu, Result, document_text, parse_document};
use crate::{
    model::{
        AuditLog, AuditLogConfig, BackupConfig, BaseService, Etcd, EventRateLimit, KubeApi,
        KubeController, Kubelet, Kubeproxy, S3BackupConfig, Scheduler, SecretsEncryptionConfig,
        Services,
    },
    tree::Tree,
    validation,
};

pub fn expand_services(tree: &Tree) -> Result<Services> {
    let mut services = Services::default();

    if let Some(etcd) = tree.subtree("etcd") {
        services.etcd = expand_etcd(etcd);
    }
    if let Some(kube_api) = tree.subtree("kube_api") {
        services.kube_api = expand_kube_api(kube_api)?;
    }
    if let Some(kube_controller) = tree.subtree("kube_controller") {
        services.kube_controller = expand_kube_controller(kube_controller);
    }
    if let Some(scheduler) = tree.subtree("scheduler") {
        services.scheduler = Scheduler {
            base: expand_base(scheduler),
        };
    }
    if let Some(kubelet) = tree.subtree("kubelet") {
        services.kubelet = expand_kubelet(kubelet)?;
    }
    if let Some(kubeproxy) = tree.subtree("kubeproxy") {
        services.kubeproxy = Kubeproxy {
            base: expand_base(kubeproxy),
        };
    }

    Ok(services)
}

pub fn flatten_services(services: &Services, prior: &Tree) -> Tree {
    let mut tree = prior.clone();
    let empty = Tree::new();
    let seed = |key: &str| prior.subtree(key).unwrap_or(&empty);

    tree.set_nonempty_tree("etcd", flatten_etcd(&services.etcd, seed("etcd")));
    tree.set_nonempty_tree("kube_api", flatten_kube_api(&services.kube_api, seed("kube_api")));
    tree.set_nonempty_tree(
        "kube_controller",
        flatten_kube_controller(&services.kube_controller, seed("kube_controller")),
    );
    tree.set_nonempty_tree(
        "scheduler",
        flatten_base_only(&services.scheduler.base, seed("scheduler")),
    );
    tree.set_nonempty_tree("kubelet", flatten_kubelet(&services.kubelet, seed("kubelet")));
    tree.set_nonempty_tree(
        "kubeproxy",
        flatten_base_only(&services.kubeproxy.base, seed("kubeproxy")),
    );

    tree
}

fn expand_base(tree: &Tree) -> BaseService {
    let mut base = BaseService::default();
    if let Some(image) = tree.str("image") {
        base.image = image.to_owned();
    }
    if let Some(args) = tree.string_map("extra_args") {
        base.extra_args = args;
    }
    if let Some(binds) = tree.string_list("extra_binds") {
        base.extra_binds = binds;
    }
    if let Some(env) = tree.string_list("extra_env") {
        base.extra_env = env;
    }
    base
}

fn flatten_base(base: &BaseService, tree: &mut Tree) {
    tree.set_nonempty("image", &base.image);
    tree.set_nonempty_map("extra_args", &base.extra_args);
    tree.set_nonempty_list("extra_binds", &base.extra_binds);
    tree.set_nonempty_list("extra_env", &base.extra_env);
}

fn flatten_base_only(base: &BaseService, prior: &Tree) -> Tree {
    let mut tree = prior.clone();
    flatten_base(base, &mut tree);
    tree
}

fn expand_etcd(tree: &Tree) -> Etcd {
    let mut etcd = Etcd {
        base: expand_base(tree),
        ..Etcd::default()
    };

    if let Some(urls) = tree.string_list("external_urls") {
        etcd.external_urls = urls;
    }
    if let Some(cert) = tree.str("ca_cert") {
        etcd.ca_cert = cert.to_owned();
    }
    if let Some(cert) = tree.str("cert") {
        etcd.cert = cert.to_owned();
    }
    if let Some(key) = tree.str("key") {
        etcd.key = key.to_owned();
    }
    if let Some(path) = tree.str("path") {
        etcd.path = path.to_owned();
    }
    if let Some(uid) = tree.int("uid") {
        etcd.uid = uid;
    }
    if let Some(gid) = tree.int("gid") {
        etcd.gid = gid;
    }
    etcd.snapshot = tree.bool("snapshot");
    if let Some(retention) = tree.str("retention") {
        etcd.retention = retention.to_owned();
    }
    if let Some(creation) = tree.str("creation") {
        etcd.creation = creation.to_owned();
    }
    if let Some(backup) = tree.subtree("backup_config") {
        etcd.backup_config = Some(expand_backup_config(backup));
    }

    etcd
}

fn flatten_etcd(etcd: &Etcd, prior: &Tree) -> Tree {
    let mut tree = prior.clone();
    flatten_base(&etcd.base, &mut tree);

    tree.set_nonempty_list("external_urls", &etcd.external_urls);
    tree.set_nonempty("ca_cert", &etcd.ca_cert);
    tree.set_nonempty("cert", &etcd.cert);
    tree.set_nonempty("key", &etcd.key);
    tree.set_nonempty("path", &etcd.path);
    // Zero uid/gid means the engine keeps the image user and must not
    // round-trip into the tree.
    tree.set_positive("uid", etcd.uid);
    tree.set_positive("gid", etcd.gid);
    tree.set_tristate("snapshot", etcd.snapshot);
    tree.set_nonempty("retention", &etcd.retention);
    tree.set_nonempty("creation", &etcd.creation);
    if let Some(backup) = &etcd.backup_config {
        let empty = Tree::new();
        let seed = prior.subtree("backup_config").unwrap_or(&empty);
        tree.set_nonempty_tree("backup_config", flatten_backup_config(backup, seed));
    }

    tree
}

fn expand_backup_config(tree: &Tree) -> BackupConfig {
    let mut backup = BackupConfig::default();
    if let Some(hours) = tree.int("interval_hours") {
        backup.interval_hours = hours;
    }
    if let Some(retention) = tree.int("retention") {
        backup.retention = retention;
    }
    backup.enabled = tree.bool("enabled");
    if let Some(safe) = tree.bool("safe_timestamp") {
        backup.safe_timestamp = safe;
    }
    if let Some(timeout) = tree.int("timeout") {
        backup.timeout = timeout;
    }
    if let Some(s3) = tree.subtree("s3_backup_config") {
        backup.s3_backup_config = Some(expand_s3_backup_config(s3));
    }
    backup
}

fn flatten_backup_config(backup: &BackupConfig, prior: &Tree) -> Tree {
    let mut tree = prior.clone();
    tree.set_positive("interval_hours", backup.interval_hours);
    tree.set_positive("retention", backup.retention);
    tree.set_tristate("enabled", backup.enabled);
    tree.set_true("safe_timestamp", backup.safe_timestamp);
    tree.set_positive("timeout", backup.timeout);
    if let Some(s3) = &backup.s3_backup_config {
        let empty = Tree::new();
        let seed = prior.subtree("s3_backup_config").unwrap_or(&empty);
        tree.set_nonempty_tree("s3_backup_config", flatten_s3_backup_config(s3, seed));
    }
    tree
}

fn expand_s3_backup_config(tree: &Tree) -> S3BackupConfig {
    let mut s3 = S3BackupConfig::default();
    if let Some(key) = tree.str("access_key") {
        s3.access_key = key.to_owned();
    }
    if let Some(key) = tree.str("secret_key") {
        s3.secret_key = key.to_owned();
    }
    if let Some(bucket) = tree.str("bucket_name") {
        s3.bucket_name = bucket.to_owned();
    }
    if let Some(region) = tree.str("region") {
        s3.region = region.to_owned();
    }
    if let Some(endpoint) = tree.str("endpoint") {
        s3.endpoint = endpoint.to_owned();
    }
    if let Some(ca) = tree.str("custom_ca") {
        s3.custom_ca = ca.to_owned();
    }
    if let Some(folder) = tree.str("folder") {
        s3.folder = folder.to_owned();
    }
    s3
}

fn flatten_s3_backup_config(s3: &S3BackupConfig, prior: &Tree) -> Tree {
    let mut tree = prior.clone();
    tree.set_nonempty("access_key", &s3.access_key);
    tree.set_nonempty("secret_key", &s3.secret_key);
    tree.set_nonempty("bucket_name", &s3.bucket_name);
    tree.set_nonempty("region", &s3.region);
    tree.set_nonempty("endpoint", &s3.endpoint);
    tree.set_nonempty("custom_ca", &s3.custom_ca);
    tree.set_nonempty("folder", &s3.folder);
    tree
}

fn expand_kube_api(tree: &Tree) -> Result<KubeApi> {
    let mut service = KubeApi {
        base: expand_base(tree),
        ..KubeApi::default()
    };

    if let Some(range) = tree.str("service_cluster_ip_range") {
        service.service_cluster_ip_range = range.to_owned();
    }
    if let Some(range) = tree.str("service_node_port_range") {
        service.service_node_port_range = range.to_owned();
    }
    if let Some(psp) = tree.bool("pod_security_policy") {
        service.pod_security_policy = psp;
    }
    if let Some(pull) = tree.bool("always_pull_images") {
        service.always_pull_images = pull;
    }
    if let Some(secrets) = tree.subtree("secrets_encryption_config") {
        service.secrets_encryption_config = Some(expand_secrets_encryption(secrets)?);
    }
    if let Some(audit) = tree.subtree("audit_log") {
        service.audit_log = Some(expand_audit_log(audit)?);
    }
    if let Some(limit) = tree.subtree("event_rate_limit") {
        service.event_rate_limit = Some(expand_event_rate_limit(limit)?);
    }

    Ok(service)
}

fn flatten_kube_api(service: &KubeApi, prior: &Tree) -> Tree {
    let mut tree = prior.clone();
    let empty = Tree::new();
    flatten_base(&service.base, &mut tree);

    tree.set_nonempty("service_cluster_ip_range", &service.service_cluster_ip_range);
    tree.set_nonempty("service_node_port_range", &service.service_node_port_range);
    tree.set_true("pod_security_policy", service.pod_security_policy);
    tree.set_true("always_pull_images", service.always_pull_images);
    if let Some(secrets) = &service.secrets_encryption_config {
        let seed = prior.subtree("secrets_encryption_config").unwrap_or(&empty);
        tree.set_nonempty_tree(
            "secrets_encryption_config",
            flatten_secrets_encryption(secrets, seed),
        );
    }
    if let Some(audit) = &service.audit_log {
        let seed = prior.subtree("audit_log").unwrap_or(&empty);
        tree.set_nonempty_tree("audit_log", flatten_audit_log(audit, seed));
    }
    if let Some(limit) = &service.event_rate_limit {
        let seed = prior.subtree("event_rate_limit").unwrap_or(&empty);
        tree.set_nonempty_tree("event_rate_limit", flatten_event_rate_limit(limit, seed));
    }

    tree
}

fn expand_secrets_encryption(tree: &Tree) -> Result<SecretsEncryptionConfig> {
    let mut config = SecretsEncryptionConfig::default();
    if let Some(enabled) = tree.bool("enabled") {
        config.enabled = enabled;
    }
    if let Some(text) = tree.str("custom_config") {
        config.custom_config = Some(parse_document("secrets encryption custom config", text)?);
    }
    Ok(config)
}

fn flatten_secrets_encryption(config: &SecretsEncryptionConfig, prior: &Tree) -> Tree {
    let mut tree = prior.clone();
    tree.set_true("enabled", config.enabled);
    if let Some(document) = &config.custom_config {
        tree.set_nonempty("custom_config", &document_text(document));
    }
    tree
}

fn expand_audit_log(tree: &Tree) -> Result<AuditLog> {
    let mut audit = AuditLog::default();
    if let Some(enabled) = tree.bool("enabled") {
        audit.enabled = enabled;
    }
    if let Some(configuration) = tree.subtree("configuration") {
        audit.configuration = Some(expand_audit_log_config(configuration)?);
    }
    Ok(audit)
}

fn expand_audit_log_config(tree: &Tree) -> Result<AuditLogConfig> {
    let mut config = AuditLogConfig::default();
    if let Some(age) = tree.int("max_age") {
        config.max_age = age;
    }
    if let Some(backup) = tree.int("max_backup") {
        config.max_backup = backup;
    }
    if let Some(size) = tree.int("max_size") {
        config.max_size = size;
    }
    if let Some(path) = tree.str("path") {
        config.path = path.to_owned();
    }
    if let Some(format) = tree.str("format") {
        config.format = format.to_owned();
    }
    if let Some(text) = tree.str("policy") {
        config.policy = Some(parse_document("audit log policy", text)?);
    }
    Ok(config)
}

fn flatten_audit_log(audit: &AuditLog, prior: &Tree) -> Tree {
    let mut tree = prior.clone();
    tree.set_true("enabled", audit.enabled);
    if let Some(configuration) = &audit.configuration {
        let empty = Tree::new();
        let seed = prior.subtree("configuration").unwrap_or(&empty);
        let mut inner = seed.clone();
        inner.set_positive("max_age", configuration.max_age);
        inner.set_positive("max_backup", configuration.max_backup);
        inner.set_positive("max_size", configuration.max_size);
        inner.set_nonempty("path", &configuration.path);
        inner.set_nonempty("format", &configuration.format);
        if let Some(document) = &configuration.policy {
            inner.set_nonempty("policy", &document_text(document));
        }
        tree.set_nonempty_tree("configuration", inner);
    }
    tree
}

fn expand_event_rate_limit(tree: &Tree) -> Result<EventRateLimit> {
    let mut limit = EventRateLimit::default();
    if let Some(enabled) = tree.bool("enabled") {
        limit.enabled = enabled;
    }
    if let Some(text) = tree.str("configuration") {
        limit.configuration = Some(parse_document("event rate limit configuration", text)?);
    }
    Ok(limit)
}

fn flatten_event_rate_limit(limit: &EventRateLimit, prior: &Tree) -> Tree {
    let mut tree = prior.clone();
    tree.set_true("enabled", limit.enabled);
    if let Some(document) = &limit.configuration {
        tree.set_nonempty("configuration", &document_text(document));
    }
    tree
}

fn expand_kube_controller(tree: &Tree) -> KubeController {
    let mut service = KubeController {
        base: expand_base(tree),
        ..KubeController::default()
    };
    if let Some(cidr) = tree.str("cluster_cidr") {
        service.cluster_cidr = cidr.to_owned();
    }
    if let Some(range) = tree.str("service_cluster_ip_range") {
        service.service_cluster_ip_range = range.to_owned();
    }
    service
}

fn flatten_kube_controller(service: &KubeController, prior: &Tree) -> Tree {
    let mut tree = prior.clone();
    flatten_base(&service.base, &mut tree);
    tree.set_nonempty("cluster_cidr", &service.cluster_cidr);
    tree.set_nonempty("service_cluster_ip_range", &service.service_cluster_ip_range);
    tree
}

fn expand_kubelet(tree: &Tree) -> Result<Kubelet> {
    let mut service = Kubelet {
        base: expand_base(tree),
        ..Kubelet::default()
    };

    if let Some(domain) = tree.str("cluster_domain") {
        validation::is_domain(domain).context(InvalidClusterDomainSnafu { value: domain })?;
        service.cluster_domain = domain.to_owned();
    }
    if let Some(image) = tree.str("infra_container_image") {
        service.infra_container_image = image.to_owned();
    }
    if let Some(server) = tree.str("cluster_dns_server") {
        service.cluster_dns_server = server.to_owned();
    }
    if let Some(fail) = tree.bool("fail_swap_on") {
        service.fail_swap_on = fail;
    }
    if let Some(generate) = tree.bool("generate_serving_certificate") {
        service.generate_serving_certificate = generate;
    }

    Ok(service)
}

fn flatten_kubelet(service: &Kubelet, prior: &Tree) -> Tree {
    let mut tree = prior.clone();
    flatten_base(&service.base, &mut tree);
    tree.set_nonempty("cluster_domain", &service.cluster_domain);
    tree.set_nonempty("infra_container_image", &service.infra_container_image);
    tree.set_nonempty("cluster_dns_server", &service.cluster_dns_server);
    tree.set_true("fail_swap_on", service.fail_swap_on);
    tree.set_true("generate_serving_certificate", service.generate_serving_certificate);
    tree
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;

    fn services_tree(document: &str) -> Tree {
        Tree::from_yaml_str(document).expect("fixture is a valid tree document")
    }

    #[test]
    fn etcd_round_trips_with_tri_state_snapshot() {
        let tree = services_tree(indoc! {"
            etcd:
              image: quay.io/coreos/etcd:v3.5
              snapshot: false
              retention: 72h
              uid: 52034
              backup_config:
                interval_hours: 12
                retention: 6
                enabled: true
        "});

        let services = expand_services(&tree).expect("services expand");
        assert_eq!(services.etcd.snapshot, Some(false));
        assert_eq!(services.etcd.uid, 52034);
        assert_eq!(services.etcd.gid, 0);
        let backup = services.etcd.backup_config.as_ref().expect("backup present");
        assert_eq!(backup.enabled, Some(true));

        let flattened = flatten_services(&services, &Tree::new());
        assert_eq!(flattened, tree);
    }

    #[test]
    fn zero_uid_and_gid_stay_absent() {
        let tree = services_tree("etcd:\n  retention: 72h\n");
        let services = expand_services(&tree).expect("services expand");

        let flattened = flatten_services(&services, &Tree::new());
        let etcd = flattened.subtree("etcd").expect("etcd present");
        assert!(!etcd.contains_key("uid"));
        assert!(!etcd.contains_key("gid"));
        assert!(!etcd.contains_key("snapshot"));
    }

    #[test]
    fn audit_log_policy_text_becomes_a_document() {
        let tree = services_tree(indoc! {"
            kube_api:
              audit_log:
                enabled: true
                configuration:
                  max_age: 30
                  format: json
                  policy: |
                    rules:
                      - level: RequestResponse
        "});

        let services = expand_services(&tree).expect("services expand");
        let audit = services.kube_api.audit_log.as_ref().expect("audit log present");
        let policy = audit
            .configuration
            .as_ref()
            .and_then(|configuration| configuration.policy.as_ref())
            .expect("policy document present");
        assert!(policy.get("rules").is_some());
    }

    #[test]
    fn malformed_audit_policy_is_rejected_by_name() {
        let tree = services_tree(indoc! {"
            kube_api:
              audit_log:
                enabled: true
                configuration:
                  policy: '{ unclosed'
        "});

        let err = expand_services(&tree).unwrap_err();
        assert_eq!(
            err.to_string(),
            "audit log policy does not parse as a YAML document"
        );
    }

    #[test]
    fn invalid_cluster_domain_is_rejected() {
        let tree = services_tree("kubelet:\n  cluster_domain: cluster..local\n");
        let err = expand_services(&tree).unwrap_err();
        assert!(err.to_string().contains("cluster_domain"));
    }

    #[test]
    fn flattening_preserves_keys_the_engine_does_not_echo() {
        let prior = services_tree(indoc! {"
            kube_api:
              service_cluster_ip_range: 10.43.0.0/16
              generated_admission_flags: abc
        "});
        let services = expand_services(&prior).expect("services expand");

        let flattened = flatten_services(&services, &prior);
        let kube_api = flattened.subtree("kube_api").expect("kube_api present");
        assert_eq!(kube_api.str("generated_admission_flags"), Some("abc"));
        assert_eq!(kube_api.str("service_cluster_ip_range"), Some("10.43.0.0/16"));
    }
}
