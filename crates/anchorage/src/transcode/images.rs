use super::Result;
use crate::{
    model::{PrivateRegistry, SystemImages},
    tree::Tree,
};

/// The image table is a flat block of identically-shaped string fields; a
/// little macro keeps the field list in one place per direction.
macro_rules! read_image_fields {
    ($tree:ident => $images:ident: $($field:ident),+ $(,)?) => {
        $(
            if let Some(value) = $tree.str(stringify!($field)) {
                $images.$field = value.to_owned();
            }
        )+
    };
}

macro_rules! write_image_fields {
    ($images:ident => $tree:ident: $($field:ident),+ $(,)?) => {
        $(
            $tree.set_nonempty(stringify!($field), &$images.$field);
        )+
    };
}

pub fn expand_system_images(tree: &Tree) -> Result<SystemImages> {
    let mut images = SystemImages::default();
    read_image_fields!(tree => images:
        etcd, alpine, nginx_proxy, cert_downloader, kubernetes_services_sidecar,
        kube_dns, dnsmasq, kube_dns_sidecar, kube_dns_autoscaler, coredns,
        coredns_autoscaler, nodelocal, kubernetes, flannel, flannel_cni,
        calico_node, calico_cni, calico_controllers, canal_node, canal_cni,
        canal_flannel, weave_node, weave_cni, pod_infra_container, ingress,
        ingress_backend, metrics_server, windows_pod_infra_container,
    );
    Ok(images)
}

pub fn flatten_system_images(images: &SystemImages, prior: &Tree) -> Tree {
    let mut tree = prior.clone();
    write_image_fields!(images => tree:
        etcd, alpine, nginx_proxy, cert_downloader, kubernetes_services_sidecar,
        kube_dns, dnsmasq, kube_dns_sidecar, kube_dns_autoscaler, coredns,
        coredns_autoscaler, nodelocal, kubernetes, flannel, flannel_cni,
        calico_node, calico_cni, calico_controllers, canal_node, canal_cni,
        canal_flannel, weave_node, weave_cni, pod_infra_container, ingress,
        ingress_backend, metrics_server, windows_pod_infra_container,
    );
    tree
}

pub fn expand_private_registries(trees: &[&Tree]) -> Result<Vec<PrivateRegistry>> {
    Ok(trees
        .iter()
        .map(|tree| {
            let mut registry = PrivateRegistry::default();
            if let Some(url) = tree.str("url") {
                registry.url = url.to_owned();
            }
            if let Some(user) = tree.str("user") {
                registry.user = user.to_owned();
            }
            if let Some(password) = tree.str("password") {
                registry.password = password.to_owned();
            }
            if let Some(default) = tree.bool("is_default") {
                registry.is_default = default;
            }
            registry
        })
        .collect())
}

pub fn flatten_private_registries(registries: &[PrivateRegistry]) -> Vec<Tree> {
    registries
        .iter()
        .map(|registry| {
            let mut tree = Tree::new();
            tree.set_nonempty("url", &registry.url);
            tree.set_nonempty("user", &registry.user);
            tree.set_nonempty("password", &registry.password);
            tree.set_true("is_default", registry.is_default);
            tree
        })
        .collect()
}
