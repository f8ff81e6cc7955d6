use std::collections::BTreeMap;

use super::Result;
use crate::{
    model::{
        AwsCloudProvider, AwsGlobalOptions, AwsServiceOverride, CloudProvider, VirtualCenter,
        VsphereCloudProvider, VsphereDisk, VsphereGlobalOptions, VsphereNetwork, VsphereWorkspace,
    },
    tree::Tree,
};

pub fn expand_cloud_provider(tree: &Tree) -> Result<CloudProvider> {
    let mut provider = CloudProvider::default();

    if let Some(name) = tree.str("name") {
        provider.name = name.to_owned();
    }
    if let Some(aws) = tree.subtree("aws_cloud_provider") {
        provider.aws_cloud_provider = Some(expand_aws(aws));
    }
    if let Some(vsphere) = tree.subtree("vsphere_cloud_provider") {
        provider.vsphere_cloud_provider = Some(expand_vsphere(vsphere));
    }
    if let Some(custom) = tree.str("custom_cloud_provider") {
        provider.custom_cloud_provider = custom.to_owned();
    }

    Ok(provider)
}

pub fn flatten_cloud_provider(provider: &CloudProvider, prior: &Tree) -> Tree {
    let mut tree = prior.clone();
    let empty = Tree::new();

    tree.set_nonempty("name", &provider.name);
    if let Some(aws) = &provider.aws_cloud_provider {
        let seed = prior.subtree("aws_cloud_provider").unwrap_or(&empty);
        tree.set_nonempty_tree("aws_cloud_provider", flatten_aws(aws, seed));
    }
    if let Some(vsphere) = &provider.vsphere_cloud_provider {
        let seed = prior.subtree("vsphere_cloud_provider").unwrap_or(&empty);
        tree.set_nonempty_tree("vsphere_cloud_provider", flatten_vsphere(vsphere, seed));
    }
    tree.set_nonempty("custom_cloud_provider", &provider.custom_cloud_provider);

    tree
}

fn expand_aws(tree: &Tree) -> AwsCloudProvider {
    let mut aws = AwsCloudProvider::default();

    if let Some(global) = tree.subtree("global") {
        aws.global = expand_aws_global(global);
    }
    // The tree carries overrides as a list; the engine wants them keyed by
    // the service they apply to.
    if let Some(overrides) = tree.subtrees("service_override") {
        aws.service_override = overrides
            .into_iter()
            .map(|entry| {
                let service = entry.str("service").unwrap_or_default().to_owned();
                (service.clone(), expand_aws_override(&service, entry))
            })
            .collect();
    }

    aws
}

fn expand_aws_global(tree: &Tree) -> AwsGlobalOptions {
    let mut global = AwsGlobalOptions::default();
    if let Some(zone) = tree.str("zone") {
        global.zone = zone.to_owned();
    }
    if let Some(vpc) = tree.str("vpc") {
        global.vpc = vpc.to_owned();
    }
    if let Some(subnet) = tree.str("subnet_id") {
        global.subnet_id = subnet.to_owned();
    }
    if let Some(table) = tree.str("route_table_id") {
        global.route_table_id = table.to_owned();
    }
    if let Some(arn) = tree.str("role_arn") {
        global.role_arn = arn.to_owned();
    }
    if let Some(tag) = tree.str("kubernetes_cluster_tag") {
        global.kubernetes_cluster_tag = tag.to_owned();
    }
    if let Some(id) = tree.str("kubernetes_cluster_id") {
        global.kubernetes_cluster_id = id.to_owned();
    }
    if let Some(disable) = tree.bool("disable_security_group_ingress") {
        global.disable_security_group_ingress = disable;
    }
    if let Some(disable) = tree.bool("disable_strict_zone_check") {
        global.disable_strict_zone_check = disable;
    }
    global
}

fn expand_aws_override(service: &str, tree: &Tree) -> AwsServiceOverride {
    let mut entry = AwsServiceOverride {
        service: service.to_owned(),
        ..AwsServiceOverride::default()
    };
    if let Some(region) = tree.str("region") {
        entry.region = region.to_owned();
    }
    if let Some(url) = tree.str("url") {
        entry.url = url.to_owned();
    }
    if let Some(region) = tree.str("signing_region") {
        entry.signing_region = region.to_owned();
    }
    if let Some(method) = tree.str("signing_method") {
        entry.signing_method = method.to_owned();
    }
    if let Some(name) = tree.str("signing_name") {
        entry.signing_name = name.to_owned();
    }
    entry
}

fn flatten_aws(aws: &AwsCloudProvider, prior: &Tree) -> Tree {
    let mut tree = prior.clone();
    let empty = Tree::new();

    let seed = prior.subtree("global").unwrap_or(&empty);
    tree.set_nonempty_tree("global", flatten_aws_global(&aws.global, seed));

    // Keyed map back to a list, in sorted key order for determinism.
    let overrides = aws
        .service_override
        .iter()
        .map(|(service, entry)| {
            let mut item = Tree::new();
            item.set_nonempty("service", service);
            item.set_nonempty("region", &entry.region);
            item.set_nonempty("url", &entry.url);
            item.set_nonempty("signing_region", &entry.signing_region);
            item.set_nonempty("signing_method", &entry.signing_method);
            item.set_nonempty("signing_name", &entry.signing_name);
            item
        })
        .collect();
    tree.set_nonempty_trees("service_override", overrides);

    tree
}

fn flatten_aws_global(global: &AwsGlobalOptions, prior: &Tree) -> Tree {
    let mut tree = prior.clone();
    tree.set_nonempty("zone", &global.zone);
    tree.set_nonempty("vpc", &global.vpc);
    tree.set_nonempty("subnet_id", &global.subnet_id);
    tree.set_nonempty("route_table_id", &global.route_table_id);
    tree.set_nonempty("role_arn", &global.role_arn);
    tree.set_nonempty("kubernetes_cluster_tag", &global.kubernetes_cluster_tag);
    tree.set_nonempty("kubernetes_cluster_id", &global.kubernetes_cluster_id);
    tree.set_true(
        "disable_security_group_ingress",
        global.disable_security_group_ingress,
    );
    tree.set_true("disable_strict_zone_check", global.disable_strict_zone_check);
    tree
}

fn expand_vsphere(tree: &Tree) -> VsphereCloudProvider {
    let mut vsphere = VsphereCloudProvider::default();

    if let Some(global) = tree.subtree("global") {
        vsphere.global = expand_vsphere_global(global);
    }
    // Virtual centers are keyed by their address, carried in the tree as a
    // `name` field on each list entry.
    if let Some(centers) = tree.subtrees("virtual_center") {
        vsphere.virtual_center = centers
            .into_iter()
            .map(|entry| {
                let name = entry.str("name").unwrap_or_default().to_owned();
                (name, expand_virtual_center(entry))
            })
            .collect();
    }
    if let Some(workspace) = tree.subtree("workspace") {
        vsphere.workspace = expand_vsphere_workspace(workspace);
    }
    if let Some(network) = tree.subtree("network") {
        vsphere.network = VsphereNetwork {
            public_network: network.str("public_network").unwrap_or_default().to_owned(),
        };
    }
    if let Some(disk) = tree.subtree("disk") {
        vsphere.disk = VsphereDisk {
            scsi_controller_type: disk
                .str("scsi_controller_type")
                .unwrap_or_default()
                .to_owned(),
        };
    }

    vsphere
}

fn expand_vsphere_global(tree: &Tree) -> VsphereGlobalOptions {
    let mut global = VsphereGlobalOptions::default();
    if let Some(user) = tree.str("user") {
        global.user = user.to_owned();
    }
    if let Some(password) = tree.str("password") {
        global.password = password.to_owned();
    }
    if let Some(port) = tree.str("port") {
        global.port = port.to_owned();
    }
    if let Some(datacenters) = tree.str("datacenters") {
        global.datacenters = datacenters.to_owned();
    }
    if let Some(insecure) = tree.bool("insecure_flag") {
        global.insecure_flag = insecure;
    }
    global
}

fn expand_virtual_center(tree: &Tree) -> VirtualCenter {
    let mut center = VirtualCenter::default();
    if let Some(user) = tree.str("user") {
        center.user = user.to_owned();
    }
    if let Some(password) = tree.str("password") {
        center.password = password.to_owned();
    }
    if let Some(port) = tree.str("port") {
        center.port = port.to_owned();
    }
    if let Some(datacenters) = tree.str("datacenters") {
        center.datacenters = datacenters.to_owned();
    }
    center
}

fn expand_vsphere_workspace(tree: &Tree) -> VsphereWorkspace {
    let mut workspace = VsphereWorkspace::default();
    if let Some(server) = tree.str("server") {
        workspace.server = server.to_owned();
    }
    if let Some(datacenter) = tree.str("datacenter") {
        workspace.datacenter = datacenter.to_owned();
    }
    if let Some(folder) = tree.str("folder") {
        workspace.folder = folder.to_owned();
    }
    if let Some(datastore) = tree.str("default_datastore") {
        workspace.default_datastore = datastore.to_owned();
    }
    if let Some(path) = tree.str("resourcepool_path") {
        workspace.resourcepool_path = path.to_owned();
    }
    workspace
}

fn flatten_vsphere(vsphere: &VsphereCloudProvider, prior: &Tree) -> Tree {
    let mut tree = prior.clone();
    let empty = Tree::new();
    let seed = |key: &str| prior.subtree(key).unwrap_or(&empty).clone();

    let mut global = seed("global");
    global.set_nonempty("user", &vsphere.global.user);
    global.set_nonempty("password", &vsphere.global.password);
    global.set_nonempty("port", &vsphere.global.port);
    global.set_nonempty("datacenters", &vsphere.global.datacenters);
    global.set_true("insecure_flag", vsphere.global.insecure_flag);
    tree.set_nonempty_tree("global", global);

    let centers = flatten_virtual_centers(&vsphere.virtual_center);
    tree.set_nonempty_trees("virtual_center", centers);

    let mut workspace = seed("workspace");
    workspace.set_nonempty("server", &vsphere.workspace.server);
    workspace.set_nonempty("datacenter", &vsphere.workspace.datacenter);
    workspace.set_nonempty("folder", &vsphere.workspace.folder);
    workspace.set_nonempty("default_datastore", &vsphere.workspace.default_datastore);
    workspace.set_nonempty("resourcepool_path", &vsphere.workspace.resourcepool_path);
    tree.set_nonempty_tree("workspace", workspace);

    let mut network = seed("network");
    network.set_nonempty("public_network", &vsphere.network.public_network);
    tree.set_nonempty_tree("network", network);

    let mut disk = seed("disk");
    disk.set_nonempty("scsi_controller_type", &vsphere.disk.scsi_controller_type);
    tree.set_nonempty_tree("disk", disk);

    tree
}

fn flatten_virtual_centers(centers: &BTreeMap<String, VirtualCenter>) -> Vec<Tree> {
    centers
        .iter()
        .map(|(name, center)| {
            let mut item = Tree::new();
            item.set_nonempty("name", name);
            item.set_nonempty("user", &center.user);
            item.set_nonempty("password", &center.password);
            item.set_nonempty("port", &center.port);
            item.set_nonempty("datacenters", &center.datacenters);
            item
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;

    #[test]
    fn aws_overrides_are_keyed_by_service_and_flattened_sorted() {
        let tree = Tree::from_yaml_str(indoc! {"
            name: aws
            aws_cloud_provider:
              global:
                zone: eu-central-1a
              service_override:
                - service: s3
                  region: eu-central-1
                - service: ec2
                  url: https://vpce.example.com
        "})
        .expect("fixture parses");

        let provider = expand_cloud_provider(&tree).expect("provider expands");
        let aws = provider.aws_cloud_provider.as_ref().expect("aws present");
        assert_eq!(aws.service_override.len(), 2);
        assert_eq!(aws.service_override["ec2"].url, "https://vpce.example.com");
        assert_eq!(aws.service_override["s3"].region, "eu-central-1");

        let flattened = flatten_cloud_provider(&provider, &Tree::new());
        let services = flattened
            .subtree("aws_cloud_provider")
            .and_then(|aws| aws.subtrees("service_override"))
            .expect("overrides present")
            .iter()
            .map(|entry| entry.str("service").expect("service key present").to_owned())
            .collect::<Vec<_>>();
        assert_eq!(services, ["ec2", "s3"]);
    }

    #[test]
    fn virtual_centers_are_keyed_by_name() {
        let tree = Tree::from_yaml_str(indoc! {"
            name: vsphere
            vsphere_cloud_provider:
              virtual_center:
                - name: vc2.example.com
                  user: svc
                - name: vc1.example.com
                  user: svc
              workspace:
                server: vc1.example.com
                datacenter: dc0
        "})
        .expect("fixture parses");

        let provider = expand_cloud_provider(&tree).expect("provider expands");
        let vsphere = provider
            .vsphere_cloud_provider
            .as_ref()
            .expect("vsphere present");
        assert_eq!(vsphere.virtual_center.len(), 2);
        assert!(vsphere.virtual_center.contains_key("vc1.example.com"));

        let flattened = flatten_cloud_provider(&provider, &Tree::new());
        let names = flattened
            .subtree("vsphere_cloud_provider")
            .and_then(|vsphere| vsphere.subtrees("virtual_center"))
            .expect("centers present")
            .iter()
            .map(|entry| entry.str("name").expect("name key present").to_owned())
            .collect::<Vec<_>>();
        assert_eq!(names, ["vc1.example.com", "vc2.example.com"]);
    }

    #[test]
    fn nested_vsphere_members_survive_flattening() {
        let tree = Tree::from_yaml_str(indoc! {"
            name: vsphere
            vsphere_cloud_provider:
              workspace:
                server: vc1.example.com
                vm_name: template-0
              disk:
                scsi_controller_type: pvscsi
        "})
        .expect("fixture parses");

        let provider = expand_cloud_provider(&tree).expect("provider expands");
        let flattened = flatten_cloud_provider(&provider, &tree);
        assert_eq!(flattened, tree);
    }

    #[test]
    fn custom_provider_text_round_trips() {
        let tree = Tree::from_yaml_str(
            "name: custom\ncustom_cloud_provider: \"[Global]\\nuser = svc\\n\"\n",
        )
        .expect("fixture parses");

        let provider = expand_cloud_provider(&tree).expect("provider expands");
        assert!(provider.custom_cloud_provider.starts_with("[Global]"));

        let flattened = flatten_cloud_provider(&provider, &Tree::new());
        assert_eq!(flattened, tree);
    }
}
