use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::is_default;

/// Cloud provider integration handed through to the kubelet and the
/// controller manager.
///
/// Exactly one of the typed providers (or `custom_cloud_provider` with a
/// raw config) is expected; the engine keys off `name`.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct CloudProvider {
    #[serde(skip_serializing_if = "is_default")]
    pub name: String,

    #[serde(rename = "awsCloudProvider", skip_serializing_if = "is_default")]
    pub aws_cloud_provider: Option<AwsCloudProvider>,

    #[serde(rename = "vsphereCloudProvider", skip_serializing_if = "is_default")]
    pub vsphere_cloud_provider: Option<VsphereCloudProvider>,

    /// Raw provider configuration written verbatim to the hosts.
    #[serde(rename = "customCloudProvider", skip_serializing_if = "is_default")]
    pub custom_cloud_provider: String,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct AwsCloudProvider {
    #[serde(skip_serializing_if = "is_default")]
    pub global: AwsGlobalOptions,

    /// Per-service endpoint overrides, keyed by AWS service name.
    #[serde(skip_serializing_if = "is_default")]
    pub service_override: BTreeMap<String, AwsServiceOverride>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct AwsGlobalOptions {
    #[serde(skip_serializing_if = "is_default")]
    pub zone: String,

    #[serde(skip_serializing_if = "is_default")]
    pub vpc: String,

    #[serde(rename = "subnet-id", skip_serializing_if = "is_default")]
    pub subnet_id: String,

    #[serde(rename = "routetable-id", skip_serializing_if = "is_default")]
    pub route_table_id: String,

    #[serde(rename = "role-arn", skip_serializing_if = "is_default")]
    pub role_arn: String,

    #[serde(rename = "kubernetes-cluster-tag", skip_serializing_if = "is_default")]
    pub kubernetes_cluster_tag: String,

    #[serde(rename = "kubernetes-cluster-id", skip_serializing_if = "is_default")]
    pub kubernetes_cluster_id: String,

    #[serde(
        rename = "disable-security-group-ingress",
        skip_serializing_if = "is_default"
    )]
    pub disable_security_group_ingress: bool,

    #[serde(
        rename = "disable-strict-zone-check",
        skip_serializing_if = "is_default"
    )]
    pub disable_strict_zone_check: bool,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct AwsServiceOverride {
    #[serde(skip_serializing_if = "is_default")]
    pub service: String,

    #[serde(skip_serializing_if = "is_default")]
    pub region: String,

    #[serde(skip_serializing_if = "is_default")]
    pub url: String,

    #[serde(rename = "signing-region", skip_serializing_if = "is_default")]
    pub signing_region: String,

    #[serde(rename = "signing-method", skip_serializing_if = "is_default")]
    pub signing_method: String,

    #[serde(rename = "signing-name", skip_serializing_if = "is_default")]
    pub signing_name: String,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct VsphereCloudProvider {
    #[serde(skip_serializing_if = "is_default")]
    pub global: VsphereGlobalOptions,

    /// One entry per vCenter, keyed by its address.
    #[serde(skip_serializing_if = "is_default")]
    pub virtual_center: BTreeMap<String, VirtualCenter>,

    #[serde(skip_serializing_if = "is_default")]
    pub workspace: VsphereWorkspace,

    #[serde(skip_serializing_if = "is_default")]
    pub network: VsphereNetwork,

    #[serde(skip_serializing_if = "is_default")]
    pub disk: VsphereDisk,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct VsphereGlobalOptions {
    #[serde(skip_serializing_if = "is_default")]
    pub user: String,

    #[serde(skip_serializing_if = "is_default")]
    pub password: String,

    #[serde(skip_serializing_if = "is_default")]
    pub port: String,

    #[serde(skip_serializing_if = "is_default")]
    pub datacenters: String,

    #[serde(rename = "insecure-flag", skip_serializing_if = "is_default")]
    pub insecure_flag: bool,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct VirtualCenter {
    #[serde(skip_serializing_if = "is_default")]
    pub user: String,

    #[serde(skip_serializing_if = "is_default")]
    pub password: String,

    #[serde(skip_serializing_if = "is_default")]
    pub port: String,

    #[serde(skip_serializing_if = "is_default")]
    pub datacenters: String,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct VsphereWorkspace {
    #[serde(skip_serializing_if = "is_default")]
    pub server: String,

    #[serde(skip_serializing_if = "is_default")]
    pub datacenter: String,

    #[serde(skip_serializing_if = "is_default")]
    pub folder: String,

    #[serde(rename = "default-datastore", skip_serializing_if = "is_default")]
    pub default_datastore: String,

    #[serde(rename = "resourcepool-path", skip_serializing_if = "is_default")]
    pub resourcepool_path: String,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct VsphereNetwork {
    #[serde(rename = "public-network", skip_serializing_if = "is_default")]
    pub public_network: String,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct VsphereDisk {
    #[serde(rename = "scsicontrollertype", skip_serializing_if = "is_default")]
    pub scsi_controller_type: String,
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;

    #[test]
    fn provider_sections_use_engine_key_spelling() {
        let provider = CloudProvider {
            name: "vsphere".to_owned(),
            vsphere_cloud_provider: Some(VsphereCloudProvider {
                global: VsphereGlobalOptions {
                    insecure_flag: true,
                    ..VsphereGlobalOptions::default()
                },
                workspace: VsphereWorkspace {
                    default_datastore: "ds0".to_owned(),
                    ..VsphereWorkspace::default()
                },
                ..VsphereCloudProvider::default()
            }),
            ..CloudProvider::default()
        };

        let rendered = serde_yaml::to_string(&provider).expect("provider serializes");
        assert_eq!(
            rendered,
            indoc! {"
                name: vsphere
                vsphereCloudProvider:
                  global:
                    insecure-flag: true
                  workspace:
                    default-datastore: ds0
            "}
        );
    }
}
