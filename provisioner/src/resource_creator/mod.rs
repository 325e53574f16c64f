use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::serde::Serialize;
use kube::api::DynamicObject;
use kube::api::Resource;
use kube::discovery::ApiResource;
use kube::ResourceExt;

use crate::config::SiteConfig;
use crate::models::ResourceKind;
use crate::{Error, Result};

mod deployment;
mod ingress;
mod service;

pub use deployment::{build_workload, workload_selector_token};
pub use ingress::{build_route, tls_secret_name};
pub use service::build_service;

pub const APP_LABEL: &str = "app";
pub const SITE_ID_LABEL: &str = "site-id";
pub const WORKLOAD_SELECTOR_KEY: &str = "workload.user.cattle.io/workloadselector";
pub const CLUSTER_ISSUER_ANNOTATION: &str = "cert-manager.io/cluster-issuer";
pub const SITE_PORT: i32 = 8000;

/// Labels shared by the workload, service and ingress of one site.
pub fn site_labels(identity: &str, site_id: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (APP_LABEL.to_string(), identity.to_string()),
        (SITE_ID_LABEL.to_string(), site_id.to_string()),
    ])
}

/// Label selector matching every resource of the site named `identity`.
pub fn app_selector(identity: &str) -> String {
    format!("{}={}", APP_LABEL, identity)
}

fn object_meta(config: &SiteConfig, labels: BTreeMap<String, String>) -> ObjectMeta {
    ObjectMeta {
        namespace: Some(config.namespace.clone()),
        labels: Some(labels),
        ..Default::default()
    }
}

pub fn to_dynamic_object<K: Resource + ResourceExt + Serialize>(
    kind: ResourceKind,
    resource: K,
) -> Result<DynamicObject>
where
    K::DynamicType: Default,
{
    let mut dynamic_object = DynamicObject::new(
        resource.name_any().as_str(),
        &ApiResource::erase::<K>(&Default::default()),
    );

    dynamic_object.metadata = resource.meta().clone();
    dynamic_object.data = serde_json::to_value(resource)
        .map_err(|source| Error::Serialization { kind, source })?;

    if let Some(data) = dynamic_object.data.as_object_mut() {
        data.remove("kind");
        data.remove("apiVersion");
        data.remove("metadata");
    }

    Ok(dynamic_object)
}
