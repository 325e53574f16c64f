use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{Service, ServicePort, ServiceSpec};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

use crate::config::SiteConfig;
use crate::resource_creator::{object_meta, site_labels, SITE_PORT, WORKLOAD_SELECTOR_KEY};

/// Service port names are IANA service names, at most 15 characters.
const PORT_NAME: &str = "http";

/// ClusterIP service in front of the site workload.
///
/// `workload_selector` is the annotation read back from the created deployment,
/// it is passed through unchanged.
pub fn build_service(
    config: &SiteConfig,
    identity: &str,
    site_id: &str,
    workload_selector: Option<&str>,
) -> Service {
    let labels = site_labels(identity, site_id);
    let mut metadata = object_meta(config, labels.clone());
    metadata.generate_name = Some("service-".to_string());
    metadata.annotations = workload_selector.map(|token| {
        BTreeMap::from([(WORKLOAD_SELECTOR_KEY.to_string(), token.to_string())])
    });

    Service {
        metadata,
        spec: Some(ServiceSpec {
            selector: Some(labels),
            ports: Some(vec![ServicePort {
                name: Some(PORT_NAME.to_string()),
                port: SITE_PORT,
                protocol: Some("TCP".to_string()),
                target_port: Some(IntOrString::Int(SITE_PORT)),
                ..Default::default()
            }]),
            type_: Some("ClusterIP".to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }
}
