use std::collections::BTreeMap;

use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule,
    IngressServiceBackend, IngressSpec, IngressTLS, ServiceBackendPort,
};

use crate::config::SiteConfig;
use crate::resource_creator::{object_meta, site_labels, CLUSTER_ISSUER_ANNOTATION, SITE_PORT};

/// Secret cert-manager stores the certificate for `domain_name` in.
pub fn tls_secret_name(domain_name: &str) -> String {
    format!("letsencrypt-{}", domain_name)
}

/// Ingress routing `domain_name` to the service named `service_name`.
pub fn build_route(
    config: &SiteConfig,
    identity: &str,
    site_id: &str,
    domain_name: &str,
    service_name: &str,
) -> Ingress {
    let mut metadata = object_meta(config, site_labels(identity, site_id));
    metadata.generate_name = Some("ingress-".to_string());
    metadata.annotations = Some(BTreeMap::from([(
        CLUSTER_ISSUER_ANNOTATION.to_string(),
        config.cluster_issuer.clone(),
    )]));

    Ingress {
        metadata,
        spec: Some(IngressSpec {
            rules: Some(vec![IngressRule {
                host: Some(domain_name.to_string()),
                http: Some(HTTPIngressRuleValue {
                    paths: vec![HTTPIngressPath {
                        backend: IngressBackend {
                            resource: None,
                            service: Some(IngressServiceBackend {
                                name: service_name.to_string(),
                                port: Some(ServiceBackendPort {
                                    name: None,
                                    number: Some(SITE_PORT),
                                }),
                            }),
                        },
                        path: Some("/".to_string()),
                        path_type: "Prefix".to_string(),
                    }],
                }),
            }]),
            tls: Some(vec![IngressTLS {
                hosts: Some(vec![domain_name.to_string()]),
                secret_name: Some(tls_secret_name(domain_name)),
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}
