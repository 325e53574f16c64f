use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::{
    Deployment, DeploymentSpec, DeploymentStrategy, RollingUpdateDeployment,
};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, EnvFromSource, LocalObjectReference, PodSpec, PodTemplateSpec,
    SecretEnvSource, SecurityContext,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

use crate::config::SiteConfig;
use crate::resource_creator::{object_meta, site_labels, SITE_PORT, WORKLOAD_SELECTOR_KEY};

const CONTAINER_NAME: &str = "container-0";
const PORT_NAME: &str = "port-0";
const MAX_SURGE: &str = "25%";
const MAX_UNAVAILABLE: &str = "25%";

/// Token the platform uses to select the pods of a workload.
pub fn workload_selector_token(config: &SiteConfig, identity: &str) -> String {
    format!("apps.deployment-{}-{}", config.namespace, identity)
}

/// Deployment running the site image.
///
/// The selector token is set both as a label, which the deployment selects on,
/// and as an annotation, which is echoed onto the service.
pub fn build_workload(config: &SiteConfig, identity: &str, site_id: &str) -> Deployment {
    let token = workload_selector_token(config, identity);
    let mut labels = site_labels(identity, site_id);
    labels.insert(WORKLOAD_SELECTOR_KEY.to_string(), token.clone());

    let mut metadata = object_meta(config, labels.clone());
    metadata.name = Some(format!("{}-deploy", identity));
    metadata.annotations = Some(BTreeMap::from([(
        WORKLOAD_SELECTOR_KEY.to_string(),
        token.clone(),
    )]));

    Deployment {
        metadata,
        spec: Some(DeploymentSpec {
            selector: LabelSelector {
                match_labels: Some(BTreeMap::from([(WORKLOAD_SELECTOR_KEY.to_string(), token)])),
                ..Default::default()
            },
            strategy: Some(DeploymentStrategy {
                type_: Some("RollingUpdate".to_string()),
                rolling_update: Some(RollingUpdateDeployment {
                    max_surge: Some(IntOrString::String(MAX_SURGE.to_string())),
                    max_unavailable: Some(IntOrString::String(MAX_UNAVAILABLE.to_string())),
                }),
            }),
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    ..Default::default()
                }),
                spec: Some(generate_pod_spec(config)),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn generate_pod_spec(config: &SiteConfig) -> PodSpec {
    PodSpec {
        containers: vec![Container {
            name: CONTAINER_NAME.to_string(),
            image: Some(config.image.clone()),
            image_pull_policy: Some("Always".to_string()),
            ports: Some(vec![ContainerPort {
                name: Some(PORT_NAME.to_string()),
                container_port: SITE_PORT,
                protocol: Some("TCP".to_string()),
                ..Default::default()
            }]),
            env_from: Some(generate_env_from(config)),
            security_context: Some(generate_security_context()),
            ..Default::default()
        }],
        image_pull_secrets: Some(vec![LocalObjectReference {
            name: config.image_pull_secret.clone(),
        }]),
        ..Default::default()
    }
}

fn generate_env_from(config: &SiteConfig) -> Vec<EnvFromSource> {
    vec![EnvFromSource {
        secret_ref: Some(SecretEnvSource {
            name: config.env_secret.clone(),
            optional: Some(false),
        }),
        ..Default::default()
    }]
}

fn generate_security_context() -> SecurityContext {
    SecurityContext {
        allow_privilege_escalation: Some(false),
        privileged: Some(false),
        read_only_root_filesystem: Some(false),
        run_as_non_root: Some(true),
        ..Default::default()
    }
}
