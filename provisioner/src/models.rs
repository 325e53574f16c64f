use std::fmt::{Display, Formatter};

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use k8s_openapi::api::networking::v1::Ingress;
use kube::discovery::ApiResource;
use serde::Serialize;

/// The three kinds of cluster resources that make up a site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ResourceKind {
    /// The `Deployment` running the site image.
    Workload,
    /// The `ClusterIP` service in front of the workload.
    Service,
    /// The TLS terminated `Ingress` for the domain.
    Route,
}

impl ResourceKind {
    /// Creation order. Each kind depends on the one before it.
    pub const ALL: [ResourceKind; 3] = [
        ResourceKind::Workload,
        ResourceKind::Service,
        ResourceKind::Route,
    ];

    pub fn api_resource(self) -> ApiResource {
        match self {
            ResourceKind::Workload => ApiResource::erase::<Deployment>(&()),
            ResourceKind::Service => ApiResource::erase::<Service>(&()),
            ResourceKind::Route => ApiResource::erase::<Ingress>(&()),
        }
    }
}

impl Display for ResourceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            ResourceKind::Workload => "deployment",
            ResourceKind::Service => "service",
            ResourceKind::Route => "ingress",
        };
        f.write_str(kind)
    }
}

/// A resource stored in the cluster, identified by kind and actual name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceHandle {
    pub kind: ResourceKind,
    pub name: String,
}

impl ResourceHandle {
    pub fn new(kind: ResourceKind, name: impl Into<String>) -> Self {
        ResourceHandle {
            kind,
            name: name.into(),
        }
    }
}

impl Display for ResourceHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.kind, self.name)
    }
}
