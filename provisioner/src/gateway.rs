//! Access to the cluster control plane.
//!
//! The orchestrators only ever create, list and delete. [`ClusterGateway`] is the
//! seam they talk to, [`KubeGateway`] implements it on top of a kube [`Client`]
//! scoped to one namespace.

use async_trait::async_trait;
use kube::api::{DeleteParams, DynamicObject, ListParams, PostParams};
use kube::{Api, Client};
use tracing::{debug, instrument};

use crate::models::ResourceKind;

#[async_trait]
pub trait ClusterGateway: Send + Sync {
    /// Creates `object` and returns it as stored by the control plane.
    async fn create(
        &self,
        kind: ResourceKind,
        object: &DynamicObject,
    ) -> Result<DynamicObject, kube::Error>;

    /// Lists objects of `kind` matching `selector`. No matches is an empty list.
    async fn list_by_label(
        &self,
        kind: ResourceKind,
        selector: &str,
    ) -> Result<Vec<DynamicObject>, kube::Error>;

    /// Deletes the object of `kind` named `name`.
    async fn delete(&self, kind: ResourceKind, name: &str) -> Result<(), kube::Error>;
}

/// True when the control plane answered 404.
pub fn is_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(response) if response.code == 404)
}

pub struct KubeGateway {
    client: Client,
    namespace: String,
}

impl KubeGateway {
    pub fn new(client: Client, namespace: impl Into<String>) -> Self {
        KubeGateway {
            client,
            namespace: namespace.into(),
        }
    }

    fn api(&self, kind: ResourceKind) -> Api<DynamicObject> {
        Api::namespaced_with(self.client.clone(), &self.namespace, &kind.api_resource())
    }
}

#[async_trait]
impl ClusterGateway for KubeGateway {
    #[instrument(skip(self, object), fields(namespace = %self.namespace))]
    async fn create(
        &self,
        kind: ResourceKind,
        object: &DynamicObject,
    ) -> Result<DynamicObject, kube::Error> {
        debug!("creating {}", kind);
        self.api(kind).create(&PostParams::default(), object).await
    }

    #[instrument(skip(self), fields(namespace = %self.namespace))]
    async fn list_by_label(
        &self,
        kind: ResourceKind,
        selector: &str,
    ) -> Result<Vec<DynamicObject>, kube::Error> {
        let list = self
            .api(kind)
            .list(&ListParams::default().labels(selector))
            .await?;
        debug!("found {} {} objects", list.items.len(), kind);
        Ok(list.items)
    }

    #[instrument(skip(self), fields(namespace = %self.namespace))]
    async fn delete(&self, kind: ResourceKind, name: &str) -> Result<(), kube::Error> {
        self.api(kind)
            .delete(name, &DeleteParams::default())
            .await
            .map(|_| ())
    }
}
