use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use k8s_openapi::serde::Serialize;
use kube::api::{DynamicObject, Resource};
use kube::ResourceExt;
use tracing::{error, info, instrument, warn};

use api::SiteRequest;

use crate::gateway::{is_not_found, ClusterGateway};
use crate::identity::{validate_label_value, validate_request};
use crate::models::{ResourceHandle, ResourceKind};
use crate::resource_creator::{
    app_selector, build_route, build_service, build_workload, to_dynamic_object,
    workload_selector_token, WORKLOAD_SELECTOR_KEY,
};
use crate::{Context, Error, Result};

/// The resources created for one site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionedSite {
    pub identity: String,
    pub workload: ResourceHandle,
    pub service: ResourceHandle,
    pub route: ResourceHandle,
}

/// Identities currently being provisioned by this process.
#[derive(Debug, Default)]
pub struct SiteClaims {
    claimed: Mutex<HashSet<String>>,
}

impl SiteClaims {
    /// Claims `identity` until the returned guard is dropped.
    /// Returns `None` if it is already claimed.
    pub fn try_claim(&self, identity: &str) -> Option<SiteClaim<'_>> {
        let mut claimed = self.claimed.lock().unwrap_or_else(|e| e.into_inner());
        if !claimed.insert(identity.to_string()) {
            return None;
        }
        Some(SiteClaim {
            claims: self,
            identity: identity.to_string(),
        })
    }

    #[cfg(test)]
    pub(crate) fn is_claimed(&self, identity: &str) -> bool {
        self.claimed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(identity)
    }
}

pub struct SiteClaim<'a> {
    claims: &'a SiteClaims,
    identity: String,
}

impl Drop for SiteClaim<'_> {
    fn drop(&mut self) {
        self.claims
            .claimed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.identity);
    }
}

/// Creates the workload, service and ingress of a site, in that order.
///
/// Stops at the first failing step and deletes whatever was already created
/// before reporting the error. If the call is cancelled halfway, the deletes are
/// spawned onto the runtime instead.
#[instrument(skip(ctx, request), fields(domain = %request.domain_name, site_id = %request.site_id))]
pub async fn provision(ctx: &Context, request: &SiteRequest) -> Result<ProvisionedSite> {
    let identity = validate_request(request)?;
    validate_label_value(
        WORKLOAD_SELECTOR_KEY,
        &workload_selector_token(&ctx.config, &identity),
    )?;

    let _claim = ctx
        .claims
        .try_claim(&identity)
        .ok_or_else(|| Error::AlreadyExists {
            identity: identity.clone(),
        })?;
    ensure_absent(ctx.gateway.as_ref(), &identity).await?;

    let mut rollback = Rollback::new(ctx.gateway.clone());
    match create_site(ctx, request, &identity, &mut rollback).await {
        Ok(site) => {
            rollback.commit();
            info!(identity = %site.identity, "site provisioned");
            Ok(site)
        }
        Err(e) => {
            error!(error = %e, "provisioning {} failed, removing {} created resources", identity, rollback.created.len());
            rollback.run().await;
            Err(e)
        }
    }
}

async fn ensure_absent(gateway: &dyn ClusterGateway, identity: &str) -> Result<()> {
    let selector = app_selector(identity);
    for kind in ResourceKind::ALL {
        let existing = gateway
            .list_by_label(kind, &selector)
            .await
            .map_err(|source| {
                error!(%kind, %selector, error = %source, "lookup failed");
                Error::Kube {
                    operation: "list",
                    kind,
                    target: selector.clone(),
                    source,
                }
            })?;
        if !existing.is_empty() {
            warn!(%kind, %selector, "site already has {} {} objects", existing.len(), kind);
            return Err(Error::AlreadyExists {
                identity: identity.to_string(),
            });
        }
    }
    Ok(())
}

async fn create_site(
    ctx: &Context,
    request: &SiteRequest,
    identity: &str,
    created: &mut Rollback,
) -> Result<ProvisionedSite> {
    let gateway = ctx.gateway.as_ref();

    let deployment = build_workload(&ctx.config, identity, &request.site_id);
    let workload = create(gateway, ResourceKind::Workload, deployment, created).await?;
    let workload_selector = workload
        .annotations()
        .get(WORKLOAD_SELECTOR_KEY)
        .cloned();

    let service = build_service(
        &ctx.config,
        identity,
        &request.site_id,
        workload_selector.as_deref(),
    );
    let service = create(gateway, ResourceKind::Service, service, created).await?;
    let service_name = stored_name(ResourceKind::Service, &service)?;

    let ingress = build_route(
        &ctx.config,
        identity,
        &request.site_id,
        &request.domain_name,
        &service_name,
    );
    let route = create(gateway, ResourceKind::Route, ingress, created).await?;

    Ok(ProvisionedSite {
        identity: identity.to_string(),
        workload: ResourceHandle::new(
            ResourceKind::Workload,
            stored_name(ResourceKind::Workload, &workload)?,
        ),
        service: ResourceHandle::new(ResourceKind::Service, service_name),
        route: ResourceHandle::new(ResourceKind::Route, stored_name(ResourceKind::Route, &route)?),
    })
}

async fn create<K: Resource + ResourceExt + Serialize>(
    gateway: &dyn ClusterGateway,
    kind: ResourceKind,
    resource: K,
    created: &mut Rollback,
) -> Result<DynamicObject>
where
    K::DynamicType: Default,
{
    let object = to_dynamic_object(kind, resource)?;
    let stored = gateway.create(kind, &object).await.map_err(|source| {
        let target = object.name_any();
        error!(%kind, name = %target, error = %source, "create failed");
        Error::Kube {
            operation: "create",
            kind,
            target,
            source,
        }
    })?;
    let name = stored_name(kind, &stored)?;
    info!(%kind, %name, "created");
    created.push(ResourceHandle::new(kind, name));
    Ok(stored)
}

fn stored_name(kind: ResourceKind, object: &DynamicObject) -> Result<String> {
    object
        .metadata
        .name
        .clone()
        .ok_or(Error::MissingName { kind })
}

/// Resources created so far by one provision call.
///
/// Whatever is still recorded when the guard is dropped gets deleted by a
/// spawned task.
struct Rollback {
    gateway: Arc<dyn ClusterGateway>,
    created: Vec<ResourceHandle>,
}

impl Rollback {
    fn new(gateway: Arc<dyn ClusterGateway>) -> Self {
        Rollback {
            gateway,
            created: Vec::new(),
        }
    }

    fn push(&mut self, handle: ResourceHandle) {
        self.created.push(handle);
    }

    fn commit(mut self) {
        self.created.clear();
    }

    /// Best-effort removal, newest first. A handle is only forgotten once its
    /// delete has returned.
    async fn run(mut self) {
        while let Some(handle) = self.created.last().cloned() {
            roll_back(self.gateway.as_ref(), &handle).await;
            self.created.pop();
        }
    }
}

impl Drop for Rollback {
    fn drop(&mut self) {
        if self.created.is_empty() {
            return;
        }
        let created = std::mem::take(&mut self.created);
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                warn!("provisioning cancelled, removing {} created resources", created.len());
                let gateway = self.gateway.clone();
                runtime.spawn(async move {
                    for handle in created.iter().rev() {
                        roll_back(gateway.as_ref(), handle).await;
                    }
                });
            }
            Err(_) => {
                for handle in &created {
                    error!(kind = %handle.kind, name = %handle.name, "provisioning cancelled without a runtime, resource left behind");
                }
            }
        }
    }
}

async fn roll_back(gateway: &dyn ClusterGateway, handle: &ResourceHandle) {
    match gateway.delete(handle.kind, &handle.name).await {
        Ok(()) => info!(kind = %handle.kind, name = %handle.name, "rolled back"),
        Err(e) if is_not_found(&e) => {}
        Err(e) => {
            warn!(kind = %handle.kind, name = %handle.name, error = %e, "rollback failed, resource left behind")
        }
    }
}
