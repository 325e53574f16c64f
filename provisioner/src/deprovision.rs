use tracing::{debug, error, info, instrument};

use api::SiteRequest;

use crate::gateway::{is_not_found, ClusterGateway};
use crate::identity::site_identity;
use crate::models::{ResourceHandle, ResourceKind};
use crate::resource_creator::app_selector;
use crate::{Context, Error, Result};

/// What a deprovision pass removed, and what it failed to.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DeprovisionReport {
    pub deleted: Vec<ResourceHandle>,
    pub failures: Vec<String>,
}

impl DeprovisionReport {
    fn merge(&mut self, other: DeprovisionReport) {
        self.deleted.extend(other.deleted);
        self.failures.extend(other.failures);
    }
}

/// Removes every deployment, ingress and service labelled with the site identity.
///
/// The three kinds are handled concurrently and independently, a failure on one
/// never stops the others. The call fails if any lookup or delete failed.
#[instrument(skip(ctx, request), fields(domain = %request.domain_name))]
pub async fn deprovision(ctx: &Context, request: &SiteRequest) -> Result<DeprovisionReport> {
    let identity = site_identity(&request.domain_name)?;
    let selector = app_selector(&identity);
    let gateway = ctx.gateway.as_ref();

    let (workloads, routes, services) = futures::join!(
        remove_kind(gateway, ResourceKind::Workload, &selector),
        remove_kind(gateway, ResourceKind::Route, &selector),
        remove_kind(gateway, ResourceKind::Service, &selector),
    );

    let mut report = DeprovisionReport::default();
    for outcome in [workloads, routes, services] {
        report.merge(outcome);
    }

    if report.failures.is_empty() {
        info!(%identity, "site deprovisioned, {} resources deleted", report.deleted.len());
        Ok(report)
    } else {
        Err(Error::Deprovision {
            identity,
            failures: report.failures,
        })
    }
}

async fn remove_kind(
    gateway: &dyn ClusterGateway,
    kind: ResourceKind,
    selector: &str,
) -> DeprovisionReport {
    let mut report = DeprovisionReport::default();

    let found = match gateway.list_by_label(kind, selector).await {
        Ok(found) => found,
        Err(e) => {
            error!(%kind, selector, error = %e, "lookup failed");
            report.failures.push(format!("list {} {}: {}", kind, selector, e));
            return report;
        }
    };
    if found.is_empty() {
        debug!(%kind, selector, "nothing to delete");
        return report;
    }

    for name in found.into_iter().filter_map(|object| object.metadata.name) {
        match gateway.delete(kind, &name).await {
            Ok(()) => {
                info!(%kind, %name, "deleted");
                report.deleted.push(ResourceHandle::new(kind, name));
            }
            Err(e) if is_not_found(&e) => {
                debug!(%kind, %name, "already gone");
            }
            Err(e) => {
                error!(%kind, %name, error = %e, "delete failed");
                report.failures.push(format!("delete {} {}: {}", kind, name, e));
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use crate::gateway::fake::{FakeGateway, Op};
    use crate::provision::provision;
    use crate::resource_creator::{build_service, to_dynamic_object};
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};
    use std::sync::Arc;

    #[fixture]
    fn gateway() -> Arc<FakeGateway> {
        Arc::new(FakeGateway::default())
    }

    fn context(gateway: &Arc<FakeGateway>) -> Context {
        Context::new(gateway.clone(), SiteConfig::default())
    }

    fn request() -> SiteRequest {
        SiteRequest::new("foo.example.com", "S1")
    }

    #[rstest]
    #[tokio::test]
    async fn nothing_to_delete_succeeds(gateway: Arc<FakeGateway>) {
        let ctx = context(&gateway);
        let report = deprovision(&ctx, &request()).await.unwrap();
        assert_eq!(report, DeprovisionReport::default());
    }

    #[rstest]
    #[tokio::test]
    async fn removes_provisioned_site(gateway: Arc<FakeGateway>) {
        let ctx = context(&gateway);
        provision(&ctx, &request()).await.unwrap();

        let report = deprovision(&ctx, &request()).await.unwrap();
        assert_eq!(report.deleted.len(), 3);
        assert_eq!(gateway.total(), 0);
    }

    #[rstest]
    #[tokio::test]
    async fn repeated_deprovision_is_idempotent(gateway: Arc<FakeGateway>) {
        let ctx = context(&gateway);
        provision(&ctx, &request()).await.unwrap();

        deprovision(&ctx, &request()).await.unwrap();
        let report = deprovision(&ctx, &request()).await.unwrap();
        assert!(report.deleted.is_empty());
    }

    #[rstest]
    #[tokio::test]
    async fn lookup_failure_does_not_stop_other_kinds(gateway: Arc<FakeGateway>) {
        let ctx = context(&gateway);
        provision(&ctx, &request()).await.unwrap();
        gateway.fail(Op::List, ResourceKind::Workload);

        let err = deprovision(&ctx, &request()).await.unwrap_err();
        assert!(matches!(err, Error::Deprovision { ref failures, .. } if failures.len() == 1));
        assert_eq!(gateway.stored(ResourceKind::Workload).len(), 1);
        assert!(gateway.stored(ResourceKind::Service).is_empty());
        assert!(gateway.stored(ResourceKind::Route).is_empty());
    }

    #[rstest]
    #[tokio::test]
    async fn delete_failure_does_not_stop_other_kinds(gateway: Arc<FakeGateway>) {
        let ctx = context(&gateway);
        provision(&ctx, &request()).await.unwrap();
        gateway.fail(Op::Delete, ResourceKind::Route);

        let err = deprovision(&ctx, &request()).await.unwrap_err();
        assert!(matches!(err, Error::Deprovision { .. }));
        assert_eq!(gateway.total(), 1);

        gateway.heal();
        deprovision(&ctx, &request()).await.unwrap();
        assert_eq!(gateway.total(), 0);
    }

    #[rstest]
    #[tokio::test]
    async fn deletes_every_match(gateway: Arc<FakeGateway>) {
        let config = SiteConfig::default();
        for name in ["service-aaaaa", "service-bbbbb"] {
            let mut service = build_service(&config, "foo", "S1", None);
            service.metadata.name = Some(name.to_string());
            gateway.insert(
                ResourceKind::Service,
                to_dynamic_object(ResourceKind::Service, service).unwrap(),
            );
        }
        let ctx = context(&gateway);

        let report = deprovision(&ctx, &request()).await.unwrap();
        assert_eq!(report.deleted.len(), 2);
        assert!(gateway.stored(ResourceKind::Service).is_empty());
    }

    #[rstest]
    #[tokio::test]
    async fn leaves_other_sites_alone(gateway: Arc<FakeGateway>) {
        let ctx = context(&gateway);
        provision(&ctx, &request()).await.unwrap();
        provision(&ctx, &SiteRequest::new("bar.example.com", "S2"))
            .await
            .unwrap();

        deprovision(&ctx, &request()).await.unwrap();
        for kind in ResourceKind::ALL {
            let remaining = gateway.stored(kind);
            assert_eq!(remaining.len(), 1);
            assert_eq!(
                remaining[0].metadata.labels.as_ref().unwrap()["app"],
                "bar"
            );
        }
    }

    #[rstest]
    #[tokio::test]
    async fn invalid_domain_is_rejected(gateway: Arc<FakeGateway>) {
        let ctx = context(&gateway);
        let err = deprovision(&ctx, &SiteRequest::new(".example.com", "S1"))
            .await
            .unwrap_err();
        assert!(err.is_client_error());
        assert!(gateway.calls().is_empty());
    }
}
