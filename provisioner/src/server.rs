//! HTTP boundary: `POST /` provisions a site, `DELETE /` deprovisions it.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context as _;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use tower_http::trace::TraceLayer;
use tracing::{field, info, instrument, Span};

use api::SiteRequest;

use crate::deprovision::deprovision;
use crate::provision::provision;
use crate::{get_trace_id, Context, Error};

pub fn router(ctx: Arc<Context>) -> Router {
    Router::new()
        .route("/", post(create_site).delete(delete_site))
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

pub async fn serve(listen: SocketAddr, ctx: Arc<Context>) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .with_context(|| format!("binding {}", listen))?;
    info!("Listening on {}", listen);
    axum::serve(listener, router(ctx))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP API")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("unable to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

#[instrument(skip_all, fields(trace_id))]
async fn create_site(
    State(ctx): State<Arc<Context>>,
    payload: Result<Json<SiteRequest>, JsonRejection>,
) -> Result<StatusCode, Error> {
    Span::current().record("trace_id", field::display(&get_trace_id()));
    let Json(request) = payload.map_err(|e| Error::invalid_request(e.body_text()))?;
    provision(&ctx, &request).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip_all, fields(trace_id))]
async fn delete_site(
    State(ctx): State<Arc<Context>>,
    payload: Result<Json<SiteRequest>, JsonRejection>,
) -> Result<StatusCode, Error> {
    Span::current().record("trace_id", field::display(&get_trace_id()));
    let Json(request) = payload.map_err(|e| Error::invalid_request(e.body_text()))?;
    deprovision(&ctx, &request).await?;
    Ok(StatusCode::NO_CONTENT)
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::InvalidRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()).into_response(),
            Error::AlreadyExists { .. } => (StatusCode::CONFLICT, self.to_string()).into_response(),
            _ => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use crate::gateway::fake::{FakeGateway, Op};
    use crate::models::ResourceKind;
    use axum::body::Body;
    use axum::http::{header, Method, Request};
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};
    use tower::ServiceExt;

    #[fixture]
    fn gateway() -> Arc<FakeGateway> {
        Arc::new(FakeGateway::default())
    }

    fn test_router(gateway: &Arc<FakeGateway>) -> Router {
        router(Arc::new(Context::new(gateway.clone(), SiteConfig::default())))
    }

    async fn send(router: &Router, method: Method, body: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method(method)
            .uri("/")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    const SITE: &str = r#"{"domainName": "foo.example.com", "websiteId": "S1"}"#;

    #[rstest]
    #[tokio::test]
    async fn post_provisions_site(gateway: Arc<FakeGateway>) {
        let router = test_router(&gateway);
        let (status, body) = send(&router, Method::POST, SITE).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(body, "");
        assert_eq!(gateway.total(), 3);
    }

    #[rstest]
    #[case::malformed("{not json")]
    #[case::missing_field(r#"{"domainName": "foo.example.com"}"#)]
    #[case::invalid_domain(r#"{"domainName": "localhost", "websiteId": "S1"}"#)]
    #[tokio::test]
    async fn bad_request_makes_no_calls(gateway: Arc<FakeGateway>, #[case] body: &str) {
        let router = test_router(&gateway);
        let (status, message) = send(&router, Method::POST, body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!message.is_empty());
        assert!(gateway.calls().is_empty());
    }

    #[rstest]
    #[tokio::test]
    async fn duplicate_post_conflicts(gateway: Arc<FakeGateway>) {
        let router = test_router(&gateway);
        send(&router, Method::POST, SITE).await;
        let (status, _) = send(&router, Method::POST, SITE).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(gateway.total(), 3);
    }

    #[rstest]
    #[tokio::test]
    async fn failed_create_is_server_error(gateway: Arc<FakeGateway>) {
        gateway.fail(Op::Create, ResourceKind::Service);
        let router = test_router(&gateway);
        let (status, _) = send(&router, Method::POST, SITE).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[rstest]
    #[tokio::test]
    async fn delete_without_resources_is_no_content(gateway: Arc<FakeGateway>) {
        let router = test_router(&gateway);
        let (status, _) = send(&router, Method::DELETE, SITE).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[rstest]
    #[tokio::test]
    async fn delete_with_failed_lookup_is_server_error(gateway: Arc<FakeGateway>) {
        let router = test_router(&gateway);
        send(&router, Method::POST, SITE).await;
        gateway.fail(Op::List, ResourceKind::Workload);

        let (status, _) = send(&router, Method::DELETE, SITE).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(gateway.total(), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn other_methods_are_not_allowed(gateway: Arc<FakeGateway>) {
        let router = test_router(&gateway);
        let (status, _) = send(&router, Method::PUT, SITE).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }
}
