use std::sync::Arc;

use anyhow::{anyhow, Context as _};
use kube::config::{Config, KubeConfigOptions};
use kube::Client;
use opentelemetry::trace::{TraceId, TracerProvider as _};
use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::trace::{Tracer, TracerProvider};
use opentelemetry_sdk::Resource;
use opentelemetry_semantic_conventions::resource;
use tracing::level_filters::LevelFilter;
use tracing::{info, Span};
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Registry};

use crate::config::{Opts, SiteConfig};
use crate::gateway::{ClusterGateway, KubeGateway};
use crate::provision::SiteClaims;

pub mod config;
pub mod deprovision;
pub mod error;
pub mod gateway;
pub mod identity;
pub mod models;
pub mod provision;
pub mod resource_creator;
pub mod server;

pub use error::{Error, Result};

const SERVICE_NAME: &str = "site-provisioner";

/// Everything a provision or deprovision call needs. Shared by all requests.
pub struct Context {
    pub gateway: Arc<dyn ClusterGateway>,
    pub config: SiteConfig,
    pub claims: SiteClaims,
}

impl Context {
    pub fn new(gateway: Arc<dyn ClusterGateway>, config: SiteConfig) -> Self {
        Context {
            gateway,
            config,
            claims: SiteClaims::default(),
        }
    }
}

pub async fn run(opts: Opts) -> anyhow::Result<()> {
    init_tracing(&opts)?;

    let client = kube_client(opts.local).await?;
    let gateway = KubeGateway::new(client, opts.site.namespace.clone());
    let ctx = Arc::new(Context::new(Arc::new(gateway), opts.site.clone()));

    server::serve(opts.listen, ctx).await
}

fn init_tracing(opts: &Opts) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .context("parsing log filter")?;
    let max_level_hint = env_filter.max_level_hint().unwrap_or(LevelFilter::OFF);

    let telemetry = match &opts.otlp_endpoint {
        Some(endpoint) => Some(init_tracer(endpoint).context("initializing OpenTelemetry")?),
        None => None,
    };
    let (json, compact) = if opts.local {
        (None, Some(tracing_subscriber::fmt::layer().compact()))
    } else {
        (Some(tracing_subscriber::fmt::layer().json()), None)
    };

    Registry::default()
        .with(telemetry)
        .with(json)
        .with(compact)
        .with(env_filter)
        .try_init()
        .context("installing tracing subscriber")?;

    info!("Starting provisioner with log level {:?}", max_level_hint);
    Ok(())
}

fn init_tracer(endpoint: &str) -> anyhow::Result<OpenTelemetryLayer<Registry, Tracer>> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
        .map_err(|e| anyhow!(e).context("building OTLP exporter"))?;
    let provider = TracerProvider::builder()
        .with_batch_exporter(exporter, opentelemetry_sdk::runtime::Tokio)
        .with_resource(Resource::new(vec![KeyValue::new(
            resource::SERVICE_NAME,
            SERVICE_NAME,
        )]))
        .build();
    let tracer = provider.tracer(SERVICE_NAME);
    opentelemetry::global::set_tracer_provider(provider);
    Ok(tracing_opentelemetry::layer().with_tracer(tracer))
}

async fn kube_client(local: bool) -> anyhow::Result<Client> {
    let config = if local {
        Config::from_kubeconfig(&KubeConfigOptions::default())
            .await
            .context("loading local kubeconfig")?
    } else {
        Config::incluster().context("loading in-cluster configuration")?
    };
    Client::try_from(config).context("initializing Kubernetes client")
}

pub fn get_trace_id() -> TraceId {
    use opentelemetry::trace::TraceContextExt as _;
    use tracing_opentelemetry::OpenTelemetrySpanExt as _;

    Span::current().context().span().span_context().trace_id()
}
