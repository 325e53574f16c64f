use std::net::SocketAddr;

use clap::{Args, Parser};

pub const DEFAULT_NAMESPACE: &str = "dynamic-sites";
pub const DEFAULT_IMAGE: &str = "ghcr.io/tyrelchambers/reddex-custom-website:latest";
pub const DEFAULT_IMAGE_PULL_SECRET: &str = "ghrc";
pub const DEFAULT_ENV_SECRET: &str = "reddex-custom-secrets";
pub const DEFAULT_CLUSTER_ISSUER: &str = "letsencrypt-prod";

/// Provisions and tears down the workload, service and ingress backing a site.
#[derive(Parser, Debug, Clone)]
#[command(name = "provisioner", version)]
pub struct Opts {
    /// Address the HTTP API listens on
    #[arg(long = "listen", env = "LISTEN_ADDR", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Use credentials from the local kubeconfig instead of the in-cluster service account
    #[arg(long, env = "LOCAL")]
    pub local: bool,

    /// OTLP/gRPC endpoint to export traces to. Tracing export is disabled when unset.
    #[arg(long, env = "OPENTELEMETRY_ENDPOINT_URL")]
    pub otlp_endpoint: Option<String>,

    #[command(flatten)]
    pub site: SiteConfig,
}

/// Settings shared by every site, threaded through the resource builders.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct SiteConfig {
    /// Namespace all site resources are created in
    #[arg(long, env = "SITES_NAMESPACE", default_value = DEFAULT_NAMESPACE)]
    pub namespace: String,

    /// Container image every site runs
    #[arg(long, env = "SITE_IMAGE", default_value = DEFAULT_IMAGE)]
    pub image: String,

    /// Secret used to pull the site image
    #[arg(long, env = "IMAGE_PULL_SECRET", default_value = DEFAULT_IMAGE_PULL_SECRET)]
    pub image_pull_secret: String,

    /// Secret injected into the site container as environment variables
    #[arg(long, env = "SITE_ENV_SECRET", default_value = DEFAULT_ENV_SECRET)]
    pub env_secret: String,

    /// cert-manager ClusterIssuer that issues the site certificates
    #[arg(long, env = "CLUSTER_ISSUER", default_value = DEFAULT_CLUSTER_ISSUER)]
    pub cluster_issuer: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        SiteConfig {
            namespace: DEFAULT_NAMESPACE.to_string(),
            image: DEFAULT_IMAGE.to_string(),
            image_pull_secret: DEFAULT_IMAGE_PULL_SECRET.to_string(),
            env_secret: DEFAULT_ENV_SECRET.to_string(),
            cluster_issuer: DEFAULT_CLUSTER_ISSUER.to_string(),
        }
    }
}
