use crate::backends::{JaegerFactory, PrometheusFactory};
use anyhow::{bail, Result};
use clap::Parser;
use meshview::{AccessibleNamespaces, Config, KubeClientProvider, ProcessContext};
use meshview_core::mtls::StandardEvaluator;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Parser)]
#[clap(name = "meshview", about = "Backend for the mesh observability console")]
pub struct Args {
    #[clap(long, default_value = "meshview=info,warn", env = "MESHVIEW_LOG")]
    log_level: kubert::LogFilter,

    #[clap(long, default_value = "plain")]
    log_format: kubert::LogFormat,

    #[clap(flatten)]
    client: kubert::ClientArgs,

    #[clap(flatten)]
    admin: kubert::AdminArgs,

    /// Name of the cluster the console runs in.
    #[clap(long, default_value = "Kubernetes")]
    cluster_name: String,

    /// Namespace the mesh control plane is deployed to.
    #[clap(long, default_value = "istio-system")]
    istio_namespace: String,

    /// Namespace whose security policies apply mesh-wide. Defaults to the
    /// control plane namespace.
    #[clap(long)]
    root_namespace: Option<String>,

    /// Name of the control plane's mesh ConfigMap.
    #[clap(long, default_value = "istio")]
    mesh_config_map: String,

    /// Serve every read through the caller's client, skipping the shared
    /// cache.
    #[clap(long)]
    caching_disabled: bool,

    /// Comma-separated namespaces the console may expose; all when unset.
    #[clap(long)]
    accessible_namespaces: Option<String>,

    /// Comma-separated workload names hidden from listings.
    #[clap(long, default_value = "")]
    excluded_workloads: String,

    #[clap(long, default_value = "http://prometheus.istio-system:9090")]
    prometheus_url: String,

    #[clap(long, default_value = "http://tracing.istio-system:16686")]
    tracing_url: String,

    /// External authorization endpoint surfaced to clients.
    #[clap(long)]
    auth_endpoint: Option<String>,
}

impl Args {
    #[inline]
    pub async fn parse_and_run() -> Result<()> {
        Self::parse().run().await
    }

    pub async fn run(self) -> Result<()> {
        let Self {
            log_level,
            log_format,
            client,
            admin,
            cluster_name,
            istio_namespace,
            root_namespace,
            mesh_config_map,
            caching_disabled,
            accessible_namespaces,
            excluded_workloads,
            prometheus_url,
            tracing_url,
            auth_endpoint,
        } = self;

        let runtime = kubert::Runtime::builder()
            .with_log(log_level, log_format)
            .with_admin(admin)
            .with_client(client)
            .build()
            .await?;

        let config = Config {
            cluster_name: cluster_name.clone(),
            root_namespace: root_namespace.unwrap_or_else(|| istio_namespace.clone()),
            istio_namespace,
            mesh_config_map,
            cache_enabled: !caching_disabled,
            accessible_namespaces: match accessible_namespaces {
                Some(list) => AccessibleNamespaces::List(split_csv(&list)),
                None => AccessibleNamespaces::All,
            },
            excluded_workloads: split_csv(&excluded_workloads),
            auth_endpoint,
        };

        // The inferred config mints caller-scoped clients; the runtime's own
        // client is the privileged service identity.
        let base = kube::Config::infer().await?;
        let provider = Arc::new(KubeClientProvider::new(base, cluster_name, runtime.client()));
        let ctx = ProcessContext::new(
            config,
            provider,
            Arc::new(PrometheusFactory::new(prometheus_url)),
            Arc::new(JaegerFactory::new(tracing_url)),
            Arc::new(StandardEvaluator::default()),
        );
        ctx.start().await;
        info!("console context ready");

        // Request handling is wired up by the embedding transport layer;
        // this process blocks until shutdown, then releases shared state.
        let res = runtime.run().await;
        ctx.stop();
        if res.is_err() {
            bail!("aborted");
        }
        Ok(())
    }
}

fn split_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
