//! Process-lifetime state shared by every request.

use crate::clients::ClientProvider;
use crate::config::Config;
use crate::layer::{Backends, Layer};
use crate::services::namespace::NamespaceService;
use crate::services::traces::TracingLoader;
use ahash::AHashSet as HashSet;
use meshview_core::metrics::{MetricsClient, MetricsFactory};
use meshview_core::mtls::MtlsEvaluator;
use meshview_core::trace::{TracingClient, TracingFactory};
use meshview_core::{CallerIdentity, LayerError};
use meshview_k8s_cache::{CacheScope, ResourceCache, ResourceKind};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{error, info};

/// Owns the resources that outlive any single request: the identity client
/// provider, the privileged resource cache, and the lazily built
/// metrics/tracing clients. Constructed once at startup and passed by
/// reference into every request handler.
pub struct ProcessContext {
    config: Config,
    provider: Arc<dyn ClientProvider>,
    metrics_factory: Arc<dyn MetricsFactory>,
    tracing_factory: Arc<dyn TracingFactory>,
    evaluator: Arc<dyn MtlsEvaluator>,
    excluded_workloads: Arc<HashSet<String>>,
    /// `None` once initialization ran with caching disabled or failed; the
    /// slot is never re-initialized for the process lifetime.
    cache: OnceCell<Option<Arc<ResourceCache>>>,
    /// First successful construction is kept for the process lifetime;
    /// failures leave the cell empty so a later request retries.
    metrics: OnceCell<Arc<dyn MetricsClient>>,
    tracing_client: OnceCell<Arc<dyn TracingClient>>,
}

// === impl ProcessContext ===

impl ProcessContext {
    pub fn new(
        config: Config,
        provider: Arc<dyn ClientProvider>,
        metrics_factory: Arc<dyn MetricsFactory>,
        tracing_factory: Arc<dyn TracingFactory>,
        evaluator: Arc<dyn MtlsEvaluator>,
    ) -> Arc<Self> {
        let excluded_workloads = Arc::new(config.excluded_workloads.iter().cloned().collect());
        Arc::new(Self {
            config,
            provider,
            metrics_factory,
            tracing_factory,
            evaluator,
            excluded_workloads,
            cache: OnceCell::new(),
            metrics: OnceCell::new(),
            tracing_client: OnceCell::new(),
        })
    }

    /// Brings up the shared resource cache. The underlying setup runs
    /// exactly once no matter how many callers race here; a failed setup
    /// leaves the process in uncached mode for its remaining lifetime.
    pub async fn start(&self) {
        self.cache.get_or_init(|| self.init_cache()).await;
    }

    async fn init_cache(&self) -> Option<Arc<ResourceCache>> {
        if !self.config.cache_enabled {
            return None;
        }
        info!("initializing resource cache");
        let privileged = self.provider.privileged_clients();

        let scope = if self.config.all_namespaces_accessible() {
            CacheScope::Cluster
        } else {
            // Namespace-scoped deployment: enumerate the seed list with a
            // throwaway namespace service running as the service identity.
            let seeder = NamespaceService::new(
                privileged.clone(),
                privileged.clone(),
                self.config.clone(),
            );
            match seeder.names().await {
                Ok(names) => CacheScope::Namespaces(names),
                Err(error) => {
                    error!(%error, "failed to enumerate cache seed namespaces; continuing uncached");
                    return None;
                }
            }
        };

        match ResourceCache::build(privileged.home().clone(), scope).await {
            Ok(cache) => Some(Arc::new(cache)),
            Err(error) => {
                error!(%error, "resource cache initialization failed; continuing uncached");
                None
            }
        }
    }

    fn cache(&self) -> Option<&Arc<ResourceCache>> {
        self.cache.get().and_then(|slot| slot.as_ref())
    }

    pub fn is_namespace_cached(&self, namespace: &str) -> bool {
        self.cache()
            .map_or(false, |cache| cache.check_namespace(namespace))
    }

    /// A resource kind counts as cached only when its namespace is.
    pub fn is_resource_cached(&self, namespace: &str, kind: ResourceKind) -> bool {
        self.is_namespace_cached(namespace)
            && self
                .cache()
                .map_or(false, |cache| cache.check_resource(kind))
    }

    /// Exchanges a caller token for a fresh service layer. Every call
    /// builds a new layer, even for an identity seen before.
    pub async fn layer_for(self: &Arc<Self>, identity: &CallerIdentity) -> Result<Layer, LayerError> {
        let user_clients = self.provider.clients_for(identity).await?;
        let metrics = self
            .metrics
            .get_or_try_init(|| self.metrics_factory.connect())
            .await?
            .clone();

        Ok(Layer::build(Backends {
            user_clients,
            privileged_clients: self.provider.privileged_clients(),
            metrics,
            tracing_loader: self.tracing_loader(identity.clone()),
            cache: self.cache().cloned(),
            config: self.config.clone(),
            excluded_workloads: self.excluded_workloads.clone(),
            evaluator: self.evaluator.clone(),
        }))
    }

    /// The tracing client is process-wide, not per-identity: the first
    /// caller's token is baked in at construction and silently reused for
    /// every later caller.
    fn tracing_loader(self: &Arc<Self>, identity: CallerIdentity) -> TracingLoader {
        let ctx = self.clone();
        Arc::new(move || {
            let ctx = ctx.clone();
            let identity = identity.clone();
            Box::pin(async move {
                ctx.tracing_client
                    .get_or_try_init(|| async { ctx.tracing_factory.connect(&identity).await })
                    .await
                    .map(Clone::clone)
            })
        })
    }

    /// Releases the cache if present. Idempotent; safe before `start`.
    pub fn stop(&self) {
        if let Some(cache) = self.cache() {
            cache.stop();
        }
    }
}
