//! The per-request service container.

use crate::clients::ClusterClients;
use crate::config::Config;
use crate::services::app::AppService;
use crate::services::certs::CertsService;
use crate::services::health::HealthService;
use crate::services::istio_config::IstioConfigService;
use crate::services::istio_status::IstioStatusService;
use crate::services::mesh::MeshService;
use crate::services::namespace::NamespaceService;
use crate::services::oauth::OAuthService;
use crate::services::proxy_logging::ProxyLoggingService;
use crate::services::proxy_status::ProxyStatusService;
use crate::services::registry_status::RegistryStatusService;
use crate::services::svc::SvcService;
use crate::services::tls::TlsService;
use crate::services::token_review::TokenReviewService;
use crate::services::traces::{TracingLoader, TracingService};
use crate::services::validations::ValidationsService;
use crate::services::workload::WorkloadService;
use ahash::AHashSet as HashSet;
use meshview_core::metrics::MetricsClient;
use meshview_core::mtls::MtlsEvaluator;
use meshview_k8s_api::ControlPlane;
use meshview_k8s_cache::{CachingClient, ResourceCache};
use std::sync::Arc;

/// Everything a layer is built from. The user set is the caller's; the
/// privileged set and the cache have process lifetime.
pub struct Backends {
    pub user_clients: ClusterClients,
    pub privileged_clients: ClusterClients,
    pub metrics: Arc<dyn MetricsClient>,
    pub tracing_loader: TracingLoader,
    pub cache: Option<Arc<ResourceCache>>,
    pub config: Config,
    pub excluded_workloads: Arc<HashSet<String>>,
    pub evaluator: Arc<dyn MtlsEvaluator>,
}

/// One request's worth of domain services. Built fresh per request and
/// discarded with it; never cached or shared across requests. Once built,
/// the reference graph between services is fixed and acyclic.
pub struct Layer {
    pub app: AppService,
    pub certs: CertsService,
    pub health: HealthService,
    pub istio_config: Arc<IstioConfigService>,
    pub istio_status: IstioStatusService,
    pub mesh: MeshService,
    pub namespace: Arc<NamespaceService>,
    pub oauth: OAuthService,
    pub proxy_logging: ProxyLoggingService,
    pub proxy_status: Arc<ProxyStatusService>,
    pub registry_status: RegistryStatusService,
    pub svc: SvcService,
    pub tls: Arc<TlsService>,
    pub token_review: TokenReviewService,
    pub tracing: TracingService,
    pub validations: ValidationsService,
    pub workload: WorkloadService,
}

// === impl Layer ===

impl Layer {
    /// Wires the service graph in three phases: independent leaves first,
    /// then services holding handles to already-built siblings, and the
    /// workload service last, where the caching-vs-direct client choice is
    /// fixed for the request.
    pub fn build(backends: Backends) -> Self {
        let Backends {
            user_clients,
            privileged_clients,
            metrics,
            tracing_loader,
            cache,
            config,
            excluded_workloads,
            evaluator,
        } = backends;
        let home = user_clients.home().clone();

        let namespace = Arc::new(NamespaceService::new(
            user_clients,
            privileged_clients,
            config.clone(),
        ));
        let istio_config = Arc::new(IstioConfigService::new(home.clone()));
        let proxy_status = Arc::new(ProxyStatusService::new(home.clone()));
        let app = AppService::new(home.clone(), metrics.clone());
        let certs = CertsService::new(home.clone(), config.clone());
        let health = HealthService::new(metrics.clone());
        let istio_status = IstioStatusService::new(home.clone(), config.clone());
        let mesh = MeshService::new(home.clone(), config.clone());
        let oauth = OAuthService::new(config.clone());
        let registry_status = RegistryStatusService::new(home.clone(), config.clone());
        let svc = SvcService::new(home.clone());
        let token_review = TokenReviewService::new(home.clone());
        let tracing = TracingService::new(tracing_loader);

        // These hold handles to siblings built above.
        let tls = Arc::new(TlsService::new(
            home.clone(),
            istio_config.clone(),
            namespace.clone(),
            cache.clone(),
            config,
            evaluator,
        ));
        let proxy_logging = ProxyLoggingService::new(home.clone(), proxy_status.clone());
        let validations = ValidationsService::new(tls.clone(), namespace.clone());

        // Cached reads are answered under the service identity; writes and
        // uncached reads keep the caller's client.
        let workload_client: Arc<dyn ControlPlane> = match &cache {
            Some(cache) => Arc::new(CachingClient::new(cache.clone(), home)),
            None => home,
        };
        let workload = WorkloadService::new(workload_client, metrics, excluded_workloads);

        Layer {
            app,
            certs,
            health,
            istio_config,
            istio_status,
            mesh,
            namespace,
            oauth,
            proxy_logging,
            proxy_status,
            registry_status,
            svc,
            tls,
            token_review,
            tracing,
            validations,
            workload,
        }
    }
}
