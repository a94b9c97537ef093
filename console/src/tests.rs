//! Context and layer behavior over mock backends.

use crate::clients::{ClientProvider, ClusterClients};
use crate::config::{AccessibleNamespaces, Config};
use crate::context::ProcessContext;
use maplit::btreemap;
use meshview_core::metrics::{MetricsClient, MetricsFactory};
use meshview_core::mtls::{MtlsLabel, MtlsStatus, StandardEvaluator};
use meshview_core::trace::{TraceSummary, TracingClient, TracingFactory};
use meshview_core::{AuthError, BackendError, CallerIdentity, LayerError};
use meshview_k8s_api::networking::{DestinationRule, DestinationRuleSpec};
use meshview_k8s_api::security::{
    MtlsMode, PeerAuthentication, PeerAuthenticationMtls, PeerAuthenticationSpec,
};
use meshview_k8s_api::{
    ClientError, ConfigMap, ControlPlane, Deployment, Namespace, ObjectMeta, Pod, Service,
    TokenReview,
};
use meshview_k8s_cache::ResourceKind;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering::SeqCst};
use std::sync::Arc;

// === fixtures ===

#[derive(Default)]
struct MockControlPlane {
    namespaces: Mutex<Vec<Namespace>>,
    config_maps: Mutex<Vec<ConfigMap>>,
    destination_rules: Mutex<Vec<DestinationRule>>,
    peer_authentications: Mutex<Vec<PeerAuthentication>>,
    deployments: Mutex<Vec<Deployment>>,
    fail_namespaces: AtomicBool,
    fail_deployments: AtomicBool,
    namespace_list_calls: AtomicUsize,
}

fn backend_down() -> ClientError {
    ClientError::Api(Box::new(kube::Error::Api(kube::core::ErrorResponse {
        status: "Failure".to_string(),
        message: "injected outage".to_string(),
        reason: "ServiceUnavailable".to_string(),
        code: 503,
    })))
}

#[async_trait::async_trait]
impl ControlPlane for MockControlPlane {
    async fn get_namespace(&self, name: &str) -> Result<Namespace, ClientError> {
        if self.fail_namespaces.load(SeqCst) {
            return Err(backend_down());
        }
        self.namespaces
            .lock()
            .iter()
            .find(|ns| ns.metadata.name.as_deref() == Some(name))
            .cloned()
            .ok_or_else(|| ClientError::NotFound(format!("namespace {name}")))
    }

    async fn list_namespaces(&self) -> Result<Vec<Namespace>, ClientError> {
        self.namespace_list_calls.fetch_add(1, SeqCst);
        if self.fail_namespaces.load(SeqCst) {
            return Err(backend_down());
        }
        Ok(self.namespaces.lock().clone())
    }

    async fn get_config_map(&self, namespace: &str, name: &str) -> Result<ConfigMap, ClientError> {
        self.config_maps
            .lock()
            .iter()
            .find(|cm| {
                cm.metadata.namespace.as_deref() == Some(namespace)
                    && cm.metadata.name.as_deref() == Some(name)
            })
            .cloned()
            .ok_or_else(|| ClientError::NotFound(format!("config map {namespace}/{name}")))
    }

    async fn list_config_maps(&self, namespace: &str) -> Result<Vec<ConfigMap>, ClientError> {
        Ok(self
            .config_maps
            .lock()
            .iter()
            .filter(|cm| cm.metadata.namespace.as_deref() == Some(namespace))
            .cloned()
            .collect())
    }

    async fn list_destination_rules(&self) -> Result<Vec<DestinationRule>, ClientError> {
        Ok(self.destination_rules.lock().clone())
    }

    async fn list_peer_authentications(&self) -> Result<Vec<PeerAuthentication>, ClientError> {
        Ok(self.peer_authentications.lock().clone())
    }

    async fn list_pods(
        &self,
        _namespace: &str,
        _label_selector: Option<&str>,
    ) -> Result<Vec<Pod>, ClientError> {
        Ok(Vec::new())
    }

    async fn list_deployments(&self, namespace: &str) -> Result<Vec<Deployment>, ClientError> {
        if self.fail_deployments.load(SeqCst) {
            return Err(backend_down());
        }
        Ok(self
            .deployments
            .lock()
            .iter()
            .filter(|d| d.metadata.namespace.as_deref() == Some(namespace))
            .cloned()
            .collect())
    }

    async fn list_services(&self, _namespace: &str) -> Result<Vec<Service>, ClientError> {
        Ok(Vec::new())
    }

    async fn create_token_review(&self, review: TokenReview) -> Result<TokenReview, ClientError> {
        Ok(review)
    }

    async fn pod_proxy_get(
        &self,
        _namespace: &str,
        _pod: &str,
        _port: u16,
        _path: &str,
    ) -> Result<String, ClientError> {
        Ok(String::new())
    }

    async fn pod_proxy_post(
        &self,
        _namespace: &str,
        _pod: &str,
        _port: u16,
        _path: &str,
    ) -> Result<String, ClientError> {
        Ok(String::new())
    }
}

struct MockProvider {
    cp: Arc<MockControlPlane>,
    privileged: ClusterClients,
}

impl MockProvider {
    fn new(cp: Arc<MockControlPlane>) -> Self {
        let client: Arc<dyn ControlPlane> = cp.clone();
        Self {
            privileged: ClusterClients::new("Kubernetes", client),
            cp,
        }
    }
}

#[async_trait::async_trait]
impl ClientProvider for MockProvider {
    async fn clients_for(&self, _identity: &CallerIdentity) -> Result<ClusterClients, AuthError> {
        let client: Arc<dyn ControlPlane> = self.cp.clone();
        Ok(ClusterClients::new("Kubernetes", client))
    }

    fn privileged_clients(&self) -> ClusterClients {
        self.privileged.clone()
    }
}

struct MockMetrics;

#[async_trait::async_trait]
impl MetricsClient for MockMetrics {
    async fn namespace_request_rate(&self, _namespace: &str) -> Result<f64, BackendError> {
        Ok(0.0)
    }

    async fn workload_error_ratio(
        &self,
        _namespace: &str,
        _workload: &str,
    ) -> Result<f64, BackendError> {
        Ok(0.0)
    }
}

#[derive(Default)]
struct MockMetricsFactory {
    fail: AtomicBool,
    connects: AtomicUsize,
}

#[async_trait::async_trait]
impl MetricsFactory for MockMetricsFactory {
    async fn connect(&self) -> Result<Arc<dyn MetricsClient>, BackendError> {
        self.connects.fetch_add(1, SeqCst);
        if self.fail.load(SeqCst) {
            return Err(BackendError::Metrics("injected outage".to_string()));
        }
        Ok(Arc::new(MockMetrics))
    }
}

struct MockTracing;

#[async_trait::async_trait]
impl TracingClient for MockTracing {
    async fn service_traces(
        &self,
        _namespace: &str,
        _service: &str,
        _limit: usize,
    ) -> Result<Vec<TraceSummary>, BackendError> {
        Ok(Vec::new())
    }
}

#[derive(Default)]
struct MockTracingFactory {
    connects: AtomicUsize,
    tokens: Mutex<Vec<String>>,
}

#[async_trait::async_trait]
impl TracingFactory for MockTracingFactory {
    async fn connect(
        &self,
        identity: &CallerIdentity,
    ) -> Result<Arc<dyn TracingClient>, BackendError> {
        self.connects.fetch_add(1, SeqCst);
        self.tokens.lock().push(identity.token().to_string());
        Ok(Arc::new(MockTracing))
    }
}

struct Harness {
    cp: Arc<MockControlPlane>,
    provider: Arc<MockProvider>,
    metrics: Arc<MockMetricsFactory>,
    tracing: Arc<MockTracingFactory>,
    ctx: Arc<ProcessContext>,
}

fn harness(config: Config) -> Harness {
    let cp = Arc::new(MockControlPlane::default());
    let provider = Arc::new(MockProvider::new(cp.clone()));
    let metrics = Arc::new(MockMetricsFactory::default());
    let tracing = Arc::new(MockTracingFactory::default());
    let ctx = ProcessContext::new(
        config,
        provider.clone(),
        metrics.clone(),
        tracing.clone(),
        Arc::new(StandardEvaluator::default()),
    );
    Harness {
        cp,
        provider,
        metrics,
        tracing,
        ctx,
    }
}

fn uncached_config() -> Config {
    Config {
        cache_enabled: false,
        ..Config::default()
    }
}

fn alice() -> CallerIdentity {
    CallerIdentity::new("alice-token")
}

fn mk_namespace(name: &str) -> Namespace {
    Namespace {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            ..ObjectMeta::default()
        },
        ..Namespace::default()
    }
}

fn mk_mesh_config_map(namespace: &str, name: &str, mesh: &str) -> ConfigMap {
    ConfigMap {
        metadata: ObjectMeta {
            namespace: Some(namespace.to_string()),
            name: Some(name.to_string()),
            ..ObjectMeta::default()
        },
        data: Some(btreemap! { "mesh".to_string() => mesh.to_string() }),
        ..ConfigMap::default()
    }
}

fn mk_pa(namespace: &str, name: &str, mode: MtlsMode) -> PeerAuthentication {
    PeerAuthentication {
        metadata: ObjectMeta {
            namespace: Some(namespace.to_string()),
            name: Some(name.to_string()),
            ..ObjectMeta::default()
        },
        spec: PeerAuthenticationSpec {
            selector: None,
            mtls: Some(PeerAuthenticationMtls { mode: Some(mode) }),
        },
    }
}

fn mk_dr(namespace: &str, name: &str, host: &str) -> DestinationRule {
    DestinationRule {
        metadata: ObjectMeta {
            namespace: Some(namespace.to_string()),
            name: Some(name.to_string()),
            ..ObjectMeta::default()
        },
        spec: DestinationRuleSpec {
            host: Some(host.to_string()),
            traffic_policy: None,
        },
    }
}

fn mk_deployment(namespace: &str, name: &str) -> Deployment {
    Deployment {
        metadata: ObjectMeta {
            namespace: Some(namespace.to_string()),
            name: Some(name.to_string()),
            ..ObjectMeta::default()
        },
        ..Deployment::default()
    }
}

// === context lifecycle ===

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn start_runs_cache_setup_exactly_once() {
    let h = harness(Config::default());
    h.cp.namespaces.lock().push(mk_namespace("bookinfo"));

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let ctx = h.ctx.clone();
            tokio::spawn(async move { ctx.start().await })
        })
        .collect();
    for task in tasks {
        task.await.expect("start task");
    }

    assert_eq!(h.cp.namespace_list_calls.load(SeqCst), 1);
    assert!(h.ctx.is_namespace_cached("bookinfo"));
    assert!(!h.ctx.is_namespace_cached("default"));
}

#[tokio::test]
async fn failed_cache_setup_leaves_the_process_uncached_for_good() {
    let config = Config {
        accessible_namespaces: AccessibleNamespaces::List(vec!["bookinfo".to_string()]),
        ..Config::default()
    };
    let h = harness(config);
    h.cp.fail_namespaces.store(true, SeqCst);
    h.ctx.start().await;

    // The outage clears, but the once-guard has already fired.
    h.cp.fail_namespaces.store(false, SeqCst);
    h.cp.namespaces.lock().push(mk_namespace("bookinfo"));
    h.ctx.start().await;

    assert!(!h.ctx.is_namespace_cached("bookinfo"));
    assert_eq!(h.cp.namespace_list_calls.load(SeqCst), 1);
}

#[tokio::test]
async fn resource_cached_requires_namespace_cached() {
    let h = harness(Config::default());
    h.cp.namespaces.lock().push(mk_namespace("bookinfo"));
    h.ctx.start().await;

    assert!(h.ctx.is_resource_cached("bookinfo", ResourceKind::ConfigMap));
    assert!(!h.ctx.is_namespace_cached("hidden"));
    assert!(!h.ctx.is_resource_cached("hidden", ResourceKind::ConfigMap));
}

#[tokio::test]
async fn uncached_mode_answers_no_membership() {
    let h = harness(uncached_config());
    h.ctx.start().await;
    assert!(!h.ctx.is_namespace_cached("bookinfo"));
    assert!(!h.ctx.is_resource_cached("bookinfo", ResourceKind::Pod));
    // Stopping without a cache is a no-op.
    h.ctx.stop();
}

// === layer construction ===

#[tokio::test]
async fn layers_for_one_identity_are_independent() {
    let h = harness(uncached_config());
    h.ctx.start().await;

    let one = h.ctx.layer_for(&alice()).await.expect("layer");
    let two = h.ctx.layer_for(&alice()).await.expect("layer");

    assert!(!Arc::ptr_eq(&one.namespace, &two.namespace));
    assert!(!Arc::ptr_eq(&one.tls, &two.tls));
    assert!(h
        .provider
        .privileged_clients()
        .same_instance(&h.provider.privileged_clients()));
}

#[tokio::test]
async fn layer_state_never_leaks_across_instances() {
    let h = harness(uncached_config());
    h.ctx.start().await;
    h.cp.config_maps.lock().push(mk_mesh_config_map(
        "istio-system",
        "istio",
        "enableAutoMtls: false\n",
    ));

    // The first layer resolves the flag and keeps it for its lifetime.
    let one = h.ctx.layer_for(&alice()).await.expect("layer");
    assert!(!one.tls.has_auto_mtls().await);

    // A later layer re-resolves from scratch; with the config map gone it
    // fails open, while the first layer's cached value is untouched.
    h.cp.config_maps.lock().clear();
    let two = h.ctx.layer_for(&alice()).await.expect("layer");
    assert!(two.tls.has_auto_mtls().await);
    assert!(!one.tls.has_auto_mtls().await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_layer_requests_for_one_identity_both_succeed() {
    let h = harness(uncached_config());
    h.ctx.start().await;

    let (one, two) = tokio::join!(h.ctx.layer_for(&alice()), h.ctx.layer_for(&alice()));
    let one = one.expect("layer");
    let two = two.expect("layer");
    assert!(!Arc::ptr_eq(&one.istio_config, &two.istio_config));
}

#[tokio::test]
async fn metrics_construction_failure_is_retried_on_the_next_request() {
    let h = harness(uncached_config());
    h.ctx.start().await;

    h.metrics.fail.store(true, SeqCst);
    match h.ctx.layer_for(&alice()).await {
        Err(LayerError::Backend(BackendError::Metrics(_))) => {}
        other => panic!(
            "expected a metrics backend error, got {:?}",
            other.map(|_| "a layer")
        ),
    }

    h.metrics.fail.store(false, SeqCst);
    h.ctx.layer_for(&alice()).await.expect("layer after retry");
    assert_eq!(h.metrics.connects.load(SeqCst), 2);
}

#[tokio::test]
async fn tracing_client_keeps_the_first_caller_token() {
    let h = harness(uncached_config());
    h.ctx.start().await;

    let alice_layer = h
        .ctx
        .layer_for(&CallerIdentity::new("alice-token"))
        .await
        .expect("layer");
    alice_layer
        .tracing
        .service_traces("bookinfo", "ratings", 10)
        .await
        .expect("traces");

    let bob_layer = h
        .ctx
        .layer_for(&CallerIdentity::new("bob-token"))
        .await
        .expect("layer");
    bob_layer
        .tracing
        .service_traces("bookinfo", "ratings", 10)
        .await
        .expect("traces");

    assert_eq!(h.tracing.connects.load(SeqCst), 1);
    assert_eq!(*h.tracing.tokens.lock(), vec!["alice-token".to_string()]);
}

// === mTLS posture ===

#[tokio::test]
async fn auto_mtls_fails_open_and_does_not_cache_the_failure() {
    let h = harness(uncached_config());
    h.ctx.start().await;
    let layer = h.ctx.layer_for(&alice()).await.expect("layer");

    // No mesh config map yet: fail open.
    assert!(layer.tls.has_auto_mtls().await);

    // The flag re-resolves once the lookup works, and then sticks.
    h.cp.config_maps.lock().push(mk_mesh_config_map(
        "istio-system",
        "istio",
        "enableAutoMtls: false\n",
    ));
    assert!(!layer.tls.has_auto_mtls().await);
    h.cp.config_maps.lock().clear();
    assert!(!layer.tls.has_auto_mtls().await);
}

#[tokio::test]
async fn namespace_status_is_tagged_and_mesh_status_is_not() {
    let h = harness(uncached_config());
    h.ctx.start().await;
    h.cp
        .namespaces
        .lock()
        .extend([mk_namespace("istio-system"), mk_namespace("default")]);
    h.cp
        .peer_authentications
        .lock()
        .push(mk_pa("default", "default", MtlsMode::Strict));

    let layer = h.ctx.layer_for(&alice()).await.expect("layer");
    let status = layer
        .tls
        .namespace_wide_status("default")
        .await
        .expect("status");
    assert_eq!(status.namespace.as_deref(), Some("default"));
    assert_eq!(status.status, Some(MtlsLabel::Enabled));

    let mesh = layer
        .tls
        .mesh_wide_status(&["default".to_string()])
        .await
        .expect("status");
    assert!(mesh.namespace.is_none());
    assert_eq!(mesh.status, Some(MtlsLabel::NotEnabled));
}

#[tokio::test]
async fn root_namespace_policies_never_count_as_namespace_local() {
    let h = harness(uncached_config());
    h.ctx.start().await;
    h.cp.namespaces.lock().push(mk_namespace("istio-system"));
    h.cp
        .peer_authentications
        .lock()
        .push(mk_pa("istio-system", "mesh-wide", MtlsMode::Strict));

    let layer = h.ctx.layer_for(&alice()).await.expect("layer");

    let ns_status = layer
        .tls
        .namespace_wide_status("istio-system")
        .await
        .expect("status");
    assert_eq!(ns_status.status, Some(MtlsLabel::NotEnabled));

    let mesh_status = layer
        .tls
        .mesh_wide_status(&["istio-system".to_string()])
        .await
        .expect("status");
    assert_eq!(mesh_status.status, Some(MtlsLabel::Enabled));
}

#[tokio::test]
async fn namespace_listing_failure_yields_an_undetermined_status() {
    let h = harness(uncached_config());
    h.ctx.start().await;
    let layer = h.ctx.layer_for(&alice()).await.expect("layer");

    h.cp.fail_namespaces.store(true, SeqCst);
    let status = layer
        .tls
        .namespace_wide_status("default")
        .await
        .expect("listing failure is not surfaced");
    assert_eq!(status, MtlsStatus::undetermined());
}

#[tokio::test]
async fn cross_namespace_destination_rules_reach_the_target_namespace() {
    let h = harness(uncached_config());
    h.ctx.start().await;
    h.cp
        .namespaces
        .lock()
        .extend([mk_namespace("default"), mk_namespace("ops")]);
    // A rule in `ops` disabling TLS toward default's services.
    let mut dr = mk_dr("ops", "disable-default", "*.default.svc.cluster.local");
    dr.spec.traffic_policy = Some(meshview_k8s_api::networking::TrafficPolicy {
        tls: Some(meshview_k8s_api::networking::ClientTls {
            mode: Some(meshview_k8s_api::networking::TlsMode::Disable),
        }),
    });
    h.cp.destination_rules.lock().push(dr);
    h.cp
        .peer_authentications
        .lock()
        .push(mk_pa("default", "default", MtlsMode::Strict));

    let layer = h.ctx.layer_for(&alice()).await.expect("layer");
    let status = layer
        .tls
        .namespace_wide_status("default")
        .await
        .expect("status");
    assert_eq!(status.status, Some(MtlsLabel::PartiallyEnabled));
}

// === caching decision ===

#[tokio::test]
async fn workload_reads_are_served_from_the_cache_when_enabled() {
    let h = harness(Config::default());
    h.cp.namespaces.lock().push(mk_namespace("bookinfo"));
    h.cp
        .deployments
        .lock()
        .push(mk_deployment("bookinfo", "ratings"));
    h.ctx.start().await;

    // Live deployment reads now fail; cached reads keep working.
    h.cp.fail_deployments.store(true, SeqCst);
    let layer = h.ctx.layer_for(&alice()).await.expect("layer");
    let workloads = layer
        .workload
        .list_workloads("bookinfo")
        .await
        .expect("served from cache");
    assert_eq!(workloads.len(), 1);
    assert_eq!(workloads[0].name, "ratings");

    // Another layer over the unchanged cache sees the same snapshot.
    let other = h.ctx.layer_for(&alice()).await.expect("layer");
    let again = other
        .workload
        .list_workloads("bookinfo")
        .await
        .expect("served from cache");
    assert_eq!(workloads, again);
}

#[tokio::test]
async fn workload_reads_use_the_live_client_without_a_cache() {
    let h = harness(uncached_config());
    h.ctx.start().await;
    h.cp
        .deployments
        .lock()
        .push(mk_deployment("bookinfo", "ratings"));
    h.cp.fail_deployments.store(true, SeqCst);

    let layer = h.ctx.layer_for(&alice()).await.expect("layer");
    assert!(layer.workload.list_workloads("bookinfo").await.is_err());
}

#[tokio::test]
async fn excluded_workloads_are_hidden() {
    let config = Config {
        excluded_workloads: vec!["istio-egressgateway".to_string()],
        ..uncached_config()
    };
    let h = harness(config);
    h.ctx.start().await;
    h.cp.deployments.lock().extend([
        mk_deployment("bookinfo", "ratings"),
        mk_deployment("bookinfo", "istio-egressgateway"),
    ]);

    let layer = h.ctx.layer_for(&alice()).await.expect("layer");
    let workloads = layer
        .workload
        .list_workloads("bookinfo")
        .await
        .expect("workloads");
    assert_eq!(workloads.len(), 1);
    assert_eq!(workloads[0].name, "ratings");
}

#[tokio::test]
async fn namespace_health_reads_the_metrics_backend() {
    let h = harness(uncached_config());
    h.ctx.start().await;
    let layer = h.ctx.layer_for(&alice()).await.expect("layer");
    let health = layer
        .health
        .namespace_health("bookinfo")
        .await
        .expect("health");
    assert_eq!(health.request_rate, 0.0);
}
