//! Mutual-TLS posture of the mesh and of single namespaces.

use crate::config::Config;
use crate::services::istio_config::{IstioConfigCriteria, IstioConfigService};
use crate::services::namespace::NamespaceService;
use meshview_core::mtls::{MtlsEvaluator, MtlsQuery, MtlsStatus, SecurityPolicySet};
use meshview_k8s_api::filters;
use meshview_k8s_api::mesh::MeshConfig;
use meshview_k8s_api::networking::DestinationRule;
use meshview_k8s_api::{ClientError, ControlPlane};
use meshview_k8s_cache::{ResourceCache, ResourceKind};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::debug;

pub struct TlsService {
    k8s: Arc<dyn ControlPlane>,
    istio_config: Arc<IstioConfigService>,
    namespace: Arc<NamespaceService>,
    cache: Option<Arc<ResourceCache>>,
    config: Config,
    evaluator: Arc<dyn MtlsEvaluator>,
    /// Resolved at most once per layer; failed resolutions are not cached.
    auto_mtls: OnceCell<bool>,
}

// === impl TlsService ===

impl TlsService {
    pub(crate) fn new(
        k8s: Arc<dyn ControlPlane>,
        istio_config: Arc<IstioConfigService>,
        namespace: Arc<NamespaceService>,
        cache: Option<Arc<ResourceCache>>,
        config: Config,
        evaluator: Arc<dyn MtlsEvaluator>,
    ) -> Self {
        Self {
            k8s,
            istio_config,
            namespace,
            cache,
            config,
            evaluator,
            auto_mtls: OnceCell::new(),
        }
    }

    /// Posture of the whole mesh: root-namespace peer authentications
    /// against destination rules across the given namespaces. The result
    /// carries no namespace tag.
    pub async fn mesh_wide_status(&self, namespaces: &[String]) -> Result<MtlsStatus, ClientError> {
        let criteria = IstioConfigCriteria::all_namespaces()
            .with_destination_rules()
            .with_peer_authentications();
        let config_list = self.istio_config.config_list(&criteria).await?;

        let policies = SecurityPolicySet {
            peer_authentications: filters::peer_authentications_in_namespace(
                &self.config.root_namespace,
                &config_list.peer_authentications,
            ),
            destination_rules: filters::destination_rules_in_namespaces(
                namespaces,
                &config_list.destination_rules,
            ),
        };
        let auto_mtls = self.has_auto_mtls().await;
        let label = self.evaluator.evaluate(&MtlsQuery {
            namespace: None,
            policies: &policies,
            auto_mtls,
            allow_permissive: false,
        });
        Ok(MtlsStatus::mesh_wide(label))
    }

    /// Posture of one namespace, tagged with it.
    pub async fn namespace_wide_status(&self, namespace: &str) -> Result<MtlsStatus, ClientError> {
        let namespaces = match self.namespace.names().await {
            Ok(names) => names,
            Err(error) => {
                // Listing failure is swallowed: the caller gets an
                // undetermined posture instead of an error.
                debug!(%error, %namespace, "namespace listing failed; mTLS posture undetermined");
                return Ok(MtlsStatus::undetermined());
            }
        };

        let criteria = IstioConfigCriteria::all_namespaces()
            .with_destination_rules()
            .with_peer_authentications();
        let config_list = self.istio_config.config_list(&criteria).await?;

        let peer_authentications = if self.config.is_root_namespace(namespace) {
            // Root-namespace policies are mesh-wide by definition; they are
            // not counted again as namespace-local.
            Vec::new()
        } else {
            filters::peer_authentications_in_namespace(
                namespace,
                &config_list.peer_authentications,
            )
        };
        let policies = SecurityPolicySet {
            peer_authentications,
            // Rules anywhere in the reachable namespace set can steer this
            // namespace's traffic.
            destination_rules: filters::destination_rules_in_namespaces(
                &namespaces,
                &config_list.destination_rules,
            ),
        };
        let auto_mtls = self.has_auto_mtls().await;
        let label = self.evaluator.evaluate(&MtlsQuery {
            namespace: Some(namespace),
            policies: &policies,
            auto_mtls,
            allow_permissive: false,
        });
        Ok(MtlsStatus::namespaced(namespace, label))
    }

    /// Destination rules living in any of the given namespaces.
    pub async fn all_destination_rules(
        &self,
        namespaces: &[String],
    ) -> Result<Vec<DestinationRule>, ClientError> {
        let criteria = IstioConfigCriteria::all_namespaces().with_destination_rules();
        let config_list = self.istio_config.config_list(&criteria).await?;
        Ok(filters::destination_rules_in_namespaces(
            namespaces,
            &config_list.destination_rules,
        ))
    }

    /// Whether the control plane auto-negotiates mutual TLS. Sticky for the
    /// layer's lifetime once resolved; fails open to `true` without caching
    /// the failure, so a later call re-resolves.
    pub async fn has_auto_mtls(&self) -> bool {
        match self
            .auto_mtls
            .get_or_try_init(|| self.resolve_auto_mtls())
            .await
        {
            Ok(enabled) => *enabled,
            Err(error) => {
                debug!(%error, "mesh config lookup failed; assuming auto-mTLS");
                true
            }
        }
    }

    async fn resolve_auto_mtls(&self) -> anyhow::Result<bool> {
        let ns = &self.config.istio_namespace;
        let name = &self.config.mesh_config_map;
        let cm = match &self.cache {
            Some(cache)
                if cache.check_namespace(ns) && cache.check_resource(ResourceKind::ConfigMap) =>
            {
                cache
                    .config_map(ns, name)
                    .ok_or_else(|| anyhow::anyhow!("config map {ns}/{name} not cached"))?
            }
            _ => self.k8s.get_config_map(ns, name).await?,
        };
        Ok(MeshConfig::from_config_map(&cm)?.auto_mtls_enabled())
    }
}
