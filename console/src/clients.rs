//! Per-identity control plane client sets.

use ahash::AHashMap as HashMap;
use kube::config::AuthInfo;
use meshview_core::{AuthError, CallerIdentity};
use meshview_k8s_api::{ControlPlane, KubeControlPlane};
use parking_lot::RwLock;
use secrecy::SecretString;
use std::sync::Arc;

/// Control plane clients for one identity, keyed by cluster name.
#[derive(Clone)]
pub struct ClusterClients {
    home_name: String,
    home: Arc<dyn ControlPlane>,
    clusters: Arc<HashMap<String, Arc<dyn ControlPlane>>>,
}

// === impl ClusterClients ===

impl ClusterClients {
    pub fn new(home_name: impl Into<String>, home: Arc<dyn ControlPlane>) -> Self {
        let home_name = home_name.into();
        let mut clusters = HashMap::default();
        clusters.insert(home_name.clone(), home.clone());
        Self {
            home_name,
            home,
            clusters: Arc::new(clusters),
        }
    }

    /// Adds a remote cluster's client to the set.
    pub fn with_remote(self, name: impl Into<String>, client: Arc<dyn ControlPlane>) -> Self {
        let mut clusters = (*self.clusters).clone();
        clusters.insert(name.into(), client);
        Self {
            clusters: Arc::new(clusters),
            ..self
        }
    }

    /// The client for the cluster the console runs in.
    pub fn home(&self) -> &Arc<dyn ControlPlane> {
        &self.home
    }

    pub fn home_name(&self) -> &str {
        &self.home_name
    }

    pub fn get(&self, cluster: &str) -> Option<&Arc<dyn ControlPlane>> {
        self.clusters.get(cluster)
    }

    /// Identity equality: true when both sets are the same minted instance,
    /// not merely equal contents.
    pub fn same_instance(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.clusters, &other.clusters)
    }
}

/// Mints caller-scoped client sets and owns the fixed privileged set.
#[async_trait::async_trait]
pub trait ClientProvider: Send + Sync {
    async fn clients_for(&self, identity: &CallerIdentity) -> Result<ClusterClients, AuthError>;

    /// The process-global service identity set, used only for cache seeding.
    fn privileged_clients(&self) -> ClusterClients;
}

/// Provider backed by a kubeconfig: caller sets are minted by stamping the
/// caller's bearer token into the base configuration.
pub struct KubeClientProvider {
    base: kube::Config,
    cluster_name: String,
    privileged: ClusterClients,
    minted: RwLock<HashMap<CallerIdentity, ClusterClients>>,
}

// === impl KubeClientProvider ===

impl KubeClientProvider {
    pub fn new(
        base: kube::Config,
        cluster_name: impl Into<String>,
        privileged: kube::Client,
    ) -> Self {
        let cluster_name = cluster_name.into();
        let privileged = ClusterClients::new(
            cluster_name.clone(),
            Arc::new(KubeControlPlane::new(privileged)) as Arc<dyn ControlPlane>,
        );
        Self {
            base,
            cluster_name,
            privileged,
            minted: RwLock::new(HashMap::default()),
        }
    }
}

#[async_trait::async_trait]
impl ClientProvider for KubeClientProvider {
    async fn clients_for(&self, identity: &CallerIdentity) -> Result<ClusterClients, AuthError> {
        if let Some(set) = self.minted.read().get(identity) {
            return Ok(set.clone());
        }

        let mut config = self.base.clone();
        config.auth_info = AuthInfo {
            token: Some(SecretString::new(identity.token().to_string())),
            ..AuthInfo::default()
        };
        let client =
            kube::Client::try_from(config).map_err(|error| AuthError::new(error.to_string()))?;
        let set = ClusterClients::new(
            self.cluster_name.clone(),
            Arc::new(KubeControlPlane::new(client)) as Arc<dyn ControlPlane>,
        );

        // Two requests racing on a fresh identity both mint; the last insert
        // wins and later requests reuse it.
        self.minted.write().insert(identity.clone(), set.clone());
        Ok(set)
    }

    fn privileged_clients(&self) -> ClusterClients {
        self.privileged.clone()
    }
}
