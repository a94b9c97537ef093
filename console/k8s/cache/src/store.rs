//! Process-wide snapshot of control plane resources.
//!
//! The cache is populated exclusively through the privileged service
//! identity and is shared read-only across every request-scoped layer.
//! Caller-scoped writes never touch it. Lookups take a short read lock;
//! population and refresh gather their lists first and swap state under a
//! write lock afterwards, so no lock is ever held across a network call.

use ahash::{AHashMap as HashMap, AHashSet as HashSet};
use kube::ResourceExt;
use meshview_k8s_api::networking::DestinationRule;
use meshview_k8s_api::security::PeerAuthentication;
use meshview_k8s_api::{ClientError, ConfigMap, ControlPlane, Deployment, Namespace, Pod, Service};
use parking_lot::RwLock;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
#[error("cache initialization failed: {0}")]
pub struct CacheInitError(#[from] ClientError);

/// Which namespaces the cache was seeded with.
#[derive(Clone, Debug)]
pub enum CacheScope {
    /// Every namespace visible to the privileged identity.
    Cluster,
    /// A fixed namespace list, for namespace-scoped deployments.
    Namespaces(Vec<String>),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Namespace,
    ConfigMap,
    Deployment,
    Pod,
    Service,
    DestinationRule,
    PeerAuthentication,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Namespace => "Namespace",
            Self::ConfigMap => "ConfigMap",
            Self::Deployment => "Deployment",
            Self::Pod => "Pod",
            Self::Service => "Service",
            Self::DestinationRule => "DestinationRule",
            Self::PeerAuthentication => "PeerAuthentication",
        }
    }

    fn all() -> impl Iterator<Item = Self> {
        [
            Self::Namespace,
            Self::ConfigMap,
            Self::Deployment,
            Self::Pod,
            Self::Service,
            Self::DestinationRule,
            Self::PeerAuthentication,
        ]
        .into_iter()
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Default)]
struct Snapshot {
    namespaces: HashMap<String, Namespace>,
    config_maps: HashMap<String, HashMap<String, ConfigMap>>,
    deployments: HashMap<String, Vec<Deployment>>,
    pods: HashMap<String, Vec<Pod>>,
    services: HashMap<String, Vec<Service>>,
    destination_rules: HashMap<String, Vec<DestinationRule>>,
    peer_authentications: HashMap<String, Vec<PeerAuthentication>>,
}

/// One namespace's worth of freshly listed resources, gathered before any
/// lock is taken.
struct NamespaceListing {
    namespace: Namespace,
    config_maps: Vec<ConfigMap>,
    deployments: Vec<Deployment>,
    pods: Vec<Pod>,
    services: Vec<Service>,
}

pub struct ResourceCache {
    scope: CacheScope,
    kinds: RwLock<HashSet<ResourceKind>>,
    covered: RwLock<HashSet<String>>,
    inner: RwLock<Snapshot>,
    stopped: AtomicBool,
}

// === impl ResourceCache ===

impl ResourceCache {
    /// Lists every maintained resource kind under the privileged client and
    /// assembles the initial snapshot.
    pub async fn build(
        client: Arc<dyn ControlPlane>,
        scope: CacheScope,
    ) -> Result<Self, CacheInitError> {
        let namespaces = match &scope {
            CacheScope::Cluster => client.list_namespaces().await?,
            CacheScope::Namespaces(names) => {
                let mut out = Vec::with_capacity(names.len());
                for name in names {
                    out.push(client.get_namespace(name).await?);
                }
                out
            }
        };

        let mut snapshot = Snapshot::default();
        let mut covered = HashSet::default();
        for namespace in namespaces {
            let listing = Self::list_namespace(&client, namespace).await?;
            Self::store_listing(&mut snapshot, listing, &mut covered);
        }
        for dr in client.list_destination_rules().await? {
            if let Some(ns) = dr.namespace() {
                snapshot.destination_rules.entry(ns).or_default().push(dr);
            }
        }
        for pa in client.list_peer_authentications().await? {
            if let Some(ns) = pa.namespace() {
                snapshot
                    .peer_authentications
                    .entry(ns)
                    .or_default()
                    .push(pa);
            }
        }

        tracing::info!(namespaces = covered.len(), "resource cache seeded");
        Ok(Self {
            scope,
            kinds: RwLock::new(ResourceKind::all().collect()),
            covered: RwLock::new(covered),
            inner: RwLock::new(snapshot),
            stopped: AtomicBool::new(false),
        })
    }

    async fn list_namespace(
        client: &Arc<dyn ControlPlane>,
        namespace: Namespace,
    ) -> Result<NamespaceListing, CacheInitError> {
        let name = namespace.name_any();
        Ok(NamespaceListing {
            config_maps: client.list_config_maps(&name).await?,
            deployments: client.list_deployments(&name).await?,
            pods: client.list_pods(&name, None).await?,
            services: client.list_services(&name).await?,
            namespace,
        })
    }

    fn store_listing(
        snapshot: &mut Snapshot,
        listing: NamespaceListing,
        covered: &mut HashSet<String>,
    ) {
        let name = listing.namespace.name_any();
        snapshot
            .namespaces
            .insert(name.clone(), listing.namespace);
        snapshot.config_maps.insert(
            name.clone(),
            listing
                .config_maps
                .into_iter()
                .map(|cm| (cm.name_any(), cm))
                .collect(),
        );
        snapshot.deployments.insert(name.clone(), listing.deployments);
        snapshot.pods.insert(name.clone(), listing.pods);
        snapshot.services.insert(name.clone(), listing.services);
        covered.insert(name);
    }

    /// True when the namespace's resources are served from this cache.
    pub fn check_namespace(&self, namespace: &str) -> bool {
        !self.stopped.load(Ordering::Acquire) && self.covered.read().contains(namespace)
    }

    /// True when the resource kind is currently maintained. A kind is only
    /// meaningfully cached for namespaces that are themselves cached.
    pub fn check_resource(&self, kind: ResourceKind) -> bool {
        !self.stopped.load(Ordering::Acquire) && self.kinds.read().contains(&kind)
    }

    /// True when the cache was seeded with every visible namespace, which is
    /// what makes all-namespace listings answerable from the snapshot.
    pub fn covers_cluster(&self) -> bool {
        !self.stopped.load(Ordering::Acquire) && matches!(self.scope, CacheScope::Cluster)
    }

    pub fn namespaces(&self) -> Vec<Namespace> {
        self.inner.read().namespaces.values().cloned().collect()
    }

    pub fn namespace(&self, name: &str) -> Option<Namespace> {
        self.inner.read().namespaces.get(name).cloned()
    }

    pub fn config_map(&self, namespace: &str, name: &str) -> Option<ConfigMap> {
        self.inner
            .read()
            .config_maps
            .get(namespace)
            .and_then(|by_name| by_name.get(name))
            .cloned()
    }

    pub fn config_maps(&self, namespace: &str) -> Vec<ConfigMap> {
        self.inner
            .read()
            .config_maps
            .get(namespace)
            .map(|by_name| by_name.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn deployments(&self, namespace: &str) -> Vec<Deployment> {
        self.inner
            .read()
            .deployments
            .get(namespace)
            .cloned()
            .unwrap_or_default()
    }

    pub fn pods(&self, namespace: &str) -> Vec<Pod> {
        self.inner
            .read()
            .pods
            .get(namespace)
            .cloned()
            .unwrap_or_default()
    }

    pub fn services(&self, namespace: &str) -> Vec<Service> {
        self.inner
            .read()
            .services
            .get(namespace)
            .cloned()
            .unwrap_or_default()
    }

    pub fn destination_rules(&self) -> Vec<DestinationRule> {
        self.inner
            .read()
            .destination_rules
            .values()
            .flatten()
            .cloned()
            .collect()
    }

    pub fn peer_authentications(&self) -> Vec<PeerAuthentication> {
        self.inner
            .read()
            .peer_authentications
            .values()
            .flatten()
            .cloned()
            .collect()
    }

    /// Drops one namespace from the cache. Reads for it fall through to the
    /// live client until [`ResourceCache::refresh_namespace`] runs.
    pub fn invalidate_namespace(&self, namespace: &str) {
        self.covered.write().remove(namespace);
        let mut snapshot = self.inner.write();
        snapshot.namespaces.remove(namespace);
        snapshot.config_maps.remove(namespace);
        snapshot.deployments.remove(namespace);
        snapshot.pods.remove(namespace);
        snapshot.services.remove(namespace);
        snapshot.destination_rules.remove(namespace);
        snapshot.peer_authentications.remove(namespace);
        tracing::debug!(%namespace, "cache namespace invalidated");
    }

    /// Stops maintaining one resource kind; reads for it fall through to the
    /// live client from now on.
    pub fn invalidate_kind(&self, kind: ResourceKind) {
        self.kinds.write().remove(&kind);
        tracing::debug!(%kind, "cache resource kind invalidated");
    }

    /// Relists one namespace under the privileged client and swaps its
    /// entries back in.
    pub async fn refresh_namespace(
        &self,
        client: &Arc<dyn ControlPlane>,
        namespace: &str,
    ) -> Result<(), CacheInitError> {
        let ns = client.get_namespace(namespace).await?;
        let listing = Self::list_namespace(client, ns).await?;
        let mut snapshot = self.inner.write();
        let mut covered = HashSet::default();
        Self::store_listing(&mut snapshot, listing, &mut covered);
        drop(snapshot);
        self.covered.write().extend(covered);
        Ok(())
    }

    /// Releases the snapshot. Idempotent; membership checks answer `false`
    /// afterwards.
    pub fn stop(&self) {
        if self.stopped.swap(true, Ordering::AcqRel) {
            return;
        }
        self.covered.write().clear();
        self.kinds.write().clear();
        *self.inner.write() = Snapshot::default();
        tracing::info!("resource cache stopped");
    }
}
