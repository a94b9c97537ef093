//! Read-through composite over the process cache and a live client.

use crate::store::{ResourceCache, ResourceKind};
use meshview_k8s_api::networking::DestinationRule;
use meshview_k8s_api::security::PeerAuthentication;
use meshview_k8s_api::{
    ClientError, ConfigMap, ControlPlane, Deployment, Namespace, Pod, Service, TokenReview,
};
use std::sync::Arc;

/// Answers reads from the process cache when the target namespace and
/// resource kind are covered, falling through to the caller's live client
/// otherwise. Writes and pod-proxy calls always use the live client, so
/// they run under the caller's own identity.
pub struct CachingClient {
    cache: Arc<ResourceCache>,
    live: Arc<dyn ControlPlane>,
}

impl CachingClient {
    pub fn new(cache: Arc<ResourceCache>, live: Arc<dyn ControlPlane>) -> Self {
        Self { cache, live }
    }

    fn covers(&self, namespace: &str, kind: ResourceKind) -> bool {
        self.cache.check_namespace(namespace) && self.cache.check_resource(kind)
    }

    fn covers_cluster_wide(&self, kind: ResourceKind) -> bool {
        self.cache.covers_cluster() && self.cache.check_resource(kind)
    }
}

#[async_trait::async_trait]
impl ControlPlane for CachingClient {
    async fn get_namespace(&self, name: &str) -> Result<Namespace, ClientError> {
        if self.covers(name, ResourceKind::Namespace) {
            if let Some(ns) = self.cache.namespace(name) {
                return Ok(ns);
            }
        }
        self.live.get_namespace(name).await
    }

    async fn list_namespaces(&self) -> Result<Vec<Namespace>, ClientError> {
        if self.covers_cluster_wide(ResourceKind::Namespace) {
            return Ok(self.cache.namespaces());
        }
        self.live.list_namespaces().await
    }

    async fn get_config_map(&self, namespace: &str, name: &str) -> Result<ConfigMap, ClientError> {
        if self.covers(namespace, ResourceKind::ConfigMap) {
            if let Some(cm) = self.cache.config_map(namespace, name) {
                return Ok(cm);
            }
        }
        self.live.get_config_map(namespace, name).await
    }

    async fn list_config_maps(&self, namespace: &str) -> Result<Vec<ConfigMap>, ClientError> {
        if self.covers(namespace, ResourceKind::ConfigMap) {
            return Ok(self.cache.config_maps(namespace));
        }
        self.live.list_config_maps(namespace).await
    }

    async fn list_destination_rules(&self) -> Result<Vec<DestinationRule>, ClientError> {
        if self.covers_cluster_wide(ResourceKind::DestinationRule) {
            return Ok(self.cache.destination_rules());
        }
        self.live.list_destination_rules().await
    }

    async fn list_peer_authentications(&self) -> Result<Vec<PeerAuthentication>, ClientError> {
        if self.covers_cluster_wide(ResourceKind::PeerAuthentication) {
            return Ok(self.cache.peer_authentications());
        }
        self.live.list_peer_authentications().await
    }

    async fn list_pods(
        &self,
        namespace: &str,
        label_selector: Option<&str>,
    ) -> Result<Vec<Pod>, ClientError> {
        // Selector queries are not indexed; only whole-namespace listings
        // are answerable from the snapshot.
        if label_selector.is_none() && self.covers(namespace, ResourceKind::Pod) {
            return Ok(self.cache.pods(namespace));
        }
        self.live.list_pods(namespace, label_selector).await
    }

    async fn list_deployments(&self, namespace: &str) -> Result<Vec<Deployment>, ClientError> {
        if self.covers(namespace, ResourceKind::Deployment) {
            return Ok(self.cache.deployments(namespace));
        }
        self.live.list_deployments(namespace).await
    }

    async fn list_services(&self, namespace: &str) -> Result<Vec<Service>, ClientError> {
        if self.covers(namespace, ResourceKind::Service) {
            return Ok(self.cache.services(namespace));
        }
        self.live.list_services(namespace).await
    }

    async fn create_token_review(&self, review: TokenReview) -> Result<TokenReview, ClientError> {
        self.live.create_token_review(review).await
    }

    async fn pod_proxy_get(
        &self,
        namespace: &str,
        pod: &str,
        port: u16,
        path: &str,
    ) -> Result<String, ClientError> {
        self.live.pod_proxy_get(namespace, pod, port, path).await
    }

    async fn pod_proxy_post(
        &self,
        namespace: &str,
        pod: &str,
        port: u16,
        path: &str,
    ) -> Result<String, ClientError> {
        self.live.pod_proxy_post(namespace, pod, port, path).await
    }
}
