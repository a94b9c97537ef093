//! The narrow control plane surface the console consumes.
//!
//! Domain services never see `kube::Client` directly; they hold
//! `Arc<dyn ControlPlane>` handles so reads can be transparently rerouted
//! through the process cache and so tests can substitute fixtures.

use crate::{networking::DestinationRule, security::PeerAuthentication};
use k8s_openapi::api::{
    apps::v1::Deployment,
    authentication::v1::TokenReview,
    core::v1::{ConfigMap, Namespace, Pod, Service},
};
use kube::api::{Api, ListParams, PostParams};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("malformed request: {0}")]
    Request(String),
    #[error("api request failed: {0}")]
    Api(#[source] Box<kube::Error>),
}

impl ClientError {
    fn from_kube(err: kube::Error) -> Self {
        match err {
            kube::Error::Api(ref resp) if resp.code == 401 => {
                Self::Unauthorized(resp.message.clone())
            }
            kube::Error::Api(ref resp) if resp.code == 403 => Self::Forbidden(resp.message.clone()),
            kube::Error::Api(ref resp) if resp.code == 404 => Self::NotFound(resp.message.clone()),
            err => Self::Api(Box::new(err)),
        }
    }
}

#[async_trait::async_trait]
pub trait ControlPlane: Send + Sync {
    async fn get_namespace(&self, name: &str) -> Result<Namespace, ClientError>;
    async fn list_namespaces(&self) -> Result<Vec<Namespace>, ClientError>;
    async fn get_config_map(&self, namespace: &str, name: &str) -> Result<ConfigMap, ClientError>;
    async fn list_config_maps(&self, namespace: &str) -> Result<Vec<ConfigMap>, ClientError>;
    async fn list_destination_rules(&self) -> Result<Vec<DestinationRule>, ClientError>;
    async fn list_peer_authentications(&self) -> Result<Vec<PeerAuthentication>, ClientError>;
    async fn list_pods(
        &self,
        namespace: &str,
        label_selector: Option<&str>,
    ) -> Result<Vec<Pod>, ClientError>;
    async fn list_deployments(&self, namespace: &str) -> Result<Vec<Deployment>, ClientError>;
    async fn list_services(&self, namespace: &str) -> Result<Vec<Service>, ClientError>;
    async fn create_token_review(&self, review: TokenReview) -> Result<TokenReview, ClientError>;
    async fn pod_proxy_get(
        &self,
        namespace: &str,
        pod: &str,
        port: u16,
        path: &str,
    ) -> Result<String, ClientError>;
    async fn pod_proxy_post(
        &self,
        namespace: &str,
        pod: &str,
        port: u16,
        path: &str,
    ) -> Result<String, ClientError>;
}

/// `ControlPlane` served by a live API server connection.
#[derive(Clone)]
pub struct KubeControlPlane {
    client: kube::Client,
}

impl KubeControlPlane {
    pub fn new(client: kube::Client) -> Self {
        Self { client }
    }

    fn pod_proxy_uri(namespace: &str, pod: &str, port: u16, path: &str) -> String {
        format!("/api/v1/namespaces/{namespace}/pods/{pod}:{port}/proxy{path}")
    }
}

#[async_trait::async_trait]
impl ControlPlane for KubeControlPlane {
    async fn get_namespace(&self, name: &str) -> Result<Namespace, ClientError> {
        Api::<Namespace>::all(self.client.clone())
            .get(name)
            .await
            .map_err(ClientError::from_kube)
    }

    async fn list_namespaces(&self) -> Result<Vec<Namespace>, ClientError> {
        let list = Api::<Namespace>::all(self.client.clone())
            .list(&ListParams::default())
            .await
            .map_err(ClientError::from_kube)?;
        Ok(list.items)
    }

    async fn get_config_map(&self, namespace: &str, name: &str) -> Result<ConfigMap, ClientError> {
        Api::<ConfigMap>::namespaced(self.client.clone(), namespace)
            .get(name)
            .await
            .map_err(ClientError::from_kube)
    }

    async fn list_config_maps(&self, namespace: &str) -> Result<Vec<ConfigMap>, ClientError> {
        let list = Api::<ConfigMap>::namespaced(self.client.clone(), namespace)
            .list(&ListParams::default())
            .await
            .map_err(ClientError::from_kube)?;
        Ok(list.items)
    }

    async fn list_destination_rules(&self) -> Result<Vec<DestinationRule>, ClientError> {
        let list = Api::<DestinationRule>::all(self.client.clone())
            .list(&ListParams::default())
            .await
            .map_err(ClientError::from_kube)?;
        Ok(list.items)
    }

    async fn list_peer_authentications(&self) -> Result<Vec<PeerAuthentication>, ClientError> {
        let list = Api::<PeerAuthentication>::all(self.client.clone())
            .list(&ListParams::default())
            .await
            .map_err(ClientError::from_kube)?;
        Ok(list.items)
    }

    async fn list_pods(
        &self,
        namespace: &str,
        label_selector: Option<&str>,
    ) -> Result<Vec<Pod>, ClientError> {
        let mut params = ListParams::default();
        if let Some(selector) = label_selector {
            params = params.labels(selector);
        }
        let list = Api::<Pod>::namespaced(self.client.clone(), namespace)
            .list(&params)
            .await
            .map_err(ClientError::from_kube)?;
        Ok(list.items)
    }

    async fn list_deployments(&self, namespace: &str) -> Result<Vec<Deployment>, ClientError> {
        let list = Api::<Deployment>::namespaced(self.client.clone(), namespace)
            .list(&ListParams::default())
            .await
            .map_err(ClientError::from_kube)?;
        Ok(list.items)
    }

    async fn list_services(&self, namespace: &str) -> Result<Vec<Service>, ClientError> {
        let list = Api::<Service>::namespaced(self.client.clone(), namespace)
            .list(&ListParams::default())
            .await
            .map_err(ClientError::from_kube)?;
        Ok(list.items)
    }

    async fn create_token_review(&self, review: TokenReview) -> Result<TokenReview, ClientError> {
        Api::<TokenReview>::all(self.client.clone())
            .create(&PostParams::default(), &review)
            .await
            .map_err(ClientError::from_kube)
    }

    async fn pod_proxy_get(
        &self,
        namespace: &str,
        pod: &str,
        port: u16,
        path: &str,
    ) -> Result<String, ClientError> {
        let uri = Self::pod_proxy_uri(namespace, pod, port, path);
        let req = http::Request::get(uri)
            .body(Vec::new())
            .map_err(|err| ClientError::Request(err.to_string()))?;
        self.client
            .request_text(req)
            .await
            .map_err(ClientError::from_kube)
    }

    async fn pod_proxy_post(
        &self,
        namespace: &str,
        pod: &str,
        port: u16,
        path: &str,
    ) -> Result<String, ClientError> {
        let uri = Self::pod_proxy_uri(namespace, pod, port, path);
        let req = http::Request::post(uri)
            .body(Vec::new())
            .map_err(|err| ClientError::Request(err.to_string()))?;
        self.client
            .request_text(req)
            .await
            .map_err(ClientError::from_kube)
    }
}
