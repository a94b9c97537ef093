//! Sidecar presence and readiness.

use kube::ResourceExt;
use meshview_k8s_api::{ClientError, ControlPlane, Pod};
use serde::Serialize;
use std::sync::Arc;

const SIDECAR_STATUS_ANNOTATION: &str = "sidecar.istio.io/status";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProxyStatus {
    pub pod: String,
    pub synced: bool,
}

pub struct ProxyStatusService {
    k8s: Arc<dyn ControlPlane>,
}

// === impl ProxyStatusService ===

impl ProxyStatusService {
    pub(crate) fn new(k8s: Arc<dyn ControlPlane>) -> Self {
        Self { k8s }
    }

    /// Sidecar state for each of a workload's pods.
    pub async fn workload_proxy_status(
        &self,
        namespace: &str,
        workload: &str,
    ) -> Result<Vec<ProxyStatus>, ClientError> {
        let selector = format!("app={workload}");
        let pods = self.k8s.list_pods(namespace, Some(&selector)).await?;
        Ok(pods.iter().map(Self::pod_status).collect())
    }

    pub async fn pod_proxy_status(
        &self,
        namespace: &str,
        pod: &str,
    ) -> Result<Option<ProxyStatus>, ClientError> {
        let pods = self.k8s.list_pods(namespace, None).await?;
        Ok(pods
            .iter()
            .find(|p| p.name_any() == pod)
            .map(Self::pod_status))
    }

    fn pod_status(pod: &Pod) -> ProxyStatus {
        let has_sidecar = pod
            .metadata
            .annotations
            .as_ref()
            .map_or(false, |annotations| {
                annotations.contains_key(SIDECAR_STATUS_ANNOTATION)
            });
        let ready = pod
            .status
            .as_ref()
            .and_then(|status| status.conditions.as_ref())
            .map_or(false, |conditions| {
                conditions
                    .iter()
                    .any(|c| c.type_ == "Ready" && c.status == "True")
            });
        ProxyStatus {
            pod: pod.name_any(),
            synced: has_sidecar && ready,
        }
    }
}
