//! Control plane service-registry snapshot.

use crate::config::Config;
use kube::ResourceExt;
use meshview_k8s_api::ControlPlane;
use serde::Serialize;
use std::sync::Arc;

const CONTROL_PLANE_SELECTOR: &str = "app=istiod";
const CONTROL_PLANE_MONITOR_PORT: u16 = 15014;
const REGISTRY_DEBUG_PATH: &str = "/debug/registryz";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RegistryService {
    pub hostname: String,
}

pub struct RegistryStatusService {
    k8s: Arc<dyn ControlPlane>,
    config: Config,
}

// === impl RegistryStatusService ===

impl RegistryStatusService {
    pub(crate) fn new(k8s: Arc<dyn ControlPlane>, config: Config) -> Self {
        Self { k8s, config }
    }

    /// Hostnames the control plane currently has in its registry, read from
    /// the first control plane pod's debug interface.
    pub async fn registry_services(&self) -> anyhow::Result<Vec<RegistryService>> {
        let pods = self
            .k8s
            .list_pods(&self.config.istio_namespace, Some(CONTROL_PLANE_SELECTOR))
            .await?;
        let pod = pods
            .first()
            .ok_or_else(|| anyhow::anyhow!("no control plane pod found"))?
            .name_any();
        let body = self
            .k8s
            .pod_proxy_get(
                &self.config.istio_namespace,
                &pod,
                CONTROL_PLANE_MONITOR_PORT,
                REGISTRY_DEBUG_PATH,
            )
            .await?;
        let raw: Vec<serde_json::Value> = serde_json::from_str(&body)?;
        Ok(raw
            .iter()
            .filter_map(|entry| entry.get("hostname").and_then(|h| h.as_str()))
            .map(|hostname| RegistryService {
                hostname: hostname.to_string(),
            })
            .collect())
    }
}
