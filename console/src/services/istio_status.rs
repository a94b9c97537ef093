//! Control plane component readiness.

use crate::config::Config;
use kube::ResourceExt;
use meshview_k8s_api::{ClientError, ControlPlane};
use serde::Serialize;
use std::sync::Arc;

const CONTROL_PLANE_DEPLOYMENT: &str = "istiod";

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum ComponentHealth {
    Healthy,
    Unhealthy,
    NotFound,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ComponentStatus {
    pub name: String,
    pub status: ComponentHealth,
}

pub struct IstioStatusService {
    k8s: Arc<dyn ControlPlane>,
    config: Config,
}

// === impl IstioStatusService ===

impl IstioStatusService {
    pub(crate) fn new(k8s: Arc<dyn ControlPlane>, config: Config) -> Self {
        Self { k8s, config }
    }

    pub async fn control_plane_status(&self) -> Result<Vec<ComponentStatus>, ClientError> {
        let deployments = self
            .k8s
            .list_deployments(&self.config.istio_namespace)
            .await?;
        let mut statuses: Vec<ComponentStatus> = deployments
            .iter()
            .map(|d| {
                let ready = d
                    .status
                    .as_ref()
                    .and_then(|status| status.ready_replicas)
                    .unwrap_or(0);
                ComponentStatus {
                    name: d.name_any(),
                    status: if ready > 0 {
                        ComponentHealth::Healthy
                    } else {
                        ComponentHealth::Unhealthy
                    },
                }
            })
            .collect();
        if !statuses
            .iter()
            .any(|s| s.name == CONTROL_PLANE_DEPLOYMENT)
        {
            statuses.push(ComponentStatus {
                name: CONTROL_PLANE_DEPLOYMENT.to_string(),
                status: ComponentHealth::NotFound,
            });
        }
        Ok(statuses)
    }
}
