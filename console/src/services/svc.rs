//! Service listing.

use kube::ResourceExt;
use meshview_k8s_api::{ClientError, ControlPlane};
use serde::Serialize;
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ServiceOverview {
    pub name: String,
    pub cluster_ip: Option<String>,
}

pub struct SvcService {
    k8s: Arc<dyn ControlPlane>,
}

// === impl SvcService ===

impl SvcService {
    pub(crate) fn new(k8s: Arc<dyn ControlPlane>) -> Self {
        Self { k8s }
    }

    pub async fn list_services(
        &self,
        namespace: &str,
    ) -> Result<Vec<ServiceOverview>, ClientError> {
        let services = self.k8s.list_services(namespace).await?;
        Ok(services
            .into_iter()
            .map(|svc| ServiceOverview {
                name: svc.name_any(),
                cluster_ip: svc.spec.and_then(|spec| spec.cluster_ip),
            })
            .collect())
    }
}
