//! Workload listing.

use ahash::AHashSet as HashSet;
use kube::ResourceExt;
use meshview_core::metrics::MetricsClient;
use meshview_core::BackendError;
use meshview_k8s_api::{ClientError, ControlPlane};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Workload {
    pub name: String,
    pub replicas: i32,
    pub labels: BTreeMap<String, String>,
}

/// Lists workloads per namespace. The client handle is chosen at layer
/// build time: reads go through the process cache under the service
/// identity when caching is on, and through the caller's client otherwise.
pub struct WorkloadService {
    k8s: Arc<dyn ControlPlane>,
    metrics: Arc<dyn MetricsClient>,
    excluded: Arc<HashSet<String>>,
}

// === impl WorkloadService ===

impl WorkloadService {
    pub(crate) fn new(
        k8s: Arc<dyn ControlPlane>,
        metrics: Arc<dyn MetricsClient>,
        excluded: Arc<HashSet<String>>,
    ) -> Self {
        Self {
            k8s,
            metrics,
            excluded,
        }
    }

    pub async fn list_workloads(&self, namespace: &str) -> Result<Vec<Workload>, ClientError> {
        let deployments = self.k8s.list_deployments(namespace).await?;
        Ok(deployments
            .into_iter()
            .filter(|d| !self.excluded.contains(&d.name_any()))
            .map(|d| Workload {
                name: d.name_any(),
                replicas: d
                    .status
                    .as_ref()
                    .and_then(|status| status.replicas)
                    .unwrap_or(0),
                labels: d.metadata.labels.clone().unwrap_or_default(),
            })
            .collect())
    }

    pub async fn workload_error_ratio(
        &self,
        namespace: &str,
        workload: &str,
    ) -> Result<f64, BackendError> {
        self.metrics.workload_error_ratio(namespace, workload).await
    }
}
