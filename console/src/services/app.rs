//! Workloads grouped into applications.

use ahash::AHashMap as HashMap;
use kube::ResourceExt;
use meshview_core::metrics::MetricsClient;
use meshview_core::BackendError;
use meshview_k8s_api::{ClientError, ControlPlane};
use serde::Serialize;
use std::sync::Arc;

const APP_LABEL: &str = "app";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct App {
    pub name: String,
    pub workload_count: usize,
}

pub struct AppService {
    k8s: Arc<dyn ControlPlane>,
    metrics: Arc<dyn MetricsClient>,
}

// === impl AppService ===

impl AppService {
    pub(crate) fn new(k8s: Arc<dyn ControlPlane>, metrics: Arc<dyn MetricsClient>) -> Self {
        Self { k8s, metrics }
    }

    /// Deployments grouped by their `app` label; unlabeled workloads are
    /// grouped under their own name.
    pub async fn list_apps(&self, namespace: &str) -> Result<Vec<App>, ClientError> {
        let deployments = self.k8s.list_deployments(namespace).await?;
        let mut grouped: HashMap<String, usize> = HashMap::default();
        for deployment in &deployments {
            let app = deployment
                .metadata
                .labels
                .as_ref()
                .and_then(|labels| labels.get(APP_LABEL).cloned())
                .unwrap_or_else(|| deployment.name_any());
            *grouped.entry(app).or_default() += 1;
        }
        let mut apps: Vec<App> = grouped
            .into_iter()
            .map(|(name, workload_count)| App {
                name,
                workload_count,
            })
            .collect();
        apps.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(apps)
    }

    pub async fn app_error_ratio(&self, namespace: &str, app: &str) -> Result<f64, BackendError> {
        self.metrics.workload_error_ratio(namespace, app).await
    }
}
