//! Namespace request-health from the metrics backend.

use meshview_core::metrics::MetricsClient;
use meshview_core::BackendError;
use serde::Serialize;
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NamespaceHealth {
    pub namespace: String,
    pub request_rate: f64,
}

pub struct HealthService {
    metrics: Arc<dyn MetricsClient>,
}

// === impl HealthService ===

impl HealthService {
    pub(crate) fn new(metrics: Arc<dyn MetricsClient>) -> Self {
        Self { metrics }
    }

    pub async fn namespace_health(&self, namespace: &str) -> Result<NamespaceHealth, BackendError> {
        let request_rate = self.metrics.namespace_request_rate(namespace).await?;
        Ok(NamespaceHealth {
            namespace: namespace.to_string(),
            request_rate,
        })
    }
}
