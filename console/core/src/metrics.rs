//! Read access to the mesh's metrics backend.

use crate::BackendError;
use std::sync::Arc;

#[async_trait::async_trait]
pub trait MetricsClient: Send + Sync {
    /// Inbound request volume for a namespace, in requests per second.
    async fn namespace_request_rate(&self, namespace: &str) -> Result<f64, BackendError>;

    /// Share of requests to a workload that ended in an error class.
    async fn workload_error_ratio(
        &self,
        namespace: &str,
        workload: &str,
    ) -> Result<f64, BackendError>;
}

/// Builds the process-wide metrics client. Construction failure is surfaced
/// to the requesting caller and retried on a later request.
#[async_trait::async_trait]
pub trait MetricsFactory: Send + Sync {
    async fn connect(&self) -> Result<Arc<dyn MetricsClient>, BackendError>;
}
