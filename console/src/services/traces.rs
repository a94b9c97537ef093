//! Trace lookup through the lazily built tracing backend client.

use futures::future::BoxFuture;
use meshview_core::trace::{TraceSummary, TracingClient};
use meshview_core::BackendError;
use std::sync::Arc;

/// Produces the process-wide tracing client, building it on first use.
pub type TracingLoader =
    Arc<dyn Fn() -> BoxFuture<'static, Result<Arc<dyn TracingClient>, BackendError>> + Send + Sync>;

pub struct TracingService {
    loader: TracingLoader,
}

// === impl TracingService ===

impl TracingService {
    pub(crate) fn new(loader: TracingLoader) -> Self {
        Self { loader }
    }

    pub async fn service_traces(
        &self,
        namespace: &str,
        service: &str,
        limit: usize,
    ) -> Result<Vec<TraceSummary>, BackendError> {
        let client = (self.loader)().await?;
        client.service_traces(namespace, service, limit).await
    }
}
