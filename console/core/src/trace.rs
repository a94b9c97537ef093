//! Read access to the distributed-tracing backend.

use crate::{BackendError, CallerIdentity};
use serde::Serialize;
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TraceSummary {
    pub trace_id: String,
    pub span_count: usize,
    pub duration_micros: u64,
}

#[async_trait::async_trait]
pub trait TracingClient: Send + Sync {
    async fn service_traces(
        &self,
        namespace: &str,
        service: &str,
        limit: usize,
    ) -> Result<Vec<TraceSummary>, BackendError>;
}

/// Builds a tracing client authorized as `identity`.
#[async_trait::async_trait]
pub trait TracingFactory: Send + Sync {
    async fn connect(
        &self,
        identity: &CallerIdentity,
    ) -> Result<Arc<dyn TracingClient>, BackendError>;
}
