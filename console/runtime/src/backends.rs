//! HTTP clients for the metrics and tracing backends.

use meshview_core::metrics::{MetricsClient, MetricsFactory};
use meshview_core::trace::{TraceSummary, TracingClient, TracingFactory};
use meshview_core::{BackendError, CallerIdentity};
use serde::Deserialize;
use std::sync::Arc;

/// Builds clients for the Prometheus query API.
pub struct PrometheusFactory {
    base_url: String,
}

// === impl PrometheusFactory ===

impl PrometheusFactory {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

#[async_trait::async_trait]
impl MetricsFactory for PrometheusFactory {
    async fn connect(&self) -> Result<Arc<dyn MetricsClient>, BackendError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(metrics_err)?;
        let prom = PrometheusClient {
            base: self.base_url.trim_end_matches('/').to_string(),
            client,
        };
        // A dead endpoint fails construction here rather than on the first
        // caller's query.
        prom.query("vector(1)").await?;
        Ok(Arc::new(prom))
    }
}

struct PrometheusClient {
    base: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct PromResponse {
    data: PromData,
}

#[derive(Deserialize)]
struct PromData {
    result: Vec<PromSample>,
}

#[derive(Deserialize)]
struct PromSample {
    value: (f64, String),
}

// === impl PrometheusClient ===

impl PrometheusClient {
    /// Runs an instant query and returns the first sample, `0` when the
    /// result set is empty.
    async fn query(&self, promql: &str) -> Result<f64, BackendError> {
        let response = self
            .client
            .get(format!("{}/api/v1/query", self.base))
            .query(&[("query", promql)])
            .send()
            .await
            .map_err(metrics_err)?
            .error_for_status()
            .map_err(metrics_err)?;
        let body: PromResponse = response.json().await.map_err(metrics_err)?;
        Ok(body
            .data
            .result
            .first()
            .and_then(|sample| sample.value.1.parse().ok())
            .unwrap_or_default())
    }
}

#[async_trait::async_trait]
impl MetricsClient for PrometheusClient {
    async fn namespace_request_rate(&self, namespace: &str) -> Result<f64, BackendError> {
        self.query(&format!(
            "sum(rate(istio_requests_total{{destination_workload_namespace=\"{namespace}\"}}[5m]))"
        ))
        .await
    }

    async fn workload_error_ratio(
        &self,
        namespace: &str,
        workload: &str,
    ) -> Result<f64, BackendError> {
        let errors = self
            .query(&format!(
                "sum(rate(istio_requests_total{{destination_workload_namespace=\"{namespace}\",destination_workload=\"{workload}\",response_code=~\"[45].*\"}}[5m]))"
            ))
            .await?;
        let total = self
            .query(&format!(
                "sum(rate(istio_requests_total{{destination_workload_namespace=\"{namespace}\",destination_workload=\"{workload}\"}}[5m]))"
            ))
            .await?;
        if total == 0.0 {
            return Ok(0.0);
        }
        Ok(errors / total)
    }
}

fn metrics_err(err: impl ToString) -> BackendError {
    BackendError::Metrics(err.to_string())
}

/// Builds clients for the Jaeger query API, authorized as the caller.
pub struct JaegerFactory {
    base_url: String,
}

// === impl JaegerFactory ===

impl JaegerFactory {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

#[async_trait::async_trait]
impl TracingFactory for JaegerFactory {
    async fn connect(
        &self,
        identity: &CallerIdentity,
    ) -> Result<Arc<dyn TracingClient>, BackendError> {
        let mut headers = reqwest::header::HeaderMap::new();
        let bearer = format!("Bearer {}", identity.token());
        let mut value =
            reqwest::header::HeaderValue::from_str(&bearer).map_err(tracing_err)?;
        value.set_sensitive(true);
        headers.insert(reqwest::header::AUTHORIZATION, value);
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(tracing_err)?;
        Ok(Arc::new(JaegerClient {
            base: self.base_url.trim_end_matches('/').to_string(),
            client,
        }))
    }
}

struct JaegerClient {
    base: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct JaegerResponse {
    data: Vec<JaegerTrace>,
}

#[derive(Deserialize)]
struct JaegerTrace {
    #[serde(rename = "traceID")]
    trace_id: String,
    spans: Vec<JaegerSpan>,
}

#[derive(Deserialize)]
struct JaegerSpan {
    duration: u64,
}

#[async_trait::async_trait]
impl TracingClient for JaegerClient {
    async fn service_traces(
        &self,
        namespace: &str,
        service: &str,
        limit: usize,
    ) -> Result<Vec<TraceSummary>, BackendError> {
        let service = format!("{service}.{namespace}");
        let limit = limit.to_string();
        let response = self
            .client
            .get(format!("{}/api/traces", self.base))
            .query(&[("service", service.as_str()), ("limit", limit.as_str())])
            .send()
            .await
            .map_err(tracing_err)?
            .error_for_status()
            .map_err(tracing_err)?;
        let body: JaegerResponse = response.json().await.map_err(tracing_err)?;
        Ok(body
            .data
            .into_iter()
            .map(|trace| TraceSummary {
                span_count: trace.spans.len(),
                duration_micros: trace.spans.iter().map(|span| span.duration).max().unwrap_or(0),
                trace_id: trace.trace_id,
            })
            .collect())
    }
}

fn tracing_err(err: impl ToString) -> BackendError {
    BackendError::Tracing(err.to_string())
}
