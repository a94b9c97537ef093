//! Sidecar log-level control.

use crate::services::proxy_status::{ProxyStatus, ProxyStatusService};
use meshview_k8s_api::ControlPlane;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

const PROXY_ADMIN_PORT: u16 = 15000;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ProxyLogLevel {
    Off,
    Error,
    Warning,
    Info,
    Debug,
    Trace,
}

impl ProxyLogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

impl fmt::Display for ProxyLogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProxyLogLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "off" => Ok(Self::Off),
            "error" => Ok(Self::Error),
            "warning" => Ok(Self::Warning),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            other => anyhow::bail!("unknown proxy log level: {other}"),
        }
    }
}

/// Changes a sidecar's log level through its admin endpoint. The write runs
/// under the caller's identity and is refused when the pod runs no sidecar.
pub struct ProxyLoggingService {
    k8s: Arc<dyn ControlPlane>,
    proxy_status: Arc<ProxyStatusService>,
}

// === impl ProxyLoggingService ===

impl ProxyLoggingService {
    pub(crate) fn new(k8s: Arc<dyn ControlPlane>, proxy_status: Arc<ProxyStatusService>) -> Self {
        Self { k8s, proxy_status }
    }

    pub async fn set_log_level(
        &self,
        namespace: &str,
        pod: &str,
        level: ProxyLogLevel,
    ) -> anyhow::Result<()> {
        match self.proxy_status.pod_proxy_status(namespace, pod).await? {
            Some(ProxyStatus { synced: true, .. }) => {}
            _ => anyhow::bail!("pod {namespace}/{pod} does not run a mesh sidecar"),
        }
        let path = format!("/logging?level={}", level.as_str());
        self.k8s
            .pod_proxy_post(namespace, pod, PROXY_ADMIN_PORT, &path)
            .await?;
        Ok(())
    }
}
