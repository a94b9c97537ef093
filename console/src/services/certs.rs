//! Control plane CA certificate material.

use crate::config::Config;
use meshview_k8s_api::{ClientError, ControlPlane};
use serde::Serialize;
use std::sync::Arc;

const ROOT_CERT_CONFIG_MAP: &str = "istio-ca-root-cert";
const ROOT_CERT_KEY: &str = "root-cert.pem";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CertInfo {
    pub config_map: String,
    pub pem: Option<String>,
}

pub struct CertsService {
    k8s: Arc<dyn ControlPlane>,
    config: Config,
}

// === impl CertsService ===

impl CertsService {
    pub(crate) fn new(k8s: Arc<dyn ControlPlane>, config: Config) -> Self {
        Self { k8s, config }
    }

    /// The root CA certificate the control plane distributes to workloads.
    pub async fn root_cert_info(&self) -> Result<CertInfo, ClientError> {
        let cm = self
            .k8s
            .get_config_map(&self.config.istio_namespace, ROOT_CERT_CONFIG_MAP)
            .await?;
        Ok(CertInfo {
            config_map: ROOT_CERT_CONFIG_MAP.to_string(),
            pem: cm
                .data
                .as_ref()
                .and_then(|data| data.get(ROOT_CERT_KEY).cloned()),
        })
    }
}
