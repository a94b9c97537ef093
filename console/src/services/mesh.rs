//! Mesh-level metadata.

use crate::config::Config;
use meshview_k8s_api::mesh::MeshConfig;
use meshview_k8s_api::ControlPlane;
use serde::Serialize;
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MeshInfo {
    pub control_plane_namespace: String,
    pub root_namespace: String,
    pub trust_domain: Option<String>,
    pub auto_mtls: bool,
}

pub struct MeshService {
    k8s: Arc<dyn ControlPlane>,
    config: Config,
}

// === impl MeshService ===

impl MeshService {
    pub(crate) fn new(k8s: Arc<dyn ControlPlane>, config: Config) -> Self {
        Self { k8s, config }
    }

    pub async fn mesh_info(&self) -> anyhow::Result<MeshInfo> {
        let cm = self
            .k8s
            .get_config_map(&self.config.istio_namespace, &self.config.mesh_config_map)
            .await?;
        let mesh = MeshConfig::from_config_map(&cm)?;
        Ok(MeshInfo {
            control_plane_namespace: self.config.istio_namespace.clone(),
            root_namespace: mesh
                .root_namespace
                .unwrap_or_else(|| self.config.root_namespace.clone()),
            trust_domain: mesh.trust_domain,
            auto_mtls: mesh.enable_auto_mtls.unwrap_or(true),
        })
    }
}
