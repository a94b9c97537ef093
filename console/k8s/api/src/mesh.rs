//! Mesh-wide configuration shipped in the control plane's ConfigMap.

use k8s_openapi::api::core::v1::ConfigMap;
use serde::Deserialize;

/// Key under which the control plane stores its mesh configuration document.
pub const MESH_CONFIG_KEY: &str = "mesh";

/// The subset of the mesh configuration the console reads.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeshConfig {
    #[serde(default)]
    pub enable_auto_mtls: Option<bool>,
    #[serde(default)]
    pub root_namespace: Option<String>,
    #[serde(default)]
    pub trust_domain: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum MeshConfigError {
    #[error("config map has no mesh entry")]
    MissingEntry,
    #[error("malformed mesh configuration: {0}")]
    Malformed(#[from] serde_yaml::Error),
}

impl MeshConfig {
    pub fn from_config_map(cm: &ConfigMap) -> Result<Self, MeshConfigError> {
        let raw = cm
            .data
            .as_ref()
            .and_then(|data| data.get(MESH_CONFIG_KEY))
            .ok_or(MeshConfigError::MissingEntry)?;
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Auto-mTLS defaults to enabled when the field is absent.
    pub fn auto_mtls_enabled(&self) -> bool {
        self.enable_auto_mtls.unwrap_or(true)
    }
}
