use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Client-side traffic policy applied to connections toward a set of hosts.
#[derive(Clone, Debug, Default, CustomResource, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "networking.istio.io",
    version = "v1alpha3",
    kind = "DestinationRule",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct DestinationRuleSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traffic_policy: Option<TrafficPolicy>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrafficPolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<ClientTls>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClientTls {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<TlsMode>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TlsMode {
    Disable,
    Simple,
    Mutual,
    IstioMutual,
}

/// Host pattern that makes a rule apply to every service in the mesh.
pub const MESH_WIDE_HOST: &str = "*.local";

impl DestinationRule {
    pub fn tls_mode(&self) -> Option<TlsMode> {
        self.spec
            .traffic_policy
            .as_ref()
            .and_then(|tp| tp.tls.as_ref())
            .and_then(|tls| tls.mode)
    }

    pub fn is_mesh_wide(&self) -> bool {
        self.spec.host.as_deref() == Some(MESH_WIDE_HOST)
    }

    /// True when the rule's host pattern covers every service in `namespace`.
    pub fn covers_namespace(&self, namespace: &str) -> bool {
        match self.spec.host.as_deref() {
            Some(MESH_WIDE_HOST) => true,
            Some(host) => host == format!("*.{namespace}.svc.cluster.local"),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn istio_mutual_round_trips_through_screaming_case() {
        let spec: DestinationRuleSpec = serde_json::from_value(serde_json::json!({
            "host": "*.local",
            "trafficPolicy": { "tls": { "mode": "ISTIO_MUTUAL" } }
        }))
        .expect("must parse");
        let dr = DestinationRule::new("enable-mtls", spec);
        assert!(dr.is_mesh_wide());
        assert_eq!(dr.tls_mode(), Some(TlsMode::IstioMutual));
    }

    #[test]
    fn namespace_scoped_host_covers_only_its_namespace() {
        let dr = DestinationRule::new(
            "local",
            serde_json::from_value(serde_json::json!({
                "host": "*.bookinfo.svc.cluster.local"
            }))
            .expect("must parse"),
        );
        assert!(dr.covers_namespace("bookinfo"));
        assert!(!dr.covers_namespace("default"));
        assert!(!dr.is_mesh_wide());
    }
}
