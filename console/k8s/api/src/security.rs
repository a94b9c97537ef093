use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Mutual-TLS requirements for workloads in a namespace, or for the subset
/// of workloads matched by the selector.
#[derive(Clone, Debug, Default, CustomResource, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "security.istio.io",
    version = "v1beta1",
    kind = "PeerAuthentication",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct PeerAuthenticationSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<WorkloadSelector>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mtls: Option<PeerAuthenticationMtls>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadSelector {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub match_labels: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct PeerAuthenticationMtls {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<MtlsMode>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MtlsMode {
    Unset,
    Disable,
    Permissive,
    Strict,
}

impl PeerAuthentication {
    /// True when the policy applies to the whole namespace rather than a
    /// selected set of workloads.
    pub fn is_namespace_wide(&self) -> bool {
        self.spec
            .selector
            .as_ref()
            .map_or(true, |s| s.match_labels.is_empty())
    }

    pub fn effective_mode(&self) -> MtlsMode {
        self.spec
            .mtls
            .as_ref()
            .and_then(|m| m.mode)
            .unwrap_or(MtlsMode::Unset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_strict_policy() {
        let pa: PeerAuthenticationSpec = serde_json::from_value(serde_json::json!({
            "mtls": { "mode": "STRICT" }
        }))
        .expect("must parse");
        assert_eq!(
            pa.mtls.and_then(|m| m.mode),
            Some(MtlsMode::Strict),
        );
        assert!(pa.selector.is_none());
    }

    #[test]
    fn selector_scoped_policy_is_not_namespace_wide() {
        let pa = PeerAuthentication::new(
            "workload-only",
            serde_json::from_value(serde_json::json!({
                "selector": { "matchLabels": { "app": "ratings" } },
                "mtls": { "mode": "DISABLE" }
            }))
            .expect("must parse"),
        );
        assert!(!pa.is_namespace_wide());
        assert_eq!(pa.effective_mode(), MtlsMode::Disable);
    }
}
