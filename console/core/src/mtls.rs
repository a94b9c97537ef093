//! Mutual-TLS posture of the mesh or a single namespace.
//!
//! The posture is a pure function of the security policies visible at one
//! instant plus the control plane's auto-mTLS flag. Gathering those inputs
//! is the service layer's job; turning them into a label is the
//! [`MtlsEvaluator`]'s.

use meshview_k8s_api::networking::{DestinationRule, TlsMode};
use meshview_k8s_api::security::{MtlsMode, PeerAuthentication};
use serde::Serialize;
use std::fmt;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum MtlsLabel {
    #[serde(rename = "MTLS_ENABLED")]
    Enabled,
    #[serde(rename = "MTLS_PARTIALLY_ENABLED")]
    PartiallyEnabled,
    #[serde(rename = "MTLS_NOT_ENABLED")]
    NotEnabled,
    #[serde(rename = "MTLS_DISABLED")]
    Disabled,
}

impl fmt::Display for MtlsLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Enabled => "MTLS_ENABLED",
            Self::PartiallyEnabled => "MTLS_PARTIALLY_ENABLED",
            Self::NotEnabled => "MTLS_NOT_ENABLED",
            Self::Disabled => "MTLS_DISABLED",
        };
        f.write_str(label)
    }
}

/// Computed mTLS posture, optionally tagged with the namespace it covers.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MtlsStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub status: Option<MtlsLabel>,
}

impl MtlsStatus {
    pub fn mesh_wide(label: MtlsLabel) -> Self {
        Self {
            namespace: None,
            status: Some(label),
        }
    }

    pub fn namespaced(namespace: impl Into<String>, label: MtlsLabel) -> Self {
        Self {
            namespace: Some(namespace.into()),
            status: Some(label),
        }
    }

    /// The posture could not be computed because its inputs were not
    /// gatherable; callers render this as unknown rather than as an error.
    pub fn undetermined() -> Self {
        Self::default()
    }
}

/// Security policies visible across a set of namespaces at one instant.
#[derive(Clone, Debug, Default)]
pub struct SecurityPolicySet {
    pub peer_authentications: Vec<PeerAuthentication>,
    pub destination_rules: Vec<DestinationRule>,
}

/// One posture computation's inputs.
#[derive(Clone, Debug)]
pub struct MtlsQuery<'a> {
    /// `None` for the mesh-wide posture.
    pub namespace: Option<&'a str>,
    pub policies: &'a SecurityPolicySet,
    pub auto_mtls: bool,
    pub allow_permissive: bool,
}

/// Scores a set of security policies into a posture label.
pub trait MtlsEvaluator: Send + Sync {
    fn evaluate(&self, query: &MtlsQuery<'_>) -> MtlsLabel;
}

/// What one side (peer authentication or destination rule) contributes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Posture {
    Enabled,
    Disabled,
    Partial,
    Unset,
}

/// Default scoring heuristic.
///
/// Peer authentications decide whether workloads accept only mutual TLS;
/// destination rules decide whether clients send it. Both sides must agree
/// for the posture to be `Enabled` or `Disabled`; auto-mTLS lets a missing
/// side follow the configured one.
#[derive(Clone, Debug, Default)]
pub struct StandardEvaluator(());

impl StandardEvaluator {
    fn peer_posture(pas: &[PeerAuthentication], allow_permissive: bool) -> Posture {
        let mut posture = Posture::Unset;
        for pa in pas {
            if !pa.is_namespace_wide() {
                continue;
            }
            posture = match pa.effective_mode() {
                MtlsMode::Strict => Posture::Enabled,
                MtlsMode::Permissive if allow_permissive => Posture::Enabled,
                MtlsMode::Permissive => Posture::Partial,
                MtlsMode::Disable => Posture::Disabled,
                MtlsMode::Unset => posture,
            };
        }
        posture
    }

    fn rule_posture(namespace: Option<&str>, drs: &[DestinationRule]) -> Posture {
        let mut posture = Posture::Unset;
        for dr in drs {
            let in_scope = match namespace {
                None => dr.is_mesh_wide(),
                Some(ns) => dr.covers_namespace(ns),
            };
            if !in_scope {
                continue;
            }
            posture = match dr.tls_mode() {
                Some(TlsMode::IstioMutual) => Posture::Enabled,
                Some(TlsMode::Disable) | Some(TlsMode::Simple) => Posture::Disabled,
                Some(TlsMode::Mutual) | None => posture,
            };
        }
        posture
    }
}

impl MtlsEvaluator for StandardEvaluator {
    fn evaluate(&self, query: &MtlsQuery<'_>) -> MtlsLabel {
        let peers = Self::peer_posture(&query.policies.peer_authentications, query.allow_permissive);
        let rules = Self::rule_posture(query.namespace, &query.policies.destination_rules);
        match (peers, rules) {
            (Posture::Enabled, Posture::Enabled) => MtlsLabel::Enabled,
            (Posture::Enabled, Posture::Unset) if query.auto_mtls => MtlsLabel::Enabled,
            (Posture::Unset, Posture::Enabled) if query.auto_mtls => MtlsLabel::Enabled,
            (Posture::Disabled, Posture::Disabled) => MtlsLabel::Disabled,
            (Posture::Disabled, Posture::Unset) if query.auto_mtls => MtlsLabel::Disabled,
            (Posture::Unset, Posture::Unset) => MtlsLabel::NotEnabled,
            _ => MtlsLabel::PartiallyEnabled,
        }
    }
}
