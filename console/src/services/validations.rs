//! Cross-resource configuration checks.

use crate::services::namespace::NamespaceService;
use crate::services::tls::TlsService;
use ahash::AHashMap as HashMap;
use kube::ResourceExt;
use serde::Serialize;
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Validation {
    pub kind: &'static str,
    pub namespace: String,
    pub object: String,
    pub message: String,
}

pub struct ValidationsService {
    tls: Arc<TlsService>,
    namespace: Arc<NamespaceService>,
}

// === impl ValidationsService ===

impl ValidationsService {
    pub(crate) fn new(tls: Arc<TlsService>, namespace: Arc<NamespaceService>) -> Self {
        Self { tls, namespace }
    }

    /// Flags destination rules that target the same host more than once
    /// across the reachable namespaces.
    pub async fn duplicate_destination_rules(&self) -> anyhow::Result<Vec<Validation>> {
        let namespaces = self.namespace.names().await?;
        let rules = self.tls.all_destination_rules(&namespaces).await?;

        let mut by_host: HashMap<&str, usize> = HashMap::default();
        for rule in &rules {
            if let Some(host) = rule.spec.host.as_deref() {
                *by_host.entry(host).or_default() += 1;
            }
        }

        Ok(rules
            .iter()
            .filter(|rule| {
                rule.spec
                    .host
                    .as_deref()
                    .map_or(false, |host| by_host[host] > 1)
            })
            .map(|rule| Validation {
                kind: "DestinationRule",
                namespace: rule.namespace().unwrap_or_default(),
                object: rule.name_any(),
                message: format!(
                    "more than one destination rule targets host {}",
                    rule.spec.host.as_deref().unwrap_or_default()
                ),
            })
            .collect())
    }
}
