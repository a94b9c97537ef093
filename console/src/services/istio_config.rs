//! Mesh configuration listing under the caller's identity.

use kube::ResourceExt;
use meshview_k8s_api::networking::DestinationRule;
use meshview_k8s_api::security::PeerAuthentication;
use meshview_k8s_api::{ClientError, ControlPlane};
use std::sync::Arc;

/// What one listing call should gather.
#[derive(Clone, Debug, Default)]
pub struct IstioConfigCriteria {
    pub all_namespaces: bool,
    pub namespace: Option<String>,
    pub include_destination_rules: bool,
    pub include_peer_authentications: bool,
}

impl IstioConfigCriteria {
    pub fn all_namespaces() -> Self {
        Self {
            all_namespaces: true,
            ..Self::default()
        }
    }

    pub fn namespace(namespace: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            ..Self::default()
        }
    }

    pub fn with_destination_rules(mut self) -> Self {
        self.include_destination_rules = true;
        self
    }

    pub fn with_peer_authentications(mut self) -> Self {
        self.include_peer_authentications = true;
        self
    }

    fn in_scope<T: ResourceExt>(&self, item: &T) -> bool {
        if self.all_namespaces {
            return true;
        }
        match &self.namespace {
            Some(ns) => item.namespace().as_deref() == Some(ns),
            None => true,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct IstioConfigList {
    pub destination_rules: Vec<DestinationRule>,
    pub peer_authentications: Vec<PeerAuthentication>,
}

pub struct IstioConfigService {
    k8s: Arc<dyn ControlPlane>,
}

// === impl IstioConfigService ===

impl IstioConfigService {
    pub fn new(k8s: Arc<dyn ControlPlane>) -> Self {
        Self { k8s }
    }

    pub async fn config_list(
        &self,
        criteria: &IstioConfigCriteria,
    ) -> Result<IstioConfigList, ClientError> {
        let mut list = IstioConfigList::default();
        if criteria.include_destination_rules {
            list.destination_rules = self
                .k8s
                .list_destination_rules()
                .await?
                .into_iter()
                .filter(|dr| criteria.in_scope(dr))
                .collect();
        }
        if criteria.include_peer_authentications {
            list.peer_authentications = self
                .k8s
                .list_peer_authentications()
                .await?
                .into_iter()
                .filter(|pa| criteria.in_scope(pa))
                .collect();
        }
        Ok(list)
    }
}
