//! Namespace listing and access checks.

use crate::clients::ClusterClients;
use crate::config::{AccessibleNamespaces, Config};
use kube::ResourceExt;
use meshview_k8s_api::{ClientError, Namespace};

/// Lists the namespaces a caller may see. Listing runs under the caller's
/// own identity so control plane authorization stays authoritative; the
/// fixed accessible-namespace list is resolved under the service identity.
pub struct NamespaceService {
    user: ClusterClients,
    privileged: ClusterClients,
    config: Config,
}

// === impl NamespaceService ===

impl NamespaceService {
    pub fn new(user: ClusterClients, privileged: ClusterClients, config: Config) -> Self {
        Self {
            user,
            privileged,
            config,
        }
    }

    pub async fn get_namespaces(&self) -> Result<Vec<Namespace>, ClientError> {
        match &self.config.accessible_namespaces {
            AccessibleNamespaces::All => self.user.home().list_namespaces().await,
            AccessibleNamespaces::List(names) => {
                let all = self.privileged.home().list_namespaces().await?;
                Ok(all
                    .into_iter()
                    .filter(|ns| names.iter().any(|n| *n == ns.name_any()))
                    .collect())
            }
        }
    }

    pub async fn get_namespace(&self, name: &str) -> Result<Namespace, ClientError> {
        if !self.is_accessible(name) {
            return Err(ClientError::Forbidden(format!(
                "namespace {name} is not accessible"
            )));
        }
        self.user.home().get_namespace(name).await
    }

    /// Accessible namespace names, in listing order.
    pub async fn names(&self) -> Result<Vec<String>, ClientError> {
        let namespaces = self.get_namespaces().await?;
        Ok(namespaces.iter().map(|ns| ns.name_any()).collect())
    }

    fn is_accessible(&self, name: &str) -> bool {
        match &self.config.accessible_namespaces {
            AccessibleNamespaces::All => true,
            AccessibleNamespaces::List(names) => names.iter().any(|n| n == name),
        }
    }
}
