/// Deployment-level settings, fixed for the process lifetime.
#[derive(Clone, Debug)]
pub struct Config {
    /// Name of the cluster the console itself runs in.
    pub cluster_name: String,
    /// Namespace the mesh control plane is deployed to.
    pub istio_namespace: String,
    /// Namespace whose security policies apply mesh-wide.
    pub root_namespace: String,
    /// Name of the control plane's mesh ConfigMap.
    pub mesh_config_map: String,
    pub cache_enabled: bool,
    pub accessible_namespaces: AccessibleNamespaces,
    /// Workload names hidden from workload listings.
    pub excluded_workloads: Vec<String>,
    /// External authorization endpoint surfaced to clients, when present.
    pub auth_endpoint: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AccessibleNamespaces {
    All,
    List(Vec<String>),
}

impl Config {
    pub fn all_namespaces_accessible(&self) -> bool {
        self.accessible_namespaces == AccessibleNamespaces::All
    }

    pub fn is_root_namespace(&self, namespace: &str) -> bool {
        self.root_namespace == namespace
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cluster_name: "Kubernetes".to_string(),
            istio_namespace: "istio-system".to_string(),
            root_namespace: "istio-system".to_string(),
            mesh_config_map: "istio".to_string(),
            cache_enabled: true,
            accessible_namespaces: AccessibleNamespaces::All,
            excluded_workloads: Vec::new(),
            auth_endpoint: None,
        }
    }
}
