//! External authorization endpoint metadata.

use crate::config::Config;
use serde::Serialize;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct OAuthMetadata {
    pub authorization_endpoint: Option<String>,
}

pub struct OAuthService {
    config: Config,
}

// === impl OAuthService ===

impl OAuthService {
    pub(crate) fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn metadata(&self) -> OAuthMetadata {
        OAuthMetadata {
            authorization_endpoint: self.config.auth_endpoint.clone(),
        }
    }
}
