//! Caller token validation against the control plane.

use meshview_core::CallerIdentity;
use meshview_k8s_api::{ClientError, ControlPlane, TokenReview, TokenReviewSpec};
use serde::Serialize;
use std::sync::Arc;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TokenIdentity {
    pub authenticated: bool,
    pub username: Option<String>,
}

pub struct TokenReviewService {
    k8s: Arc<dyn ControlPlane>,
}

// === impl TokenReviewService ===

impl TokenReviewService {
    pub(crate) fn new(k8s: Arc<dyn ControlPlane>) -> Self {
        Self { k8s }
    }

    /// Asks the control plane whether the token is valid and who holds it.
    pub async fn review(&self, identity: &CallerIdentity) -> Result<TokenIdentity, ClientError> {
        let review = TokenReview {
            spec: TokenReviewSpec {
                token: Some(identity.token().to_string()),
                ..TokenReviewSpec::default()
            },
            ..TokenReview::default()
        };
        let reviewed = self.k8s.create_token_review(review).await?;
        let status = reviewed.status.unwrap_or_default();
        Ok(TokenIdentity {
            authenticated: status.authenticated.unwrap_or(false),
            username: status.user.and_then(|user| user.username),
        })
    }
}
