use thiserror::Error;

/// The caller's identity was rejected by the control plane. Surfaced to the
/// caller; nothing is retried.
#[derive(Clone, Debug, Error)]
#[error("authentication failed: {0}")]
pub struct AuthError(String);

impl AuthError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

/// A process-wide backend could not be reached. Lazy client construction is
/// retried on a later request, not the failing one.
#[derive(Clone, Debug, Error)]
pub enum BackendError {
    #[error("metrics backend unavailable: {0}")]
    Metrics(String),
    #[error("tracing backend unavailable: {0}")]
    Tracing(String),
    #[error("control plane unavailable: {0}")]
    ControlPlane(String),
}

/// Why a request-scoped service layer could not be built.
#[derive(Clone, Debug, Error)]
pub enum LayerError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Backend(#[from] BackendError),
}
