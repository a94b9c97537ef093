use std::fmt;
use std::sync::Arc;

/// Opaque bearer credential presented by a caller. Lives for one request;
/// never persisted, never logged.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct CallerIdentity(Arc<str>);

impl CallerIdentity {
    pub fn new(token: impl Into<Arc<str>>) -> Self {
        Self(token.into())
    }

    pub fn token(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for CallerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CallerIdentity(..)")
    }
}

impl fmt::Display for CallerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CallerIdentity(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_the_token() {
        let identity = CallerIdentity::new("very-secret-token");
        assert!(!format!("{identity:?}").contains("secret"));
    }
}
