// Session domain model
use std::sync::{Arc, PoisonError, RwLock};

/// Shared handle to the single bearer-token session of this instance.
///
/// Cloning the handle shares the same session; the HTTP client and the
/// realtime client both read the token from here.
#[derive(Debug, Clone, Default)]
pub struct Session {
    token: Arc<RwLock<Option<String>>>,
}

impl Session {
    pub fn with_token(token: Option<String>) -> Self {
        Self {
            token: Arc::new(RwLock::new(token.filter(|t| !t.is_empty()))),
        }
    }

    pub fn token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    pub fn establish(&self, token: String) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token);
    }

    pub fn clear(&self) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}
