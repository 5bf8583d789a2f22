// Session use case - login, logout, restore and expiry
use crate::application::dashboard_api::{ApiError, DashboardApi};
use crate::application::realtime_client::RealtimeClient;
use crate::domain::session::Session;
use crate::infrastructure::token_store::TokenStore;
use std::sync::Arc;

/// Hooks run when a session ends, so views drop session-bound state.
pub type SessionEndHook = Arc<dyn Fn() + Send + Sync>;

/// Inline message for a failed login attempt.
pub fn login_failure_message(error: &ApiError) -> String {
    match error {
        ApiError::Status { message, .. } if !message.is_empty() => message.clone(),
        _ => "Login failed. Please check your credentials.".to_string(),
    }
}

#[derive(Clone)]
pub struct SessionService {
    api: Arc<dyn DashboardApi>,
    session: Session,
    store: TokenStore,
    realtime: RealtimeClient,
    on_end: Vec<SessionEndHook>,
}

impl SessionService {
    pub fn new(
        api: Arc<dyn DashboardApi>,
        session: Session,
        store: TokenStore,
        realtime: RealtimeClient,
    ) -> Self {
        Self {
            api,
            session,
            store,
            realtime,
            on_end: Vec::new(),
        }
    }

    pub fn on_session_end(mut self, hook: SessionEndHook) -> Self {
        self.on_end.push(hook);
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    /// Pick up a persisted token, if any, and go live with it. An
    /// unreadable token file is discarded and the service starts logged out.
    pub fn restore(&self) -> bool {
        let token = match self.store.load() {
            Ok(Some(token)) => token,
            Ok(None) => return false,
            Err(e) => {
                tracing::warn!("Discarding persisted session: {:#}", e);
                if let Err(e) = self.store.clear() {
                    tracing::warn!("Failed to remove persisted token: {:#}", e);
                }
                return false;
            }
        };

        self.session.establish(token);
        self.realtime.connect();
        tracing::info!("Restored persisted session");
        true
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<(), ApiError> {
        let token = self.api.login(email, password).await?;

        if let Err(e) = self.store.save(&token) {
            tracing::warn!("Session token not persisted: {:#}", e);
        }
        // The push link is authenticated with the token it was opened with
        if self.session.is_authenticated() {
            self.realtime.disconnect();
        }
        self.session.establish(token);
        self.realtime.connect();

        tracing::info!("Logged in as {}", email);
        Ok(())
    }

    pub fn logout(&self) {
        self.end();
        tracing::info!("Logged out");
    }

    /// Pass `result` through, ending the session first if the API rejected
    /// the token.
    pub fn guard<T>(&self, result: Result<T, ApiError>) -> Result<T, ApiError> {
        if let Err(e) = &result {
            self.check(e);
        }
        result
    }

    pub fn check(&self, error: &ApiError) {
        if error.is_unauthorized() {
            tracing::warn!("Session expired; returning to login");
            self.end();
        }
    }

    fn end(&self) {
        if let Err(e) = self.store.clear() {
            tracing::warn!("Failed to remove persisted token: {:#}", e);
        }
        self.session.clear();
        self.realtime.disconnect();
        for hook in &self.on_end {
            hook();
        }
    }
}
