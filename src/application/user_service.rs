// User management use case
use crate::application::dashboard_api::{ApiError, DashboardApi};
use crate::domain::user::{UserForm, ValidationError};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CreateUserError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error(transparent)]
    Api(#[from] ApiError),
}

#[derive(Clone)]
pub struct UserService {
    api: Arc<dyn DashboardApi>,
}

impl UserService {
    pub fn new(api: Arc<dyn DashboardApi>) -> Self {
        Self { api }
    }

    /// Validate locally, then create. Invalid forms never reach the network.
    pub async fn create_user(&self, form: &UserForm) -> Result<String, CreateUserError> {
        let user = form.validate()?;

        let message = self.api.create_user(&user).await?;
        tracing::info!("Created user {}", user.email);

        Ok(message.unwrap_or_else(|| "User created successfully!".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeApi;
    use reqwest::StatusCode;

    fn form(name: &str, email: &str) -> UserForm {
        UserForm {
            name: name.to_string(),
            email: email.to_string(),
        }
    }

    #[tokio::test]
    async fn test_invalid_email_makes_no_call() {
        let api = Arc::new(FakeApi::default());
        let users = UserService::new(api.clone());

        let err = users.create_user(&form("Jane", "jane.example.com")).await.unwrap_err();

        assert!(matches!(err, CreateUserError::Invalid(ValidationError::InvalidEmail)));
        assert_eq!(err.to_string(), "Please enter a valid email address.");
        assert_eq!(api.call_count(), 0);
    }

    #[tokio::test]
    async fn test_created_with_default_message() {
        let api = Arc::new(FakeApi::default());
        let users = UserService::new(api.clone());

        let message = users.create_user(&form("Jane", "jane@example.com")).await.unwrap();

        assert_eq!(message, "User created successfully!");
        assert_eq!(api.call_count(), 1);
    }

    #[tokio::test]
    async fn test_forbidden_is_reported() {
        let api = Arc::new(FakeApi {
            create_user_error: Some((StatusCode::FORBIDDEN, "Access denied".to_string())),
            ..Default::default()
        });
        let users = UserService::new(api);

        let err = users.create_user(&form("Jane", "jane@example.com")).await.unwrap_err();

        assert_eq!(err.to_string(), "Access denied");
    }
}
