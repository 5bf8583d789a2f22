// User creation form model
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please fill in all fields.")]
    MissingField,

    #[error("Please enter a valid email address.")]
    InvalidEmail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
}

impl UserForm {
    /// Checks the form locally and trims its fields.
    pub fn validate(&self) -> Result<NewUser, ValidationError> {
        let name = self.name.trim();
        let email = self.email.trim();

        if name.is_empty() || email.is_empty() {
            return Err(ValidationError::MissingField);
        }
        if !email.contains('@') {
            return Err(ValidationError::InvalidEmail);
        }

        Ok(NewUser {
            name: name.to_string(),
            email: email.to_string(),
        })
    }
}
