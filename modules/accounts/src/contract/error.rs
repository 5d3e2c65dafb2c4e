use thiserror::Error;

/// Errors that are safe to expose to other modules
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccountsError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Store error: {message}")]
    Store { message: String },
}

impl AccountsError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }
}

impl From<crate::domain::error::DomainError> for AccountsError {
    fn from(domain_error: crate::domain::error::DomainError) -> Self {
        use crate::domain::error::DomainError::*;
        match domain_error {
            Validation { field, message } => Self::validation(format!("{field}: {message}")),
            Store { operation, message } => Self::store(format!("{operation}: {message}")),
        }
    }
}
