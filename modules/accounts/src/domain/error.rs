use thiserror::Error;

/// Domain-specific errors using thiserror
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Validation failed: {field}: {message}")]
    Validation { field: String, message: String },

    /// The store failed while running `operation`. Fatal to the invocation.
    #[error("Store error during {operation}: {message}")]
    Store { operation: String, message: String },
}

impl DomainError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Wrap an adapter error, keeping its whole context chain in the message.
    pub fn store(operation: impl Into<String>, err: anyhow::Error) -> Self {
        Self::Store {
            operation: operation.into(),
            message: format!("{err:#}"),
        }
    }

    pub fn is_store(&self) -> bool {
        matches!(self, Self::Store { .. })
    }
}
