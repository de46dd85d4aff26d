use thiserror::Error;

use crate::storage::{format_reasons, CancellationReason, StoreError};

/// Errors returned by the user registry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Invalid user: {field} is required")]
    Validation { field: &'static str },
    #[error("Email already registered: {email}")]
    DuplicateEmail { email: String },
    #[error("User not found: {id}")]
    NotFound { id: String },
    #[error("Failed to write user: transaction cancelled {}", format_reasons(.reasons))]
    TransactionCancelled { reasons: Vec<CancellationReason> },
    #[error("Invalid stored user field {field}: {reason}")]
    Decoding { field: &'static str, reason: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RegistryError {
    pub(crate) fn decoding(field: &'static str, reason: impl Into<String>) -> Self {
        RegistryError::Decoding {
            field,
            reason: reason.into(),
        }
    }
}

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;
