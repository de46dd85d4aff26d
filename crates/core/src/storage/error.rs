use thiserror::Error;

/// Why the store rejected one item of a cancelled transaction.
///
/// `None` means the item itself was fine and was rolled back because another
/// item failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancellationCode {
    None,
    ConditionalCheckFailed,
    ItemCollectionSizeLimitExceeded,
    TransactionConflict,
    ProvisionedThroughputExceeded,
    ThrottlingError,
    ValidationError,
    Other(String),
}

impl CancellationCode {
    /// Parses the store's reason code. A missing code means the item did not
    /// cause the cancellation.
    pub fn from_code(code: Option<&str>) -> Self {
        match code {
            None | Some("None") => CancellationCode::None,
            Some("ConditionalCheckFailed") => CancellationCode::ConditionalCheckFailed,
            Some("ItemCollectionSizeLimitExceeded") => {
                CancellationCode::ItemCollectionSizeLimitExceeded
            }
            Some("TransactionConflict") => CancellationCode::TransactionConflict,
            Some("ProvisionedThroughputExceeded") => {
                CancellationCode::ProvisionedThroughputExceeded
            }
            Some("ThrottlingError") => CancellationCode::ThrottlingError,
            Some("ValidationError") => CancellationCode::ValidationError,
            Some(other) => CancellationCode::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            CancellationCode::None => "None",
            CancellationCode::ConditionalCheckFailed => "ConditionalCheckFailed",
            CancellationCode::ItemCollectionSizeLimitExceeded => "ItemCollectionSizeLimitExceeded",
            CancellationCode::TransactionConflict => "TransactionConflict",
            CancellationCode::ProvisionedThroughputExceeded => "ProvisionedThroughputExceeded",
            CancellationCode::ThrottlingError => "ThrottlingError",
            CancellationCode::ValidationError => "ValidationError",
            CancellationCode::Other(code) => code,
        }
    }
}

/// Per-item outcome of a cancelled transaction.
///
/// Reasons are positional: the reason at index `i` belongs to the item at
/// index `i` of the submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancellationReason {
    pub code: CancellationCode,
    pub message: Option<String>,
}

impl CancellationReason {
    pub fn new(code: CancellationCode) -> Self {
        Self {
            code,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Returns true if this item was rejected by its write condition.
    pub fn is_condition_failure(&self) -> bool {
        self.code == CancellationCode::ConditionalCheckFailed
    }

    /// Returns true if this item was rolled back because a concurrent
    /// transaction was writing it.
    pub fn is_conflict(&self) -> bool {
        self.code == CancellationCode::TransactionConflict
    }
}

/// Renders reasons as `[None, ConditionalCheckFailed]` for logs and errors.
pub fn format_reasons(reasons: &[CancellationReason]) -> String {
    let codes: Vec<&str> = reasons.iter().map(|r| r.code.as_str()).collect();
    format!("[{}]", codes.join(", "))
}

/// Errors that can occur when talking to the key-value store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Item not found: {key}")]
    NotFound { key: String },
    #[error("Conditional check failed for {key}")]
    ConditionalCheckFailed { key: String },
    #[error("Transaction cancelled: {}", format_reasons(.reasons))]
    TransactionCancelled { reasons: Vec<CancellationReason> },
    #[error("Throttled: {0}")]
    Throttled(String),
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Query failed: {0}")]
    QueryFailed(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
