use thiserror::Error;
use uuid::Uuid;

/// Result alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Conditions that abort a ledger operation before anything is committed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("no stock record for product {product_id} at depot {depot_id}")]
    NoStockRecord { depot_id: Uuid, product_id: Uuid },

    #[error(
        "insufficient stock: available {available_bags} bags, requested {requested_bags} bags, short by {} bags",
        .requested_bags - .available_bags
    )]
    InsufficientStock {
        available_bags: i64,
        requested_bags: i64,
    },

    #[error("validation error on {field}: {message}")]
    Validation { field: String, message: String },

    #[error("duplicate {0}")]
    DuplicateKey(String),

    #[error("{0} not found")]
    NotFound(String),
}

impl LedgerError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        LedgerError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// Bags missing for an `InsufficientStock` rejection
    pub fn shortfall(&self) -> Option<i64> {
        match self {
            LedgerError::InsufficientStock {
                available_bags,
                requested_bags,
            } => Some(requested_bags - available_bags),
            _ => None,
        }
    }
}
