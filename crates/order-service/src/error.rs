use common::OrderId;
use domain::OrderError;
use order_store::StoreError;
use thiserror::Error;

/// Errors surfaced by the order service.
///
/// Everything raised below the service (aggregate rules, optimistic
/// conflicts, persistence failures) passes through unchanged; nothing is
/// swallowed or remapped.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The request itself was malformed.
    #[error("validation failed: {reason}")]
    Validation { reason: &'static str },

    /// No order exists with the given id.
    #[error("order not found: {0}")]
    NotFound(OrderId),

    /// The aggregate rejected the operation.
    #[error("order error: {0}")]
    Order(#[from] OrderError),

    /// The store rejected or failed the operation.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
