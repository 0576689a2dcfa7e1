//! Reconciliation error types.

use common::OrderLineId;
use inventory::InventoryError;
use message_bus::{DecodeError, EncodeError, HandlerError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Malformed envelope or order payload.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Order event could not be encoded for publishing.
    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// Store failure while resolving components or writing stock.
    #[error(transparent)]
    Inventory(#[from] InventoryError),

    /// Line quantity does not fit a signed stock adjustment.
    #[error("Quantity {quantity} of order line {line_id} is out of range")]
    QuantityOutOfRange { line_id: OrderLineId, quantity: u64 },
}

impl From<ReconcileError> for HandlerError {
    fn from(err: ReconcileError) -> Self {
        HandlerError::new(err)
    }
}

/// Result type for reconciliation operations.
pub type Result<T> = std::result::Result<T, ReconcileError>;
