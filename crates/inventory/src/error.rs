//! Inventory error types.

use common::{ArticleId, OrderId, ProductId, WarehouseId};
use thiserror::Error;

/// Errors raised by the persistence collaborator and the stock ledger.
#[derive(Debug, Error)]
pub enum InventoryError {
    /// The article does not exist.
    #[error("Article not found: {0}")]
    ArticleNotFound(ArticleId),

    /// The product does not exist.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// The order does not exist.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// The warehouse does not exist.
    #[error("Warehouse not found: {0}")]
    WarehouseNotFound(WarehouseId),

    /// Applying an adjustment would overflow the stock counter.
    #[error("Stock overflow adjusting article {article_id} by {delta}")]
    StockOverflow { article_id: ArticleId, delta: i64 },

    /// A bill-of-materials quantity below zero.
    #[error("Invalid amount_of {amount_of} for article {article_id}")]
    InvalidAmountOf { article_id: ArticleId, amount_of: i64 },

    /// The underlying store failed.
    #[error("Persistence error: {0}")]
    Persistence(String),
}

/// Result type for inventory operations.
pub type Result<T> = std::result::Result<T, InventoryError>;
