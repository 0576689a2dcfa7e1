//! Shared identifier types used across the workspace.

pub mod types;

pub use types::{
    ArticleId, CorrelationId, MessageId, OrderId, OrderLineId, ProductId, WarehouseId,
};
