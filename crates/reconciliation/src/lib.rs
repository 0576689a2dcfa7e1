//! Order-driven stock reconciliation.
//!
//! Orders are persisted by [`OrderService`], which publishes an
//! [`OrderEvent`] on the bus after each committed change. The
//! [`StockReconciliationHandler`] consumes those events and moves component
//! stock through the inventory ledger.

pub mod error;
pub mod events;
pub mod handler;
pub mod producer;

pub use error::{ReconcileError, Result};
pub use events::{ORDER_CREATED, ORDER_DELETED, ORDER_UPDATED, OrderEvent};
pub use handler::StockReconciliationHandler;
pub use producer::OrderService;

/// Topic order events are published on unless configured otherwise.
pub const DEFAULT_ORDERS_TOPIC: &str = "orders";
