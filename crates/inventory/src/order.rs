//! Customer orders and their lines.

use chrono::{DateTime, Utc};
use common::{OrderId, OrderLineId, ProductId, WarehouseId};
use serde::{Deserialize, Serialize};

/// A customer order placed against a warehouse.
///
/// Lines are owned by the order: created with it, replaced wholesale on
/// update and deleted with it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    #[serde(default)]
    pub id: OrderId,
    pub warehouse_id: WarehouseId,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
    pub customer: String,
    pub lines: Vec<OrderLine>,
}

impl Order {
    /// Creates a new, not yet persisted order.
    pub fn new(warehouse_id: WarehouseId, customer: impl Into<String>) -> Self {
        Self {
            warehouse_id,
            customer: customer.into(),
            ..Self::default()
        }
    }

    /// Appends a line to the order.
    pub fn with_line(mut self, product_id: ProductId, quantity: u64, unit_cost: u64) -> Self {
        self.lines.push(OrderLine::new(product_id, quantity, unit_cost));
        self
    }

    /// Total cost of all lines.
    pub fn total_cost(&self) -> u64 {
        self.lines
            .iter()
            .map(|line| line.quantity.saturating_mul(line.unit_cost))
            .fold(0, u64::saturating_add)
    }
}

/// One product-quantity entry of an order.
///
/// `order_id` is a storage detail and is not part of the wire format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    #[serde(default)]
    pub id: OrderLineId,
    #[serde(skip)]
    pub order_id: OrderId,
    pub product_id: ProductId,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
    pub quantity: u64,
    pub unit_cost: u64,
}

impl OrderLine {
    /// Creates a new, not yet persisted line.
    pub fn new(product_id: ProductId, quantity: u64, unit_cost: u64) -> Self {
        Self {
            product_id,
            quantity,
            unit_cost,
            ..Self::default()
        }
    }
}
