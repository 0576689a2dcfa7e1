//! Warehouses orders are fulfilled from.

use chrono::{DateTime, Utc};
use common::WarehouseId;
use serde::{Deserialize, Serialize};

/// A warehouse record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warehouse {
    #[serde(default)]
    pub id: WarehouseId,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
    pub name: String,
}

impl Warehouse {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}
