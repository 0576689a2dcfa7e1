use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Declares a row identifier backed by the store's auto-increment key.
macro_rules! row_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Creates an identifier from a raw key.
            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            /// Returns the raw key.
            pub const fn as_u64(&self) -> u64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

row_id!(
    /// Identifier of an article (atomic stock unit).
    ArticleId
);
row_id!(
    /// Identifier of a sellable product.
    ProductId
);
row_id!(
    /// Identifier of a customer order.
    OrderId
);
row_id!(
    /// Identifier of a single order line.
    OrderLineId
);
row_id!(
    /// Identifier of a warehouse.
    WarehouseId
);

/// Unique identifier of a message travelling on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(Uuid);

impl MessageId {
    /// Creates a new random message ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for MessageId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Identifier shared by every message caused by the same originating event.
///
/// Kept as a string because correlation ids arrive from message metadata and
/// are copied verbatim onto produced messages.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Creates a new random correlation ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the correlation ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for CorrelationId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for CorrelationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_ids_display_raw_key() {
        assert_eq!(ArticleId::new(42).to_string(), "42");
        assert_eq!(u64::from(OrderId::from(7)), 7);
    }

    #[test]
    fn row_id_serializes_as_plain_number() {
        let json = serde_json::to_string(&ProductId::new(3)).unwrap();
        assert_eq!(json, "3");
        let back: ProductId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ProductId::new(3));
    }

    #[test]
    fn message_id_new_creates_unique_ids() {
        assert_ne!(MessageId::new(), MessageId::new());
    }

    #[test]
    fn correlation_id_keeps_foreign_values() {
        let id = CorrelationId::from("trace-123");
        assert_eq!(id.as_str(), "trace-123");
        assert_ne!(CorrelationId::new(), CorrelationId::new());
    }
}
