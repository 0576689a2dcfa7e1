//! Articles: atomic stock-keeping units.

use chrono::{DateTime, Utc};
use common::ArticleId;
use serde::{Deserialize, Serialize};

use crate::math;

/// An atomic stock unit.
///
/// When loaded as a product component, `amount_of` holds the number of
/// units consumed per product unit (the bill-of-materials quantity). For a
/// plain article row it is 0.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    #[serde(default)]
    pub id: ArticleId,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
    pub name: String,
    pub stock: i64,
    #[serde(default)]
    pub amount_of: i64,
}

impl Article {
    /// Creates a new, not yet persisted article.
    pub fn new(name: impl Into<String>, stock: i64) -> Self {
        Self {
            name: name.into(),
            stock,
            ..Self::default()
        }
    }

    /// Returns this article annotated with a bill-of-materials quantity.
    pub fn with_amount_of(mut self, amount_of: i64) -> Self {
        self.amount_of = amount_of;
        self
    }

    /// Stock expressed in product units.
    pub fn available_inventory(&self) -> i64 {
        math::available_inventory(self.stock, self.amount_of)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_article_has_no_available_inventory() {
        let article = Article::new("screw", 40);
        assert_eq!(article.amount_of, 0);
        assert_eq!(article.available_inventory(), 0);
    }

    #[test]
    fn component_article_reports_product_units() {
        let article = Article::new("leg", 10).with_amount_of(4);
        assert_eq!(article.available_inventory(), 2);
    }

    #[test]
    fn deserializes_without_optional_fields() {
        let article: Article = serde_json::from_str(r#"{"name":"seat","stock":3}"#).unwrap();
        assert_eq!(article.name, "seat");
        assert_eq!(article.stock, 3);
        assert_eq!(article.amount_of, 0);
    }
}
