//! Products and their bill of materials.

use chrono::{DateTime, Utc};
use common::{ArticleId, ProductId};
use serde::{Deserialize, Serialize};

use crate::article::Article;
use crate::math;

/// A sellable product assembled from component articles.
///
/// `articles` is only populated when the product is loaded through the
/// component loader; each entry carries its `amount_of`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    #[serde(default)]
    pub id: ProductId,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
    pub name: String,
    pub price: i64,
    #[serde(default)]
    pub articles: Vec<Article>,
}

impl Product {
    /// Creates a new, not yet persisted product without components.
    pub fn new(name: impl Into<String>, price: i64) -> Self {
        Self {
            name: name.into(),
            price,
            ..Self::default()
        }
    }

    /// Adds a component to the bill of materials.
    pub fn with_component(mut self, article_id: ArticleId, amount_of: i64) -> Self {
        self.articles.push(Article {
            id: article_id,
            amount_of,
            ..Article::default()
        });
        self
    }

    /// Number of complete products the loaded components allow.
    pub fn sellable_inventory(&self) -> i64 {
        math::sellable_inventory(&self.articles)
    }

    /// The relation rows describing this product's bill of materials.
    pub fn relations(&self) -> Vec<ProductArticle> {
        self.articles
            .iter()
            .map(|article| ProductArticle {
                product_id: self.id,
                article_id: article.id,
                amount_of: article.amount_of,
            })
            .collect()
    }
}

/// A row of the `product articles` join relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductArticle {
    pub product_id: ProductId,
    pub article_id: ArticleId,
    pub amount_of: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_without_components_sells_nothing() {
        assert_eq!(Product::new("chair", 100).sellable_inventory(), 0);
    }

    #[test]
    fn relations_follow_components() {
        let mut product = Product::new("table", 250)
            .with_component(ArticleId::new(1), 4)
            .with_component(ArticleId::new(2), 1);
        product.id = ProductId::new(9);

        let relations = product.relations();
        assert_eq!(relations.len(), 2);
        assert_eq!(relations[0].product_id, ProductId::new(9));
        assert_eq!(relations[0].article_id, ArticleId::new(1));
        assert_eq!(relations[0].amount_of, 4);
        assert_eq!(relations[1].amount_of, 1);
    }
}
