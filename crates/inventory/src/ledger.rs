//! Stock ledger: applies product-unit adjustments to component articles.

use crate::store::ArticleStore;
use crate::{Article, InventoryError, Result};

/// Applies signed stock adjustments to the articles a product is built from.
///
/// New stock values are computed from the component snapshots handed in,
/// so two adjustments racing on the same article resolve last-write-wins.
/// A failed write stops the remaining writes; earlier writes stay applied.
/// Stock may go negative.
pub struct StockLedger<S: ArticleStore> {
    articles: S,
}

impl<S: ArticleStore> StockLedger<S> {
    /// Creates a ledger writing through the given article store.
    pub fn new(articles: S) -> Self {
        Self { articles }
    }

    /// Adds `amount_of * quantity` to every component's stock.
    #[tracing::instrument(skip(self, components), fields(components = components.len()))]
    pub async fn increase_stock_by(&self, components: &[Article], quantity: i64) -> Result<()> {
        self.apply(components, quantity).await
    }

    /// Subtracts `amount_of * quantity` from every component's stock.
    #[tracing::instrument(skip(self, components), fields(components = components.len()))]
    pub async fn decrease_stock_by(&self, components: &[Article], quantity: i64) -> Result<()> {
        let quantity = quantity
            .checked_neg()
            .ok_or_else(|| overflow(components, quantity))?;
        self.apply(components, quantity).await
    }

    async fn apply(&self, components: &[Article], quantity: i64) -> Result<()> {
        if quantity == 0 {
            return Ok(());
        }

        for component in components {
            let delta = component
                .amount_of
                .checked_mul(quantity)
                .ok_or(InventoryError::StockOverflow {
                    article_id: component.id,
                    delta: quantity,
                })?;
            let stock = component
                .stock
                .checked_add(delta)
                .ok_or(InventoryError::StockOverflow {
                    article_id: component.id,
                    delta,
                })?;

            self.articles
                .update_returning(Article {
                    stock,
                    ..component.clone()
                })
                .await?;

            tracing::debug!(article_id = %component.id, delta, stock, "stock adjusted");
            metrics::counter!("stock_adjustments_total").increment(1);
        }

        Ok(())
    }
}

fn overflow(components: &[Article], quantity: i64) -> InventoryError {
    InventoryError::StockOverflow {
        article_id: components.first().map(|a| a.id).unwrap_or_default(),
        delta: quantity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{InMemoryStore, StockUpdate};
    use common::ArticleId;

    async fn seed(store: &InMemoryStore, stocks: &[(i64, i64)]) -> Vec<Article> {
        let mut components = Vec::new();
        for (i, &(stock, amount_of)) in stocks.iter().enumerate() {
            let article = store
                .insert_returning(Article::new(format!("part-{i}"), stock))
                .await
                .unwrap();
            components.push(article.with_amount_of(amount_of));
        }
        components
    }

    #[tokio::test]
    async fn decrease_subtracts_bill_of_materials() {
        let store = InMemoryStore::new();
        let components = seed(&store, &[(10, 3), (5, 2), (10, 3)]).await;
        let ledger = StockLedger::new(store.clone());

        ledger.decrease_stock_by(&components, 2).await.unwrap();

        assert_eq!(
            store.stock_updates().await,
            vec![
                StockUpdate { article_id: ArticleId::new(1), stock: 4 },
                StockUpdate { article_id: ArticleId::new(2), stock: 1 },
                StockUpdate { article_id: ArticleId::new(3), stock: 4 },
            ]
        );
    }

    #[tokio::test]
    async fn increase_adds_bill_of_materials() {
        let store = InMemoryStore::new();
        let components = seed(&store, &[(10, 3)]).await;
        let ledger = StockLedger::new(store.clone());

        ledger.increase_stock_by(&components, 2).await.unwrap();

        assert_eq!(store.stock_of(ArticleId::new(1)).await, Some(16));
    }

    #[tokio::test]
    async fn zero_quantity_issues_no_writes() {
        let store = InMemoryStore::new();
        let components = seed(&store, &[(10, 3), (4, 1)]).await;
        let ledger = StockLedger::new(store.clone());

        ledger.increase_stock_by(&components, 0).await.unwrap();
        ledger.decrease_stock_by(&components, 0).await.unwrap();

        assert!(store.stock_updates().await.is_empty());
    }

    #[tokio::test]
    async fn stock_may_go_negative() {
        let store = InMemoryStore::new();
        let components = seed(&store, &[(1, 2)]).await;
        let ledger = StockLedger::new(store.clone());

        ledger.decrease_stock_by(&components, 3).await.unwrap();

        assert_eq!(store.stock_of(ArticleId::new(1)).await, Some(-5));
    }

    #[tokio::test]
    async fn failed_write_stops_remaining_components() {
        let store = InMemoryStore::new();
        let components = seed(&store, &[(10, 1), (10, 1), (10, 1)]).await;
        store.fail_updates_for(ArticleId::new(2)).await;
        let ledger = StockLedger::new(store.clone());

        let result = ledger.decrease_stock_by(&components, 1).await;

        assert!(matches!(result, Err(InventoryError::Persistence(_))));
        assert_eq!(store.stock_of(ArticleId::new(1)).await, Some(9));
        assert_eq!(store.stock_of(ArticleId::new(2)).await, Some(10));
        assert_eq!(store.stock_of(ArticleId::new(3)).await, Some(10));
    }

    #[tokio::test]
    async fn overflowing_adjustment_is_rejected() {
        let store = InMemoryStore::new();
        let components = seed(&store, &[(i64::MAX, 1)]).await;
        let ledger = StockLedger::new(store.clone());

        let result = ledger.increase_stock_by(&components, 1).await;

        assert!(matches!(result, Err(InventoryError::StockOverflow { .. })));
        assert!(store.stock_updates().await.is_empty());
    }
}
