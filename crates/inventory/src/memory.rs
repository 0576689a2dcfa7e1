use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::{ArticleId, OrderId, OrderLineId, ProductId, WarehouseId};
use tokio::sync::RwLock;

use crate::store::{ArticleStore, OrderStore, ProductStore, WarehouseStore};
use crate::{
    Article, InventoryError, Order, OrderLine, Product, ProductArticle, Result, Warehouse,
};

/// Most recent stock writes kept by [`InMemoryStore::stock_updates`].
pub const STOCK_UPDATE_LOG_CAPACITY: usize = 1024;

/// A successful write to an article's stock, as seen by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockUpdate {
    pub article_id: ArticleId,
    pub stock: i64,
}

#[derive(Debug, Default)]
struct Sequences {
    article: u64,
    product: u64,
    order: u64,
    order_line: u64,
    warehouse: u64,
}

#[derive(Debug, Default)]
struct Failures {
    next_updates: usize,
    articles: HashSet<ArticleId>,
    lookups: bool,
}

#[derive(Debug, Default)]
struct Tables {
    articles: BTreeMap<ArticleId, Article>,
    products: BTreeMap<ProductId, Product>,
    product_articles: Vec<ProductArticle>,
    orders: BTreeMap<OrderId, Order>,
    order_lines: BTreeMap<OrderLineId, OrderLine>,
    warehouses: BTreeMap<WarehouseId, Warehouse>,
    sequences: Sequences,
    stock_updates: VecDeque<StockUpdate>,
    failures: Failures,
}

impl Tables {
    fn join_components(&self, product_id: ProductId) -> Vec<Article> {
        self.product_articles
            .iter()
            .filter(|relation| relation.product_id == product_id)
            .filter_map(|relation| {
                self.articles.get(&relation.article_id).map(|article| Article {
                    amount_of: relation.amount_of,
                    ..article.clone()
                })
            })
            .collect()
    }

    fn check_lookup(&self) -> Result<()> {
        if self.failures.lookups {
            return Err(InventoryError::Persistence(
                "product lookup unavailable".to_string(),
            ));
        }
        Ok(())
    }

    fn check_article_update(&mut self, id: ArticleId) -> Result<()> {
        if self.failures.articles.contains(&id) {
            return Err(InventoryError::Persistence(format!(
                "update of article {id} rejected"
            )));
        }
        if self.failures.next_updates > 0 {
            self.failures.next_updates -= 1;
            return Err(InventoryError::Persistence(format!(
                "update of article {id} failed"
            )));
        }
        Ok(())
    }
}

/// In-memory implementation of every store trait, for tests and local runs.
///
/// Clones share the same tables. Supports failure injection so callers can
/// exercise their error paths.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recent successful article updates, oldest first.
    ///
    /// Only the last [`STOCK_UPDATE_LOG_CAPACITY`] writes are kept.
    pub async fn stock_updates(&self) -> Vec<StockUpdate> {
        self.tables.read().await.stock_updates.iter().copied().collect()
    }

    /// Current stock of an article, if it exists.
    pub async fn stock_of(&self, id: ArticleId) -> Option<i64> {
        self.tables.read().await.articles.get(&id).map(|a| a.stock)
    }

    /// Makes the next `count` article updates fail with a persistence error.
    pub async fn fail_next_updates(&self, count: usize) {
        self.tables.write().await.failures.next_updates = count;
    }

    /// Makes every update of `id` fail until [`clear_failures`](Self::clear_failures).
    pub async fn fail_updates_for(&self, id: ArticleId) {
        self.tables.write().await.failures.articles.insert(id);
    }

    /// Makes product lookups fail with a persistence error.
    pub async fn set_fail_on_lookup(&self, fail: bool) {
        self.tables.write().await.failures.lookups = fail;
    }

    /// Removes every injected failure.
    pub async fn clear_failures(&self) {
        self.tables.write().await.failures = Failures::default();
    }
}

#[async_trait]
impl ArticleStore for InMemoryStore {
    async fn find_all(&self) -> Result<Vec<Article>> {
        Ok(self.tables.read().await.articles.values().cloned().collect())
    }

    async fn find_by_id(&self, id: ArticleId) -> Result<Article> {
        self.tables
            .read()
            .await
            .articles
            .get(&id)
            .cloned()
            .ok_or(InventoryError::ArticleNotFound(id))
    }

    async fn insert_returning(&self, article: Article) -> Result<Article> {
        let mut tables = self.tables.write().await;
        tables.sequences.article += 1;
        let now = Utc::now();
        let stored = Article {
            id: ArticleId::new(tables.sequences.article),
            created_at: now,
            updated_at: now,
            amount_of: 0,
            ..article
        };
        tables.articles.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn update_returning(&self, article: Article) -> Result<Article> {
        let mut tables = self.tables.write().await;
        if !tables.articles.contains_key(&article.id) {
            return Err(InventoryError::ArticleNotFound(article.id));
        }
        tables.check_article_update(article.id)?;

        let Some(stored) = tables.articles.get_mut(&article.id) else {
            return Err(InventoryError::ArticleNotFound(article.id));
        };
        stored.name = article.name;
        stored.stock = article.stock;
        stored.updated_at = Utc::now();
        let stored = stored.clone();

        if tables.stock_updates.len() == STOCK_UPDATE_LOG_CAPACITY {
            tables.stock_updates.pop_front();
        }
        tables.stock_updates.push_back(StockUpdate {
            article_id: stored.id,
            stock: stored.stock,
        });
        Ok(stored)
    }

    async fn delete(&self, id: ArticleId) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables
            .articles
            .remove(&id)
            .ok_or(InventoryError::ArticleNotFound(id))?;
        tables.product_articles.retain(|r| r.article_id != id);
        Ok(())
    }
}

#[async_trait]
impl ProductStore for InMemoryStore {
    async fn find_all(&self) -> Result<Vec<Product>> {
        let tables = self.tables.read().await;
        tables.check_lookup()?;
        Ok(tables.products.values().cloned().collect())
    }

    async fn find_by_id(&self, id: ProductId) -> Result<Product> {
        let tables = self.tables.read().await;
        tables.check_lookup()?;
        tables
            .products
            .get(&id)
            .cloned()
            .ok_or(InventoryError::ProductNotFound(id))
    }

    async fn insert_returning(&self, product: Product) -> Result<Product> {
        let mut tables = self.tables.write().await;
        tables.sequences.product += 1;
        let now = Utc::now();
        let stored = Product {
            id: ProductId::new(tables.sequences.product),
            created_at: now,
            updated_at: now,
            articles: Vec::new(),
            ..product
        };
        tables.products.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn update_returning(&self, product: Product) -> Result<Product> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .products
            .get_mut(&product.id)
            .ok_or(InventoryError::ProductNotFound(product.id))?;
        stored.name = product.name;
        stored.price = product.price;
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn delete(&self, id: ProductId) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables
            .products
            .remove(&id)
            .ok_or(InventoryError::ProductNotFound(id))?;
        tables.product_articles.retain(|r| r.product_id != id);
        Ok(())
    }

    async fn load_components(&self, product_id: ProductId) -> Result<Vec<Article>> {
        let tables = self.tables.read().await;
        tables.check_lookup()?;
        Ok(tables.join_components(product_id))
    }

    async fn load_components_for(
        &self,
        product_ids: &[ProductId],
    ) -> Result<Vec<(ProductId, Article)>> {
        let tables = self.tables.read().await;
        tables.check_lookup()?;
        Ok(product_ids
            .iter()
            .flat_map(|&id| {
                tables
                    .join_components(id)
                    .into_iter()
                    .map(move |article| (id, article))
            })
            .collect())
    }

    async fn sync_components(
        &self,
        product_id: ProductId,
        relations: &[ProductArticle],
    ) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.product_articles.retain(|r| r.product_id != product_id);
        tables
            .product_articles
            .extend(relations.iter().map(|relation| ProductArticle {
                product_id,
                ..*relation
            }));
        Ok(())
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn find_all(&self) -> Result<Vec<Order>> {
        Ok(self.tables.read().await.orders.values().cloned().collect())
    }

    async fn find_by_id(&self, id: OrderId) -> Result<Order> {
        self.tables
            .read()
            .await
            .orders
            .get(&id)
            .cloned()
            .ok_or(InventoryError::OrderNotFound(id))
    }

    async fn insert_returning(&self, order: Order) -> Result<Order> {
        let mut tables = self.tables.write().await;
        tables.sequences.order += 1;
        let now = Utc::now();
        let stored = Order {
            id: OrderId::new(tables.sequences.order),
            created_at: now,
            updated_at: now,
            lines: Vec::new(),
            ..order
        };
        tables.orders.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn update_returning(&self, order: Order) -> Result<Order> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .orders
            .get_mut(&order.id)
            .ok_or(InventoryError::OrderNotFound(order.id))?;
        stored.warehouse_id = order.warehouse_id;
        stored.customer = order.customer;
        stored.updated_at = order.updated_at;
        Ok(stored.clone())
    }

    async fn delete(&self, id: OrderId) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables
            .orders
            .remove(&id)
            .ok_or(InventoryError::OrderNotFound(id))?;
        tables.order_lines.retain(|_, line| line.order_id != id);
        Ok(())
    }

    async fn find_lines(&self, order_id: OrderId) -> Result<Vec<OrderLine>> {
        Ok(self
            .tables
            .read()
            .await
            .order_lines
            .values()
            .filter(|line| line.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn create_line(&self, order_id: OrderId, line: OrderLine) -> Result<OrderLine> {
        let mut tables = self.tables.write().await;
        if !tables.orders.contains_key(&order_id) {
            return Err(InventoryError::OrderNotFound(order_id));
        }
        tables.sequences.order_line += 1;
        let now = Utc::now();
        let stored = OrderLine {
            id: OrderLineId::new(tables.sequences.order_line),
            order_id,
            created_at: now,
            updated_at: now,
            ..line
        };
        tables.order_lines.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn delete_lines(&self, order_id: OrderId) -> Result<()> {
        self.tables
            .write()
            .await
            .order_lines
            .retain(|_, line| line.order_id != order_id);
        Ok(())
    }
}

#[async_trait]
impl WarehouseStore for InMemoryStore {
    async fn find_all(&self) -> Result<Vec<Warehouse>> {
        Ok(self.tables.read().await.warehouses.values().cloned().collect())
    }

    async fn find_by_id(&self, id: WarehouseId) -> Result<Warehouse> {
        self.tables
            .read()
            .await
            .warehouses
            .get(&id)
            .cloned()
            .ok_or(InventoryError::WarehouseNotFound(id))
    }

    async fn insert_returning(&self, warehouse: Warehouse) -> Result<Warehouse> {
        let mut tables = self.tables.write().await;
        tables.sequences.warehouse += 1;
        let now = Utc::now();
        let stored = Warehouse {
            id: WarehouseId::new(tables.sequences.warehouse),
            created_at: now,
            updated_at: now,
            ..warehouse
        };
        tables.warehouses.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn update_returning(&self, warehouse: Warehouse) -> Result<Warehouse> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .warehouses
            .get_mut(&warehouse.id)
            .ok_or(InventoryError::WarehouseNotFound(warehouse.id))?;
        stored.name = warehouse.name;
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn delete(&self, id: WarehouseId) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables
            .warehouses
            .remove(&id)
            .ok_or(InventoryError::WarehouseNotFound(id))?;
        let orphaned: Vec<OrderId> = tables
            .orders
            .values()
            .filter(|order| order.warehouse_id == id)
            .map(|order| order.id)
            .collect();
        for order_id in orphaned {
            tables.orders.remove(&order_id);
            tables.order_lines.retain(|_, line| line.order_id != order_id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_assigns_sequential_ids() {
        let store = InMemoryStore::new();
        let a = ArticleStore::insert_returning(&store, Article::new("leg", 10))
            .await
            .unwrap();
        let b = ArticleStore::insert_returning(&store, Article::new("seat", 4))
            .await
            .unwrap();
        assert_eq!(a.id, ArticleId::new(1));
        assert_eq!(b.id, ArticleId::new(2));
        assert_eq!(ArticleStore::find_all(&store).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn load_components_joins_amount_of_with_current_stock() {
        let store = InMemoryStore::new();
        let leg = ArticleStore::insert_returning(&store, Article::new("leg", 12))
            .await
            .unwrap();
        let product = ProductStore::insert_returning(&store, Product::new("stool", 50))
            .await
            .unwrap();
        store
            .sync_components(
                product.id,
                &[ProductArticle {
                    product_id: product.id,
                    article_id: leg.id,
                    amount_of: 3,
                }],
            )
            .await
            .unwrap();

        ArticleStore::update_returning(&store, Article { stock: 9, ..leg.clone() })
            .await
            .unwrap();

        let components = store.load_components(product.id).await.unwrap();
        assert_eq!(components.len(), 1);
        assert_eq!(components[0].stock, 9);
        assert_eq!(components[0].amount_of, 3);
    }

    #[tokio::test]
    async fn update_does_not_persist_amount_of() {
        let store = InMemoryStore::new();
        let leg = ArticleStore::insert_returning(&store, Article::new("leg", 12))
            .await
            .unwrap();
        let updated = ArticleStore::update_returning(&store, leg.with_amount_of(5))
            .await
            .unwrap();
        assert_eq!(updated.amount_of, 0);
        assert_eq!(store.stock_updates().await.len(), 1);
    }

    #[tokio::test]
    async fn deleting_an_order_cascades_its_lines() {
        let store = InMemoryStore::new();
        let order = OrderStore::insert_returning(&store, Order::new(WarehouseId::new(1), "x"))
            .await
            .unwrap();
        store
            .create_line(order.id, OrderLine::new(ProductId::new(1), 1, 1))
            .await
            .unwrap();
        assert_eq!(store.find_lines(order.id).await.unwrap().len(), 1);

        OrderStore::delete(&store, order.id).await.unwrap();
        assert!(store.find_lines(order.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn injected_update_failures_are_consumed() {
        let store = InMemoryStore::new();
        let leg = ArticleStore::insert_returning(&store, Article::new("leg", 12))
            .await
            .unwrap();
        store.fail_next_updates(1).await;

        let first = ArticleStore::update_returning(&store, leg.clone()).await;
        assert!(matches!(first, Err(InventoryError::Persistence(_))));
        let second = ArticleStore::update_returning(&store, leg).await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn stock_update_log_keeps_only_recent_writes() {
        let store = InMemoryStore::new();
        let leg = ArticleStore::insert_returning(&store, Article::new("leg", 0))
            .await
            .unwrap();

        let writes = STOCK_UPDATE_LOG_CAPACITY as i64 + 10;
        for stock in 1..=writes {
            ArticleStore::update_returning(&store, Article { stock, ..leg.clone() })
                .await
                .unwrap();
        }

        let updates = store.stock_updates().await;
        assert_eq!(updates.len(), STOCK_UPDATE_LOG_CAPACITY);
        assert_eq!(updates[0].stock, 11);
        assert_eq!(updates.last().map(|u| u.stock), Some(writes));
    }

    #[tokio::test]
    async fn missing_rows_report_not_found() {
        let store = InMemoryStore::new();
        let result = ProductStore::find_by_id(&store, ProductId::new(5)).await;
        assert!(matches!(result, Err(InventoryError::ProductNotFound(id)) if id == ProductId::new(5)));
    }
}
