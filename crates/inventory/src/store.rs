use async_trait::async_trait;
use common::{ArticleId, OrderId, ProductId, WarehouseId};

use crate::{Article, Order, OrderLine, Product, ProductArticle, Result, Warehouse};

/// Persistence of article rows.
///
/// Implementations make no multi-row atomicity promises: callers that
/// update several articles see each write land independently.
#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Returns every article, ordered by id.
    async fn find_all(&self) -> Result<Vec<Article>>;

    /// Loads a single article.
    ///
    /// Fails with `ArticleNotFound` if no row exists.
    async fn find_by_id(&self, id: ArticleId) -> Result<Article>;

    /// Inserts a new article and returns it with its assigned id and timestamps.
    async fn insert_returning(&self, article: Article) -> Result<Article>;

    /// Overwrites the stored name and stock of `article.id` and returns the
    /// stored row. `amount_of` belongs to the product relation and is ignored.
    async fn update_returning(&self, article: Article) -> Result<Article>;

    /// Deletes an article.
    async fn delete(&self, id: ArticleId) -> Result<()>;
}

/// Persistence of product rows and the `product articles` relation.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Returns every product row (components not loaded), ordered by id.
    async fn find_all(&self) -> Result<Vec<Product>>;

    /// Loads a single product row (components not loaded).
    async fn find_by_id(&self, id: ProductId) -> Result<Product>;

    /// Inserts a product row and returns it with its assigned id and timestamps.
    async fn insert_returning(&self, product: Product) -> Result<Product>;

    /// Overwrites the stored name and price of `product.id`.
    async fn update_returning(&self, product: Product) -> Result<Product>;

    /// Deletes a product and its relation rows.
    async fn delete(&self, id: ProductId) -> Result<()>;

    /// Joins the product's relation rows with the current article rows.
    ///
    /// Every returned article carries the relation's `amount_of`.
    async fn load_components(&self, product_id: ProductId) -> Result<Vec<Article>>;

    /// Batch variant of [`load_components`](Self::load_components) for several products.
    async fn load_components_for(
        &self,
        product_ids: &[ProductId],
    ) -> Result<Vec<(ProductId, Article)>>;

    /// Replaces the product's relation rows with `relations`.
    async fn sync_components(
        &self,
        product_id: ProductId,
        relations: &[ProductArticle],
    ) -> Result<()>;
}

/// Persistence of orders and their lines.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Returns every order row (lines not loaded), ordered by id.
    async fn find_all(&self) -> Result<Vec<Order>>;

    /// Loads a single order row (lines not loaded).
    async fn find_by_id(&self, id: OrderId) -> Result<Order>;

    /// Inserts an order row and returns it with its assigned id and timestamps.
    async fn insert_returning(&self, order: Order) -> Result<Order>;

    /// Overwrites the stored warehouse, customer and `updated_at` of `order.id`.
    async fn update_returning(&self, order: Order) -> Result<Order>;

    /// Deletes an order; its lines go with it.
    async fn delete(&self, id: OrderId) -> Result<()>;

    /// Loads the lines of an order in insertion order.
    async fn find_lines(&self, order_id: OrderId) -> Result<Vec<OrderLine>>;

    /// Inserts a line for `order_id`.
    async fn create_line(&self, order_id: OrderId, line: OrderLine) -> Result<OrderLine>;

    /// Deletes every line of an order.
    async fn delete_lines(&self, order_id: OrderId) -> Result<()>;
}

/// Persistence of warehouse rows.
#[async_trait]
pub trait WarehouseStore: Send + Sync {
    async fn find_all(&self) -> Result<Vec<Warehouse>>;

    async fn find_by_id(&self, id: WarehouseId) -> Result<Warehouse>;

    async fn insert_returning(&self, warehouse: Warehouse) -> Result<Warehouse>;

    async fn update_returning(&self, warehouse: Warehouse) -> Result<Warehouse>;

    async fn delete(&self, id: WarehouseId) -> Result<()>;
}
