//! Product service: products with freshly loaded components.

use std::collections::HashMap;

use chrono::Utc;
use common::ProductId;

use crate::store::ProductStore;
use crate::{InventoryError, Product, Result};

/// Loads and persists products together with their bill of materials.
///
/// Every read reloads the components, so sellable inventory always reflects
/// current article stock.
#[derive(Clone)]
pub struct ProductService<S: ProductStore> {
    store: S,
}

impl<S: ProductStore> ProductService<S> {
    /// Creates a new product service over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns all products with their components loaded.
    #[tracing::instrument(skip(self))]
    pub async fn get_all(&self) -> Result<Vec<Product>> {
        let mut products = self.store.find_all().await?;
        let ids: Vec<ProductId> = products.iter().map(|p| p.id).collect();

        let mut components: HashMap<ProductId, Vec<_>> = HashMap::new();
        for (product_id, article) in self.store.load_components_for(&ids).await? {
            components.entry(product_id).or_default().push(article);
        }

        for product in &mut products {
            product.articles = components.remove(&product.id).unwrap_or_default();
        }
        Ok(products)
    }

    /// Returns a single product with its components loaded.
    #[tracing::instrument(skip(self))]
    pub async fn get_by_id(&self, id: ProductId) -> Result<Product> {
        let mut product = self.store.find_by_id(id).await?;
        product.articles = self.store.load_components(id).await?;
        Ok(product)
    }

    /// Persists a new product and its bill of materials.
    #[tracing::instrument(skip(self, product), fields(name = %product.name))]
    pub async fn create(&self, product: Product) -> Result<Product> {
        check_bill_of_materials(&product)?;
        let relations = product.relations();
        let stored = self.store.insert_returning(product).await?;
        self.store.sync_components(stored.id, &relations).await?;
        self.get_by_id(stored.id).await
    }

    /// Updates a product and replaces its bill of materials.
    #[tracing::instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn update(&self, mut product: Product) -> Result<Product> {
        check_bill_of_materials(&product)?;
        product.updated_at = Utc::now();
        let relations = product.relations();
        let stored = self.store.update_returning(product).await?;
        self.store.sync_components(stored.id, &relations).await?;
        self.get_by_id(stored.id).await
    }

    /// Deletes a product.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: ProductId) -> Result<()> {
        self.store.delete(id).await
    }
}

/// Rejects components consumed in negative quantities.
fn check_bill_of_materials(product: &Product) -> Result<()> {
    match product.articles.iter().find(|article| article.amount_of < 0) {
        Some(article) => Err(InventoryError::InvalidAmountOf {
            article_id: article.id,
            amount_of: article.amount_of,
        }),
        None => Ok(()),
    }
}
