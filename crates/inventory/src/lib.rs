//! Inventory domain for the warehouse stock system.
//!
//! This crate provides:
//! - the data model: [`Article`], [`Product`], [`Order`], [`OrderLine`], [`Warehouse`]
//! - inventory math ([`math`]): available and sellable inventory
//! - the [`StockLedger`] applying order-driven stock adjustments
//! - persistence collaborator traits ([`store`]) and an [`InMemoryStore`]
//! - [`ProductService`] for loading products with fresh components

pub mod article;
pub mod error;
pub mod ledger;
pub mod math;
pub mod memory;
pub mod order;
pub mod product;
pub mod service;
pub mod store;
pub mod warehouse;

pub use article::Article;
pub use error::{InventoryError, Result};
pub use ledger::StockLedger;
pub use memory::{InMemoryStore, STOCK_UPDATE_LOG_CAPACITY, StockUpdate};
pub use order::{Order, OrderLine};
pub use product::{Product, ProductArticle};
pub use service::ProductService;
pub use store::{ArticleStore, OrderStore, ProductStore, WarehouseStore};
pub use warehouse::Warehouse;
