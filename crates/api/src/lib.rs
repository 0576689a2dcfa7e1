//! HTTP API server for the warehouse stock system.
//!
//! Provides REST endpoints for articles, products, orders and warehouses,
//! with structured logging (tracing) and Prometheus metrics. Order writes
//! publish order events that the stock reconciliation handler consumes.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use inventory::{ArticleStore, OrderStore, ProductService, ProductStore, WarehouseStore};
use message_bus::{EventPublisher, Streamer};
use metrics_exporter_prometheus::PrometheusHandle;
use reconciliation::OrderService;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Everything the handlers need from persistence.
pub trait Store: ArticleStore + ProductStore + OrderStore + WarehouseStore + Clone + 'static {}

impl<T> Store for T where T: ArticleStore + ProductStore + OrderStore + WarehouseStore + Clone + 'static
{}

/// Shared application state accessible from all handlers.
pub struct AppState<S: Store> {
    pub store: S,
    pub products: ProductService<S>,
    pub orders: OrderService<S>,
}

/// Creates the Axum application router with all routes and shared state.
///
/// Resource routes live under `base_path`; `/health` and `/metrics` stay at the root.
pub fn create_app<S: Store>(
    state: Arc<AppState<S>>,
    streamer: Arc<Streamer>,
    metrics_handle: PrometheusHandle,
    base_path: &str,
) -> Router {
    let health_router = Router::new()
        .route("/health", get(routes::health::check))
        .with_state(streamer);

    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    let resources = Router::new()
        .route(
            "/articles",
            get(routes::articles::list::<S>).post(routes::articles::create::<S>),
        )
        .route(
            "/articles/{id}",
            get(routes::articles::get::<S>)
                .put(routes::articles::update::<S>)
                .delete(routes::articles::delete::<S>),
        )
        .route(
            "/products",
            get(routes::products::list::<S>).post(routes::products::create::<S>),
        )
        .route(
            "/products/{id}",
            get(routes::products::get::<S>)
                .put(routes::products::update::<S>)
                .delete(routes::products::delete::<S>),
        )
        .route(
            "/orders",
            get(routes::orders::list::<S>).post(routes::orders::create::<S>),
        )
        .route(
            "/orders/{id}",
            get(routes::orders::get::<S>)
                .put(routes::orders::update::<S>)
                .delete(routes::orders::delete::<S>),
        )
        .route(
            "/warehouses",
            get(routes::warehouses::list::<S>).post(routes::warehouses::create::<S>),
        )
        .route(
            "/warehouses/{id}",
            get(routes::warehouses::get::<S>)
                .put(routes::warehouses::update::<S>)
                .delete(routes::warehouses::delete::<S>),
        )
        .with_state(state);

    let base_path = base_path.trim_end_matches('/');
    let resources = if base_path.is_empty() {
        resources
    } else {
        Router::new().nest(base_path, resources)
    };

    Router::new()
        .merge(health_router)
        .merge(resources)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the application state over `store`, publishing order events
/// through `publisher` on `orders_topic`.
pub fn create_default_state<S: Store>(
    store: S,
    publisher: EventPublisher,
    orders_topic: &str,
) -> Arc<AppState<S>> {
    Arc::new(AppState {
        products: ProductService::new(store.clone()),
        orders: OrderService::new(store.clone(), publisher, orders_topic),
        store,
    })
}
