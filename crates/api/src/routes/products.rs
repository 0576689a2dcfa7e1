//! Product endpoints. Products are always returned with freshly loaded
//! components and their sellable inventory.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{ArticleId, ProductId};
use inventory::Product;
use serde::{Deserialize, Serialize};

use super::articles::ArticleResponse;
use crate::error::ApiError;
use crate::{AppState, Store};

/// Body of product create and update requests.
#[derive(Debug, Deserialize)]
pub struct ProductRequest {
    pub name: String,
    pub price: i64,
    #[serde(default)]
    pub articles: Vec<ComponentRef>,
}

/// A bill-of-materials entry: which article, and how many per product.
#[derive(Debug, Deserialize)]
pub struct ComponentRef {
    pub id: ArticleId,
    pub amount_of: i64,
}

impl From<ProductRequest> for Product {
    fn from(request: ProductRequest) -> Self {
        request
            .articles
            .into_iter()
            .fold(Product::new(request.name, request.price), |product, component| {
                product.with_component(component.id, component.amount_of)
            })
    }
}

#[derive(Serialize)]
pub struct ProductResponse {
    pub id: ProductId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub name: String,
    pub price: i64,
    pub articles: Vec<ArticleResponse>,
    pub sellable_inventory: i64,
}

impl From<Product> for ProductResponse {
    fn from(product: Product) -> Self {
        Self {
            sellable_inventory: product.sellable_inventory(),
            id: product.id,
            created_at: product.created_at,
            updated_at: product.updated_at,
            name: product.name,
            price: product.price,
            articles: product.articles.into_iter().map(Into::into).collect(),
        }
    }
}

/// GET /products
#[tracing::instrument(skip(state))]
pub async fn list<S: Store>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<ProductResponse>>, ApiError> {
    let products = state.products.get_all().await?;
    Ok(Json(products.into_iter().map(Into::into).collect()))
}

/// GET /products/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<ProductId>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product = state.products.get_by_id(id).await?;
    Ok(Json(product.into()))
}

/// POST /products
#[tracing::instrument(skip(state, request), fields(name = %request.name))]
pub async fn create<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Json(request): Json<ProductRequest>,
) -> Result<(StatusCode, Json<ProductResponse>), ApiError> {
    let product = state.products.create(request.into()).await?;
    Ok((StatusCode::CREATED, Json(product.into())))
}

/// PUT /products/{id}
#[tracing::instrument(skip(state, request))]
pub async fn update<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<ProductId>,
    Json(request): Json<ProductRequest>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product = state
        .products
        .update(Product {
            id,
            ..Product::from(request)
        })
        .await?;
    Ok(Json(product.into()))
}

/// DELETE /products/{id}
#[tracing::instrument(skip(state))]
pub async fn delete<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<ProductId>,
) -> Result<StatusCode, ApiError> {
    state.products.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
