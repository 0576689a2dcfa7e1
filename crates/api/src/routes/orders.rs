//! Order endpoints. Every successful write publishes an order event.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::OrderId;
use inventory::Order;

use crate::error::ApiError;
use crate::{AppState, Store};

/// GET /orders
#[tracing::instrument(skip(state))]
pub async fn list<S: Store>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<Order>>, ApiError> {
    Ok(Json(state.orders.get_all().await?))
}

/// GET /orders/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>, ApiError> {
    Ok(Json(state.orders.get_by_id(id).await?))
}

/// POST /orders
#[tracing::instrument(skip(state, order), fields(customer = %order.customer))]
pub async fn create<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Json(order): Json<Order>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    check_lines(&order)?;
    let order = state.orders.create(order).await?;
    metrics::counter!("orders_created_total").increment(1);
    Ok((StatusCode::CREATED, Json(order)))
}

/// PUT /orders/{id}
#[tracing::instrument(skip(state, order))]
pub async fn update<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<OrderId>,
    Json(order): Json<Order>,
) -> Result<Json<Order>, ApiError> {
    check_lines(&order)?;
    Ok(Json(state.orders.update(Order { id, ..order }).await?))
}

/// DELETE /orders/{id}
#[tracing::instrument(skip(state))]
pub async fn delete<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<OrderId>,
) -> Result<StatusCode, ApiError> {
    state.orders.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn check_lines(order: &Order) -> Result<(), ApiError> {
    if order.lines.iter().any(|line| line.quantity == 0) {
        return Err(ApiError::BadRequest(
            "Order line quantity must be positive".to_string(),
        ));
    }
    Ok(())
}
