//! Warehouse CRUD endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::WarehouseId;
use inventory::{Warehouse, WarehouseStore};

use crate::error::ApiError;
use crate::{AppState, Store};

/// GET /warehouses
#[tracing::instrument(skip(state))]
pub async fn list<S: Store>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<Warehouse>>, ApiError> {
    Ok(Json(WarehouseStore::find_all(&state.store).await?))
}

/// GET /warehouses/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<WarehouseId>,
) -> Result<Json<Warehouse>, ApiError> {
    Ok(Json(WarehouseStore::find_by_id(&state.store, id).await?))
}

/// POST /warehouses
#[tracing::instrument(skip(state, warehouse), fields(name = %warehouse.name))]
pub async fn create<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Json(warehouse): Json<Warehouse>,
) -> Result<(StatusCode, Json<Warehouse>), ApiError> {
    let warehouse = WarehouseStore::insert_returning(&state.store, warehouse).await?;
    Ok((StatusCode::CREATED, Json(warehouse)))
}

/// PUT /warehouses/{id}
#[tracing::instrument(skip(state, warehouse))]
pub async fn update<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<WarehouseId>,
    Json(warehouse): Json<Warehouse>,
) -> Result<Json<Warehouse>, ApiError> {
    let warehouse =
        WarehouseStore::update_returning(&state.store, Warehouse { id, ..warehouse }).await?;
    Ok(Json(warehouse))
}

/// DELETE /warehouses/{id}
#[tracing::instrument(skip(state))]
pub async fn delete<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<WarehouseId>,
) -> Result<StatusCode, ApiError> {
    WarehouseStore::delete(&state.store, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
