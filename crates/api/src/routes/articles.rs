//! Article CRUD endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::ArticleId;
use inventory::{Article, ArticleStore};
use serde::Serialize;

use crate::error::ApiError;
use crate::{AppState, Store};

#[derive(Serialize)]
pub struct ArticleResponse {
    #[serde(flatten)]
    pub article: Article,
    pub available_inventory: i64,
}

impl From<Article> for ArticleResponse {
    fn from(article: Article) -> Self {
        Self {
            available_inventory: article.available_inventory(),
            article,
        }
    }
}

/// GET /articles
#[tracing::instrument(skip(state))]
pub async fn list<S: Store>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<ArticleResponse>>, ApiError> {
    let articles = ArticleStore::find_all(&state.store).await?;
    Ok(Json(articles.into_iter().map(Into::into).collect()))
}

/// GET /articles/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<ArticleId>,
) -> Result<Json<ArticleResponse>, ApiError> {
    let article = ArticleStore::find_by_id(&state.store, id).await?;
    Ok(Json(article.into()))
}

/// POST /articles
#[tracing::instrument(skip(state, article), fields(name = %article.name))]
pub async fn create<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Json(article): Json<Article>,
) -> Result<(StatusCode, Json<ArticleResponse>), ApiError> {
    let article = ArticleStore::insert_returning(&state.store, article).await?;
    Ok((StatusCode::CREATED, Json(article.into())))
}

/// PUT /articles/{id}
#[tracing::instrument(skip(state, article))]
pub async fn update<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<ArticleId>,
    Json(article): Json<Article>,
) -> Result<Json<ArticleResponse>, ApiError> {
    let article = ArticleStore::update_returning(&state.store, Article { id, ..article }).await?;
    Ok(Json(article.into()))
}

/// DELETE /articles/{id}
#[tracing::instrument(skip(state))]
pub async fn delete<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<ArticleId>,
) -> Result<StatusCode, ApiError> {
    ArticleStore::delete(&state.store, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
