//! Category endpoints.

use crate::{
    AppState,
    db::{
        handlers::{Categories, Repository},
        models::categories::CategoryDBResponse,
    },
    errors::{Error, Result},
};
use axum::{Json, extract::State};

/// List all categories
#[utoipa::path(
    get,
    path = "/api/categories",
    tag = "categories",
    responses(
        (status = 200, description = "Categories ordered by id", body = [CategoryDBResponse]),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<CategoryDBResponse>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let categories = Categories::new(&mut conn).list(&()).await?;
    Ok(Json(categories))
}
