//! Database models for categories.

use crate::types::CategoryId;
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone)]
pub struct CategoryCreateDBRequest {
    pub name: String,
}

/// A category row. Serialized as-is by the categories listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow, ToSchema)]
pub struct CategoryDBResponse {
    pub id: CategoryId,
    pub name: String,
}
