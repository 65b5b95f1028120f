//! Database models for audiobooks.

use crate::{
    storage::{AssetKind, StoredAsset},
    types::{AudiobookId, CategoryId, UserId},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

/// Database request for creating an audiobook
#[derive(Debug, Clone)]
pub struct AudiobookCreateDBRequest {
    pub title: String,
    pub author: String,
    pub description: Option<String>,
    pub category_id: Option<CategoryId>,
    pub creator_id: Option<UserId>,
    pub is_public: bool,
}

/// An audiobook row.
///
/// The raw book listings return this record unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow, ToSchema)]
pub struct AudiobookDBResponse {
    pub id: AudiobookId,
    pub title: String,
    pub author: String,
    pub description: Option<String>,
    pub category_id: Option<CategoryId>,
    pub creator_id: Option<UserId>,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
}

/// An audiobook joined with its category and first chapter, as shown in the catalog.
#[derive(Debug, Clone, FromRow)]
pub struct CatalogEntry {
    pub id: AudiobookId,
    pub title: String,
    pub author: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub category_id: Option<CategoryId>,
    pub category_name: Option<String>,
    pub first_audio_path: Option<String>,
    pub first_thumbnail_path: Option<String>,
    pub total_chapters: i64,
}

impl CatalogEntry {
    /// Cover image: the first chapter's thumbnail
    pub fn cover(&self) -> Option<StoredAsset<'_>> {
        self.first_thumbnail_path
            .as_deref()
            .map(|path| StoredAsset::new(path, AssetKind::Thumbnail))
    }

    pub fn first_chapter_audio(&self) -> Option<StoredAsset<'_>> {
        self.first_audio_path
            .as_deref()
            .map(|path| StoredAsset::new(path, AssetKind::Audio))
    }
}
