//! API response models for the audiobook catalog.

use crate::{
    db::models::{audiobooks::CatalogEntry, chapters::ChapterDBResponse},
    storage::AssetUrls,
    types::{AudiobookId, CategoryId, ChapterId, UserId},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Category name shown for books without one
pub const UNCATEGORIZED: &str = "Uncategorized";

/// A book's category as embedded in catalog entries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CategoryRef {
    pub id: Option<CategoryId>,
    pub name: String,
}

/// A catalog entry with signed media URLs
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookSummary {
    pub id: AudiobookId,
    pub title: String,
    pub author: String,
    pub description: Option<String>,
    /// Signed URL of the first chapter's thumbnail
    pub cover_image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Signed URL of the first chapter's audio
    pub first_chapter_url: Option<String>,
    pub total_chapters: i64,
    pub category: CategoryRef,
}

impl BookSummary {
    /// Build the response for a catalog row, signing its media references.
    pub fn from_entry(entry: CatalogEntry, assets: &AssetUrls) -> Self {
        let cover_image_url = assets.sign_asset(entry.cover());
        let first_chapter_url = assets.sign_asset(entry.first_chapter_audio());
        Self {
            id: entry.id,
            title: entry.title,
            author: entry.author,
            description: entry.description,
            cover_image_url,
            created_at: entry.created_at,
            first_chapter_url,
            total_chapters: entry.total_chapters,
            category: CategoryRef {
                id: entry.category_id,
                name: entry.category_name.unwrap_or_else(|| UNCATEGORIZED.to_string()),
            },
        }
    }
}

/// A chapter with a signed audio URL
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChapterSummary {
    pub id: ChapterId,
    pub title: String,
    pub audio_url: Option<String>,
    pub order: i32,
}

impl ChapterSummary {
    pub fn from_record(chapter: ChapterDBResponse, assets: &AssetUrls) -> Self {
        let audio_url = assets.sign_asset(Some(chapter.audio()));
        Self {
            id: chapter.id,
            title: chapter.title,
            audio_url,
            order: chapter.chapter_order,
        }
    }
}

/// Query parameters for `/api/user_books`
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct UserBooksQuery {
    /// Return the books created by this user
    pub user_id: Option<UserId>,
    /// Return every book
    #[serde(default)]
    pub is_admin: bool,
}
