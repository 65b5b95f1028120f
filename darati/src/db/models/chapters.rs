//! Database models for chapters.

use crate::{
    storage::{AssetKind, StoredAsset},
    types::{AudiobookId, ChapterId},
};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database request for creating a chapter
#[derive(Debug, Clone)]
pub struct ChapterCreateDBRequest {
    pub audiobook_id: AudiobookId,
    pub title: String,
    pub audio_path: String,
    pub thumbnail_path: Option<String>,
    pub chapter_order: i32,
}

#[derive(Debug, Clone, FromRow)]
pub struct ChapterDBResponse {
    pub id: ChapterId,
    pub audiobook_id: AudiobookId,
    pub title: String,
    pub audio_path: String,
    pub thumbnail_path: Option<String>,
    pub chapter_order: i32,
    pub created_at: DateTime<Utc>,
}

impl ChapterDBResponse {
    pub fn audio(&self) -> StoredAsset<'_> {
        StoredAsset::new(&self.audio_path, AssetKind::Audio)
    }
}
