//! API response models for the upload endpoints.

use crate::types::{AudiobookId, BannerId, ChapterId};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Result of `/api/audio/upload`.
///
/// Appending to an existing book returns only the new chapter id.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum AudioUploadResponse {
    NewBook {
        message: String,
        book_id: AudiobookId,
        chapter_id: ChapterId,
    },
    ChapterAdded {
        message: String,
        chapter_id: ChapterId,
    },
}

impl AudioUploadResponse {
    pub fn new_book(book_id: AudiobookId, chapter_id: ChapterId) -> Self {
        Self::NewBook {
            message: "Audiobook uploaded successfully".to_string(),
            book_id,
            chapter_id,
        }
    }

    pub fn chapter_added(chapter_id: ChapterId) -> Self {
        Self::ChapterAdded {
            message: "Chapter added successfully".to_string(),
            chapter_id,
        }
    }
}

/// Result of `/api/banners/upload`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BannerUploadResponse {
    pub message: String,
    pub banner_id: BannerId,
    /// Signed URL of the uploaded image, `null` if it could not be signed
    pub banner_url: Option<String>,
}
