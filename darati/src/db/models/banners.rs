//! Database models for banners.

use crate::{
    storage::{AssetKind, StoredAsset},
    types::{BannerId, UserId},
};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone)]
pub struct BannerCreateDBRequest {
    pub image_path: String,
    pub uploader_id: UserId,
}

#[derive(Debug, Clone, FromRow)]
pub struct BannerDBResponse {
    pub id: BannerId,
    pub image_path: String,
    pub uploader_id: UserId,
    pub created_at: DateTime<Utc>,
}

impl BannerDBResponse {
    pub fn image(&self) -> StoredAsset<'_> {
        StoredAsset::new(&self.image_path, AssetKind::Banner)
    }
}
