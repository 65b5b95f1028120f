//! API response models for banners.

use crate::types::BannerId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A banner with a signed image URL
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BannerResponse {
    pub id: BannerId,
    pub image_url: String,
    pub created_at: DateTime<Utc>,
}
