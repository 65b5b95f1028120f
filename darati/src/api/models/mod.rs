//! API request and response data models.
//!
//! API models are distinct from the database records in [`crate::db::models`]. Responses that
//! point at media carry signed URLs rather than the stored blob references.
//!
//! - [`auth`]: Signup and login payloads, user roles
//! - [`books`]: Catalog entries, chapters and book listing queries
//! - [`banners`]: Banner listings
//! - [`uploads`]: Multipart upload responses

pub mod auth;
pub mod banners;
pub mod books;
pub mod uploads;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Plain acknowledgement body
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}
