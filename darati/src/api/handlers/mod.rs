//! HTTP request handlers for all API endpoints.
//!
//! Handlers validate the request, call the repositories in [`crate::db::handlers`] and shape the
//! response. Media references are never returned as stored; they go through
//! [`AssetUrls`](crate::storage::AssetUrls) and come back as signed URLs.
//!
//! - [`health`]: Welcome message and liveness checks
//! - [`auth`]: Signup and login
//! - [`uploads`]: Audiobook and chapter uploads
//! - [`books`]: Catalog, chapter listings and per-user book lists
//! - [`categories`]: Category listing
//! - [`banners`]: Banner upload and listing
//!
//! # Error Handling
//!
//! Handlers return [`crate::errors::Result`]; errors render as `{"detail": "..."}` with the
//! matching status code.

pub mod auth;
pub mod banners;
pub mod books;
pub mod categories;
pub mod health;
pub mod uploads;
