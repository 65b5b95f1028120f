//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers for all API endpoints
//! - **[`models`]**: Request/response data structures for API communication
//!
//! # API Structure
//!
//! - **Service** (`/`, `/health`, `/healthz`): welcome message and liveness
//! - **Authentication** (`/api/auth/*`): signup and login
//! - **Uploads** (`/api/audio/upload`, `/api/banners/upload`): multipart uploads to blob storage
//! - **Catalog** (`/api/books/*`, `/api/categories`, `/api/user_books`): read-only listings with
//!   signed asset URLs
//! - **Banners** (`/api/banners/list`): promotional images
//!
//! All endpoints are documented with `utoipa`; the rendered docs live at `/docs`.

pub mod handlers;
pub mod models;
