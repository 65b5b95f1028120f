//! Database layer for data persistence and access.
//!
//! Uses SQLx with PostgreSQL and follows the repository pattern: API handlers never write SQL
//! directly, they go through the repositories in [`handlers`].
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  (api::handlers - HTTP request handlers)
//! └──────┬──────┘
//!        ↓
//! ┌─────────────┐
//! │ Repositories│  (db::handlers - queries)
//! └──────┬──────┘
//!        ↓
//! ┌─────────────┐
//! │  PostgreSQL │
//! └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`handlers`]: Repository implementations
//! - [`models`]: Request and record types for each table
//! - [`errors`]: Database-specific error types
//!
//! ## Example Usage
//!
//! ```ignore
//! use darati::db::handlers::{Repository, Users};
//!
//! async fn example(pool: &sqlx::PgPool) -> Result<(), Box<dyn std::error::Error>> {
//!     let mut conn = pool.acquire().await?;
//!     let mut users = Users::new(&mut conn);
//!
//!     if let Some(user) = users.get_user_by_email("reader@example.com").await? {
//!         println!("Found user: {}", user.full_name);
//!     }
//!     Ok(())
//! }
//! ```

pub mod errors;
pub mod handlers;
pub mod models;
