//! Repository implementations for database access.
//!
//! Each repository wraps a SQLx connection or transaction, binds parameters, and returns the
//! record types from [`crate::db::models`]. All of them implement [`Repository`] for the common
//! create/get/list/delete operations.
//!
//! - [`Users`]: accounts, lookup by email, login timestamps
//! - [`Categories`]: category names, idempotent seeding
//! - [`Audiobooks`]: book metadata and the catalog view joined with category and first chapter
//! - [`Chapters`]: chapter rows and per-book ordering
//! - [`Banners`]: promotional banner images
//!
//! ```ignore
//! let mut tx = pool.begin().await?;
//! let book = Audiobooks::new(&mut tx).create(&request).await?;
//! Chapters::new(&mut tx).create(&first_chapter(book.id)).await?;
//! tx.commit().await?;
//! ```

pub mod audiobooks;
pub mod banners;
pub mod categories;
pub mod chapters;
pub mod repository;
pub mod users;

pub use audiobooks::Audiobooks;
pub use banners::Banners;
pub use categories::Categories;
pub use chapters::Chapters;
pub use repository::Repository;
pub use users::Users;
