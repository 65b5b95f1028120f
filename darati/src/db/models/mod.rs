//! Request and record types for the database layer.
//!
//! `*CreateDBRequest` types carry what an insert needs; `*DBResponse` types are the rows handed
//! back by the repositories. Columns that hold blob references expose them through
//! [`StoredAsset`](crate::storage::StoredAsset) accessors tagged with their
//! [`AssetKind`](crate::storage::AssetKind).

pub mod audiobooks;
pub mod banners;
pub mod categories;
pub mod chapters;
pub mod users;
