//! Identifier aliases shared by the database and API layers.
//!
//! Every table uses a `BIGSERIAL` key, so ids are plain `i64` values that clients already hold
//! from the previous backend.

pub type UserId = i64;
pub type CategoryId = i64;
pub type AudiobookId = i64;
pub type ChapterId = i64;
pub type BannerId = i64;
