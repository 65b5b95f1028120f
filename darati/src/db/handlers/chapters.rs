//! Database repository for chapters.

use crate::{
    db::{
        errors::Result,
        handlers::repository::Repository,
        models::chapters::{ChapterCreateDBRequest, ChapterDBResponse},
    },
    types::{AudiobookId, ChapterId},
};
use sqlx::PgConnection;
use tracing::instrument;

/// Filter for listing chapters
#[derive(Debug, Clone)]
pub struct ChapterFilter {
    pub audiobook_id: AudiobookId,
}

pub struct Chapters<'c> {
    db: &'c mut PgConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Chapters<'c> {
    type CreateRequest = ChapterCreateDBRequest;
    type Response = ChapterDBResponse;
    type Id = ChapterId;
    type Filter = ChapterFilter;

    #[instrument(skip(self, request), fields(audiobook_id = request.audiobook_id, order = request.chapter_order), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        Ok(sqlx::query_as::<_, ChapterDBResponse>(
            r#"
            INSERT INTO chapters (audiobook_id, title, audio_path, thumbnail_path, chapter_order)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(request.audiobook_id)
        .bind(&request.title)
        .bind(&request.audio_path)
        .bind(&request.thumbnail_path)
        .bind(request.chapter_order)
        .fetch_one(&mut *self.db)
        .await?)
    }

    #[instrument(skip(self), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        Ok(sqlx::query_as::<_, ChapterDBResponse>("SELECT * FROM chapters WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?)
    }

    /// Chapters of one book in reading order
    #[instrument(skip(self), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        Ok(sqlx::query_as::<_, ChapterDBResponse>(
            "SELECT * FROM chapters WHERE audiobook_id = $1 ORDER BY chapter_order, id",
        )
        .bind(filter.audiobook_id)
        .fetch_all(&mut *self.db)
        .await?)
    }

    #[instrument(skip(self), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM chapters WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

impl<'c> Chapters<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    pub async fn list_for_book(&mut self, audiobook_id: AudiobookId) -> Result<Vec<ChapterDBResponse>> {
        self.list(&ChapterFilter { audiobook_id }).await
    }

    #[instrument(skip(self), err)]
    pub async fn count_for_book(&mut self, audiobook_id: AudiobookId) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chapters WHERE audiobook_id = $1")
            .bind(audiobook_id)
            .fetch_one(&mut *self.db)
            .await?;
        Ok(count)
    }
}
