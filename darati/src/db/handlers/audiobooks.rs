//! Database repository for audiobooks.

use crate::{
    db::{
        errors::Result,
        handlers::repository::Repository,
        models::audiobooks::{AudiobookCreateDBRequest, AudiobookDBResponse, CatalogEntry},
    },
    types::{AudiobookId, UserId},
};
use sqlx::PgConnection;
use tracing::instrument;

/// Books joined with their category name, chapter count and first chapter (lowest order, then
/// lowest id).
const CATALOG_SELECT: &str = r#"
    SELECT
        b.id,
        b.title,
        b.author,
        b.description,
        b.created_at,
        b.category_id,
        c.name AS category_name,
        fc.audio_path AS first_audio_path,
        fc.thumbnail_path AS first_thumbnail_path,
        (SELECT COUNT(*) FROM chapters ch WHERE ch.audiobook_id = b.id) AS total_chapters
    FROM audiobooks b
    LEFT JOIN categories c ON c.id = b.category_id
    LEFT JOIN LATERAL (
        SELECT audio_path, thumbnail_path
        FROM chapters
        WHERE audiobook_id = b.id
        ORDER BY chapter_order, id
        LIMIT 1
    ) fc ON TRUE
"#;

/// Filter for listing audiobooks
#[derive(Debug, Clone, Default)]
pub struct AudiobookFilter {
    /// Only books created by this user
    pub creator_id: Option<UserId>,
}

pub struct Audiobooks<'c> {
    db: &'c mut PgConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Audiobooks<'c> {
    type CreateRequest = AudiobookCreateDBRequest;
    type Response = AudiobookDBResponse;
    type Id = AudiobookId;
    type Filter = AudiobookFilter;

    #[instrument(skip(self, request), fields(title = %request.title), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        Ok(sqlx::query_as::<_, AudiobookDBResponse>(
            r#"
            INSERT INTO audiobooks (title, author, description, category_id, creator_id, is_public)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&request.title)
        .bind(&request.author)
        .bind(&request.description)
        .bind(request.category_id)
        .bind(request.creator_id)
        .bind(request.is_public)
        .fetch_one(&mut *self.db)
        .await?)
    }

    #[instrument(skip(self), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        Ok(sqlx::query_as::<_, AudiobookDBResponse>("SELECT * FROM audiobooks WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?)
    }

    #[instrument(skip(self), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        Ok(sqlx::query_as::<_, AudiobookDBResponse>(
            "SELECT * FROM audiobooks WHERE ($1::BIGINT IS NULL OR creator_id = $1) ORDER BY id",
        )
        .bind(filter.creator_id)
        .fetch_all(&mut *self.db)
        .await?)
    }

    #[instrument(skip(self), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM audiobooks WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

impl<'c> Audiobooks<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    pub async fn list_by_creator(&mut self, creator_id: UserId) -> Result<Vec<AudiobookDBResponse>> {
        self.list(&AudiobookFilter {
            creator_id: Some(creator_id),
        })
        .await
    }

    /// Fetch a book and lock its row until the surrounding transaction ends.
    ///
    /// Serializes concurrent chapter appends so they get distinct chapter numbers.
    #[instrument(skip(self), err)]
    pub async fn get_for_update(&mut self, id: AudiobookId) -> Result<Option<AudiobookDBResponse>> {
        Ok(
            sqlx::query_as::<_, AudiobookDBResponse>("SELECT * FROM audiobooks WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *self.db)
                .await?,
        )
    }

    /// All books for the catalog, newest first
    #[instrument(skip(self), err)]
    pub async fn list_catalog(&mut self) -> Result<Vec<CatalogEntry>> {
        let query = format!("{CATALOG_SELECT} ORDER BY b.created_at DESC, b.id DESC");
        Ok(sqlx::query_as::<_, CatalogEntry>(&query).fetch_all(&mut *self.db).await?)
    }

    #[instrument(skip(self), err)]
    pub async fn get_catalog_entry(&mut self, id: AudiobookId) -> Result<Option<CatalogEntry>> {
        let query = format!("{CATALOG_SELECT} WHERE b.id = $1");
        Ok(sqlx::query_as::<_, CatalogEntry>(&query)
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?)
    }
}
