//! Database repository for categories.

use crate::{
    db::{
        errors::Result,
        handlers::repository::Repository,
        models::categories::{CategoryCreateDBRequest, CategoryDBResponse},
    },
    types::CategoryId,
};
use sqlx::PgConnection;
use tracing::instrument;

pub struct Categories<'c> {
    db: &'c mut PgConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Categories<'c> {
    type CreateRequest = CategoryCreateDBRequest;
    type Response = CategoryDBResponse;
    type Id = CategoryId;
    type Filter = ();

    #[instrument(skip(self, request), fields(name = %request.name), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        Ok(
            sqlx::query_as::<_, CategoryDBResponse>("INSERT INTO categories (name) VALUES ($1) RETURNING id, name")
                .bind(&request.name)
                .fetch_one(&mut *self.db)
                .await?,
        )
    }

    #[instrument(skip(self), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        Ok(
            sqlx::query_as::<_, CategoryDBResponse>("SELECT id, name FROM categories WHERE id = $1")
                .bind(id)
                .fetch_optional(&mut *self.db)
                .await?,
        )
    }

    #[instrument(skip_all, err)]
    async fn list(&mut self, _filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        Ok(
            sqlx::query_as::<_, CategoryDBResponse>("SELECT id, name FROM categories ORDER BY id")
                .fetch_all(&mut *self.db)
                .await?,
        )
    }

    #[instrument(skip(self), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

impl<'c> Categories<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Insert the category if no category has this name, returning the stored row either way.
    #[instrument(skip(self), err)]
    pub async fn ensure_exists(&mut self, name: &str) -> Result<CategoryDBResponse> {
        // The no-op update makes RETURNING yield the existing row on conflict
        Ok(sqlx::query_as::<_, CategoryDBResponse>(
            r#"
            INSERT INTO categories (name) VALUES ($1)
            ON CONFLICT ON CONSTRAINT categories_name_unique DO UPDATE SET name = EXCLUDED.name
            RETURNING id, name
            "#,
        )
        .bind(name)
        .fetch_one(&mut *self.db)
        .await?)
    }
}
