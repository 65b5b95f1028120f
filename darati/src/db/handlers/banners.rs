//! Database repository for banners.

use crate::{
    db::{
        errors::Result,
        handlers::repository::Repository,
        models::banners::{BannerCreateDBRequest, BannerDBResponse},
    },
    types::BannerId,
};
use sqlx::PgConnection;
use tracing::instrument;

pub struct Banners<'c> {
    db: &'c mut PgConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Banners<'c> {
    type CreateRequest = BannerCreateDBRequest;
    type Response = BannerDBResponse;
    type Id = BannerId;
    type Filter = ();

    #[instrument(skip(self, request), fields(uploader_id = request.uploader_id), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        Ok(sqlx::query_as::<_, BannerDBResponse>(
            "INSERT INTO banners (image_path, uploader_id) VALUES ($1, $2) RETURNING *",
        )
        .bind(&request.image_path)
        .bind(request.uploader_id)
        .fetch_one(&mut *self.db)
        .await?)
    }

    #[instrument(skip(self), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        Ok(sqlx::query_as::<_, BannerDBResponse>("SELECT * FROM banners WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?)
    }

    /// All banners, newest first
    #[instrument(skip_all, err)]
    async fn list(&mut self, _filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        Ok(
            sqlx::query_as::<_, BannerDBResponse>("SELECT * FROM banners ORDER BY created_at DESC, id DESC")
                .fetch_all(&mut *self.db)
                .await?,
        )
    }

    #[instrument(skip(self), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM banners WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

impl<'c> Banners<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db::errors::DbError, test_utils::create_test_user};
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_newest_first(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let user = create_test_user(&mut conn, "banners@example.com").await;

        let mut repo = Banners::new(&mut conn);
        let first = repo
            .create(&BannerCreateDBRequest {
                image_path: "banners/banner_1_a.jpg".to_string(),
                uploader_id: user.id,
            })
            .await
            .unwrap();
        let second = repo
            .create(&BannerCreateDBRequest {
                image_path: "banners/banner_2_b.jpg".to_string(),
                uploader_id: user.id,
            })
            .await
            .unwrap();

        let ids: Vec<_> = repo.list(&()).await.unwrap().into_iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);

        assert!(repo.delete(first.id).await.unwrap());
        assert!(repo.get_by_id(first.id).await.unwrap().is_none());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_unknown_uploader_is_rejected(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let err = Banners::new(&mut conn)
            .create(&BannerCreateDBRequest {
                image_path: "banners/banner_1_a.jpg".to_string(),
                uploader_id: 123_456,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }
}
