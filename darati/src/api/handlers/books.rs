//! Catalog and book listing endpoints.

use crate::{
    AppState,
    api::models::books::{BookSummary, ChapterSummary, UserBooksQuery},
    db::{
        handlers::{Audiobooks, Chapters, Repository, audiobooks::AudiobookFilter},
        models::audiobooks::AudiobookDBResponse,
    },
    errors::{Error, Result},
    types::AudiobookId,
};
use axum::{
    Json,
    extract::{Path, Query, State},
};

fn book_not_found(id: AudiobookId) -> Error {
    Error::NotFound {
        resource: "Book".to_string(),
        id: id.to_string(),
    }
}

/// List every book for the catalog, newest first
#[utoipa::path(
    get,
    path = "/api/books/all",
    tag = "books",
    responses(
        (status = 200, description = "All books with signed cover and first chapter URLs", body = [BookSummary]),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_books(State(state): State<AppState>) -> Result<Json<Vec<BookSummary>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let entries = Audiobooks::new(&mut conn).list_catalog().await?;

    let books: Vec<_> = entries
        .into_iter()
        .map(|entry| BookSummary::from_entry(entry, &state.assets))
        .collect();
    tracing::info!(count = books.len(), "Listed catalog");
    Ok(Json(books))
}

/// Get a single book in catalog form
#[utoipa::path(
    get,
    path = "/api/books/{book_id}",
    tag = "books",
    params(("book_id" = i64, Path, description = "Audiobook ID")),
    responses(
        (status = 200, description = "Book details", body = BookSummary),
        (status = 404, description = "Book not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_book(State(state): State<AppState>, Path(book_id): Path<AudiobookId>) -> Result<Json<BookSummary>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let entry = Audiobooks::new(&mut conn)
        .get_catalog_entry(book_id)
        .await?
        .ok_or_else(|| book_not_found(book_id))?;
    Ok(Json(BookSummary::from_entry(entry, &state.assets)))
}

/// List a book's chapters in reading order
#[utoipa::path(
    get,
    path = "/api/books/{book_id}/chapters",
    tag = "books",
    params(("book_id" = i64, Path, description = "Audiobook ID")),
    responses(
        (status = 200, description = "Chapters with signed audio URLs", body = [ChapterSummary]),
        (status = 404, description = "Book not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_chapters(State(state): State<AppState>, Path(book_id): Path<AudiobookId>) -> Result<Json<Vec<ChapterSummary>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    if Audiobooks::new(&mut conn).get_by_id(book_id).await?.is_none() {
        return Err(book_not_found(book_id));
    }

    let chapters = Chapters::new(&mut conn)
        .list_for_book(book_id)
        .await?
        .into_iter()
        .map(|chapter| ChapterSummary::from_record(chapter, &state.assets))
        .collect();
    Ok(Json(chapters))
}

/// Raw records of every audiobook
#[utoipa::path(
    get,
    path = "/api/audio/user_books",
    tag = "books",
    responses(
        (status = 200, description = "All audiobook records", body = [AudiobookDBResponse]),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_all_records(State(state): State<AppState>) -> Result<Json<Vec<AudiobookDBResponse>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let books = Audiobooks::new(&mut conn).list(&AudiobookFilter::default()).await?;
    Ok(Json(books))
}

/// Books visible to a user: every book for admins, otherwise the user's own books.
///
/// Without `user_id` or `is_admin` the list is empty.
#[utoipa::path(
    get,
    path = "/api/user_books",
    tag = "books",
    params(UserBooksQuery),
    responses(
        (status = 200, description = "Audiobook records", body = [AudiobookDBResponse]),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn user_books(State(state): State<AppState>, Query(query): Query<UserBooksQuery>) -> Result<Json<Vec<AudiobookDBResponse>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Audiobooks::new(&mut conn);
    let books = if query.is_admin {
        repo.list(&AudiobookFilter::default()).await?
    } else if let Some(user_id) = query.user_id {
        repo.list_by_creator(user_id).await?
    } else {
        tracing::info!("No user_id provided, returning empty list");
        Vec::new()
    };
    Ok(Json(books))
}

#[cfg(test)]
mod tests {
    use crate::{
        db::{
            handlers::{Audiobooks, Categories, Chapters, Repository},
            models::{audiobooks::AudiobookCreateDBRequest, chapters::ChapterCreateDBRequest},
        },
        test_utils::{TEST_CONTAINER, create_test_app, create_test_user},
        types::{AudiobookId, CategoryId, UserId},
    };
    use axum::http::StatusCode;
    use serde_json::{Value, json};
    use sqlx::{PgConnection, PgPool};

    async fn create_book(conn: &mut PgConnection, title: &str, creator_id: Option<UserId>, category_id: Option<CategoryId>) -> AudiobookId {
        Audiobooks::new(conn)
            .create(&AudiobookCreateDBRequest {
                title: title.to_string(),
                author: "Shaaban Robert".to_string(),
                description: None,
                category_id,
                creator_id,
                is_public: true,
            })
            .await
            .unwrap()
            .id
    }

    async fn add_chapter(conn: &mut PgConnection, book_id: AudiobookId, order: i32, audio: &str, thumbnail: Option<&str>) {
        Chapters::new(conn)
            .create(&ChapterCreateDBRequest {
                audiobook_id: book_id,
                title: format!("Chapter {order}"),
                audio_path: audio.to_string(),
                thumbnail_path: thumbnail.map(str::to_string),
                chapter_order: order,
            })
            .await
            .unwrap();
    }

    fn blob_path(url: &Value) -> String {
        let url = url::Url::parse(url.as_str().unwrap()).unwrap();
        let prefix = format!("/{TEST_CONTAINER}/");
        url.path().strip_prefix(&prefix).unwrap().to_string()
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_catalog_signs_legacy_and_canonical_references(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let category = Categories::new(&mut conn).ensure_exists("Poetry").await.unwrap();
        let book_id = create_book(&mut conn, "Kusadikika", None, Some(category.id)).await;
        // Legacy row: full URL with a stale SAS, thumbnail in the old thumbnails/ directory
        add_chapter(
            &mut conn,
            book_id,
            1,
            "https://testaccount.blob.core.windows.net/media/audiobooks/1700000000.5_audio_intro.mp3?sv=2020-01-01&sig=old",
            Some("thumbnails/1700000000.5_cover.png"),
        )
        .await;
        add_chapter(&mut conn, book_id, 2, "audiobooks/audio_2_next.mp3", None).await;
        let bare_id = create_book(&mut conn, "No chapters", None, None).await;
        drop(conn);

        let server = create_test_app(pool).await;
        let books: Value = server.get("/api/books/all").await.json();
        let books = books.as_array().unwrap();
        assert_eq!(books.len(), 2);

        // Newest first
        assert_eq!(books[0]["id"], bare_id);
        assert_eq!(books[0]["cover_image_url"], Value::Null);
        assert_eq!(books[0]["first_chapter_url"], Value::Null);
        assert_eq!(books[0]["total_chapters"], 0);
        assert_eq!(books[0]["category"], json!({ "id": null, "name": "Uncategorized" }));

        let book = &books[1];
        assert_eq!(book["total_chapters"], 2);
        assert_eq!(book["category"], json!({ "id": category.id, "name": "Poetry" }));
        assert_eq!(blob_path(&book["first_chapter_url"]), "audiobooks/1700000000.5_audio_intro.mp3");
        assert_eq!(blob_path(&book["cover_image_url"]), "audiobooks/thumbnails/1700000000.5_cover.png");
        let first_chapter_url = book["first_chapter_url"].as_str().unwrap();
        assert!(first_chapter_url.contains("sig="));
        assert!(!first_chapter_url.contains("sig=old"));
        assert!(first_chapter_url.contains("sp=r"));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_get_book(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let book_id = create_book(&mut conn, "Adili na Nduguze", None, None).await;
        add_chapter(&mut conn, book_id, 1, "audio_1_start.mp3", Some("thumb_1_cover.jpg")).await;
        drop(conn);

        let server = create_test_app(pool).await;
        let book: Value = server.get(&format!("/api/books/{book_id}")).await.json();
        assert_eq!(book["title"], "Adili na Nduguze");
        assert_eq!(blob_path(&book["first_chapter_url"]), "audiobooks/audio_1_start.mp3");
        assert_eq!(blob_path(&book["cover_image_url"]), "audiobooks/thumb_1_cover.jpg");

        let response = server.get("/api/books/999999").await;
        response.assert_status(StatusCode::NOT_FOUND);
        response.assert_json(&json!({ "detail": "Book not found" }));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_chapters(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let book_id = create_book(&mut conn, "Kusadikika", None, None).await;
        add_chapter(&mut conn, book_id, 2, "audiobooks/audio_2_b.mp3", None).await;
        add_chapter(&mut conn, book_id, 1, "audiobooks/audio_1_a.mp3", None).await;
        drop(conn);

        let server = create_test_app(pool).await;
        let chapters: Value = server.get(&format!("/api/books/{book_id}/chapters")).await.json();
        let chapters = chapters.as_array().unwrap();
        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters[0]["order"], 1);
        assert_eq!(blob_path(&chapters[0]["audio_url"]), "audiobooks/audio_1_a.mp3");
        assert_eq!(chapters[1]["title"], "Chapter 2");

        server
            .get("/api/books/999999/chapters")
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_user_books(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let creator = create_test_user(&mut conn, "creator@example.com").await;
        let other = create_test_user(&mut conn, "other@example.com").await;
        let mine = create_book(&mut conn, "Mine", Some(creator.id), None).await;
        create_book(&mut conn, "Theirs", Some(other.id), None).await;
        drop(conn);

        let server = create_test_app(pool).await;

        let books: Value = server.get("/api/user_books").add_query_param("is_admin", true).await.json();
        assert_eq!(books.as_array().unwrap().len(), 2);

        let books: Value = server
            .get("/api/user_books")
            .add_query_param("user_id", creator.id)
            .await
            .json();
        let books = books.as_array().unwrap();
        assert_eq!(books.len(), 1);
        assert_eq!(books[0]["id"], mine);
        assert_eq!(books[0]["creator_id"], creator.id);

        let books: Value = server.get("/api/user_books").await.json();
        assert_eq!(books, json!([]));

        let all: Value = server.get("/api/audio/user_books").await.json();
        assert_eq!(all.as_array().unwrap().len(), 2);
    }
}
