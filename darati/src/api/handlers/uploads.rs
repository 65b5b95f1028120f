//! Multipart upload of audiobooks and chapters.
//!
//! Files are pushed to blob storage first and the rows are written afterwards, so a row never
//! points at a blob that was not stored.

use crate::{
    AppState,
    api::models::uploads::AudioUploadResponse,
    db::{
        handlers::{Audiobooks, Chapters, Repository},
        models::{audiobooks::AudiobookCreateDBRequest, chapters::ChapterCreateDBRequest},
    },
    errors::{Error, Result},
    storage::{AssetKind, CanonicalBlobPath},
    types::{AudiobookId, CategoryId, UserId},
};
use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartError},
    http::StatusCode,
};
use bytes::Bytes;
use chrono::Utc;

const OCTET_STREAM: &str = "application/octet-stream";

/// A file part read from a multipart body
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl UploadedFile {
    /// Browsers send an empty, nameless part for an untouched file input
    fn is_empty(&self) -> bool {
        self.data.is_empty() && self.file_name.as_deref().is_none_or(str::is_empty)
    }

    /// Declared content type, or one guessed from the file name
    pub fn effective_content_type(&self) -> String {
        if let Some(content_type) = self.content_type.as_deref().filter(|c| !c.is_empty()) {
            return content_type.to_string();
        }
        self.file_name
            .as_deref()
            .and_then(|name| mime_guess::from_path(name).first_raw())
            .unwrap_or(OCTET_STREAM)
            .to_string()
    }

    /// Name used for the blob: the client's file name, or `upload` plus an extension derived
    /// from the content type.
    pub fn blob_file_name(&self, kind: AssetKind) -> String {
        match self.file_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("upload{}", default_extension(&self.effective_content_type(), kind)),
        }
    }
}

/// Extension for a nameless upload
pub fn default_extension(content_type: &str, kind: AssetKind) -> &'static str {
    match content_type {
        "image/jpeg" => ".jpg",
        "image/png" => ".png",
        "image/webp" => ".webp",
        "audio/mpeg" => ".mp3",
        "audio/wav" => ".wav",
        "audio/ogg" => ".ogg",
        _ => match kind {
            AssetKind::Audio => ".mp3",
            AssetKind::Thumbnail | AssetKind::Banner => ".jpg",
        },
    }
}

pub(crate) fn multipart_error(e: MultipartError) -> Error {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        Error::PayloadTooLarge { message: e.body_text() }
    } else {
        Error::BadRequest {
            message: format!("Failed to parse multipart data: {e}"),
        }
    }
}

pub(crate) async fn read_file(field: axum::extract::multipart::Field<'_>) -> Result<UploadedFile> {
    let file_name = field.file_name().map(str::to_string);
    let content_type = field.content_type().map(str::to_string);
    let data = field.bytes().await.map_err(multipart_error)?;
    Ok(UploadedFile {
        file_name,
        content_type,
        data,
    })
}

pub(crate) async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String> {
    field.text().await.map_err(multipart_error)
}

/// Parse an integer form field. Blank values count as absent.
pub(crate) fn parse_id(name: &str, value: &str) -> Result<Option<i64>> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value.parse::<i64>().map(Some).map_err(|_| Error::BadRequest {
        message: format!("Invalid value for {name}: expected an integer"),
    })
}

/// Push a file to blob storage under a fresh name for its kind
#[tracing::instrument(skip(state, file), fields(size = file.data.len()))]
pub(crate) async fn store_file(state: &AppState, kind: AssetKind, file: UploadedFile) -> Result<CanonicalBlobPath> {
    let path = kind.upload_path(Utc::now().timestamp_millis(), &file.blob_file_name(kind));
    let content_type = file.effective_content_type();
    state.blobs.upload(&path, file.data, &content_type).await?;
    tracing::info!(path = %path, content_type, "Stored upload");
    Ok(path)
}

#[derive(Debug, Default)]
struct AudioUploadForm {
    title: Option<String>,
    author: Option<String>,
    description: Option<String>,
    category_id: Option<CategoryId>,
    audio: Option<UploadedFile>,
    thumbnail: Option<UploadedFile>,
    existing_book_id: Option<AudiobookId>,
    user_id: Option<UserId>,
}

async fn read_audio_form(mut multipart: Multipart) -> Result<AudioUploadForm> {
    let mut form = AudioUploadForm::default();
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "title" => form.title = Some(read_text(field).await?),
            "author" => form.author = Some(read_text(field).await?),
            "description" => form.description = Some(read_text(field).await?),
            "category_id" => form.category_id = parse_id(&name, &read_text(field).await?)?,
            "existing_book_id" => form.existing_book_id = parse_id(&name, &read_text(field).await?)?,
            "user_id" => form.user_id = parse_id(&name, &read_text(field).await?)?,
            "audio" => form.audio = Some(read_file(field).await?),
            "thumbnail" => form.thumbnail = Some(read_file(field).await?).filter(|f| !f.is_empty()),
            other => tracing::debug!(field = other, "Ignoring unknown multipart field"),
        }
    }
    Ok(form)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Upload an audiobook, or a new chapter of an existing one
#[utoipa::path(
    post,
    path = "/api/audio/upload",
    tag = "uploads",
    request_body(
        content_type = "multipart/form-data",
        description = "Fields: title, author, description?, category_id, audio (file), thumbnail? (file), existing_book_id?, user_id?"
    ),
    responses(
        (status = 200, description = "Book created or chapter appended", body = AudioUploadResponse),
        (status = 400, description = "Missing or invalid fields"),
        (status = 404, description = "Audiobook not found"),
        (status = 413, description = "Payload too large"),
        (status = 502, description = "Blob storage rejected the upload"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn upload_audio(State(state): State<AppState>, multipart: Multipart) -> Result<Json<AudioUploadResponse>> {
    let form = read_audio_form(multipart).await?;

    let (Some(title), Some(author), Some(category_id)) = (non_blank(form.title), non_blank(form.author), form.category_id) else {
        return Err(Error::BadRequest {
            message: "Missing required fields: title, author, or category_id".to_string(),
        });
    };
    let audio = form.audio.filter(|f| !f.is_empty()).ok_or_else(|| Error::BadRequest {
        message: "Missing required file: audio".to_string(),
    })?;
    tracing::info!(title, existing_book_id = ?form.existing_book_id, "Starting audio upload");

    // Fail before touching storage when the target book is already known to be missing
    if let Some(book_id) = form.existing_book_id {
        let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
        if Audiobooks::new(&mut conn).get_by_id(book_id).await?.is_none() {
            return Err(audiobook_not_found(book_id));
        }
    }

    let audio_path = store_file(&state, AssetKind::Audio, audio).await?;
    let thumbnail_path = match form.thumbnail {
        Some(thumbnail) => Some(store_file(&state, AssetKind::Thumbnail, thumbnail).await?),
        None => None,
    };

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;

    let response = match form.existing_book_id {
        Some(book_id) => {
            // Holding the row lock keeps concurrent appends from reusing a chapter number
            let book = Audiobooks::new(&mut tx)
                .get_for_update(book_id)
                .await?
                .ok_or_else(|| audiobook_not_found(book_id))?;
            let mut chapters = Chapters::new(&mut tx);
            let order = next_chapter_order(chapters.count_for_book(book.id).await?)?;
            let chapter = chapters
                .create(&ChapterCreateDBRequest {
                    audiobook_id: book.id,
                    title: format!("{} - Chapter {order}", book.title),
                    audio_path: audio_path.into_string(),
                    thumbnail_path: thumbnail_path.map(CanonicalBlobPath::into_string),
                    chapter_order: order,
                })
                .await?;
            tracing::info!(book_id = book.id, chapter_id = chapter.id, order, "Chapter added to existing book");
            AudioUploadResponse::chapter_added(chapter.id)
        }
        None => {
            let book = Audiobooks::new(&mut tx)
                .create(&AudiobookCreateDBRequest {
                    title: title.clone(),
                    author,
                    description: form.description,
                    category_id: Some(category_id),
                    creator_id: form.user_id,
                    is_public: true,
                })
                .await?;
            let chapter = Chapters::new(&mut tx)
                .create(&ChapterCreateDBRequest {
                    audiobook_id: book.id,
                    title: format!("{title} - Chapter 1"),
                    audio_path: audio_path.into_string(),
                    thumbnail_path: thumbnail_path.map(CanonicalBlobPath::into_string),
                    chapter_order: 1,
                })
                .await?;
            tracing::info!(book_id = book.id, chapter_id = chapter.id, "Audiobook created");
            AudioUploadResponse::new_book(book.id, chapter.id)
        }
    };

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;
    Ok(Json(response))
}

fn audiobook_not_found(id: AudiobookId) -> Error {
    Error::NotFound {
        resource: "Audiobook".to_string(),
        id: id.to_string(),
    }
}

fn next_chapter_order(existing: i64) -> Result<i32> {
    i32::try_from(existing + 1).map_err(|_| Error::BadRequest {
        message: "Audiobook has too many chapters".to_string(),
    })
}
