//! Banner upload and listing.

use crate::{
    AppState,
    api::{
        handlers::uploads::{UploadedFile, multipart_error, parse_id, read_file, read_text, store_file},
        models::{banners::BannerResponse, uploads::BannerUploadResponse},
    },
    db::{
        handlers::{Banners, Repository},
        models::banners::BannerCreateDBRequest,
    },
    errors::{Error, Result},
    storage::AssetKind,
    types::UserId,
};
use axum::{
    Json,
    extract::{Multipart, State},
};

/// Upload a banner image
#[utoipa::path(
    post,
    path = "/api/banners/upload",
    tag = "banners",
    request_body(content_type = "multipart/form-data", description = "Fields: banner (file), user_id"),
    responses(
        (status = 200, description = "Banner stored", body = BannerUploadResponse),
        (status = 400, description = "Missing or invalid fields"),
        (status = 413, description = "Payload too large"),
        (status = 502, description = "Blob storage rejected the upload"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn upload_banner(State(state): State<AppState>, mut multipart: Multipart) -> Result<Json<BannerUploadResponse>> {
    let mut banner: Option<UploadedFile> = None;
    let mut user_id: Option<UserId> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "banner" => banner = Some(read_file(field).await?),
            "user_id" => user_id = parse_id(&name, &read_text(field).await?)?,
            other => tracing::debug!(field = other, "Ignoring unknown multipart field"),
        }
    }

    let banner = banner.filter(|f| !f.data.is_empty()).ok_or_else(|| Error::BadRequest {
        message: "Missing required file: banner".to_string(),
    })?;
    let uploader_id = user_id.ok_or_else(|| Error::BadRequest {
        message: "Missing required field: user_id".to_string(),
    })?;
    tracing::info!(uploader_id, file_name = ?banner.file_name, "Starting banner upload");

    let image_path = store_file(&state, AssetKind::Banner, banner).await?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let record = Banners::new(&mut conn)
        .create(&BannerCreateDBRequest {
            image_path: image_path.into_string(),
            uploader_id,
        })
        .await?;

    Ok(Json(BannerUploadResponse {
        message: "Banner uploaded successfully".to_string(),
        banner_id: record.id,
        banner_url: state.assets.sign_asset(Some(record.image())),
    }))
}

/// List banners, newest first.
///
/// A banner whose image cannot be signed is left out of the list.
#[utoipa::path(
    get,
    path = "/api/banners/list",
    tag = "banners",
    responses(
        (status = 200, description = "Banners with signed image URLs", body = [BannerResponse]),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_banners(State(state): State<AppState>) -> Result<Json<Vec<BannerResponse>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let records = Banners::new(&mut conn).list(&()).await?;

    let mut banners = Vec::with_capacity(records.len());
    for record in records {
        let image = record.image();
        match state.assets.sign_reference(Some(image.reference), Some(image.kind)) {
            Ok(Some(url)) => banners.push(BannerResponse {
                id: record.id,
                image_url: url.into_string(),
                created_at: record.created_at,
            }),
            Ok(None) => tracing::warn!(banner_id = record.id, "Banner has no image path, skipping"),
            Err(e) => tracing::warn!(banner_id = record.id, error = %e, "Failed to sign banner image, skipping"),
        }
    }
    Ok(Json(banners))
}
