//! OpenAPI documentation for the public API, served at `/docs`.

use utoipa::OpenApi;

use crate::{api, db};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Darati API",
        description = "Audiobook catalog, uploads and banners. Media URLs in responses are time-limited signed URLs."
    ),
    paths(
        api::handlers::health::root,
        api::handlers::health::health,
        api::handlers::auth::signup,
        api::handlers::auth::login,
        api::handlers::uploads::upload_audio,
        api::handlers::books::list_books,
        api::handlers::books::get_book,
        api::handlers::books::list_chapters,
        api::handlers::books::list_all_records,
        api::handlers::books::user_books,
        api::handlers::categories::list_categories,
        api::handlers::banners::upload_banner,
        api::handlers::banners::list_banners,
    ),
    components(
        schemas(
            api::models::MessageResponse,
            api::models::auth::Role,
            api::models::auth::SignupRequest,
            api::models::auth::LoginRequest,
            api::models::auth::LoginResponse,
            api::models::books::BookSummary,
            api::models::books::CategoryRef,
            api::models::books::ChapterSummary,
            api::models::banners::BannerResponse,
            api::models::uploads::AudioUploadResponse,
            api::models::uploads::BannerUploadResponse,
            db::models::audiobooks::AudiobookDBResponse,
            db::models::categories::CategoryDBResponse,
        )
    ),
    tags(
        (name = "service", description = "Welcome and health endpoints"),
        (name = "authentication", description = "Signup and login"),
        (name = "uploads", description = "Audiobook and chapter uploads"),
        (name = "books", description = "Catalog and book listings"),
        (name = "categories", description = "Book categories"),
        (name = "banners", description = "Promotional banners"),
    )
)]
pub struct ApiDoc;
