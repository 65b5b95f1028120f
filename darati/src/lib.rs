//! # darati: backend for the Darati audiobook platform
//!
//! `darati` serves the audiobook catalog, accepts audiobook, chapter and banner uploads, and
//! hands out time-limited signed URLs for the media stored in Azure Blob Storage.
//!
//! ## Architecture
//!
//! - **[`api`]**: Axum handlers and request/response models
//! - **[`db`]**: PostgreSQL repositories (SQLx) and record types
//! - **[`storage`]**: blob path normalization, SAS signing and uploads
//! - **[`auth`]**: password hashing
//! - **[`config`]**: YAML + environment configuration via figment
//!
//! Media references are stored either as canonical blob paths (`audiobooks/audio_…`) or, for
//! rows imported from the previous backend, as full storage URLs. Every response that points at
//! media resolves the stored reference and signs it on the way out; see [`storage::AssetUrls`].
//!
//! ## Getting Started
//!
//! ```no_run
//! use darati::{Application, Config};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = Config::default();
//! let app = Application::new(config).await?;
//! app.serve(async { tokio::signal::ctrl_c().await.unwrap_or_default() }).await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
mod openapi;
pub mod storage;
pub mod telemetry;
pub mod types;

#[cfg(test)]
pub mod test_utils;

use crate::{
    api::{
        handlers::{auth as auth_handlers, banners, books, categories, health, uploads},
        models::auth::Role,
    },
    auth::password::{self, Argon2Params},
    config::{CorsOrigin, PoolSettings},
    db::{
        handlers::{Categories, Repository, Users},
        models::users::UserCreateDBRequest,
    },
    openapi::ApiDoc,
    storage::{AssetUrls, AzureBlobStore, BlobStore, StorageAccount},
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{self, HeaderValue},
    routing::{get, post},
};
use axum_prometheus::PrometheusMetricLayer;
use bon::Builder;
pub use config::Config;
use sqlx::{PgPool, postgres::PgPoolOptions};
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub use types::{AudiobookId, BannerId, CategoryId, ChapterId, UserId};

/// Application state shared across all request handlers.
///
/// - `db`: PostgreSQL connection pool
/// - `config`: application configuration
/// - `assets`: resolver and signer for media URLs
/// - `blobs`: upload backend
#[derive(Clone, Builder)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
    pub assets: AssetUrls,
    pub blobs: Arc<dyn BlobStore>,
}

/// Get the darati database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Create the initial admin user if it doesn't exist.
///
/// Idempotent: an existing user with this email is promoted to admin and, when a password is
/// given, has it reset. Returns the user's id.
#[instrument(skip_all)]
pub async fn create_initial_admin_user(email: &str, password: &str, config: &Config, db: &PgPool) -> anyhow::Result<UserId> {
    let password_hash = password::hash_string_with_params(password, Some(Argon2Params::from(&config.auth.password)))
        .map_err(|e| anyhow::anyhow!("Failed to hash admin password: {e}"))?;

    let mut tx = db.begin().await?;
    let mut user_repo = Users::new(&mut tx);

    if let Some(existing_user) = user_repo.get_user_by_email(email).await? {
        sqlx::query("UPDATE users SET password_hash = $1, role = $2, updated_at = NOW() WHERE id = $3")
            .bind(&password_hash)
            .bind(Role::Admin.as_str())
            .bind(existing_user.id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        debug!(user_id = existing_user.id, "Initial admin user already exists");
        return Ok(existing_user.id);
    }

    let created_user = user_repo
        .create(&UserCreateDBRequest {
            email: email.to_string(),
            full_name: "Administrator".to_string(),
            password_hash,
            phone_number: None,
            role: Role::Admin,
        })
        .await?;

    tx.commit().await?;
    info!(user_id = created_user.id, "Created initial admin user");
    Ok(created_user.id)
}

/// Insert the configured categories that don't exist yet.
#[instrument(skip_all)]
pub async fn seed_categories(names: &[String], db: &PgPool) -> anyhow::Result<()> {
    let mut tx = db.begin().await?;
    let mut categories = Categories::new(&mut tx);
    for name in names.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
        categories.ensure_exists(name).await?;
    }
    tx.commit().await?;
    debug!(count = names.len(), "Seeded categories");
    Ok(())
}

fn pool_options(settings: &PoolSettings) -> PgPoolOptions {
    let seconds = |secs: u64| (secs > 0).then(|| Duration::from_secs(secs));
    PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs))
        .idle_timeout(seconds(settings.idle_timeout_secs))
        .max_lifetime(seconds(settings.max_lifetime_secs))
}

/// Connect (unless a pool is supplied), run migrations, and create startup data
async fn setup_database(config: &Config, pool: Option<PgPool>) -> anyhow::Result<PgPool> {
    let pool = match pool {
        Some(pool) => pool,
        None => {
            info!("Connecting to database");
            pool_options(&config.database.pool).connect(&config.database.url).await?
        }
    };
    migrator().run(&pool).await?;

    if let (Some(email), Some(password)) = (config.admin_email.as_deref(), config.admin_password.as_deref()) {
        create_initial_admin_user(email, password, config, &pool)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to create initial admin user: {e}"))?;
    }
    seed_categories(&config.seed_categories, &pool).await?;

    Ok(pool)
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let cors_config = &config.auth.cors;
    let allow_origin = if cors_config.allowed_origins.contains(&CorsOrigin::Wildcard) {
        AllowOrigin::any()
    } else {
        let mut origins = Vec::new();
        for origin in &cors_config.allowed_origins {
            if let CorsOrigin::Url(url) = origin {
                // Browsers send the bare origin, without path or trailing slash
                origins.push(url.origin().ascii_serialization().parse::<HeaderValue>()?);
            }
        }
        AllowOrigin::list(origins)
    };

    let mut cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(cors_config.allow_credentials)
        .expose_headers(vec![http::header::LOCATION]);

    if let Some(max_age) = cors_config.max_age {
        cors = cors.max_age(Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the application router with all endpoints and middleware.
///
/// Upload routes get their own body limit from `limits.max_upload_size`; everything else keeps
/// axum's default. Prometheus metrics are mounted at `/internal/metrics` when enabled.
#[instrument(skip_all)]
pub fn build_router(state: &AppState) -> anyhow::Result<Router> {
    let upload_routes = Router::new()
        .route("/api/audio/upload", post(uploads::upload_audio))
        .route("/api/banners/upload", post(banners::upload_banner))
        .layer(DefaultBodyLimit::max(state.config.limits.max_upload_size));

    let api_routes = Router::new()
        .route("/api/auth/signup", post(auth_handlers::signup))
        .route("/api/auth/login", post(auth_handlers::login))
        .route("/api/audio/user_books", get(books::list_all_records))
        .route("/api/user_books", get(books::user_books))
        .route("/api/categories", get(categories::list_categories))
        .route("/api/banners/list", get(banners::list_banners))
        .route("/api/books/all", get(books::list_books))
        .route("/api/books/{book_id}", get(books::get_book))
        .route("/api/books/{book_id}/chapters", get(books::list_chapters));

    let router = Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health))
        .route("/healthz", get(health::healthz))
        .merge(api_routes)
        .merge(upload_routes)
        .with_state(state.clone())
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()));

    let mut router = router.layer(create_cors_layer(&state.config)?);

    if state.config.enable_metrics {
        let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();
        router = router
            .route("/internal/metrics", get(|| async move { metric_handle.render() }))
            .layer(prometheus_layer);
    }

    let router = router.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    for (path, _) in ApiDoc::openapi().paths.paths {
        info!(%path, "Registered route");
    }

    Ok(router)
}

/// The assembled service: database pool, router and configuration.
pub struct Application {
    router: Router,
    config: Config,
    pool: PgPool,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        Self::new_with_pool(config, None).await
    }

    /// Create an application on an existing pool, uploading to Azure
    pub async fn new_with_pool(config: Config, pool: Option<PgPool>) -> anyhow::Result<Self> {
        let account = Arc::new(StorageAccount::from_config(&config.storage)?);
        let assets = AssetUrls::new(account, &config.storage)?;
        let blobs = AzureBlobStore::new(assets.signer(), config.storage.sas.upload_validity, config.storage.request_timeout)?;
        Self::with_blob_store(config, pool, assets, Arc::new(blobs)).await
    }

    /// Create an application with a caller supplied upload backend
    pub async fn with_blob_store(config: Config, pool: Option<PgPool>, assets: AssetUrls, blobs: Arc<dyn BlobStore>) -> anyhow::Result<Self> {
        debug!("Starting darati with configuration: {:#?}", config);
        info!(
            account = assets.signer().account().name(),
            container = assets.resolver().container(),
            "Blob storage configured"
        );

        let pool = setup_database(&config, pool).await?;

        let app_state = AppState::builder()
            .db(pool.clone())
            .config(config.clone())
            .assets(assets)
            .blobs(blobs)
            .build();
        let router = build_router(&app_state)?;

        Ok(Self { router, config, pool })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router.into_make_service()).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!("Darati API listening on http://{}, docs at http://localhost:{}/docs", bind_addr, self.config.port);

        axum::serve(listener, self.router).with_graceful_shutdown(shutdown).await?;

        info!("Closing database connections...");
        self.pool.close().await;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_app, create_test_app_with_config, create_test_config};
    use axum::http::StatusCode;
    use serde_json::json;

    #[sqlx::test]
    #[test_log::test]
    async fn test_service_endpoints(pool: PgPool) {
        let server = create_test_app(pool).await;

        server.get("/").await.assert_json(&json!({ "message": "Welcome to the Darati API" }));
        server.get("/health").await.assert_json(&json!({ "status": "healthy" }));
        server.get("/healthz").await.assert_text("OK");
        server.get("/docs").await.assert_status_ok();
        server.get("/internal/metrics").await.assert_status(StatusCode::NOT_FOUND);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_startup_seeds_admin_and_categories(pool: PgPool) {
        let mut config = create_test_config();
        config.admin_email = Some("admin@darati.test".to_string());
        config.admin_password = Some("admin-password".to_string());
        config.seed_categories = vec!["Fiction".to_string(), "History".to_string(), "Fiction".to_string()];

        let server = create_test_app_with_config(pool.clone(), config.clone()).await;
        let categories: serde_json::Value = server.get("/api/categories").await.json();
        assert_eq!(categories.as_array().unwrap().len(), 2);

        let response = server
            .post("/api/auth/login")
            .json(&json!({ "email": "admin@darati.test", "password": "admin-password" }))
            .await;
        response.assert_status_ok();

        // Running startup again must not duplicate anything
        let first_id = create_initial_admin_user("admin@darati.test", "admin-password", &config, &pool)
            .await
            .unwrap();
        let mut conn = pool.acquire().await.unwrap();
        let admin = Users::new(&mut conn).get_user_by_email("admin@darati.test").await.unwrap().unwrap();
        assert_eq!(admin.id, first_id);
        assert!(admin.is_admin());
    }

    #[test]
    fn test_cors_layer_from_config() {
        let mut config = create_test_config();
        assert!(create_cors_layer(&config).is_ok());

        config.auth.cors.allowed_origins = vec![CorsOrigin::Url("https://app.darati.example/".parse().unwrap())];
        config.auth.cors.allow_credentials = true;
        assert!(create_cors_layer(&config).is_ok());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_cors_preflight(pool: PgPool) {
        let mut config = create_test_config();
        config.auth.cors.allowed_origins = vec![CorsOrigin::Url("https://app.darati.example".parse().unwrap())];
        let server = create_test_app_with_config(pool, config).await;

        let response = server
            .method(http::Method::OPTIONS, "/api/books/all")
            .add_header("origin", "https://app.darati.example")
            .add_header("access-control-request-method", "GET")
            .await;
        assert_eq!(
            response.header("access-control-allow-origin").to_str().unwrap(),
            "https://app.darati.example"
        );
    }
}
