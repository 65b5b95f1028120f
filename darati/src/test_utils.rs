//! Test utilities shared by the handler and repository tests.

use crate::{
    Application,
    api::models::auth::Role,
    config::{Config, PasswordConfig, PoolSettings, StorageConfig},
    db::{
        handlers::{Repository, Users},
        models::users::{UserCreateDBRequest, UserDBResponse},
    },
    storage::{AssetUrls, BlobStore, CanonicalBlobPath, StorageAccount, StorageError},
};
use async_trait::async_trait;
use axum_test::TestServer;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use bytes::Bytes;
use sqlx::{PgConnection, PgPool};
use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};

pub const TEST_ACCOUNT: &str = "testaccount";
pub const TEST_CONTAINER: &str = "media";

/// Upload backend that keeps blobs in memory
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<BTreeMap<String, (String, Bytes)>>,
}

impl MemoryBlobStore {
    /// Stored paths in lexical order
    pub fn paths(&self) -> Vec<String> {
        self.blobs.lock().unwrap().keys().cloned().collect()
    }

    pub fn content_type(&self, path: &str) -> Option<String> {
        self.blobs.lock().unwrap().get(path).map(|(content_type, _)| content_type.clone())
    }

    pub fn content(&self, path: &str) -> Option<Bytes> {
        self.blobs.lock().unwrap().get(path).map(|(_, content)| content.clone())
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(&self, path: &CanonicalBlobPath, content: Bytes, content_type: &str) -> Result<(), StorageError> {
        self.blobs
            .lock()
            .unwrap()
            .insert(path.as_str().to_string(), (content_type.to_string(), content));
        Ok(())
    }
}

pub fn create_test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        database: crate::config::DatabaseConfig {
            // Unused: tests hand in the sqlx::test pool
            url: "postgres://localhost/darati_test".to_string(),
            pool: PoolSettings {
                max_connections: 1,
                min_connections: 0,
                ..Default::default()
            },
        },
        storage: StorageConfig {
            account_name: TEST_ACCOUNT.to_string(),
            account_key: STANDARD.encode(b"darati-test-account-key"),
            container: TEST_CONTAINER.to_string(),
            ..Default::default()
        },
        auth: crate::config::AuthConfig {
            password: PasswordConfig {
                // Fast hashing for tests
                argon2_memory_kib: 128,
                argon2_iterations: 1,
                argon2_parallelism: 1,
                ..Default::default()
            },
            ..Default::default()
        },
        // The Prometheus recorder is process-global and can only be installed once
        enable_metrics: false,
        enable_otel_export: false,
        ..Default::default()
    }
}

pub fn create_test_asset_urls(config: &Config) -> AssetUrls {
    let account = Arc::new(StorageAccount::from_config(&config.storage).expect("valid test storage config"));
    AssetUrls::new(account, &config.storage).expect("valid test SAS config")
}

pub async fn create_test_app(pool: PgPool) -> TestServer {
    create_test_app_with_config(pool, create_test_config()).await
}

pub async fn create_test_app_with_config(pool: PgPool, config: Config) -> TestServer {
    create_test_app_with_store(pool, config, Arc::new(MemoryBlobStore::default())).await
}

pub async fn create_test_app_with_store(pool: PgPool, config: Config, store: Arc<MemoryBlobStore>) -> TestServer {
    let assets = create_test_asset_urls(&config);
    let app = Application::with_blob_store(config, Some(pool), assets, store)
        .await
        .expect("Failed to create application");
    app.into_test_server()
}

pub async fn create_test_user(conn: &mut PgConnection, email: &str) -> UserDBResponse {
    Users::new(conn)
        .create(&UserCreateDBRequest {
            email: email.to_string(),
            full_name: "Test User".to_string(),
            password_hash: "not-a-real-hash".to_string(),
            phone_number: None,
            role: Role::Creator,
        })
        .await
        .expect("Failed to create test user")
}
