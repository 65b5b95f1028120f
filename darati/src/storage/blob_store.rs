use super::{
    errors::StorageError,
    resolver::CanonicalBlobPath,
    sas::{SAS_VERSION, SasPermissions, SasSigner},
};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use reqwest::header::CONTENT_TYPE;
use std::{sync::Arc, time::Duration};

/// Trait for blob upload backends
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `content` at `path`, overwriting any existing blob
    async fn upload(&self, path: &CanonicalBlobPath, content: Bytes, content_type: &str) -> Result<(), StorageError>;
}

/// Uploads blobs to Azure with a `Put Blob` request authorised by a short-lived write SAS.
pub struct AzureBlobStore {
    client: reqwest::Client,
    signer: Arc<SasSigner>,
    upload_validity: Duration,
}

impl AzureBlobStore {
    pub fn new(signer: Arc<SasSigner>, upload_validity: Duration, timeout: Duration) -> Result<Self, StorageError> {
        // reqwest is built without a default TLS provider; ignore the error if one is installed
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            signer,
            upload_validity,
        })
    }
}

#[async_trait]
impl BlobStore for AzureBlobStore {
    #[tracing::instrument(skip(self, content), fields(path = %path, size = content.len()))]
    async fn upload(&self, path: &CanonicalBlobPath, content: Bytes, content_type: &str) -> Result<(), StorageError> {
        let url = self
            .signer
            .sign_with_permissions_at(path, &SasPermissions::upload(), self.upload_validity, Utc::now())?;

        let response = self
            .client
            .put(url.url().clone())
            .header("x-ms-blob-type", "BlockBlob")
            .header("x-ms-version", SAS_VERSION)
            .header(CONTENT_TYPE, content_type)
            .body(content)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, "Blob upload rejected");
            return Err(StorageError::UploadRejected {
                path: path.to_string(),
                status: status.as_u16(),
                message,
            });
        }

        tracing::debug!("Uploaded blob");
        Ok(())
    }
}
