use thiserror::Error;

/// Failure to produce a signed URL for a single blob.
#[derive(Debug, Error)]
pub enum SigningError {
    /// The account key is not valid base64
    #[error("invalid storage account key: {0}")]
    InvalidAccountKey(String),

    /// Zero validity, or an expiry that cannot be represented
    #[error("invalid SAS validity window: {0}")]
    InvalidValidity(String),

    /// The blob name cannot be addressed by a SAS URL
    #[error("invalid blob name ({reason}): {name}")]
    InvalidBlobName { name: String, reason: &'static str },

    #[error("invalid SAS permissions {0:?}, expected a combination of r, a, c, w, d, l")]
    InvalidPermissions(String),

    /// The configured endpoint cannot carry a blob path
    #[error("invalid blob endpoint: {0}")]
    InvalidEndpoint(String),
}

/// Errors from talking to blob storage.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error(transparent)]
    Signing(#[from] SigningError),

    #[error("invalid storage connection string: {0}")]
    InvalidConnectionString(String),

    #[error("blob storage request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("blob storage rejected upload of {path} with status {status}: {message}")]
    UploadRejected { path: String, status: u16, message: String },
}
