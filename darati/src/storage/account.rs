//! Storage account credentials and endpoint addressing.

use super::{
    errors::{SigningError, StorageError},
    resolver::{BlobPathResolver, CanonicalBlobPath},
};
use crate::config::StorageConfig;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use std::{fmt, str::FromStr};
use url::Url;

/// Maximum length Azure accepts for a blob name
const MAX_BLOB_NAME_LEN: usize = 1024;

/// Parsed Azure storage connection string.
///
/// `DefaultEndpointsProtocol=https;AccountName=acct;AccountKey=...;EndpointSuffix=core.windows.net`.
/// Keys are matched case-insensitively and unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionString {
    pub protocol: Option<String>,
    pub account_name: Option<String>,
    pub account_key: Option<String>,
    pub endpoint_suffix: Option<String>,
    pub blob_endpoint: Option<String>,
}

impl FromStr for ConnectionString {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parsed = ConnectionString::default();
        for pair in s.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            // Account keys end in '=' padding, so only split on the first one
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| StorageError::InvalidConnectionString(format!("segment without '=': {pair}")))?;
            let value = Some(value.trim().to_string());
            match key.trim().to_ascii_lowercase().as_str() {
                "defaultendpointsprotocol" => parsed.protocol = value,
                "accountname" => parsed.account_name = value,
                "accountkey" => parsed.account_key = value,
                "endpointsuffix" => parsed.endpoint_suffix = value,
                "blobendpoint" => parsed.blob_endpoint = value,
                _ => {}
            }
        }
        if parsed.account_name.is_none() && parsed.account_key.is_none() && parsed.blob_endpoint.is_none() {
            return Err(StorageError::InvalidConnectionString(
                "no AccountName, AccountKey or BlobEndpoint found".to_string(),
            ));
        }
        Ok(parsed)
    }
}

/// A storage account with its decoded signing key and blob endpoint.
#[derive(Clone)]
pub struct StorageAccount {
    name: String,
    key: Vec<u8>,
    container: String,
    endpoint: Url,
    host_marker: String,
}

impl fmt::Debug for StorageAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageAccount")
            .field("name", &self.name)
            .field("key", &"<redacted>")
            .field("container", &self.container)
            .field("endpoint", &self.endpoint.as_str())
            .finish()
    }
}

impl StorageAccount {
    pub fn from_config(config: &StorageConfig) -> Result<Self, SigningError> {
        let key = STANDARD
            .decode(config.account_key.trim())
            .map_err(|e| SigningError::InvalidAccountKey(e.to_string()))?;

        let (endpoint, host_marker) = match &config.blob_endpoint {
            Some(endpoint) => {
                let marker = endpoint[url::Position::BeforeHost..url::Position::AfterPort].to_string();
                (endpoint.clone(), marker)
            }
            None => {
                let raw = format!("{}://{}.blob.{}", config.protocol, config.account_name, config.endpoint_suffix);
                let endpoint = Url::parse(&raw).map_err(|e| SigningError::InvalidEndpoint(format!("{raw}: {e}")))?;
                (endpoint, format!("blob.{}", config.endpoint_suffix))
            }
        };
        if endpoint.cannot_be_a_base() {
            return Err(SigningError::InvalidEndpoint(endpoint.to_string()));
        }

        Ok(Self {
            name: config.account_name.clone(),
            key,
            container: config.container.clone(),
            endpoint,
            host_marker,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    pub(super) fn key(&self) -> &[u8] {
        &self.key
    }

    /// Whether the endpoint is plain http (local emulators)
    pub fn is_insecure(&self) -> bool {
        self.endpoint.scheme() == "http"
    }

    /// A resolver recognising URLs for this account's host and container
    pub fn resolver(&self) -> BlobPathResolver {
        BlobPathResolver::new(self.container.clone(), self.host_marker.clone())
    }

    /// Unsigned URL of a blob: `<endpoint>/<container>/<path>`, each segment percent-encoded.
    pub fn blob_url(&self, path: &CanonicalBlobPath) -> Result<Url, SigningError> {
        validate_blob_name(path.as_str())?;

        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| SigningError::InvalidEndpoint(self.endpoint.to_string()))?
            .pop_if_empty()
            .push(&self.container)
            .extend(path.as_str().split('/'));
        Ok(url)
    }
}

pub(super) fn validate_blob_name(name: &str) -> Result<(), SigningError> {
    let reason = if name.chars().count() > MAX_BLOB_NAME_LEN {
        "longer than 1024 characters"
    } else if name.chars().any(char::is_control) {
        "contains control characters"
    } else if name.split('/').any(|segment| segment == "." || segment == "..") {
        // URL parsing collapses these, so the addressed blob would differ from the signed one
        "contains relative path segments"
    } else {
        return Ok(());
    };
    Err(SigningError::InvalidBlobName {
        name: name.chars().take(64).collect(),
        reason,
    })
}
