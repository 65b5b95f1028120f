//! Blob storage: path resolution, SAS signing and uploads.
//!
//! Media assets (chapter audio, chapter thumbnails, banner images) live in a single Azure Blob
//! Storage container. The database stores a reference to each asset, which is either a
//! canonical blob path (rows written by this service) or a full storage URL, possibly carrying a
//! stale SAS query (rows imported from the legacy backend).
//!
//! Serving an asset is a two step process:
//!
//! 1. [`BlobPathResolver`] normalizes the stored reference to a [`CanonicalBlobPath`] under one of
//!    the logical prefixes (`audiobooks/`, `banners/`).
//! 2. [`SasSigner`] turns that path into a [`SignedAccessUrl`]: a read-only, time-limited URL
//!    that the client fetches directly from Azure.
//!
//! [`AssetUrls`] bundles both steps and applies the per-asset failure policy: a signing failure
//! is logged and turned into "no URL for this asset", never into a failed request.
//!
//! Uploads go through the [`BlobStore`] trait. [`AzureBlobStore`] performs a `PUT` against a
//! short-lived write SAS minted by the same signer.

mod account;
mod blob_store;
mod errors;
mod resolver;
mod sas;

pub use account::{ConnectionString, StorageAccount};
pub use blob_store::{AzureBlobStore, BlobStore};
pub use errors::{SigningError, StorageError};
pub use resolver::{BlobPathResolver, CanonicalBlobPath};
pub use sas::{SAS_VERSION, SasPermissions, SasSigner, SignedAccessUrl};

use crate::config::StorageConfig;
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration};

/// What a stored asset is. Decides which logical prefix its blob lives under.
///
/// Thumbnails are colocated with audio files under `audiobooks/`; there is no separate
/// thumbnail prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Audio,
    Thumbnail,
    Banner,
}

impl AssetKind {
    /// Logical prefix (including the trailing slash) for blobs of this kind
    pub fn prefix(self) -> &'static str {
        match self {
            AssetKind::Audio | AssetKind::Thumbnail => "audiobooks/",
            AssetKind::Banner => "banners/",
        }
    }

    /// Filename marker used when naming uploaded blobs
    fn marker(self) -> &'static str {
        match self {
            AssetKind::Audio => "audio_",
            AssetKind::Thumbnail => "thumb_",
            AssetKind::Banner => "banner_",
        }
    }

    /// Blob path for a freshly uploaded file.
    ///
    /// The name embeds the kind marker so that the substring classification in
    /// [`BlobPathResolver::resolve`] agrees with the kind, e.g.
    /// `audiobooks/audio_1718000000000_intro.mp3`. Any directory part of the client supplied
    /// file name is dropped.
    pub fn upload_path(self, timestamp_ms: i64, file_name: &str) -> CanonicalBlobPath {
        let base = file_name.rsplit(['/', '\\']).next().unwrap_or_default().trim();
        let base = if base.is_empty() { "upload" } else { base };
        CanonicalBlobPath::new_unchecked(format!("{}{}{}_{}", self.prefix(), self.marker(), timestamp_ms, base))
    }
}

/// A blob reference read from a column whose asset kind is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoredAsset<'a> {
    pub reference: &'a str,
    pub kind: AssetKind,
}

impl<'a> StoredAsset<'a> {
    pub fn new(reference: &'a str, kind: AssetKind) -> Self {
        Self { reference, kind }
    }
}

/// Resolver and signer bundled with the configured validity window.
///
/// Cheap to clone; shared through `AppState`.
#[derive(Debug, Clone)]
pub struct AssetUrls {
    resolver: BlobPathResolver,
    signer: Arc<SasSigner>,
    validity: Duration,
}

impl AssetUrls {
    pub fn new(account: Arc<StorageAccount>, config: &StorageConfig) -> Result<Self, SigningError> {
        let permissions = SasPermissions::parse(&config.sas.permissions)?;
        Ok(Self {
            resolver: account.resolver(),
            signer: Arc::new(SasSigner::new(account, permissions)),
            validity: config.sas.validity,
        })
    }

    pub fn resolver(&self) -> &BlobPathResolver {
        &self.resolver
    }

    pub fn signer(&self) -> Arc<SasSigner> {
        self.signer.clone()
    }

    /// Resolve and sign a stored reference.
    ///
    /// `Ok(None)` means there was nothing to sign (missing or empty reference).
    pub fn sign_reference(&self, raw: Option<&str>, kind: Option<AssetKind>) -> Result<Option<SignedAccessUrl>, SigningError> {
        let Some(path) = self.resolver.resolve_as(raw, kind) else {
            return Ok(None);
        };
        self.signer.sign(&path, self.validity).map(Some)
    }

    /// Sign a column value, using its kind for the prefix.
    pub fn sign_asset(&self, asset: Option<StoredAsset<'_>>) -> Option<String> {
        let asset = asset?;
        self.signed_url(Some(asset.reference), Some(asset.kind))
    }

    /// Resolve and sign a stored reference, swallowing signing failures.
    ///
    /// A failure is logged and yields `None`, so one bad asset never fails the response it is
    /// embedded in.
    pub fn signed_url(&self, raw: Option<&str>, kind: Option<AssetKind>) -> Option<String> {
        match self.sign_reference(raw, kind) {
            Ok(url) => url.map(SignedAccessUrl::into_string),
            Err(e) => {
                tracing::warn!(reference = ?raw, kind = ?kind, error = %e, "Failed to sign asset URL");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SasConfig, StorageConfig};
    use base64::{Engine as _, engine::general_purpose::STANDARD};

    fn asset_urls() -> AssetUrls {
        let config = StorageConfig {
            account_name: "acct".to_string(),
            account_key: STANDARD.encode(b"an-account-key-for-tests"),
            container: "mycontainer".to_string(),
            sas: SasConfig::default(),
            ..Default::default()
        };
        let account = Arc::new(StorageAccount::from_config(&config).unwrap());
        AssetUrls::new(account, &config).unwrap()
    }

    #[test]
    fn test_upload_path_names() {
        assert_eq!(AssetKind::Audio.upload_path(42, "intro.mp3").as_str(), "audiobooks/audio_42_intro.mp3");
        assert_eq!(AssetKind::Thumbnail.upload_path(42, "cover.png").as_str(), "audiobooks/thumb_42_cover.png");
        assert_eq!(AssetKind::Banner.upload_path(42, "hero.webp").as_str(), "banners/banner_42_hero.webp");
    }

    #[test]
    fn test_upload_path_strips_client_directories() {
        assert_eq!(
            AssetKind::Audio.upload_path(7, "C:\\Users\\me\\book.mp3").as_str(),
            "audiobooks/audio_7_book.mp3"
        );
        assert_eq!(AssetKind::Banner.upload_path(7, "../../etc/passwd").as_str(), "banners/banner_7_passwd");
        assert_eq!(AssetKind::Banner.upload_path(7, "dir/").as_str(), "banners/banner_7_upload");
    }

    #[test]
    fn test_upload_paths_resolve_to_themselves() {
        let urls = asset_urls();
        for kind in [AssetKind::Audio, AssetKind::Thumbnail, AssetKind::Banner] {
            let path = kind.upload_path(1718000000000, "file.bin");
            assert_eq!(urls.resolver().resolve(Some(path.as_str())), Some(path.clone()));
            assert_eq!(urls.resolver().resolve_as(Some(path.as_str()), Some(kind)), Some(path));
        }
    }

    #[test]
    fn test_signed_url_for_stored_url() {
        let urls = asset_urls();
        let signed = urls
            .signed_url(
                Some("https://acct.blob.core.windows.net/mycontainer/audiobooks/audio_1.mp3?sig=old"),
                Some(AssetKind::Audio),
            )
            .expect("should sign");

        assert!(signed.starts_with("https://acct.blob.core.windows.net/mycontainer/audiobooks/audio_1.mp3?"));
        assert!(!signed.contains("sig=old"));
        assert!(signed.contains("sp=r"));
    }

    #[test]
    fn test_signed_url_missing_reference() {
        let urls = asset_urls();
        assert_eq!(urls.signed_url(None, Some(AssetKind::Thumbnail)), None);
        assert_eq!(urls.signed_url(Some(""), Some(AssetKind::Thumbnail)), None);
    }

    #[test]
    fn test_sign_asset_forces_kind_prefix() {
        let urls = asset_urls();
        let signed = urls
            .sign_asset(Some(StoredAsset::new("cover.png", AssetKind::Thumbnail)))
            .unwrap();
        assert!(signed.starts_with("https://acct.blob.core.windows.net/mycontainer/audiobooks/cover.png?"));
        assert_eq!(urls.sign_asset(None), None);
    }

    #[test]
    fn test_signing_failure_is_swallowed() {
        let urls = asset_urls();
        let too_long = format!("banners/{}.jpg", "x".repeat(2000));

        assert!(matches!(
            urls.sign_reference(Some(&too_long), Some(AssetKind::Banner)),
            Err(SigningError::InvalidBlobName { .. })
        ));
        assert_eq!(urls.signed_url(Some(&too_long), Some(AssetKind::Banner)), None);
    }
}
