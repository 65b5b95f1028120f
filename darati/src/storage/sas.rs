//! Azure service SAS signing for individual blobs.
//!
//! The token follows the service SAS format for a blob resource (`sr=b`) at version
//! [`SAS_VERSION`]. The signature is an HMAC-SHA256 over a newline-joined string-to-sign, keyed
//! with the base64-decoded account key, then base64 encoded. Signing is purely local; Azure
//! checks the token when the URL is fetched.

use super::{
    account::StorageAccount,
    errors::SigningError,
    resolver::CanonicalBlobPath,
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{DateTime, SubsecRound, Utc};
use hmac::{Hmac, Mac};
use serde::{Serialize, Serializer};
use sha2::Sha256;
use std::{fmt, sync::Arc, time::Duration};
use url::Url;

type HmacSha256 = Hmac<Sha256>;

/// Storage service version the string-to-sign layout below is written for
pub const SAS_VERSION: &str = "2021-08-06";

/// Permission letters in the order Azure requires them
const PERMISSION_ORDER: &str = "racwdl";

/// Normalized SAS permission string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SasPermissions(String);

impl SasPermissions {
    /// Parse a permission string such as `"r"` or `"wc"`, reordering letters as Azure expects.
    pub fn parse(raw: &str) -> Result<Self, SigningError> {
        let raw = raw.trim();
        if raw.is_empty() || raw.chars().any(|c| !PERMISSION_ORDER.contains(c)) {
            return Err(SigningError::InvalidPermissions(raw.to_string()));
        }
        Ok(Self(PERMISSION_ORDER.chars().filter(|c| raw.contains(*c)).collect()))
    }

    pub fn read() -> Self {
        Self("r".to_string())
    }

    /// Create and write, as needed for a `Put Blob`
    pub fn upload() -> Self {
        Self("cw".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A blob URL carrying a SAS token, valid until `expires_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedAccessUrl {
    url: Url,
    expires_at: DateTime<Utc>,
}

impl SignedAccessUrl {
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn into_string(self) -> String {
        self.url.into()
    }
}

impl fmt::Display for SignedAccessUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}

impl Serialize for SignedAccessUrl {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.url.as_str())
    }
}

/// Mints SAS URLs for blobs in one account's container.
#[derive(Debug)]
pub struct SasSigner {
    account: Arc<StorageAccount>,
    permissions: SasPermissions,
}

impl SasSigner {
    pub fn new(account: Arc<StorageAccount>, permissions: SasPermissions) -> Self {
        Self { account, permissions }
    }

    pub fn account(&self) -> &StorageAccount {
        &self.account
    }

    /// Sign `path` with the configured permissions, valid for `validity` from now.
    pub fn sign(&self, path: &CanonicalBlobPath, validity: Duration) -> Result<SignedAccessUrl, SigningError> {
        self.sign_at(path, validity, Utc::now())
    }

    pub fn sign_at(
        &self,
        path: &CanonicalBlobPath,
        validity: Duration,
        now: DateTime<Utc>,
    ) -> Result<SignedAccessUrl, SigningError> {
        self.sign_with_permissions_at(path, &self.permissions, validity, now)
    }

    /// Sign with explicit permissions, used for upload URLs.
    pub fn sign_with_permissions_at(
        &self,
        path: &CanonicalBlobPath,
        permissions: &SasPermissions,
        validity: Duration,
        now: DateTime<Utc>,
    ) -> Result<SignedAccessUrl, SigningError> {
        let validity = chrono::Duration::from_std(validity)
            .map_err(|e| SigningError::InvalidValidity(e.to_string()))?;
        if validity <= chrono::Duration::zero() {
            return Err(SigningError::InvalidValidity("validity must be positive".to_string()));
        }
        let expires_at = now
            .checked_add_signed(validity)
            .ok_or_else(|| SigningError::InvalidValidity("expiry overflows".to_string()))?
            .trunc_subsecs(0);
        if expires_at <= now.trunc_subsecs(0) {
            return Err(SigningError::InvalidValidity("expiry is not after now".to_string()));
        }

        let mut url = self.account.blob_url(path)?;
        let expiry = expires_at.format("%Y-%m-%dT%H:%M:%SZ").to_string();
        let protocol = if self.account.is_insecure() { "https,http" } else { "https" };
        let resource = format!("/blob/{}/{}/{}", self.account.name(), self.account.container(), path);

        let string_to_sign = [
            permissions.as_str(),
            "", // signed start
            &expiry,
            &resource,
            "", // signed identifier
            "", // signed ip
            protocol,
            SAS_VERSION,
            "b",
            "", // snapshot time
            "", // encryption scope
            "", // rscc
            "", // rscd
            "", // rsce
            "", // rscl
            "", // rsct
        ]
        .join("\n");

        let signature = self.compute_signature(&string_to_sign)?;

        url.query_pairs_mut()
            .clear()
            .append_pair("sp", permissions.as_str())
            .append_pair("se", &expiry)
            .append_pair("spr", protocol)
            .append_pair("sv", SAS_VERSION)
            .append_pair("sr", "b")
            .append_pair("sig", &signature);

        Ok(SignedAccessUrl { url, expires_at })
    }

    fn compute_signature(&self, string_to_sign: &str) -> Result<String, SigningError> {
        let mut mac = HmacSha256::new_from_slice(self.account.key())
            .map_err(|e| SigningError::InvalidAccountKey(e.to_string()))?;
        mac.update(string_to_sign.as_bytes());
        Ok(STANDARD.encode(mac.finalize().into_bytes()))
    }
}
