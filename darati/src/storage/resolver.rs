//! Normalization of stored asset references into canonical blob paths.

use super::AssetKind;
use serde::Serialize;
use std::fmt;

/// Marker substrings for the heuristic classification, checked in order.
///
/// Thumbnail markers come first so that `thumbnails/audio_x.png` is treated as a thumbnail.
const CLASSIFIERS: &[(&str, AssetKind)] = &[
    ("thumb_", AssetKind::Thumbnail),
    ("thumbnails", AssetKind::Thumbnail),
    ("audio_", AssetKind::Audio),
    ("banner", AssetKind::Banner),
];

/// A blob path relative to the container root, using `/` separators.
///
/// Only produced by [`BlobPathResolver`] or [`AssetKind::upload_path`], so it never contains a
/// scheme, host, container name or query string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct CanonicalBlobPath(String);

impl CanonicalBlobPath {
    pub(super) fn new_unchecked(path: String) -> Self {
        Self(path)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CanonicalBlobPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CanonicalBlobPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Turns whatever was stored for an asset into a [`CanonicalBlobPath`].
///
/// Accepted inputs are canonical paths (`audiobooks/audio_1.mp3`), bare legacy filenames
/// (`thumb_42.png`), Windows style paths (`audiobooks\audio_1.mp3`) and full storage URLs for
/// this account, with or without a SAS query. Resolution is pure and idempotent:
/// `resolve(resolve(x)) == resolve(x)`.
#[derive(Debug, Clone)]
pub struct BlobPathResolver {
    container: String,
    host_marker: String,
}

impl BlobPathResolver {
    /// `host_marker` is the substring identifying a storage host, e.g. `blob.core.windows.net`
    /// or the `host:port` of a custom blob endpoint.
    pub fn new(container: impl Into<String>, host_marker: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            host_marker: host_marker.into(),
        }
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    /// Resolve using the substring heuristics to pick the prefix.
    ///
    /// Returns `None` for a missing reference or one that normalizes to nothing.
    pub fn resolve(&self, raw: Option<&str>) -> Option<CanonicalBlobPath> {
        self.resolve_as(raw, None)
    }

    /// Resolve a reference whose kind is known from where it was stored.
    ///
    /// With a kind, the kind's prefix is applied regardless of the filename. Without one this is
    /// [`resolve`](Self::resolve).
    pub fn resolve_as(&self, raw: Option<&str>, kind: Option<AssetKind>) -> Option<CanonicalBlobPath> {
        let mut relative = raw?.trim().to_string();

        // A percent-decoded blob name can itself be a storage URL; each pass strictly shortens it
        while let Some(path) = self.storage_url_path(&relative) {
            relative = self.blob_name_from_url_path(path);
        }

        let relative = without_query(&relative).replace('\\', "/");
        let relative = relative
            .trim_start_matches(|c: char| c == '/' || c.is_whitespace())
            .trim_end();
        if relative.is_empty() {
            return None;
        }

        let kind = kind.or_else(|| classify(relative));
        let path = match kind {
            Some(kind) if !relative.starts_with(kind.prefix()) => format!("{}{}", kind.prefix(), relative),
            _ => relative.to_string(),
        };
        Some(CanonicalBlobPath(path))
    }

    /// If `raw` mentions a storage host anywhere, the path following that host.
    ///
    /// Legacy rows hold URLs with and without a scheme, so only the marker is looked for.
    fn storage_url_path<'a>(&self, raw: &'a str) -> Option<&'a str> {
        if self.host_marker.is_empty() {
            return None;
        }
        let start = raw
            .to_ascii_lowercase()
            .find(&self.host_marker.to_ascii_lowercase())?;
        let after_marker = raw.get(start + self.host_marker.len()..)?;
        // Rest of the authority (port, trailing domain labels) runs up to the first slash
        Some(after_marker.split_once('/').map_or("", |(_, path)| path))
    }

    /// Blob name from the path part of a storage URL.
    ///
    /// Everything after the first `<container>/` segment is the blob name. URLs for a different
    /// container fall back to the last path segment.
    fn blob_name_from_url_path(&self, path: &str) -> String {
        let path = path.split(['?', '#']).next().unwrap_or_default();

        let mut offset = 0;
        let mut blob_name = None;
        for segment in path.split('/') {
            if segment == self.container {
                blob_name = Some(&path[(offset + segment.len() + 1).min(path.len())..]);
                break;
            }
            offset += segment.len() + 1;
        }
        let blob_name = blob_name.unwrap_or_else(|| path.rsplit('/').next().unwrap_or_default());

        match urlencoding::decode(blob_name) {
            Ok(decoded) => decoded.into_owned(),
            Err(_) => blob_name.to_string(),
        }
    }
}

/// Drop a query string, including one that only appeared after percent-decoding.
fn without_query(path: &str) -> &str {
    path.split_once('?').map_or(path, |(path, _)| path)
}

fn classify(path: &str) -> Option<AssetKind> {
    CLASSIFIERS
        .iter()
        .find(|(marker, _)| path.contains(marker))
        .map(|&(_, kind)| kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> BlobPathResolver {
        BlobPathResolver::new("mycontainer", "blob.example.net")
    }

    fn resolve(raw: &str) -> Option<String> {
        resolver().resolve(Some(raw)).map(CanonicalBlobPath::into_string)
    }

    #[test]
    fn test_full_url_with_stale_query() {
        assert_eq!(
            resolve("https://acct.blob.example.net/mycontainer/audiobooks/audio_123.mp3?sig=old"),
            Some("audiobooks/audio_123.mp3".to_string())
        );
    }

    #[test]
    fn test_url_without_prefix_gets_classified() {
        assert_eq!(
            resolve("https://acct.blob.example.net/mycontainer/audio_9.mp3?se=2020-01-01&sig=abc#frag"),
            Some("audiobooks/audio_9.mp3".to_string())
        );
    }

    #[test]
    fn test_url_for_other_container_uses_last_segment() {
        assert_eq!(
            resolve("https://acct.blob.example.net/othercontainer/stuff/thumb_5.png"),
            Some("audiobooks/thumb_5.png".to_string())
        );
    }

    #[test]
    fn test_url_is_percent_decoded() {
        assert_eq!(
            resolve("https://acct.blob.example.net/mycontainer/audiobooks/audio_1_my%20book.mp3"),
            Some("audiobooks/audio_1_my book.mp3".to_string())
        );
    }

    #[test]
    fn test_container_must_match_whole_segment() {
        // "mycontainerx" is not the container, so only the last segment survives
        assert_eq!(
            resolve("https://acct.blob.example.net/mycontainerx/banners/banner_1.jpg"),
            Some("banners/banner_1.jpg".to_string())
        );
    }

    #[test]
    fn test_scheme_is_case_insensitive() {
        assert_eq!(
            resolve("HTTPS://acct.BLOB.example.net/mycontainer/banners/banner_2.jpg"),
            Some("banners/banner_2.jpg".to_string())
        );
    }

    #[test]
    fn test_foreign_urls_are_not_rewritten_as_storage_urls() {
        // Not a storage host: treated as an opaque relative reference and left unclassified
        assert_eq!(
            resolve("https://cdn.example.org/covers/cover.png"),
            Some("https://cdn.example.org/covers/cover.png".to_string())
        );
    }

    #[test]
    fn test_url_without_scheme() {
        assert_eq!(
            resolve("acct.blob.example.net/mycontainer/audiobooks/audio_1.mp3?sig=old"),
            Some("audiobooks/audio_1.mp3".to_string())
        );
        assert_eq!(
            resolve("//acct.blob.example.net/mycontainer/banners/banner_4.jpg"),
            Some("banners/banner_4.jpg".to_string())
        );
    }

    #[test]
    fn test_decoded_url_is_resolved_again() {
        assert_eq!(
            resolve(
                "https://acct.blob.example.net/mycontainer/https%3A%2F%2Facct.blob.example.net%2Fmycontainer%2Fmisc%2Fa.txt"
            ),
            Some("misc/a.txt".to_string())
        );
    }

    #[test]
    fn test_encoded_query_is_dropped() {
        assert_eq!(
            resolve("https://acct.blob.example.net/mycontainer/audiobooks/audio_1.mp3%3Fsig%3Dx"),
            Some("audiobooks/audio_1.mp3".to_string())
        );
        assert_eq!(resolve("banners/banner_1.jpg?sig=x"), Some("banners/banner_1.jpg".to_string()));
    }

    #[test]
    fn test_url_without_container_with_query_and_backslashes() {
        assert_eq!(
            resolve("https://acct.blob.example.net/archive/thumb_5.png?sig=x"),
            Some("audiobooks/thumb_5.png".to_string())
        );
        assert_eq!(
            resolve("https://acct.blob.example.net/archive/old\\thumb_6.png?se=1&sig=x"),
            Some("audiobooks/old/thumb_6.png".to_string())
        );
    }

    #[test]
    fn test_bare_filenames() {
        assert_eq!(resolve("thumb_42.png"), Some("audiobooks/thumb_42.png".to_string()));
        assert_eq!(resolve("audio_1.mp3"), Some("audiobooks/audio_1.mp3".to_string()));
        assert_eq!(resolve("banner_3.jpg"), Some("banners/banner_3.jpg".to_string()));
    }

    #[test]
    fn test_thumbnail_wins_over_audio_marker() {
        assert_eq!(
            resolve("thumbnails/audio_cover.png"),
            Some("audiobooks/thumbnails/audio_cover.png".to_string())
        );
    }

    #[test]
    fn test_already_prefixed_paths_are_unchanged() {
        assert_eq!(resolve("banners/x.jpg"), Some("banners/x.jpg".to_string()));
        assert_eq!(resolve("audiobooks/audio_1.mp3"), Some("audiobooks/audio_1.mp3".to_string()));
        assert_eq!(resolve("audiobooks/thumb_1.png"), Some("audiobooks/thumb_1.png".to_string()));
    }

    #[test]
    fn test_unclassified_paths_pass_through() {
        assert_eq!(resolve("misc/readme.txt"), Some("misc/readme.txt".to_string()));
    }

    #[test]
    fn test_backslashes_are_normalized() {
        assert_eq!(resolve("audiobooks\\audio_1.mp3"), Some("audiobooks/audio_1.mp3".to_string()));
        assert_eq!(resolve("\\thumb_1.png"), Some("audiobooks/thumb_1.png".to_string()));
    }

    #[test]
    fn test_empty_inputs() {
        assert_eq!(resolver().resolve(None), None);
        assert_eq!(resolve(""), None);
        assert_eq!(resolve("   "), None);
        assert_eq!(resolve("/"), None);
        assert_eq!(resolve("https://acct.blob.example.net/mycontainer/"), None);
        assert_eq!(resolve("https://acct.blob.example.net/mycontainer/?sig=x"), None);
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let inputs = [
            "https://acct.blob.example.net/mycontainer/audiobooks/audio_123.mp3?sig=old",
            "https://acct.blob.example.net/mycontainer/thumbnails/x.png",
            "https://acct.blob.example.net/other/banner_7.jpg",
            "thumb_42.png",
            "audio_1.mp3",
            "banners/x.jpg",
            "thumbnails\\audio_cover.png",
            "misc/readme.txt",
            "acct.blob.example.net/mycontainer/audiobooks/audio_1.mp3?sig=old",
            "https://acct.blob.example.net/mycontainer/https%3A%2F%2Facct.blob.example.net%2Fmycontainer%2Fmisc%2Fa.txt",
            "https://acct.blob.example.net/mycontainer/audiobooks/audio_1.mp3%3Fsig%3Dx",
            "https://acct.blob.example.net/archive/old\\thumb_6.png?se=1&sig=x",
            "https://acct.blob.example.net/mycontainer/misc/trailing%20",
            "misc/readme.txt?v=2",
        ];
        for input in inputs {
            let once = resolver().resolve(Some(input)).unwrap();
            let twice = resolver().resolve(Some(once.as_str())).unwrap();
            assert_eq!(once, twice, "not idempotent for {input}");
        }
    }

    #[test]
    fn test_known_kind_forces_prefix() {
        let r = resolver();
        assert_eq!(
            r.resolve_as(Some("cover.png"), Some(AssetKind::Thumbnail)).unwrap().as_str(),
            "audiobooks/cover.png"
        );
        assert_eq!(
            r.resolve_as(Some("hero.jpg"), Some(AssetKind::Banner)).unwrap().as_str(),
            "banners/hero.jpg"
        );
        // A misleading marker does not override the known kind
        assert_eq!(
            r.resolve_as(Some("banner_intro.mp3"), Some(AssetKind::Audio)).unwrap().as_str(),
            "audiobooks/banner_intro.mp3"
        );
        assert_eq!(
            r.resolve_as(Some("audiobooks/audio_1.mp3"), Some(AssetKind::Audio)).unwrap().as_str(),
            "audiobooks/audio_1.mp3"
        );
    }

    #[test]
    fn test_custom_endpoint_marker() {
        let r = BlobPathResolver::new("media", "127.0.0.1:10000");
        assert_eq!(
            r.resolve(Some("http://127.0.0.1:10000/devstoreaccount1/media/banners/banner_1.jpg"))
                .unwrap()
                .as_str(),
            "banners/banner_1.jpg"
        );
    }
}
