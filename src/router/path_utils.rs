use percent_encoding::percent_decode_str;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use super::PrecompressedFile;
use crate::compression::{AcceptedCompression, CompressionType};

/// Resolve a request path (already stripped of its route prefix) to a
/// filesystem path under `root`.
///
/// Returns `Ok(None)` when the path cannot be decoded or would escape the
/// root; the caller treats that as a client error. Only `Normal` components
/// survive, so `..`, `.` and absolute segments never reach the lookup.
pub fn sanitize_path(root: &Path, request_path: &str) -> io::Result<Option<PathBuf>> {
    let canonical_root = fs::canonicalize(root)?;

    let decoded = match percent_decode_str(request_path).decode_utf8() {
        Ok(decoded) => decoded,
        Err(e) => {
            log::warn!("Failed to decode path {}: {}", request_path, e);
            return Ok(None);
        }
    };

    let cleaned: PathBuf = PathBuf::from(decoded.as_ref())
        .components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .collect();
    log::trace!("Cleaned path components: {}", cleaned.display());

    let candidate = canonical_root.join(&cleaned);

    match fs::canonicalize(&candidate) {
        Ok(resolved) => {
            if resolved.starts_with(&canonical_root) {
                Ok(Some(resolved))
            } else {
                log::warn!("Path escapes static root: {}", resolved.display());
                Ok(None)
            }
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            // Missing files still route (to the fallback document), as long
            // as the non-canonicalized path stays under the root
            if candidate.starts_with(&canonical_root) {
                Ok(Some(candidate))
            } else {
                log::warn!("Non-existent path would escape static root");
                Ok(None)
            }
        }
        Err(e) => {
            log::error!("Failed to canonicalize {}: {}", candidate.display(), e);
            Err(e)
        }
    }
}

/// Look for a pre-compressed sibling (`<file>.zst` / `<file>.gz`) matching an
/// encoding the client accepts. Serving these needs no encoder work and obeys
/// no-transform semantics, since nothing is transformed.
pub fn find_precompressed(path: &Path, accepted: AcceptedCompression) -> Option<PrecompressedFile> {
    let mut candidates = Vec::new();
    if accepted.supports_zstd {
        candidates.push((CompressionType::Zstd, "zst"));
    }
    if accepted.supports_gzip {
        candidates.push((CompressionType::Gzip, "gz"));
    }

    for (compression, extension) in candidates {
        let sibling = PathBuf::from(format!("{}.{}", path.display(), extension));
        if sibling.is_file() {
            log::debug!(
                "Found pre-compressed variant {} ({:?})",
                sibling.display(),
                compression
            );
            return Some(PrecompressedFile {
                path: sibling,
                compression,
            });
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compression::determine_compression;

    fn fixture_root(tag: &str) -> PathBuf {
        let root = std::env::temp_dir().join(format!(
            "docserve-paths-{}-{}",
            tag,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&root);
        fs::create_dir_all(root.join("sub")).unwrap();
        fs::write(root.join("page.html"), "<html></html>").unwrap();
        fs::write(root.join("sub/data.json"), "{}").unwrap();
        root
    }

    #[test]
    fn plain_lookup_resolves_under_root() {
        let root = fixture_root("plain");
        let resolved = sanitize_path(&root, "sub/data.json").unwrap().unwrap();
        assert!(resolved.ends_with("sub/data.json"));
        assert!(resolved.starts_with(fs::canonicalize(&root).unwrap()));
    }

    #[test]
    fn dotdot_components_are_dropped() {
        let root = fixture_root("dotdot");
        let resolved = sanitize_path(&root, "../../etc/passwd").unwrap().unwrap();
        assert!(resolved.starts_with(fs::canonicalize(&root).unwrap()));
        assert!(resolved.ends_with("etc/passwd"));
    }

    #[test]
    fn percent_encoded_dotdot_is_dropped_too() {
        let root = fixture_root("pct");
        let resolved = sanitize_path(&root, "%2e%2e/page.html").unwrap().unwrap();
        assert!(resolved.ends_with("page.html"));
        assert!(resolved.starts_with(fs::canonicalize(&root).unwrap()));
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        let root = fixture_root("utf8");
        assert!(sanitize_path(&root, "%80").unwrap().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn symlink_escape_is_rejected() {
        let root = fixture_root("symlink");
        let outside = std::env::temp_dir().join(format!(
            "docserve-paths-outside-{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&outside);
        fs::create_dir_all(&outside).unwrap();
        fs::write(outside.join("secret.txt"), "secret").unwrap();
        std::os::unix::fs::symlink(&outside, root.join("escape")).unwrap();

        assert!(sanitize_path(&root, "escape/secret.txt").unwrap().is_none());
    }

    #[test]
    fn precompressed_sibling_is_preferred_by_encoding() {
        let root = fixture_root("precompressed");
        fs::write(root.join("page.html.gz"), b"gzbytes").unwrap();

        let found = find_precompressed(&root.join("page.html"), determine_compression("gzip"))
            .expect("gz sibling should be found");
        assert_eq!(found.compression, CompressionType::Gzip);
        assert!(found.path.ends_with("page.html.gz"));

        // Client that only speaks zstd must not get the gz variant
        assert!(
            find_precompressed(&root.join("page.html"), determine_compression("zstd")).is_none()
        );
    }
}
