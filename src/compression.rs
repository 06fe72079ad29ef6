use flate2::write::GzEncoder;
use flate2::Compression as GzipCompression;
use std::io::{self, Write};
use zstd::stream::write::Encoder as ZstdEncoder;

use crate::config::CompressionPolicy;
use crate::http::Request;

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum CompressionType {
    Zstd,
    Gzip,
    None,
}

impl CompressionType {
    pub fn encoding_name(self) -> Option<&'static str> {
        match self {
            Self::Zstd => Some("zstd"),
            Self::Gzip => Some("gzip"),
            Self::None => None,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct AcceptedCompression {
    pub supports_zstd: bool,
    pub supports_gzip: bool,
}

impl AcceptedCompression {
    pub fn none() -> Self {
        Self {
            supports_zstd: false,
            supports_gzip: false,
        }
    }
}

/// Parse the Accept-Encoding header. Parameters such as q-values are ignored;
/// zstd is preferred over gzip when both are advertised.
pub fn determine_compression(accept_encoding: &str) -> AcceptedCompression {
    let lowered = accept_encoding.to_lowercase();
    let encodings: Vec<&str> = lowered
        .split(',')
        .filter_map(|token| token.split(';').next())
        .map(str::trim)
        .collect();

    AcceptedCompression {
        supports_zstd: encodings.iter().any(|&e| e == "zstd"),
        supports_gzip: encodings.iter().any(|&e| e == "gzip"),
    }
}

/// Pure per-response decision: content type in the enabled set, body over the
/// threshold, no bypass pattern on the path, and no excluded request
/// condition (Authorization, Cache-Control: no-transform).
pub fn should_compress(
    policy: &CompressionPolicy,
    mime_type: &str,
    body_len: usize,
    request: &Request,
) -> bool {
    if !policy.is_compressible_mime(mime_type) {
        return false;
    }
    if body_len < policy.min_length {
        return false;
    }
    if policy.should_bypass(&request.path) {
        log::debug!("Path '{}' matches bypass pattern", request.path);
        return false;
    }
    if request.header("authorization").is_some() {
        return false;
    }
    if request
        .header("cache-control")
        .is_some_and(|v| v.to_lowercase().contains("no-transform"))
    {
        return false;
    }
    true
}

/// Compress with the preferred accepted encoding. An encoder failure is never
/// surfaced to the client: the body is served uncompressed instead.
pub fn compress_body(
    content: &[u8],
    accepted: AcceptedCompression,
    policy: &CompressionPolicy,
) -> (Vec<u8>, CompressionType) {
    if accepted.supports_zstd {
        log::debug!("Compressing with zstd level {}", policy.zstd_level);
        match zstd_encode(content, policy.zstd_level) {
            Ok(compressed) => return (compressed, CompressionType::Zstd),
            Err(e) => log::warn!("zstd encoding failed, serving uncompressed: {}", e),
        }
    } else if accepted.supports_gzip {
        log::debug!("Compressing with gzip level {}", policy.gzip_level);
        match gzip_encode(content, policy.gzip_level) {
            Ok(compressed) => return (compressed, CompressionType::Gzip),
            Err(e) => log::warn!("gzip encoding failed, serving uncompressed: {}", e),
        }
    }
    (content.to_vec(), CompressionType::None)
}

fn zstd_encode(content: &[u8], level: i32) -> io::Result<Vec<u8>> {
    let mut encoder = ZstdEncoder::new(Vec::new(), level)?;
    encoder.write_all(content)?;
    encoder.finish()
}

fn gzip_encode(content: &[u8], level: u32) -> io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), GzipCompression::new(level));
    encoder.write_all(content)?;
    encoder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;
    use std::io::Read;

    fn request_with(path: &str, headers: &[(&str, &str)]) -> Request {
        Request {
            method: "GET".to_string(),
            path: path.to_string(),
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[test]
    fn negotiation_prefers_listed_encodings() {
        let accepted = determine_compression("gzip, deflate, zstd");
        assert!(accepted.supports_zstd);
        assert!(accepted.supports_gzip);

        let accepted = determine_compression("gzip;q=0.8, br");
        assert!(!accepted.supports_zstd);
        assert!(accepted.supports_gzip);

        let accepted = determine_compression("identity");
        assert_eq!(accepted, AcceptedCompression::none());
    }

    #[test]
    fn negotiation_is_case_insensitive() {
        let accepted = determine_compression("GZip, ZSTD");
        assert!(accepted.supports_zstd);
        assert!(accepted.supports_gzip);
    }

    #[test]
    fn policy_rejects_small_bodies_and_foreign_types() {
        let policy = CompressionPolicy::default();
        let request = request_with("/docs/guide.html", &[]);
        assert!(should_compress(&policy, "text/html", 4096, &request));
        assert!(!should_compress(&policy, "text/html", 100, &request));
        assert!(!should_compress(&policy, "image/png", 4096, &request));
    }

    #[test]
    fn policy_honors_excluded_request_conditions() {
        let policy = CompressionPolicy::default();
        let authed = request_with("/docs/a.html", &[("Authorization", "Bearer x")]);
        assert!(!should_compress(&policy, "text/html", 4096, &authed));

        let no_transform = request_with("/docs/a.html", &[("Cache-Control", "no-transform")]);
        assert!(!should_compress(&policy, "text/html", 4096, &no_transform));

        let cacheable = request_with("/docs/a.html", &[("Cache-Control", "max-age=60")]);
        assert!(should_compress(&policy, "text/html", 4096, &cacheable));
    }

    #[test]
    fn policy_honors_bypass_patterns() {
        let policy = CompressionPolicy {
            bypass_patterns: vec![Regex::new(r"^/docs/raw/").unwrap()],
            ..CompressionPolicy::default()
        };
        let bypassed = request_with("/docs/raw/dump.json", &[]);
        assert!(!should_compress(&policy, "application/json", 4096, &bypassed));
    }

    #[test]
    fn gzip_round_trip() {
        let policy = CompressionPolicy::default();
        let body = b"hello world ".repeat(200);
        let accepted = determine_compression("gzip");
        let (compressed, compression) = compress_body(&body, accepted, &policy);
        assert_eq!(compression, CompressionType::Gzip);
        assert!(compressed.len() < body.len());

        let mut decoded = Vec::new();
        flate2::read::GzDecoder::new(&compressed[..])
            .read_to_end(&mut decoded)
            .unwrap();
        assert_eq!(decoded, body);
    }

    #[test]
    fn zstd_preferred_over_gzip() {
        let policy = CompressionPolicy::default();
        let body = b"0123456789".repeat(500);
        let accepted = determine_compression("gzip, zstd");
        let (compressed, compression) = compress_body(&body, accepted, &policy);
        assert_eq!(compression, CompressionType::Zstd);
        assert_eq!(zstd::decode_all(&compressed[..]).unwrap(), body);
    }

    #[test]
    fn no_accepted_encoding_passes_through() {
        let policy = CompressionPolicy::default();
        let body = b"plain".to_vec();
        let (out, compression) = compress_body(&body, AcceptedCompression::none(), &policy);
        assert_eq!(compression, CompressionType::None);
        assert_eq!(out, body);
    }
}
