use regex::Regex;
use std::collections::HashSet;
use std::env;
use std::io;
use std::path::PathBuf;

use crate::args::Args;

/// Environment overrides mirroring the deployment template: the listening
/// port and the external hostname are substituted at startup.
const ENV_PORT: &str = "DOCSERVE_PORT";
const ENV_HOST: &str = "DOCSERVE_HOST";

/// Conservative allow-list of content types worth compressing.
const COMPRESSIBLE_TYPES: &[&str] = &[
    "text/html",
    "text/css",
    "text/plain",
    "application/javascript",
    "application/json",
    "application/xml",
    "image/svg+xml",
];

#[derive(Debug, Clone)]
pub struct CompressionPolicy {
    pub min_length: usize,
    pub enabled_mime_types: HashSet<String>,
    pub bypass_patterns: Vec<Regex>,
    pub zstd_level: i32,
    pub gzip_level: u32,
}

impl CompressionPolicy {
    pub fn is_compressible_mime(&self, mime_type: &str) -> bool {
        // Ignore parameters such as "; charset=utf-8"
        let essence = mime_type.split(';').next().unwrap_or(mime_type).trim();
        self.enabled_mime_types.contains(essence)
    }

    pub fn should_bypass(&self, request_path: &str) -> bool {
        self.bypass_patterns.iter().any(|p| p.is_match(request_path))
    }
}

impl Default for CompressionPolicy {
    fn default() -> Self {
        Self {
            min_length: 1000,
            enabled_mime_types: COMPRESSIBLE_TYPES.iter().map(ToString::to_string).collect(),
            bypass_patterns: Vec::new(),
            zstd_level: 3,
            gzip_level: 6,
        }
    }
}

/// Process-wide configuration, built once at startup and never mutated.
#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: String,
    pub public_host: Option<String>,
    pub doc_prefix: String,
    pub probe_path: String,
    pub root_dir: PathBuf,
    pub fallback_document: PathBuf,
    pub error_document: PathBuf,
    pub compression: CompressionPolicy,
}

impl Config {
    pub fn from_args(args: Args) -> io::Result<Self> {
        let listen_addr = match env::var(ENV_PORT) {
            Ok(port) => {
                let port: u16 = port.parse().map_err(|e| {
                    io::Error::new(
                        io::ErrorKind::InvalidInput,
                        format!("invalid {ENV_PORT} value {port:?}: {e}"),
                    )
                })?;
                let host = args
                    .listen_addr
                    .rsplit_once(':')
                    .map_or("0.0.0.0", |(h, _)| h);
                format!("{host}:{port}")
            }
            Err(_) => args.listen_addr,
        };

        let public_host = env::var(ENV_HOST).ok().or(args.public_host);

        Ok(Self {
            listen_addr,
            public_host,
            doc_prefix: normalize_prefix(&args.doc_prefix),
            probe_path: args.probe_path,
            root_dir: args.root_dir,
            fallback_document: args.fallback_document,
            error_document: args.error_document,
            compression: CompressionPolicy {
                min_length: args.min_compress_length,
                bypass_patterns: args.bypass_patterns,
                zstd_level: args.zstd_level,
                gzip_level: args.gzip_level,
                ..CompressionPolicy::default()
            },
        })
    }

    /// Target for the bare-prefix redirect. Absolute when an external
    /// hostname is configured, relative otherwise.
    pub fn redirect_location(&self) -> String {
        match &self.public_host {
            Some(host) => format!("https://{}{}/", host, self.doc_prefix),
            None => format!("{}/", self.doc_prefix),
        }
    }
}

/// Exactly one canonical form: leading slash, no trailing slash.
fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_end_matches('/');
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}
