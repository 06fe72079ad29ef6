pub mod handlers;
pub mod path_utils;

use std::io;
use std::path::PathBuf;

use crate::compression::CompressionType;
use crate::config::Config;

/// Outcome of routing a single request path. Computed once per request and
/// handled exhaustively at the response-writing boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    Probe,
    Redirect { location: String },
    ServeFile(PathBuf),
    Fallback(PathBuf),
    NotFound,
    BadRequest,
}

pub struct FileResponse {
    pub content: Vec<u8>,
    pub mime_type: String,
    pub compression: CompressionType,
    pub headers: Vec<(String, String)>,
}

pub struct PrecompressedFile {
    pub path: PathBuf,
    pub compression: CompressionType,
}

/// Map a request path to exactly one decision.
///
/// The probe path and the bare prefix are matched verbatim. Paths under
/// `<prefix>/` are stripped and resolved below the static root; a miss
/// becomes a fallback to the configured shell document so client-side routes
/// load. Everything else is a plain 404.
pub fn resolve(request_path: &str, config: &Config) -> io::Result<RouteDecision> {
    let path = request_path.split('?').next().unwrap_or(request_path);

    if path == config.probe_path {
        return Ok(RouteDecision::Probe);
    }

    if path == config.doc_prefix {
        return Ok(RouteDecision::Redirect {
            location: config.redirect_location(),
        });
    }

    let stripped = path
        .strip_prefix(&config.doc_prefix)
        .and_then(|rest| rest.strip_prefix('/'));
    let Some(rest) = stripped else {
        return Ok(RouteDecision::NotFound);
    };

    let Some(resolved) = path_utils::sanitize_path(&config.root_dir, rest)? else {
        return Ok(RouteDecision::BadRequest);
    };

    let resolved = if resolved.is_dir() {
        resolved.join(&config.fallback_document)
    } else {
        resolved
    };

    if resolved.is_file() {
        Ok(RouteDecision::ServeFile(resolved))
    } else {
        log::debug!(
            "No file at {}, falling back to {}",
            resolved.display(),
            config.fallback_document.display()
        );
        Ok(RouteDecision::Fallback(
            config.root_dir.join(&config.fallback_document),
        ))
    }
}
