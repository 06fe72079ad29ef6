use mime_guess::from_path;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::time::Instant;

use super::path_utils::find_precompressed;
use super::{resolve, FileResponse, RouteDecision};
use crate::compression::{compress_body, determine_compression, should_compress, CompressionType};
use crate::config::Config;
use crate::http::Request;
use crate::log_response;

/// Execute the routing pipeline for one parsed request and write the
/// response. Per-request failures are answered with the configured error
/// document and never propagate past the connection.
pub fn handle_request(
    client: &mut impl Write,
    config: &Config,
    request: &Request,
) -> io::Result<()> {
    let start = Instant::now();

    let decision = match resolve(&request.path, config) {
        Ok(decision) => decision,
        Err(e) => {
            log::error!("Route resolution failed for {}: {}", request.path, e);
            return serve_error_document(client, config, request.is_head(), start);
        }
    };
    log::debug!("Decision for {}: {:?}", request.path, decision);

    // The probe answers every method; orchestration checks may use any
    if decision == RouteDecision::Probe {
        return write_response(
            client,
            200,
            "OK",
            &[("Content-Type".to_string(), "text/plain".to_string())],
            b"Ok",
            false,
            start,
        );
    }

    let is_head = request.is_head();
    if !request.method.eq_ignore_ascii_case("GET") && !is_head {
        log::warn!("Method not allowed: {}", request.method);
        return write_response(
            client,
            405,
            "Method Not Allowed",
            &[
                ("Content-Type".to_string(), "text/plain".to_string()),
                ("Allow".to_string(), "GET, HEAD".to_string()),
            ],
            b"Method Not Allowed",
            is_head,
            start,
        );
    }

    match decision {
        RouteDecision::Probe => unreachable!("handled above"),
        RouteDecision::Redirect { location } => write_response(
            client,
            302,
            "Found",
            &[
                ("Location".to_string(), location),
                ("Content-Type".to_string(), "text/plain".to_string()),
            ],
            b"Found",
            is_head,
            start,
        ),
        RouteDecision::ServeFile(path) => serve_static(client, config, request, &path, false, start),
        RouteDecision::Fallback(path) => serve_static(client, config, request, &path, true, start),
        RouteDecision::NotFound => write_response(
            client,
            404,
            "Not Found",
            &[("Content-Type".to_string(), "text/plain".to_string())],
            b"Not Found",
            is_head,
            start,
        ),
        RouteDecision::BadRequest => write_response(
            client,
            400,
            "Bad Request",
            &[("Content-Type".to_string(), "text/plain".to_string())],
            b"Bad Request",
            is_head,
            start,
        ),
    }
}

fn serve_static(
    client: &mut impl Write,
    config: &Config,
    request: &Request,
    path: &Path,
    is_fallback: bool,
    start: Instant,
) -> io::Result<()> {
    let response = match build_file_response(config, request, path, is_fallback) {
        Ok(response) => response,
        Err(e) => {
            log::error!("Failed to read {}: {}", path.display(), e);
            return serve_error_document(client, config, request.is_head(), start);
        }
    };

    let mut headers = vec![("Content-Type".to_string(), response.mime_type.clone())];
    if let Some(encoding) = response.compression.encoding_name() {
        headers.push(("Content-Encoding".to_string(), encoding.to_string()));
    }
    headers.extend(response.headers);

    write_response(
        client,
        200,
        "OK",
        &headers,
        &response.content,
        request.is_head(),
        start,
    )
}

fn build_file_response(
    config: &Config,
    request: &Request,
    path: &Path,
    is_fallback: bool,
) -> io::Result<FileResponse> {
    let accepted = determine_compression(request.header("accept-encoding").unwrap_or(""));
    let mime_type = from_path(path).first_or_octet_stream().to_string();

    // The shell document must always be revalidated or client-side routing
    // serves stale bundles; hashed assets can be cached aggressively
    let is_shell = is_fallback || path.file_name() == config.fallback_document.file_name();
    let mut headers: Vec<(String, String)> = if is_shell {
        vec![
            (
                "Cache-Control".to_string(),
                "no-cache, no-store, must-revalidate".to_string(),
            ),
            ("Pragma".to_string(), "no-cache".to_string()),
            ("Expires".to_string(), "0".to_string()),
        ]
    } else {
        vec![(
            "Cache-Control".to_string(),
            "public, max-age=31536000".to_string(),
        )]
    };
    headers.push(("X-Content-Type-Options".to_string(), "nosniff".to_string()));

    // Cached representations differ by negotiated encoding
    if config.compression.is_compressible_mime(&mime_type) {
        headers.push(("Vary".to_string(), "Accept-Encoding".to_string()));
    }

    if let Some(precompressed) = find_precompressed(path, accepted) {
        let content = fs::read(&precompressed.path)?;
        return Ok(FileResponse {
            content,
            mime_type,
            compression: precompressed.compression,
            headers,
        });
    }

    let content = fs::read(path)?;
    let (content, compression) =
        if should_compress(&config.compression, &mime_type, content.len(), request) {
            compress_body(&content, accepted, &config.compression)
        } else {
            (content, CompressionType::None)
        };

    Ok(FileResponse {
        content,
        mime_type,
        compression,
        headers,
    })
}

fn serve_error_document(
    client: &mut impl Write,
    config: &Config,
    is_head: bool,
    start: Instant,
) -> io::Result<()> {
    let path = config.root_dir.join(&config.error_document);
    match fs::read(&path) {
        Ok(content) => write_response(
            client,
            500,
            "Internal Server Error",
            &[("Content-Type".to_string(), "text/html".to_string())],
            &content,
            is_head,
            start,
        ),
        Err(e) => {
            log::error!("Error document {} unreadable: {}", path.display(), e);
            write_response(
                client,
                500,
                "Internal Server Error",
                &[("Content-Type".to_string(), "text/plain".to_string())],
                b"Internal Server Error",
                is_head,
                start,
            )
        }
    }
}

fn write_response(
    client: &mut impl Write,
    status: u16,
    reason: &str,
    headers: &[(String, String)],
    body: &[u8],
    is_head: bool,
    start: Instant,
) -> io::Result<()> {
    client.write_all(format!("HTTP/1.1 {} {}\r\n", status, reason).as_bytes())?;
    for (key, value) in headers {
        client.write_all(format!("{}: {}\r\n", key, value).as_bytes())?;
    }
    client.write_all(format!("Content-Length: {}\r\n", body.len()).as_bytes())?;
    client.write_all(b"\r\n")?;
    if !is_head {
        client.write_all(body)?;
    }
    client.flush()?;

    log_response!(status, start.elapsed(), body.len());
    Ok(())
}
