use std::io::{self, BufRead};

/// A parsed request. Immutable, created per connection, discarded after the
/// response is written.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
}

impl Request {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn is_head(&self) -> bool {
        self.method.eq_ignore_ascii_case("HEAD")
    }
}

/// Read the request line and headers up to the blank line. Returns `None` for
/// an empty or malformed request line.
pub fn read_request(reader: &mut impl BufRead) -> io::Result<Option<Request>> {
    let mut first_line = String::new();
    if reader.read_line(&mut first_line)? == 0 {
        return Ok(None);
    }
    log::debug!("Request line: {}", first_line.trim());

    let mut parts = first_line.split_whitespace();
    let (method, path) = match (parts.next(), parts.next()) {
        (Some(m), Some(p)) => (m.to_string(), p.to_string()),
        _ => {
            log::warn!("Malformed request line: {}", first_line.trim());
            return Ok(None);
        }
    };

    let mut headers = Vec::new();
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 || line.trim().is_empty() {
            break;
        }
        if let Some((key, value)) = line.split_once(':') {
            headers.push((key.trim().to_string(), value.trim().to_string()));
        } else {
            log::debug!("Skipping invalid header line: {}", line.trim());
        }
    }

    Ok(Some(Request {
        method,
        path,
        headers,
    }))
}
