//! HTTP exchange types described as plain data.
//!
//! # Design
//! The client builds `HttpRequest` values and parses `HttpResponse` values
//! without touching the network; a `Transport` performs the actual I/O in
//! between. Every Ubersmith call is a POST, so requests carry no method.
//!
//! Bodies are raw bytes because some API methods answer with PDFs or images.

/// A POST request described as plain data.
///
/// Built by `UbersmithClient::build_*` methods and handed to a `Transport`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpRequest {
    /// First header value whose name matches `name` case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// The body as UTF-8 text, if it is valid UTF-8.
    pub fn body_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// A response with the given status and body and no headers.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// A `200 OK` with `Content-Type: application/json`.
    pub fn json(body: impl Into<Vec<u8>>) -> Self {
        Self::new(200, body).with_header("content-type", "application/json")
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Media type of the body with any parameters (`; charset=...`) removed,
    /// lowercased.
    pub fn content_type(&self) -> Option<String> {
        self.header("content-type").map(|value| {
            value
                .split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase()
        })
    }

    /// The `filename=` part of `Content-Disposition`, unquoted.
    pub fn content_filename(&self) -> Option<String> {
        let disposition = self.header("content-disposition")?;
        let lower = disposition.to_ascii_lowercase();
        let start = lower.find("filename=")? + "filename=".len();
        let raw = disposition[start..].split(';').next().unwrap_or_default();
        let name = raw.trim().trim_matches('"');
        if name.is_empty() {
            None
        } else {
            Some(name.to_string())
        }
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}
