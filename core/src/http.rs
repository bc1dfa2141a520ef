//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! Requests and responses are plain data. `PlaidClient::build_*` methods
//! produce `HttpRequest` values and `PlaidClient::parse_response` consumes
//! `HttpResponse` values; a `Transport` (or the caller) performs the actual
//! round-trip in between.

use std::borrow::Cow;

use url::form_urlencoded;

pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// Only GET is safe to repeat against the connect endpoints.
    pub fn is_idempotent(&self) -> bool {
        matches!(self, HttpMethod::Get)
    }
}

/// An HTTP request described as plain data.
///
/// `url` is absolute. GET requests carry their fields in the query string;
/// every other method carries them as a form-encoded `body`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    /// Decoded key-value fields, read from the body or the query string.
    pub fn fields(&self) -> Vec<(String, String)> {
        let encoded = match &self.body {
            Some(body) => body.as_str(),
            None => self.url.split_once('?').map(|(_, q)| q).unwrap_or(""),
        };
        form_urlencoded::parse(encoded.as_bytes())
            .into_owned()
            .collect()
    }

    /// Value of a single decoded field.
    pub fn field(&self, name: &str) -> Option<String> {
        self.fields()
            .into_iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }
}

/// An HTTP response described as plain data.
///
/// The body is kept as raw bytes; whether it is text, let alone JSON, is
/// decided by `PlaidClient::parse_response` after the status check.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as text, with invalid UTF-8 replaced.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}
