//! HTTP request and response values.
//!
//! # Design
//! Requests and responses are plain data. `AptlyClient::build_request`
//! produces an `HttpRequest` without touching the network, a `Transport`
//! executes it, and the normalizer consumes the resulting `HttpResponse`.

use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

use crate::error::AptlyError;

/// The closed set of verbs the Aptly API uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = AptlyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "DELETE" => Ok(HttpMethod::Delete),
            _ => Err(AptlyError::UnsupportedVerb {
                verb: s.to_string(),
            }),
        }
    }
}

/// Ordered header list. Names compare case-insensitively.
pub type Headers = Vec<(String, String)>;

/// An HTTP request described as plain data.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    /// Fully-qualified URL, query string included.
    pub url: String,
    pub headers: Headers,
    pub body: Option<RequestBody>,
}

impl HttpRequest {
    /// Value of the first header named `name`, ignoring case.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// Payload carried by a request.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// A serialized JSON object.
    Json(String),
    /// A `multipart/form-data` file upload.
    Multipart(Multipart),
}

impl RequestBody {
    /// Wire bytes for this body.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            RequestBody::Json(json) => json.as_bytes().to_vec(),
            RequestBody::Multipart(form) => form.encode(),
        }
    }

    /// The JSON text, if this is a JSON body.
    pub fn as_json(&self) -> Option<&str> {
        match self {
            RequestBody::Json(json) => Some(json),
            RequestBody::Multipart(_) => None,
        }
    }
}

/// One file inside a multipart upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub field: String,
    pub file_name: String,
    pub content: Vec<u8>,
}

/// A `multipart/form-data` body. Parts are sent in insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Multipart {
    boundary: String,
    parts: Vec<FilePart>,
}

impl Multipart {
    pub fn new() -> Self {
        Self {
            boundary: format!("aptly-core-{}", Uuid::new_v4().simple()),
            parts: Vec::new(),
        }
    }

    pub fn push(&mut self, part: FilePart) {
        self.parts.push(part);
    }

    pub fn parts(&self) -> &[FilePart] {
        &self.parts
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for part in &self.parts {
            out.extend_from_slice(format!("--{}\r\n", self.boundary).as_bytes());
            out.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                    escape_quoted(&part.field),
                    escape_quoted(&part.file_name)
                )
                .as_bytes(),
            );
            out.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
            out.extend_from_slice(&part.content);
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        out
    }
}

impl Default for Multipart {
    fn default() -> Self {
        Self::new()
    }
}

fn escape_quoted(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Headers,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Lay `explicit` over `defaults`: a call-specific header replaces every
/// default header of the same name, never the reverse.
pub fn merge_headers(defaults: &[(String, String)], explicit: &[(String, String)]) -> Headers {
    let mut merged: Headers = defaults
        .iter()
        .filter(|(name, _)| find_header(explicit, name).is_none())
        .cloned()
        .collect();
    merged.extend(explicit.iter().cloned());
    merged
}

pub(crate) fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}
