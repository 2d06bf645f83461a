//! Request dispatch for the Aptly API.
//!
//! # Design
//! `AptlyClient` holds an immutable `ClientConfig` and a `Transport`; it
//! carries no mutable state between calls. A facade method describes its
//! exchange as a `Call`, `build_request` turns the call into an
//! `HttpRequest` without I/O, the transport executes it, and the normalizer
//! shapes the reply. Each call is exactly one request: no retries, no
//! caching.

use std::borrow::Cow;
use std::path::Path;

use log::{debug, trace, warn};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::Serialize;
use serde_json::Value;
use url::form_urlencoded;

use crate::config::{ClientConfig, Resource};
use crate::error::{AptlyError, Result};
use crate::http::{merge_headers, Headers, HttpMethod, HttpRequest, HttpResponse, RequestBody};
use crate::normalize::{normalize, ApiResult};
use crate::transport::{Transport, UreqTransport};
use crate::types::QueryOptions;

/// Escaped inside a single path segment: the URL path set plus `/` and `%`.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'/')
    .add(b'%');

/// Percent-encode one path segment.
///
/// `.` and `..` are written as `%2E` and `%2E%2E` so they stay literal
/// segments instead of being resolved against the path.
fn encode_segment(segment: &str) -> Cow<'_, str> {
    match segment {
        "." => Cow::Borrowed("%2E"),
        ".." => Cow::Borrowed("%2E%2E"),
        _ => utf8_percent_encode(segment, SEGMENT).into(),
    }
}

/// One request/response exchange, described before it happens.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub resource: Resource,
    pub segments: Vec<String>,
    pub method: HttpMethod,
    pub query: Vec<(String, String)>,
    pub body: Option<RequestBody>,
    pub headers: Headers,
    pub context: Option<String>,
}

impl Call {
    pub fn new(method: HttpMethod, resource: Resource) -> Self {
        Self {
            resource,
            segments: Vec::new(),
            method,
            query: Vec::new(),
            body: None,
            headers: Vec::new(),
            context: None,
        }
    }

    pub fn get(resource: Resource) -> Self {
        Self::new(HttpMethod::Get, resource)
    }

    pub fn post(resource: Resource) -> Self {
        Self::new(HttpMethod::Post, resource)
    }

    pub fn put(resource: Resource) -> Self {
        Self::new(HttpMethod::Put, resource)
    }

    pub fn delete(resource: Resource) -> Self {
        Self::new(HttpMethod::Delete, resource)
    }

    /// Append one path segment. It is percent-encoded on its own, so a `/`
    /// inside it stays part of the segment.
    pub fn segment(mut self, segment: impl Into<String>) -> Self {
        self.segments.push(segment.into());
        self
    }

    pub fn query_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn query(mut self, options: &impl QueryOptions) -> Self {
        self.query.extend(options.query_pairs());
        self
    }

    /// Attach `fields` as a JSON body with `Content-Type: application/json`.
    ///
    /// Fields that serialize to an empty object add neither a body nor the
    /// header.
    pub fn json<T: Serialize + ?Sized>(mut self, fields: &T) -> Result<Self> {
        let value = serde_json::to_value(fields).map_err(AptlyError::Serialization)?;
        if matches!(&value, Value::Object(map) if map.is_empty()) {
            return Ok(self);
        }
        let text = serde_json::to_string(&value).map_err(AptlyError::Serialization)?;
        self.body = Some(RequestBody::Json(text));
        Ok(self.header("Content-Type", "application/json"))
    }

    pub fn multipart(mut self, form: crate::http::Multipart) -> Self {
        let content_type = form.content_type();
        self.body = Some(RequestBody::Multipart(form));
        self.header("Content-Type", content_type)
    }

    /// Add a call-specific header; it wins over a default of the same name.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.headers.retain(|(existing, _)| !existing.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
        self
    }

    /// Message used if the reply cannot be parsed.
    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

/// Synchronous client for one Aptly server.
#[derive(Debug)]
pub struct AptlyClient<T = UreqTransport> {
    config: ClientConfig,
    transport: T,
}

impl AptlyClient<UreqTransport> {
    /// Client using a `ureq` transport configured from `config`.
    pub fn new(config: ClientConfig) -> Self {
        let transport = UreqTransport::new(&config);
        Self { config, transport }
    }
}

impl<T: Transport> AptlyClient<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Resolve `call` into a concrete request. Performs no I/O.
    pub fn build_request(&self, call: &Call) -> Result<HttpRequest> {
        let mut url = self.config.resources().base(call.resource).as_str().to_string();
        for segment in &call.segments {
            url.push('/');
            url.push_str(&encode_segment(segment));
        }
        if !call.query.is_empty() {
            let query = form_urlencoded::Serializer::new(String::new())
                .extend_pairs(call.query.iter())
                .finish();
            url.push('?');
            url.push_str(&query);
        }

        Ok(HttpRequest {
            method: call.method,
            url,
            headers: merge_headers(self.config.default_headers(), &call.headers),
            body: call.body.clone(),
        })
    }

    /// Send the request for `call` without interpreting the reply.
    pub fn execute(&self, call: &Call) -> Result<HttpResponse> {
        let request = self.build_request(call)?;
        debug!("{} {}", request.method, request.url);
        trace!(
            "headers: {:?}",
            request.headers.iter().map(|(name, _)| name.as_str()).collect::<Vec<_>>()
        );
        self.transport.execute(&request)
    }

    /// Send the request for `call`, streaming a 2xx body into `dest`.
    ///
    /// Returns the number of bytes written. Any other status is an
    /// `UnexpectedStatus` error and leaves `dest` untouched.
    pub fn download(&self, call: &Call, dest: &Path) -> Result<u64> {
        let request = self.build_request(call)?;
        debug!("{} {} -> {}", request.method, request.url, dest.display());
        let download = self.transport.download(&request, dest)?;
        if !download.is_success() {
            warn!("download failed: HTTP {} from {}", download.status, request.url);
            return Err(AptlyError::UnexpectedStatus {
                url: request.url,
                status: download.status,
            });
        }
        Ok(download.bytes)
    }

    /// Perform `call` and normalize the reply.
    pub fn dispatch(&self, call: Call) -> ApiResult {
        let response = self.execute(&call)?;
        normalize(&response, call.context.as_deref())
    }
}
