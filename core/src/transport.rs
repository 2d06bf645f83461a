//! Executing `HttpRequest` values.
//!
//! # Design
//! `Transport` is the only place the crate touches the network. The ureq
//! implementation is what `AptlyClient::new` uses; tests swap in a stub or a
//! mock. Every HTTP status comes back as an `HttpResponse`; only failures to
//! get any response at all become `AptlyError::Transport`. Response bodies
//! are read without a size cap, and `download` streams straight to disk.

use std::fmt;
use std::fs::{self, File};
use std::io;
use std::path::Path;

use log::trace;

use crate::config::ClientConfig;
use crate::error::{AptlyError, Result};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Outcome of [`Transport::download`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Download {
    pub status: u16,
    /// Bytes written to the destination; zero unless the status was 2xx.
    pub bytes: u64,
}

impl Download {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Performs one blocking request/response exchange.
#[cfg_attr(test, mockall::automock)]
pub trait Transport {
    /// Send `request` and return whatever the server answered.
    ///
    /// # Errors
    ///
    /// Returns `AptlyError::Transport` when no response was received.
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse>;

    /// Send `request` and write a 2xx body to `dest`.
    ///
    /// On any other status `dest` is neither created nor truncated. The
    /// default buffers the body through `execute`.
    ///
    /// # Errors
    ///
    /// `AptlyError::Transport` as for `execute`, `AptlyError::Io` when
    /// `dest` cannot be written.
    fn download(&self, request: &HttpRequest, dest: &Path) -> Result<Download> {
        let response = self.execute(request)?;
        if !response.is_success() {
            return Ok(Download {
                status: response.status,
                bytes: 0,
            });
        }
        fs::write(dest, &response.body)?;
        Ok(Download {
            status: response.status,
            bytes: response.body.len() as u64,
        })
    }
}

/// Blocking transport backed by a `ureq` agent.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UreqTransport").finish_non_exhaustive()
    }
}

impl UreqTransport {
    pub fn new(config: &ClientConfig) -> Self {
        let tls = ureq::tls::TlsConfig::builder()
            .disable_verification(!config.verify_tls())
            .build();
        let agent_config = ureq::Agent::config_builder()
            .timeout_global(Some(config.timeout()))
            .http_status_as_error(false)
            .tls_config(tls)
            .build();
        Self {
            agent: ureq::Agent::new_with_config(agent_config),
        }
    }

    fn send(&self, request: &HttpRequest) -> Result<ureq::http::Response<ureq::Body>> {
        let url = request.url.as_str();
        let body = request.body.as_ref().map(|body| body.to_bytes());

        let result = match (request.method, body) {
            (HttpMethod::Get, None) => with_headers(self.agent.get(url), request).call(),
            (HttpMethod::Get, Some(bytes)) => with_headers(self.agent.get(url), request)
                .force_send_body()
                .send(&bytes[..]),
            (HttpMethod::Delete, None) => with_headers(self.agent.delete(url), request).call(),
            (HttpMethod::Delete, Some(bytes)) => with_headers(self.agent.delete(url), request)
                .force_send_body()
                .send(&bytes[..]),
            (HttpMethod::Post, None) => with_headers(self.agent.post(url), request).send_empty(),
            (HttpMethod::Post, Some(bytes)) => {
                with_headers(self.agent.post(url), request).send(&bytes[..])
            }
            (HttpMethod::Put, None) => with_headers(self.agent.put(url), request).send_empty(),
            (HttpMethod::Put, Some(bytes)) => {
                with_headers(self.agent.put(url), request).send(&bytes[..])
            }
        };
        result.map_err(|e| transport_error(url, &e))
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let url = request.url.as_str();
        let mut response = self.send(request)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    value.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect();
        let body = response
            .body_mut()
            .with_config()
            .limit(u64::MAX)
            .read_to_vec()
            .map_err(|e| transport_error(url, &e))?;
        trace!("{} {url} -> HTTP {status} ({} bytes)", request.method, body.len());

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    fn download(&self, request: &HttpRequest, dest: &Path) -> Result<Download> {
        let response = self.send(request)?;
        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            return Ok(Download { status, bytes: 0 });
        }

        let mut file = File::create(dest)?;
        let copied = io::copy(&mut response.into_body().as_reader(), &mut file);
        match copied {
            Ok(bytes) => {
                trace!("{} {} -> HTTP {status} ({bytes} bytes streamed)", request.method, request.url);
                Ok(Download { status, bytes })
            }
            Err(err) => {
                drop(file);
                // Never leave a truncated file behind.
                let _ = fs::remove_file(dest);
                Err(AptlyError::Io(err))
            }
        }
    }
}

fn with_headers<B>(mut builder: ureq::RequestBuilder<B>, request: &HttpRequest) -> ureq::RequestBuilder<B> {
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

fn transport_error(url: &str, err: &ureq::Error) -> AptlyError {
    AptlyError::Transport {
        url: url.to_owned(),
        reason: err.to_string(),
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use stub::StubTransport;

#[cfg(any(test, feature = "test-support"))]
mod stub {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::Transport;
    use crate::error::Result;
    use crate::http::{HttpRequest, HttpResponse};

    /// Records every request and answers from a queue of canned responses.
    ///
    /// When the queue is empty it answers `200 {}`.
    #[derive(Debug, Default)]
    pub struct StubTransport {
        requests: Mutex<Vec<HttpRequest>>,
        responses: Mutex<VecDeque<HttpResponse>>,
    }

    impl StubTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue a response with the given status and body.
        pub fn respond(&self, status: u16, body: impl Into<Vec<u8>>) -> &Self {
            self.lock_responses().push_back(HttpResponse {
                status,
                headers: Vec::new(),
                body: body.into(),
            });
            self
        }

        /// Every request executed so far, oldest first.
        pub fn requests(&self) -> Vec<HttpRequest> {
            self.requests
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .clone()
        }

        /// The most recent request.
        ///
        /// # Panics
        ///
        /// Panics if nothing has been executed yet.
        pub fn last_request(&self) -> HttpRequest {
            self.requests()
                .pop()
                .expect("StubTransport has not executed any request")
        }

        fn lock_responses(&self) -> std::sync::MutexGuard<'_, VecDeque<HttpResponse>> {
            self.responses
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
        }
    }

    impl Transport for StubTransport {
        fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
            self.requests
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .push(request.clone());
            Ok(self.lock_responses().pop_front().unwrap_or(HttpResponse {
                status: 200,
                headers: Vec::new(),
                body: b"{}".to_vec(),
            }))
        }
    }
}
