//! Blocking client for the Aptly REST API.
//!
//! # Overview
//! `AptlyClient` exposes one method per Aptly endpoint (local repositories,
//! packages, upload directories, publishing, snapshots, version, graph).
//! Each method makes exactly one HTTP request and returns the server's JSON
//! reply as a `serde_json::Value`, unexamined: Aptly's own error bodies come
//! back as values too.
//!
//! # Design
//! - `ClientConfig` is validated and frozen before any I/O.
//! - Facade methods describe their exchange as a `Call`; `build_request`
//!   turns it into a plain `HttpRequest`, a `Transport` executes it, and
//!   `normalize` shapes the reply.
//! - A reply that is not JSON at all becomes
//!   `AptlyError::UnparseableResponse` with the HTTP status attached.
//! - Publish prefixes are escaped with `sanitize_prefix` before they become
//!   a path segment.
//!
//! ```no_run
//! use aptly_core::{AptlyClient, ClientConfig, CreateRepo};
//!
//! let config = ClientConfig::builder("aptly.internal:8080")
//!     .credentials("admin", "secret")
//!     .build()?;
//! let client = AptlyClient::new(config);
//! let repo = client.create_local_repo(&CreateRepo::named("main"))?;
//! println!("{repo}");
//! # Ok::<(), aptly_core::AptlyError>(())
//! ```

mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod normalize;
pub mod prefix;
pub mod transport;
pub mod types;

pub use client::{AptlyClient, Call};
pub use config::{ClientConfig, ClientConfigBuilder, ClientSettings, Resource, DEFAULT_SCHEME, DEFAULT_TIMEOUT};
pub use error::{AptlyError, ResponseError, Result};
pub use http::{HttpMethod, HttpRequest, HttpResponse, RequestBody};
pub use normalize::{decode, normalize, ApiResult};
pub use prefix::sanitize_prefix;
#[cfg(feature = "test-support")]
pub use transport::StubTransport;
pub use transport::{Download, Transport, UreqTransport};
pub use types::*;
