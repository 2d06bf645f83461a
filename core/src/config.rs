//! Client configuration and the resource URL table.
//!
//! # Design
//! `ClientConfig` is immutable once built. The builder validates the host
//! before any I/O: an empty host is rejected, a missing scheme gets
//! [`DEFAULT_SCHEME`], and the per-resource base URLs are resolved once so
//! every later call only appends path segments.

use std::collections::BTreeMap;
use std::time::Duration;

use base64::Engine as _;
use serde::Deserialize;
use url::Url;

use crate::error::{AptlyError, Result};
use crate::http::Headers;

/// Scheme prepended to hosts given without one.
pub const DEFAULT_SCHEME: &str = "http://";

/// Request timeout applied when the caller does not set one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Top-level resource families under `<host>/api`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    /// The API root itself (`/api`), used by `version` and `graph`.
    Root,
    Repos,
    Snapshots,
    Publish,
    Files,
    Packages,
}

impl Resource {
    const ALL: [Resource; 6] = [
        Resource::Root,
        Resource::Repos,
        Resource::Snapshots,
        Resource::Publish,
        Resource::Files,
        Resource::Packages,
    ];

    fn path(self) -> Option<&'static str> {
        match self {
            Resource::Root => None,
            Resource::Repos => Some("repos"),
            Resource::Snapshots => Some("snapshots"),
            Resource::Publish => Some("publish"),
            Resource::Files => Some("files"),
            Resource::Packages => Some("packages"),
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Base URL for every [`Resource`], resolved at configuration time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceTable {
    bases: Vec<Url>,
}

impl ResourceTable {
    fn new(host: &str) -> Result<Self> {
        let mut root = Url::parse(host)
            .map_err(|e| AptlyError::invalid_config(format!("host {host:?}: {e}")))?;
        if root.cannot_be_a_base() || root.host_str().is_none() {
            return Err(AptlyError::invalid_config(format!(
                "host {host:?} is not a hierarchical URL"
            )));
        }
        root.set_query(None);
        root.set_fragment(None);
        push_segments(&mut root, &["api"])?;

        let bases = Resource::ALL
            .iter()
            .map(|resource| {
                let mut url = root.clone();
                if let Some(path) = resource.path() {
                    push_segments(&mut url, &[path])?;
                }
                Ok(url)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { bases })
    }

    /// Base URL of `resource`, with no trailing slash.
    pub fn base(&self, resource: Resource) -> &Url {
        &self.bases[resource.index()]
    }
}

/// Append each segment to `url`, percent-encoding it on its own.
fn push_segments<S: AsRef<str>>(url: &mut Url, segments: &[S]) -> Result<()> {
    let mut path = url
        .path_segments_mut()
        .map_err(|()| AptlyError::invalid_config("host URL cannot carry a path"))?;
    path.pop_if_empty();
    for segment in segments {
        path.push(segment.as_ref());
    }
    Ok(())
}

/// Immutable settings shared by every call a client makes.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    host: String,
    verify_tls: bool,
    timeout: Duration,
    default_headers: Headers,
    resources: ResourceTable,
}

impl ClientConfig {
    pub fn builder(host: impl Into<String>) -> ClientConfigBuilder {
        ClientConfigBuilder::new(host)
    }

    /// Shorthand for a configuration with every option at its default.
    pub fn new(host: impl Into<String>) -> Result<Self> {
        Self::builder(host).build()
    }

    /// Normalized host: always carries a scheme, never a trailing slash.
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn verify_tls(&self) -> bool {
        self.verify_tls
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn default_headers(&self) -> &[(String, String)] {
        &self.default_headers
    }

    /// Value of the default header `name`, ignoring case.
    pub fn default_header(&self, name: &str) -> Option<&str> {
        crate::http::find_header(&self.default_headers, name)
    }

    pub fn resources(&self) -> &ResourceTable {
        &self.resources
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug, Clone)]
pub struct ClientConfigBuilder {
    host: String,
    username: Option<String>,
    password: Option<String>,
    verify_tls: bool,
    timeout: Duration,
    headers: Headers,
}

impl ClientConfigBuilder {
    fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            username: None,
            password: None,
            verify_tls: true,
            timeout: DEFAULT_TIMEOUT,
            headers: Vec::new(),
        }
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn credentials(self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username(username).password(password)
    }

    pub fn verify_tls(mut self, verify: bool) -> Self {
        self.verify_tls = verify;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Add a header sent with every request. A later header of the same
    /// name replaces an earlier one.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.headers.retain(|(existing, _)| !existing.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
        self
    }

    pub fn build(self) -> Result<ClientConfig> {
        let host = normalize_host(&self.host)?;
        let resources = ResourceTable::new(&host)?;

        let mut default_headers = self.headers;
        // Only a complete pair yields credentials; half of one is ignored.
        if let (Some(user), Some(pass)) = (&self.username, &self.password) {
            let token = base64::engine::general_purpose::STANDARD.encode(format!("{user}:{pass}"));
            default_headers.retain(|(name, _)| !name.eq_ignore_ascii_case("Authorization"));
            default_headers.push(("Authorization".to_string(), format!("Basic {token}")));
        }

        Ok(ClientConfig {
            host,
            verify_tls: self.verify_tls,
            timeout: self.timeout,
            default_headers,
            resources,
        })
    }
}

fn normalize_host(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(AptlyError::invalid_config("host may not be empty"));
    }
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("{DEFAULT_SCHEME}{trimmed}"))
    }
}

/// Deserializable form of [`ClientConfig`] for embedding in an
/// application's own configuration file.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ClientSettings {
    pub host: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub verify_tls: Option<bool>,
    pub timeout_secs: Option<u64>,
    pub headers: BTreeMap<String, String>,
}

impl TryFrom<ClientSettings> for ClientConfig {
    type Error = AptlyError;

    fn try_from(settings: ClientSettings) -> Result<Self> {
        let mut builder = ClientConfig::builder(settings.host);
        if let Some(user) = settings.username {
            builder = builder.username(user);
        }
        if let Some(pass) = settings.password {
            builder = builder.password(pass);
        }
        if let Some(verify) = settings.verify_tls {
            builder = builder.verify_tls(verify);
        }
        if let Some(secs) = settings.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        for (name, value) in settings.headers {
            builder = builder.header(name, value);
        }
        builder.build()
    }
}
