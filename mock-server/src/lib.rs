//! In-memory stand-in for the Aptly REST API.
//!
//! Implements the endpoints `aptly-core` calls, with Aptly's JSON shapes and
//! `{"error": "..."}` bodies for failures. Packages are derived from uploaded
//! file names of the form `name_version_arch.deb`; file contents are only
//! hashed, never parsed.

mod files;
mod publish;
mod repos;
mod snapshots;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use axum::{
    extract::Path,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;
use sha2::{Digest, Sha256};
use tokio::{net::TcpListener, sync::RwLock};

/// Version reported by `GET /api/version`.
pub const APTLY_VERSION: &str = "1.5.0";

/// 1x1 transparent PNG served as the object graph.
const GRAPH_PNG: &[u8] = &[
    0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1f, 0x15, 0xc4,
    0x89, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9c, 0x63, 0x00, 0x01, 0x00, 0x00,
    0x05, 0x00, 0x01, 0x0d, 0x0a, 0x2d, 0xb4, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4e, 0x44, 0xae,
    0x42, 0x60, 0x82,
];

const GRAPH_SVG: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="1" height="1"/>"#;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct LocalRepo {
    pub name: String,
    pub comment: String,
    pub default_distribution: String,
    pub default_component: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct Package {
    pub key: String,
    pub short_key: String,
    pub files_hash: String,
    pub package: String,
    pub version: String,
    pub architecture: String,
}

impl Package {
    /// Derive a package from an uploaded `name_version_arch.deb` file.
    pub fn from_upload(file_name: &str, content: &[u8]) -> Option<Self> {
        let stem = file_name.strip_suffix(".deb")?;
        let mut fields = stem.splitn(3, '_');
        let (name, version, arch) = (fields.next()?, fields.next()?, fields.next()?);
        if name.is_empty() || version.is_empty() || arch.is_empty() {
            return None;
        }
        let files_hash = hex::encode(&Sha256::digest(content)[..8]);
        Some(Self {
            key: format!("P{arch} {name} {version} {files_hash}"),
            short_key: format!("P{arch} {name} {version}"),
            files_hash,
            package: name.to_string(),
            version: version.to_string(),
            architecture: arch.to_string(),
        })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct Snapshot {
    pub name: String,
    pub description: String,
    pub created_at: String,
    #[serde(skip)]
    pub sequence: u64,
    #[serde(skip)]
    pub packages: BTreeSet<String>,
    /// Local repository the snapshot was taken from, if any.
    #[serde(skip)]
    pub source_repo: Option<String>,
    #[serde(skip)]
    pub source_snapshots: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct Source {
    #[serde(default)]
    pub component: String,
    pub name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct PublishedRepo {
    pub prefix: String,
    pub distribution: String,
    pub source_kind: String,
    pub sources: Vec<Source>,
    pub architectures: Vec<String>,
    pub label: String,
    pub origin: String,
}

#[derive(Debug, Default)]
pub struct Store {
    pub repos: BTreeMap<String, LocalRepo>,
    pub repo_packages: BTreeMap<String, BTreeSet<String>>,
    pub packages: BTreeMap<String, Package>,
    pub snapshots: BTreeMap<String, Snapshot>,
    pub uploads: BTreeMap<String, BTreeMap<String, Vec<u8>>>,
    pub published: Vec<PublishedRepo>,
    pub sequence: u64,
}

impl Store {
    fn next_sequence(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }

    fn is_published(&self, kind: &str, name: &str) -> bool {
        self.published
            .iter()
            .any(|p| p.source_kind == kind && p.sources.iter().any(|s| s.name == name))
    }
}

pub type Db = Arc<RwLock<Store>>;

/// Aptly-style failure: a status plus `{"error": message}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Decode an optional JSON body; a missing body means all defaults.
pub(crate) fn json_body<T: DeserializeOwned + Default>(bytes: &[u8]) -> ApiResult<T> {
    if bytes.is_empty() {
        return Ok(T::default());
    }
    serde_json::from_slice(bytes).map_err(|e| ApiError::bad_request(e.to_string()))
}

/// `true` for Aptly's boolean query flags (`1`, `true`, `yes`).
pub(crate) fn flag(query: &BTreeMap<String, String>, name: &str) -> bool {
    matches!(query.get(name).map(String::as_str), Some("1" | "true" | "yes"))
}

/// Reverse of the client-side prefix escaping: `:.` is the root, `__` a
/// literal underscore, and `_` a slash.
///
/// Decodes the way aptly does: every `_` becomes `/`, then each `//` pair,
/// scanned left to right, becomes `_`. Escaping is not injective, so `___`
/// (produced by both `/_` and `_/`) always decodes to `_/`.
pub fn decode_prefix(token: &str) -> String {
    if token == ":." {
        return ".".to_string();
    }
    token.replace('_', "/").replace("//", "_")
}

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::default()));
    Router::new()
        .route("/api/version", get(version))
        .route("/api/{graph}", get(graph))
        .route("/api/repos", get(repos::list).post(repos::create))
        .route(
            "/api/repos/{name}",
            get(repos::show).put(repos::edit).delete(repos::remove),
        )
        .route(
            "/api/repos/{name}/packages",
            get(repos::packages)
                .post(repos::add_by_key)
                .delete(repos::remove_by_key),
        )
        .route("/api/repos/{name}/file/{dir}", post(repos::import_dir))
        .route("/api/repos/{name}/file/{dir}/{file}", post(repos::import_file))
        .route("/api/repos/{name}/snapshots", post(snapshots::create_from_repo))
        .route("/api/packages/{key}", get(repos::show_package))
        .route("/api/files", get(files::list_dirs))
        .route(
            "/api/files/{dir}",
            get(files::list_files).post(files::upload).delete(files::delete_dir),
        )
        .route("/api/files/{dir}/{file}", axum::routing::delete(files::delete_file))
        .route("/api/publish", get(publish::list).post(publish::create_at_root))
        .route(
            "/api/publish/{segment}",
            post(publish::create)
                .put(publish::update_at_root)
                .delete(publish::remove_at_root),
        )
        .route(
            "/api/publish/{prefix}/{distribution}",
            put(publish::update).delete(publish::remove),
        )
        .route("/api/snapshots", get(snapshots::list).post(snapshots::create_from_packages))
        .route(
            "/api/snapshots/{name}",
            get(snapshots::show).put(snapshots::update).delete(snapshots::remove),
        )
        .route("/api/snapshots/{name}/packages", get(snapshots::packages))
        .route("/api/snapshots/{left}/diff/{right}", get(snapshots::diff))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn version() -> Json<serde_json::Value> {
    Json(json!({ "Version": APTLY_VERSION }))
}

async fn graph(Path(file): Path<String>) -> Response {
    match file.as_str() {
        "graph.png" => ([(header::CONTENT_TYPE, "image/png")], GRAPH_PNG).into_response(),
        "graph.svg" => ([(header::CONTENT_TYPE, "image/svg+xml")], GRAPH_SVG).into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}
