//! Request options and response models for the Aptly API.
//!
//! # Design
//! Every endpoint that takes optional parameters has its own options struct.
//! Body options serialize with Aptly's PascalCase field names and skip unset
//! fields, so an options value with nothing set serializes to `{}` and the
//! dispatcher sends no body at all. Query options are turned into pairs by
//! `query_pairs`; boolean flags are only sent when set, as `1`.
//!
//! Response models are optional conveniences for `decode`; facade methods
//! always return the raw `serde_json::Value`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Query-string pairs contributed by an options struct.
pub trait QueryOptions {
    fn query_pairs(&self) -> Vec<(String, String)>;
}

fn flag(pairs: &mut Vec<(String, String)>, name: &str, set: bool) {
    if set {
        pairs.push((name.to_string(), "1".to_string()));
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

// ---------------------------------------------------------------------------
// Local repositories
// ---------------------------------------------------------------------------

/// Body of `POST /api/repos`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct CreateRepo {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_distribution: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_component: Option<String>,
    /// Seed the new repository with the contents of this snapshot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_snapshot: Option<String>,
}

impl CreateRepo {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Body of `PUT /api/repos/:name`. Unset fields stay unchanged on the server.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct EditRepo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_distribution: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_component: Option<String>,
}

/// Query of `DELETE /api/repos/:name`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteRepo {
    /// Delete even if snapshots were created from the repository.
    pub force: bool,
}

impl QueryOptions for DeleteRepo {
    fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        flag(&mut pairs, "force", self.force);
        pairs
    }
}

/// Level of detail for package listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageFormat {
    /// Package keys only (the server default).
    Compact,
    /// Full package stanzas.
    Details,
}

impl PackageFormat {
    fn as_str(self) -> &'static str {
        match self {
            PackageFormat::Compact => "compact",
            PackageFormat::Details => "details",
        }
    }
}

/// Query of the package-listing endpoints of repositories and snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageQuery {
    /// Aptly package query, e.g. `Name (~ ^lib)`.
    pub q: Option<String>,
    /// Also include dependencies of matched packages.
    pub with_deps: bool,
    pub format: Option<PackageFormat>,
}

impl QueryOptions for PackageQuery {
    fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(q) = &self.q {
            pairs.push(("q".to_string(), q.clone()));
        }
        flag(&mut pairs, "withDeps", self.with_deps);
        if let Some(format) = self.format {
            pairs.push(("format".to_string(), format.as_str().to_string()));
        }
        pairs
    }
}

/// Options of `POST /api/repos/:name/file/:dir[/:file]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddUploaded {
    /// Import only this file from the upload directory.
    pub file: Option<String>,
    /// Keep the uploaded files after a successful import.
    pub no_remove: bool,
    /// Replace conflicting packages already in the repository.
    pub force_replace: bool,
}

impl QueryOptions for AddUploaded {
    fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        flag(&mut pairs, "noRemove", self.no_remove);
        flag(&mut pairs, "forceReplace", self.force_replace);
        pairs
    }
}

/// Body of the add/remove-by-key endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase", default)]
pub struct PackageRefs {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub package_refs: Vec<String>,
}

impl PackageRefs {
    pub fn new<I, S>(refs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            package_refs: refs.into_iter().map(Into::into).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

/// Body of `POST /api/repos/:name/snapshots`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct CreateSnapshot {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CreateSnapshot {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }
}

/// Body of `POST /api/snapshots`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase", default)]
pub struct CreateSnapshotFromPackages {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub source_snapshots: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub package_refs: Vec<String>,
}

/// Body of `PUT /api/snapshots/:name`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateSnapshot {
    /// New name for the snapshot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Query of `DELETE /api/snapshots/:name`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteSnapshot {
    /// Delete even if other snapshots were created from this one.
    pub force: bool,
}

impl QueryOptions for DeleteSnapshot {
    fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        flag(&mut pairs, "force", self.force);
        pairs
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotSort {
    Name,
    Time,
}

/// Query of `GET /api/snapshots`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotListQuery {
    pub sort: Option<SnapshotSort>,
}

impl QueryOptions for SnapshotListQuery {
    fn query_pairs(&self) -> Vec<(String, String)> {
        match self.sort {
            Some(SnapshotSort::Name) => vec![("sort".to_string(), "name".to_string())],
            Some(SnapshotSort::Time) => vec![("sort".to_string(), "time".to_string())],
            None => Vec::new(),
        }
    }
}

/// Query of `GET /api/snapshots/:left/diff/:right`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffQuery {
    /// Report only packages present on both sides with different versions.
    pub only_matching: bool,
}

impl QueryOptions for DiffQuery {
    fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        flag(&mut pairs, "onlyMatching", self.only_matching);
        pairs
    }
}

// ---------------------------------------------------------------------------
// Publishing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Local,
    Snapshot,
}

/// A repository or snapshot published as one component.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct PublishSource {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    pub name: String,
}

impl PublishSource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            component: None,
            name: name.into(),
        }
    }

    pub fn component(mut self, component: impl Into<String>) -> Self {
        self.component = Some(component.into());
        self
    }
}

/// GPG signing options shared by publish and update.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase", default)]
pub struct Signing {
    #[serde(skip_serializing_if = "is_false")]
    pub skip: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub batch: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gpg_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyring: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_keyring: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passphrase: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passphrase_file: Option<String>,
}

impl Signing {
    /// Publish without signing.
    pub fn skip() -> Self {
        Self {
            skip: true,
            ..Self::default()
        }
    }
}

/// Options of `POST /api/publish[/:prefix]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase", default)]
pub struct Publish {
    /// Publishing prefix, escaped before it becomes a path segment.
    #[serde(skip)]
    pub prefix: Option<String>,
    pub source_kind: SourceKind,
    pub sources: Vec<PublishSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distribution: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(skip_serializing_if = "is_false")]
    pub not_automatic: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub but_automatic_upgrades: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub force_overwrite: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub architectures: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signing: Option<Signing>,
    #[serde(skip_serializing_if = "is_false")]
    pub acquire_by_hash: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub skip_contents: bool,
}

/// Options of `PUT /api/publish[/:prefix]/:distribution`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase", default)]
pub struct UpdatePublish {
    #[serde(skip)]
    pub prefix: Option<String>,
    /// Switch components to these snapshots (snapshot publishes only).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub snapshots: Vec<PublishSource>,
    #[serde(skip_serializing_if = "is_false")]
    pub force_overwrite: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signing: Option<Signing>,
    #[serde(skip_serializing_if = "is_false")]
    pub acquire_by_hash: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub skip_contents: bool,
}

/// Options of `DELETE /api/publish[/:prefix]/:distribution`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletePublish {
    pub prefix: Option<String>,
    /// Remove the published files even if cleanup fails.
    pub force: bool,
}

impl QueryOptions for DeletePublish {
    fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        flag(&mut pairs, "force", self.force);
        pairs
    }
}

// ---------------------------------------------------------------------------
// Graph
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GraphFormat {
    #[default]
    Png,
    Svg,
}

impl GraphFormat {
    pub fn extension(self) -> &'static str {
        match self {
            GraphFormat::Png => "png",
            GraphFormat::Svg => "svg",
        }
    }
}

/// Where and in which format to save the object graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphRequest {
    /// Destination file; `graph.<ext>` in the working directory if unset.
    pub path: Option<PathBuf>,
    pub format: GraphFormat,
}

impl GraphRequest {
    pub fn destination(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("graph.{}", self.format.extension())))
    }
}

// ---------------------------------------------------------------------------
// Response models
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase", default)]
pub struct LocalRepo {
    pub name: String,
    pub comment: String,
    pub default_distribution: String,
    pub default_component: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase", default)]
pub struct Snapshot {
    pub name: String,
    pub description: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase", default)]
pub struct PublishedRepo {
    pub prefix: String,
    pub distribution: String,
    pub source_kind: String,
    pub sources: Vec<PublishSource>,
    pub architectures: Vec<String>,
    pub label: String,
    pub origin: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase", default)]
pub struct Version {
    pub version: String,
}

/// Result of importing uploaded files into a repository.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase", default)]
pub struct AddPackagesReport {
    pub failed_files: Vec<String>,
    pub report: ImportReport,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase", default)]
pub struct ImportReport {
    pub warnings: Vec<String>,
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_repo_serializes_only_set_fields() {
        let body = serde_json::to_value(CreateRepo::named("repo1")).unwrap();
        assert_eq!(body, json!({"Name": "repo1"}));
    }

    #[test]
    fn empty_edit_serializes_to_empty_object() {
        let body = serde_json::to_value(EditRepo::default()).unwrap();
        assert_eq!(body, json!({}));
    }

    #[test]
    fn package_query_pairs_follow_aptly_names() {
        let query = PackageQuery {
            q: Some("Name (~ ^lib)".to_string()),
            with_deps: true,
            format: Some(PackageFormat::Details),
        };
        assert_eq!(
            query.query_pairs(),
            vec![
                ("q".to_string(), "Name (~ ^lib)".to_string()),
                ("withDeps".to_string(), "1".to_string()),
                ("format".to_string(), "details".to_string()),
            ]
        );
        assert!(PackageQuery::default().query_pairs().is_empty());
    }

    #[test]
    fn publish_prefix_never_reaches_the_body() {
        let publish = Publish {
            prefix: Some("ppa".to_string()),
            source_kind: SourceKind::Snapshot,
            sources: vec![PublishSource::new("snap1").component("main")],
            distribution: Some("bookworm".to_string()),
            signing: Some(Signing::skip()),
            ..Publish::default()
        };
        let body = serde_json::to_value(&publish).unwrap();
        assert_eq!(
            body,
            json!({
                "SourceKind": "snapshot",
                "Sources": [{"Component": "main", "Name": "snap1"}],
                "Distribution": "bookworm",
                "Signing": {"Skip": true}
            })
        );
    }

    #[test]
    fn graph_destination_defaults_to_extension() {
        assert_eq!(GraphRequest::default().destination(), PathBuf::from("graph.png"));
        let svg = GraphRequest {
            path: None,
            format: GraphFormat::Svg,
        };
        assert_eq!(svg.destination(), PathBuf::from("graph.svg"));
    }

    #[test]
    fn report_decodes_with_missing_fields() {
        let report: AddPackagesReport =
            serde_json::from_value(json!({"FailedFiles": [], "Report": {"Added": ["a_1_amd64 added"]}}))
                .unwrap();
        assert!(report.failed_files.is_empty());
        assert_eq!(report.report.added.len(), 1);
    }
}
