use std::collections::{BTreeMap, BTreeSet};

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{flag, json_body, ApiError, ApiResult, Db, LocalRepo, Package, Store};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateRepo {
    pub name: String,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub default_distribution: String,
    #[serde(default)]
    pub default_component: String,
    pub from_snapshot: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EditRepo {
    pub comment: Option<String>,
    pub default_distribution: Option<String>,
    pub default_component: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PackageRefs {
    #[serde(default)]
    pub package_refs: Vec<String>,
}

pub async fn list(State(db): State<Db>) -> Json<Vec<LocalRepo>> {
    Json(db.read().await.repos.values().cloned().collect())
}

pub async fn create(State(db): State<Db>, body: Bytes) -> ApiResult<(StatusCode, Json<LocalRepo>)> {
    let input: CreateRepo = json_body(&body)?;
    if input.name.is_empty() {
        return Err(ApiError::bad_request("Name is required"));
    }
    let mut store = db.write().await;
    if store.repos.contains_key(&input.name) {
        return Err(ApiError::conflict(format!(
            "local repo with name {} already exists",
            input.name
        )));
    }
    let packages = match &input.from_snapshot {
        Some(snapshot) => store
            .snapshots
            .get(snapshot)
            .map(|s| s.packages.clone())
            .ok_or_else(|| ApiError::not_found(format!("snapshot with name {snapshot} not found")))?,
        None => BTreeSet::new(),
    };
    let repo = LocalRepo {
        name: input.name,
        comment: input.comment,
        default_distribution: input.default_distribution,
        default_component: input.default_component,
    };
    store.repo_packages.insert(repo.name.clone(), packages);
    store.repos.insert(repo.name.clone(), repo.clone());
    Ok((StatusCode::CREATED, Json(repo)))
}

pub(crate) fn find_repo<'a>(store: &'a Store, name: &str) -> ApiResult<&'a LocalRepo> {
    store
        .repos
        .get(name)
        .ok_or_else(|| ApiError::not_found(format!("local repo with name {name} not found")))
}

pub async fn show(State(db): State<Db>, Path(name): Path<String>) -> ApiResult<Json<LocalRepo>> {
    let store = db.read().await;
    find_repo(&store, &name).cloned().map(Json)
}

pub async fn edit(
    State(db): State<Db>,
    Path(name): Path<String>,
    body: Bytes,
) -> ApiResult<Json<LocalRepo>> {
    let input: EditRepo = json_body(&body)?;
    let mut store = db.write().await;
    let repo = store
        .repos
        .get_mut(&name)
        .ok_or_else(|| ApiError::not_found(format!("local repo with name {name} not found")))?;
    if let Some(comment) = input.comment {
        repo.comment = comment;
    }
    if let Some(distribution) = input.default_distribution {
        repo.default_distribution = distribution;
    }
    if let Some(component) = input.default_component {
        repo.default_component = component;
    }
    Ok(Json(repo.clone()))
}

pub async fn remove(
    State(db): State<Db>,
    Path(name): Path<String>,
    Query(query): Query<BTreeMap<String, String>>,
) -> ApiResult<Json<Value>> {
    let mut store = db.write().await;
    find_repo(&store, &name)?;
    if store.is_published("local", &name) {
        return Err(ApiError::conflict(format!(
            "unable to drop, local repo {name} is published"
        )));
    }
    let has_snapshots = store
        .snapshots
        .values()
        .any(|s| s.source_repo.as_deref() == Some(name.as_str()));
    if has_snapshots && !flag(&query, "force") {
        return Err(ApiError::conflict(format!(
            "local repo {name} has snapshots, use force to drop it"
        )));
    }
    store.repos.remove(&name);
    store.repo_packages.remove(&name);
    Ok(Json(json!({})))
}

/// Render a set of package keys the way aptly lists them.
pub(crate) fn render_packages(
    store: &Store,
    keys: &BTreeSet<String>,
    query: &BTreeMap<String, String>,
) -> Value {
    let needle = query.get("q").map(String::as_str).unwrap_or_default();
    let matched = keys
        .iter()
        .filter_map(|key| store.packages.get(key))
        .filter(|pkg| needle.is_empty() || pkg.package.contains(needle));
    if query.get("format").map(String::as_str) == Some("details") {
        json!(matched.collect::<Vec<_>>())
    } else {
        json!(matched.map(|pkg| pkg.key.clone()).collect::<Vec<_>>())
    }
}

pub async fn packages(
    State(db): State<Db>,
    Path(name): Path<String>,
    Query(query): Query<BTreeMap<String, String>>,
) -> ApiResult<Json<Value>> {
    let store = db.read().await;
    find_repo(&store, &name)?;
    let keys = store.repo_packages.get(&name).cloned().unwrap_or_default();
    Ok(Json(render_packages(&store, &keys, &query)))
}

pub async fn add_by_key(
    State(db): State<Db>,
    Path(name): Path<String>,
    body: Bytes,
) -> ApiResult<Json<LocalRepo>> {
    let input: PackageRefs = json_body(&body)?;
    let mut store = db.write().await;
    let repo = find_repo(&store, &name)?.clone();
    if let Some(missing) = input.package_refs.iter().find(|key| !store.packages.contains_key(*key)) {
        return Err(ApiError::not_found(format!("package {missing} not found")));
    }
    store
        .repo_packages
        .entry(name)
        .or_default()
        .extend(input.package_refs);
    Ok(Json(repo))
}

pub async fn remove_by_key(
    State(db): State<Db>,
    Path(name): Path<String>,
    body: Bytes,
) -> ApiResult<Json<LocalRepo>> {
    let input: PackageRefs = json_body(&body)?;
    let mut store = db.write().await;
    let repo = find_repo(&store, &name)?.clone();
    if let Some(keys) = store.repo_packages.get_mut(&name) {
        for key in &input.package_refs {
            keys.remove(key);
        }
    }
    Ok(Json(repo))
}

pub async fn import_dir(
    State(db): State<Db>,
    Path((name, dir)): Path<(String, String)>,
    Query(query): Query<BTreeMap<String, String>>,
) -> ApiResult<Json<Value>> {
    import(&db, &name, &dir, None, &query).await
}

pub async fn import_file(
    State(db): State<Db>,
    Path((name, dir, file)): Path<(String, String, String)>,
    Query(query): Query<BTreeMap<String, String>>,
) -> ApiResult<Json<Value>> {
    import(&db, &name, &dir, Some(file.as_str()), &query).await
}

async fn import(
    db: &Db,
    name: &str,
    dir: &str,
    only: Option<&str>,
    query: &BTreeMap<String, String>,
) -> ApiResult<Json<Value>> {
    let mut store = db.write().await;
    find_repo(&store, name)?;
    let uploaded = store
        .uploads
        .get(dir)
        .cloned()
        .ok_or_else(|| ApiError::not_found(format!("upload directory {dir} not found")))?;

    let mut failed = Vec::new();
    let mut added = Vec::new();
    let mut imported = Vec::new();
    for (file_name, content) in &uploaded {
        if only.is_some_and(|only| only != file_name.as_str()) {
            continue;
        }
        match Package::from_upload(file_name, content) {
            Some(pkg) => {
                added.push(format!("{}_{}_{} added", pkg.package, pkg.version, pkg.architecture));
                store
                    .repo_packages
                    .entry(name.to_string())
                    .or_default()
                    .insert(pkg.key.clone());
                store.packages.insert(pkg.key.clone(), pkg);
                imported.push(file_name.clone());
            }
            None => failed.push(format!("{dir}/{file_name}")),
        }
    }
    if let Some(only) = only {
        if !uploaded.contains_key(only) {
            failed.push(format!("{dir}/{only}"));
        }
    }

    if !flag(query, "noRemove") {
        if let Some(files) = store.uploads.get_mut(dir) {
            for file_name in &imported {
                files.remove(file_name);
            }
            if files.is_empty() {
                store.uploads.remove(dir);
            }
        }
    }

    Ok(Json(json!({
        "FailedFiles": failed,
        "Report": { "Warnings": [], "Added": added, "Removed": [] }
    })))
}

pub async fn show_package(State(db): State<Db>, Path(key): Path<String>) -> ApiResult<Json<Package>> {
    let store = db.read().await;
    store
        .packages
        .get(&key)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("package {key} not found")))
}
