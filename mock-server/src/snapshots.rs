use std::collections::{BTreeMap, BTreeSet};
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::repos::{find_repo, render_packages};
use crate::{flag, json_body, ApiError, ApiResult, Db, Snapshot, Store};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateSnapshot {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub source_snapshots: Vec<String>,
    #[serde(default)]
    pub package_refs: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateSnapshot {
    pub name: Option<String>,
    pub description: Option<String>,
}

fn find_snapshot<'a>(store: &'a Store, name: &str) -> ApiResult<&'a Snapshot> {
    store
        .snapshots
        .get(name)
        .ok_or_else(|| ApiError::not_found(format!("snapshot with name {name} not found")))
}

fn insert_snapshot(
    store: &mut Store,
    name: String,
    description: String,
    packages: BTreeSet<String>,
    source_repo: Option<String>,
    source_snapshots: Vec<String>,
) -> ApiResult<Snapshot> {
    if name.is_empty() {
        return Err(ApiError::bad_request("Name is required"));
    }
    if store.snapshots.contains_key(&name) {
        return Err(ApiError::conflict(format!("snapshot with name {name} already exists")));
    }
    let created = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    let snapshot = Snapshot {
        name,
        description,
        created_at: created.to_string(),
        sequence: store.next_sequence(),
        packages,
        source_repo,
        source_snapshots,
    };
    store.snapshots.insert(snapshot.name.clone(), snapshot.clone());
    Ok(snapshot)
}

pub async fn create_from_repo(
    State(db): State<Db>,
    Path(repo): Path<String>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Snapshot>)> {
    let input: CreateSnapshot = json_body(&body)?;
    let mut store = db.write().await;
    find_repo(&store, &repo)?;
    let packages = store.repo_packages.get(&repo).cloned().unwrap_or_default();
    let description = if input.description.is_empty() {
        format!("Snapshot from local repo [{repo}]")
    } else {
        input.description
    };
    let snapshot = insert_snapshot(&mut store, input.name, description, packages, Some(repo), Vec::new())?;
    Ok((StatusCode::CREATED, Json(snapshot)))
}

pub async fn create_from_packages(
    State(db): State<Db>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Snapshot>)> {
    let input: CreateSnapshot = json_body(&body)?;
    let mut store = db.write().await;
    for source in &input.source_snapshots {
        find_snapshot(&store, source)?;
    }
    if let Some(missing) = input.package_refs.iter().find(|key| !store.packages.contains_key(*key)) {
        return Err(ApiError::not_found(format!("package {missing} not found")));
    }
    let packages = input.package_refs.into_iter().collect();
    let snapshot = insert_snapshot(
        &mut store,
        input.name,
        input.description,
        packages,
        None,
        input.source_snapshots,
    )?;
    Ok((StatusCode::CREATED, Json(snapshot)))
}

pub async fn list(
    State(db): State<Db>,
    Query(query): Query<BTreeMap<String, String>>,
) -> Json<Vec<Snapshot>> {
    let store = db.read().await;
    let mut snapshots: Vec<Snapshot> = store.snapshots.values().cloned().collect();
    if query.get("sort").map(String::as_str) == Some("time") {
        snapshots.sort_by_key(|s| s.sequence);
    }
    Json(snapshots)
}

pub async fn show(State(db): State<Db>, Path(name): Path<String>) -> ApiResult<Json<Snapshot>> {
    let store = db.read().await;
    find_snapshot(&store, &name).cloned().map(Json)
}

pub async fn update(
    State(db): State<Db>,
    Path(name): Path<String>,
    body: Bytes,
) -> ApiResult<Json<Snapshot>> {
    let input: UpdateSnapshot = json_body(&body)?;
    let mut store = db.write().await;
    let mut snapshot = find_snapshot(&store, &name)?.clone();
    if let Some(new_name) = input.name.filter(|n| *n != name) {
        if store.snapshots.contains_key(&new_name) {
            return Err(ApiError::conflict(format!(
                "snapshot with name {new_name} already exists"
            )));
        }
        store.snapshots.remove(&name);
        snapshot.name = new_name;
    }
    if let Some(description) = input.description {
        snapshot.description = description;
    }
    store.snapshots.insert(snapshot.name.clone(), snapshot.clone());
    Ok(Json(snapshot))
}

pub async fn remove(
    State(db): State<Db>,
    Path(name): Path<String>,
    Query(query): Query<BTreeMap<String, String>>,
) -> ApiResult<Json<Value>> {
    let mut store = db.write().await;
    find_snapshot(&store, &name)?;
    if store.is_published("snapshot", &name) {
        return Err(ApiError::conflict(format!(
            "unable to drop: snapshot {name} is published"
        )));
    }
    let is_source = store
        .snapshots
        .values()
        .any(|s| s.source_snapshots.contains(&name));
    if is_source && !flag(&query, "force") {
        return Err(ApiError::conflict(format!(
            "won't delete snapshot {name} that was used as source for other snapshots, use force to override"
        )));
    }
    store.snapshots.remove(&name);
    Ok(Json(json!({})))
}

pub async fn packages(
    State(db): State<Db>,
    Path(name): Path<String>,
    Query(query): Query<BTreeMap<String, String>>,
) -> ApiResult<Json<Value>> {
    let store = db.read().await;
    let keys = find_snapshot(&store, &name)?.packages.clone();
    Ok(Json(render_packages(&store, &keys, &query)))
}

/// Compare by `(architecture, name)`: one row per package that differs.
pub async fn diff(
    State(db): State<Db>,
    Path((left, right)): Path<(String, String)>,
    Query(query): Query<BTreeMap<String, String>>,
) -> ApiResult<Json<Value>> {
    let store = db.read().await;
    let index = |name: &str| -> ApiResult<BTreeMap<(String, String), String>> {
        Ok(find_snapshot(&store, name)?
            .packages
            .iter()
            .filter_map(|key| store.packages.get(key))
            .map(|pkg| ((pkg.architecture.clone(), pkg.package.clone()), pkg.key.clone()))
            .collect())
    };
    let left_index = index(&left)?;
    let right_index = index(&right)?;
    let only_matching = flag(&query, "onlyMatching");

    let names: BTreeSet<_> = left_index.keys().chain(right_index.keys()).collect();
    let rows: Vec<Value> = names
        .into_iter()
        .filter_map(|name| {
            let l = left_index.get(name);
            let r = right_index.get(name);
            if l == r || (only_matching && (l.is_none() || r.is_none())) {
                return None;
            }
            Some(json!({ "Left": l, "Right": r }))
        })
        .collect();
    Ok(Json(json!(rows)))
}
