use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{decode_prefix, json_body, ApiError, ApiResult, Db, PublishedRepo, Source, Store};

/// Prefix used when a request names none.
const ROOT_PREFIX: &str = ".";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreatePublish {
    #[serde(default)]
    pub source_kind: String,
    #[serde(default)]
    pub sources: Vec<Source>,
    pub distribution: Option<String>,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub origin: String,
    #[serde(default)]
    pub architectures: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdatePublish {
    #[serde(default)]
    pub snapshots: Vec<Source>,
}

pub async fn list(State(db): State<Db>) -> Json<Vec<PublishedRepo>> {
    Json(db.read().await.published.clone())
}

pub async fn create_at_root(
    State(db): State<Db>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<PublishedRepo>)> {
    create_published(&db, ROOT_PREFIX.to_string(), &body).await
}

pub async fn create(
    State(db): State<Db>,
    Path(prefix): Path<String>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<PublishedRepo>)> {
    create_published(&db, decode_prefix(&prefix), &body).await
}

async fn create_published(
    db: &Db,
    prefix: String,
    body: &[u8],
) -> ApiResult<(StatusCode, Json<PublishedRepo>)> {
    let input: CreatePublish = json_body(body)?;
    let mut store = db.write().await;

    if input.sources.is_empty() {
        return Err(ApiError::bad_request("unable to publish: no sources"));
    }
    for source in &input.sources {
        let exists = match input.source_kind.as_str() {
            "local" => store.repos.contains_key(&source.name),
            "snapshot" => store.snapshots.contains_key(&source.name),
            other => return Err(ApiError::bad_request(format!("unknown SourceKind {other}"))),
        };
        if !exists {
            return Err(ApiError::not_found(format!(
                "unable to publish: {} {} not found",
                input.source_kind, source.name
            )));
        }
    }

    let distribution = match input.distribution {
        Some(distribution) => distribution,
        None => default_distribution(&store, &input.sources, &input.source_kind),
    };
    if find_index(&store, &prefix, &distribution).is_some() {
        return Err(ApiError::conflict(format!(
            "prefix/distribution already used by another published repo: {prefix}/{distribution}"
        )));
    }

    let sources = input
        .sources
        .into_iter()
        .map(|source| Source {
            component: if source.component.is_empty() {
                "main".to_string()
            } else {
                source.component
            },
            name: source.name,
        })
        .collect();
    let published = PublishedRepo {
        prefix,
        distribution,
        source_kind: input.source_kind,
        sources,
        architectures: input.architectures,
        label: input.label,
        origin: input.origin,
    };
    store.published.push(published.clone());
    Ok((StatusCode::CREATED, Json(published)))
}

fn default_distribution(store: &Store, sources: &[Source], kind: &str) -> String {
    let from_repo = match (kind, sources.first()) {
        ("local", Some(source)) => store
            .repos
            .get(&source.name)
            .map(|repo| repo.default_distribution.clone()),
        _ => None,
    };
    from_repo
        .filter(|distribution| !distribution.is_empty())
        .unwrap_or_else(|| "stable".to_string())
}

fn find_index(store: &Store, prefix: &str, distribution: &str) -> Option<usize> {
    store
        .published
        .iter()
        .position(|p| p.prefix == prefix && p.distribution == distribution)
}

fn not_published(prefix: &str, distribution: &str) -> ApiError {
    ApiError::not_found(format!(
        "published repo with prefix/distribution {prefix}/{distribution} not found"
    ))
}

pub async fn update_at_root(
    State(db): State<Db>,
    Path(distribution): Path<String>,
    body: Bytes,
) -> ApiResult<Json<PublishedRepo>> {
    update_published(&db, ROOT_PREFIX, &distribution, &body).await
}

pub async fn update(
    State(db): State<Db>,
    Path((prefix, distribution)): Path<(String, String)>,
    body: Bytes,
) -> ApiResult<Json<PublishedRepo>> {
    update_published(&db, &decode_prefix(&prefix), &distribution, &body).await
}

async fn update_published(
    db: &Db,
    prefix: &str,
    distribution: &str,
    body: &[u8],
) -> ApiResult<Json<PublishedRepo>> {
    let input: UpdatePublish = json_body(body)?;
    let mut store = db.write().await;
    let index = find_index(&store, prefix, distribution)
        .ok_or_else(|| not_published(prefix, distribution))?;

    if !input.snapshots.is_empty() {
        if store.published[index].source_kind != "snapshot" {
            return Err(ApiError::bad_request(
                "snapshots can only be switched on a snapshot publish",
            ));
        }
        if let Some(missing) = input
            .snapshots
            .iter()
            .find(|s| !store.snapshots.contains_key(&s.name))
        {
            return Err(ApiError::not_found(format!(
                "snapshot with name {} not found",
                missing.name
            )));
        }
        let published = &mut store.published[index];
        for switch in input.snapshots {
            let component = if switch.component.is_empty() {
                "main".to_string()
            } else {
                switch.component
            };
            match published.sources.iter_mut().find(|s| s.component == component) {
                Some(source) => source.name = switch.name,
                None => {
                    return Err(ApiError::not_found(format!(
                        "component {component} is not in published repository"
                    )))
                }
            }
        }
    }
    Ok(Json(store.published[index].clone()))
}

pub async fn remove_at_root(
    State(db): State<Db>,
    Path(distribution): Path<String>,
) -> ApiResult<Json<Value>> {
    remove_published(&db, ROOT_PREFIX, &distribution).await
}

pub async fn remove(
    State(db): State<Db>,
    Path((prefix, distribution)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    remove_published(&db, &decode_prefix(&prefix), &distribution).await
}

async fn remove_published(db: &Db, prefix: &str, distribution: &str) -> ApiResult<Json<Value>> {
    let mut store = db.write().await;
    let index = find_index(&store, prefix, distribution)
        .ok_or_else(|| not_published(prefix, distribution))?;
    store.published.remove(index);
    Ok(Json(json!({})))
}
