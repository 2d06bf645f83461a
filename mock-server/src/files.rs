use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use serde_json::{json, Value};

use crate::{ApiError, ApiResult, Db};

pub async fn list_dirs(State(db): State<Db>) -> Json<Vec<String>> {
    Json(db.read().await.uploads.keys().cloned().collect())
}

pub async fn list_files(State(db): State<Db>, Path(dir): Path<String>) -> ApiResult<Json<Vec<String>>> {
    let store = db.read().await;
    store
        .uploads
        .get(&dir)
        .map(|files| Json(files.keys().cloned().collect()))
        .ok_or_else(|| ApiError::not_found(format!("upload directory {dir} not found")))
}

/// Store every `file` field; answers with `dir/name` per stored file, in
/// the order received.
pub async fn upload(
    State(db): State<Db>,
    Path(dir): Path<String>,
    mut multipart: Multipart,
) -> ApiResult<Json<Vec<String>>> {
    let mut received = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.to_string()))?
    {
        let Some(file_name) = field.file_name().map(str::to_owned) else {
            continue;
        };
        let content = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(e.to_string()))?;
        received.push((file_name, content.to_vec()));
    }
    if received.is_empty() {
        return Err(ApiError::bad_request("no files uploaded"));
    }

    let mut store = db.write().await;
    let files = store.uploads.entry(dir.clone()).or_default();
    let mut stored = Vec::new();
    for (file_name, content) in received {
        stored.push(format!("{dir}/{file_name}"));
        files.insert(file_name, content);
    }
    Ok(Json(stored))
}

pub async fn delete_dir(State(db): State<Db>, Path(dir): Path<String>) -> Json<Value> {
    db.write().await.uploads.remove(&dir);
    Json(json!({}))
}

pub async fn delete_file(
    State(db): State<Db>,
    Path((dir, file)): Path<(String, String)>,
) -> Json<Value> {
    let mut store = db.write().await;
    if let Some(files) = store.uploads.get_mut(&dir) {
        files.remove(&file);
    }
    Json(json!({}))
}
