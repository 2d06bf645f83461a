use axum::http::{self, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use mock_server::{app, LocalRepo, PublishedRepo, APTLY_VERSION};
use serde_json::Value;
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(String::new())
        .unwrap()
}

const BOUNDARY: &str = "mock-server-test";

fn upload_request(dir: &str, files: &[(&str, &str)]) -> Request<String> {
    let mut body = String::new();
    for (name, content) in files {
        body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{name}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n{content}\r\n"
        ));
    }
    body.push_str(&format!("--{BOUNDARY}--\r\n"));
    Request::builder()
        .method("POST")
        .uri(format!("/api/files/{dir}"))
        .header(
            http::header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(body)
        .unwrap()
}

async fn send(app: &Router, request: Request<String>) -> axum::response::Response {
    app.clone().oneshot(request).await.unwrap()
}

/// Upload `files` to `incoming` and import them into a fresh repo `name`.
async fn seeded(name: &str, files: &[(&str, &str)]) -> Router {
    let app = app();
    let resp = send(&app, json_request("POST", "/api/repos", &format!(r#"{{"Name":"{name}"}}"#))).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let resp = send(&app, upload_request("incoming", files)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let resp = send(&app, empty_request("POST", &format!("/api/repos/{name}/file/incoming"))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    app
}

// --- misc ---

#[tokio::test]
async fn version_reports_aptly_version() {
    let resp = send(&app(), empty_request("GET", "/api/version")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body["Version"], APTLY_VERSION);
}

#[tokio::test]
async fn graph_serves_png_and_svg() {
    let app = app();
    let resp = send(&app, empty_request("GET", "/api/graph.png")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[http::header::CONTENT_TYPE], "image/png");
    assert!(body_bytes(resp).await.starts_with(b"\x89PNG"));

    let resp = send(&app, empty_request("GET", "/api/graph.svg")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_bytes(resp).await.starts_with(b"<svg"));

    let resp = send(&app, empty_request("GET", "/api/graph.gif")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- repos ---

#[tokio::test]
async fn create_repo_returns_201() {
    let resp = send(
        &app(),
        json_request("POST", "/api/repos", r#"{"Name":"main","Comment":"primary"}"#),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let repo: LocalRepo = body_json(resp).await;
    assert_eq!(repo.name, "main");
    assert_eq!(repo.comment, "primary");
}

#[tokio::test]
async fn duplicate_repo_is_a_conflict_with_error_body() {
    let app = app();
    send(&app, json_request("POST", "/api/repos", r#"{"Name":"main"}"#)).await;
    let resp = send(&app, json_request("POST", "/api/repos", r#"{"Name":"main"}"#)).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = body_json(resp).await;
    assert!(body["error"].as_str().unwrap().contains("already exists"));
}

#[tokio::test]
async fn missing_repo_is_404_json() {
    let resp = send(&app(), empty_request("GET", "/api/repos/ghost")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = body_json(resp).await;
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn create_repo_without_name_is_400() {
    let resp = send(&app(), json_request("POST", "/api/repos", "{}")).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn edit_repo_changes_only_given_fields() {
    let app = app();
    send(
        &app,
        json_request("POST", "/api/repos", r#"{"Name":"main","Comment":"old","DefaultDistribution":"sid"}"#),
    )
    .await;
    let resp = send(&app, json_request("PUT", "/api/repos/main", r#"{"Comment":"new"}"#)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let repo: LocalRepo = body_json(resp).await;
    assert_eq!(repo.comment, "new");
    assert_eq!(repo.default_distribution, "sid");
}

// --- files and import ---

#[tokio::test]
async fn upload_answers_stored_paths_in_order() {
    let app = app();
    let resp = send(
        &app,
        upload_request("incoming", &[("b_1_all.deb", "b"), ("a_1_all.deb", "a")]),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let stored: Vec<String> = body_json(resp).await;
    assert_eq!(stored, ["incoming/b_1_all.deb", "incoming/a_1_all.deb"]);

    let resp = send(&app, empty_request("GET", "/api/files")).await;
    let dirs: Vec<String> = body_json(resp).await;
    assert_eq!(dirs, ["incoming"]);

    let resp = send(&app, empty_request("GET", "/api/files/incoming")).await;
    let files: Vec<String> = body_json(resp).await;
    assert_eq!(files, ["a_1_all.deb", "b_1_all.deb"]);
}

#[tokio::test]
async fn import_reports_failures_and_cleans_up() {
    let app = seeded("main", &[("hello_1.0_amd64.deb", "x"), ("notes.txt", "y")]).await;

    let resp = send(&app, empty_request("GET", "/api/repos/main/packages")).await;
    let keys: Vec<String> = body_json(resp).await;
    assert_eq!(keys.len(), 1);
    assert!(keys[0].starts_with("Pamd64 hello 1.0 "));

    // The unimportable file stays behind.
    let resp = send(&app, empty_request("GET", "/api/files/incoming")).await;
    let files: Vec<String> = body_json(resp).await;
    assert_eq!(files, ["notes.txt"]);
}

#[tokio::test]
async fn package_details_by_key() {
    let app = seeded("main", &[("hello_1.0_amd64.deb", "x")]).await;
    let resp = send(&app, empty_request("GET", "/api/repos/main/packages?format=details")).await;
    let details: Vec<Value> = body_json(resp).await;
    assert_eq!(details[0]["Package"], "hello");

    let key = details[0]["Key"].as_str().unwrap().replace(' ', "%20");
    let resp = send(&app, empty_request("GET", &format!("/api/packages/{key}"))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let pkg: Value = body_json(resp).await;
    assert_eq!(pkg["Architecture"], "amd64");
}

// --- snapshots ---

#[tokio::test]
async fn snapshot_lineage_blocks_repo_drop_without_force() {
    let app = seeded("main", &[("hello_1.0_amd64.deb", "x")]).await;
    let resp = send(&app, json_request("POST", "/api/repos/main/snapshots", r#"{"Name":"snap1"}"#)).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = send(&app, empty_request("DELETE", "/api/repos/main")).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let resp = send(&app, empty_request("DELETE", "/api/repos/main?force=1")).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn diff_lists_changed_packages() {
    let app = seeded("main", &[("hello_1.0_amd64.deb", "x")]).await;
    send(&app, json_request("POST", "/api/repos/main/snapshots", r#"{"Name":"old"}"#)).await;
    send(&app, upload_request("incoming", &[("hello_2.0_amd64.deb", "z")])).await;
    send(&app, empty_request("POST", "/api/repos/main/file/incoming")).await;
    send(&app, json_request("POST", "/api/repos/main/snapshots", r#"{"Name":"new"}"#)).await;

    let resp = send(&app, empty_request("GET", "/api/snapshots/old/diff/new")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let rows: Vec<Value> = body_json(resp).await;
    assert_eq!(rows.len(), 1);
    assert!(rows[0]["Left"].as_str().unwrap().contains("hello 1.0"));
    assert!(rows[0]["Right"].as_str().unwrap().contains("hello 2.0"));
}

// --- publish ---

#[tokio::test]
async fn publish_under_escaped_prefix_round_trips() {
    let app = seeded("main", &[("hello_1.0_amd64.deb", "x")]).await;
    let resp = send(
        &app,
        json_request(
            "POST",
            "/api/publish/ppa_main__x",
            r#"{"SourceKind":"local","Sources":[{"Name":"main"}],"Distribution":"bookworm"}"#,
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let published: PublishedRepo = body_json(resp).await;
    assert_eq!(published.prefix, "ppa/main_x");
    assert_eq!(published.sources[0].component, "main");

    let resp = send(&app, empty_request("GET", "/api/publish")).await;
    let all: Vec<PublishedRepo> = body_json(resp).await;
    assert_eq!(all.len(), 1);

    let resp = send(&app, empty_request("DELETE", "/api/repos/main?force=1")).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = send(&app, empty_request("DELETE", "/api/publish/ppa_main__x/bookworm")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let resp = send(&app, empty_request("DELETE", "/api/publish/ppa_main__x/bookworm")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn publish_at_root_and_switch_snapshot() {
    let app = seeded("main", &[("hello_1.0_amd64.deb", "x")]).await;
    send(&app, json_request("POST", "/api/repos/main/snapshots", r#"{"Name":"s1"}"#)).await;
    send(&app, json_request("POST", "/api/repos/main/snapshots", r#"{"Name":"s2"}"#)).await;

    let body = r#"{"SourceKind":"snapshot","Sources":[{"Component":"main","Name":"s1"}],"Distribution":"sid"}"#;
    let resp = send(&app, json_request("POST", "/api/publish/:.", body)).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let resp = send(&app, json_request("POST", "/api/publish", body)).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = send(
        &app,
        json_request("PUT", "/api/publish/:./sid", r#"{"Snapshots":[{"Component":"main","Name":"s2"}]}"#),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let published: PublishedRepo = body_json(resp).await;
    assert_eq!(published.prefix, ".");
    assert_eq!(published.sources[0].name, "s2");
}

#[tokio::test]
async fn publish_of_unknown_source_is_404() {
    let resp = send(
        &app(),
        json_request(
            "POST",
            "/api/publish",
            r#"{"SourceKind":"local","Sources":[{"Name":"ghost"}]}"#,
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
