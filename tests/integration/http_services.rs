use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use axum::extract::{Path, Query};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use canopy::config::{AdminConfig, CanopyConfig, ServiceConfig};
use canopy::directory::{HttpDirectoryConnector, ListingRequest};
use canopy::error::ExportError;
use canopy::session::bootstrap;
use canopy::summary::FailureCategory;
use canopy::tooling::cli::{CliContext, Commands};
use canopy::types::{Node, NodeKind};
use canopy::walker;
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::integration::support::{files_under, paths, read_json, DEMO_ID, STUDIES_ID};

const ROOT_ID: &str = "https://repo.example.org/folders/root";
const BEARER: &str = "Bearer tok-1";
const API_KEY: &str = "ApiKey key-live";
const SLOW_FOLDER_ID: &str = "https://repo.example.org/folders/archive";
const SLOW_TEMPLATE_ID: &str = "https://repo.example.org/templates/audit";
const STALL: Duration = Duration::from_secs(5);
const SHORT_TIMEOUT_MS: u64 = 300;

fn authorized(headers: &HeaderMap, expected: &str) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == expected)
        .unwrap_or(false)
}

async fn token(Json(body): Json<Value>) -> Response {
    if body["userId"] == "admin" && body["password"] == "secret" {
        Json(json!({"accessToken": "tok-1"})).into_response()
    } else {
        StatusCode::UNAUTHORIZED.into_response()
    }
}

async fn me(headers: HeaderMap) -> Response {
    if !authorized(&headers, BEARER) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(json!({
        "id": "admin",
        "apiKeys": [
            {"key": "key-revoked", "enabled": false},
            {"key": "key-live", "enabled": true}
        ]
    }))
    .into_response()
}

async fn folder_by_path(headers: HeaderMap, Query(q): Query<HashMap<String, String>>) -> Response {
    if !authorized(&headers, BEARER) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    match q.get("path").map(String::as_str) {
        Some("/") => {
            Json(json!({"id": ROOT_ID, "nodeType": "folder", "name": "Root"})).into_response()
        }
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn contents(headers: HeaderMap, Path(id): Path<String>) -> Response {
    if !authorized(&headers, BEARER) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let resources = match id.as_str() {
        ROOT_ID => json!([
            {"id": DEMO_ID, "nodeType": "template", "name": "demo", "createdBy": "admin"},
            {"id": STUDIES_ID, "nodeType": "folder", "name": "studies"}
        ]),
        STUDIES_ID => json!([]),
        _ => return StatusCode::NOT_FOUND.into_response(),
    };
    Json(json!({ "resources": resources })).into_response()
}

async fn uuid(headers: HeaderMap, Query(q): Query<HashMap<String, String>>) -> Response {
    if !authorized(&headers, BEARER) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let id = q.get("id").map(String::as_str).unwrap_or_default();
    let uuid = match (id, q.get("type").map(String::as_str)) {
        (STUDIES_ID, Some("folder")) => "F1",
        (DEMO_ID, Some("template")) => "R1",
        _ => return StatusCode::NOT_FOUND.into_response(),
    };
    Json(json!({ "uuid": uuid })).into_response()
}

async fn content(headers: HeaderMap, Path((prefix, id)): Path<(String, String)>) -> Response {
    if !authorized(&headers, API_KEY) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    match (prefix.as_str(), id.as_str()) {
        ("templates", DEMO_ID) => r#"{"b":[3,1],"a":1}"#.into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn stalled_content() -> Response {
    tokio::time::sleep(STALL).await;
    r#"{"late":true}"#.into_response()
}

/// Root listing gains a folder whose listing stalls and a template whose uuid stalls.
async fn contents_with_stalls(headers: HeaderMap, Path(id): Path<String>) -> Response {
    match id.as_str() {
        ROOT_ID => Json(json!({"resources": [
            {"id": SLOW_FOLDER_ID, "nodeType": "folder", "name": "archive"},
            {"id": SLOW_TEMPLATE_ID, "nodeType": "template", "name": "audit"},
            {"id": DEMO_ID, "nodeType": "template", "name": "demo"},
            {"id": STUDIES_ID, "nodeType": "folder", "name": "studies"}
        ]}))
        .into_response(),
        SLOW_FOLDER_ID => {
            tokio::time::sleep(STALL).await;
            Json(json!({"resources": []})).into_response()
        }
        _ => contents(headers, Path(id)).await,
    }
}

async fn uuid_with_stalls(headers: HeaderMap, Query(q): Query<HashMap<String, String>>) -> Response {
    match q.get("id").map(String::as_str) {
        Some(SLOW_TEMPLATE_ID) => {
            tokio::time::sleep(STALL).await;
            Json(json!({"uuid": "AUDIT"})).into_response()
        }
        Some(SLOW_FOLDER_ID) => Json(json!({"uuid": "ARCHIVE"})).into_response(),
        _ => uuid(headers, Query(q)).await,
    }
}

fn directory_router() -> Router {
    Router::new()
        .route("/auth/token", post(token))
        .route("/users/me", get(me))
        .route("/folders", get(folder_by_path))
        .route("/folders/{id}/contents", get(contents))
        .route("/uuid", get(uuid))
}

fn stalling_directory_router() -> Router {
    Router::new()
        .route("/auth/token", post(token))
        .route("/users/me", get(me))
        .route("/folders", get(folder_by_path))
        .route("/folders/{id}/contents", get(contents_with_stalls))
        .route("/uuid", get(uuid_with_stalls))
}

fn content_router() -> Router {
    Router::new().route("/{prefix}/{id}", get(content))
}

async fn spawn(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

fn config(directory_url: &str, content_url: &str, password: &str) -> CanopyConfig {
    CanopyConfig {
        admin: AdminConfig {
            user_id: "admin".to_string(),
            password: Some(password.to_string()),
        },
        directory: ServiceConfig::new(directory_url),
        content: ServiceConfig::new(content_url),
        ..CanopyConfig::default()
    }
}

#[tokio::test]
async fn full_export_over_http() {
    let directory_url = spawn(directory_router()).await;
    let content_url = spawn(content_router()).await;
    let config = config(&directory_url, &content_url, "secret");
    let temp = TempDir::new().unwrap();

    let connector = HttpDirectoryConnector::new(&config.directory).unwrap();
    let session = bootstrap(&connector, &config.admin_credentials())
        .await
        .unwrap();
    assert_eq!(session.auth_token.header_value(), API_KEY);

    let summary = walker::run(temp.path(), "/", &session, &config.content)
        .await
        .unwrap();

    assert_eq!(summary.exit_code(), 0, "{:?}", summary.failures);
    assert_eq!(
        files_under(temp.path()),
        paths(&[
            "resources/F1/folder.info.json",
            "resources/R1.content.json",
            "resources/R1.info.json",
            "resources/folder.info.json",
        ])
    );
    assert_eq!(
        read_json(&temp.path().join("resources/R1.info.json"))["createdBy"],
        json!("admin")
    );
    assert_eq!(
        std::fs::read_to_string(temp.path().join("resources/R1.content.json")).unwrap(),
        "{\n  \"a\": 1,\n  \"b\": [\n    3,\n    1\n  ]\n}"
    );
}

#[tokio::test]
async fn listing_is_sorted_by_the_service() {
    let directory_url = spawn(directory_router()).await;
    let connector = HttpDirectoryConnector::new(&ServiceConfig::new(&directory_url)).unwrap();
    let session = bootstrap(
        &connector,
        &config(&directory_url, &directory_url, "secret").admin_credentials(),
    )
    .await
    .unwrap();

    let listing = session
        .directory
        .list_contents(ROOT_ID, &ListingRequest::full_listing())
        .await
        .unwrap();
    let kinds: Vec<NodeKind> = listing.iter().map(Node::kind).collect();
    assert_eq!(kinds, vec![NodeKind::Template, NodeKind::Folder]);
}

#[tokio::test]
async fn listing_can_be_narrowed_by_kind() {
    let directory_url = spawn(directory_router()).await;
    let connector = HttpDirectoryConnector::new(&ServiceConfig::new(&directory_url)).unwrap();
    let session = bootstrap(
        &connector,
        &config(&directory_url, &directory_url, "secret").admin_credentials(),
    )
    .await
    .unwrap();
    let request = ListingRequest {
        kinds: vec![NodeKind::Folder],
        ..ListingRequest::full_listing()
    };

    let listing = session
        .directory
        .list_contents(ROOT_ID, &request)
        .await
        .unwrap();
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0].id(), STUDIES_ID);
}

#[tokio::test]
async fn rejected_password_is_an_authentication_error() {
    let directory_url = spawn(directory_router()).await;
    let config = config(&directory_url, &directory_url, "wrong");
    let connector = HttpDirectoryConnector::new(&config.directory).unwrap();

    let err = bootstrap(&connector, &config.admin_credentials())
        .await
        .err()
        .unwrap();
    assert!(matches!(err, ExportError::Authentication(_)));
}

#[tokio::test]
async fn unreachable_directory_is_an_authentication_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);
    let config = config(&url, &url, "secret");
    let connector = HttpDirectoryConnector::new(&config.directory).unwrap();

    assert!(matches!(
        bootstrap(&connector, &config.admin_credentials()).await,
        Err(ExportError::Authentication(_))
    ));
}

#[tokio::test]
async fn content_service_errors_leave_descriptor_only() {
    let directory_url = spawn(directory_router()).await;
    let content_url = spawn(Router::new()).await;
    let config = config(&directory_url, &content_url, "secret");
    let temp = TempDir::new().unwrap();

    let connector = HttpDirectoryConnector::new(&config.directory).unwrap();
    let session = bootstrap(&connector, &config.admin_credentials())
        .await
        .unwrap();
    let summary = walker::run(temp.path(), "/", &session, &config.content)
        .await
        .unwrap();

    assert_eq!(summary.exit_code(), 0);
    assert!(temp.path().join("resources/R1.info.json").is_file());
    assert!(!temp.path().join("resources/R1.content.json").exists());
}

#[tokio::test]
async fn stalled_content_times_out_per_resource() {
    let directory_url = spawn(directory_router()).await;
    let content_url = spawn(Router::new().route("/{prefix}/{id}", get(stalled_content))).await;
    let mut config = config(&directory_url, &content_url, "secret");
    config.content.read_timeout_ms = SHORT_TIMEOUT_MS;
    let temp = TempDir::new().unwrap();

    let connector = HttpDirectoryConnector::new(&config.directory).unwrap();
    let session = bootstrap(&connector, &config.admin_credentials())
        .await
        .unwrap();
    let started = Instant::now();
    let summary = walker::run(temp.path(), "/", &session, &config.content)
        .await
        .unwrap();

    assert!(started.elapsed() < STALL, "walk waited out the stall");
    assert_eq!(summary.exit_code(), 0);
    let failure = summary.failures.iter().find(|f| f.id == DEMO_ID).unwrap();
    assert_eq!(failure.category, FailureCategory::ContentFetch);
    assert!(temp.path().join("resources/R1.info.json").is_file());
    assert!(!temp.path().join("resources/R1.content.json").exists());
    assert!(temp.path().join("resources/F1/folder.info.json").is_file());
}

#[tokio::test]
async fn stalled_directory_calls_fail_only_their_node() {
    let directory_url = spawn(stalling_directory_router()).await;
    let content_url = spawn(content_router()).await;
    let mut config = config(&directory_url, &content_url, "secret");
    config.directory.read_timeout_ms = SHORT_TIMEOUT_MS;
    let temp = TempDir::new().unwrap();

    let connector = HttpDirectoryConnector::new(&config.directory).unwrap();
    let session = bootstrap(&connector, &config.admin_credentials())
        .await
        .unwrap();
    let started = Instant::now();
    let summary = walker::run(temp.path(), "/", &session, &config.content)
        .await
        .unwrap();

    assert!(started.elapsed() < STALL, "walk waited out the stall");
    assert_eq!(summary.exit_code(), 1);

    let category_of = |id: &str| {
        summary
            .failures
            .iter()
            .find(|f| f.id == id)
            .map(|f| f.category)
    };
    assert_eq!(category_of(SLOW_TEMPLATE_ID), Some(FailureCategory::Lookup));
    assert_eq!(category_of(SLOW_FOLDER_ID), Some(FailureCategory::Lookup));
    assert_eq!(summary.failure_count(), 2);

    // Listing stalled after the descriptor was written.
    assert!(temp.path().join("resources/ARCHIVE/folder.info.json").is_file());
    assert!(!temp.path().join("resources/AUDIT.info.json").exists());
    assert!(temp.path().join("resources/R1.content.json").is_file());
    assert!(temp.path().join("resources/F1/folder.info.json").is_file());
}

#[test]
fn export_command_reports_json_summary() {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let (directory_url, content_url) =
        rt.block_on(async { (spawn(directory_router()).await, spawn(content_router()).await) });
    let temp = TempDir::new().unwrap();
    let export_dir: PathBuf = temp.path().join("out");

    let ctx = CliContext::with_config(config(&directory_url, &content_url, "secret"));
    let output = ctx
        .execute(&Commands::Export {
            export_dir: Some(export_dir.clone()),
            root_path: None,
            format: "json".to_string(),
        })
        .unwrap();

    assert_eq!(output.exit_code, 0);
    let summary: Value = serde_json::from_str(&output.text).unwrap();
    assert_eq!(summary["folders"], json!(2));
    assert_eq!(summary["resources"], json!(1));
    assert_eq!(summary["content_files"], json!(1));
    assert!(export_dir.join("resources/F1/folder.info.json").is_file());
}

#[test]
fn export_command_fails_fast_on_bad_credentials() {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let directory_url = rt.block_on(spawn(directory_router()));
    let temp = TempDir::new().unwrap();

    let ctx = CliContext::with_config(config(&directory_url, &directory_url, "wrong"));
    let err = ctx
        .execute(&Commands::Export {
            export_dir: Some(temp.path().to_path_buf()),
            root_path: None,
            format: "text".to_string(),
        })
        .unwrap_err();

    assert!(err.is_fatal());
    assert!(!temp.path().join("resources").exists());
}
