//! Integration tests for fpt-server API endpoints
//!
//! Every test builds the full router over an in-memory SQLite store (or no
//! store at all) and an in-memory cache, so nothing touches the filesystem.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use fpt_common::db::init_memory_database;
use fpt_common::matrix::embedded::EMBEDDED_ROW_COUNT;
use fpt_common::store::{MemoryCache, SqlStore, UnconfiguredRemote};
use fpt_server::{build_router, AppState};
use serde_json::{json, Value};
use tower::util::ServiceExt; // for `oneshot` method

const PASSWORD: &str = "test-admin";

/// Test helper: app over an existing store with its own cache, as a second
/// instance sharing the same database would be
fn app_over(store: Arc<SqlStore>) -> axum::Router {
    let state = AppState::from_stores(
        store.clone(),
        store,
        Arc::new(MemoryCache::new()),
        Duration::from_secs(2),
        PASSWORD,
    );
    build_router(state)
}

/// Test helper: app over an in-memory database
async fn setup_app() -> axum::Router {
    app_over(Arc::new(SqlStore::new(init_memory_database().await.unwrap())))
}

/// Test helper: app with no remote store configured
fn setup_offline_app() -> axum::Router {
    let state = AppState::from_stores(
        Arc::new(UnconfiguredRemote),
        Arc::new(UnconfiguredRemote),
        Arc::new(MemoryCache::new()),
        Duration::from_millis(200),
        PASSWORD,
    );
    build_router(state)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn admin_post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", "application/json")
        .header("X-Admin-Password", PASSWORD)
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Test helper: Extract JSON body from response
async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

async fn extract_text(body: Body) -> String {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    String::from_utf8(bytes.to_vec()).expect("Should be UTF-8")
}

fn query_body() -> Value {
    json!({
        "priority": "Must have",
        "risk": "High",
        "confidence": "No data",
        "size": "L",
        "timing": "Start"
    })
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let app = setup_offline_app();

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "fpt-server");
    assert!(body["version"].is_string());
}

// =============================================================================
// Matrix
// =============================================================================

#[tokio::test]
async fn test_matrix_starts_embedded() {
    let app = setup_app().await;

    let response = app.oneshot(get("/api/matrix")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["source"], "embedded_default");
    assert_eq!(body["rowCount"], EMBEDDED_ROW_COUNT);
    assert_eq!(body["columnCount"], 7);
    assert!(body["lastUpdated"].is_null());
}

#[tokio::test]
async fn test_replace_then_read_back() {
    let app = setup_app().await;

    let data = json!({
        "data": [
            {"Priority": "Must have", "Risk": "High", "Confidence": "No data", "Data": "N/A",
             "Size": "L", "Timing": "Start", "Recommendation": "Card sorting"}
        ]
    });
    let response = app.clone().oneshot(admin_post("/api/matrix", data)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["source"], "remote");
    assert_eq!(body["rowCount"], 1);
    assert!(body["lastUpdated"].is_string());
    assert!(body.get("warning").is_none());

    let response = app.clone().oneshot(get("/api/matrix")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["rowCount"], 1);
    assert_eq!(body["data"][0]["Recommendation"], "Card sorting");

    let response = app
        .oneshot(post_json("/api/recommend", query_body()))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["methods"], json!(["Card sorting"]));
    assert_eq!(body["tier"], "full");
}

#[tokio::test]
async fn test_instances_sharing_a_store_see_each_others_writes() {
    let store = Arc::new(SqlStore::new(init_memory_database().await.unwrap()));
    let first = app_over(store.clone());
    let second = app_over(store);

    // The second instance has already served the embedded table
    let response = second.clone().oneshot(get("/api/matrix")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["source"], "embedded_default");

    let data = json!({
        "data": [
            {"Priority": "Must have", "Risk": "High", "Confidence": "No data", "Data": "N/A",
             "Size": "L", "Timing": "Start", "Recommendation": "Diary study"}
        ]
    });
    let response = first.oneshot(admin_post("/api/matrix", data)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = second.clone().oneshot(get("/api/matrix")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["source"], "remote");
    assert_eq!(body["rowCount"], 1);
    assert_eq!(body["data"][0]["Recommendation"], "Diary study");

    let response = second
        .oneshot(post_json("/api/recommend", query_body()))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["methods"], json!(["Diary study"]));
}

#[tokio::test]
async fn test_replace_rejects_bad_payloads() {
    let app = setup_app().await;

    for payload in [json!({"data": []}), json!({"data": "nope"}), json!({})] {
        let response = app
            .clone()
            .oneshot(admin_post("/api/matrix", payload))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    // Nothing changed
    let response = app.oneshot(get("/api/matrix")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["source"], "embedded_default");
}

#[tokio::test]
async fn test_offline_replace_warns_and_keeps_cache_copy() {
    let app = setup_offline_app();

    let data = json!({"data": [{"Priority": "Must have", "Recommendation": "A"}]});
    let response = app.clone().oneshot(admin_post("/api/matrix", data)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["source"], "local_cache");
    assert!(body["warning"].as_str().unwrap().contains("local cache"));

    // A refresh resolves from the cache
    let response = app
        .oneshot(post_json("/api/matrix/refresh", json!({})))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["source"], "local_cache");
    assert_eq!(body["rowCount"], 1);
}

#[tokio::test]
async fn test_csv_upload_and_export() {
    let app = setup_app().await;

    let csv = "Priority,Risk,Confidence,Data,Size,Timing,Recommendation\n\
               Must have,High,No data,N/A,L,Start,\"Interviews, then test\"\n";
    let response = app
        .clone()
        .oneshot(admin_post("/api/matrix/csv", json!({"csv": csv})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(get("/api/matrix/csv")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()["content-type"].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/csv"));

    let text = extract_text(response.into_body()).await;
    assert_eq!(text, csv);
}

#[tokio::test]
async fn test_csv_missing_columns_rejected_unless_forced() {
    let app = setup_app().await;
    let csv = "a,b,c,d,e,f\nMust have,High,No data,L,Start,Survey\n";

    let response = app
        .clone()
        .oneshot(admin_post("/api/matrix/csv", json!({"csv": csv})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = extract_json(response.into_body()).await;
    assert!(body["error"]["message"].as_str().unwrap().contains("Priority"));

    let response = app
        .clone()
        .oneshot(admin_post("/api/matrix/csv", json!({"csv": csv, "forceLoad": true})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(get("/api/matrix")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["data"][0]["Recommendation"], "Survey");
}

#[tokio::test]
async fn test_seed_restores_embedded_rows() {
    let app = setup_app().await;

    let data = json!({"data": [{"Priority": "Must have", "Recommendation": "A"}]});
    app.clone().oneshot(admin_post("/api/matrix", data)).await.unwrap();

    let response = app
        .clone()
        .oneshot(admin_post("/api/matrix/seed", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(get("/api/matrix")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["rowCount"], EMBEDDED_ROW_COUNT);
    assert_eq!(body["source"], "remote");
}

#[tokio::test]
async fn test_options_filter_by_confidence() {
    let app = setup_app().await;

    let response = app.clone().oneshot(get("/api/matrix/options")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["priority"][0], "Must have");
    assert!(body["data"].as_array().unwrap().len() > 1);

    let response = app
        .oneshot(get("/api/matrix/options?confidence=No%20data"))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["data"], json!(["No Research"]));
}

#[tokio::test]
async fn test_methods_listed() {
    let app = setup_offline_app();

    let response = app.oneshot(get("/api/methods")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    let methods = body.as_array().unwrap();
    assert_eq!(methods.len(), 6);
    assert!(methods.iter().all(|m| m["description"].is_string()));
}

// =============================================================================
// Recommendations
// =============================================================================

#[tokio::test]
async fn test_recommend_from_embedded_matrix() {
    let app = setup_offline_app();

    let response = app
        .oneshot(post_json("/api/recommend", query_body()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["methods"], json!(["UX research & A/B test"]));
    assert_eq!(body["tier"], "full");
    assert_eq!(body["priorityScore"], 9);
    assert!(body["explanation"].as_str().unwrap().contains("UX research & A/B test"));
}

#[tokio::test]
async fn test_recommend_malformed_body_is_json_bad_request() {
    let app = setup_offline_app();

    let request = Request::builder()
        .method("POST")
        .uri("/api/recommend")
        .header("Content-Type", "application/json")
        .body(Body::from("{\"priority\": "))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_recommend_unmatched_returns_sentinel() {
    let app = setup_offline_app();

    let response = app
        .oneshot(post_json("/api/recommend", json!({"priority": "Nope", "size": "XXL"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["methods"], json!(["No recommendation found"]));
    assert!(body["tier"].is_null());
}

// =============================================================================
// Features
// =============================================================================

#[tokio::test]
async fn test_features_fall_back_to_samples() {
    let app = setup_offline_app();

    let response = app.oneshot(get("/api/features")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["source"], "sample_data");
    assert_eq!(body["count"], 5);
}

#[tokio::test]
async fn test_save_and_list_features() {
    let app = setup_app().await;

    let features = json!({"features": [
        {"name": "Search", "priority": "Must have", "recommendation": "A"},
        {"name": "Alerts", "priority": "Could have", "recommendation": "B"}
    ]});
    let response = app
        .clone()
        .oneshot(post_json("/api/features", features))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["count"], 2);

    let response = app.oneshot(get("/api/features")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["source"], "remote");
    assert_eq!(body["features"][0]["name"], "Alerts");
    assert_eq!(body["features"][1]["name"], "Search");
}

#[tokio::test]
async fn test_save_features_offline_reports_error() {
    let app = setup_offline_app();

    let features = json!({"features": [{"name": "Search"}]});
    let response = app.oneshot(post_json("/api/features", features)).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["success"], false);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_analyze_appends_feature() {
    let app = setup_app().await;

    let mut request = query_body();
    request["name"] = json!("Onboarding");
    let response = app
        .clone()
        .oneshot(post_json("/api/features/analyze", request))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["feature"]["data"], "No Research");
    assert_eq!(body["feature"]["recommendation"], "UX research & A/B test");

    let response = app.oneshot(get("/api/features")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["features"][0]["name"], "Onboarding");
}

#[tokio::test]
async fn test_analyze_lists_missing_fields() {
    let app = setup_app().await;

    let response = app
        .oneshot(post_json(
            "/api/features/analyze",
            json!({"priority": "Must have", "confidence": "Conclusive data"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = extract_json(response.into_body()).await;
    let message = body["error"]["message"].as_str().unwrap();
    for field in ["name", "risk", "size", "timing", "data"] {
        assert!(message.contains(field), "missing {} in {}", field, message);
    }
}

#[tokio::test]
async fn test_bulk_edit_features() {
    let app = setup_app().await;

    app.clone()
        .oneshot(admin_post("/api/features/seed", json!({})))
        .await
        .unwrap();

    let response = app.clone().oneshot(get("/api/features")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    let name = body["features"][0]["name"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(admin_post(
            "/api/features/bulk-edit",
            json!({"names": [name], "patch": {"timing": "End", "risk": ""}}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["count"], 1);

    let response = app.clone().oneshot(get("/api/features")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["features"][0]["timing"], "End");
    assert_ne!(body["features"][0]["risk"], "");

    let response = app
        .oneshot(admin_post(
            "/api/features/bulk-edit",
            json!({"names": ["Does not exist"], "patch": {"timing": "End"}}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
