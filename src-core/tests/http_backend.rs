//! End-to-end checks of the HTTP clients against a throwaway axum server.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use kalecheck_core::history::{HistoryClient, LocalHistory};
use kalecheck_core::upload::Stage;
use kalecheck_core::{
    AnalyzeWorkflow, ClientConfig, HttpBackend, KaleError, MemoryStore, SessionToken, UploadFile,
};

const RECORD_ID: &str = "65f1a2b3c4d5e6f708192a3b";

#[derive(Clone, Default)]
struct Calls {
    predict: Arc<AtomicUsize>,
    delete: Arc<AtomicUsize>,
}

async fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

fn config_for(base: &str) -> ClientConfig {
    let mut config = ClientConfig::defaults().unwrap();
    config.api_base_url = base.to_string();
    config.segmentation_base_url = base.to_string();
    config.request_timeout_secs = 5;
    config
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::DynamicImage::new_rgb8(width, height);
    let mut buffer = std::io::Cursor::new(Vec::new());
    img.write_to(&mut buffer, image::ImageFormat::Png).unwrap();
    buffer.into_inner()
}

/// Name of the uploaded `file` field, if any.
async fn uploaded_name(mut multipart: Multipart) -> Option<String> {
    let mut name = None;
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() == Some("file") {
            name = field.file_name().map(str::to_string);
            let _ = field.bytes().await;
        }
    }
    name
}

async fn predict_ok(
    State(calls): State<Calls>,
    headers: HeaderMap,
    multipart: Multipart,
) -> (StatusCode, Json<Value>) {
    calls.predict.fetch_add(1, Ordering::SeqCst);
    let Some(name) = uploaded_name(multipart).await else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"status": "error", "message": "No file uploaded"})),
        );
    };
    let signed_in = headers.contains_key("authorization");
    let mut data = json!({
        "percentage_weight_lose": 14.257,
        "features": {"mean_green": 97.5, "texture_contrast": 0.125}
    });
    if signed_in {
        data["imageUrl"] = json!(format!("/api/image/{}", name));
    }
    (StatusCode::OK, Json(json!({"status": "success", "data": data})))
}

async fn segment_ok(multipart: Multipart) -> Result<Vec<u8>, StatusCode> {
    uploaded_name(multipart)
        .await
        .map(|_| png_bytes(512, 512))
        .ok_or(StatusCode::BAD_REQUEST)
}

async fn list_history(headers: HeaderMap) -> (StatusCode, Json<Value>) {
    if headers.get("authorization").and_then(|v| v.to_str().ok()) != Some("Bearer tok") {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"status": "error", "message": "Unauthorized - invalid token"})),
        );
    }
    (
        StatusCode::OK,
        Json(json!({
            "status": "success",
            "message": "Prediction history retrieved successfully",
            "data": [
                {
                    "_id": RECORD_ID,
                    "FileName": "kale.jpg",
                    "Percentage": 9.5,
                    "Features": {"mean_green": 90.0},
                    "Timestamp": "2026-02-03T10:20:30Z"
                },
                {"_id": "not-an-object-id", "FileName": "bad.jpg"},
                {"_id": "65f1a2b3c4d5e6f708192a3c", "FileName": 42}
            ]
        })),
    )
}

async fn get_history(Path(id): Path<String>) -> (StatusCode, Json<Value>) {
    if id != RECORD_ID {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"status": "error", "message": "History not found"})),
        );
    }
    (
        StatusCode::OK,
        Json(json!({
            "status": "success",
            "message": "History retrieved successfully",
            "data": {
                "_id": RECORD_ID,
                "FileName": "kale.jpg",
                "ImageUrl": "https://cdn.test/kale.jpg",
                "Percentage": 9.5,
                "Features": {"mean_green": 90.0, "label": "fresh"},
                "Timestamp": "not a time"
            }
        })),
    )
}

async fn delete_history(State(calls): State<Calls>, Path(id): Path<String>) -> Json<Value> {
    calls.delete.fetch_add(1, Ordering::SeqCst);
    Json(json!({"status": "success", "message": format!("History {} deleted", id)}))
}

fn happy_router(calls: Calls) -> Router {
    Router::new()
        .route("/api/predict", post(predict_ok))
        .route("/segment/", post(segment_ok))
        .route("/api/history", get(list_history))
        .route(
            "/api/history/{id}",
            get(get_history).delete(delete_history),
        )
        .with_state(calls)
}

#[tokio::test]
async fn test_analyze_success_persists_record() {
    let base = serve(happy_router(Calls::default())).await;
    let store = MemoryStore::new();
    let backend = HttpBackend::new(config_for(&base)).unwrap();
    let mut flow = AnalyzeWorkflow::new(backend, &store);

    flow.select_for_analysis(UploadFile::new("kale.png", "image/png", png_bytes(32, 32)))
        .unwrap();
    let record = flow.analyze().await.unwrap();

    assert_eq!(flow.analysis().stage(), Stage::Succeeded);
    assert_eq!(record.percentage_weight_loss, 14.257);
    assert_eq!(record.features.len(), 2);
    assert!(record.image_url.starts_with("data:image/png"));

    let stored = LocalHistory::new(&store).list().unwrap();
    assert_eq!(stored, vec![record]);
}

#[tokio::test]
async fn test_signed_in_result_uses_server_image() {
    let base = serve(happy_router(Calls::default())).await;
    let store = MemoryStore::new();
    let token = SessionToken::issue("tok").unwrap();
    let backend = HttpBackend::new(config_for(&base)).unwrap().with_token(Some(token));
    let mut flow = AnalyzeWorkflow::new(backend, &store);

    flow.select_for_analysis(UploadFile::new("kale.png", "image/png", png_bytes(8, 8)))
        .unwrap();
    let record = flow.analyze().await.unwrap();
    assert_eq!(record.image_url, "/api/image/kale.png");
}

#[tokio::test]
async fn test_rate_limit_fails_without_history() {
    let router = Router::new().route(
        "/api/predict",
        post(|| async {
            (
                StatusCode::TOO_MANY_REQUESTS,
                Json(json!({"status": "error", "message": "rate limited"})),
            )
        }),
    );
    let base = serve(router).await;
    let store = MemoryStore::new();
    let mut flow = AnalyzeWorkflow::new(HttpBackend::new(config_for(&base)).unwrap(), &store);

    flow.select_for_analysis(UploadFile::new("kale.png", "image/png", png_bytes(8, 8)))
        .unwrap();
    let err = flow.analyze().await.unwrap_err();

    assert_eq!(err.status_code(), Some(429));
    assert_eq!(flow.analysis().stage(), Stage::Failed);
    assert_eq!(
        flow.analysis().error(),
        Some("Too many requests. Please wait a minute before trying again.")
    );
    assert!(LocalHistory::new(&store).list().unwrap().is_empty());

    // Retry is allowed after a failure.
    assert!(flow.analysis().can_submit());
}

#[tokio::test]
async fn test_malformed_body_fails() {
    let router = Router::new().route(
        "/api/predict",
        post(|| async { Json(json!({"status": "success", "data": {"features": {}}})) }),
    );
    let base = serve(router).await;
    let store = MemoryStore::new();
    let mut flow = AnalyzeWorkflow::new(HttpBackend::new(config_for(&base)).unwrap(), &store);

    flow.select_for_analysis(UploadFile::new("kale.png", "image/png", png_bytes(8, 8)))
        .unwrap();
    let err = flow.analyze().await.unwrap_err();
    assert!(matches!(err, KaleError::MalformedResponse(_)));
    assert!(LocalHistory::new(&store).list().unwrap().is_empty());
}

#[tokio::test]
async fn test_transport_failure_is_reported() {
    // Bind then drop to get a port nothing listens on.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let store = MemoryStore::new();
    let mut flow = AnalyzeWorkflow::new(HttpBackend::new(config_for(&base)).unwrap(), &store);
    flow.select_for_analysis(UploadFile::new("kale.png", "image/png", png_bytes(8, 8)))
        .unwrap();

    let err = flow.analyze().await.unwrap_err();
    assert!(matches!(err, KaleError::Transport(_)));
    assert_eq!(flow.analysis().stage(), Stage::Failed);
}

#[tokio::test]
async fn test_segmentation_error_detail_is_shown() {
    let router = Router::new().route(
        "/segment/",
        post(|| async {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"detail": "Error processing image: cannot identify image file"})),
            )
        }),
    );
    let base = serve(router).await;
    let store = MemoryStore::new();
    let mut flow = AnalyzeWorkflow::new(HttpBackend::new(config_for(&base)).unwrap(), &store);

    flow.select_for_segmentation(UploadFile::new("leaf.png", "image/png", png_bytes(16, 16)))
        .unwrap();
    let err = flow.remove_background().await.unwrap_err();

    assert_eq!(err.status_code(), Some(500));
    assert_eq!(
        flow.segmentation().error(),
        Some("Error processing image: cannot identify image file")
    );
}

#[tokio::test]
async fn test_segment_then_analyze_handoff() {
    let calls = Calls::default();
    let base = serve(happy_router(calls.clone())).await;
    let store = MemoryStore::new();
    let mut flow = AnalyzeWorkflow::new(HttpBackend::new(config_for(&base)).unwrap(), &store);

    flow.select_for_segmentation(UploadFile::new("leaf.png", "image/png", png_bytes(300, 120)))
        .unwrap();
    let processed = flow.remove_background().await.unwrap().clone();
    let decoded = image::load_from_memory(&processed.bytes).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (512, 512));

    flow.continue_to_analysis(chrono::Utc::now()).unwrap();
    assert_eq!(flow.analysis().file().unwrap().name, "leaf.png");

    flow.analyze().await.unwrap();
    assert_eq!(calls.predict.load(Ordering::SeqCst), 1);
    assert_eq!(LocalHistory::new(&store).list().unwrap().len(), 1);
}

#[tokio::test]
async fn test_remote_history_list_skips_invalid_ids() {
    let base = serve(happy_router(Calls::default())).await;
    let token = SessionToken::issue("tok").unwrap();
    let client = HistoryClient::new(config_for(&base), Some(token)).unwrap();

    let records = client.list().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, RECORD_ID);
    assert_eq!(records[0].image_url, "/fallback-image.jpg");
    assert_eq!(
        records[0].display_time(),
        ("2026-02-03".to_string(), "10:20".to_string())
    );
}

#[tokio::test]
async fn test_remote_history_bad_token_is_unauthorized() {
    let base = serve(happy_router(Calls::default())).await;
    let token = SessionToken::issue("wrong").unwrap();
    let client = HistoryClient::new(config_for(&base), Some(token)).unwrap();

    let err = client.list().await.unwrap_err();
    assert_eq!(err.status_code(), Some(401));
    assert_eq!(err.to_string(), "Your session has expired. Please sign in again.");
}

#[tokio::test]
async fn test_remote_history_get_single_record() {
    let base = serve(happy_router(Calls::default())).await;
    let token = SessionToken::issue("tok").unwrap();
    let client = HistoryClient::new(config_for(&base), Some(token)).unwrap();

    let record = client.get(RECORD_ID).await.unwrap();
    assert_eq!(record.image_url, "https://cdn.test/kale.jpg");
    assert_eq!(record.features.len(), 1);
    assert_eq!(
        record.display_time(),
        ("Unknown".to_string(), "Unknown".to_string())
    );

    let err = client.get("ffffffffffffffffffffffff").await.unwrap_err();
    assert_eq!(err.status_code(), Some(404));
}

#[tokio::test]
async fn test_delete_validates_id_before_request() {
    let calls = Calls::default();
    let base = serve(happy_router(calls.clone())).await;
    let token = SessionToken::issue("tok").unwrap();
    let client = HistoryClient::new(config_for(&base), Some(token)).unwrap();

    let err = client.delete("history_1712345678901").await.unwrap_err();
    assert!(matches!(err, KaleError::InvalidHistoryId(_)));
    assert_eq!(calls.delete.load(Ordering::SeqCst), 0);

    client.delete(RECORD_ID).await.unwrap();
    assert_eq!(calls.delete.load(Ordering::SeqCst), 1);
}
