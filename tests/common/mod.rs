//! Mock backend shared by the integration tests.
//!
//! | Route | Behaviour |
//! |-------|-----------|
//! | `POST /chat` | `echo: <message> [1]`; `fail` → 500; `slow` → 3 s delay |
//! | `POST /summarize` | two pages; `broken.pdf` → 500; `nosummary.pdf` → no `summary` |
//! | `POST /ask_with_context` | `Q: <message> \| C: <page_text>`; `silent` → `{}` |

#![allow(dead_code)]

use axum::extract::{Json, Multipart};
use axum::http::StatusCode;
use axum::routing::post;
use axum::Router;
use serde_json::{json, Value};
use std::time::Duration;

fn router() -> Router {
    Router::new()
        .route("/chat", post(chat))
        .route("/summarize", post(summarize))
        .route("/ask_with_context", post(ask_with_context))
}

async fn chat(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let message = body["message"].as_str().unwrap_or_default().to_string();
    match message.as_str() {
        "fail" => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "model crashed" })),
        ),
        "slow" => {
            tokio::time::sleep(Duration::from_secs(3)).await;
            (StatusCode::OK, Json(json!({ "response": "too late" })))
        }
        _ => (
            StatusCode::OK,
            Json(json!({ "response": format!("echo: {} [1]", message) })),
        ),
    }
}

async fn summarize(mut multipart: Multipart) -> (StatusCode, Json<Value>) {
    let mut file_name = None;
    let mut size = 0;
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().map(str::to_string);
        if name.as_deref() == Some("file") {
            file_name = field.file_name().map(str::to_string);
            size = field.bytes().await.map(|b| b.len()).unwrap_or(0);
        }
    }

    match file_name.as_deref() {
        None => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "missing file field" })),
        ),
        Some("broken.pdf") => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "could not parse pdf" })),
        ),
        Some("nosummary.pdf") => (
            StatusCode::OK,
            Json(json!({ "error": "model unavailable" })),
        ),
        Some(name) => (
            StatusCode::OK,
            Json(json!({
                "summary": {
                    "Page 1": format!("{} has {} bytes.", name, size),
                    "Page 2": "Second page.",
                }
            })),
        ),
    }
}

async fn ask_with_context(Json(body): Json<Value>) -> Json<Value> {
    let message = body["message"].as_str().unwrap_or_default();
    let page_text = body["page_text"].as_str().unwrap_or_default();
    if message == "silent" {
        return Json(json!({}));
    }
    Json(json!({ "response": format!("Q: {} | C: {}", message, page_text) }))
}

/// Serve the mock on the current runtime. Returns its origin.
pub async fn spawn_mock_backend() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router()).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Serve the mock on its own thread, for tests that run the binary.
pub fn spawn_mock_backend_thread() -> String {
    let (tx, rx) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async move {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            tx.send(listener.local_addr().unwrap()).unwrap();
            axum::serve(listener, router()).await.unwrap();
        });
    });
    format!("http://{}", rx.recv().unwrap())
}

/// An origin nothing is listening on.
pub fn closed_origin() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}
