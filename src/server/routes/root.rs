use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};

pub async fn index() -> Json<Value> {
    Json(json!({
        "message": "Whyred AI Backend API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": ["/api/ask", "/api/search", "/api/image", "/api/user", "/api/history"],
    }))
}

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "OK",
        "timestamp": Utc::now(),
    }))
}
