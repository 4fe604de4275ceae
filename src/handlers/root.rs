use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::config;
use crate::database::Store;

pub async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");
    let base = &config::config().api.base_path;

    Json(json!({
        "name": "Event API (Rust)",
        "version": version,
        "description": "JSON:API resources for event FAQs and microlocations",
        "endpoints": {
            "faqs": format!("{}/faqs, {}/events/:event/faqs, {}/events/:event/faq", base, base, base),
            "microlocations": format!(
                "{}/microlocations, {}/events/:event/microlocations, {}/sessions/:session_id/microlocation[s]",
                base, base, base
            ),
            "health": "/health",
        }
    }))
}

pub async fn health(State(store): State<Arc<dyn Store>>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match store.health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "timestamp": now,
                "database": "ok"
            })),
        ),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "degraded",
                    "timestamp": now,
                    "database": "unavailable"
                })),
            )
        }
    }
}
