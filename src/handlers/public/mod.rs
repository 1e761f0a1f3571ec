// handlers/public/mod.rs - Public handlers (no authentication required)

use axum::response::Json;
use serde_json::{json, Value};

/// GET / - service banner
pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "Tasks API running",
        "version": env!("CARGO_PKG_VERSION"),
        "docs": "/api/tasks[/:id] (bearer token required)"
    }))
}
