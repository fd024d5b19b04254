use axum::Json;
use chrono::Utc;

use murmur_types::api::HelloResponse;

/// GET /hello — unauthenticated greeting, used as a liveness check.
pub async fn hello() -> Json<HelloResponse> {
    Json(HelloResponse {
        message: "Hello!".to_string(),
        timestamp: Utc::now(),
    })
}
