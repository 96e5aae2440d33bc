use serde::Serialize;

use crate::api::response::ApiResponse;
use crate::api::trace::TraceId;

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    version: String,
}

/// GET /system/health - 健康檢查
pub async fn health(tid: TraceId) -> ApiResponse<HealthResponse> {
    let health_response = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    ApiResponse::success(health_response, tid.0)
}
