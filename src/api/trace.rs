// trace.rs - 請求追蹤ID
//
// 每個請求持有一個追蹤ID（tid）：優先取配置指定的請求頭
// （默認 X-Request-ID），缺失時生成無連字符的UUID。tid存入請求
// 擴展供處理器提取，並回寫到響應頭；日誌以tid字段關聯。

use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::HeaderName;
use axum::http::request::Parts;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use std::convert::Infallible;
use uuid::Uuid;

/// 請求追蹤ID。提取時若中間件未設置（理論上不會發生）返回空字串。
#[derive(Debug, Clone, Default)]
pub struct TraceId(pub String);

impl<S> FromRequestParts<S> for TraceId
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<TraceId>()
            .cloned()
            .unwrap_or_default())
    }
}

/// 生成無連字符的UUID追蹤ID
pub fn new_trace_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// 追蹤ID中間件：透傳或生成tid，寫入請求擴展與響應頭，並記錄請求指標
pub async fn propagate_trace_id(
    State(header): State<HeaderName>,
    mut request: Request,
    next: Next,
) -> Response {
    let started = std::time::Instant::now();
    let method = request.method().to_string();
    let tid = request
        .headers()
        .get(&header)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
        .unwrap_or_else(new_trace_id);

    request.extensions_mut().insert(TraceId(tid.clone()));

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&tid) {
        response.headers_mut().insert(header, value);
    }

    crate::monitor::record_request(&method, response.status().as_u16(), started);
    response
}
