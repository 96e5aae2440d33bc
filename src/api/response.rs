// response.rs - 統一響應封套
//
// 所有接口返回同一結構的JSON封套：
//   { "result": ..., "msg": "...", "success": bool, "t": 毫秒時間戳, "tid": "追蹤ID" }
// 錯誤分兩類：業務內部錯誤（Inner，攜帶業務碼）與參數錯誤（Param）；
// 無法識別的錯誤統一映射為 "unknown error" 失敗封套。

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::api::trace::TraceId;
use crate::utils::time_utils::current_timestamp_ms;

/// 統一響應封套
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize = serde_json::Value> {
    pub result: Option<T>,
    pub msg: String,
    pub success: bool,
    pub t: i64,
    pub tid: String,
}

impl<T: Serialize> ApiResponse<T> {
    /// 成功封套
    pub fn success(result: T, tid: impl Into<String>) -> Self {
        Self {
            result: Some(result),
            msg: String::new(),
            success: true,
            t: current_timestamp_ms(),
            tid: tid.into(),
        }
    }
}

impl ApiResponse<serde_json::Value> {
    /// 失敗封套
    pub fn failed(msg: impl Into<String>, tid: impl Into<String>) -> Self {
        Self {
            result: None,
            msg: msg.into(),
            success: false,
            t: current_timestamp_ms(),
            tid: tid.into(),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// 業務錯誤類型
#[derive(Debug, Error)]
pub enum ApiError {
    /// 業務內部錯誤，攜帶業務狀態碼與錯誤碼
    #[error("{message}")]
    Inner {
        code: i32,
        error_code: String,
        message: String,
    },

    /// 請求參數錯誤
    #[error("{message}")]
    Param { message: String },
}

impl ApiError {
    pub fn inner(code: i32, error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Inner {
            code,
            error_code: error_code.into(),
            message: message.into(),
        }
    }

    pub fn param(message: impl Into<String>) -> Self {
        Self::Param {
            message: message.into(),
        }
    }

    /// 綁定追蹤ID，得到可直接作為響應返回的失敗值
    pub fn with_tid(self, tid: &TraceId) -> Failure {
        Failure {
            error: self,
            tid: tid.0.clone(),
        }
    }
}

/// 攜帶追蹤ID的失敗響應
#[derive(Debug, Error)]
#[error("{error}")]
pub struct Failure {
    pub error: ApiError,
    pub tid: String,
}

impl Failure {
    /// 將任意錯誤映射為失敗封套：已知的業務錯誤保留消息，
    /// 其餘統一為 "unknown error"
    pub fn from_error(err: anyhow::Error, tid: impl Into<String>) -> Self {
        let tid = tid.into();
        match err.downcast::<ApiError>() {
            Ok(api_error) => Failure {
                error: api_error,
                tid,
            },
            Err(_) => Failure {
                error: ApiError::inner(1, "unknown", "unknown error"),
                tid,
            },
        }
    }
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        ApiResponse::failed(self.error.to_string(), self.tid).into_response()
    }
}

/// 未匹配路由的統一失敗響應
pub async fn api_not_found(tid: TraceId) -> Response {
    (
        StatusCode::NOT_FOUND,
        ApiResponse::failed("api not found", tid.0),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_envelope_shape() {
        let envelope = ApiResponse::success(serde_json::json!({"name": "kite"}), "tid-1");
        let json = serde_json::to_value(&envelope).unwrap();

        assert_eq!(json["success"], true);
        assert_eq!(json["result"]["name"], "kite");
        assert_eq!(json["tid"], "tid-1");
        assert!(json["t"].as_i64().unwrap() > 0);
    }

    #[test]
    fn test_failed_envelope_shape() {
        let envelope = ApiResponse::failed("bad things", "tid-2");
        let json = serde_json::to_value(&envelope).unwrap();

        assert_eq!(json["success"], false);
        assert_eq!(json["msg"], "bad things");
        assert_eq!(json["result"], serde_json::Value::Null);
    }

    #[test]
    fn test_unknown_error_mapping() {
        let failure = Failure::from_error(anyhow::anyhow!("weird io problem"), "tid-3");
        assert!(matches!(
            &failure.error,
            ApiError::Inner { error_code, .. } if error_code == "unknown"
        ));
        assert_eq!(failure.error.to_string(), "unknown error");
    }

    #[test]
    fn test_known_error_keeps_message() {
        let err = anyhow::Error::new(ApiError::param("age out of range"));
        let failure = Failure::from_error(err, "tid-4");
        assert_eq!(failure.error.to_string(), "age out of range");
    }
}
