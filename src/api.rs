// api.rs - API服務模組，宣告子模組
//
// API模組定義對外接口的公共件與示例資源：
// - 統一響應封套與業務錯誤映射
// - 請求追蹤ID中間件
// - 路由註冊與處理器

/// 統一響應封套與錯誤映射
pub mod response;
/// 請求追蹤ID
pub mod trace;
/// API路由定義
pub mod routes;
/// API處理器模組
pub mod handlers;

pub use response::{ApiError, ApiResponse, Failure};
pub use trace::TraceId;
