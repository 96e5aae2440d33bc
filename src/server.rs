// server.rs - 伺服器核心組件，宣告子模組
//
// 伺服器模組管理系統生命週期與HTTP監聽，實現：
// - 能力標記的生命週期鉤子註冊與分階段執行
// - 路由緩衝註冊與啟動時一次性刷入
// - 信號驅動的優雅啟停狀態機
// - 構建器模式的伺服器配置

/// 伺服器構建器實現
pub mod builder;
/// 伺服器級別錯誤處理
pub mod error;
/// 生命週期鉤子與註冊表
pub mod lifecycle;
/// 路由註冊緩衝
pub mod routes;
/// 運行時與優雅停機
pub mod runtime;

// 重新導出核心組件，簡化外部使用
pub use builder::ServerBuilder;
pub use error::{ServerError, ServerResult};
pub use lifecycle::{
    CleanupCause, CleanupFailure, CleanupReport, Destroyer, Finalizer, Hook, LifecycleRegistry,
    Phase, PhaseState, PostStarter, Preparer,
};
pub use routes::{RouteEntry, RouteTable};
pub use runtime::{build_app, ServerRuntime};

/// 伺服器狀態枚舉
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ServerState {
    /// 伺服器正在初始化
    Initializing,
    /// 伺服器正在運行
    Running,
    /// 伺服器正在關閉
    ShuttingDown,
    /// 伺服器已停止
    Stopped,
}
