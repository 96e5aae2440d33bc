use thiserror::Error;

/// 伺服器錯誤類型
#[derive(Error, Debug)]
pub enum ServerError {
    /// 配置錯誤
    #[error("配置錯誤: {0}")]
    Config(String),

    /// 路由重複註冊（接線錯誤，啟動期致命）
    #[error("路由已存在: {0}")]
    DuplicateRoute(String),

    /// 生命週期鉤子失敗（prepare / post-start 階段致命）
    #[error("生命週期鉤子 {title} 於 {phase} 階段失敗: {cause}")]
    Lifecycle {
        phase: &'static str,
        title: String,
        cause: anyhow::Error,
    },

    /// IO 錯誤
    #[error("IO 錯誤: {0}")]
    Io(#[from] std::io::Error),

    /// 監聽地址解析錯誤
    #[error("監聽地址解析錯誤: {0}")]
    AddrParse(#[from] std::net::AddrParseError),

    /// 初始化錯誤
    #[error("初始化錯誤: {0}")]
    Initialization(String),

    /// 運行時錯誤
    #[error("運行時錯誤: {0}")]
    Runtime(String),
}

/// 伺服器結果類型別名
pub type ServerResult<T> = Result<T, ServerError>;
