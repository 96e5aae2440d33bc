pub mod system;
pub mod user;

use crate::server::{ServerResult, ServerRuntime};

/// 將全部API路由註冊進運行時。必須在 `start` 之前完成；
/// 任何重複註冊都會在此處以接線錯誤的形式拒絕啟動。
pub fn register_all(runtime: &ServerRuntime) -> ServerResult<()> {
    user::register(runtime)?;
    system::register(runtime)?;
    Ok(())
}
