/// 配置管理模組
///
/// 本模組負責配置的發現、合併與動態解析：
/// 啟動時從配置目錄合併文件並疊加環境變數，之後通過命名空間視圖
/// 訪問，支持Key別名與 `${...}` / `#{...}` 間接表達式。
// 宣告子模組
pub mod dynamic;
pub mod loader;
pub mod store;
pub mod types;
pub mod validation;
pub mod view;

// 重新導出常用組件
pub use dynamic::{DynamicKey, DynamicKind};
pub use loader::{DEFAULT_CONFIG_DIR, DEFAULT_CONFIG_NAME, ENV_PREFIX};
pub use store::{global, init_config, ConfigStore};
pub use types::*;
pub use validation::{ValidationError, ValidationUtils, Validator};
pub use view::{make_key, ConfigView};
