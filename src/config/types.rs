use serde::{Deserialize, Serialize};

use crate::config::store::ConfigStore;
use crate::config::validation::{ValidationError, ValidationUtils, Validator};
use crate::config::view::ConfigView;
use std::sync::Arc;

/// 應用程序配置結構
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    pub server: ServerConfig,
    pub log: LogConfig,
}

impl ApplicationConfig {
    /// 從配置樹讀取類型化配置
    pub fn from_store(store: Arc<ConfigStore>) -> Result<Self, config::ConfigError> {
        ConfigView::with_store("", store).get_section("")
    }
}

impl Validator for ApplicationConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        // 驗證各個部分的配置
        self.server.validate()?;
        self.log.validate()?;

        Ok(())
    }
}

/// 伺服器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
    pub shutdown_timeout_secs: u64,
    pub max_body_size: u64,
    pub enable_compression: bool,
    pub enable_cors: bool,
    pub cors_allowed_origins: Vec<String>,
    pub request_id_header: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            request_timeout_secs: 30,
            shutdown_timeout_secs: 10,
            max_body_size: 2 * 1024 * 1024,
            enable_compression: true,
            enable_cors: false,
            cors_allowed_origins: Vec::new(),
            request_id_header: "X-Request-ID".to_string(),
        }
    }
}

impl Validator for ServerConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        // 驗證服務器配置（port為0時由操作系統分配臨時端口）
        ValidationUtils::not_empty(&self.host, "server.host")?;
        ValidationUtils::in_range(
            self.request_timeout_secs,
            1,
            3600,
            "server.request_timeout_secs",
        )?;
        ValidationUtils::in_range(
            self.shutdown_timeout_secs,
            1,
            300,
            "server.shutdown_timeout_secs",
        )?;
        ValidationUtils::not_empty(&self.request_id_header, "server.request_id_header")?;

        // CORS設定驗證
        if self.enable_cors && self.cors_allowed_origins.is_empty() {
            return Err(ValidationError::InvalidValue(
                "啟用CORS但未指定允許的來源".to_string(),
            ));
        }

        Ok(())
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }

    pub fn shutdown_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.shutdown_timeout_secs)
    }
}

/// 日誌配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub format: String,
    /// 滾動日誌文件目錄；file_enabled為false時不寫文件
    pub directory: String,
    pub file_enabled: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            directory: "logs".to_string(),
            file_enabled: false,
        }
    }
}

impl Validator for LogConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        // 驗證日誌級別
        ValidationUtils::one_of(
            &self.level.to_lowercase(),
            &["trace", "debug", "info", "warn", "error"]
                .iter()
                .map(|s| s.to_string())
                .collect::<Vec<String>>(),
            "log.level",
        )?;

        // 驗證日誌格式
        ValidationUtils::one_of(
            &self.format.to_lowercase(),
            &["pretty", "json"]
                .iter()
                .map(|s| s.to_string())
                .collect::<Vec<String>>(),
            "log.format",
        )?;

        if self.file_enabled {
            ValidationUtils::not_empty(&self.directory, "log.directory")?;
        }

        Ok(())
    }
}
