use tracing::info;

use crate::config::types::ServerConfig;
use crate::config::Validator;
use crate::server::lifecycle::LifecycleRegistry;
use crate::server::runtime::ServerRuntime;
use crate::server::{ServerError, ServerResult};

/// 伺服器構建器
pub struct ServerBuilder {
    server_config: Option<ServerConfig>,
    registry: Option<LifecycleRegistry>,
}

impl ServerBuilder {
    /// 創建新的伺服器構建器
    pub fn new() -> Self {
        Self {
            server_config: None,
            registry: None,
        }
    }

    /// 設置伺服器配置
    pub fn with_server_config(mut self, config: ServerConfig) -> Self {
        self.server_config = Some(config);
        self
    }

    /// 設置生命週期註冊表（接線完成後移交所有權）
    pub fn with_registry(mut self, registry: LifecycleRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// 構建並返回運行時實例
    pub fn build(self) -> ServerResult<ServerRuntime> {
        info!("構建伺服器實例");

        // 驗證配置
        let server_config = self
            .server_config
            .ok_or_else(|| ServerError::Config("未提供伺服器配置".to_string()))?;
        server_config
            .validate()
            .map_err(|err| ServerError::Config(err.to_string()))?;

        let registry = self.registry.unwrap_or_default();

        let runtime = ServerRuntime::new(server_config, registry);

        info!("伺服器實例構建完成");

        Ok(runtime)
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_requires_config() {
        let err = ServerBuilder::new().build().unwrap_err();
        assert!(matches!(err, ServerError::Config(_)));
    }

    #[test]
    fn test_build_rejects_invalid_config() {
        let config = ServerConfig {
            host: String::new(),
            ..ServerConfig::default()
        };
        let err = ServerBuilder::new()
            .with_server_config(config)
            .build()
            .unwrap_err();
        assert!(matches!(err, ServerError::Config(_)));
    }

    #[tokio::test]
    async fn test_build_with_defaults() {
        let runtime = ServerBuilder::new()
            .with_server_config(ServerConfig::default())
            .build()
            .unwrap();
        assert_eq!(
            runtime.state().await,
            crate::server::ServerState::Initializing
        );
    }
}
