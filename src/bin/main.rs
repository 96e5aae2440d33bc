use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

use app_server::api;
use app_server::config::{self, ApplicationConfig, ConfigView, Validator};
use app_server::logger::{self, LogLifecycle};
use app_server::monitor::MetricsLifecycle;
use app_server::server::{Hook, LifecycleRegistry, ServerBuilder};

/// 啟動參數，均可由環境變數覆蓋
#[derive(Parser, Debug)]
#[command(name = "app_server", version, about = "service bootstrap kernel")]
struct Args {
    /// 邏輯配置名（不帶擴展名），逗號分隔
    #[arg(
        long,
        env = "CONFIG_NAMES",
        default_value = config::DEFAULT_CONFIG_NAME,
        value_delimiter = ','
    )]
    config_names: Vec<String>,

    /// 配置目錄
    #[arg(long, env = "CONFIG_DIR", default_value = config::DEFAULT_CONFIG_DIR)]
    config_dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 初始化配置
    config::init_config(&args.config_names, &args.config_dir)?;
    let app_config = ApplicationConfig::from_store(config::global())?;

    // 初始化日誌系統
    let guards = logger::init(&app_config.log)?;

    if let Err(err) = app_config.validate() {
        warn!(error = %err, "配置驗證失敗");
    }

    // 接線生命週期：指標監聽在prepare啟動，日誌在destroy刷出
    let mut registry = LifecycleRegistry::new();
    registry.add_hook(Hook::new().preparer(Arc::new(MetricsLifecycle::new(ConfigView::of(
        "listeners.metrics",
    )))));
    registry.add_hook(Hook::new().destroyer(Arc::new(LogLifecycle::new(guards))));

    // 構建運行時並註冊路由（重複路由在此處拒絕啟動）
    let runtime = ServerBuilder::new()
        .with_server_config(app_config.server.clone())
        .with_registry(registry)
        .build()?;
    api::routes::register_all(&runtime)?;

    info!(
        host = %app_config.server.host,
        port = app_config.server.port,
        "伺服器初始化完成，等待請求..."
    );

    // 阻塞運行直到終止信號，之後在配置期限內優雅停機
    runtime.serve_forever().await?;

    Ok(())
}
