// logger.rs - 日誌系統初始化
//
// 控制台輸出始終開啟（pretty或json，按log.format）；file_enabled時
// 另寫按日滾動的info.log與error.log。返回的WorkerGuard負責後台寫線程
// 的緩衝刷出，由LogLifecycle在destroy階段釋放。

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{info, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::config::types::LogConfig;
use crate::server::lifecycle::Destroyer;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// 初始化日誌系統。RUST_LOG優先，否則以配置級別為默認過濾。
pub fn init(config: &LogConfig) -> Result<Vec<WorkerGuard>> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.level.clone()));

    let mut layers: Vec<BoxedLayer> = Vec::new();
    let mut guards: Vec<WorkerGuard> = Vec::new();

    // 控制台輸出層
    let console: BoxedLayer = if config.format.eq_ignore_ascii_case("json") {
        tracing_subscriber::fmt::layer()
            .json()
            .with_filter(env_filter)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_filter(env_filter)
            .boxed()
    };
    layers.push(console);

    // 滾動文件輸出層：info.log收當前級別以上，error.log只收error
    if config.file_enabled {
        let (info_writer, info_guard) =
            tracing_appender::non_blocking(rolling::daily(&config.directory, "info.log"));
        guards.push(info_guard);
        layers.push(
            tracing_subscriber::fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(info_writer)
                .with_filter(LevelFilter::from_level(parse_level(&config.level)))
                .boxed(),
        );

        let (error_writer, error_guard) =
            tracing_appender::non_blocking(rolling::daily(&config.directory, "error.log"));
        guards.push(error_guard);
        layers.push(
            tracing_subscriber::fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(error_writer)
                .with_filter(LevelFilter::ERROR)
                .boxed(),
        );
    }

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .map_err(|err| anyhow!("設置日誌系統失敗: {}", err))?;

    info!("日誌系統初始化完成");
    Ok(guards)
}

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO, // 默認為INFO
    }
}

/// 日誌生命週期：destroy階段釋放WorkerGuard，刷出緩衝日誌
pub struct LogLifecycle {
    guards: Mutex<Vec<WorkerGuard>>,
}

impl LogLifecycle {
    pub fn new(guards: Vec<WorkerGuard>) -> Self {
        Self {
            guards: Mutex::new(guards),
        }
    }
}

#[async_trait]
impl Destroyer for LogLifecycle {
    async fn on_destroy(&self, _deadline: Instant) -> Result<()> {
        self.guards.lock().clear();
        Ok(())
    }

    fn title(&self) -> &str {
        "logger"
    }
}
