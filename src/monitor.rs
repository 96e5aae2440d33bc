// monitor.rs - 指標監聽
//
// 讀取 listeners.metrics 配置，enable為true時在prepare階段啟動
// Prometheus指標導出器；未開啟則空操作。

use std::net::SocketAddr;

use anyhow::Result;
use async_trait::async_trait;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;

use crate::config::ConfigView;
use crate::server::lifecycle::Preparer;

/// 默認指標端口
const DEFAULT_METRICS_PORT: i64 = 9100;

/// Prometheus導出器生命週期
pub struct MetricsLifecycle {
    conf: ConfigView,
}

impl MetricsLifecycle {
    /// conf應指向 listeners.metrics 命名空間
    pub fn new(conf: ConfigView) -> Self {
        Self { conf }
    }
}

#[async_trait]
impl Preparer for MetricsLifecycle {
    async fn on_prepare(&self) -> Result<()> {
        if !self.conf.get_bool("enable") {
            return Ok(());
        }

        let port = self
            .conf
            .get_or_default("port", DEFAULT_METRICS_PORT)
            .into_int()
            .unwrap_or(DEFAULT_METRICS_PORT) as u16;
        let addr = SocketAddr::from(([0, 0, 0, 0], port));

        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()?;

        info!(address = %addr, "Prometheus 指標監聽已啟動");
        Ok(())
    }

    fn title(&self) -> &str {
        "metrics"
    }
}

/// 記錄單次HTTP請求指標：計數與時延
pub fn record_request(method: &str, status: u16, started: std::time::Instant) {
    metrics::counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string()
    )
    .record(started.elapsed().as_secs_f64());
}
