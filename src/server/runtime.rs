// runtime.rs - 伺服器運行時
//
// 持有路由緩衝、生命週期註冊表與監聽器，驅動四階段生命週期：
// prepare → 路由刷入並開始接收（屏障同步）→ post-start → 阻塞等待
// 終止信號 → 期限內優雅停機（排空在途請求 → finalize → destroy）。

use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::http::header::HeaderName;
use axum::http::{header, HeaderValue, Method};
use axum::middleware;
use axum::routing::MethodRouter;
use axum::Router;
use tokio::net::TcpListener;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::{oneshot, watch, RwLock};
use tokio::time::Instant;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use crate::api::response::api_not_found;
use crate::api::trace::propagate_trace_id;
use crate::config::types::ServerConfig;
use crate::server::error::{ServerError, ServerResult};
use crate::server::lifecycle::LifecycleRegistry;
use crate::server::routes::RouteTable;
use crate::server::ServerState;

/// 伺服器運行時實例。
/// 全部字段為共享句柄，克隆代價低，便於在後台任務間傳遞。
#[derive(Clone)]
pub struct ServerRuntime {
    config: Arc<ServerConfig>,
    registry: Arc<LifecycleRegistry>,
    routes: Arc<RouteTable>,
    state: Arc<RwLock<ServerState>>,
    /// 優雅停機觸發通道
    shutdown: Arc<watch::Sender<bool>>,
    /// 監聽任務退出通知
    serve_done: Arc<watch::Sender<bool>>,
    local_addr: Arc<parking_lot::RwLock<Option<SocketAddr>>>,
    serve_active: Arc<AtomicBool>,
}

impl std::fmt::Debug for ServerRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerRuntime")
            .field("local_addr", &*self.local_addr.read())
            .field("serve_active", &self.serve_active.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl ServerRuntime {
    pub fn new(config: ServerConfig, registry: LifecycleRegistry) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        let (serve_done_tx, _) = watch::channel(false);
        Self {
            config: Arc::new(config),
            registry: Arc::new(registry),
            routes: Arc::new(RouteTable::new()),
            state: Arc::new(RwLock::new(ServerState::Initializing)),
            shutdown: Arc::new(shutdown_tx),
            serve_done: Arc::new(serve_done_tx),
            local_addr: Arc::new(parking_lot::RwLock::new(None)),
            serve_active: Arc::new(AtomicBool::new(false)),
        }
    }

    /// 註冊路由。僅允許在 `start` 之前調用：路由在啟動時一次性
    /// 刷入監聽器且不再重刷，啟動後註冊的路由不會生效（前置條件，
    /// 不做運行時攔截）。按路由中間件由調用方組合進MethodRouter。
    pub fn register_route(
        &self,
        method: Method,
        path: &str,
        service: MethodRouter,
    ) -> ServerResult<()> {
        debug!(method = %method, path, "註冊路由");
        self.routes.insert(method, path, service)
    }

    /// 獲取伺服器狀態
    pub async fn state(&self) -> ServerState {
        *self.state.read().await
    }

    /// 監聽器實際綁定地址（啟動後可用）
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.read()
    }

    pub fn registry(&self) -> &LifecycleRegistry {
        &self.registry
    }

    /// 啟動伺服器：prepare → 綁定 → 路由刷入（屏障）→ post-start。
    /// 綁定失敗或任一prepare/post-start鉤子失敗都直接返回錯誤，不重試。
    pub async fn start(&self) -> ServerResult<()> {
        info!("啟動伺服器...");
        {
            let mut state = self.state.write().await;
            *state = ServerState::Initializing;
        }

        // 生命週期準備階段
        self.registry.run_prepare().await?;

        // 綁定監聽器
        let addr = SocketAddr::from((self.config.host.parse::<IpAddr>()?, self.config.port));
        let listener = TcpListener::bind(addr).await?;
        let local = listener.local_addr()?;
        *self.local_addr.write() = Some(local);

        let (ready_tx, ready_rx) = oneshot::channel();
        let routes = self.routes.clone();
        let config = self.config.clone();
        let mut shutdown_rx = self.shutdown.subscribe();
        let serve_done = self.serve_done.clone();
        self.serve_active.store(true, Ordering::SeqCst);

        tokio::spawn(async move {
            // 路由刷入先於接收請求：屏障保證不會對半填充的路由表提供服務
            let app = build_app(&routes, &config);
            let _ = ready_tx.send(());

            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.changed().await;
                })
                .await;
            if let Err(err) = result {
                error!(error = %err, "HTTP 服務異常退出");
            }
            let _ = serve_done.send(true);
        });

        // 等待路由刷入完成；屏障失敗說明監聽任務在刷入前崩潰，啟動致命
        ready_rx.await.map_err(|_| {
            ServerError::Initialization("監聽任務在路由刷入完成前退出".to_string())
        })?;

        info!(address = %local, routes = self.routes.len(), "HTTP 服務已啟動");

        // 生命週期啟動後階段
        self.registry.run_post_start().await?;

        {
            let mut state = self.state.write().await;
            *state = ServerState::Running;
        }

        info!("伺服器已啟動");
        Ok(())
    }

    /// 啟動並阻塞運行直到收到終止信號，隨後在配置期限內優雅停機。
    /// 啟動任務的錯誤或panic會轉為合成停機信號，不讓進程默默崩潰。
    pub async fn serve_forever(&self) -> ServerResult<()> {
        // 先安裝信號處理，避免啟動窗口內丟失信號
        let mut signals = ShutdownSignals::install()?;

        let runtime = self.clone();
        let boot = tokio::spawn(async move { runtime.start().await });

        let boot_error = match boot.await {
            Ok(Ok(())) => None,
            Ok(Err(err)) => {
                error!(error = %err, "系統啟動失敗，即將停機");
                Some(err)
            }
            Err(join_err) => {
                error!(error = %join_err, panicked = join_err.is_panic(), "系統運行異常，即將停止，請檢查!");
                Some(ServerError::Runtime(format!("啟動任務異常: {}", join_err)))
            }
        };

        if boot_error.is_none() {
            // 阻塞等待終止信號；監聽任務意外退出同樣觸發停機
            let mut serve_done = self.serve_done.subscribe();
            tokio::select! {
                name = signals.recv() => info!(signal = name, "接收到終止信號"),
                _ = serve_done.wait_for(|done| *done) => warn!("監聽任務意外退出，開始停機"),
            }
        }

        self.stop(self.config.shutdown_timeout()).await;

        match boot_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// 優雅停機：停止接收新請求、期限內排空在途請求，之後依次執行
    /// finalize與destroy鉤子。各子步驟失敗只記錄、不上拋；整體牆鐘
    /// 時間不超過期限。
    pub async fn stop(&self, timeout: Duration) {
        info!(timeout = ?timeout, "正在關閉伺服器...");
        {
            let mut state = self.state.write().await;
            *state = ServerState::ShuttingDown;
        }
        let deadline = Instant::now() + timeout;

        // 停止接收新連接並排空在途請求
        let _ = self.shutdown.send(true);
        if self.serve_active.load(Ordering::SeqCst) {
            let mut serve_done = self.serve_done.subscribe();
            match tokio::time::timeout_at(deadline, serve_done.wait_for(|done| *done)).await {
                Ok(Ok(_)) => info!("在途請求已排空"),
                Ok(Err(_)) => warn!("監聽任務通道已關閉"),
                Err(_) => warn!("排空在途請求超出停機期限，強制繼續"),
            };
        }

        // 清理兩階段：先排水再釋放；失敗聚合記錄，停機流程不中斷
        let finalize_report = self.registry.run_finalize(deadline).await;
        if !finalize_report.is_clean() {
            warn!(
                failures = finalize_report.failures().len(),
                "Finalize 階段存在失敗鉤子"
            );
        }
        let destroy_report = self.registry.run_destroy(deadline).await;
        if !destroy_report.is_clean() {
            warn!(
                failures = destroy_report.failures().len(),
                "Destroy 階段存在失敗鉤子"
            );
        }

        {
            let mut state = self.state.write().await;
            *state = ServerState::Stopped;
        }
        info!("伺服器已關閉");
    }
}

/// 將緩衝路由與配置化中間件組裝為axum應用。
/// 刷入發生且僅發生一次，由 `start` 的屏障保證順序。
pub fn build_app(routes: &RouteTable, config: &ServerConfig) -> Router {
    let app = routes.flush_into(Router::new());

    // 未匹配路由返回統一失敗封套
    let app = app.fallback(api_not_found);

    let request_id_header = HeaderName::from_bytes(config.request_id_header.as_bytes())
        .unwrap_or(HeaderName::from_static("x-request-id"));

    let mut app = app
        .layer(middleware::from_fn_with_state(
            request_id_header,
            propagate_trace_id,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(config.request_timeout()));

    if config.enable_compression {
        app = app.layer(CompressionLayer::new());
    }
    if config.max_body_size > 0 {
        info!(max_body_size = config.max_body_size, "開啟請求體大小限制");
        app = app.layer(RequestBodyLimitLayer::new(config.max_body_size as usize));
    }
    if config.enable_cors {
        info!("開啟跨域訪問");
        app = app.layer(build_cors_layer(config));
    }

    app
}

fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_methods(vec![
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
        ])
        .allow_headers(vec![header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_origin(origins)
}

/// 終止信號集合：SIGINT / SIGTERM / SIGHUP / SIGQUIT
struct ShutdownSignals {
    interrupt: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
    hangup: tokio::signal::unix::Signal,
    quit: tokio::signal::unix::Signal,
}

impl ShutdownSignals {
    fn install() -> std::io::Result<Self> {
        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
            hangup: signal(SignalKind::hangup())?,
            quit: signal(SignalKind::quit())?,
        })
    }

    async fn recv(&mut self) -> &'static str {
        tokio::select! {
            _ = self.interrupt.recv() => "SIGINT",
            _ = self.terminate.recv() => "SIGTERM",
            _ = self.hangup.recv() => "SIGHUP",
            _ = self.quit.recv() => "SIGQUIT",
        }
    }
}
