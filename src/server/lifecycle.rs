// lifecycle.rs - 生命週期編排
//
// 四個階段：prepare（啟動前準備）→ post-start（監聽就緒後）→
// finalize（停機排水）→ destroy（資源釋放）。
// prepare / post-start 首錯即中止並作為啟動致命錯誤上拋；
// finalize / destroy 為盡力而為：逐個執行、失敗只記錄不上拋，
// 超出停機期限的鉤子被放棄等待，保證停機在期限內返回。

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::server::error::{ServerError, ServerResult};

/// 啟動前準備鉤子，如配置中心、連接池只需初始化一次的組件
#[async_trait]
pub trait Preparer: Send + Sync {
    async fn on_prepare(&self) -> Result<()>;
    fn title(&self) -> &str;
}

/// 監聽就緒後執行的鉤子，如服務註冊、預熱
#[async_trait]
pub trait PostStarter: Send + Sync {
    async fn on_after(&self) -> Result<()>;
    fn title(&self) -> &str;
}

/// 停機排水鉤子：在監聽停止後、資源釋放前執行
#[async_trait]
pub trait Finalizer: Send + Sync {
    async fn on_finalize(&self, deadline: Instant) -> Result<()>;
    fn title(&self) -> &str;
}

/// 資源釋放鉤子，如關閉日誌文件、斷開連接
#[async_trait]
pub trait Destroyer: Send + Sync {
    async fn on_destroy(&self, deadline: Instant) -> Result<()>;
    fn title(&self) -> &str;
}

/// 生命週期階段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Prepare,
    PostStart,
    Finalize,
    Destroy,
}

/// 單個階段的運行狀態。
/// prepare / post-start 可能Aborted；finalize / destroy 永遠走到Completed。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseState {
    Pending,
    Running,
    Completed,
    Aborted,
}

impl Default for PhaseState {
    fn default() -> Self {
        PhaseState::Pending
    }
}

/// 鉤子註冊載體：各階段能力為顯式的可選槽位，註冊時逐槽掛載。
/// 同一個對象可以同時掛載多個階段（以Arc克隆傳入多個槽位）。
#[derive(Default)]
pub struct Hook {
    preparer: Option<Arc<dyn Preparer>>,
    post_starter: Option<Arc<dyn PostStarter>>,
    finalizer: Option<Arc<dyn Finalizer>>,
    destroyer: Option<Arc<dyn Destroyer>>,
}

impl Hook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn preparer(mut self, preparer: Arc<dyn Preparer>) -> Self {
        self.preparer = Some(preparer);
        self
    }

    pub fn post_starter(mut self, post_starter: Arc<dyn PostStarter>) -> Self {
        self.post_starter = Some(post_starter);
        self
    }

    pub fn finalizer(mut self, finalizer: Arc<dyn Finalizer>) -> Self {
        self.finalizer = Some(finalizer);
        self
    }

    pub fn destroyer(mut self, destroyer: Arc<dyn Destroyer>) -> Self {
        self.destroyer = Some(destroyer);
        self
    }
}

/// 清理階段的失敗原因
#[derive(Debug)]
pub enum CleanupCause {
    Error(anyhow::Error),
    DeadlineExceeded,
}

/// 清理階段單個鉤子的失敗記錄
#[derive(Debug)]
pub struct CleanupFailure {
    pub phase: &'static str,
    pub title: String,
    pub cause: CleanupCause,
}

/// 清理階段的聚合結果：收集全部失敗，由調用方決定記錄方式
#[derive(Debug, Default)]
pub struct CleanupReport {
    failures: Vec<CleanupFailure>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failures(&self) -> &[CleanupFailure] {
        &self.failures
    }

    pub fn merge(&mut self, other: CleanupReport) {
        self.failures.extend(other.failures);
    }

    fn record_error(&mut self, phase: &'static str, title: &str, error: anyhow::Error) {
        self.failures.push(CleanupFailure {
            phase,
            title: title.to_string(),
            cause: CleanupCause::Error(error),
        });
    }

    fn record_overrun(&mut self, phase: &'static str, title: &str) {
        self.failures.push(CleanupFailure {
            phase,
            title: title.to_string(),
            cause: CleanupCause::DeadlineExceeded,
        });
    }
}

/// 生命週期註冊表。
///
/// 接線階段（單線程）填充四個階段列表，服務啟動後只讀。
/// 註冊表為顯式對象、由ServerRuntime持有，測試中可以並存多個實例。
#[derive(Default)]
pub struct LifecycleRegistry {
    prepares: Vec<Arc<dyn Preparer>>,
    post_starts: Vec<Arc<dyn PostStarter>>,
    finalizers: Vec<Arc<dyn Finalizer>>,
    destroyers: Vec<Arc<dyn Destroyer>>,
    prepare_state: RwLock<PhaseState>,
    post_start_state: RwLock<PhaseState>,
    finalize_state: RwLock<PhaseState>,
    destroy_state: RwLock<PhaseState>,
}

impl LifecycleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 掛載一個鉤子：每個已填充的能力槽位追加到對應階段列表
    pub fn add_hook(&mut self, hook: Hook) {
        if let Some(preparer) = hook.preparer {
            self.prepares.push(preparer);
        }
        if let Some(post_starter) = hook.post_starter {
            self.post_starts.push(post_starter);
        }
        if let Some(finalizer) = hook.finalizer {
            self.finalizers.push(finalizer);
        }
        if let Some(destroyer) = hook.destroyer {
            self.destroyers.push(destroyer);
        }
    }

    pub fn add_preparer(&mut self, preparer: Arc<dyn Preparer>) {
        self.prepares.push(preparer);
    }

    pub fn add_post_starter(&mut self, post_starter: Arc<dyn PostStarter>) {
        self.post_starts.push(post_starter);
    }

    pub fn add_finalizer(&mut self, finalizer: Arc<dyn Finalizer>) {
        self.finalizers.push(finalizer);
    }

    pub fn add_destroyer(&mut self, destroyer: Arc<dyn Destroyer>) {
        self.destroyers.push(destroyer);
    }

    /// 查詢指定階段的運行狀態
    pub fn phase_state(&self, phase: Phase) -> PhaseState {
        *self.state_cell(phase).read()
    }

    /// 按註冊順序執行prepare鉤子，首錯中止並上拋
    pub async fn run_prepare(&self) -> ServerResult<()> {
        self.set_state(Phase::Prepare, PhaseState::Running);
        for hook in &self.prepares {
            info!(title = hook.title(), "Prepare 生命週期就緒");
            if let Err(err) = hook.on_prepare().await {
                error!(title = hook.title(), error = %err, "Prepare 生命週期執行失敗");
                self.set_state(Phase::Prepare, PhaseState::Aborted);
                return Err(ServerError::Lifecycle {
                    phase: "prepare",
                    title: hook.title().to_string(),
                    cause: err,
                });
            }
            info!(title = hook.title(), "Prepare 生命週期完成");
        }
        self.set_state(Phase::Prepare, PhaseState::Completed);
        Ok(())
    }

    /// 按註冊順序執行post-start鉤子，首錯中止並上拋
    pub async fn run_post_start(&self) -> ServerResult<()> {
        self.set_state(Phase::PostStart, PhaseState::Running);
        for hook in &self.post_starts {
            info!(title = hook.title(), "After 生命週期就緒");
            if let Err(err) = hook.on_after().await {
                error!(title = hook.title(), error = %err, "After 生命週期執行失敗");
                self.set_state(Phase::PostStart, PhaseState::Aborted);
                return Err(ServerError::Lifecycle {
                    phase: "post-start",
                    title: hook.title().to_string(),
                    cause: err,
                });
            }
            info!(title = hook.title(), "After 生命週期完成");
        }
        self.set_state(Phase::PostStart, PhaseState::Completed);
        Ok(())
    }

    /// 按註冊順序執行finalize鉤子（停機排水），盡力而為
    pub async fn run_finalize(&self, deadline: Instant) -> CleanupReport {
        self.set_state(Phase::Finalize, PhaseState::Running);
        let mut report = CleanupReport::default();
        for hook in &self.finalizers {
            Self::run_cleanup_hook(
                "finalize",
                hook.title(),
                hook.on_finalize(deadline),
                deadline,
                &mut report,
            )
            .await;
        }
        self.set_state(Phase::Finalize, PhaseState::Completed);
        report
    }

    /// 按註冊順序執行destroy鉤子（資源釋放），盡力而為
    pub async fn run_destroy(&self, deadline: Instant) -> CleanupReport {
        self.set_state(Phase::Destroy, PhaseState::Running);
        let mut report = CleanupReport::default();
        for hook in &self.destroyers {
            Self::run_cleanup_hook(
                "destroy",
                hook.title(),
                hook.on_destroy(deadline),
                deadline,
                &mut report,
            )
            .await;
        }
        self.set_state(Phase::Destroy, PhaseState::Completed);
        report
    }

    /// 單個清理鉤子的執行：錯誤與超限只記錄，不阻斷後續鉤子。
    /// 超出期限時放棄等待該鉤子（future被丟棄），保證停機期限有效。
    async fn run_cleanup_hook(
        phase: &'static str,
        title: &str,
        fut: impl std::future::Future<Output = Result<()>>,
        deadline: Instant,
        report: &mut CleanupReport,
    ) {
        match tokio::time::timeout_at(deadline, fut).await {
            Ok(Ok(())) => info!(title, phase, "清理鉤子完成"),
            Ok(Err(err)) => {
                error!(title, phase, error = %err, "清理鉤子執行失敗");
                report.record_error(phase, title, err);
            }
            Err(_) => {
                warn!(title, phase, "清理鉤子超出停機期限，放棄等待");
                report.record_overrun(phase, title);
            }
        }
    }

    fn set_state(&self, phase: Phase, state: PhaseState) {
        *self.state_cell(phase).write() = state;
    }

    fn state_cell(&self, phase: Phase) -> &RwLock<PhaseState> {
        match phase {
            Phase::Prepare => &self.prepare_state,
            Phase::PostStart => &self.post_start_state,
            Phase::Finalize => &self.finalize_state,
            Phase::Destroy => &self.destroy_state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::time::Duration;

    /// 可配置的測試鉤子，記錄各階段調用順序
    struct RecordingHook {
        name: &'static str,
        calls: Arc<Mutex<Vec<String>>>,
        fail_prepare: bool,
        fail_destroy: bool,
    }

    impl RecordingHook {
        fn new(name: &'static str, calls: Arc<Mutex<Vec<String>>>) -> Arc<Self> {
            Arc::new(Self {
                name,
                calls,
                fail_prepare: false,
                fail_destroy: false,
            })
        }

        fn record(&self, phase: &str) {
            self.calls.lock().push(format!("{}:{}", phase, self.name));
        }
    }

    #[async_trait]
    impl Preparer for RecordingHook {
        async fn on_prepare(&self) -> Result<()> {
            self.record("prepare");
            if self.fail_prepare {
                anyhow::bail!("prepare blew up");
            }
            Ok(())
        }

        fn title(&self) -> &str {
            self.name
        }
    }

    #[async_trait]
    impl PostStarter for RecordingHook {
        async fn on_after(&self) -> Result<()> {
            self.record("after");
            Ok(())
        }

        fn title(&self) -> &str {
            self.name
        }
    }

    #[async_trait]
    impl Finalizer for RecordingHook {
        async fn on_finalize(&self, _deadline: Instant) -> Result<()> {
            self.record("finalize");
            Ok(())
        }

        fn title(&self) -> &str {
            self.name
        }
    }

    #[async_trait]
    impl Destroyer for RecordingHook {
        async fn on_destroy(&self, _deadline: Instant) -> Result<()> {
            self.record("destroy");
            if self.fail_destroy {
                anyhow::bail!("destroy blew up");
            }
            Ok(())
        }

        fn title(&self) -> &str {
            self.name
        }
    }

    fn deadline_in(duration: Duration) -> Instant {
        Instant::now() + duration
    }

    #[tokio::test]
    async fn test_capability_slots_route_to_phases() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        // h1 掛載 prepare + destroy，h2 僅 destroy
        let h1 = RecordingHook::new("h1", calls.clone());
        let h2 = RecordingHook::new("h2", calls.clone());

        let mut registry = LifecycleRegistry::new();
        registry.add_hook(
            Hook::new()
                .preparer(h1.clone())
                .destroyer(h1.clone()),
        );
        registry.add_hook(Hook::new().destroyer(h2.clone()));

        registry.run_prepare().await.unwrap();
        registry
            .run_destroy(deadline_in(Duration::from_secs(1)))
            .await;

        // prepare 只有 h1；destroy 按註冊順序 h1 再 h2
        assert_eq!(
            *calls.lock(),
            vec!["prepare:h1", "destroy:h1", "destroy:h2"]
        );
    }

    #[tokio::test]
    async fn test_prepare_aborts_on_first_error() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let ok = RecordingHook::new("ok", calls.clone());
        let boom = Arc::new(RecordingHook {
            name: "boom",
            calls: calls.clone(),
            fail_prepare: true,
            fail_destroy: false,
        });
        let never = RecordingHook::new("never", calls.clone());

        let mut registry = LifecycleRegistry::new();
        registry.add_preparer(ok);
        registry.add_preparer(boom);
        registry.add_preparer(never);

        let err = registry.run_prepare().await.unwrap_err();
        assert!(matches!(err, ServerError::Lifecycle { phase: "prepare", .. }));
        assert_eq!(registry.phase_state(Phase::Prepare), PhaseState::Aborted);
        // 後續鉤子不再執行
        assert_eq!(*calls.lock(), vec!["prepare:ok", "prepare:boom"]);
    }

    #[tokio::test]
    async fn test_destroy_continues_past_failures() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let boom = Arc::new(RecordingHook {
            name: "boom",
            calls: calls.clone(),
            fail_prepare: false,
            fail_destroy: true,
        });
        let after = RecordingHook::new("after", calls.clone());

        let mut registry = LifecycleRegistry::new();
        registry.add_destroyer(boom);
        registry.add_destroyer(after);

        let report = registry
            .run_destroy(deadline_in(Duration::from_secs(1)))
            .await;

        // 失敗被聚合記錄，後續鉤子照常執行，階段仍然Completed
        assert_eq!(report.failures().len(), 1);
        assert_eq!(report.failures()[0].title, "boom");
        assert_eq!(*calls.lock(), vec!["destroy:boom", "destroy:after"]);
        assert_eq!(registry.phase_state(Phase::Destroy), PhaseState::Completed);
    }

    struct SleepyFinalizer;

    #[async_trait]
    impl Finalizer for SleepyFinalizer {
        async fn on_finalize(&self, _deadline: Instant) -> Result<()> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        }

        fn title(&self) -> &str {
            "sleepy"
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_finalize_abandons_hook_at_deadline() {
        let mut registry = LifecycleRegistry::new();
        registry.add_finalizer(Arc::new(SleepyFinalizer));

        let deadline = Instant::now() + Duration::from_secs(2);
        let report = registry.run_finalize(deadline).await;

        assert!(Instant::now() <= deadline + Duration::from_millis(100));
        assert_eq!(report.failures().len(), 1);
        assert!(matches!(
            report.failures()[0].cause,
            CleanupCause::DeadlineExceeded
        ));
        assert_eq!(registry.phase_state(Phase::Finalize), PhaseState::Completed);
    }

    #[tokio::test]
    async fn test_phase_states_progress() {
        let registry = LifecycleRegistry::new();
        assert_eq!(registry.phase_state(Phase::Prepare), PhaseState::Pending);
        registry.run_prepare().await.unwrap();
        assert_eq!(registry.phase_state(Phase::Prepare), PhaseState::Completed);
        assert_eq!(registry.phase_state(Phase::PostStart), PhaseState::Pending);
    }
}
