use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// 故障事件
///
/// 一次探测发现的问题设备列表，作为故障回调的参数。
/// unknown 中的设备只触发回调、不写入任何故障集合（继承自历史行为）。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FaultEvent {
    pub degraded: Vec<String>,
    pub faulted: Vec<String>,
    pub unavailable: Vec<String>,
    pub unknown: Vec<String>,
}

impl FaultEvent {
    pub fn is_empty(&self) -> bool {
        self.degraded.is_empty()
            && self.faulted.is_empty()
            && self.unavailable.is_empty()
            && self.unknown.is_empty()
    }
}

/// 健康探测接口
///
/// check 返回 None 表示本轮健康；返回事件则监视器锁存并同步调用 on_fault。
/// check 内部的错误不得终止监视器，返回 Err 按"本轮无故障"处理。
#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// 执行一次健康探测
    async fn check(&self) -> anyhow::Result<Option<FaultEvent>>;

    /// 故障回调，在监视器任务上同步执行
    ///
    /// 回调完成通告（日志已发出）后应调用 latch.clear_fault()，
    /// 监视器自身从不自动解除锁存。
    async fn on_fault(&self, event: FaultEvent, latch: &FaultLatch);
}

/// 故障锁存标志
///
/// 锁存期间监视器跳过探测，避免对同一状况重复回调；
/// 只能通过 clear_fault 显式解除。
#[derive(Clone)]
pub struct FaultLatch(Arc<AtomicBool>);

impl FaultLatch {
    fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn is_latched(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// 解除锁存，下一个周期恢复探测
    pub fn clear_fault(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    fn latch(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// 设备健康监视器
///
/// 后台周期性调用后端探测，首次发现故障即锁存并停止探测，
/// 直到显式解除。状态机：Idle → Probing → (Healthy→Idle | Faulted→Latched)，
/// Latched → Idle 仅经由 clear_fault。
pub struct HealthMonitor {
    interval: Duration,
    probe: Arc<dyn HealthProbe>,
    latch: FaultLatch,
}

/// 监视器任务句柄
pub struct MonitorTaskHandle {
    shutdown_tx: watch::Sender<bool>,
    join_handle: JoinHandle<()>,
    latch: FaultLatch,
}

impl MonitorTaskHandle {
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.join_handle.await;
    }

    pub fn abort(self) {
        self.join_handle.abort();
    }

    pub fn is_latched(&self) -> bool {
        self.latch.is_latched()
    }

    pub fn clear_fault(&self) {
        self.latch.clear_fault();
    }
}

impl HealthMonitor {
    pub fn new(interval: Duration, probe: Arc<dyn HealthProbe>) -> Self {
        Self {
            interval,
            probe,
            latch: FaultLatch::new(),
        }
    }

    /// 锁存标志的克隆，供外部查询或解除
    pub fn latch(&self) -> FaultLatch {
        self.latch.clone()
    }

    /// 启动后台监视任务
    pub fn spawn(self) -> MonitorTaskHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let latch = self.latch.clone();
        let join_handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        self.tick().await;
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        if *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
        });

        MonitorTaskHandle {
            shutdown_tx,
            join_handle,
            latch,
        }
    }

    async fn tick(&self) {
        if self.latch.is_latched() {
            // 已有未确认的故障，跳过探测
            return;
        }
        match self.probe.check().await {
            Ok(Some(event)) => {
                debug!(?event, "Health probe reported fault");
                // 先锁存再回调，回调内可立即解除
                self.latch.latch();
                self.probe.on_fault(event, &self.latch).await;
            }
            Ok(None) => {}
            Err(e) => {
                // 探测内部错误按本轮无故障处理，监视器继续运行
                error!(error = %e, "Unhandled health probe error");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct TestProbe {
        faulty: AtomicBool,
        failing: AtomicBool,
        checks: AtomicUsize,
        callbacks: AtomicUsize,
        auto_clear: bool,
    }

    impl TestProbe {
        fn new(auto_clear: bool) -> Arc<Self> {
            Arc::new(Self {
                faulty: AtomicBool::new(false),
                failing: AtomicBool::new(false),
                checks: AtomicUsize::new(0),
                callbacks: AtomicUsize::new(0),
                auto_clear,
            })
        }
    }

    #[async_trait]
    impl HealthProbe for TestProbe {
        async fn check(&self) -> anyhow::Result<Option<FaultEvent>> {
            self.checks.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                anyhow::bail!("probe exploded");
            }
            if self.faulty.load(Ordering::SeqCst) {
                Ok(Some(FaultEvent {
                    degraded: vec!["sda1".to_string()],
                    ..Default::default()
                }))
            } else {
                Ok(None)
            }
        }

        async fn on_fault(&self, _event: FaultEvent, latch: &FaultLatch) {
            self.callbacks.fetch_add(1, Ordering::SeqCst);
            if self.auto_clear {
                latch.clear_fault();
            }
        }
    }

    #[tokio::test]
    async fn test_healthy_probe_keeps_polling() {
        let probe = TestProbe::new(false);
        let monitor = HealthMonitor::new(Duration::from_millis(20), probe.clone());
        let handle = monitor.spawn();

        tokio::time::sleep(Duration::from_millis(150)).await;
        handle.shutdown().await;

        assert!(probe.checks.load(Ordering::SeqCst) >= 2);
        assert_eq!(probe.callbacks.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fault_latches_until_cleared() {
        let probe = TestProbe::new(false);
        probe.faulty.store(true, Ordering::SeqCst);
        let monitor = HealthMonitor::new(Duration::from_millis(20), probe.clone());
        let handle = monitor.spawn();

        tokio::time::sleep(Duration::from_millis(150)).await;
        // 锁存后不再探测，回调只发生一次
        assert_eq!(probe.callbacks.load(Ordering::SeqCst), 1);
        assert_eq!(probe.checks.load(Ordering::SeqCst), 1);
        assert!(handle.is_latched());

        // 显式解除后下一轮故障探测再次回调
        handle.clear_fault();
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(probe.callbacks.load(Ordering::SeqCst), 2);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_callback_may_clear_immediately() {
        let probe = TestProbe::new(true);
        probe.faulty.store(true, Ordering::SeqCst);
        let monitor = HealthMonitor::new(Duration::from_millis(20), probe.clone());
        let handle = monitor.spawn();

        tokio::time::sleep(Duration::from_millis(150)).await;
        // 回调内解除锁存，每个周期都会重新探测并通告
        assert!(probe.callbacks.load(Ordering::SeqCst) >= 2);
        assert!(!handle.is_latched());
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_probe_error_does_not_kill_monitor() {
        let probe = TestProbe::new(false);
        probe.failing.store(true, Ordering::SeqCst);
        let monitor = HealthMonitor::new(Duration::from_millis(20), probe.clone());
        let handle = monitor.spawn();

        tokio::time::sleep(Duration::from_millis(150)).await;
        handle.shutdown().await;

        // 探测报错按无故障处理，循环继续
        assert!(probe.checks.load(Ordering::SeqCst) >= 2);
        assert_eq!(probe.callbacks.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_recovery_after_clear() {
        let probe = TestProbe::new(false);
        probe.faulty.store(true, Ordering::SeqCst);
        let monitor = HealthMonitor::new(Duration::from_millis(20), probe.clone());
        let handle = monitor.spawn();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(probe.callbacks.load(Ordering::SeqCst), 1);

        // 故障消失后解除锁存，恢复周期探测且不再回调
        probe.faulty.store(false, Ordering::SeqCst);
        handle.clear_fault();
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert!(probe.checks.load(Ordering::SeqCst) >= 3);
        assert_eq!(probe.callbacks.load(Ordering::SeqCst), 1);

        handle.shutdown().await;
    }
}
