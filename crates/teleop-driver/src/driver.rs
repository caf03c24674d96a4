//! 驱动对外 API
//!
//! [`Driver`] 持有 RX / TX 两个 IO 线程和共享状态上下文。

use crate::command::{CommandPriority, priority_of};
use crate::error::DriverError;
use crate::metrics::{DriverMetrics, MetricsSnapshot};
use crate::pipeline::{PipelineConfig, RealtimeSlot, rx_loop, tx_loop_mailbox};
use crate::state::{ArmContext, KinematicState, OperatingStatus};
use crossbeam_channel::{SendTimeoutError, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{JoinHandle, spawn};
use std::time::{Duration, Instant};
use teleop_channel::ControlChannel;
use teleop_protocol::{ArmCommand, GoalId};
use tracing::{debug, error, info};

/// Extension trait for timeout-capable thread joins
trait JoinTimeout {
    fn join_timeout(self, timeout: Duration) -> std::thread::Result<()>;
}

impl<T: Send + 'static> JoinTimeout for JoinHandle<T> {
    fn join_timeout(self, timeout: Duration) -> std::thread::Result<()> {
        use std::sync::mpsc;

        let (tx, rx) = mpsc::channel();

        // Watchdog thread performs the blocking join
        spawn(move || {
            let result = self.join();
            let _ = tx.send(result);
        });

        match rx.recv_timeout(timeout) {
            Ok(join_result) => join_result.map(|_| ()),
            Err(mpsc::RecvTimeoutError::Timeout) => Err(Box::new(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "Thread join timeout",
            ))),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(Box::new(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "Thread panicked during join",
            ))),
        }
    }
}

/// 机械臂驱动
///
/// 控制通道被拆分为状态流和命令发送端：
/// - RX 线程持续把状态写入 [`ArmContext`]，调用者阻塞等待时状态仍在更新
/// - TX 线程优先发送实时邮箱中的伺服设定点，其次是可靠队列中的命令
pub struct Driver {
    namespace: String,
    realtime_slot: RealtimeSlot,
    reliable_tx: Sender<ArmCommand>,
    enqueue_timeout: Duration,
    goal_lock: Mutex<()>,
    ctx: Arc<ArmContext>,
    rx_thread: Option<JoinHandle<()>>,
    tx_thread: Option<JoinHandle<()>>,
    is_running: Arc<AtomicBool>,
    metrics: Arc<DriverMetrics>,
}

impl Driver {
    /// 创建驱动并启动 IO 线程
    ///
    /// # 参数
    /// - `channel`: 控制通道（会被拆分并移动到 IO 线程）
    /// - `config`: Pipeline 配置（可选）
    ///
    /// # 错误
    /// - `DriverError::Channel`: 通道拆分失败
    pub fn new<C: ControlChannel>(
        channel: C,
        config: Option<PipelineConfig>,
    ) -> Result<Self, DriverError> {
        let config = config.unwrap_or_default();
        let namespace = channel.namespace().to_string();

        let (stream, sink) = channel.split()?;

        let realtime_slot: RealtimeSlot = Arc::new(Mutex::new(None));
        let (reliable_tx, reliable_rx) =
            crossbeam_channel::bounded::<ArmCommand>(config.reliable_queue_capacity);

        let ctx = Arc::new(ArmContext::new(Duration::from_millis(
            config.connection_timeout_ms,
        )));
        let is_running = Arc::new(AtomicBool::new(true));
        let metrics = Arc::new(DriverMetrics::new());

        let rx_thread = {
            let ctx = ctx.clone();
            let is_running = is_running.clone();
            let metrics = metrics.clone();
            let config = config.clone();
            spawn(move || rx_loop(stream, ctx, config, is_running, metrics))
        };

        let tx_thread = {
            let slot = realtime_slot.clone();
            let is_running = is_running.clone();
            let metrics = metrics.clone();
            spawn(move || tx_loop_mailbox(sink, slot, reliable_rx, is_running, metrics))
        };

        info!("Driver started for {}", namespace);

        Ok(Self {
            namespace,
            realtime_slot,
            reliable_tx,
            enqueue_timeout: Duration::from_millis(config.reliable_enqueue_timeout_ms),
            goal_lock: Mutex::new(()),
            ctx,
            rx_thread: Some(rx_thread),
            tx_thread: Some(tx_thread),
            is_running,
            metrics,
        })
    }

    /// 话题命名空间（机械臂名称）
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// 共享状态上下文
    pub fn context(&self) -> &Arc<ArmContext> {
        &self.ctx
    }

    /// 操作状态快照（无锁）
    pub fn operating(&self) -> Arc<OperatingStatus> {
        self.ctx.operating()
    }

    /// 运动学状态快照（无锁）
    pub fn kinematics(&self) -> Arc<KinematicState> {
        self.ctx.kinematics()
    }

    /// 最近一次分配的目标编号
    pub fn latest_goal(&self) -> Option<GoalId> {
        self.ctx.latest_goal()
    }

    /// 返回 RX 和 TX 线程的存活状态
    pub fn check_health(&self) -> (bool, bool) {
        let rx_alive = self.rx_thread.as_ref().is_some_and(|h| !h.is_finished());
        let tx_alive = self.tx_thread.as_ref().is_some_and(|h| !h.is_finished());
        (rx_alive, tx_alive)
    }

    /// 两个 IO 线程都存活且运行标志未被清除
    pub fn is_healthy(&self) -> bool {
        let (rx_alive, tx_alive) = self.check_health();
        rx_alive && tx_alive && self.is_running.load(Ordering::Acquire)
    }

    /// 在连接超时窗口内收到过状态
    pub fn is_connected(&self) -> bool {
        self.ctx.connection.check_connection()
    }

    /// 距离上一条状态消息的时间
    pub fn connection_age(&self) -> Duration {
        self.ctx.connection.time_since_last_feedback()
    }

    pub fn get_metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// 等待第一条状态报告
    ///
    /// # 错误
    /// - `DriverError::Timeout`: 超时仍未收到报告
    /// - `DriverError::ChannelClosed`: IO 线程已退出
    pub fn wait_for_feedback(&self, timeout: Duration) -> Result<(), DriverError> {
        let start = Instant::now();

        loop {
            if self.ctx.operating.load().has_report() {
                return Ok(());
            }
            if !self.is_running.load(Ordering::Acquire) {
                return Err(DriverError::ChannelClosed);
            }
            if start.elapsed() >= timeout {
                return Err(DriverError::Timeout);
            }
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    /// 发送可靠命令（FIFO）
    ///
    /// 队列满时最多阻塞 `reliable_enqueue_timeout_ms`。
    ///
    /// # 错误
    /// - `DriverError::ChannelClosed`: TX 线程已退出
    /// - `DriverError::ChannelFull`: 等待超时后队列仍满
    pub fn send_reliable(&self, command: ArmCommand) -> Result<(), DriverError> {
        if !self.is_running.load(Ordering::Acquire) {
            return Err(DriverError::ChannelClosed);
        }
        self.enqueue_reliable(command)
    }

    /// 分配目标编号并把 `build` 生成的命令放入可靠队列
    ///
    /// 编号只在入队成功后才被占用：失败的派发不会让已有目标变成 superseded。
    /// 同一驱动上的并发派发按编号顺序入队。
    ///
    /// # 错误
    /// 同 [`Driver::send_reliable`]
    pub fn dispatch_goal(
        &self,
        build: impl FnOnce(GoalId) -> ArmCommand,
    ) -> Result<GoalId, DriverError> {
        if !self.is_running.load(Ordering::Acquire) {
            return Err(DriverError::ChannelClosed);
        }

        let _guard = self.goal_lock.lock().map_err(|_| DriverError::PoisonedLock)?;
        let id = self.ctx.peek_next_goal();
        self.enqueue_reliable(build(id))?;
        self.ctx.commit_goal(id);
        Ok(id)
    }

    fn enqueue_reliable(&self, command: ArmCommand) -> Result<(), DriverError> {
        match self.reliable_tx.send_timeout(command, self.enqueue_timeout) {
            Ok(()) => Ok(()),
            Err(SendTimeoutError::Timeout(command)) => {
                self.metrics.tx_reliable_drops.fetch_add(1, Ordering::Relaxed);
                error!(
                    "Reliable queue still full after {:?}, dropping {:?}",
                    self.enqueue_timeout, command
                );
                Err(DriverError::ChannelFull)
            },
            Err(SendTimeoutError::Disconnected(_)) => Err(DriverError::ChannelClosed),
        }
    }

    /// 写入实时邮箱（覆盖未发送的旧值，永不阻塞）
    ///
    /// # 错误
    /// - `DriverError::ChannelClosed`: TX 线程已退出
    /// - `DriverError::PoisonedLock`: 锁中毒
    pub fn send_realtime(&self, command: ArmCommand) -> Result<(), DriverError> {
        if !self.is_running.load(Ordering::Acquire) {
            return Err(DriverError::ChannelClosed);
        }

        let mut slot = self
            .realtime_slot
            .lock()
            .map_err(|_| DriverError::PoisonedLock)?;
        if slot.replace(command).is_some() {
            self.metrics
                .tx_realtime_overwrites
                .fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }

    /// 按命令优先级自动选择通路
    pub fn send_command(&self, command: ArmCommand) -> Result<(), DriverError> {
        debug!("Queue {:?} on {}", command, self.namespace);
        match priority_of(&command) {
            CommandPriority::RealtimeControl => self.send_realtime(command),
            CommandPriority::ReliableCommand => self.send_reliable(command),
        }
    }
}

impl Drop for Driver {
    fn drop(&mut self) {
        // Release: 之前的写入对看到 false 的线程可见
        self.is_running.store(false, Ordering::Release);

        let join_timeout = Duration::from_secs(2);

        if let Some(handle) = self.rx_thread.take()
            && let Err(_e) = handle.join_timeout(join_timeout)
        {
            error!(
                "RX thread panicked or failed to shut down within {:?}",
                join_timeout
            );
        }

        if let Some(handle) = self.tx_thread.take()
            && let Err(_e) = handle.join_timeout(join_timeout)
        {
            error!(
                "TX thread panicked or failed to shut down within {:?}",
                join_timeout
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use teleop_channel::{SimConfig, SimulatedArm};
    use teleop_protocol::{ArmModel, ArmState, topics};

    fn fast_sim() -> SimConfig {
        SimConfig {
            report_interval: Duration::from_millis(5),
            ack_delay: Duration::from_millis(5),
            home_delay: Duration::from_millis(5),
            motion_duration: Duration::from_millis(20),
            ..SimConfig::default()
        }
    }

    fn wait_until(timeout: Duration, mut pred: impl FnMut() -> bool) -> bool {
        let start = Instant::now();
        while start.elapsed() < timeout {
            if pred() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        false
    }

    #[test]
    fn test_driver_receives_initial_state() {
        let driver = Driver::new(SimulatedArm::new(ArmModel::Psm1, fast_sim()), None).unwrap();
        driver.wait_for_feedback(Duration::from_secs(1)).unwrap();

        assert_eq!(driver.namespace(), "PSM1");
        assert_eq!(driver.operating().state, ArmState::Disabled);
        assert!(driver.kinematics().setpoint_pose.is_some());
        assert!(driver.is_healthy());
        assert!(driver.is_connected());
    }

    #[test]
    fn test_driver_sends_reliable_commands_in_order() {
        let arm = SimulatedArm::new(ArmModel::Psm2, fast_sim());
        let sim = arm.handle();
        let driver = Driver::new(arm, None).unwrap();

        driver.send_command(ArmCommand::Enable).unwrap();
        assert!(wait_until(Duration::from_secs(1), || {
            driver.operating().state == ArmState::Enabled
        }));
        driver.send_command(ArmCommand::Home).unwrap();
        assert!(wait_until(Duration::from_secs(1), || {
            driver.operating().state == ArmState::Homed
        }));

        let log = sim.command_log();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].command, ArmCommand::Enable);
        assert_eq!(log[1].command, ArmCommand::Home);
        assert!(log.iter().all(|c| c.topic == "PSM2/state_command"));
    }

    #[test]
    fn test_realtime_slot_overwrites() {
        let driver = Driver::new(SimulatedArm::new(ArmModel::Psm1, fast_sim()), None).unwrap();

        for i in 0..50 {
            driver
                .send_realtime(ArmCommand::ServoJaw {
                    angle: i as f64 * 0.01,
                })
                .unwrap();
        }

        // 每个设定点要么被发送，要么被后来的值覆盖
        assert!(wait_until(Duration::from_secs(1), || {
            let m = driver.get_metrics();
            m.tx_realtime_overwrites + m.tx_commands_total == 50
        }));
    }

    #[test]
    fn test_fault_reaches_context() {
        let arm = SimulatedArm::new(ArmModel::Psm3, fast_sim());
        let sim = arm.handle();
        let driver = Driver::new(arm, None).unwrap();
        driver.wait_for_feedback(Duration::from_secs(1)).unwrap();

        sim.inject_fault("watchdog");
        assert!(wait_until(Duration::from_secs(1), || {
            driver.operating().fault_count == 1
        }));
        assert_eq!(
            driver.operating().last_fault.as_deref(),
            Some("watchdog")
        );
        assert_eq!(driver.get_metrics().rx_faults, 1);
        assert_eq!(sim.commands_on(topics::MOVE_JP), 0);
    }

    #[test]
    fn test_goal_burst_is_enqueued_in_order() {
        let arm = SimulatedArm::new(ArmModel::Psm1, fast_sim());
        let sim = arm.handle();
        let driver = Driver::new(arm, None).unwrap();

        let ids: Vec<GoalId> = (0..200)
            .map(|i| {
                driver
                    .dispatch_goal(|goal| ArmCommand::MoveJaw {
                        goal,
                        angle: i as f64 * 0.001,
                    })
                    .unwrap()
            })
            .collect();

        assert!(ids.windows(2).all(|w| w[1].0 == w[0].0 + 1));
        assert_eq!(driver.latest_goal(), ids.last().copied());
        assert!(wait_until(Duration::from_secs(2), || sim.command_count() == 200));
        assert_eq!(driver.get_metrics().tx_reliable_drops, 0);
    }

    #[test]
    fn test_concurrent_dispatch_allocates_unique_ids() {
        let driver = Arc::new(
            Driver::new(SimulatedArm::new(ArmModel::Psm1, fast_sim()), None).unwrap(),
        );
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let driver = driver.clone();
                std::thread::spawn(move || {
                    (0..50)
                        .map(|_| {
                            driver
                                .dispatch_goal(|goal| ArmCommand::MoveJaw { goal, angle: 0.0 })
                                .unwrap()
                                .0
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut all: Vec<u64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), 200);
        assert_eq!(driver.latest_goal(), Some(GoalId(200)));
    }

    #[test]
    fn test_failed_dispatch_does_not_consume_goal_id() {
        let driver = Driver::new(SimulatedArm::new(ArmModel::Psm1, fast_sim()), None).unwrap();
        let first = driver
            .dispatch_goal(|goal| ArmCommand::MoveJaw { goal, angle: 0.0 })
            .unwrap();

        driver.is_running.store(false, Ordering::Release);
        assert_eq!(
            driver.dispatch_goal(|goal| ArmCommand::MoveJaw { goal, angle: 0.1 }),
            Err(DriverError::ChannelClosed)
        );
        assert_eq!(driver.latest_goal(), Some(first));
    }

    #[test]
    fn test_send_after_shutdown_fails() {
        let driver = Driver::new(SimulatedArm::new(ArmModel::Psm1, fast_sim()), None).unwrap();
        driver.is_running.store(false, Ordering::Release);

        assert_eq!(
            driver.send_reliable(ArmCommand::Enable),
            Err(DriverError::ChannelClosed)
        );
        assert!(!driver.is_healthy());
    }
}
