//! Pipeline IO 循环模块
//!
//! RX 线程把状态流写入 [`ArmContext`]，TX 线程把命令写入控制通道。
//! 两个线程通过 `is_running` 标志联动：任何一方遇到致命错误都会让另一方退出。

use crate::metrics::DriverMetrics;
use crate::state::ArmContext;
use crossbeam_channel::Receiver;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use teleop_channel::{ChannelError, CommandSink, StateStream};
use teleop_protocol::{ArmCommand, StateUpdate};
use tracing::{error, info, trace, warn};

/// 实时命令邮箱（容量 1，覆盖写）
pub type RealtimeSlot = Arc<Mutex<Option<ArmCommand>>>;

/// Pipeline 配置
///
/// ```
/// use teleop_driver::PipelineConfig;
///
/// let config = PipelineConfig {
///     receive_timeout_ms: 2,
///     ..PipelineConfig::default()
/// };
/// assert_eq!(config.reliable_queue_capacity, 10);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// 状态流接收超时（毫秒）
    pub receive_timeout_ms: u64,
    /// 超过此时间未收到任何状态即视为断连（毫秒）
    pub connection_timeout_ms: u64,
    /// 可靠命令队列容量
    pub reliable_queue_capacity: usize,
    /// 队列满时入队最多等待的时间（毫秒）
    pub reliable_enqueue_timeout_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            receive_timeout_ms: 5,
            connection_timeout_ms: 500,
            reliable_queue_capacity: 10,
            reliable_enqueue_timeout_ms: 100,
        }
    }
}

/// 把一条状态消息合并进共享上下文
pub fn apply_update(update: StateUpdate, ctx: &ArmContext, metrics: &DriverMetrics) {
    let now = Instant::now();
    match update {
        StateUpdate::Operating(report) => {
            metrics.rx_reports.fetch_add(1, Ordering::Relaxed);
            let previous = ctx.operating.load().state;
            if previous != report.state {
                info!("Arm state: {} -> {}", previous, report.state);
            }
            ctx.operating
                .rcu(|old| Arc::new(old.with_report(report, now)));
            trace!("Operating report: {:?}", report);
        },
        StateUpdate::Fault { reason } => {
            metrics.rx_faults.fetch_add(1, Ordering::Relaxed);
            warn!("Arm fault: {}, state forced to DISABLED", reason);
            ctx.operating
                .rcu(|old| Arc::new(old.with_fault(&reason, now)));
        },
        other => {
            ctx.kinematics.rcu(|old| {
                let mut next = (**old).clone();
                match &other {
                    StateUpdate::SetpointJoints(v) => next.setpoint_joints = Some(v.clone()),
                    StateUpdate::MeasuredJoints(v) => next.measured_joints = Some(v.clone()),
                    StateUpdate::SetpointPose(p) => next.setpoint_pose = Some(*p),
                    StateUpdate::MeasuredPose(p) => next.measured_pose = Some(*p),
                    StateUpdate::JawSetpoint(a) => next.jaw_setpoint = Some(*a),
                    StateUpdate::Operating(_) | StateUpdate::Fault { .. } => {},
                }
                next.update_count += 1;
                Arc::new(next)
            });
        },
    }
    ctx.connection.register_feedback();
}

/// RX 线程主循环
///
/// # 参数
/// - `stream`: 状态流（只读）
/// - `ctx`: 共享状态上下文（本线程是唯一写入者）
/// - `config`: Pipeline 配置
/// - `is_running`: 运行标志（用于生命周期联动）
/// - `metrics`: 性能指标
pub fn rx_loop(
    mut stream: impl StateStream,
    ctx: Arc<ArmContext>,
    config: PipelineConfig,
    is_running: Arc<AtomicBool>,
    metrics: Arc<DriverMetrics>,
) {
    let receive_timeout = Duration::from_millis(config.receive_timeout_ms);

    loop {
        // Acquire: If we see false, we must see all cleanup writes from other threads
        if !is_running.load(Ordering::Acquire) {
            trace!("RX thread: is_running flag is false, exiting");
            break;
        }

        let update = match stream.receive(receive_timeout) {
            Ok(update) => {
                metrics.rx_updates_total.fetch_add(1, Ordering::Relaxed);
                update
            },
            Err(ChannelError::Timeout) => {
                metrics.rx_timeouts.fetch_add(1, Ordering::Relaxed);
                continue;
            },
            Err(e) => {
                metrics.channel_errors.fetch_add(1, Ordering::Relaxed);
                if e.is_fatal() {
                    error!("RX thread: state stream closed, setting is_running = false");
                    // Release: All writes before this are visible to threads that see the false value
                    is_running.store(false, Ordering::Release);
                    break;
                }
                // 非致命错误，继续尝试接收
                warn!("RX thread: receive error: {}", e);
                continue;
            },
        };

        apply_update(update, &ctx, &metrics);
    }

    trace!("RX thread: loop exited");
}

/// 发送一条命令，返回是否应当退出 TX 循环
fn send_one(sink: &mut impl CommandSink, command: &ArmCommand, metrics: &DriverMetrics) -> bool {
    match sink.send_command(command.topic(), command) {
        Ok(()) => {
            metrics.tx_commands_total.fetch_add(1, Ordering::Relaxed);
            false
        },
        Err(e) => {
            metrics.channel_errors.fetch_add(1, Ordering::Relaxed);
            if e.is_fatal() {
                error!("TX thread: command channel closed while sending {:?}", command);
                true
            } else {
                warn!("TX thread: failed to send {:?}: {}", command, e);
                false
            }
        },
    }
}

/// TX 线程主循环（邮箱模式）
///
/// 实时邮箱优先于可靠队列；连续处理 `REALTIME_BURST_LIMIT` 个实时命令后
/// 强制检查一次可靠队列，避免生命周期命令被饿死。
///
/// # 参数
/// - `sink`: 命令发送端（只写）
/// - `realtime_slot`: 实时命令邮箱
/// - `reliable_rx`: 可靠命令队列接收端
/// - `is_running`: 运行标志（用于生命周期联动）
/// - `metrics`: 性能指标
pub fn tx_loop_mailbox(
    mut sink: impl CommandSink,
    realtime_slot: RealtimeSlot,
    reliable_rx: Receiver<ArmCommand>,
    is_running: Arc<AtomicBool>,
    metrics: Arc<DriverMetrics>,
) {
    const REALTIME_BURST_LIMIT: usize = 100;
    let mut realtime_burst_count = 0;

    loop {
        if !is_running.load(Ordering::Acquire) {
            trace!("TX thread: is_running flag is false, exiting");
            break;
        }

        // Priority 1: 实时邮箱（短作用域，锁立即释放）
        let realtime_command = match realtime_slot.lock() {
            Ok(mut slot) => slot.take(),
            Err(_) => {
                error!("TX thread: Realtime slot lock poisoned");
                None
            },
        };

        if let Some(command) = realtime_command {
            if send_one(&mut sink, &command, &metrics) {
                is_running.store(false, Ordering::Release);
                break;
            }

            realtime_burst_count += 1;
            if realtime_burst_count >= REALTIME_BURST_LIMIT {
                realtime_burst_count = 0;
            } else {
                continue;
            }
        } else {
            realtime_burst_count = 0;
        }

        // Priority 2: 可靠命令队列
        if let Ok(command) = reliable_rx.try_recv() {
            trace!("TX thread: sending reliable {:?}", command);
            if send_one(&mut sink, &command, &metrics) {
                is_running.store(false, Ordering::Release);
                break;
            }
            continue;
        }

        // 都没有数据，短暂休眠避免忙等待
        spin_sleep::sleep(Duration::from_micros(50));
    }

    trace!("TX thread: loop exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use std::collections::VecDeque;
    use std::thread;
    use teleop_protocol::{ArmState, GoalId, JointVector, OperatingReport};

    struct ScriptedStream {
        updates: VecDeque<StateUpdate>,
        close_when_empty: bool,
    }

    impl StateStream for ScriptedStream {
        fn receive(&mut self, _timeout: Duration) -> Result<StateUpdate, ChannelError> {
            match self.updates.pop_front() {
                Some(update) => Ok(update),
                None if self.close_when_empty => Err(ChannelError::Closed),
                None => {
                    thread::sleep(Duration::from_millis(1));
                    Err(ChannelError::Timeout)
                },
            }
        }
    }

    #[derive(Clone, Default)]
    struct RecordingSink {
        sent: Arc<Mutex<Vec<(String, ArmCommand)>>>,
        fail_closed: bool,
    }

    impl CommandSink for RecordingSink {
        fn send_command(&mut self, topic: &str, command: &ArmCommand) -> Result<(), ChannelError> {
            if self.fail_closed {
                return Err(ChannelError::Closed);
            }
            self.sent
                .lock()
                .unwrap()
                .push((topic.to_string(), command.clone()));
            Ok(())
        }
    }

    fn report(state: ArmState, busy: bool) -> StateUpdate {
        StateUpdate::Operating(OperatingReport::new(state, busy))
    }

    #[test]
    fn test_pipeline_config_default() {
        let config = PipelineConfig::default();
        assert_eq!(config.receive_timeout_ms, 5);
        assert_eq!(config.connection_timeout_ms, 500);
        assert_eq!(config.reliable_queue_capacity, 10);
        assert_eq!(config.reliable_enqueue_timeout_ms, 100);
    }

    #[test]
    fn test_apply_update_routes_messages() {
        let ctx = ArmContext::new(Duration::from_secs(1));
        let metrics = DriverMetrics::new();

        apply_update(report(ArmState::Enabled, false), &ctx, &metrics);
        apply_update(
            StateUpdate::SetpointJoints(JointVector::zeros(6)),
            &ctx,
            &metrics,
        );
        apply_update(StateUpdate::JawSetpoint(0.4), &ctx, &metrics);

        let operating = ctx.operating();
        assert_eq!(operating.state, ArmState::Enabled);
        assert_eq!(operating.report_seq, 1);

        let kinematics = ctx.kinematics();
        assert_eq!(kinematics.setpoint_joints, Some(JointVector::zeros(6)));
        assert_eq!(kinematics.jaw_setpoint, Some(0.4));
        assert_eq!(kinematics.update_count, 2);

        assert_eq!(metrics.snapshot().rx_reports, 1);
        assert_eq!(ctx.connection.feedback_count(), 3);
    }

    #[test]
    fn test_busy_sequence_survives_random_interleaving() {
        let ctx = ArmContext::new(Duration::from_secs(1));
        let metrics = DriverMetrics::new();
        let mut rng = rand::thread_rng();
        let mut expected_last_busy = 0;

        for seq in 1..=200u64 {
            let busy = rng.gen_bool(0.3);
            if busy {
                expected_last_busy = seq;
            }
            apply_update(report(ArmState::Homed, busy), &ctx, &metrics);
            // 非报告消息不影响序号
            if rng.gen_bool(0.5) {
                apply_update(StateUpdate::JawSetpoint(0.0), &ctx, &metrics);
            }
        }

        let operating = ctx.operating();
        assert_eq!(operating.report_seq, 200);
        assert_eq!(operating.last_busy_seq, expected_last_busy);
    }

    #[test]
    fn test_rx_loop_exits_on_closed_stream() {
        let ctx = Arc::new(ArmContext::new(Duration::from_secs(1)));
        let is_running = Arc::new(AtomicBool::new(true));
        let metrics = Arc::new(DriverMetrics::new());
        let stream = ScriptedStream {
            updates: VecDeque::from(vec![
                report(ArmState::Enabling, false),
                StateUpdate::Fault {
                    reason: "estop".to_string(),
                },
            ]),
            close_when_empty: true,
        };

        rx_loop(
            stream,
            ctx.clone(),
            PipelineConfig::default(),
            is_running.clone(),
            metrics.clone(),
        );

        assert!(!is_running.load(Ordering::Acquire));
        let operating = ctx.operating();
        assert_eq!(operating.state, ArmState::Disabled);
        assert_eq!(operating.fault_count, 1);
        assert_eq!(metrics.snapshot().channel_errors, 1);
    }

    #[test]
    fn test_tx_loop_realtime_before_reliable() {
        let sink = RecordingSink::default();
        let sent = sink.sent.clone();
        let slot: RealtimeSlot = Arc::new(Mutex::new(None));
        let (reliable_tx, reliable_rx) = crossbeam_channel::bounded(10);
        let is_running = Arc::new(AtomicBool::new(true));
        let metrics = Arc::new(DriverMetrics::new());

        // 先填好两条通路，再启动 TX 线程
        reliable_tx.send(ArmCommand::Enable).unwrap();
        reliable_tx
            .send(ArmCommand::MoveJaw {
                goal: GoalId(1),
                angle: 0.2,
            })
            .unwrap();
        *slot.lock().unwrap() = Some(ArmCommand::ServoJaw { angle: 0.9 });

        let handle = {
            let slot = slot.clone();
            let is_running = is_running.clone();
            let metrics = metrics.clone();
            thread::spawn(move || tx_loop_mailbox(sink, slot, reliable_rx, is_running, metrics))
        };

        let deadline = Instant::now() + Duration::from_secs(1);
        while sent.lock().unwrap().len() < 3 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        is_running.store(false, Ordering::Release);
        handle.join().unwrap();

        let sent = sent.lock().unwrap();
        let topics: Vec<&str> = sent.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(topics, vec!["jaw/servo_jp", "state_command", "jaw/move_jp"]);
        assert_eq!(metrics.snapshot().tx_commands_total, 3);
    }

    #[test]
    fn test_tx_loop_stops_on_closed_sink() {
        let sink = RecordingSink {
            fail_closed: true,
            ..RecordingSink::default()
        };
        let slot: RealtimeSlot = Arc::new(Mutex::new(None));
        let (reliable_tx, reliable_rx) = crossbeam_channel::bounded(10);
        let is_running = Arc::new(AtomicBool::new(true));
        let metrics = Arc::new(DriverMetrics::new());

        reliable_tx.send(ArmCommand::Home).unwrap();
        tx_loop_mailbox(sink, slot, reliable_rx, is_running.clone(), metrics.clone());

        assert!(!is_running.load(Ordering::Acquire));
        assert_eq!(metrics.snapshot().channel_errors, 1);
    }
}
