//! 进程内模拟机械臂
//!
//! [`SimulatedArm`] 实现 [`ControlChannel`]，拆分后在后台线程中运行一个
//! 简化的机械臂模型：
//!
//! - 使能 / 回零请求在可配置的延迟后被确认（可关闭确认以模拟卡死）
//! - 运动目标先在 `busy_delay` 后变为忙碌，再经过 `motion_duration` 完成
//! - 周期性发布状态报告（心跳）
//! - 支持故障注入与命令记录（测试用）

mod model;

use crate::{ChannelError, CommandSink, ControlChannel, StateStream, topic_path};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use model::Plant;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{JoinHandle, spawn};
use std::time::{Duration, Instant};
use teleop_protocol::{ArmCommand, ArmModel, PoseFrame, StateUpdate};
use tracing::{debug, trace};

/// 空闲时的最长阻塞时间（没有待触发事件且没有心跳时）
const IDLE_WAIT: Duration = Duration::from_millis(100);

/// 模拟机械臂配置
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// 状态心跳周期（`Duration::ZERO` 表示只在变化时发布）
    pub report_interval: Duration,
    /// 使能确认延迟
    pub ack_delay: Duration,
    /// 回零耗时
    pub home_delay: Duration,
    /// 收到运动目标到报告忙碌的延迟
    pub busy_delay: Duration,
    /// 运动耗时（忙碌持续时间）
    pub motion_duration: Duration,
    /// 是否确认使能 / 回零请求
    pub acknowledge: bool,
    /// 初始末端位姿
    pub initial_pose: PoseFrame,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            report_interval: Duration::from_millis(20),
            ack_delay: Duration::from_millis(50),
            home_delay: Duration::from_millis(100),
            busy_delay: Duration::ZERO,
            motion_duration: Duration::from_millis(200),
            acknowledge: true,
            initial_pose: PoseFrame::from_translation(0.0, 0.0, -0.12),
        }
    }
}

/// 已发送命令记录
#[derive(Debug, Clone, PartialEq)]
pub struct SentCommand {
    /// 完整话题路径（含命名空间）
    pub topic: String,
    pub command: ArmCommand,
    pub sent_at: Instant,
}

enum SimInput {
    Command(ArmCommand),
    Fault(String),
    Inject(StateUpdate),
    Shutdown,
}

/// 模拟机械臂（控制通道实现）
pub struct SimulatedArm {
    model: ArmModel,
    config: SimConfig,
    input_tx: Sender<SimInput>,
    input_rx: Receiver<SimInput>,
    log: Arc<Mutex<Vec<SentCommand>>>,
    acknowledge: Arc<AtomicBool>,
}

impl SimulatedArm {
    pub fn new(model: ArmModel, config: SimConfig) -> Self {
        let (input_tx, input_rx) = unbounded();
        let acknowledge = Arc::new(AtomicBool::new(config.acknowledge));
        Self {
            model,
            config,
            input_tx,
            input_rx,
            log: Arc::new(Mutex::new(Vec::new())),
            acknowledge,
        }
    }

    pub fn model(&self) -> ArmModel {
        self.model
    }

    /// 测试 / 演示用句柄（拆分后仍然有效）
    pub fn handle(&self) -> SimHandle {
        SimHandle {
            input_tx: self.input_tx.clone(),
            log: self.log.clone(),
            acknowledge: self.acknowledge.clone(),
        }
    }
}

impl ControlChannel for SimulatedArm {
    type Stream = SimStream;
    type Sink = SimSink;

    fn namespace(&self) -> &str {
        self.model.name()
    }

    fn split(self) -> Result<(SimStream, SimSink), ChannelError> {
        let (update_tx, update_rx) = unbounded();
        let plant = Plant::new(self.model.joint_count(), self.config.clone());
        let input_rx = self.input_rx;
        let acknowledge = self.acknowledge.clone();
        let report_interval = self.config.report_interval;

        let thread = spawn(move || {
            sim_loop(plant, input_rx, update_tx, acknowledge, report_interval);
        });

        let stream = SimStream {
            updates: update_rx,
            input_tx: self.input_tx.clone(),
            thread: Some(thread),
        };
        let sink = SimSink {
            namespace: self.model.name().to_string(),
            input_tx: self.input_tx,
            log: self.log,
        };
        Ok((stream, sink))
    }
}

fn sim_loop(
    mut plant: Plant,
    inputs: Receiver<SimInput>,
    updates: Sender<StateUpdate>,
    acknowledge: Arc<AtomicBool>,
    report_interval: Duration,
) {
    let mut outbox = Vec::new();
    plant.snapshot(&mut outbox);

    let heartbeat = !report_interval.is_zero();
    let mut next_report = Instant::now() + report_interval;

    loop {
        for update in outbox.drain(..) {
            if updates.send(update).is_err() {
                debug!("Simulated arm: state stream dropped, exiting");
                return;
            }
        }

        let now = Instant::now();
        let mut deadline = plant.next_deadline();
        if heartbeat {
            deadline = Some(deadline.map_or(next_report, |d| d.min(next_report)));
        }
        let wait = deadline.map_or(IDLE_WAIT, |d| d.saturating_duration_since(now));

        match inputs.recv_timeout(wait) {
            Ok(SimInput::Command(command)) => {
                let ack = acknowledge.load(Ordering::Acquire);
                plant.apply(&command, ack, Instant::now(), &mut outbox);
            },
            Ok(SimInput::Fault(reason)) => plant.fault(&reason, &mut outbox),
            Ok(SimInput::Inject(update)) => outbox.push(update),
            Ok(SimInput::Shutdown) | Err(RecvTimeoutError::Disconnected) => {
                debug!("Simulated arm: shutdown");
                return;
            },
            Err(RecvTimeoutError::Timeout) => {},
        }

        let now = Instant::now();
        plant.advance(now, &mut outbox);

        if heartbeat && now >= next_report {
            trace!("Simulated arm heartbeat: {:?}", plant.report());
            outbox.push(StateUpdate::Operating(plant.report()));
            next_report = now + report_interval;
        }
    }
}

/// 模拟机械臂的状态流
pub struct SimStream {
    updates: Receiver<StateUpdate>,
    input_tx: Sender<SimInput>,
    thread: Option<JoinHandle<()>>,
}

impl StateStream for SimStream {
    fn receive(&mut self, timeout: Duration) -> Result<StateUpdate, ChannelError> {
        self.updates.recv_timeout(timeout).map_err(|e| match e {
            RecvTimeoutError::Timeout => ChannelError::Timeout,
            RecvTimeoutError::Disconnected => ChannelError::Closed,
        })
    }
}

impl Drop for SimStream {
    fn drop(&mut self) {
        let _ = self.input_tx.send(SimInput::Shutdown);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// 模拟机械臂的命令发送端
pub struct SimSink {
    namespace: String,
    input_tx: Sender<SimInput>,
    log: Arc<Mutex<Vec<SentCommand>>>,
}

impl CommandSink for SimSink {
    fn send_command(&mut self, topic: &str, command: &ArmCommand) -> Result<(), ChannelError> {
        let topic = topic_path(&self.namespace, topic);
        trace!("Simulated publish on {}: {:?}", topic, command);
        self.log.lock().push(SentCommand {
            topic,
            command: command.clone(),
            sent_at: Instant::now(),
        });
        self.input_tx
            .send(SimInput::Command(command.clone()))
            .map_err(|_| ChannelError::Closed)
    }
}

/// 模拟机械臂的外部句柄
///
/// 可以在通道被驱动层接管之后继续注入故障、查看命令记录。
#[derive(Clone)]
pub struct SimHandle {
    input_tx: Sender<SimInput>,
    log: Arc<Mutex<Vec<SentCommand>>>,
    acknowledge: Arc<AtomicBool>,
}

impl SimHandle {
    /// 已发送命令的副本
    pub fn command_log(&self) -> Vec<SentCommand> {
        self.log.lock().clone()
    }

    pub fn command_count(&self) -> usize {
        self.log.lock().len()
    }

    /// 指定话题后缀上的命令数
    pub fn commands_on(&self, suffix: &str) -> usize {
        self.log
            .lock()
            .iter()
            .filter(|c| c.command.topic() == suffix)
            .count()
    }

    pub fn clear_log(&self) {
        self.log.lock().clear();
    }

    /// 注入故障通知（状态回到 DISABLED）
    pub fn inject_fault(&self, reason: impl Into<String>) {
        let _ = self.input_tx.send(SimInput::Fault(reason.into()));
    }

    /// 直接向状态流注入一条消息
    pub fn inject(&self, update: StateUpdate) {
        let _ = self.input_tx.send(SimInput::Inject(update));
    }

    /// 开关使能 / 回零确认（对之后收到的请求生效）
    pub fn set_acknowledge(&self, acknowledge: bool) {
        self.acknowledge.store(acknowledge, Ordering::Release);
    }

    pub fn acknowledges(&self) -> bool {
        self.acknowledge.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use teleop_protocol::{ArmState, GoalId, JointVector, OperatingReport, topics};

    fn fast_config() -> SimConfig {
        SimConfig {
            report_interval: Duration::from_millis(5),
            ack_delay: Duration::from_millis(5),
            home_delay: Duration::from_millis(5),
            motion_duration: Duration::from_millis(20),
            ..SimConfig::default()
        }
    }

    /// 读取状态流直到满足条件或超时
    fn wait_for(
        stream: &mut SimStream,
        timeout: Duration,
        mut pred: impl FnMut(&StateUpdate) -> bool,
    ) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Ok(update) = stream.receive(Duration::from_millis(10))
                && pred(&update)
            {
                return true;
            }
        }
        false
    }

    #[test]
    fn test_initial_snapshot_and_heartbeat() {
        let arm = SimulatedArm::new(ArmModel::Psm1, fast_config());
        let (mut stream, _sink) = arm.split().unwrap();

        let mut reports = 0;
        let seen = wait_for(&mut stream, Duration::from_secs(1), |u| {
            if matches!(u, StateUpdate::Operating(r) if r.state == ArmState::Disabled) {
                reports += 1;
            }
            reports >= 3
        });
        assert!(seen, "expected repeated DISABLED heartbeats");
    }

    #[test]
    fn test_sink_logs_namespaced_topics() {
        let arm = SimulatedArm::new(ArmModel::Psm2, fast_config());
        let handle = arm.handle();
        let (mut stream, mut sink) = arm.split().unwrap();

        sink.send_command(topics::STATE_COMMAND, &ArmCommand::Enable)
            .unwrap();
        assert!(wait_for(&mut stream, Duration::from_secs(1), |u| {
            *u == StateUpdate::Operating(OperatingReport::new(ArmState::Enabled, false))
        }));

        let log = handle.command_log();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].topic, "PSM2/state_command");
        assert_eq!(handle.commands_on(topics::STATE_COMMAND), 1);
        assert_eq!(handle.commands_on(topics::MOVE_JP), 0);
    }

    #[test]
    fn test_full_motion_cycle() {
        let arm = SimulatedArm::new(ArmModel::Psm3, fast_config());
        let (mut stream, mut sink) = arm.split().unwrap();

        sink.send_command(topics::STATE_COMMAND, &ArmCommand::Enable)
            .unwrap();
        assert!(wait_for(&mut stream, Duration::from_secs(1), |u| {
            matches!(u, StateUpdate::Operating(r) if r.state == ArmState::Enabled)
        }));
        sink.send_command(topics::STATE_COMMAND, &ArmCommand::Home)
            .unwrap();
        assert!(wait_for(&mut stream, Duration::from_secs(1), |u| {
            matches!(u, StateUpdate::Operating(r) if r.state == ArmState::Homed)
        }));

        let target = JointVector::zeros(6).with(2, 0.12);
        sink.send_command(
            topics::MOVE_JP,
            &ArmCommand::MoveJoint {
                goal: GoalId(1),
                target: target.clone(),
            },
        )
        .unwrap();

        assert!(wait_for(&mut stream, Duration::from_secs(1), |u| {
            matches!(u, StateUpdate::Operating(r) if r.is_busy)
        }));
        assert!(wait_for(&mut stream, Duration::from_secs(1), |u| {
            *u == StateUpdate::SetpointJoints(target.clone())
        }));
    }

    #[test]
    fn test_injected_fault_is_published() {
        let arm = SimulatedArm::new(ArmModel::Psm1, fast_config());
        let handle = arm.handle();
        let (mut stream, _sink) = arm.split().unwrap();

        handle.inject_fault("overcurrent");
        assert!(wait_for(&mut stream, Duration::from_secs(1), |u| {
            matches!(u, StateUpdate::Fault { reason } if reason == "overcurrent")
        }));
    }

    #[test]
    fn test_stream_closed_after_sim_exit() {
        let arm = SimulatedArm::new(ArmModel::Psm1, fast_config());
        let handle = arm.handle();
        let (stream, sink) = arm.split().unwrap();
        drop(stream);

        // 线程已退出，命令仍会被记录，但发送可能失败
        let mut sink = sink;
        let _ = sink.send_command(topics::STATE_COMMAND, &ArmCommand::Disable);
        assert_eq!(handle.command_count(), 1);
    }
}
