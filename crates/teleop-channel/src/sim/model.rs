//! 模拟机械臂的状态模型（纯逻辑，无线程）
//!
//! 所有时间推进都由调用者传入的 `now` 驱动，方便单元测试。

use super::SimConfig;
use std::time::Instant;
use teleop_protocol::{
    ArmCommand, ArmState, GoalId, JointVector, OperatingReport, PoseFrame, StateUpdate,
};
use tracing::{debug, info, warn};

/// 运动目标完成后写入的设定点
#[derive(Debug, Clone, PartialEq)]
enum Setpoint {
    Joints(JointVector),
    Pose(PoseFrame),
    Jaw(f64),
}

/// 延迟事件
#[derive(Debug, Clone, PartialEq)]
enum Event {
    Enabled,
    Homed,
    BusyOn(GoalId),
    MotionDone(GoalId, Setpoint),
}

pub(crate) struct Plant {
    config: SimConfig,
    state: ArmState,
    is_busy: bool,
    active_goal: Option<GoalId>,
    joints: JointVector,
    pose: PoseFrame,
    jaw: f64,
    /// 按触发时间排序
    pending: Vec<(Instant, Event)>,
}

impl Plant {
    pub(crate) fn new(joint_count: usize, config: SimConfig) -> Self {
        let pose = config.initial_pose;
        Plant {
            config,
            state: ArmState::Disabled,
            is_busy: false,
            active_goal: None,
            joints: JointVector::zeros(joint_count),
            pose,
            jaw: 0.0,
            pending: Vec::new(),
        }
    }

    pub(crate) fn report(&self) -> OperatingReport {
        OperatingReport::new(self.state, self.is_busy)
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> ArmState {
        self.state
    }

    /// 完整状态（连接建立时发布一次）
    pub(crate) fn snapshot(&self, out: &mut Vec<StateUpdate>) {
        out.push(StateUpdate::SetpointJoints(self.joints.clone()));
        out.push(StateUpdate::MeasuredJoints(self.joints.clone()));
        out.push(StateUpdate::SetpointPose(self.pose));
        out.push(StateUpdate::MeasuredPose(self.pose));
        out.push(StateUpdate::JawSetpoint(self.jaw));
        out.push(StateUpdate::Operating(self.report()));
    }

    pub(crate) fn next_deadline(&self) -> Option<Instant> {
        self.pending.first().map(|(at, _)| *at)
    }

    fn schedule(&mut self, at: Instant, event: Event) {
        // 稳定排序：同一时刻的事件保持提交顺序
        let pos = self.pending.partition_point(|(t, _)| *t <= at);
        self.pending.insert(pos, (at, event));
    }

    fn cancel_motion(&mut self) {
        self.pending
            .retain(|(_, e)| !matches!(e, Event::BusyOn(_) | Event::MotionDone(..)));
    }

    fn publish(&self, out: &mut Vec<StateUpdate>) {
        out.push(StateUpdate::Operating(self.report()));
    }

    fn transition(&mut self, to: ArmState, out: &mut Vec<StateUpdate>) {
        if self.state != to {
            info!("Simulated arm state: {} -> {}", self.state, to);
            self.state = to;
        }
        self.publish(out);
    }

    /// 处理一条命令
    pub(crate) fn apply(
        &mut self,
        command: &ArmCommand,
        acknowledge: bool,
        now: Instant,
        out: &mut Vec<StateUpdate>,
    ) {
        debug!("Simulated arm received {:?}", command);
        match command {
            ArmCommand::Enable => match self.state {
                ArmState::Disabled | ArmState::Enabling => {
                    // 重复请求重新计时应答
                    self.pending.retain(|(_, e)| !matches!(e, Event::Enabled));
                    self.transition(ArmState::Enabling, out);
                    if acknowledge {
                        self.schedule(now + self.config.ack_delay, Event::Enabled);
                    }
                },
                _ => self.publish(out),
            },
            ArmCommand::Disable => {
                self.pending.clear();
                self.active_goal = None;
                self.is_busy = false;
                self.transition(ArmState::Disabled, out);
            },
            ArmCommand::Home => match self.state {
                ArmState::Enabled | ArmState::Homed | ArmState::Homing => {
                    self.pending.retain(|(_, e)| !matches!(e, Event::Homed));
                    self.transition(ArmState::Homing, out);
                    if acknowledge {
                        self.schedule(now + self.config.home_delay, Event::Homed);
                    }
                },
                other => {
                    warn!("Simulated arm ignores home request in state {}", other);
                    self.publish(out);
                },
            },
            ArmCommand::MoveJoint { goal, target } => {
                if target.len() != self.joints.len() {
                    warn!(
                        "Simulated arm ignores joint goal {} with {} joints (expected {})",
                        goal,
                        target.len(),
                        self.joints.len()
                    );
                    return;
                }
                self.start_motion(*goal, Setpoint::Joints(target.clone()), now, out);
            },
            ArmCommand::MovePose { goal, target } => {
                self.start_motion(*goal, Setpoint::Pose(*target), now, out);
            },
            ArmCommand::MoveJaw { goal, angle } => {
                self.start_motion(*goal, Setpoint::Jaw(*angle), now, out);
            },
            ArmCommand::ServoJaw { angle } => {
                if self.state.accepts_motion() {
                    self.jaw = *angle;
                    out.push(StateUpdate::JawSetpoint(self.jaw));
                }
            },
        }
    }

    fn start_motion(
        &mut self,
        goal: GoalId,
        setpoint: Setpoint,
        now: Instant,
        out: &mut Vec<StateUpdate>,
    ) {
        if !self.state.accepts_motion() {
            warn!("Simulated arm ignores goal {} in state {}", goal, self.state);
            self.publish(out);
            return;
        }

        // 新目标取代旧目标
        self.cancel_motion();
        self.active_goal = Some(goal);

        let busy_at = now + self.config.busy_delay;
        self.schedule(busy_at, Event::BusyOn(goal));
        self.schedule(
            busy_at + self.config.motion_duration,
            Event::MotionDone(goal, setpoint),
        );
    }

    /// 触发所有到期事件
    pub(crate) fn advance(&mut self, now: Instant, out: &mut Vec<StateUpdate>) {
        while let Some((at, _)) = self.pending.first() {
            if *at > now {
                break;
            }
            let (_, event) = self.pending.remove(0);
            self.fire(event, out);
        }
    }

    fn fire(&mut self, event: Event, out: &mut Vec<StateUpdate>) {
        match event {
            Event::Enabled => {
                if self.state == ArmState::Enabling {
                    self.transition(ArmState::Enabled, out);
                }
            },
            Event::Homed => {
                if self.state == ArmState::Homing {
                    self.transition(ArmState::Homed, out);
                }
            },
            Event::BusyOn(goal) => {
                // 取代正在执行的目标时也重新发布忙碌
                if self.active_goal == Some(goal) {
                    self.is_busy = true;
                    self.publish(out);
                }
            },
            Event::MotionDone(goal, setpoint) => {
                if self.active_goal != Some(goal) {
                    return;
                }
                match setpoint {
                    Setpoint::Joints(joints) => {
                        self.joints = joints;
                        out.push(StateUpdate::SetpointJoints(self.joints.clone()));
                        out.push(StateUpdate::MeasuredJoints(self.joints.clone()));
                    },
                    Setpoint::Pose(pose) => {
                        self.pose = pose;
                        out.push(StateUpdate::SetpointPose(self.pose));
                        out.push(StateUpdate::MeasuredPose(self.pose));
                    },
                    Setpoint::Jaw(angle) => {
                        self.jaw = angle;
                        out.push(StateUpdate::JawSetpoint(self.jaw));
                    },
                }
                debug!("Simulated arm reached goal {}", goal);
                self.active_goal = None;
                self.is_busy = false;
                self.publish(out);
            },
        }
    }

    /// 注入故障：立即回到 DISABLED
    pub(crate) fn fault(&mut self, reason: &str, out: &mut Vec<StateUpdate>) {
        warn!("Simulated arm fault: {}", reason);
        self.pending.clear();
        self.active_goal = None;
        self.is_busy = false;
        out.push(StateUpdate::Fault {
            reason: reason.to_string(),
        });
        self.transition(ArmState::Disabled, out);
    }
}
