//! 目标派发与等待
//!
//! 每个运动目标在派发时分配一个单调递增的 `GoalId`，返回的 `GoalHandle`
//! 可以等待目标完成。同一台机械臂上较新的目标会取代较旧的目标：
//! 旧句柄的等待立即返回 `Completion::Superseded`，而不是等待新目标的忙碌状态。
//!
//! # 完成判定
//!
//! - 默认：派发之后收到的第一条空闲报告即视为到达
//! - `track_busy`：两阶段。先等待派发之后的一条忙碌报告，再等待随后的空闲报告，
//!   避免把派发前的过期空闲读数当成完成
//!
//! ```rust,no_run
//! use teleop_client::{ArmBuilder, Completion, WaitOptions};
//! use teleop_channel::SimConfig;
//! use teleop_protocol::{ArmModel, JointVector};
//! use std::time::Duration;
//!
//! let (arm, _sim) = ArmBuilder::new(ArmModel::Psm1).build_simulated(SimConfig::default())?;
//! arm.try_enable(Duration::from_secs(10))?;
//! arm.try_home(Duration::from_secs(10))?;
//!
//! let goal = arm.move_joint(JointVector::zeros(6).with(2, 0.12))?;
//! let completion = goal.wait_with(WaitOptions::new().track_busy())?;
//! assert_eq!(completion, Completion::Reached);
//! # Ok::<(), teleop_client::ArmError>(())
//! ```

use crate::arm::Arm;
use crate::types::{ArmError, Phase, Rad, Result};
use std::sync::Arc;
use std::time::{Duration, Instant};
use teleop_driver::{Driver, DriverError, OperatingStatus};
use teleop_protocol::{ArmCommand, GoalId, JointVector, PoseFrame};
use tracing::{debug, trace};

/// 运动目标内容
#[derive(Debug, Clone, PartialEq)]
pub enum GoalTarget {
    Joints(JointVector),
    Pose(PoseFrame),
    Jaw(Rad),
}

impl GoalTarget {
    fn into_command(self, goal: GoalId) -> ArmCommand {
        match self {
            GoalTarget::Joints(target) => ArmCommand::MoveJoint { goal, target },
            GoalTarget::Pose(target) => ArmCommand::MovePose { goal, target },
            GoalTarget::Jaw(angle) => ArmCommand::MoveJaw {
                goal,
                angle: angle.0,
            },
        }
    }
}

/// 已派发的目标
#[derive(Debug, Clone, PartialEq)]
pub struct MotionGoal {
    pub id: GoalId,
    pub target: GoalTarget,
    pub issued_at: Instant,
}

/// 等待结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// 目标已到达
    Reached,
    /// 被同一台机械臂上更新的目标取代
    Superseded,
    /// 截止时间已过
    TimedOut,
}

/// 等待选项
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WaitOptions {
    /// `None` 表示无限等待
    pub timeout: Option<Duration>,
    pub track_busy: bool,
}

impl WaitOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// 两阶段忙碌跟踪
    pub fn track_busy(mut self) -> Self {
        self.track_busy = true;
        self
    }
}

/// 单次观测的结论
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GoalProgress {
    Pending,
    Done(Completion),
    Faulted(String),
}

/// 完成判定状态机
///
/// 只依赖状态快照，与轮询方式（阻塞 / 异步）无关。
#[derive(Debug, Clone)]
pub struct BusyTracker {
    goal: GoalId,
    track_busy: bool,
    /// 派发时的报告序号
    dispatch_seq: u64,
    /// 派发时的故障计数
    dispatch_faults: u64,
    seen_busy: bool,
}

impl BusyTracker {
    pub fn new(goal: GoalId, dispatched: &OperatingStatus, track_busy: bool) -> Self {
        Self {
            goal,
            track_busy,
            dispatch_seq: dispatched.report_seq,
            dispatch_faults: dispatched.fault_count,
            seen_busy: false,
        }
    }

    /// 是否已经观测到派发之后的忙碌报告
    pub fn seen_busy(&self) -> bool {
        self.seen_busy
    }

    /// 根据最新快照推进
    pub fn observe(&mut self, latest: Option<GoalId>, status: &OperatingStatus) -> GoalProgress {
        if latest.is_some_and(|id| id > self.goal) {
            return GoalProgress::Done(Completion::Superseded);
        }

        if status.fault_count > self.dispatch_faults {
            let reason = status
                .last_fault
                .clone()
                .unwrap_or_else(|| "unknown fault".to_string());
            return GoalProgress::Faulted(reason);
        }

        if self.track_busy {
            if !self.seen_busy {
                if status.last_busy_seq > self.dispatch_seq {
                    trace!("Goal {} observed busy at report {}", self.goal, status.last_busy_seq);
                    self.seen_busy = true;
                } else {
                    return GoalProgress::Pending;
                }
            }
            // 最新报告空闲，且必然晚于已观测到的忙碌报告
            if !status.is_busy {
                return GoalProgress::Done(Completion::Reached);
            }
        } else if status.report_seq > self.dispatch_seq && !status.is_busy {
            return GoalProgress::Done(Completion::Reached);
        }

        GoalProgress::Pending
    }
}

/// 目标句柄
///
/// 等待会消费句柄；需要再次观察时使用 `Arm::observer()`。
pub struct GoalHandle {
    goal: MotionGoal,
    driver: Arc<Driver>,
    dispatched: Arc<OperatingStatus>,
    poll_interval: Duration,
}

impl GoalHandle {
    pub fn id(&self) -> GoalId {
        self.goal.id
    }

    pub fn goal(&self) -> &MotionGoal {
        &self.goal
    }

    /// 是否已被更新的目标取代（不阻塞）
    pub fn is_superseded(&self) -> bool {
        self.driver.latest_goal().is_some_and(|id| id > self.goal.id)
    }

    /// 无限等待，不跟踪忙碌
    pub fn wait(self) -> Result<Completion> {
        self.wait_with(WaitOptions::default())
    }

    /// 阻塞等待目标完成
    ///
    /// # 错误
    /// - `ArmError::Fault`: 派发之后收到故障
    /// - `ArmError::Driver`: IO 线程已退出
    pub fn wait_with(self, options: WaitOptions) -> Result<Completion> {
        let start = Instant::now();
        let mut tracker = BusyTracker::new(self.goal.id, &self.dispatched, options.track_busy);

        loop {
            if let Some(completion) = self.poll(&mut tracker)? {
                return Ok(completion);
            }
            match self.next_sleep(start, options.timeout) {
                Some(sleep) => std::thread::sleep(sleep),
                None => return Ok(self.timed_out(start)),
            }
        }
    }

    /// 异步等待目标完成（tokio）
    #[cfg(feature = "async")]
    pub async fn wait_async(self, options: WaitOptions) -> Result<Completion> {
        let start = Instant::now();
        let mut tracker = BusyTracker::new(self.goal.id, &self.dispatched, options.track_busy);

        loop {
            if let Some(completion) = self.poll(&mut tracker)? {
                return Ok(completion);
            }
            match self.next_sleep(start, options.timeout) {
                Some(sleep) => tokio::time::sleep(sleep).await,
                None => return Ok(self.timed_out(start)),
            }
        }
    }

    fn poll(&self, tracker: &mut BusyTracker) -> Result<Option<Completion>> {
        let status = self.driver.operating();
        match tracker.observe(self.driver.latest_goal(), &status) {
            GoalProgress::Pending => {},
            GoalProgress::Done(completion) => {
                debug!(
                    "Goal {} {:?} after {:?}",
                    self.goal.id,
                    completion,
                    self.goal.issued_at.elapsed()
                );
                return Ok(Some(completion));
            },
            GoalProgress::Faulted(reason) => return Err(ArmError::fault(Phase::Goal, reason)),
        }

        if !self.driver.is_healthy() {
            return Err(DriverError::ChannelClosed.into());
        }
        Ok(None)
    }

    /// 下一次轮询前的休眠；截止时间已过时返回 `None`
    fn next_sleep(&self, start: Instant, timeout: Option<Duration>) -> Option<Duration> {
        match timeout {
            None => Some(self.poll_interval),
            Some(timeout) => {
                let remaining = timeout.checked_sub(start.elapsed())?;
                let sleep = self.poll_interval.min(remaining);
                (!sleep.is_zero()).then_some(sleep)
            },
        }
    }

    fn timed_out(&self, start: Instant) -> Completion {
        debug!("Goal {} timed out after {:?}", self.goal.id, start.elapsed());
        Completion::TimedOut
    }
}

impl std::fmt::Debug for GoalHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoalHandle").field("goal", &self.goal).finish()
    }
}

impl Arm {
    /// 派发关节空间目标
    ///
    /// # 错误
    /// - `ArmError::InvalidTarget`: 关节数不匹配或包含非有限值
    /// - `ArmError::NotHomed`: 机械臂未处于 HOMED
    pub fn move_joint(&self, target: JointVector) -> Result<GoalHandle> {
        let expected = self.model.joint_count();
        if target.len() != expected {
            return Err(ArmError::invalid_target(format!(
                "expected {} joint values, got {}",
                expected,
                target.len()
            )));
        }
        if let Some(index) = target.first_non_finite() {
            return Err(ArmError::invalid_target(format!(
                "joint {} is not finite",
                index
            )));
        }
        self.dispatch(GoalTarget::Joints(target))
    }

    /// 派发笛卡尔位姿目标
    ///
    /// # 错误
    /// - `ArmError::InvalidTarget`: 位姿包含非有限值
    /// - `ArmError::NotHomed`: 机械臂未处于 HOMED
    pub fn move_pose(&self, target: PoseFrame) -> Result<GoalHandle> {
        if !target.is_finite() {
            return Err(ArmError::invalid_target("pose is not finite"));
        }
        self.dispatch(GoalTarget::Pose(target))
    }

    /// 派发夹爪角度目标
    pub fn move_jaw(&self, angle: Rad) -> Result<GoalHandle> {
        if !angle.is_finite() {
            return Err(ArmError::invalid_target("jaw angle is not finite"));
        }
        self.dispatch(GoalTarget::Jaw(angle))
    }

    /// 张开夹爪到给定角度
    pub fn open_jaw(&self, angle: Rad) -> Result<GoalHandle> {
        self.move_jaw(angle)
    }

    /// 闭合夹爪
    pub fn close_jaw(&self) -> Result<GoalHandle> {
        self.move_jaw(Rad::ZERO)
    }

    fn dispatch(&self, target: GoalTarget) -> Result<GoalHandle> {
        let dispatched = self.observer.operating();
        if !dispatched.state.accepts_motion() {
            return Err(ArmError::NotHomed {
                state: dispatched.state,
            });
        }

        let id = self.driver.dispatch_goal(|id| {
            let command = target.clone().into_command(id);
            debug!("Dispatch goal {} on {}", id, command.topic());
            command
        })?;

        Ok(GoalHandle {
            goal: MotionGoal {
                id,
                target,
                issued_at: Instant::now(),
            },
            driver: self.driver.clone(),
            dispatched,
            poll_interval: self.config.poll_interval,
        })
    }
}


#[cfg(all(test, feature = "sim"))]
mod sim_tests {
    use super::*;
    use crate::builder::ArmBuilder;
    use teleop_channel::{SimConfig, SimHandle};
    use teleop_protocol::{ArmModel, ArmState, Axis, topics};

    fn homed_arm(config: SimConfig) -> (Arm, SimHandle) {
        let (arm, sim) = ArmBuilder::new(ArmModel::Psm1)
            .poll_interval(Duration::from_millis(2))
            .build_simulated(config)
            .unwrap();
        arm.try_enable(Duration::from_secs(2)).unwrap();
        arm.try_home(Duration::from_secs(2)).unwrap();
        sim.clear_log();
        (arm, sim)
    }

    fn fast_sim() -> SimConfig {
        SimConfig {
            ack_delay: Duration::from_millis(10),
            home_delay: Duration::from_millis(10),
            motion_duration: Duration::from_millis(60),
            ..Default::default()
        }
    }

    #[test]
    fn test_goal_rejected_when_not_homed() {
        let (arm, sim) = ArmBuilder::new(ArmModel::Psm1)
            .build_simulated(fast_sim())
            .unwrap();

        let err = arm.move_joint(JointVector::zeros(6)).unwrap_err();
        assert!(matches!(err, ArmError::NotHomed { state: ArmState::Disabled }));
        assert!(arm.close_jaw().is_err());
        assert_eq!(sim.command_count(), 0);
        assert!(arm.observer().latest_goal().is_none());
    }

    #[test]
    fn test_invalid_target_sends_nothing() {
        let (arm, sim) = homed_arm(fast_sim());

        let err = arm.move_joint(JointVector::zeros(3)).unwrap_err();
        assert!(matches!(err, ArmError::InvalidTarget { .. }));

        let err = arm
            .move_joint(JointVector::zeros(6).with(1, f64::NAN))
            .unwrap_err();
        assert!(err.to_string().contains("joint 1"));

        let bad_pose = PoseFrame::from_translation(f64::INFINITY, 0.0, 0.0);
        assert!(arm.move_pose(bad_pose).is_err());
        assert!(arm.move_jaw(Rad(f64::NAN)).is_err());

        assert_eq!(sim.command_count(), 0);
    }

    #[test]
    fn test_goal_ids_are_monotonic() {
        let (arm, _sim) = homed_arm(fast_sim());
        let a = arm.move_jaw(Rad(0.2)).unwrap();
        let b = arm.move_jaw(Rad(0.3)).unwrap();
        assert!(b.id() > a.id());
        assert!(a.is_superseded());
        assert!(!b.is_superseded());
    }

    #[test]
    fn test_burst_of_goals_is_never_rejected() {
        let (arm, sim) = homed_arm(fast_sim());

        let handles: Vec<GoalHandle> = (0..64)
            .map(|i| {
                arm.move_joint(JointVector::zeros(6).with(1, i as f64 * 0.001))
                    .unwrap()
            })
            .collect();

        assert!(handles.windows(2).all(|w| w[1].id() > w[0].id()));
        let (last, older) = handles.split_last().unwrap();
        assert!(older.iter().all(|h| h.is_superseded()));
        assert!(!last.is_superseded());
        assert_eq!(arm.observer().latest_goal(), Some(last.id()));

        let last = handles.into_iter().next_back().unwrap();
        assert_eq!(
            last.wait_with(WaitOptions::new().timeout(Duration::from_secs(3)).track_busy())
                .unwrap(),
            Completion::Reached
        );
        assert_eq!(sim.commands_on(topics::MOVE_JP), 64);
        assert_eq!(arm.metrics().tx_reliable_drops, 0);
    }

    #[test]
    fn test_tracked_goal_reaches_target() {
        let (arm, sim) = homed_arm(fast_sim());
        let target = JointVector::zeros(6).with(2, 0.12);

        let goal = arm.move_joint(target.clone()).unwrap();
        let completion = goal
            .wait_with(WaitOptions::new().timeout(Duration::from_secs(2)).track_busy())
            .unwrap();

        assert_eq!(completion, Completion::Reached);
        assert_eq!(arm.observer().setpoint_joints(), Some(target));
        assert_eq!(sim.commands_on(topics::MOVE_JP), 1);
    }

    #[test]
    fn test_older_goal_is_superseded() {
        let (arm, _sim) = homed_arm(fast_sim());
        let start = arm.observer().setpoint_pose().unwrap();

        let first = arm.move_pose(start.translated(Axis::X, -0.05)).unwrap();
        let second = arm.move_pose(start).unwrap();

        assert_eq!(first.wait().unwrap(), Completion::Superseded);
        assert_eq!(
            second
                .wait_with(WaitOptions::new().timeout(Duration::from_secs(2)).track_busy())
                .unwrap(),
            Completion::Reached
        );
    }

    #[test]
    fn test_wait_times_out() {
        let config = SimConfig {
            motion_duration: Duration::from_secs(5),
            ..fast_sim()
        };
        let (arm, _sim) = homed_arm(config);

        let timeout = Duration::from_millis(100);
        let start = Instant::now();
        let completion = arm
            .open_jaw(Rad(0.8))
            .unwrap()
            .wait_with(WaitOptions::new().timeout(timeout).track_busy())
            .unwrap();

        assert_eq!(completion, Completion::TimedOut);
        assert!(start.elapsed() >= timeout);
    }

    #[test]
    fn test_fault_fails_goal_wait() {
        let config = SimConfig {
            motion_duration: Duration::from_secs(5),
            ..fast_sim()
        };
        let (arm, sim) = homed_arm(config);
        let goal = arm.move_jaw(Rad(0.4)).unwrap();

        let injector = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(40));
            sim.inject_fault("collision");
        });

        let err = goal
            .wait_with(WaitOptions::new().timeout(Duration::from_secs(3)).track_busy())
            .unwrap_err();
        injector.join().unwrap();

        assert!(matches!(err, ArmError::Fault { phase: Phase::Goal, ref reason } if reason == "collision"));
    }
}
