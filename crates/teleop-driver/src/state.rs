//! 共享状态上下文
//!
//! RX 线程是唯一的写入者，其他线程通过 `ArcSwap::load` 无锁读取快照。
//!
//! - `operating`: 生命周期状态、忙碌标志、报告序号、故障计数
//! - `kinematics`: 设定点 / 测量值（关节、位姿、夹爪）
//! - `goal_sequence`: 本机械臂上最后一次分配的目标编号

use crate::heartbeat::ConnectionMonitor;
use arc_swap::ArcSwap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use teleop_protocol::{ArmState, GoalId, JointVector, OperatingReport, PoseFrame};

/// 操作状态快照
///
/// `report_seq` 每收到一条状态报告加一，等待逻辑用它区分
/// “派发之后收到的报告” 与 “派发之前的旧报告”。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperatingStatus {
    pub state: ArmState,
    pub is_busy: bool,
    /// 已收到的状态报告序号（0 表示尚未收到任何报告）
    pub report_seq: u64,
    /// 最近一条 `is_busy == true` 报告的序号
    pub last_busy_seq: u64,
    /// 累计故障次数
    pub fault_count: u64,
    /// 最近一次故障原因
    pub last_fault: Option<String>,
    /// 最近一条报告的接收时间
    pub received_at: Option<Instant>,
}

impl OperatingStatus {
    /// 合并一条状态报告，返回新快照
    pub fn with_report(&self, report: OperatingReport, now: Instant) -> Self {
        let mut next = self.clone();
        next.state = report.state;
        next.is_busy = report.is_busy;
        next.report_seq += 1;
        if report.is_busy {
            next.last_busy_seq = next.report_seq;
        }
        next.received_at = Some(now);
        next
    }

    /// 合并一条故障通知：状态强制回到 DISABLED
    pub fn with_fault(&self, reason: &str, now: Instant) -> Self {
        let mut next = self.clone();
        next.state = ArmState::Disabled;
        next.is_busy = false;
        next.fault_count += 1;
        next.last_fault = Some(reason.to_string());
        next.received_at = Some(now);
        next
    }

    /// 是否已经收到过任何状态报告
    pub fn has_report(&self) -> bool {
        self.report_seq > 0
    }

    /// 距离上一条报告的时间
    pub fn age(&self) -> Option<Duration> {
        self.received_at.map(|t| t.elapsed())
    }
}

/// 运动学状态快照
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KinematicState {
    pub setpoint_joints: Option<JointVector>,
    pub measured_joints: Option<JointVector>,
    pub setpoint_pose: Option<PoseFrame>,
    pub measured_pose: Option<PoseFrame>,
    /// 夹爪设定角度（弧度）
    pub jaw_setpoint: Option<f64>,
    pub update_count: u64,
}

/// 驱动层共享上下文
pub struct ArmContext {
    pub operating: ArcSwap<OperatingStatus>,
    pub kinematics: ArcSwap<KinematicState>,
    pub connection: ConnectionMonitor,
    goal_sequence: AtomicU64,
}

impl ArmContext {
    /// ```
    /// use teleop_driver::ArmContext;
    /// use std::time::Duration;
    ///
    /// let ctx = ArmContext::new(Duration::from_millis(500));
    /// assert_eq!(ctx.operating.load().report_seq, 0);
    /// ```
    pub fn new(connection_timeout: Duration) -> Self {
        Self {
            operating: ArcSwap::from_pointee(OperatingStatus::default()),
            kinematics: ArcSwap::from_pointee(KinematicState::default()),
            connection: ConnectionMonitor::new(connection_timeout),
            goal_sequence: AtomicU64::new(0),
        }
    }

    /// 下一个待分配的目标编号（不占用）
    pub fn peek_next_goal(&self) -> GoalId {
        GoalId(self.goal_sequence.load(Ordering::Acquire) + 1)
    }

    /// 目标已入队，记为最新编号
    ///
    /// 调用者负责串行化 peek / commit；编号只会前进。
    pub fn commit_goal(&self, id: GoalId) {
        self.goal_sequence.fetch_max(id.0, Ordering::AcqRel);
    }

    /// 最近一次分配的目标编号（尚未分配时为 `None`）
    pub fn latest_goal(&self) -> Option<GoalId> {
        match self.goal_sequence.load(Ordering::Acquire) {
            0 => None,
            id => Some(GoalId(id)),
        }
    }

    pub fn operating(&self) -> Arc<OperatingStatus> {
        self.operating.load_full()
    }

    pub fn kinematics(&self) -> Arc<KinematicState> {
        self.kinematics.load_full()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_goal_ids_are_strictly_increasing() {
        let ctx = ArmContext::new(Duration::from_secs(1));
        assert_eq!(ctx.latest_goal(), None);

        let a = ctx.peek_next_goal();
        assert_eq!(a, GoalId(1));
        // 未提交的编号不会被占用
        assert_eq!(ctx.peek_next_goal(), a);
        assert_eq!(ctx.latest_goal(), None);

        ctx.commit_goal(a);
        let b = ctx.peek_next_goal();
        assert!(b > a);
        ctx.commit_goal(b);
        assert_eq!(ctx.latest_goal(), Some(b));
    }

    #[test]
    fn test_commit_goal_never_moves_backwards() {
        let ctx = ArmContext::new(Duration::from_secs(1));
        ctx.commit_goal(GoalId(5));
        ctx.commit_goal(GoalId(3));
        assert_eq!(ctx.latest_goal(), Some(GoalId(5)));
        assert_eq!(ctx.peek_next_goal(), GoalId(6));
    }

    #[test]
    fn test_report_sequence_tracks_busy() {
        let now = Instant::now();
        let status = OperatingStatus::default();
        assert!(!status.has_report());

        let s1 = status.with_report(OperatingReport::new(ArmState::Homed, false), now);
        let s2 = s1.with_report(OperatingReport::new(ArmState::Homed, true), now);
        let s3 = s2.with_report(OperatingReport::new(ArmState::Homed, false), now);

        assert_eq!(s1.report_seq, 1);
        assert_eq!(s1.last_busy_seq, 0);
        assert_eq!(s2.last_busy_seq, 2);
        assert_eq!(s3.report_seq, 3);
        assert_eq!(s3.last_busy_seq, 2);
        assert!(!s3.is_busy);
    }

    #[test]
    fn test_fault_forces_disabled() {
        let now = Instant::now();
        let status = OperatingStatus::default()
            .with_report(OperatingReport::new(ArmState::Homed, true), now)
            .with_fault("joint 3 limit", now);

        assert_eq!(status.state, ArmState::Disabled);
        assert!(!status.is_busy);
        assert_eq!(status.fault_count, 1);
        assert_eq!(status.last_fault.as_deref(), Some("joint 3 limit"));
        // 故障不算作状态报告
        assert_eq!(status.report_seq, 1);
    }
}
