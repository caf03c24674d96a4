//! Observer - 状态观察器（只读）
//!
//! 直接持有 `Arc<Driver>`，读取 ArcSwap 快照，无锁、无缓存层。
//! 可以自由克隆并在线程之间传递。

use crate::types::Rad;
use std::sync::Arc;
use std::time::Duration;
use teleop_driver::{Driver, KinematicState, OperatingStatus};
use teleop_protocol::{ArmState, GoalId, JointVector, PoseFrame};

/// 状态观察器
#[derive(Clone)]
pub struct Observer {
    driver: Arc<Driver>,
}

impl Observer {
    pub fn new(driver: Arc<Driver>) -> Self {
        Self { driver }
    }

    /// 最新操作状态
    pub fn state(&self) -> ArmState {
        self.driver.operating().state
    }

    /// 最新报告是否为忙碌
    pub fn is_busy(&self) -> bool {
        self.driver.operating().is_busy
    }

    /// 完整操作状态快照
    pub fn operating(&self) -> Arc<OperatingStatus> {
        self.driver.operating()
    }

    /// 完整运动学快照
    pub fn kinematics(&self) -> Arc<KinematicState> {
        self.driver.kinematics()
    }

    pub fn setpoint_joints(&self) -> Option<JointVector> {
        self.driver.kinematics().setpoint_joints.clone()
    }

    pub fn measured_joints(&self) -> Option<JointVector> {
        self.driver.kinematics().measured_joints.clone()
    }

    pub fn setpoint_pose(&self) -> Option<PoseFrame> {
        self.driver.kinematics().setpoint_pose
    }

    pub fn measured_pose(&self) -> Option<PoseFrame> {
        self.driver.kinematics().measured_pose
    }

    /// 夹爪设定角度
    pub fn jaw_setpoint(&self) -> Option<Rad> {
        self.driver.kinematics().jaw_setpoint.map(Rad)
    }

    /// 收到过的故障次数
    pub fn fault_count(&self) -> u64 {
        self.driver.operating().fault_count
    }

    pub fn last_fault(&self) -> Option<String> {
        self.driver.operating().last_fault.clone()
    }

    /// 最近派发的目标
    pub fn latest_goal(&self) -> Option<GoalId> {
        self.driver.latest_goal()
    }

    /// 状态流是否仍在更新
    pub fn is_connected(&self) -> bool {
        self.driver.is_connected()
    }

    /// 距离上一条状态更新的时间
    pub fn connection_age(&self) -> Duration {
        self.driver.connection_age()
    }
}

impl std::fmt::Debug for Observer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observer")
            .field("namespace", &self.driver.namespace())
            .field("state", &self.state())
            .finish()
    }
}
