//! 命令与状态消息
//!
//! 命令通道上传输 `ArmCommand`，状态流上传输 `StateUpdate`。
//! 每个命令都知道自己的话题后缀，命名空间（如 `PSM1/`）由通道实现负责拼接。

use crate::joint::JointVector;
use crate::pose::PoseFrame;
use crate::state::ArmState;
use std::fmt;

/// 话题后缀常量
pub mod topics {
    /// 生命周期命令（enable / disable / home）
    pub const STATE_COMMAND: &str = "state_command";
    /// 关节空间目标
    pub const MOVE_JP: &str = "move_jp";
    /// 笛卡尔空间目标
    pub const MOVE_CP: &str = "move_cp";
    /// 夹爪目标
    pub const JAW_MOVE_JP: &str = "jaw/move_jp";
    /// 夹爪伺服设定点（流式，无应答）
    pub const JAW_SERVO_JP: &str = "jaw/servo_jp";
}

/// 目标编号
///
/// 每台机械臂内严格递增，编号越大的目标越新。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GoalId(pub u64);

impl fmt::Display for GoalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 发往机械臂的命令
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ArmCommand {
    /// 请求使能
    Enable,
    /// 请求失能
    Disable,
    /// 请求回零
    Home,
    /// 关节空间目标
    MoveJoint { goal: GoalId, target: JointVector },
    /// 笛卡尔空间目标
    MovePose { goal: GoalId, target: PoseFrame },
    /// 夹爪目标角度（弧度）
    MoveJaw { goal: GoalId, angle: f64 },
    /// 夹爪伺服设定点（弧度）
    ServoJaw { angle: f64 },
}

impl ArmCommand {
    /// 话题后缀
    pub fn topic(&self) -> &'static str {
        match self {
            ArmCommand::Enable | ArmCommand::Disable | ArmCommand::Home => topics::STATE_COMMAND,
            ArmCommand::MoveJoint { .. } => topics::MOVE_JP,
            ArmCommand::MovePose { .. } => topics::MOVE_CP,
            ArmCommand::MoveJaw { .. } => topics::JAW_MOVE_JP,
            ArmCommand::ServoJaw { .. } => topics::JAW_SERVO_JP,
        }
    }

    /// 命令携带的目标编号（只有运动目标才有）
    pub fn goal(&self) -> Option<GoalId> {
        match self {
            ArmCommand::MoveJoint { goal, .. }
            | ArmCommand::MovePose { goal, .. }
            | ArmCommand::MoveJaw { goal, .. } => Some(*goal),
            _ => None,
        }
    }

    /// 是否为需要等待完成的运动目标
    pub fn is_goal(&self) -> bool {
        self.goal().is_some()
    }

    /// 生命周期命令的载荷字符串
    pub fn state_payload(&self) -> Option<&'static str> {
        match self {
            ArmCommand::Enable => Some("enable"),
            ArmCommand::Disable => Some("disable"),
            ArmCommand::Home => Some("home"),
            _ => None,
        }
    }
}

/// 一次状态报告：生命周期状态 + 忙碌标志
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OperatingReport {
    pub state: ArmState,
    /// 是否正在执行运动
    pub is_busy: bool,
}

impl OperatingReport {
    pub fn new(state: ArmState, is_busy: bool) -> Self {
        OperatingReport { state, is_busy }
    }
}

/// 状态流上的消息
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StateUpdate {
    /// 状态报告（周期性或在变化时发送）
    Operating(OperatingReport),
    /// 意外故障通知
    Fault { reason: String },
    /// 关节设定点
    SetpointJoints(JointVector),
    /// 关节测量值
    MeasuredJoints(JointVector),
    /// 末端设定位姿
    SetpointPose(PoseFrame),
    /// 末端测量位姿
    MeasuredPose(PoseFrame),
    /// 夹爪设定角度（弧度）
    JawSetpoint(f64),
}
