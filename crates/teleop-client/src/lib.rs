//! 客户端接口模块
//!
//! 本模块提供遥操作机械臂的用户友好接口，包括：
//! - 生命周期：使能 / 回零 / 下电，带超时与故障快速失败
//! - 目标派发：关节 / 位姿 / 夹爪目标，返回可等待的 `GoalHandle`
//! - 夹爪余弦轨迹与定时流式发送
//! - 强类型单位（Rad、Deg）
//!
//! # 使用场景
//!
//! 这是大多数用户应该使用的模块。如果需要直接发送原始命令，
//! 可以通过 [`Arm::driver`] 访问 `teleop-driver`。

mod arm;
pub mod builder;
pub mod config;
pub mod control;
pub mod goal;
mod lifecycle;
pub mod observer;
pub mod types;

// 重新导出常用类型
pub use arm::Arm;
pub use builder::ArmBuilder;
pub use config::LifecycleConfig;
pub use goal::{
    BusyTracker, Completion, GoalHandle, GoalProgress, GoalTarget, MotionGoal, WaitOptions,
};
pub use observer::Observer;
pub use types::*;
