//! Teleop SDK - 遥操作机械臂目标派发与完成判定
//!
//! # 架构设计
//!
//! 本 SDK 采用分层架构，从底层到高层：
//!
//! - **协议层** (`protocol`): 状态、命令、关节向量、位姿等值类型
//! - **通道层** (`channel`): 控制通道抽象与进程内模拟机械臂
//! - **驱动层** (`driver`): IO 线程管理、状态同步、目标编号
//! - **客户端层** (`client`): 生命周期、目标等待、夹爪轨迹
//!
//! # 快速开始
//!
//! ```rust,no_run
//! use teleop_sdk::prelude::*;
//! use std::time::Duration;
//!
//! let (arm, _sim) = ArmBuilder::new(ArmModel::Psm1).build_simulated(SimConfig::default())?;
//! if !arm.enable(Duration::from_secs(10)) || !arm.home(Duration::from_secs(10)) {
//!     return Ok(());
//! }
//! let goal = arm.move_joint(JointVector::zeros(6).with(2, 0.12))?;
//! let _ = goal.wait()?;
//! # Ok::<(), ArmError>(())
//! ```

pub use teleop_channel as channel;
pub use teleop_client as client;
pub use teleop_driver as driver;
pub use teleop_protocol as protocol;

mod logging;
pub mod prelude;

pub use logging::{LoggerError, init_logger};

// --- 用户以此为界 ---

// 协议层
pub use protocol::{ArmModel, ArmState, Axis, GoalId, JointVector, PoseFrame, ProtocolError};

// 通道层
pub use channel::{ChannelError, ControlChannel};
#[cfg(feature = "sim")]
pub use channel::{SimConfig, SimHandle, SimulatedArm};

// 驱动层（高级用户使用）
pub use driver::{Driver, DriverError};

// 客户端层（推荐入口）
pub use client::control::{JawStreamer, JawTrajectory, StreamReport};
pub use client::{
    Arm, ArmBuilder, ArmError, Completion, Deg, GoalHandle, LifecycleConfig, Observer, Phase, Rad,
    WaitOptions,
};
