//! Prelude - 常用类型的便捷导入
//!
//! ```rust
//! use teleop_sdk::prelude::*;
//! ```

// 客户端层
pub use crate::client::control::{JawStreamer, JawTrajectory, StreamReport};
pub use crate::client::{
    Arm, ArmBuilder, ArmError, Completion, Deg, GoalHandle, LifecycleConfig, Observer, Phase, Rad,
    WaitOptions,
};

// 协议层
pub use crate::protocol::{ArmModel, ArmState, Axis, JointVector, PoseFrame};

// 通道层
pub use crate::channel::ControlChannel;
#[cfg(feature = "sim")]
pub use crate::channel::{SimConfig, SimHandle, SimulatedArm};

// 错误类型
pub use crate::channel::ChannelError;
pub use crate::driver::DriverError;
pub use crate::protocol::ProtocolError;
