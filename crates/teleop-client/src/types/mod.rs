//! 客户端类型系统
//!
//! - `error`: 错误类型（`ArmError`、`Phase`）
//! - `units`: 强类型角度单位（`Rad`、`Deg`）

pub mod error;
pub mod units;

pub use error::{ArmError, Phase, Result};
pub use units::{Deg, Rad};

// 协议层值类型
pub use teleop_protocol::{ArmModel, ArmState, Axis, GoalId, JointVector, PoseFrame};
