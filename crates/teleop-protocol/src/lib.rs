//! # Teleop Protocol
//!
//! 机械臂命令/状态消息定义（无 IO、无线程）
//!
//! ## 模块
//!
//! - `state`: 机械臂生命周期状态（`ArmState`）与型号（`ArmModel`）
//! - `joint`: 关节空间目标（`JointVector`）
//! - `pose`: 笛卡尔空间位姿（`PoseFrame`）与坐标轴（`Axis`）
//! - `message`: 命令通道与状态流上的消息（`ArmCommand`、`StateUpdate`）
//!
//! 本 crate 不规定中间件的线路编码，只定义上层协议使用的值类型。

pub mod joint;
pub mod message;
pub mod pose;
pub mod state;

// 重新导出常用类型
pub use joint::JointVector;
pub use message::{ArmCommand, GoalId, OperatingReport, StateUpdate, topics};
pub use pose::{Axis, PoseFrame};
pub use state::{ArmModel, ArmState};

use thiserror::Error;

/// 协议解析错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Unknown arm state code: 0x{code:02X}")]
    UnknownStateCode { code: u8 },

    #[error("Unknown arm state: {0}")]
    UnknownState(String),

    #[error("Unknown arm model: {0}")]
    UnknownModel(String),

    #[error("Unknown axis: {0}")]
    UnknownAxis(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_error_display() {
        let err = ProtocolError::UnknownStateCode { code: 0x1F };
        assert_eq!(err.to_string(), "Unknown arm state code: 0x1F");

        let err = ProtocolError::UnknownModel("ECM".to_string());
        assert!(err.to_string().contains("ECM"));
    }
}
