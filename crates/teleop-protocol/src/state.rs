//! 机械臂状态与型号
//!
//! `ArmState` 是机械臂上报的生命周期状态。状态只由设备写入，
//! 上层只能请求转换并观察结果。

use crate::ProtocolError;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::fmt;
use std::str::FromStr;

/// 机械臂生命周期状态
///
/// 成功路径单调前进：
///
/// ```text
/// DISABLED → ENABLING → ENABLED → HOMING → HOMED
/// ```
///
/// 任何故障通知都会让状态回到 `Disabled`，调用者必须重新使能。
/// 只有 `Homed` 状态接受运动目标。
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    TryFromPrimitive,
    IntoPrimitive,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum ArmState {
    /// 未使能（上电默认 / 故障后）
    Disabled = 0x00,
    /// 使能请求已接受，等待电机上电
    Enabling = 0x01,
    /// 已使能，尚未回零
    Enabled = 0x02,
    /// 回零进行中
    Homing = 0x03,
    /// 已回零，可以接受运动目标
    Homed = 0x04,
}

// num_enum 会把 `#[default]` 变体当作未知状态码的兜底值，所以这里手写 Default
#[allow(clippy::derivable_impls)]
impl Default for ArmState {
    fn default() -> Self {
        ArmState::Disabled
    }
}

impl ArmState {
    /// 从状态码解析
    pub fn from_code(code: u8) -> Result<Self, ProtocolError> {
        Self::try_from(code).map_err(|_| ProtocolError::UnknownStateCode { code })
    }

    /// 状态码
    pub fn code(self) -> u8 {
        self.into()
    }

    /// 电机是否已上电（`Enabled` 及之后的状态）
    pub fn is_enabled(self) -> bool {
        self >= ArmState::Enabled
    }

    /// 是否已回零
    pub fn is_homed(self) -> bool {
        self == ArmState::Homed
    }

    /// 是否接受运动目标
    pub fn accepts_motion(self) -> bool {
        self.is_homed()
    }

    /// 大写名称（与设备上报的字符串一致）
    pub fn as_str(self) -> &'static str {
        match self {
            ArmState::Disabled => "DISABLED",
            ArmState::Enabling => "ENABLING",
            ArmState::Enabled => "ENABLED",
            ArmState::Homing => "HOMING",
            ArmState::Homed => "HOMED",
        }
    }
}

impl fmt::Display for ArmState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArmState {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DISABLED" => Ok(ArmState::Disabled),
            "ENABLING" => Ok(ArmState::Enabling),
            "ENABLED" => Ok(ArmState::Enabled),
            "HOMING" => Ok(ArmState::Homing),
            "HOMED" => Ok(ArmState::Homed),
            _ => Err(ProtocolError::UnknownState(s.to_string())),
        }
    }
}

/// PSM 类机械臂的关节数
pub const PSM_JOINT_COUNT: usize = 6;

/// 机械臂型号（固定集合）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ArmModel {
    Psm1,
    Psm2,
    Psm3,
}

impl ArmModel {
    /// 所有支持的型号
    pub const ALL: [ArmModel; 3] = [ArmModel::Psm1, ArmModel::Psm2, ArmModel::Psm3];

    /// 型号名称（同时作为话题命名空间）
    pub fn name(self) -> &'static str {
        match self {
            ArmModel::Psm1 => "PSM1",
            ArmModel::Psm2 => "PSM2",
            ArmModel::Psm3 => "PSM3",
        }
    }

    /// 关节数（目标向量长度必须与之一致）
    pub fn joint_count(self) -> usize {
        match self {
            ArmModel::Psm1 | ArmModel::Psm2 | ArmModel::Psm3 => PSM_JOINT_COUNT,
        }
    }
}

impl fmt::Display for ArmModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ArmModel {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ArmModel::ALL
            .into_iter()
            .find(|model| model.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ProtocolError::UnknownModel(s.to_string()))
    }
}
