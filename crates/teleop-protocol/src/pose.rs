//! 笛卡尔空间位姿
//!
//! 数值类型直接使用 `nalgebra`，本模块只提供目标构造需要的最小操作。

use crate::ProtocolError;
use nalgebra::{Rotation3, Vector3};
use std::fmt;
use std::str::FromStr;

/// 笛卡尔坐标轴
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// 在位置向量中的下标
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Axis::X),
            1 => Some(Axis::Y),
            2 => Some(Axis::Z),
            _ => None,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        };
        f.write_str(name)
    }
}

impl FromStr for Axis {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "x" | "X" | "0" => Ok(Axis::X),
            "y" | "Y" | "1" => Ok(Axis::Y),
            "z" | "Z" | "2" => Ok(Axis::Z),
            _ => Err(ProtocolError::UnknownAxis(s.to_string())),
        }
    }
}

/// 末端位姿（位置 + 姿态）
///
/// 纯值类型：构造目标时按值拷贝，从不与机械臂的实时状态共享。
///
/// - `position`: 位置（米）
/// - `orientation`: 姿态（旋转矩阵）
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PoseFrame {
    pub position: Vector3<f64>,
    pub orientation: Rotation3<f64>,
}

impl PoseFrame {
    pub fn new(position: Vector3<f64>, orientation: Rotation3<f64>) -> Self {
        PoseFrame {
            position,
            orientation,
        }
    }

    /// 原点、无旋转
    pub fn identity() -> Self {
        PoseFrame::new(Vector3::zeros(), Rotation3::identity())
    }

    /// 仅平移、无旋转
    pub fn from_translation(x: f64, y: f64, z: f64) -> Self {
        PoseFrame::new(Vector3::new(x, y, z), Rotation3::identity())
    }

    /// 沿某一坐标轴平移 `delta`，姿态不变
    pub fn translated(&self, axis: Axis, delta: f64) -> Self {
        let mut position = self.position;
        position[axis.index()] += delta;
        PoseFrame::new(position, self.orientation)
    }

    /// 位置与姿态均为有限值
    pub fn is_finite(&self) -> bool {
        self.position.iter().all(|v| v.is_finite())
            && self.orientation.matrix().iter().all(|v| v.is_finite())
    }

    /// 两个位姿的位置距离（米）
    pub fn distance_to(&self, other: &PoseFrame) -> f64 {
        (self.position - other.position).norm()
    }

    /// 两个位姿的姿态夹角（弧度）
    pub fn angle_to(&self, other: &PoseFrame) -> f64 {
        self.orientation.angle_to(&other.orientation)
    }
}

impl Default for PoseFrame {
    fn default() -> Self {
        PoseFrame::identity()
    }
}

impl fmt::Display for PoseFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (roll, pitch, yaw) = self.orientation.euler_angles();
        write!(
            f,
            "p=({:.4}, {:.4}, {:.4}) rpy=({:.3}, {:.3}, {:.3})",
            self.position.x, self.position.y, self.position.z, roll, pitch, yaw
        )
    }
}
