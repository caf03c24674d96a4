//! 关节空间目标

use smallvec::SmallVec;
use std::fmt;
use std::ops::{Index, IndexMut};

/// 栈上预留的关节数
///
/// 覆盖 6 关节的 PSM 以及带冗余关节的型号，常见情况下不触发堆分配。
pub const INLINE_JOINTS: usize = 8;

/// 关节位置向量（弧度 / 米，依关节类型而定）
///
/// 长度由机械臂型号决定，构造目标时由调用者独占持有。
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct JointVector(SmallVec<[f64; INLINE_JOINTS]>);

impl JointVector {
    /// 全零向量
    pub fn zeros(len: usize) -> Self {
        JointVector(SmallVec::from_elem(0.0, len))
    }

    /// 从切片拷贝
    pub fn from_slice(values: &[f64]) -> Self {
        JointVector(SmallVec::from_slice(values))
    }

    /// 关节数
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &f64> {
        self.0.iter()
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.0.get(index).copied()
    }

    /// 设置单个关节并返回自身（链式构造）
    ///
    /// 越界索引会被忽略。
    pub fn with(mut self, index: usize, value: f64) -> Self {
        if let Some(slot) = self.0.get_mut(index) {
            *slot = value;
        }
        self
    }

    /// 所有分量均为有限值
    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|v| v.is_finite())
    }

    /// 第一个非有限分量的索引
    pub fn first_non_finite(&self) -> Option<usize> {
        self.0.iter().position(|v| !v.is_finite())
    }

    /// 与另一个向量的最大分量差（长度不同时返回 `None`）
    pub fn max_abs_diff(&self, other: &JointVector) -> Option<f64> {
        if self.len() != other.len() {
            return None;
        }
        Some(
            self.iter()
                .zip(other.iter())
                .map(|(a, b)| (a - b).abs())
                .fold(0.0_f64, f64::max),
        )
    }
}

impl Index<usize> for JointVector {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        &self.0[index]
    }
}

impl IndexMut<usize> for JointVector {
    fn index_mut(&mut self, index: usize) -> &mut f64 {
        &mut self.0[index]
    }
}

impl From<Vec<f64>> for JointVector {
    fn from(values: Vec<f64>) -> Self {
        JointVector(SmallVec::from_vec(values))
    }
}

impl<const N: usize> From<[f64; N]> for JointVector {
    fn from(values: [f64; N]) -> Self {
        JointVector::from_slice(&values)
    }
}

impl FromIterator<f64> for JointVector {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        JointVector(iter.into_iter().collect())
    }
}

impl fmt::Display for JointVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{:.4}", v)?;
        }
        write!(f, "]")
    }
}
