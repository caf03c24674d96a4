//! Jaw Trajectory - 夹爪余弦开合轨迹
//!
//! 以 `start` 为最大开度，按余弦曲线在 `[start - 2·amplitude, start]`
//! 之间往复开合：
//!
//! ```text
//! n    = duration / interval          （每个周期的采样数，实数）
//! θ(i) = start + amplitude · (cos(i · 2π / n) - 1)
//! ```
//!
//! 采样 `i = 0 .. ceil(n) · cycles`，第 `i` 个采样的时间偏移为 `i · interval`。
//!
//! # 特性
//!
//! - **Iterator 模式**: 按需生成采样点，无限轨迹也不占内存
//! - **参数校验**: 构造时拒绝非正的时长与间隔
//!
//! # 示例
//!
//! ```rust
//! use teleop_client::control::JawTrajectory;
//! use teleop_client::{Deg, Rad};
//! use std::time::Duration;
//!
//! let trajectory = JawTrajectory::generate(
//!     Deg(50.0).to_rad(),
//!     Deg(30.0).to_rad(),
//!     Duration::from_secs(5),
//!     Duration::from_millis(10),
//! )?;
//! assert_eq!(trajectory.total_samples(), Some(2000));
//! # Ok::<(), teleop_client::ArmError>(())
//! ```

use crate::types::{ArmError, Rad, Result};
use std::f64::consts::TAU;
use std::time::Duration;

/// 默认周期数
pub const DEFAULT_CYCLES: usize = 4;

/// 单个采样点
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JawSample {
    pub index: usize,
    pub angle: Rad,
    /// 相对轨迹起点的时间偏移
    pub offset: Duration,
}

/// 夹爪余弦轨迹
#[derive(Debug, Clone, PartialEq)]
pub struct JawTrajectory {
    start: Rad,
    amplitude: Rad,
    duration: Duration,
    interval: Duration,
    /// `ceil(duration / interval)`
    cycle_len: usize,
    /// `None` 表示无限重复
    cycles: Option<usize>,
}

impl JawTrajectory {
    /// 生成轨迹（默认 4 个周期）
    ///
    /// # 错误
    /// - `ArmError::InvalidParameter`: `interval` 或 `duration` 为零，
    ///   角度为非有限值，或总采样数超出 `usize`
    pub fn generate(
        start: Rad,
        amplitude: Rad,
        duration: Duration,
        interval: Duration,
    ) -> Result<Self> {
        if interval.is_zero() {
            return Err(ArmError::invalid_parameter("interval", "must be positive"));
        }
        if duration.is_zero() {
            return Err(ArmError::invalid_parameter("duration", "must be positive"));
        }
        if !start.is_finite() {
            return Err(ArmError::invalid_parameter("start", "must be finite"));
        }
        if !amplitude.is_finite() {
            return Err(ArmError::invalid_parameter("amplitude", "must be finite"));
        }

        let cycle_len = usize::try_from(duration.as_nanos().div_ceil(interval.as_nanos()))
            .map_err(|_| {
                ArmError::invalid_parameter("duration", "too many samples per cycle for this interval")
            })?;
        checked_total(cycle_len, DEFAULT_CYCLES)?;

        Ok(Self {
            start,
            amplitude,
            duration,
            interval,
            cycle_len,
            cycles: Some(DEFAULT_CYCLES),
        })
    }

    /// 以秒为单位生成轨迹
    ///
    /// 负数、零与非有限值都会被拒绝。
    pub fn generate_secs(start: Rad, amplitude: Rad, duration: f64, interval: f64) -> Result<Self> {
        let interval = positive_secs("interval", interval)?;
        let duration = positive_secs("duration", duration)?;
        Self::generate(start, amplitude, duration, interval)
    }

    /// 设置周期数
    pub fn with_cycles(mut self, cycles: usize) -> Result<Self> {
        if cycles == 0 {
            return Err(ArmError::invalid_parameter("cycles", "must be at least 1"));
        }
        checked_total(self.cycle_len, cycles)?;
        self.cycles = Some(cycles);
        Ok(self)
    }

    /// 无限重复（由调用方中止）
    pub fn repeat_forever(mut self) -> Self {
        self.cycles = None;
        self
    }

    pub fn start(&self) -> Rad {
        self.start
    }

    pub fn amplitude(&self) -> Rad {
        self.amplitude
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn cycles(&self) -> Option<usize> {
        self.cycles
    }

    /// 每个周期的采样数（实数，`duration / interval`）
    pub fn samples_per_cycle(&self) -> f64 {
        self.duration.as_nanos() as f64 / self.interval.as_nanos() as f64
    }

    /// 每个周期实际发出的采样数（`ceil(duration / interval)`）
    pub fn cycle_len(&self) -> usize {
        self.cycle_len
    }

    /// 总采样数；无限轨迹返回 `None`
    ///
    /// 构造时已确认乘积不溢出。
    pub fn total_samples(&self) -> Option<usize> {
        self.cycles.map(|cycles| self.cycle_len * cycles)
    }

    /// 第 `index` 个采样
    pub fn sample(&self, index: usize) -> JawSample {
        let phase = index as f64 * TAU / self.samples_per_cycle();
        let angle = self.start + self.amplitude * (phase.cos() - 1.0);
        let offset = self.interval.saturating_mul(index.min(u32::MAX as usize) as u32);
        JawSample {
            index,
            angle,
            offset,
        }
    }

    /// 所有采样（每次调用返回新的迭代器）
    pub fn samples(&self) -> JawSamples<'_> {
        JawSamples {
            trajectory: self,
            next_index: 0,
            end: self.total_samples(),
        }
    }
}

fn checked_total(cycle_len: usize, cycles: usize) -> Result<usize> {
    cycle_len
        .checked_mul(cycles)
        .ok_or_else(|| ArmError::invalid_parameter("cycles", "total sample count overflows"))
}

fn positive_secs(param: &str, secs: f64) -> Result<Duration> {
    if !secs.is_finite() || secs <= 0.0 {
        return Err(ArmError::invalid_parameter(
            param,
            format!("must be a positive number of seconds, got {}", secs),
        ));
    }
    Duration::try_from_secs_f64(secs).map_err(|e| ArmError::invalid_parameter(param, e.to_string()))
}

/// 轨迹采样迭代器
#[derive(Debug, Clone)]
pub struct JawSamples<'a> {
    trajectory: &'a JawTrajectory,
    next_index: usize,
    end: Option<usize>,
}

impl Iterator for JawSamples<'_> {
    type Item = JawSample;

    fn next(&mut self) -> Option<JawSample> {
        if self.end.is_some_and(|end| self.next_index >= end) {
            return None;
        }
        let sample = self.trajectory.sample(self.next_index);
        self.next_index += 1;
        Some(sample)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.end {
            Some(end) => {
                let remaining = end.saturating_sub(self.next_index);
                (remaining, Some(remaining))
            },
            None => (usize::MAX, None),
        }
    }
}
