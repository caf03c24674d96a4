//! 客户端配置

use crate::types::{ArmError, Result};
use std::time::Duration;

/// 生命周期等待配置（使能 / 回零 / 下电 / 目标等待共用）
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// 轮询间隔
    pub poll_interval: Duration,
    /// Debounce 阈值：连续 N 次读到目标状态才认为已到达
    pub debounce_threshold: usize,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(10),
            debounce_threshold: 1,
        }
    }
}

impl LifecycleConfig {
    /// 校验配置
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            return Err(ArmError::invalid_parameter(
                "poll_interval",
                "must be greater than zero",
            ));
        }
        if self.debounce_threshold == 0 {
            return Err(ArmError::invalid_parameter(
                "debounce_threshold",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}
