//! 错误类型体系
//!
//! 区分三类错误：
//!
//! - **致命错误**：机械臂故障或 IO 线程退出，必须重新使能 / 重新连接
//! - **可重试错误**：超时、队列满
//! - **前置条件错误**：调用时立即返回，不会发出任何命令
//!
//! ```rust
//! use teleop_client::{ArmError, Phase};
//! use std::time::Duration;
//!
//! let err = ArmError::timeout(Phase::Enable, Duration::from_secs(10));
//! assert!(err.is_retryable());
//! assert_eq!(err.to_string(), "failed to enable within 10 seconds");
//! ```

use std::fmt;
use std::time::Duration;
use teleop_driver::DriverError;
use teleop_protocol::ArmState;
use thiserror::Error;

/// 出错时所处的阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Enable,
    Home,
    Disable,
    Goal,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Enable => "enable",
            Phase::Home => "home",
            Phase::Disable => "disable",
            Phase::Goal => "reach goal",
        };
        f.write_str(name)
    }
}

/// 以秒（整秒时）或毫秒显示超时
fn format_timeout(timeout_ms: &u64) -> String {
    if *timeout_ms % 1000 == 0 {
        let secs = timeout_ms / 1000;
        if secs == 1 {
            "1 second".to_string()
        } else {
            format!("{} seconds", secs)
        }
    } else {
        format!("{} ms", timeout_ms)
    }
}

/// 机械臂客户端错误类型
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ArmError {
    // ==================== Recoverable Errors ====================
    /// 等待状态转换超时
    #[error("failed to {phase} within {}", format_timeout(timeout_ms))]
    Timeout { phase: Phase, timeout_ms: u64 },

    // ==================== Fatal Errors ====================
    /// 机械臂上报故障（状态已回到 DISABLED，需要重新使能）
    #[error("arm fault during {phase}: {reason}")]
    Fault { phase: Phase, reason: String },

    // ==================== Precondition Errors ====================
    /// 运动目标要求 HOMED 状态
    #[error("arm is not homed (state: {state})")]
    NotHomed { state: ArmState },

    /// 目标无效（长度不匹配、非有限值）
    #[error("invalid target: {reason}")]
    InvalidTarget { reason: String },

    /// 参数无效
    #[error("invalid parameter '{param}': {reason}")]
    InvalidParameter { param: String, reason: String },

    /// 当前状态不允许请求的转换
    #[error("invalid state transition: {from} -> {to}")]
    InvalidTransition { from: ArmState, to: ArmState },

    // ==================== Infrastructure ====================
    /// 驱动层错误
    #[error("driver error: {0}")]
    Driver(#[from] DriverError),
}

impl ArmError {
    /// 是否为致命错误
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Fault { .. } => true,
            Self::Driver(e) => e.is_fatal(),
            _ => false,
        }
    }

    /// 重新执行操作可能会成功
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. }
                | Self::Driver(DriverError::ChannelFull)
                | Self::Driver(DriverError::Timeout)
        )
    }

    /// 调用前置条件不满足（没有发出任何命令）
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::NotHomed { .. }
                | Self::InvalidTarget { .. }
                | Self::InvalidParameter { .. }
                | Self::InvalidTransition { .. }
        )
    }

    pub fn timeout(phase: Phase, timeout: Duration) -> Self {
        Self::Timeout {
            phase,
            timeout_ms: timeout.as_millis() as u64,
        }
    }

    pub fn fault(phase: Phase, reason: impl Into<String>) -> Self {
        Self::Fault {
            phase,
            reason: reason.into(),
        }
    }

    pub fn invalid_target(reason: impl Into<String>) -> Self {
        Self::InvalidTarget {
            reason: reason.into(),
        }
    }

    pub fn invalid_parameter(param: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            param: param.into(),
            reason: reason.into(),
        }
    }
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, ArmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let fault = ArmError::fault(Phase::Goal, "encoder");
        assert!(fault.is_fatal());
        assert!(!fault.is_retryable());

        let timeout = ArmError::timeout(Phase::Home, Duration::from_secs(10));
        assert!(!timeout.is_fatal());
        assert!(timeout.is_retryable());

        let not_homed = ArmError::NotHomed {
            state: ArmState::Enabled,
        };
        assert!(not_homed.is_precondition());
        assert!(!not_homed.is_fatal());

        assert!(ArmError::Driver(DriverError::ChannelClosed).is_fatal());
        assert!(ArmError::Driver(DriverError::ChannelFull).is_retryable());
    }

    #[test]
    fn test_timeout_message_names_phase() {
        let err = ArmError::timeout(Phase::Enable, Duration::from_secs(10));
        assert_eq!(err.to_string(), "failed to enable within 10 seconds");

        let err = ArmError::timeout(Phase::Home, Duration::from_secs(1));
        assert_eq!(err.to_string(), "failed to home within 1 second");

        let err = ArmError::timeout(Phase::Goal, Duration::from_millis(250));
        assert_eq!(err.to_string(), "failed to reach goal within 250 ms");
    }

    #[test]
    fn test_error_display() {
        let err = ArmError::InvalidTransition {
            from: ArmState::Disabled,
            to: ArmState::Homed,
        };
        assert_eq!(err.to_string(), "invalid state transition: DISABLED -> HOMED");

        let err = ArmError::invalid_parameter("interval", "must be positive");
        assert!(err.to_string().contains("interval"));
        assert!(err.is_precondition());
    }

    #[test]
    fn test_from_driver_error() {
        let err: ArmError = DriverError::Timeout.into();
        assert!(matches!(err, ArmError::Driver(DriverError::Timeout)));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ArmError>();
    }
}
