//! 驱动层错误类型定义

use teleop_channel::ChannelError;
use thiserror::Error;

/// 驱动层错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    /// 控制通道错误
    #[error("Control channel error: {0}")]
    Channel(#[from] ChannelError),

    /// 命令队列已关闭（TX 线程退出）
    #[error("Command channel closed")]
    ChannelClosed,

    /// 可靠命令队列已满
    #[error("Command channel full")]
    ChannelFull,

    /// 锁被毒化（线程 panic）
    #[error("Poisoned lock (thread panic)")]
    PoisonedLock,

    /// IO 线程错误
    #[error("IO thread error: {0}")]
    IoThread(String),

    /// 操作超时
    #[error("Operation timeout")]
    Timeout,
}

impl DriverError {
    /// IO 线程已不可用，重试没有意义
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DriverError::ChannelClosed
                | DriverError::PoisonedLock
                | DriverError::IoThread(_)
                | DriverError::Channel(ChannelError::Closed)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_error_display() {
        let err = DriverError::Channel(ChannelError::Timeout);
        assert!(err.to_string().contains("Receive timeout"));

        assert_eq!(DriverError::ChannelClosed.to_string(), "Command channel closed");
        assert!(DriverError::ChannelFull.to_string().contains("full"));
        assert_eq!(DriverError::Timeout.to_string(), "Operation timeout");

        let err = DriverError::IoThread("spawn failed".to_string());
        assert!(err.to_string().contains("IO thread") && err.to_string().contains("spawn failed"));
    }

    #[test]
    fn test_from_channel_error() {
        let err: DriverError = ChannelError::Closed.into();
        assert!(matches!(err, DriverError::Channel(ChannelError::Closed)));
        assert!(err.is_fatal());
        assert!(!DriverError::ChannelFull.is_fatal());
    }
}
