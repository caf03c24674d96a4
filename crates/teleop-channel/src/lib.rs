//! # Teleop Channel
//!
//! 机械臂控制通道抽象层。
//!
//! 上层（驱动层）只依赖三个 trait：
//!
//! - [`ControlChannel`]: 一条完整的控制连接，可拆分为读写两半
//! - [`StateStream`]: 有序、至少一次投递的状态流（RX 线程独占）
//! - [`CommandSink`]: 命令发送端（TX 线程独占）
//!
//! 话题命名、命名空间解析、线路编码都由具体实现负责。
//! 启用 `sim` feature（默认开启）时提供进程内的 [`SimulatedArm`]。

use std::time::Duration;
use teleop_protocol::{ArmCommand, StateUpdate};
use thiserror::Error;

#[cfg(feature = "sim")]
pub mod sim;

#[cfg(feature = "sim")]
pub use sim::{SentCommand, SimConfig, SimHandle, SimSink, SimStream, SimulatedArm};

// 重新导出协议层消息
pub use teleop_protocol::{ArmModel, topics};

/// 通道层统一错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// 在给定时间内没有收到消息
    #[error("Receive timeout")]
    Timeout,

    /// 对端已关闭
    #[error("Channel closed")]
    Closed,

    /// 传输层错误（中间件相关）
    #[error("Transport error: {0}")]
    Transport(String),
}

impl ChannelError {
    pub fn transport(message: impl Into<String>) -> Self {
        ChannelError::Transport(message.into())
    }

    /// 致命错误：通道不可再用，IO 线程应当退出
    pub fn is_fatal(&self) -> bool {
        matches!(self, ChannelError::Closed)
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ChannelError::Timeout)
    }
}

/// 拼接完整话题路径：`<namespace>/<suffix>`
pub fn topic_path(namespace: &str, suffix: &str) -> String {
    if namespace.is_empty() {
        suffix.to_string()
    } else {
        format!("{}/{}", namespace.trim_end_matches('/'), suffix)
    }
}

/// 状态流（读半部分）
pub trait StateStream: Send + 'static {
    /// 阻塞接收下一条状态消息，最多等待 `timeout`
    fn receive(&mut self, timeout: Duration) -> Result<StateUpdate, ChannelError>;

    /// 非阻塞接收
    fn try_receive(&mut self) -> Result<Option<StateUpdate>, ChannelError> {
        match self.receive(Duration::ZERO) {
            Ok(update) => Ok(Some(update)),
            Err(ChannelError::Timeout) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// 命令发送端（写半部分）
pub trait CommandSink: Send + 'static {
    /// 发布一条命令到 `topic`（话题后缀，命名空间由实现补全）
    fn send_command(&mut self, topic: &str, command: &ArmCommand) -> Result<(), ChannelError>;
}

/// 可拆分的控制通道
///
/// 拆分后读写两半分别交给 RX / TX 线程，互不阻塞。
pub trait ControlChannel: Send + 'static {
    type Stream: StateStream;
    type Sink: CommandSink;

    /// 命名空间（通常是机械臂型号名，如 `PSM1`）
    fn namespace(&self) -> &str;

    fn split(self) -> Result<(Self::Stream, Self::Sink), ChannelError>;
}
