//! 驱动层模块
//!
//! 提供机械臂的 IO 线程管理与状态同步：
//! - 双线程模式：RX 线程接收状态，TX 线程发送命令
//! - 状态同步：ArcSwap 无锁读取，RX 线程是唯一写入者
//! - 命令优先级：实时邮箱（覆盖）优先于可靠队列（FIFO）
//! - 目标编号：每台机械臂一个原子序列，保证派发全序
//!
//! 大多数用户应该使用 `teleop-client` 提供的更高级接口。

pub mod command;
mod driver;
mod error;
pub mod heartbeat;
pub mod metrics;
pub mod pipeline;
pub mod servo;
pub mod state;

pub use command::{CommandPriority, priority_of};
pub use driver::Driver;
pub use error::DriverError;
pub use heartbeat::ConnectionMonitor;
pub use metrics::{DriverMetrics, MetricsSnapshot};
pub use pipeline::{PipelineConfig, RealtimeSlot, apply_update, rx_loop, tx_loop_mailbox};
pub use servo::ServoSender;
pub use state::{ArmContext, KinematicState, OperatingStatus};
