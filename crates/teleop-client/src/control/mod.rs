//! 夹爪流式控制
//!
//! - `jaw`: 余弦开合轨迹（Iterator 模式）
//! - `streamer`: 按固定间隔发送设定点

pub mod jaw;
pub mod streamer;

pub use jaw::{DEFAULT_CYCLES, JawSample, JawSamples, JawTrajectory};
pub use streamer::{JawStreamer, StreamReport};
