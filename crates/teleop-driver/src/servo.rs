//! 伺服设定点发送接口
//!
//! 流式设定点不需要应答，发送方只负责把最新值交给 TX 线程。

use crate::driver::Driver;
use crate::error::DriverError;
use std::sync::Arc;
use teleop_protocol::ArmCommand;

/// 单通道伺服设定点发送端（fire-and-forget）
pub trait ServoSender: Send + Sync {
    fn send_setpoint(&self, value: f64) -> Result<(), DriverError>;
}

/// 驱动把设定点写入实时邮箱（夹爪伺服话题）
impl ServoSender for Driver {
    fn send_setpoint(&self, value: f64) -> Result<(), DriverError> {
        self.send_realtime(ArmCommand::ServoJaw { angle: value })
    }
}

impl<T: ServoSender + ?Sized> ServoSender for Arc<T> {
    fn send_setpoint(&self, value: f64) -> Result<(), DriverError> {
        (**self).send_setpoint(value)
    }
}

impl<T: ServoSender + ?Sized> ServoSender for &T {
    fn send_setpoint(&self, value: f64) -> Result<(), DriverError> {
        (**self).send_setpoint(value)
    }
}
