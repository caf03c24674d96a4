//! Arm - 单台机械臂的客户端句柄
//!
//! 持有驱动（IO 线程）与观察器。生命周期操作见 `lifecycle` 模块，
//! 目标派发见 `goal` 模块，夹爪流式控制见 `control` 模块。

use crate::config::LifecycleConfig;
use crate::observer::Observer;
use crate::types::Result;
use std::sync::Arc;
use std::time::Duration;
use teleop_channel::ControlChannel;
use teleop_driver::{Driver, MetricsSnapshot, PipelineConfig};
use teleop_protocol::{ArmModel, ArmState};
use tracing::{info, warn};

/// 机械臂客户端
///
/// 同一台机械臂的所有命令通过同一个驱动发出，目标编号在这里全序分配。
pub struct Arm {
    pub(crate) driver: Arc<Driver>,
    pub(crate) observer: Observer,
    pub(crate) model: ArmModel,
    pub(crate) config: LifecycleConfig,
}

impl Arm {
    /// 在控制通道上启动驱动，并等待第一条状态报告
    ///
    /// # 错误
    /// - `ArmError::InvalidParameter`: 配置无效
    /// - `ArmError::Driver`: 通道拆分失败或超时未收到状态
    pub fn connect<C: ControlChannel>(
        model: ArmModel,
        channel: C,
        config: LifecycleConfig,
        pipeline: Option<PipelineConfig>,
        feedback_timeout: Duration,
    ) -> Result<Self> {
        config.validate()?;

        if channel.namespace() != model.name() {
            warn!(
                "Channel namespace '{}' differs from arm model '{}'",
                channel.namespace(),
                model
            );
        }

        let driver = Arc::new(Driver::new(channel, pipeline)?);
        driver.wait_for_feedback(feedback_timeout)?;

        info!("Connected to {} (state: {})", model, driver.operating().state);

        Ok(Self {
            observer: Observer::new(driver.clone()),
            driver,
            model,
            config,
        })
    }

    pub fn model(&self) -> ArmModel {
        self.model
    }

    /// 状态观察器（可克隆）
    pub fn observer(&self) -> &Observer {
        &self.observer
    }

    /// 底层驱动
    pub fn driver(&self) -> &Arc<Driver> {
        &self.driver
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    /// 最新操作状态
    pub fn state(&self) -> ArmState {
        self.observer.state()
    }

    /// 驱动统计
    pub fn metrics(&self) -> MetricsSnapshot {
        self.driver.get_metrics()
    }
}

impl std::fmt::Debug for Arm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arm")
            .field("model", &self.model)
            .field("state", &self.state())
            .field("config", &self.config)
            .finish()
    }
}
