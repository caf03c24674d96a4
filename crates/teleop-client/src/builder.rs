//! Builder 模式实现
//!
//! 提供链式构造 `Arm` 的方法。

use crate::arm::Arm;
use crate::config::LifecycleConfig;
use crate::types::Result;
use std::time::Duration;
use teleop_channel::ControlChannel;
use teleop_driver::PipelineConfig;
use teleop_protocol::ArmModel;

/// 默认的首条状态等待时间
const DEFAULT_FEEDBACK_TIMEOUT: Duration = Duration::from_secs(2);

/// Arm Builder
///
/// # Example
///
/// ```rust,no_run
/// use teleop_client::ArmBuilder;
/// use teleop_protocol::ArmModel;
/// use teleop_channel::SimConfig;
/// use std::time::Duration;
///
/// let (arm, _sim) = ArmBuilder::new(ArmModel::Psm1)
///     .poll_interval(Duration::from_millis(5))
///     .build_simulated(SimConfig::default())?;
/// assert!(arm.enable(Duration::from_secs(10)));
/// # Ok::<(), teleop_client::ArmError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ArmBuilder {
    model: ArmModel,
    lifecycle: LifecycleConfig,
    pipeline: Option<PipelineConfig>,
    feedback_timeout: Duration,
}

impl ArmBuilder {
    pub fn new(model: ArmModel) -> Self {
        Self {
            model,
            lifecycle: LifecycleConfig::default(),
            pipeline: None,
            feedback_timeout: DEFAULT_FEEDBACK_TIMEOUT,
        }
    }

    /// 整体替换生命周期配置
    pub fn lifecycle(mut self, config: LifecycleConfig) -> Self {
        self.lifecycle = config;
        self
    }

    /// 设置轮询间隔
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.lifecycle.poll_interval = interval;
        self
    }

    /// 设置 debounce 阈值
    pub fn debounce_threshold(mut self, threshold: usize) -> Self {
        self.lifecycle.debounce_threshold = threshold;
        self
    }

    /// 设置 IO 管道配置
    pub fn pipeline(mut self, config: PipelineConfig) -> Self {
        self.pipeline = Some(config);
        self
    }

    /// 连接后等待第一条状态报告的时间
    pub fn feedback_timeout(mut self, timeout: Duration) -> Self {
        self.feedback_timeout = timeout;
        self
    }

    /// 在给定通道上构建
    pub fn build<C: ControlChannel>(self, channel: C) -> Result<Arm> {
        Arm::connect(
            self.model,
            channel,
            self.lifecycle,
            self.pipeline,
            self.feedback_timeout,
        )
    }

    /// 在模拟机械臂上构建，同时返回模拟器句柄
    #[cfg(feature = "sim")]
    pub fn build_simulated(
        self,
        config: teleop_channel::SimConfig,
    ) -> Result<(Arm, teleop_channel::SimHandle)> {
        let sim = teleop_channel::SimulatedArm::new(self.model, config);
        let handle = sim.handle();
        let arm = self.build(sim)?;
        Ok((arm, handle))
    }
}
