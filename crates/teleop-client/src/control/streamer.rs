//! Jaw Streamer - 按固定间隔流式发送夹爪设定点
//!
//! 按绝对时间表发送（第 `i` 个采样在 `start + offset_i` 发出），
//! 单次超时不会累积到后续采样。使用 `spin_sleep` 获得亚毫秒级精度。
//!
//! 设定点走实时邮箱：未发出的旧值会被新值覆盖，不需要应答。

use super::jaw::{JawSample, JawTrajectory};
use crate::arm::Arm;
use crate::types::{ArmError, Result};
use spin_sleep::SpinSleeper;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use teleop_driver::{Driver, ServoSender};
use tracing::{debug, info, warn};

/// 默认的迟到容差
const DEFAULT_LATE_TOLERANCE: Duration = Duration::from_millis(1);

/// 流式发送统计
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamReport {
    /// 已发送的采样数
    pub sent: usize,
    /// 晚于容差发出的采样数
    pub late: usize,
    pub max_lateness: Duration,
    /// 是否被中止
    pub aborted: bool,
    pub elapsed: Duration,
}

/// 夹爪设定点流式发送器
pub struct JawStreamer<S: ServoSender> {
    sender: S,
    abort: Arc<AtomicBool>,
    late_tolerance: Duration,
}

impl<S: ServoSender> JawStreamer<S> {
    pub fn new(sender: S) -> Self {
        Self {
            sender,
            abort: Arc::new(AtomicBool::new(false)),
            late_tolerance: DEFAULT_LATE_TOLERANCE,
        }
    }

    /// 使用外部中止标志（例如 Ctrl-C 处理器设置的标志）
    pub fn with_abort_flag(mut self, abort: Arc<AtomicBool>) -> Self {
        self.abort = abort;
        self
    }

    pub fn with_late_tolerance(mut self, tolerance: Duration) -> Self {
        self.late_tolerance = tolerance;
        self
    }

    /// 中止标志（设置为 `true` 后在下一个采样前停止）
    pub fn abort_handle(&self) -> Arc<AtomicBool> {
        self.abort.clone()
    }

    /// 流式发送整条轨迹
    pub fn stream(&self, trajectory: &JawTrajectory) -> Result<StreamReport> {
        info!(
            "Streaming jaw trajectory: {} samples every {:?}",
            trajectory
                .total_samples()
                .map_or_else(|| "unbounded".to_string(), |n| n.to_string()),
            trajectory.interval()
        );
        self.stream_samples(trajectory.samples())
    }

    /// 流式发送任意采样序列（按 `offset` 定时）
    ///
    /// # 错误
    /// - `ArmError::Driver`: 发送失败（IO 线程已退出）
    pub fn stream_samples(&self, samples: impl IntoIterator<Item = JawSample>) -> Result<StreamReport> {
        let sleeper = SpinSleeper::default();
        let start = Instant::now();
        let mut report = StreamReport::default();

        for sample in samples {
            if self.abort.load(Ordering::Acquire) {
                debug!("Jaw stream aborted at sample {}", sample.index);
                report.aborted = true;
                break;
            }

            let deadline = start + sample.offset;
            let now = Instant::now();
            if now < deadline {
                sleeper.sleep(deadline - now);
            } else {
                let lateness = now - deadline;
                if lateness > self.late_tolerance {
                    report.late += 1;
                    report.max_lateness = report.max_lateness.max(lateness);
                }
            }

            self.sender.send_setpoint(sample.angle.0)?;
            report.sent += 1;
        }

        report.elapsed = start.elapsed();
        if report.late > 0 {
            warn!(
                "{} of {} jaw setpoints were late (max {:?})",
                report.late, report.sent, report.max_lateness
            );
        }
        debug!("Jaw stream finished: {:?}", report);
        Ok(report)
    }
}

impl Arm {
    /// 创建夹爪流式发送器
    ///
    /// # 错误
    /// - `ArmError::NotHomed`: 机械臂未处于 HOMED
    pub fn jaw_streamer(&self) -> Result<JawStreamer<Arc<Driver>>> {
        let state = self.state();
        if !state.accepts_motion() {
            return Err(ArmError::NotHomed { state });
        }
        Ok(JawStreamer::new(self.driver.clone()))
    }

    /// 流式发送夹爪轨迹，直到结束或 `abort` 被设置
    pub fn stream_jaw(
        &self,
        trajectory: &JawTrajectory,
        abort: Arc<AtomicBool>,
    ) -> Result<StreamReport> {
        self.jaw_streamer()?.with_abort_flag(abort).stream(trajectory)
    }
}
