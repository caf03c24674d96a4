//! 驱动层性能指标
//!
//! 原子计数器，任何线程都可以读取，不会引入锁竞争。

use std::sync::atomic::{AtomicU64, Ordering};

/// IO 链路指标
///
/// ```rust
/// use teleop_driver::DriverMetrics;
/// use std::sync::atomic::Ordering;
///
/// let metrics = DriverMetrics::new();
/// metrics.rx_updates_total.fetch_add(1, Ordering::Relaxed);
/// assert_eq!(metrics.snapshot().rx_updates_total, 1);
/// ```
#[derive(Debug, Default)]
pub struct DriverMetrics {
    /// RX 收到的状态消息总数
    pub rx_updates_total: AtomicU64,

    /// 其中的状态报告（`Operating`）数
    pub rx_reports: AtomicU64,

    /// 故障通知数
    pub rx_faults: AtomicU64,

    /// RX 接收超时次数（无数据时的正常现象）
    pub rx_timeouts: AtomicU64,

    /// TX 成功发出的命令数
    pub tx_commands_total: AtomicU64,

    /// 实时邮箱被覆盖的次数
    ///
    /// 快速增长说明 TX 线程跟不上设定点的生成速度。
    pub tx_realtime_overwrites: AtomicU64,

    /// 可靠队列满导致的丢弃次数
    pub tx_reliable_drops: AtomicU64,

    /// 通道错误次数
    pub channel_errors: AtomicU64,
}

impl DriverMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            rx_updates_total: self.rx_updates_total.load(Ordering::Relaxed),
            rx_reports: self.rx_reports.load(Ordering::Relaxed),
            rx_faults: self.rx_faults.load(Ordering::Relaxed),
            rx_timeouts: self.rx_timeouts.load(Ordering::Relaxed),
            tx_commands_total: self.tx_commands_total.load(Ordering::Relaxed),
            tx_realtime_overwrites: self.tx_realtime_overwrites.load(Ordering::Relaxed),
            tx_reliable_drops: self.tx_reliable_drops.load(Ordering::Relaxed),
            channel_errors: self.channel_errors.load(Ordering::Relaxed),
        }
    }

    /// 重置所有计数器
    pub fn reset(&self) {
        self.rx_updates_total.store(0, Ordering::Relaxed);
        self.rx_reports.store(0, Ordering::Relaxed);
        self.rx_faults.store(0, Ordering::Relaxed);
        self.rx_timeouts.store(0, Ordering::Relaxed);
        self.tx_commands_total.store(0, Ordering::Relaxed);
        self.tx_realtime_overwrites.store(0, Ordering::Relaxed);
        self.tx_reliable_drops.store(0, Ordering::Relaxed);
        self.channel_errors.store(0, Ordering::Relaxed);
    }
}

/// 指标快照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub rx_updates_total: u64,
    pub rx_reports: u64,
    pub rx_faults: u64,
    pub rx_timeouts: u64,
    pub tx_commands_total: u64,
    pub tx_realtime_overwrites: u64,
    pub tx_reliable_drops: u64,
    pub channel_errors: u64,
}

impl MetricsSnapshot {
    /// 实时邮箱覆盖率（覆盖次数 / 发出命令数）
    pub fn overwrite_ratio(&self) -> f64 {
        if self.tx_commands_total == 0 {
            0.0
        } else {
            self.tx_realtime_overwrites as f64 / self.tx_commands_total as f64
        }
    }

    /// 是否出现过需要关注的异常
    pub fn has_errors(&self) -> bool {
        self.channel_errors > 0 || self.tx_reliable_drops > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_snapshot_and_reset() {
        let metrics = DriverMetrics::new();
        metrics.tx_commands_total.fetch_add(4, Ordering::Relaxed);
        metrics.tx_realtime_overwrites.fetch_add(1, Ordering::Relaxed);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.tx_commands_total, 4);
        assert!((snapshot.overwrite_ratio() - 0.25).abs() < 1e-12);
        assert!(!snapshot.has_errors());

        metrics.channel_errors.fetch_add(1, Ordering::Relaxed);
        assert!(metrics.snapshot().has_errors());

        metrics.reset();
        assert_eq!(metrics.snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_overwrite_ratio_without_commands() {
        assert_eq!(MetricsSnapshot::default().overwrite_ratio(), 0.0);
    }
}
