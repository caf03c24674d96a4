//! 生命周期：使能、回零、下电
//!
//! 每个操作发出一次请求，然后轮询状态快照直到到达目标状态、
//! 收到故障或超时。`enable` / `home` 返回 `bool`，
//! `try_enable` / `try_home` 返回带原因的错误。

use crate::arm::Arm;
use crate::types::{ArmError, Phase, Result};
use std::time::{Duration, Instant};
use teleop_driver::DriverError;
use teleop_protocol::{ArmCommand, ArmState};
use tracing::{debug, info, warn};

impl Arm {
    /// 请求使能并等待 ENABLED（或之后的状态）
    ///
    /// 超时或故障时返回 `false` 并记录警告。
    pub fn enable(&self, timeout: Duration) -> bool {
        match self.try_enable(timeout) {
            Ok(()) => true,
            Err(e) => {
                warn!("{}: {}", self.model, e);
                false
            },
        }
    }

    /// 请求使能并等待 ENABLED（或之后的状态）
    ///
    /// 已经使能时直接返回；其他状态（包括上次超时留下的 ENABLING）都重新发送请求。
    ///
    /// # 错误
    /// - `ArmError::Timeout`: 超时仍未使能
    /// - `ArmError::Fault`: 等待期间收到故障
    /// - `ArmError::Driver`: IO 线程已退出
    pub fn try_enable(&self, timeout: Duration) -> Result<()> {
        let status = self.observer.operating();
        if status.state.is_enabled() {
            debug!("{} already enabled ({})", self.model, status.state);
            return Ok(());
        }

        self.driver.send_reliable(ArmCommand::Enable)?;
        info!("Enabling {}", self.model);

        self.wait_for_state(Phase::Enable, |s| s.is_enabled(), Some(status.fault_count), timeout)?;
        info!("{} enabled", self.model);
        Ok(())
    }

    /// 请求回零并等待 HOMED
    ///
    /// 超时、故障或状态不允许时返回 `false` 并记录警告。
    pub fn home(&self, timeout: Duration) -> bool {
        match self.try_home(timeout) {
            Ok(()) => true,
            Err(e) => {
                warn!("{}: {}", self.model, e);
                false
            },
        }
    }

    /// 请求回零并等待 HOMED
    ///
    /// - `HOMED`：直接返回，不发送请求
    /// - `ENABLED` / `HOMING`：发送请求并等待（超时后重试会重新请求）
    ///
    /// # 错误
    /// - `ArmError::InvalidTransition`: 未使能（DISABLED / ENABLING）
    /// - `ArmError::Timeout`: 超时仍未回零
    /// - `ArmError::Fault`: 等待期间收到故障
    pub fn try_home(&self, timeout: Duration) -> Result<()> {
        let status = self.observer.operating();
        match status.state {
            ArmState::Homed => {
                debug!("{} already homed", self.model);
                return Ok(());
            },
            ArmState::Enabled | ArmState::Homing => self.driver.send_reliable(ArmCommand::Home)?,
            from => {
                return Err(ArmError::InvalidTransition {
                    from,
                    to: ArmState::Homed,
                });
            },
        }
        info!("Homing {}", self.model);

        self.wait_for_state(
            Phase::Home,
            |s| s == ArmState::Homed,
            Some(status.fault_count),
            timeout,
        )?;
        info!("{} homed", self.model);
        Ok(())
    }

    /// 请求下电并等待 DISABLED
    ///
    /// 故障本身就会让机械臂回到 DISABLED，所以这里不因故障失败。
    pub fn disable(&self, timeout: Duration) -> Result<()> {
        if self.state() == ArmState::Disabled {
            return Ok(());
        }
        self.driver.send_reliable(ArmCommand::Disable)?;
        info!("Disabling {}", self.model);
        self.wait_for_state(Phase::Disable, |s| s == ArmState::Disabled, None, timeout)
    }

    /// 轮询直到状态满足 `reached`
    ///
    /// `fault_baseline` 为 `Some` 时，故障计数超过基线立即失败。
    pub(crate) fn wait_for_state(
        &self,
        phase: Phase,
        reached: impl Fn(ArmState) -> bool,
        fault_baseline: Option<u64>,
        timeout: Duration,
    ) -> Result<()> {
        let start = Instant::now();
        let poll_interval = self.config.poll_interval;
        let debounce_threshold = self.config.debounce_threshold;
        let mut stable_count = 0;

        loop {
            let status = self.observer.operating();

            if let Some(baseline) = fault_baseline
                && status.fault_count > baseline
            {
                let reason = status
                    .last_fault
                    .clone()
                    .unwrap_or_else(|| "unknown fault".to_string());
                return Err(ArmError::fault(phase, reason));
            }

            if reached(status.state) {
                stable_count += 1;
                if stable_count >= debounce_threshold {
                    debug!(
                        "{} reached {} after {:?}",
                        self.model,
                        status.state,
                        start.elapsed()
                    );
                    return Ok(());
                }
            } else {
                stable_count = 0;
            }

            if !self.driver.is_healthy() {
                return Err(DriverError::ChannelClosed.into());
            }

            let elapsed = start.elapsed();
            if elapsed > timeout {
                return Err(ArmError::timeout(phase, timeout));
            }

            // 不超过剩余时间
            let remaining = timeout.saturating_sub(elapsed);
            let sleep_duration = poll_interval.min(remaining);
            if sleep_duration.is_zero() {
                return Err(ArmError::timeout(phase, timeout));
            }
            std::thread::sleep(sleep_duration);
        }
    }
}
