//! 配置文件
//!
//! 默认路径：`<config_dir>/teleop/config.toml`。文件不存在时使用默认值；
//! 通过 `--config` 显式指定的文件必须存在。
//!
//! ```toml
//! [timeouts]
//! enable_secs = 10.0
//! home_secs = 10.0
//! goal_wait_secs = 30.0
//!
//! [jaw]
//! open_deg = 50.0
//! amplitude_deg = 30.0
//! duration_secs = 5.0
//! cycles = 4
//!
//! [sim]
//! ack_delay_ms = 50
//! motion_duration_ms = 200
//! ```

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use teleop_sdk::SimConfig;

/// 默认配置文件路径
pub fn default_config_file() -> Option<PathBuf> {
    let mut path = dirs::config_dir()?;
    path.push("teleop");
    path.push("config.toml");
    Some(path)
}

/// CLI 配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    pub timeouts: TimeoutConfig,
    pub jaw: JawConfig,
    pub sim: SimSettings,
}

/// 超时（秒）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimeoutConfig {
    pub enable_secs: f64,
    pub home_secs: f64,
    /// 单个目标的等待上限
    pub goal_wait_secs: f64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            enable_secs: 10.0,
            home_secs: 10.0,
            goal_wait_secs: 30.0,
        }
    }
}

/// 夹爪伺服演示参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JawConfig {
    pub open_deg: f64,
    pub amplitude_deg: f64,
    pub duration_secs: f64,
    pub cycles: usize,
}

impl Default for JawConfig {
    fn default() -> Self {
        Self {
            open_deg: 50.0,
            amplitude_deg: 30.0,
            duration_secs: 5.0,
            cycles: 4,
        }
    }
}

/// 模拟机械臂参数（毫秒）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimSettings {
    pub report_interval_ms: u64,
    pub ack_delay_ms: u64,
    pub home_delay_ms: u64,
    pub busy_delay_ms: u64,
    pub motion_duration_ms: u64,
    pub acknowledge: bool,
}

impl Default for SimSettings {
    fn default() -> Self {
        let defaults = SimConfig::default();
        Self {
            report_interval_ms: defaults.report_interval.as_millis() as u64,
            ack_delay_ms: defaults.ack_delay.as_millis() as u64,
            home_delay_ms: defaults.home_delay.as_millis() as u64,
            busy_delay_ms: defaults.busy_delay.as_millis() as u64,
            motion_duration_ms: defaults.motion_duration.as_millis() as u64,
            acknowledge: defaults.acknowledge,
        }
    }
}

impl SimSettings {
    pub fn to_sim_config(&self) -> SimConfig {
        SimConfig {
            report_interval: Duration::from_millis(self.report_interval_ms),
            ack_delay: Duration::from_millis(self.ack_delay_ms),
            home_delay: Duration::from_millis(self.home_delay_ms),
            busy_delay: Duration::from_millis(self.busy_delay_ms),
            motion_duration: Duration::from_millis(self.motion_duration_ms),
            acknowledge: self.acknowledge,
            ..SimConfig::default()
        }
    }
}

impl CliConfig {
    /// 加载配置
    ///
    /// `explicit` 为 `Some` 时文件必须存在；否则尝试默认路径。
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match default_config_file() {
                Some(path) if path.exists() => path,
                _ => return Ok(Self::default()),
            },
        };

        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config = Self::parse(&content)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let t = &self.timeouts;
        for (name, value) in [
            ("timeouts.enable_secs", t.enable_secs),
            ("timeouts.home_secs", t.home_secs),
            ("timeouts.goal_wait_secs", t.goal_wait_secs),
            ("jaw.duration_secs", self.jaw.duration_secs),
        ] {
            if !value.is_finite() || value <= 0.0 {
                bail!("{} must be a positive number, got {}", name, value);
            }
        }
        if !self.jaw.open_deg.is_finite() || !self.jaw.amplitude_deg.is_finite() {
            bail!("jaw angles must be finite");
        }
        if self.jaw.cycles == 0 {
            bail!("jaw.cycles must be at least 1");
        }
        Ok(())
    }
}
