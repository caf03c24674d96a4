//! # Teleop CLI
//!
//! 在模拟机械臂上运行示例序列：
//!
//! ```bash
//! # 使能、回零、移动到初始位置
//! teleop-cli --arm PSM1
//!
//! # 加上沿 x 轴的笛卡尔往返与夹爪伺服
//! teleop-cli --arm PSM2 --axis x --jaw-servo --interval 0.005
//! ```
//!
//! 日志级别通过 `RUST_LOG` 调整。

use anyhow::{Result, bail};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use teleop_sdk::prelude::*;
use tracing::{info, warn};

mod config;
mod sequencer;

use config::CliConfig;
use sequencer::{ExampleSequencer, SequencePlan};

/// 机械臂名称
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ArmArg {
    #[value(name = "PSM1", alias = "psm1")]
    Psm1,
    #[value(name = "PSM2", alias = "psm2")]
    Psm2,
    #[value(name = "PSM3", alias = "psm3")]
    Psm3,
}

impl From<ArmArg> for ArmModel {
    fn from(arg: ArmArg) -> Self {
        match arg {
            ArmArg::Psm1 => ArmModel::Psm1,
            ArmArg::Psm2 => ArmModel::Psm2,
            ArmArg::Psm3 => ArmModel::Psm3,
        }
    }
}

/// 笛卡尔演示的轴
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum AxisArg {
    X,
    Y,
    Z,
}

impl From<AxisArg> for Axis {
    fn from(arg: AxisArg) -> Self {
        match arg {
            AxisArg::X => Axis::X,
            AxisArg::Y => Axis::Y,
            AxisArg::Z => Axis::Z,
        }
    }
}

/// Teleop CLI - 遥操作机械臂示例序列
#[derive(Parser, Debug)]
#[command(name = "teleop-cli")]
#[command(about = "Enable, home and exercise a teleoperated arm", long_about = None)]
#[command(version)]
struct Cli {
    /// 机械臂名称
    #[arg(short, long, value_enum)]
    arm: ArmArg,

    /// 期望的控制周期（秒）
    #[arg(short, long, default_value_t = 0.01, value_parser = parse_interval, allow_negative_numbers = true)]
    interval: f64,

    /// 沿该轴做笛卡尔往返演示
    #[arg(long, value_enum)]
    axis: Option<AxisArg>,

    /// 夹爪伺服演示
    #[arg(long)]
    jaw_servo: bool,

    /// 配置文件路径（默认 <config_dir>/teleop/config.toml）
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn parse_interval(s: &str) -> std::result::Result<f64, String> {
    let value: f64 = s.parse().map_err(|e| format!("{}", e))?;
    if !value.is_finite() || value <= 0.0 {
        return Err(format!("interval must be a positive number of seconds, got {}", s));
    }
    Ok(value)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    teleop_sdk::init_logger("teleop_cli=info,teleop_client=info,teleop_driver=info")?;

    let config = CliConfig::load(cli.config.as_deref())?;
    let model = ArmModel::from(cli.arm);
    let interval = Duration::from_secs_f64(cli.interval);
    let plan = SequencePlan::new(&config, interval, cli.axis.map(Axis::from), cli.jaw_servo);

    // Ctrl-C：在下一个步骤 / 采样前停止
    let abort = Arc::new(AtomicBool::new(false));
    {
        let abort = abort.clone();
        ctrlc::set_handler(move || {
            abort.store(true, Ordering::Release);
        })?;
    }

    info!("Starting example sequence on {} (interval {:?})", model, interval);

    let sim_config = config.sim.to_sim_config();
    let summary = tokio::task::spawn_blocking(move || -> Result<_> {
        let (arm, _sim) = ArmBuilder::new(model)
            .poll_interval(interval)
            .build_simulated(sim_config)?;
        ExampleSequencer::new(arm, plan, abort).run()
    })
    .await??;

    if summary.aborted {
        warn!("Interrupted");
        bail!("sequence interrupted");
    }
    println!(
        "✅ {}: {} goals reached, {} timed out",
        model, summary.reached, summary.timed_out
    );
    if let Some(jaw) = summary.jaw {
        println!("   jaw servo: {} setpoints, {} late", jaw.sent, jaw.late);
    }
    Ok(())
}
