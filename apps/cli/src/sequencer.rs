//! 示例序列
//!
//! 使能 → 回零 → 初始关节目标 → （可选）笛卡尔往返 → （可选）夹爪伺服。
//! 使能 / 回零失败会终止序列；目标超时只记录警告并继续。

use anyhow::{Context, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use teleop_sdk::prelude::*;
use tracing::{info, warn};

use crate::config::CliConfig;

/// 笛卡尔演示的位移（米）
const CARTESIAN_OFFSET: f64 = -0.05;
/// 初始位置中插入关节（joint 2）的位置
const INSERTION_DEPTH: f64 = 0.12;

/// 夹爪伺服参数
#[derive(Debug, Clone, PartialEq)]
pub struct JawServoPlan {
    pub open: Rad,
    pub amplitude: Rad,
    pub duration: Duration,
    pub cycles: usize,
}

/// 一次运行的完整计划
#[derive(Debug, Clone, PartialEq)]
pub struct SequencePlan {
    pub enable_timeout: Duration,
    pub home_timeout: Duration,
    pub goal_timeout: Duration,
    /// 期望的控制周期
    pub interval: Duration,
    pub axis: Option<Axis>,
    pub jaw_servo: Option<JawServoPlan>,
}

impl SequencePlan {
    pub fn new(config: &CliConfig, interval: Duration, axis: Option<Axis>, jaw_servo: bool) -> Self {
        let jaw = &config.jaw;
        Self {
            enable_timeout: Duration::from_secs_f64(config.timeouts.enable_secs),
            home_timeout: Duration::from_secs_f64(config.timeouts.home_secs),
            goal_timeout: Duration::from_secs_f64(config.timeouts.goal_wait_secs),
            interval,
            axis,
            jaw_servo: jaw_servo.then(|| JawServoPlan {
                open: Deg(jaw.open_deg).to_rad(),
                amplitude: Deg(jaw.amplitude_deg).to_rad(),
                duration: Duration::from_secs_f64(jaw.duration_secs),
                cycles: jaw.cycles,
            }),
        }
    }
}

/// 运行统计
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SequenceSummary {
    pub reached: usize,
    pub timed_out: usize,
    pub superseded: usize,
    pub jaw: Option<StreamReport>,
    pub aborted: bool,
}

pub struct ExampleSequencer {
    arm: Arm,
    plan: SequencePlan,
    abort: Arc<AtomicBool>,
    summary: SequenceSummary,
}

impl ExampleSequencer {
    pub fn new(arm: Arm, plan: SequencePlan, abort: Arc<AtomicBool>) -> Self {
        Self {
            arm,
            plan,
            abort,
            summary: SequenceSummary::default(),
        }
    }

    /// 执行完整序列
    ///
    /// # 错误
    /// 使能 / 回零失败、故障、目标被拒绝
    pub fn run(mut self) -> Result<SequenceSummary> {
        let model = self.arm.model();

        self.arm.try_enable(self.plan.enable_timeout)?;
        self.arm.try_home(self.plan.home_timeout)?;

        if self.aborted() {
            return Ok(self.summary);
        }
        info!("Moving {} to initial joint position", model);
        let initial = JointVector::zeros(model.joint_count()).with(2, INSERTION_DEPTH);
        let goal = self.arm.move_joint(initial)?;
        self.settle("initial joint position", goal, WaitOptions::new())?;

        if let Some(axis) = self.plan.axis {
            if self.aborted() {
                return Ok(self.summary);
            }
            self.cartesian_demo(axis)?;
        }

        if let Some(jaw) = self.plan.jaw_servo.clone() {
            if self.aborted() {
                return Ok(self.summary);
            }
            self.jaw_demo(&jaw)?;
        }

        info!(
            "Sequence finished: {} reached, {} timed out",
            self.summary.reached, self.summary.timed_out
        );
        Ok(self.summary)
    }

    /// 沿 `axis` 移动 -5cm 再返回
    fn cartesian_demo(&mut self, axis: Axis) -> Result<()> {
        let model = self.arm.model();
        let tracked = WaitOptions::new().track_busy();

        // 准备姿态：joint 0/1 归零，joint 2 插入
        let current = self
            .arm
            .observer()
            .setpoint_joints()
            .unwrap_or_else(|| JointVector::zeros(model.joint_count()));
        let prepare = current.with(0, 0.0).with(1, 0.0).with(2, INSERTION_DEPTH);
        let goal = self.arm.move_joint(prepare)?;
        self.settle("cartesian start position", goal, tracked)?;

        let start = self
            .arm
            .observer()
            .setpoint_pose()
            .context("no setpoint pose reported by the arm")?;

        info!("Cartesian move along {} by {} m", axis, CARTESIAN_OFFSET);
        let goal = self.arm.move_pose(start.translated(axis, CARTESIAN_OFFSET))?;
        self.settle("cartesian offset", goal, tracked)?;

        let goal = self.arm.move_pose(start)?;
        self.settle("cartesian return", goal, tracked)?;
        Ok(())
    }

    /// 张开夹爪后按控制周期流式发送余弦抖动
    fn jaw_demo(&mut self, plan: &JawServoPlan) -> Result<()> {
        info!("Opening jaw to {}", plan.open.to_deg());
        let goal = self.arm.open_jaw(plan.open)?;
        self.settle("jaw open", goal, WaitOptions::new().track_busy())?;

        let trajectory =
            JawTrajectory::generate(plan.open, plan.amplitude, plan.duration, self.plan.interval)?
                .with_cycles(plan.cycles)?;
        let report = self.arm.stream_jaw(&trajectory, self.abort.clone())?;
        info!(
            "Jaw servo sent {} setpoints in {:?} ({} late)",
            report.sent, report.elapsed, report.late
        );
        self.summary.aborted |= report.aborted;
        self.summary.jaw = Some(report);
        Ok(())
    }

    /// 等待目标；超时只记录警告
    fn settle(&mut self, label: &str, goal: GoalHandle, options: WaitOptions) -> Result<()> {
        let id = goal.id();
        let options = options.timeout(self.plan.goal_timeout);
        match goal.wait_with(options)? {
            Completion::Reached => {
                info!("Reached {} (goal {})", label, id);
                self.summary.reached += 1;
            },
            Completion::TimedOut => {
                warn!(
                    "{} (goal {}) not reached within {:?}, continuing",
                    label, id, self.plan.goal_timeout
                );
                self.summary.timed_out += 1;
            },
            Completion::Superseded => {
                warn!("{} (goal {}) was superseded", label, id);
                self.summary.superseded += 1;
            },
        }
        Ok(())
    }

    fn aborted(&mut self) -> bool {
        if self.abort.load(Ordering::Acquire) {
            warn!("Sequence aborted");
            self.summary.aborted = true;
        }
        self.summary.aborted
    }
}
