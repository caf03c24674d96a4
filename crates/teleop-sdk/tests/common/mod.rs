//! 集成测试共享工具

#![allow(dead_code)]

use std::time::{Duration, Instant};
use teleop_sdk::prelude::*;

pub const LIFECYCLE_TIMEOUT: Duration = Duration::from_secs(2);

/// 缩短延迟的模拟器配置
pub fn fast_sim() -> SimConfig {
    SimConfig {
        report_interval: Duration::from_millis(10),
        ack_delay: Duration::from_millis(20),
        home_delay: Duration::from_millis(30),
        motion_duration: Duration::from_millis(80),
        ..Default::default()
    }
}

pub fn connect(model: ArmModel, config: SimConfig) -> (Arm, SimHandle) {
    ArmBuilder::new(model)
        .poll_interval(Duration::from_millis(2))
        .build_simulated(config)
        .expect("simulated arm should connect")
}

/// 使能并回零，清空命令记录
pub fn homed_arm(config: SimConfig) -> (Arm, SimHandle) {
    let (arm, sim) = connect(ArmModel::Psm1, config);
    arm.try_enable(LIFECYCLE_TIMEOUT).expect("enable");
    arm.try_home(LIFECYCLE_TIMEOUT).expect("home");
    sim.clear_log();
    (arm, sim)
}

/// 轮询直到条件成立
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    condition()
}
