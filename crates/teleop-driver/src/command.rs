//! 命令优先级
//!
//! TX 线程维护两条通路：
//!
//! - **实时邮箱**：伺服设定点，容量 1，新值覆盖旧值，优先发送
//! - **可靠队列**：生命周期与运动目标命令，有界 FIFO，绝不丢弃已入队的命令

use teleop_protocol::ArmCommand;

/// 命令优先级
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandPriority {
    /// 实时控制命令（可被覆盖）
    RealtimeControl,
    /// 可靠命令（按顺序发送）
    ReliableCommand,
}

/// 根据命令类型选择通路
pub fn priority_of(command: &ArmCommand) -> CommandPriority {
    match command {
        ArmCommand::ServoJaw { .. } => CommandPriority::RealtimeControl,
        _ => CommandPriority::ReliableCommand,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use teleop_protocol::{GoalId, JointVector};

    #[test]
    fn test_priority_of() {
        assert_eq!(
            priority_of(&ArmCommand::ServoJaw { angle: 0.1 }),
            CommandPriority::RealtimeControl
        );
        assert_eq!(
            priority_of(&ArmCommand::Enable),
            CommandPriority::ReliableCommand
        );
        assert_eq!(
            priority_of(&ArmCommand::MoveJoint {
                goal: GoalId(1),
                target: JointVector::zeros(6),
            }),
            CommandPriority::ReliableCommand
        );
    }
}
