//! 日志初始化
//!
//! 安装 `tracing-subscriber` fmt 订阅者，并通过 `tracing-log`
//! 把 `log` crate 的记录转发到 tracing。
//!
//! 过滤规则优先读取 `RUST_LOG`，未设置时使用 `default_directives`。

use thiserror::Error;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("invalid log directives: {0}")]
    Directives(#[from] tracing_subscriber::filter::ParseError),

    #[error("failed to bridge log records: {0}")]
    LogBridge(#[from] log::SetLoggerError),

    #[error("global subscriber already installed: {0}")]
    Subscriber(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// 初始化全局日志
///
/// # Example
///
/// ```rust,no_run
/// teleop_sdk::init_logger("teleop_client=info,teleop_driver=warn")?;
/// # Ok::<(), teleop_sdk::LoggerError>(())
/// ```
///
/// # 错误
/// - `LoggerError::Directives`: `default_directives` 无法解析
/// - `LoggerError::LogBridge` / `LoggerError::Subscriber`: 已经初始化过
pub fn init_logger(default_directives: &str) -> Result<(), LoggerError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_directives)?,
    };

    tracing_log::LogTracer::init()?;

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_fails() {
        // 同一进程只能初始化一次
        let first = init_logger("info");
        let second = init_logger("info");
        assert!(first.is_ok());
        assert!(second.is_err());
    }
}
