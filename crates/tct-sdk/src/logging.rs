//! 日志初始化
//!
//! `tracing-subscriber` 输出到 stderr，过滤规则取 `RUST_LOG`，未设置时用 [`DEFAULT_FILTER`]。
//! 同时安装 `tracing-log` 桥接，依赖 `log` 的第三方库（例如串口枚举）也能输出。

use tracing_subscriber::EnvFilter;

/// 默认过滤规则
pub const DEFAULT_FILTER: &str = "info";

/// 用默认过滤规则初始化日志
///
/// 重复调用是安全的：已有全局 subscriber 时返回 `false`。
pub fn init_logger() -> bool {
    init_logger_with(DEFAULT_FILTER)
}

/// 用指定过滤规则初始化日志（`RUST_LOG` 优先）
pub fn init_logger_with(default_filter: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        return false;
    }
    // 已经有 log 记录器时不覆盖
    let _ = tracing_log::LogTracer::init();
    true
}
