// ==========================================
// 服装批次流转系统 - 日志初始化
// ==========================================
// tracing + tracing-subscriber, 级别由 RUST_LOG 控制
// 核心库只打点 (instrument/info/warn), 订阅器由入口程序装配
// ==========================================

use tracing_subscriber::{fmt, EnvFilter};

/// 未设置 RUST_LOG 时的缺省过滤器: 本系统 info, 其余 warn
const DEFAULT_FILTER: &str = "warn,garment_batch_flow=info";

/// 初始化日志系统（入口程序调用一次）
///
/// # 环境变量
/// - RUST_LOG: 日志级别过滤器, 例如 RUST_LOG=garment_batch_flow=trace
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_line_number(true)
        .init();
}

/// 初始化测试环境的日志系统（可重复调用, 只有首次生效）
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("garment_batch_flow=debug"))
        .with_test_writer()
        .compact()
        .try_init();
}
