//! 可观测性模块
//!
//! 提供日志与追踪的统一初始化。所有二进制通过单一入口点配置，确保输出格式一致。

pub mod tracing;

pub use crate::config::ObservabilityConfig;

use ::tracing::debug;
use anyhow::Result;

/// 初始化可观测性
///
/// # Example
///
/// ```ignore
/// use krule_shared::config::AppConfig;
/// use krule_shared::observability;
///
/// fn main() -> anyhow::Result<()> {
///     let config = AppConfig::load("krule")?;
///     observability::init(&config.observability)?;
///
///     // 应用逻辑...
///
///     Ok(())
/// }
/// ```
pub fn init(config: &ObservabilityConfig) -> Result<()> {
    tracing::init(config)?;

    debug!(
        log_level = %config.log_level,
        log_format = %config.log_format,
        "Observability initialized"
    );
    Ok(())
}
