//! Runtime configuration
//!
//! 选择分配策略：普通分配器或带账本的调试分配器。
//! 默认值跟随 `debug-memory` feature，环境变量 `SL_DEBUG_MEMORY` 可以覆盖。

use crate::error::ConfigError;

/// 控制调试内存追踪的环境变量
pub const DEBUG_MEMORY_ENV: &str = "SL_DEBUG_MEMORY";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// 使用 TrackingAllocator 并输出 ALLOC/FREE 诊断行
    pub debug_memory: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            debug_memory: cfg!(feature = "debug-memory"),
        }
    }
}

impl RuntimeConfig {
    pub fn plain() -> Self {
        Self { debug_memory: false }
    }

    pub fn debug() -> Self {
        Self { debug_memory: true }
    }

    /// 从环境变量读取配置，未设置时使用默认值
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_var(std::env::var(DEBUG_MEMORY_ENV).ok())
    }

    /// 与 `from_env` 相同，但非法值回退到默认配置（C ABI 没有错误通道）
    pub fn from_env_lossy() -> Self {
        match Self::from_env() {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(%err, "ignoring runtime configuration from environment");
                Self::default()
            }
        }
    }

    fn from_var(value: Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(value) = value {
            config.debug_memory = parse_flag(&value).ok_or(ConfigError::InvalidValue {
                var: DEBUG_MEMORY_ENV,
                value,
            })?;
        }
        Ok(config)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
