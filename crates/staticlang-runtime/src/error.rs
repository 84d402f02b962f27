//! StaticLang runtime errors
//!
//! 运行时只有一种真正的错误：分配失败。在 C ABI 边界上统一表现为 NULL，
//! 在 Rust API 中表现为 `AllocError`。

use thiserror::Error;

/// 分配失败
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AllocError {
    /// 宿主分配器返回 NULL
    #[error("out of memory: failed to allocate {size} bytes")]
    OutOfMemory { size: usize },

    /// element_size * count 溢出
    #[error("array size overflow: {element_size} * {count} does not fit in usize")]
    SizeOverflow { element_size: usize, count: usize },
}

/// 配置错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {var} (expected 1/0, true/false, yes/no or on/off)")]
    InvalidValue { var: &'static str, value: String },
}

pub type Result<T, E = AllocError> = std::result::Result<T, E>;
