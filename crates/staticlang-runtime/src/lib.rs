//! StaticLang Runtime Library
//!
//! 提供 StaticLang 编译产物需要的运行时支持
//!
//! ## 模块结构
//! - `alloc`: 分配策略（宿主分配器 / 调试追踪分配器）
//! - `ledger`: 调试分配账本
//! - `runtime`: 持有分配策略的运行时上下文
//! - `string`: 以 NUL 结尾的自有字符串
//! - `print`: 基本类型打印
//! - `ffi`: 导出给生成代码的 `sl_*` C 函数
//! - `config`: 运行时配置
//! - `error`: 错误类型
//!
//! 构建产物 `libstaticlang_runtime.a` 对应的 C 头文件是
//! `include/staticlang_runtime.h`，启用 `debug-memory` feature 时
//! 在 C 侧定义 `SL_DEBUG_MEMORY` 以使用 `sl_debug_*` 入口。

mod alloc;
mod config;
mod error;
mod ffi;
mod ledger;
mod print;
mod runtime;
mod string;

pub use alloc::*;
pub use config::*;
pub use error::*;
pub use ffi::*;
pub use ledger::*;
pub use print::*;
pub use runtime::*;
pub use string::*;
