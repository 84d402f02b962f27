//! C ABI exported to StaticLang generated code
//!
//! 代码生成器声明的 `sl_*` 函数都在这里。它们共享一个进程级的 Runtime，
//! 第一次调用时根据 `RuntimeConfig::from_env_lossy()` 创建。
//!
//! 分配失败统一返回 NULL，从不 abort。

use std::ffi::{c_char, c_int, c_void, CStr};
use std::ptr;

use once_cell::sync::Lazy;

use crate::alloc::{Block, SourceLocation};
use crate::config::RuntimeConfig;
use crate::error::Result;
use crate::print;
use crate::runtime::Runtime;
use crate::string::OwnedString;

static RUNTIME: Lazy<Runtime> =
    Lazy::new(|| Runtime::from_config(&RuntimeConfig::from_env_lossy()));

/// 没有调用位置信息的入口使用这个位置
const UNKNOWN_LOCATION: SourceLocation<'static> = SourceLocation {
    file: "<unknown>",
    line: 0,
};

/// C ABI 背后的进程级 Runtime
pub fn runtime() -> &'static Runtime {
    &RUNTIME
}

// ==================== 辅助函数 ====================

unsafe fn c_str_opt<'a>(ptr: *const c_char) -> Option<&'a CStr> {
    if ptr.is_null() {
        None
    } else {
        Some(CStr::from_ptr(ptr))
    }
}

fn block_or_null(result: Result<Block>) -> *mut c_void {
    match result {
        Ok(block) => block.into_raw(),
        Err(err) => {
            tracing::debug!(%err, "allocation failed, returning NULL");
            ptr::null_mut()
        }
    }
}

fn string_or_null(result: Result<Option<OwnedString>>) -> *mut c_char {
    match result {
        Ok(Some(string)) => string.into_raw(),
        Ok(None) => ptr::null_mut(),
        Err(err) => {
            tracing::debug!(%err, "string allocation failed, returning NULL");
            ptr::null_mut()
        }
    }
}

// ==================== 内存管理 ====================

/// 分配内存，失败返回 NULL，内容未初始化
#[no_mangle]
pub extern "C" fn sl_malloc(size: usize) -> *mut c_void {
    block_or_null(runtime().allocator().allocate(size, UNKNOWN_LOCATION))
}

/// 释放内存，NULL 安全
///
/// # Safety
/// `ptr` 必须为 NULL，或来自本运行时且尚未释放
#[no_mangle]
pub unsafe extern "C" fn sl_free(ptr: *mut c_void) {
    runtime()
        .allocator()
        .release(Block::from_raw(ptr), UNKNOWN_LOCATION);
}

/// 分配清零的数组，失败或溢出返回 NULL
#[no_mangle]
pub extern "C" fn sl_alloc_array(element_size: usize, count: usize) -> *mut c_void {
    block_or_null(
        runtime()
            .allocator()
            .allocate_array(element_size, count, UNKNOWN_LOCATION),
    )
}

// ==================== 打印 ====================

#[no_mangle]
pub extern "C" fn sl_print_int(value: c_int) {
    print::print_int(value);
}

#[no_mangle]
pub extern "C" fn sl_print_double(value: f64) {
    print::print_double(value);
}

/// NULL 时不输出
///
/// # Safety
/// `value` 必须为 NULL 或以 NUL 结尾的字符串
#[no_mangle]
pub unsafe extern "C" fn sl_print_string(value: *const c_char) {
    print::print_string(c_str_opt(value));
}

// ==================== 字符串 ====================

/// 复制字符串，NULL 输入返回 NULL
///
/// # Safety
/// `source` 必须为 NULL 或以 NUL 结尾的字符串
#[no_mangle]
pub unsafe extern "C" fn sl_alloc_string(source: *const c_char) -> *mut c_char {
    string_or_null(runtime().make_string(c_str_opt(source)))
}

/// 拼接字符串，总是返回新分配的字符串（或 NULL）
///
/// # Safety
/// 两个参数都必须为 NULL 或以 NUL 结尾的字符串
#[no_mangle]
pub unsafe extern "C" fn sl_concat_string(a: *const c_char, b: *const c_char) -> *mut c_char {
    string_or_null(runtime().concat(c_str_opt(a), c_str_opt(b)))
}

/// 比较字符串，相等返回 0
///
/// # Safety
/// 两个参数都必须为 NULL 或以 NUL 结尾的字符串
#[no_mangle]
pub unsafe extern "C" fn sl_compare_string(a: *const c_char, b: *const c_char) -> c_int {
    Runtime::compare(c_str_opt(a), c_str_opt(b))
}

// ==================== 调试内存 ====================

#[cfg(feature = "debug-memory")]
mod debug {
    use super::*;

    fn location<'a>(file: Option<&'a CStr>, line: c_int) -> (std::borrow::Cow<'a, str>, u32) {
        let file = file.map_or("<unknown>".into(), CStr::to_string_lossy);
        (file, u32::try_from(line).unwrap_or(0))
    }

    /// 带调用位置的分配
    ///
    /// # Safety
    /// `file` 必须为 NULL 或以 NUL 结尾的字符串
    #[no_mangle]
    pub unsafe extern "C" fn sl_debug_malloc(
        size: usize,
        file: *const c_char,
        line: c_int,
    ) -> *mut c_void {
        let (file, line) = location(c_str_opt(file), line);
        block_or_null(
            runtime()
                .allocator()
                .allocate(size, SourceLocation::new(&file, line)),
        )
    }

    /// 带调用位置的释放
    ///
    /// # Safety
    /// `ptr` 同 `sl_free`；`file` 必须为 NULL 或以 NUL 结尾的字符串
    #[no_mangle]
    pub unsafe extern "C" fn sl_debug_free(ptr: *mut c_void, file: *const c_char, line: c_int) {
        let (file, line) = location(c_str_opt(file), line);
        runtime()
            .allocator()
            .release(Block::from_raw(ptr), SourceLocation::new(&file, line));
    }

    /// 输出账本到 stderr
    #[no_mangle]
    pub extern "C" fn sl_print_memory_stats() {
        runtime().report_ledger();
    }
}

#[cfg(feature = "debug-memory")]
pub use debug::*;
