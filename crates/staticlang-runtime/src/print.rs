//! StaticLang 打印模块
//!
//! - `write_*`: 写到任意 `io::Write`，格式与 C 的 printf 一致
//! - `print_*`: 写到 stdout，每个值后跟换行
//!
//! 打印没有失败信号，stdout 写入错误只记录日志。

use std::ffi::CStr;
use std::io::{self, Write};

// ==================== 格式化 ====================

/// 整数，等同于 `%d\n`
pub fn write_int<W: Write + ?Sized>(w: &mut W, value: i32) -> io::Result<()> {
    writeln!(w, "{}", value)
}

/// 浮点数，等同于 `%f\n`（六位小数）
pub fn write_double<W: Write + ?Sized>(w: &mut W, value: f64) -> io::Result<()> {
    if value.is_nan() {
        let text = if value.is_sign_negative() { "-nan" } else { "nan" };
        writeln!(w, "{}", text)
    } else {
        // 无穷大在 Rust 中同样输出 inf / -inf
        writeln!(w, "{:.6}", value)
    }
}

/// 字符串原样输出字节；`None` 什么都不写
pub fn write_string<W: Write + ?Sized>(w: &mut W, value: Option<&CStr>) -> io::Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    w.write_all(value.to_bytes())?;
    w.write_all(b"\n")
}

// ==================== stdout ====================

fn with_stdout(f: impl FnOnce(&mut io::StdoutLock<'_>) -> io::Result<()>) {
    let mut out = io::stdout().lock();
    if let Err(err) = f(&mut out) {
        tracing::debug!(%err, "failed to write to stdout");
    }
}

pub fn print_int(value: i32) {
    with_stdout(|out| write_int(out, value));
}

pub fn print_double(value: f64) {
    with_stdout(|out| write_double(out, value));
}

pub fn print_string(value: Option<&CStr>) {
    if value.is_some() {
        with_stdout(|out| write_string(out, value));
    }
}
