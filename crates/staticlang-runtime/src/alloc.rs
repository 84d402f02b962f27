//! Allocator strategies
//!
//! 所有堆块都来自宿主 C 分配器（malloc / calloc / free），这样
//! `sl_alloc_string` 返回的字符串也可以直接交给 `sl_free` 释放。
//!
//! 两种策略实现同一个 `Allocator` trait：
//! - `SystemAllocator`: 直接转发给宿主分配器
//! - `TrackingAllocator`: 包装另一个分配器，维护账本并输出诊断行

use std::ffi::c_void;
use std::fmt;
use std::io::{self, Write};
use std::panic::Location;
use std::ptr::NonNull;
use std::sync::Mutex;

use crate::error::{AllocError, Result};
use crate::ledger::Ledger;

// ==================== 堆块 ====================

/// 分配得到的堆块，持有者独占，直到显式释放
///
/// 不实现 `Copy`：释放会消耗这个值。
#[derive(Debug, PartialEq, Eq)]
pub struct Block(NonNull<u8>);

impl Block {
    #[inline]
    pub fn as_ptr(&self) -> *mut u8 {
        self.0.as_ptr()
    }

    /// 把所有权交给 C 调用方
    #[inline]
    pub fn into_raw(self) -> *mut c_void {
        self.0.as_ptr().cast()
    }

    /// 从 C 指针恢复所有权，NULL 得到 `None`
    ///
    /// # Safety
    /// 非空指针必须来自同一宿主分配器且尚未释放
    #[inline]
    pub unsafe fn from_raw(ptr: *mut c_void) -> Option<Self> {
        NonNull::new(ptr.cast()).map(Block)
    }
}

// ==================== 调用位置 ====================

/// 分配/释放的调用位置（对应 C 的 __FILE__ / __LINE__）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation<'a> {
    pub file: &'a str,
    pub line: u32,
}

impl<'a> SourceLocation<'a> {
    pub fn new(file: &'a str, line: u32) -> Self {
        Self { file, line }
    }
}

impl SourceLocation<'static> {
    #[track_caller]
    pub fn caller() -> Self {
        let location = Location::caller();
        Self {
            file: location.file(),
            line: location.line(),
        }
    }
}

impl fmt::Display for SourceLocation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

// ==================== 分配器接口 ====================

pub trait Allocator: Send + Sync {
    /// 分配 `size` 字节，不清零
    fn allocate(&self, size: usize, location: SourceLocation<'_>) -> Result<Block>;

    /// 分配 `element_size * count` 字节并清零
    fn allocate_array(
        &self,
        element_size: usize,
        count: usize,
        location: SourceLocation<'_>,
    ) -> Result<Block>;

    /// 释放堆块，`None` 时什么都不做
    fn release(&self, block: Option<Block>, location: SourceLocation<'_>);

    /// 调试账本，普通分配器没有
    fn ledger(&self) -> Option<&Ledger> {
        None
    }

    /// 把账本写到诊断流
    fn report(&self) {}
}

/// 宿主分配器
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemAllocator;

impl Allocator for SystemAllocator {
    fn allocate(&self, size: usize, _location: SourceLocation<'_>) -> Result<Block> {
        let ptr = unsafe { libc::malloc(size) };
        NonNull::new(ptr.cast())
            .map(Block)
            .ok_or(AllocError::OutOfMemory { size })
    }

    fn allocate_array(
        &self,
        element_size: usize,
        count: usize,
        _location: SourceLocation<'_>,
    ) -> Result<Block> {
        let size = element_size
            .checked_mul(count)
            .ok_or(AllocError::SizeOverflow {
                element_size,
                count,
            })?;
        let ptr = unsafe { libc::calloc(count, element_size) };
        NonNull::new(ptr.cast())
            .map(Block)
            .ok_or(AllocError::OutOfMemory { size })
    }

    fn release(&self, block: Option<Block>, _location: SourceLocation<'_>) {
        if let Some(block) = block {
            unsafe { libc::free(block.into_raw()) };
        }
    }
}

// ==================== 调试分配器 ====================

/// 带账本的分配器
///
/// 每次成功分配输出 `ALLOC: <size> bytes at <addr> (<file>:<line>)`，
/// 每次释放非空块输出 `FREE: <addr> (<file>:<line>)`。
/// 默认写到 stderr。
pub struct TrackingAllocator<A = SystemAllocator> {
    inner: A,
    ledger: Ledger,
    writer: Mutex<Box<dyn Write + Send>>,
}

impl TrackingAllocator<SystemAllocator> {
    pub fn new() -> Self {
        Self::with_writer(SystemAllocator, io::stderr())
    }
}

impl Default for TrackingAllocator<SystemAllocator> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Allocator> TrackingAllocator<A> {
    pub fn with_writer(inner: A, writer: impl Write + Send + 'static) -> Self {
        Self {
            inner,
            ledger: Ledger::new(),
            writer: Mutex::new(Box::new(writer)),
        }
    }

    /// 写一行诊断信息，写入失败直接忽略
    fn emit(&self, args: fmt::Arguments<'_>) {
        let mut writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        let _ = writer.write_fmt(args).and_then(|_| writer.write_all(b"\n"));
        let _ = writer.flush();
    }

    fn track(&self, size: usize, block: &Block, location: SourceLocation<'_>) {
        self.ledger.record_alloc(size);
        tracing::trace!(size, addr = ?block.as_ptr(), %location, "tracked allocation");
        self.emit(format_args!(
            "ALLOC: {} bytes at {:p} ({})",
            size,
            block.as_ptr(),
            location
        ));
    }
}

impl<A: Allocator> Allocator for TrackingAllocator<A> {
    fn allocate(&self, size: usize, location: SourceLocation<'_>) -> Result<Block> {
        let block = self.inner.allocate(size, location)?;
        self.track(size, &block, location);
        Ok(block)
    }

    fn allocate_array(
        &self,
        element_size: usize,
        count: usize,
        location: SourceLocation<'_>,
    ) -> Result<Block> {
        let block = self.inner.allocate_array(element_size, count, location)?;
        // 内层分配成功说明乘法没有溢出
        self.track(element_size * count, &block, location);
        Ok(block)
    }

    fn release(&self, block: Option<Block>, location: SourceLocation<'_>) {
        let Some(block) = block else {
            return;
        };
        let live = self.ledger.record_free();
        tracing::trace!(addr = ?block.as_ptr(), %location, live, "tracked release");
        self.emit(format_args!("FREE: {:p} ({})", block.as_ptr(), location));
        self.inner.release(Some(block), location);
    }

    fn ledger(&self) -> Option<&Ledger> {
        Some(&self.ledger)
    }

    fn report(&self) {
        self.emit(format_args!("{}", self.ledger.snapshot()));
    }
}

impl<A> fmt::Debug for TrackingAllocator<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackingAllocator")
            .field("ledger", &self.ledger.snapshot())
            .finish_non_exhaustive()
    }
}
