//! Runtime context
//!
//! `Runtime` 持有一个分配策略，在构造时选择（普通或调试），
//! 而不是在编译时选择。多个 Runtime 互不干扰，各自有自己的账本。

use std::fmt;
use std::io::Write;

use crate::alloc::{Allocator, Block, SourceLocation, SystemAllocator, TrackingAllocator};
use crate::config::RuntimeConfig;
use crate::error::Result;
use crate::ledger::LedgerSnapshot;

pub struct Runtime {
    allocator: Box<dyn Allocator>,
}

impl Runtime {
    /// 普通分配器
    pub fn plain() -> Self {
        Self::with_allocator(SystemAllocator)
    }

    /// 调试分配器，诊断输出到 stderr
    pub fn tracked() -> Self {
        Self::with_allocator(TrackingAllocator::new())
    }

    /// 调试分配器，诊断输出到指定写入器
    pub fn tracked_with_writer(writer: impl Write + Send + 'static) -> Self {
        Self::with_allocator(TrackingAllocator::with_writer(SystemAllocator, writer))
    }

    pub fn with_allocator(allocator: impl Allocator + 'static) -> Self {
        Self {
            allocator: Box::new(allocator),
        }
    }

    pub fn from_config(config: &RuntimeConfig) -> Self {
        tracing::debug!(debug_memory = config.debug_memory, "creating runtime");
        if config.debug_memory {
            Self::tracked()
        } else {
            Self::plain()
        }
    }

    pub fn allocator(&self) -> &dyn Allocator {
        self.allocator.as_ref()
    }

    pub fn is_tracking(&self) -> bool {
        self.allocator.ledger().is_some()
    }

    // ==================== 分配 ====================

    #[track_caller]
    pub fn try_allocate(&self, size: usize) -> Result<Block> {
        self.allocator.allocate(size, SourceLocation::caller())
    }

    #[track_caller]
    pub fn try_allocate_array(&self, element_size: usize, count: usize) -> Result<Block> {
        self.allocator
            .allocate_array(element_size, count, SourceLocation::caller())
    }

    /// 分配失败时返回 `None`，调用方必须检查
    #[track_caller]
    pub fn allocate(&self, size: usize) -> Option<Block> {
        self.try_allocate(size)
            .map_err(|err| tracing::debug!(%err, "allocation failed"))
            .ok()
    }

    /// 分配清零的数组，失败或溢出时返回 `None`
    #[track_caller]
    pub fn allocate_array(&self, element_size: usize, count: usize) -> Option<Block> {
        self.try_allocate_array(element_size, count)
            .map_err(|err| tracing::debug!(%err, "array allocation failed"))
            .ok()
    }

    /// 释放堆块，`None` 总是安全的
    #[track_caller]
    pub fn release(&self, block: Option<Block>) {
        self.allocator.release(block, SourceLocation::caller());
    }

    // ==================== 账本 ====================

    pub fn ledger(&self) -> Option<LedgerSnapshot> {
        self.allocator.ledger().map(|ledger| ledger.snapshot())
    }

    /// 把账本写到诊断流，只读
    pub fn report_ledger(&self) {
        self.allocator.report();
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("ledger", &self.ledger())
            .finish()
    }
}
