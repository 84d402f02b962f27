//! Allocation ledger for the tracking allocator
//!
//! 账本记录两项数据：
//! - `cumulative_bytes`: 累计分配的字节数（只增不减）
//! - `live_allocations`: 当前存活的分配数量，释放时减一
//!
//! 存活数量是有符号的：变成负数说明出现了重复释放或释放了未追踪的块。

use std::fmt;
use std::sync::atomic::{AtomicIsize, AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub struct Ledger {
    cumulative_bytes: AtomicUsize,
    live_allocations: AtomicIsize,
}

/// 账本的只读快照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LedgerSnapshot {
    pub cumulative_bytes: usize,
    pub live_allocations: isize,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一次成功的分配
    pub(crate) fn record_alloc(&self, size: usize) {
        self.cumulative_bytes.fetch_add(size, Ordering::Relaxed);
        self.live_allocations.fetch_add(1, Ordering::Relaxed);
    }

    /// 记录一次释放，返回释放后的存活数量
    pub(crate) fn record_free(&self) -> isize {
        let live = self.live_allocations.fetch_sub(1, Ordering::Relaxed) - 1;
        if live < 0 {
            tracing::warn!(live, "allocation ledger went negative (double free or untracked block)");
        }
        live
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            cumulative_bytes: self.cumulative_bytes.load(Ordering::Relaxed),
            live_allocations: self.live_allocations.load(Ordering::Relaxed),
        }
    }
}

impl LedgerSnapshot {
    pub fn is_balanced(&self) -> bool {
        self.live_allocations == 0
    }
}

impl fmt::Display for LedgerSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Memory Stats - Allocated: {} bytes, Active allocations: {}",
            self.cumulative_bytes, self.live_allocations
        )
    }
}
