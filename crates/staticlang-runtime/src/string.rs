//! StaticLang owned strings
//!
//! OwnedString 是一个以 NUL 结尾的堆块：
//! - 由 `make_string` / `concat` 创建，所有权交给调用方
//! - 只能释放一次：`Runtime::release_string` 会消耗它
//! - 不做编码校验，内容就是原始字节
//!
//! 缺失的字符串用 `Option<&CStr>` 表示，和空字符串区分开。

use std::cmp::Ordering;
use std::ffi::{c_char, CStr};
use std::fmt;
use std::ops::Deref;

use crate::alloc::Block;
use crate::error::Result;
use crate::runtime::Runtime;

/// 内存布局:
/// ```text
/// +----------------------+----+
/// | bytes (len)          | \0 |
/// +----------------------+----+
/// ```
#[must_use = "owned strings must be released with Runtime::release_string"]
pub struct OwnedString {
    block: Block,
    len: usize,
}

impl OwnedString {
    /// 不含结尾 NUL 的字节数
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_ptr(&self) -> *const c_char {
        self.block.as_ptr().cast()
    }

    pub fn as_c_str(&self) -> &CStr {
        unsafe {
            let bytes = std::slice::from_raw_parts(self.block.as_ptr(), self.len + 1);
            CStr::from_bytes_with_nul_unchecked(bytes)
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.as_c_str().to_bytes()
    }

    /// 把所有权交给 C 调用方，之后必须用 `sl_free` 释放
    pub fn into_raw(self) -> *mut c_char {
        self.block.into_raw().cast()
    }

    /// 从 C 字符串恢复所有权，NULL 得到 `None`
    ///
    /// # Safety
    /// 非空指针必须是由同一宿主分配器分配、以 NUL 结尾且尚未释放的字符串
    pub unsafe fn from_raw(ptr: *mut c_char) -> Option<Self> {
        let block = Block::from_raw(ptr.cast())?;
        let len = CStr::from_ptr(ptr).to_bytes().len();
        Some(Self { block, len })
    }

    pub(crate) fn into_block(self) -> Block {
        self.block
    }
}

impl Deref for OwnedString {
    type Target = CStr;

    fn deref(&self) -> &CStr {
        self.as_c_str()
    }
}

impl AsRef<CStr> for OwnedString {
    fn as_ref(&self) -> &CStr {
        self.as_c_str()
    }
}

impl fmt::Debug for OwnedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnedString")
            .field("ptr", &self.as_ptr())
            .field("value", &self.as_c_str())
            .finish()
    }
}

// ==================== 字符串操作 ====================

impl Runtime {
    /// 复制字符串
    ///
    /// `None` 返回 `Ok(None)`，不会凭空造出空字符串。
    /// 否则分配正好 `len + 1` 字节。
    #[track_caller]
    pub fn make_string(&self, source: Option<&CStr>) -> Result<Option<OwnedString>> {
        match source {
            Some(source) => self.alloc_joined(&[source.to_bytes()]).map(Some),
            None => Ok(None),
        }
    }

    /// 拼接字符串，总是返回新分配的块
    ///
    /// - 两个都是 `None`: 返回 `None`
    /// - 只有一个 `None`: 返回另一个的独立副本
    /// - 都存在: 一次分配 `len(a) + len(b) + 1` 字节
    #[track_caller]
    pub fn concat(&self, a: Option<&CStr>, b: Option<&CStr>) -> Result<Option<OwnedString>> {
        match (a, b) {
            (None, None) => Ok(None),
            (Some(only), None) | (None, Some(only)) => self.make_string(Some(only)),
            (Some(a), Some(b)) => self.alloc_joined(&[a.to_bytes(), b.to_bytes()]).map(Some),
        }
    }

    /// 比较字符串，0 表示相等
    ///
    /// 两个都是 `None` 视为相等；只有一个 `None` 时返回 1。
    /// 都存在时按无符号字节字典序比较，返回 -1 / 0 / 1。
    pub fn compare(a: Option<&CStr>, b: Option<&CStr>) -> i32 {
        match (a, b) {
            (None, None) => 0,
            (None, Some(_)) | (Some(_), None) => 1,
            (Some(a), Some(b)) => match a.to_bytes().cmp(b.to_bytes()) {
                Ordering::Less => -1,
                Ordering::Equal => 0,
                Ordering::Greater => 1,
            },
        }
    }

    #[track_caller]
    pub fn release_string(&self, string: OwnedString) {
        self.release(Some(string.into_block()));
    }

    #[track_caller]
    fn alloc_joined(&self, parts: &[&[u8]]) -> Result<OwnedString> {
        let len: usize = parts.iter().map(|part| part.len()).sum();
        let block = self.try_allocate(len + 1)?;

        let mut dst = block.as_ptr();
        for part in parts {
            unsafe {
                std::ptr::copy_nonoverlapping(part.as_ptr(), dst, part.len());
                dst = dst.add(part.len());
            }
        }
        unsafe { dst.write(0) };

        Ok(OwnedString { block, len })
    }
}

// ==================== 测试 ====================
