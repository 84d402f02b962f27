//! Tests for the exported sl_* C ABI
//!
//! 所有测试共享进程级 Runtime，用 serial_test 串行执行

use std::ffi::{c_char, CStr};
use std::ptr;

use serial_test::serial;
use staticlang_runtime::*;

fn read(ptr: *const c_char) -> &'static [u8] {
    assert!(!ptr.is_null());
    unsafe { CStr::from_ptr(ptr) }.to_bytes()
}

#[test]
#[serial]
fn test_malloc_free() {
    let ptr = sl_malloc(64);
    assert!(!ptr.is_null());
    unsafe {
        ptr::write_bytes(ptr.cast::<u8>(), 0x5A, 64);
        sl_free(ptr);
    }
}

#[test]
#[serial]
fn test_free_null_is_noop() {
    for _ in 0..5 {
        unsafe { sl_free(ptr::null_mut()) };
    }
}

#[test]
#[serial]
fn test_alloc_array_zeroed() {
    let ptr = sl_alloc_array(8, 32);
    assert!(!ptr.is_null());
    let bytes = unsafe { std::slice::from_raw_parts(ptr.cast::<u8>(), 256) };
    assert!(bytes.iter().all(|&b| b == 0));
    unsafe { sl_free(ptr) };
}

#[test]
#[serial]
fn test_alloc_array_overflow_returns_null() {
    assert!(sl_alloc_array(usize::MAX, 16).is_null());
}

#[test]
#[serial]
fn test_alloc_string() {
    unsafe {
        assert!(sl_alloc_string(ptr::null()).is_null());

        let src = c"hello";
        let a = sl_alloc_string(src.as_ptr());
        let b = sl_alloc_string(src.as_ptr());
        assert_eq!(read(a), b"hello");
        assert_ne!(a, b);
        assert_eq!(sl_compare_string(a, b), 0);
        assert_eq!(sl_compare_string(a, src.as_ptr()), 0);

        sl_free(a.cast());
        sl_free(b.cast());
    }
}

#[test]
#[serial]
fn test_concat_string() {
    unsafe {
        let foo = sl_alloc_string(c"foo".as_ptr());
        let bar = sl_alloc_string(c"bar".as_ptr());
        let joined = sl_concat_string(foo, bar);
        assert_eq!(read(joined), b"foobar");

        sl_free(foo.cast());
        sl_free(bar.cast());
        sl_free(joined.cast());
    }
}

#[test]
#[serial]
fn test_concat_string_null_operands() {
    unsafe {
        assert!(sl_concat_string(ptr::null(), ptr::null()).is_null());

        let a = sl_alloc_string(c"only".as_ptr());

        let left = sl_concat_string(a, ptr::null());
        assert_eq!(read(left), b"only");
        assert_ne!(left, a);

        let right = sl_concat_string(ptr::null(), a);
        assert_eq!(read(right), b"only");
        assert_ne!(right, a);

        sl_free(a.cast());
        sl_free(left.cast());
        sl_free(right.cast());
    }
}

#[test]
#[serial]
fn test_compare_string_nulls() {
    unsafe {
        assert_eq!(sl_compare_string(ptr::null(), ptr::null()), 0);
        assert_ne!(sl_compare_string(ptr::null(), c"x".as_ptr()), 0);
        assert_ne!(sl_compare_string(c"x".as_ptr(), ptr::null()), 0);
        assert!(sl_compare_string(c"a".as_ptr(), c"b".as_ptr()) < 0);
        assert!(sl_compare_string(c"b".as_ptr(), c"a".as_ptr()) > 0);
    }
}

#[test]
#[serial]
fn test_print_functions() {
    sl_print_int(42);
    sl_print_double(2.5);
    unsafe {
        sl_print_string(c"printed".as_ptr());
        sl_print_string(ptr::null());
    }
}

#[test]
#[serial]
fn test_strings_and_blocks_balance_ledger() {
    let rt = runtime();
    let before = rt.ledger();
    unsafe {
        let s = sl_alloc_string(c"abc".as_ptr());
        let block = sl_malloc(10);
        sl_free(block);
        sl_free(s.cast());
    }
    if let (Some(before), Some(after)) = (before, rt.ledger()) {
        assert_eq!(after.live_allocations, before.live_allocations);
        assert_eq!(after.cumulative_bytes, before.cumulative_bytes + 14);
    }
}

#[cfg(feature = "debug-memory")]
mod debug_memory {
    use super::*;

    #[test]
    #[serial]
    fn test_debug_malloc_free_updates_ledger() {
        let rt = runtime();
        assert!(rt.is_tracking());
        let before = rt.ledger().unwrap();

        unsafe {
            let a = sl_debug_malloc(16, c"main.sl".as_ptr(), 3);
            let b = sl_debug_malloc(32, ptr::null(), -1);
            assert!(!a.is_null() && !b.is_null());

            let mid = rt.ledger().unwrap();
            assert_eq!(mid.live_allocations, before.live_allocations + 2);
            assert_eq!(mid.cumulative_bytes, before.cumulative_bytes + 48);

            sl_debug_free(a, c"main.sl".as_ptr(), 10);
            sl_debug_free(ptr::null_mut(), c"main.sl".as_ptr(), 11);
            sl_debug_free(b, ptr::null(), 0);
        }

        let after = rt.ledger().unwrap();
        assert_eq!(after.live_allocations, before.live_allocations);
        sl_print_memory_stats();
        assert_eq!(rt.ledger().unwrap(), after);
    }
}

#[test]
fn test_header_declares_exported_symbols() {
    let header = std::fs::read_to_string(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/include/staticlang_runtime.h"
    ))
    .unwrap();
    for symbol in [
        "sl_malloc(",
        "sl_free(",
        "sl_alloc_array(",
        "sl_print_int(",
        "sl_print_double(",
        "sl_print_string(",
        "sl_alloc_string(",
        "sl_concat_string(",
        "sl_compare_string(",
        "sl_debug_malloc(",
        "sl_debug_free(",
        "sl_print_memory_stats(",
    ] {
        assert!(header.contains(symbol), "header is missing {symbol}");
    }
}
