//! The five public runtime entry points declared by spec in §6.
//!
//! These functions are exported with C ABI for the generated LLVM IR to
//! call directly.
//!
//! # Safety Contract
//!
//! These functions are designed to be called ONLY by compiler-generated
//! code, never directly from arbitrary C code:
//!
//! - `printString` and `_addStrings`'s callers must pass a valid,
//!   null-terminated, UTF-8 C string.
//! - `readString`'s caller owns the returned buffer and must not free it
//!   with anything other than the allocator `CString` used (the compiler
//!   never frees strings; they live for the process lifetime, matching
//!   the pooled/leaked string model described in spec §3).

use std::ffi::{CStr, CString};
use std::io::{self, Write};
use std::os::raw::c_char;

/// `void printInt(i64)` — write a decimal integer followed by a newline.
#[unsafe(no_mangle)]
pub extern "C" fn printInt(value: i64) {
    println!("{value}");
}

/// `void printString(i8*)` — write a string followed by a newline.
///
/// # Safety
/// `s` must be a valid, null-terminated, UTF-8 C string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn printString(s: *const c_char) {
    let s = unsafe { CStr::from_ptr(s) };
    let mut stdout = io::stdout();
    let _ = stdout.write_all(s.to_bytes());
    let _ = stdout.write_all(b"\n");
}

/// `i64 readInt()` — read a whitespace-delimited integer from stdin.
///
/// Aborts the process via [`error`] if stdin does not contain a valid
/// integer, matching the "runtime abort" contract described in spec §7.
#[unsafe(no_mangle)]
pub extern "C" fn readInt() -> i64 {
    let mut line = String::new();
    if io::stdin().read_line(&mut line).is_err() {
        error();
    }
    match line.trim().parse() {
        Ok(n) => n,
        Err(_) => error(),
    }
}

/// `i8* readString()` — read one line from stdin (without the trailing
/// newline), returned as a process-lifetime C string.
#[unsafe(no_mangle)]
pub extern "C" fn readString() -> *mut c_char {
    let mut line = String::new();
    if io::stdin().read_line(&mut line).is_err() {
        error();
    }
    let trimmed = line.trim_end_matches(['\n', '\r']);
    CString::new(trimmed)
        .unwrap_or_else(|_| CString::new("").unwrap())
        .into_raw()
}

/// `void error()` — the compiled program's abort mechanism: print a
/// diagnostic and exit with a non-zero status. Never called by the
/// compiler itself (only by code it generates, or transitively here when
/// a built-in runtime call detects malformed input).
#[unsafe(no_mangle)]
pub extern "C" fn error() -> ! {
    eprintln!("runtime error");
    std::process::exit(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    #[test]
    fn print_string_roundtrips_through_cstr() {
        let s = CString::new("hello").unwrap();
        unsafe {
            printString(s.as_ptr());
        }
    }

    #[test]
    fn print_int_does_not_panic() {
        printInt(-42);
        printInt(0);
    }
}
