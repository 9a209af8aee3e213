//! The two internal runtime helpers the translator emits calls to for
//! string `+` and string comparisons (spec §4.3, §6).

use std::ffi::{CStr, CString};
use std::os::raw::c_char;

/// `i8* _addStrings(i8*, i8*)` — string concatenation, backing `+` on
/// two `string` operands.
///
/// # Safety
/// Both arguments must be valid, null-terminated, UTF-8 C strings.
#[unsafe(no_mangle)]
#[allow(non_snake_case)]
pub unsafe extern "C" fn _addStrings(a: *const c_char, b: *const c_char) -> *mut c_char {
    let a = unsafe { CStr::from_ptr(a) }.to_bytes();
    let b = unsafe { CStr::from_ptr(b) }.to_bytes();
    let mut combined = Vec::with_capacity(a.len() + b.len());
    combined.extend_from_slice(a);
    combined.extend_from_slice(b);
    CString::new(combined)
        .unwrap_or_else(|_| CString::new("").unwrap())
        .into_raw()
}

/// `i1 _compareStrings(i64 op_id, i8*, i8*)` — backs `==, !=, <, <=, >, >=`
/// on two `string` operands. `op_id` is the zero-based position of the
/// operator in `[==, !=, <, <=, >, >=]`, matching the translator's
/// `COMP_OP_IDS` convention.
///
/// # Safety
/// Both string arguments must be valid, null-terminated, UTF-8 C strings.
#[unsafe(no_mangle)]
#[allow(non_snake_case)]
pub unsafe extern "C" fn _compareStrings(
    op_id: i64,
    a: *const c_char,
    b: *const c_char,
) -> bool {
    let a = unsafe { CStr::from_ptr(a) }.to_bytes();
    let b = unsafe { CStr::from_ptr(b) }.to_bytes();
    match op_id {
        0 => a == b,
        1 => a != b,
        2 => a < b,
        3 => a <= b,
        4 => a > b,
        5 => a >= b,
        _ => unreachable!("invalid string comparison op_id {op_id}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cstr(s: &str) -> CString {
        CString::new(s).unwrap()
    }

    #[test]
    fn add_strings_concatenates() {
        let a = cstr("foo");
        let b = cstr("bar");
        unsafe {
            let result = _addStrings(a.as_ptr(), b.as_ptr());
            let s = CStr::from_ptr(result).to_str().unwrap();
            assert_eq!(s, "foobar");
            drop(CString::from_raw(result));
        }
    }

    #[test]
    fn compare_strings_all_operators() {
        let a = cstr("abc");
        let b = cstr("abd");
        unsafe {
            assert!(!_compareStrings(0, a.as_ptr(), b.as_ptr())); // ==
            assert!(_compareStrings(1, a.as_ptr(), b.as_ptr())); // !=
            assert!(_compareStrings(2, a.as_ptr(), b.as_ptr())); // <
            assert!(_compareStrings(3, a.as_ptr(), b.as_ptr())); // <=
            assert!(!_compareStrings(4, a.as_ptr(), b.as_ptr())); // >
            assert!(!_compareStrings(5, a.as_ptr(), b.as_ptr())); // >=
        }
    }
}
