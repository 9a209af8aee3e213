//! Runtime support linked against the LLVM IR emitted by `latc`.
//!
//! The compiler never calls into this crate directly: it only emits
//! `declare` lines for the symbols below and `call` instructions that
//! reference them. This crate exists so the generated `.ll` module is
//! linkable and testable end to end with `clang`.
//!
//! # Modules
//!
//! - `io`: the five public entry points (`printInt`, `printString`,
//!   `readInt`, `readString`, `error`).
//! - `string_ops`: the two internal helpers the translator emits calls to
//!   for string `+` and string comparisons (`_addStrings`, `_compareStrings`).

#![allow(non_snake_case)]

pub mod io;
pub mod string_ops;

pub use io::{error, printInt, printString, readInt, readString};
pub use string_ops::{_addStrings, _compareStrings};
