//! Command-line front end (spec §6).
//!
//! ```text
//! latc < source.lat            # pretty-print the checked AST, "OK" header
//! latc c < source.lat          # emit LLVM IR to stdout
//! latc c noopts < source.lat   # emit LLVM IR, optimizer disabled
//! ```
//!
//! Any compile error prints `ERROR` followed by the message to stderr and
//! exits 1; success exits 0.

use latc::{CompileError, OptLevel};
use std::io::Read;
use std::process::ExitCode;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut source = String::new();
    if std::io::stdin().read_to_string(&mut source).is_err() {
        eprintln!("ERROR\ncould not read source from stdin");
        return ExitCode::FAILURE;
    }

    let emit_ir = args.first().map(String::as_str) == Some("c");
    let opt_level = if args.get(1).map(String::as_str) == Some("noopts") {
        OptLevel::NoOpts
    } else {
        OptLevel::Full
    };

    match latc::compile(&source, opt_level) {
        Ok(out) => {
            if emit_ir {
                print!("{}", out.ir_text);
            } else {
                eprintln!("OK");
                println!("{:#?}", out.checked);
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            report_error(&err);
            ExitCode::FAILURE
        }
    }
}

fn report_error(err: &CompileError) {
    eprintln!("ERROR");
    eprintln!("{err}");
}
