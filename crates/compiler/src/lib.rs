//! A compiler front end and optimizer for a small statically-typed
//! imperative language (spec §1, §2).
//!
//! The pipeline is strictly one-directional: source text is parsed into
//! an [`ast::Program`], checked and simplified by [`typechecker`], lowered
//! to the load/store CFG of [`ir`] by [`translator`], optionally rewritten
//! into SSA form by [`ssa`], and rendered as textual IR by [`printer`].
//! No stage looks back at an earlier one's types.

pub mod ast;
pub mod builtins;
pub mod call_graph;
pub mod error;
pub mod ir;
pub mod lexer;
pub mod parser;
pub mod printer;
pub mod ssa;
pub mod translator;
pub mod typechecker;
pub mod types;

pub use error::CompileError;

/// Whether the SSA optimizer runs after translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptLevel {
    Full,
    NoOpts,
}

/// The result of a successful compilation: the checked AST (for
/// pretty-printing) alongside the emitted IR text.
#[derive(Debug)]
pub struct CompileOutput {
    pub checked: ast::Program,
    pub ir_text: String,
}

/// Runs the full pipeline over `source`, stopping at the first error
/// from any stage (spec §7: no recovery, no multi-error reporting).
pub fn compile(source: &str, opt_level: OptLevel) -> Result<CompileOutput, CompileError> {
    let mut parser = parser::Parser::new(source).map_err(|(line, msg)| CompileError::lexical(line, msg))?;
    let program = parser
        .parse_program()
        .map_err(|(line, msg)| CompileError::syntax(line, msg))?;
    let checked = typechecker::TypeChecker::new().check(program)?;
    let mut ir_program = translator::translate_program(&checked);
    if opt_level == OptLevel::Full {
        ssa::optimize_program(&mut ir_program);
    }
    let ir_text = printer::print_program(&ir_program);
    Ok(CompileOutput { checked, ir_text })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_a_minimal_program() {
        let out = compile("int main() { return 0; }", OptLevel::Full).unwrap();
        assert!(out.ir_text.contains("define i64 @main()"));
    }

    #[test]
    fn reports_undefined_variable_as_an_error() {
        let err = compile("int main() { return x; }", OptLevel::Full).unwrap_err();
        assert!(matches!(err, CompileError::Resolution { .. }));
    }

    #[test]
    fn noopts_skips_constant_folding() {
        let src = "int main() { int a = 2; int b = 2; return a + b; }";
        let full = compile(src, OptLevel::Full).unwrap();
        let noopts = compile(src, OptLevel::NoOpts).unwrap();
        assert!(full.ir_text.contains("ret i64 4"));
        assert!(!noopts.ir_text.contains("ret i64 4"));
    }
}
