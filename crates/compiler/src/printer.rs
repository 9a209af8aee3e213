//! Textual LLVM-dialect IR emission (spec §6).
//!
//! Pure formatting: no further analysis happens here. Every pointer
//! prints as opaque `ptr`; blocks print a `; preds: ...` comment when
//! they have any (spec §6 "IR text format").

use crate::ir::{BasicBlock, GlobalString, Instr, IrFunction, IrProgram, MemType, Value};
use crate::types::Type;
use std::fmt::Write;

fn llvm_ty(ty: &Type) -> String {
    match ty {
        Type::Int => "i64".to_string(),
        Type::Bool => "i1".to_string(),
        Type::Void => "void".to_string(),
        Type::String => "ptr".to_string(),
        Type::Array(_) => "ptr".to_string(),
    }
}

fn llvm_mem_ty(ty: &MemType) -> String {
    match ty {
        MemType::Ptr => "ptr".to_string(),
        MemType::Value(t) => llvm_ty(t),
    }
}

/// Escapes a string constant the way LLVM's `@G` globals are spelled:
/// `\n` and `"` escaped as `\0A`/`\22`, trailing `\00` for the NUL.
fn escape_string(s: &str) -> String {
    let mut out = String::new();
    for b in s.bytes() {
        match b {
            b'\n' => out.push_str("\\0A"),
            b'"' => out.push_str("\\22"),
            b'\\' => out.push_str("\\5C"),
            0x20..=0x7e => out.push(b as char),
            _ => {
                let _ = write!(out, "\\{b:02X}");
            }
        }
    }
    out.push_str("\\00");
    out
}

fn print_global(g: &GlobalString) -> String {
    let len = g.value.len() + 1;
    format!(
        "{} = private unnamed_addr constant [{} x i8] c\"{}\"\n",
        g.name,
        len,
        escape_string(&g.value)
    )
}

fn print_value(v: &Value) -> String {
    v.to_string()
}

fn print_instr(instr: &Instr) -> String {
    match instr {
        Instr::BinOp { dest, op, ty, lhs, rhs } => {
            format!("  {dest} = {op} {} {}, {}", llvm_ty(ty), print_value(lhs), print_value(rhs))
        }
        Instr::Call { dest, ret, callee, args } => {
            let arglist = args
                .iter()
                .map(|(ty, v)| format!("{} {}", llvm_ty(ty), print_value(v)))
                .collect::<Vec<_>>()
                .join(", ");
            match dest {
                Some(d) => format!("  {d} = call {} @{callee}({arglist})", llvm_ty(ret)),
                None => format!("  call {} @{callee}({arglist})", llvm_ty(ret)),
            }
        }
        Instr::Alloc { dest, ty, .. } => {
            format!("  {dest} = alloca {}", llvm_mem_ty(ty))
        }
        Instr::AllocArray { dest, elem_ty, count, .. } => {
            format!("  {dest} = alloca {}, i64 {}", llvm_ty(elem_ty), print_value(count))
        }
        Instr::Load { dest, ty, addr, .. } => {
            format!("  {dest} = load {}, ptr {}", llvm_mem_ty(ty), print_value(addr))
        }
        Instr::Store { ty, value, addr, .. } => {
            format!("  store {} {}, ptr {}", llvm_mem_ty(ty), print_value(value), print_value(addr))
        }
        Instr::Gep { dest, base_ty, base, indices } => {
            let idxs = indices
                .iter()
                .map(|i| format!("{} {}", llvm_ty(&i.ty), print_value(&i.index)))
                .collect::<Vec<_>>()
                .join(", ");
            format!("  {dest} = getelementptr {}, ptr {}, {idxs}", llvm_ty(base_ty), print_value(base))
        }
        Instr::GetGlobal { dest, global, len } => {
            format!("  {dest} = getelementptr [{len} x i8], ptr {global}, i64 0, i64 0")
        }
        Instr::Branch { target } => format!("  br label %{target}"),
        Instr::CondBranch { cond, then_label, else_label } => {
            format!("  br i1 {}, label %{then_label}, label %{else_label}", print_value(cond))
        }
        Instr::Phi { dest, ty, incoming } => {
            let pairs = incoming
                .iter()
                .map(|(v, label)| format!("[ {}, %{label} ]", print_value(v)))
                .collect::<Vec<_>>()
                .join(", ");
            format!("  {dest} = phi {} {pairs}", llvm_ty(ty))
        }
        Instr::Assign { dest, value } => format!("  ; assign {dest} = {}", print_value(value)),
        Instr::Return { ty, value } => format!("  ret {} {}", llvm_ty(ty), print_value(value)),
        Instr::VoidReturn => "  ret void".to_string(),
    }
}

fn print_block(block: &BasicBlock) -> String {
    let mut out = String::new();
    if !block.preds.is_empty() {
        let _ = writeln!(out, "; preds: {}", block.preds.join(", "));
    }
    let _ = writeln!(out, "{}:", block.label);
    for instr in &block.instrs {
        let _ = writeln!(out, "{}", print_instr(instr));
    }
    out
}

fn print_function(f: &IrFunction) -> String {
    let params = f
        .params
        .iter()
        .map(|p| format!("{} {}", llvm_ty(&p.ty), p.name))
        .collect::<Vec<_>>()
        .join(", ");
    let mut out = String::new();
    let _ = writeln!(out, "define {} @{}({params}) {{", llvm_ty(&f.ret), f.name);
    for block in &f.blocks {
        out.push_str(&print_block(block));
    }
    let _ = writeln!(out, "}}");
    out
}

/// `declare` text for every runtime-provided function, keyed by its
/// (already `$`-stripped) name.
fn runtime_decl(name: &str) -> Option<&'static str> {
    Some(match name {
        "printInt" => "declare void @printInt(i64)",
        "printString" => "declare void @printString(ptr)",
        "readInt" => "declare i64 @readInt()",
        "readString" => "declare ptr @readString()",
        "error" => "declare void @error()",
        "_addStrings" => "declare ptr @_addStrings(ptr, ptr)",
        "_compareStrings" => "declare i1 @_compareStrings(i64, ptr, ptr)",
        _ => return None,
    })
}

/// Renders a whole program as textual IR: runtime declarations for only
/// the builtins that survived reachability pruning (spec §4.2), then
/// string-constant globals, then each function definition in order.
pub fn print_program(program: &IrProgram) -> String {
    let mut out = String::new();
    for name in &program.externs {
        if let Some(decl) = runtime_decl(name) {
            let _ = writeln!(out, "{decl}");
        }
    }
    out.push('\n');
    for g in &program.globals {
        out.push_str(&print_global(g));
    }
    out.push('\n');
    for f in &program.functions {
        out.push_str(&print_function(f));
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use crate::ssa::optimize_program;
    use crate::translator::translate_program;
    use crate::typechecker::TypeChecker;

    fn emitted(src: &str) -> String {
        let program = Parser::new(src).unwrap().parse_program().unwrap();
        let checked = TypeChecker::new().check(program).unwrap();
        let mut ir = translate_program(&checked);
        optimize_program(&mut ir);
        print_program(&ir)
    }

    #[test]
    fn emits_a_define_for_main() {
        let text = emitted("int main() { return 0; }");
        assert!(text.contains("define i64 @main()"));
        assert!(text.contains("ret i64 0"));
    }

    #[test]
    fn escapes_newline_in_string_globals() {
        let text = emitted(r#"int main() { printString("a\nb"); return 0; }"#);
        assert!(text.contains("\\0A"));
    }

    #[test]
    fn preds_comment_appears_on_join_blocks() {
        let text = emitted("int main() { int x = 0; if (x < 1) { x = 1; } else { x = 2; } return x; }");
        assert!(text.contains("; preds:"));
    }
}
