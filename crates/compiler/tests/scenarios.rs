//! End-to-end pipeline scenarios (spec §8 testable properties S1-S6).
//!
//! Each test compiles a whole program through [`latc::compile`] and
//! inspects the emitted text, rather than poking at an individual
//! pipeline stage.

use latc::{CompileError, OptLevel};

fn emit(src: &str) -> String {
    latc::compile(src, OptLevel::Full).unwrap().ir_text
}

#[test]
fn s1_constant_arithmetic_folds_to_a_literal_return() {
    let ir = emit("int main() { return 2 + 3 * 4; }");
    let main = extract_function(&ir, "main");
    assert!(main.contains("ret i64 14"));
    assert!(!main.contains("add"));
    assert!(!main.contains("mul"));
}

#[test]
fn s2_while_true_with_break_via_return_builds_a_loop_phi() {
    let ir = emit(
        "int main() { int x = 0; while (true) { x = x + 1; if (x == 10) return x; } }",
    );
    let main = extract_function(&ir, "main");
    assert!(main.contains("phi i64"));
    assert!(main.contains("icmp eq"));
    assert!(main.contains("ret i64"));
}

#[test]
fn s3_string_concat_of_non_constants_calls_the_runtime_helper() {
    // The literal scenario in the source material concatenates two
    // string constants, which constant-folds away at check time per the
    // expression typing table (spec §4.2) — nothing is left to emit a
    // runtime call for. Using a parameter keeps the operands non-constant
    // so the `$addStrings` lowering is actually exercised end to end.
    let ir = emit(
        r#"string greet(string name) { return "hi " + name; } int main() { printString(greet("!")); return 0; }"#,
    );
    assert!(ir.contains("@_addStrings"));
    assert!(ir.contains("call void @printString"));
    assert!(!ir.contains("@readInt"));
    assert!(!ir.contains("@readString"));
}

#[test]
fn s4_array_loads_are_noopt_and_survive_to_the_final_add() {
    let ir = emit(
        "int main() { int[] a = new int[3]; a[0] = 7; return a[0] + a.length; }",
    );
    let main = extract_function(&ir, "main");
    assert!(main.contains("alloca i64, i64 3"));
    assert!(main.contains("getelementptr"));
    // The two array loads aren't constant-folded away: the sum is still
    // a live `add` of two loaded values in the final text.
    assert!(main.contains("add i64"));
}

#[test]
fn reassigning_an_array_variable_reads_the_new_array() {
    // Regression test: a plain `a = ...` assignment to an array-typed
    // variable must stay `noopt` like its declaration, or the SSA pass
    // erases the reassignment and later `a.length` reads keep resolving
    // to the original array's struct pointer.
    let ir = emit(
        "int main() { int[] a = new int[3]; a = new int[5]; return a.length; }",
    );
    let main = extract_function(&ir, "main");
    assert!(main.contains("alloca i64, i64 3"));
    assert!(main.contains("alloca i64, i64 5"));
    // The reassignment must be a real memory store to the variable's
    // slot (not eliminated by the SSA pass), so the final `a.length`
    // load reads the second array's struct, not the first.
    let store_count = main.matches("store ptr %loc").count();
    assert!(store_count >= 2, "expected both array pointers to be stored into the slot, got:\n{main}");
    // A literal return (`ret i64 3`/`ret i64 5`) would mean the SSA pass
    // folded the load away instead of leaving the noopt memory chain
    // intact; it must stay a load of a register.
    let last_line = main.lines().rev().find(|l| l.contains("ret ")).unwrap();
    assert!(last_line.contains("ret i64 %t"), "expected a register return, got: {last_line}");
}

#[test]
fn s5_recursive_call_keeps_both_functions_and_emits_a_direct_call() {
    let ir = emit(
        "int f(int n) { if (n<=1) return 1; return n*f(n-1); } int main() { return f(5); }",
    );
    assert!(ir.contains("define i64 @f("));
    assert!(ir.contains("define i64 @main("));
    let main = extract_function(&ir, "main");
    assert!(main.contains("call i64 @f(i64 5)"));
}

#[test]
fn s6_non_int_main_is_a_declaration_error() {
    let err = latc::compile("string main() { return \"x\"; }", OptLevel::Full).unwrap_err();
    assert!(matches!(err, CompileError::Declaration { .. }));
    assert!(err.to_string().contains("invalid main()"));
}

fn extract_function<'a>(ir: &'a str, name: &str) -> &'a str {
    let start = ir.find(&format!("define i64 @{name}(")).unwrap();
    let rest = &ir[start..];
    let end = rest.find("\n}\n").unwrap();
    &rest[..end]
}
