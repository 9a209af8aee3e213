//! Semantic analyzer (spec §4.2).
//!
//! Checks and simplifies the AST in a single top-down pass per function,
//! threading an environment of variable bindings plus the enclosing
//! function's expected return type. Expressions gain a `type`; statements
//! gain a `returns` flag; constant-foldable expressions and dead branches
//! are rewritten in place.

use crate::ast::{BinOp, Expr, FunDef, Lhs, Program, Stmt, UnOp};
use crate::builtins::builtin_functions;
use crate::error::CompileError;
use crate::types::Type;
use std::collections::HashMap;

/// Per-function checking environment: variable bindings plus the
/// expected return type, threaded explicitly rather than via a magic
/// environment key.
#[derive(Clone)]
struct Env {
    scopes: Vec<HashMap<String, Type>>,
    expected_return: Type,
}

impl Env {
    fn new(expected_return: Type) -> Self {
        Env {
            scopes: vec![HashMap::new()],
            expected_return,
        }
    }

    fn push_scope(&self) -> Self {
        let mut scopes = self.scopes.clone();
        scopes.push(HashMap::new());
        Env {
            scopes,
            expected_return: self.expected_return.clone(),
        }
    }

    fn lookup(&self, name: &str) -> Option<&Type> {
        self.scopes.iter().rev().find_map(|s| s.get(name))
    }

    /// Declares `name` in the innermost scope. `false` if it's already
    /// declared in that same scope (shadowing an outer scope is fine).
    fn declare(&mut self, name: &str, ty: Type) -> bool {
        let innermost = self.scopes.last_mut().expect("env has at least one scope");
        if innermost.contains_key(name) {
            false
        } else {
            innermost.insert(name.to_string(), ty);
            true
        }
    }
}

pub struct TypeChecker {
    functions: HashMap<String, FunDef>,
}

impl Default for TypeChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeChecker {
    pub fn new() -> Self {
        TypeChecker {
            functions: HashMap::new(),
        }
    }

    /// Checks an entire program: name-resolution table, `main` signature,
    /// per-function checking, then reachability pruning (spec §4.2).
    pub fn check(&mut self, mut program: Program) -> Result<Program, CompileError> {
        let mut declared = builtin_functions();
        declared.append(&mut program.functions);
        program.functions = declared;

        self.functions = HashMap::new();
        for f in &program.functions {
            if self.functions.contains_key(f.name()) {
                return Err(CompileError::declaration(
                    user_fn_line(f),
                    format!("duplicate function '{}'", f.name()),
                ));
            }
            self.functions.insert(f.name().to_string(), f.clone());
        }

        let main = self
            .functions
            .get("main")
            .ok_or_else(|| CompileError::declaration(0, "missing main() function"))?;
        match main {
            FunDef::User { params, ret, .. } if params.is_empty() && *ret == Type::Int => {}
            FunDef::User { line, .. } => {
                return Err(CompileError::declaration(
                    *line,
                    "invalid main() definition",
                ));
            }
            FunDef::Builtin { .. } => {
                return Err(CompileError::declaration(0, "invalid main() definition"));
            }
        }

        let mut checked = Vec::with_capacity(program.functions.len());
        for f in program.functions {
            checked.push(match f {
                FunDef::Builtin { .. } => f,
                FunDef::User { .. } => self.check_function(f)?,
            });
        }
        program.functions = checked;

        crate::call_graph::prune_unreachable(&mut program);
        Ok(program)
    }

    fn check_function(&self, f: FunDef) -> Result<FunDef, CompileError> {
        let FunDef::User {
            name,
            params,
            ret,
            body,
            line,
        } = f
        else {
            unreachable!("check_function called on a builtin");
        };

        let mut env = Env::new(ret.clone());
        for p in &params {
            if p.ty == Type::Void {
                return Err(CompileError::declaration(
                    p.line,
                    format!("parameter '{}' cannot have type void", p.name),
                ));
            }
            if !env.declare(&p.name, p.ty.clone()) {
                return Err(CompileError::declaration(
                    p.line,
                    format!("duplicate parameter '{}'", p.name),
                ));
            }
        }

        let (body, returns) = self.check_stmt(body, &env)?;

        let body = if ret == Type::Void {
            if returns {
                body
            } else {
                append_void_return(body, line)
            }
        } else {
            if !returns {
                return Err(CompileError::return_coverage(
                    line,
                    format!("function '{name}' does not return on every path"),
                ));
            }
            body
        };

        Ok(FunDef::User {
            name,
            params,
            ret,
            body,
            line,
        })
    }

    /// Checks a statement, returning the (possibly rewritten) statement
    /// and its `returns` property.
    fn check_stmt(&self, stmt: Stmt, env: &Env) -> Result<(Stmt, bool), CompileError> {
        match stmt {
            Stmt::Skip => Ok((Stmt::Skip, false)),
            Stmt::Decl { ty, name, line } => {
                let _ = env;
                if ty == Type::Void {
                    return Err(CompileError::declaration(
                        line,
                        format!("variable '{name}' cannot have type void"),
                    ));
                }
                Ok((Stmt::Decl { ty, name, line }, false))
            }
            Stmt::DeclInit {
                ty,
                name,
                value,
                line,
            } => {
                let value = self.check_expr(value, env)?;
                if value.array_ty() != ty {
                    return Err(CompileError::typing(
                        line,
                        format!(
                            "cannot initialize '{name}' of type {ty} with value of type {}",
                            value.array_ty()
                        ),
                    ));
                }
                Ok((
                    Stmt::DeclInit {
                        ty,
                        name,
                        value,
                        line,
                    },
                    false,
                ))
            }
            Stmt::Assign { lhs, value, line } => {
                let (lhs, lhs_ty) = self.check_lhs(lhs, env)?;
                let value = self.check_expr(value, env)?;
                if value.array_ty() != lhs_ty {
                    return Err(CompileError::typing(
                        line,
                        format!(
                            "cannot assign value of type {} to target of type {lhs_ty}",
                            value.array_ty()
                        ),
                    ));
                }
                Ok((Stmt::Assign { lhs, value, line }, false))
            }
            Stmt::Return { value, line } => {
                let value = self.check_expr(value, env)?;
                if value.array_ty() != env.expected_return {
                    return Err(CompileError::typing(
                        line,
                        format!(
                            "return type {} does not match declared return type {}",
                            value.array_ty(),
                            env.expected_return
                        ),
                    ));
                }
                Ok((Stmt::Return { value, line }, true))
            }
            Stmt::VoidReturn { line } => {
                if env.expected_return != Type::Void {
                    return Err(CompileError::typing(
                        line,
                        format!(
                            "bare return does not match declared return type {}",
                            env.expected_return
                        ),
                    ));
                }
                Ok((Stmt::VoidReturn { line }, true))
            }
            Stmt::If {
                cond,
                then_branch,
                line,
                ..
            } => {
                let cond = self.check_bool_cond(cond, env, line)?;
                match const_bool(&cond) {
                    Some(true) => {
                        let (then_branch, returns) = self.check_stmt(*then_branch, env)?;
                        Ok((then_branch, returns))
                    }
                    Some(false) => Ok((Stmt::Skip, false)),
                    None => {
                        let (then_branch, _) = self.check_stmt(*then_branch, env)?;
                        Ok((
                            Stmt::If {
                                cond,
                                then_branch: Box::new(then_branch),
                                returns: false,
                                line,
                            },
                            false,
                        ))
                    }
                }
            }
            Stmt::IfElse {
                cond,
                then_branch,
                else_branch,
                line,
                ..
            } => {
                let cond = self.check_bool_cond(cond, env, line)?;
                match const_bool(&cond) {
                    Some(true) => self.check_stmt(*then_branch, env),
                    Some(false) => self.check_stmt(*else_branch, env),
                    None => {
                        let (then_branch, then_returns) = self.check_stmt(*then_branch, env)?;
                        let (else_branch, else_returns) = self.check_stmt(*else_branch, env)?;
                        let returns = then_returns && else_returns;
                        Ok((
                            Stmt::IfElse {
                                cond,
                                then_branch: Box::new(then_branch),
                                else_branch: Box::new(else_branch),
                                returns,
                                line,
                            },
                            returns,
                        ))
                    }
                }
            }
            Stmt::While { cond, body, line } => {
                let cond = self.check_bool_cond(cond, env, line)?;
                match const_bool(&cond) {
                    Some(true) => {
                        let (body, _) = self.check_stmt(*body, env)?;
                        Ok((
                            Stmt::WhileTrue {
                                body: Box::new(body),
                                line,
                            },
                            true,
                        ))
                    }
                    Some(false) => Ok((Stmt::Skip, false)),
                    None => {
                        let (body, _) = self.check_stmt(*body, env)?;
                        Ok((
                            Stmt::While {
                                cond,
                                body: Box::new(body),
                                line,
                            },
                            false,
                        ))
                    }
                }
            }
            Stmt::WhileTrue { body, line } => {
                let (body, _) = self.check_stmt(*body, env)?;
                Ok((
                    Stmt::WhileTrue {
                        body: Box::new(body),
                        line,
                    },
                    true,
                ))
            }
            Stmt::ExprStmt { value, line } => {
                let value = self.check_expr(value, env)?;
                Ok((Stmt::ExprStmt { value, line }, false))
            }
            Stmt::Block { stmts, .. } => {
                let mut env = env.push_scope();
                let mut checked = Vec::with_capacity(stmts.len());
                let mut returns = false;
                for s in stmts {
                    if returns {
                        break; // dead code after a returning statement
                    }
                    let declared_name = decl_name(&s);
                    let (s, s_returns) = self.check_stmt(s, &env)?;
                    if let Some((name, ty, line)) = declared_name {
                        self.declare_local(&mut env, &name, ty, line)?;
                    }
                    returns = s_returns;
                    checked.push(s);
                }
                Ok((
                    Stmt::Block {
                        stmts: checked,
                        returns,
                    },
                    returns,
                ))
            }
        }
    }

    fn declare_local(
        &self,
        env: &mut Env,
        name: &str,
        ty: Type,
        line: usize,
    ) -> Result<(), CompileError> {
        if ty == Type::Void {
            return Err(CompileError::declaration(
                line,
                format!("variable '{name}' cannot have type void"),
            ));
        }
        if !env.declare(name, ty) {
            return Err(CompileError::declaration(
                line,
                format!("duplicate variable '{name}' in this scope"),
            ));
        }
        Ok(())
    }

    fn check_bool_cond(&self, cond: Expr, env: &Env, line: usize) -> Result<Expr, CompileError> {
        let cond = self.check_expr(cond, env)?;
        if *cond.ty() != Type::Bool {
            return Err(CompileError::typing(
                line,
                format!("condition must be boolean, found {}", cond.ty()),
            ));
        }
        Ok(cond)
    }

    fn check_lhs(&self, lhs: Lhs, env: &Env) -> Result<(Lhs, Type), CompileError> {
        match lhs {
            Lhs::Var { name, line } => {
                let ty = env
                    .lookup(&name)
                    .cloned()
                    .ok_or_else(|| CompileError::resolution(line, format!("undefined variable '{name}'")))?;
                Ok((Lhs::Var { name, line }, ty))
            }
            Lhs::Index { array, index, line } => {
                let array = self.check_expr(*array, env)?;
                let index = self.check_expr(*index, env)?;
                if *index.ty() != Type::Int {
                    return Err(CompileError::typing(line, "array index must be int"));
                }
                let array_ty = array.array_ty();
                let elem_ty = array_ty
                    .element_type()
                    .ok_or_else(|| CompileError::typing(line, "indexed value is not an array"))?
                    .clone();
                Ok((
                    Lhs::Index {
                        array: Box::new(array),
                        index: Box::new(index),
                        line,
                    },
                    elem_ty,
                ))
            }
        }
    }

    fn check_expr(&self, expr: Expr, env: &Env) -> Result<Expr, CompileError> {
        match expr {
            Expr::IntLit { .. } | Expr::BoolLit { .. } | Expr::StringLit { .. } => Ok(expr),
            Expr::Var { name, line, .. } => {
                let ty = env
                    .lookup(&name)
                    .cloned()
                    .ok_or_else(|| CompileError::resolution(line, format!("undefined variable '{name}'")))?;
                Ok(Expr::Var {
                    name,
                    ty: Some(ty),
                    line,
                })
            }
            Expr::Unary {
                op, operand, line, ..
            } => {
                let operand = self.check_expr(*operand, env)?;
                let (expect, result) = match op {
                    UnOp::Neg => (Type::Int, Type::Int),
                    UnOp::Not => (Type::Bool, Type::Bool),
                };
                if *operand.ty() != expect {
                    return Err(CompileError::typing(
                        line,
                        format!("operator expects {expect}, found {}", operand.ty()),
                    ));
                }
                let folded = fold_unary(op, &operand, line);
                Ok(folded.unwrap_or(Expr::Unary {
                    op,
                    operand: Box::new(operand),
                    ty: Some(result),
                    line,
                }))
            }
            Expr::Binary {
                op,
                left,
                right,
                line,
                ..
            } => {
                let left = self.check_expr(*left, env)?;
                let right = self.check_expr(*right, env)?;
                let result_ty = self.type_binary(op, left.ty(), right.ty(), line)?;
                let folded = fold_binary(op, &left, &right, line);
                Ok(folded.unwrap_or(Expr::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                    ty: Some(result_ty),
                    line,
                }))
            }
            Expr::Call {
                callee, args, line, ..
            } => {
                let decl = self.functions.get(&callee).ok_or_else(|| {
                    CompileError::resolution(line, format!("undefined function '{callee}'"))
                })?;
                let params = decl.param_types();
                if params.len() != args.len() {
                    return Err(CompileError::resolution(
                        line,
                        format!(
                            "'{callee}' expects {} argument(s), found {}",
                            params.len(),
                            args.len()
                        ),
                    ));
                }
                let mut checked_args = Vec::with_capacity(args.len());
                for (arg, expected) in args.into_iter().zip(params.iter()) {
                    let arg = self.check_expr(arg, env)?;
                    if arg.array_ty() != *expected {
                        return Err(CompileError::typing(
                            line,
                            format!(
                                "argument to '{callee}' has type {}, expected {expected}",
                                arg.array_ty()
                            ),
                        ));
                    }
                    checked_args.push(arg);
                }
                Ok(Expr::Call {
                    callee,
                    args: checked_args,
                    ty: Some(decl.ret().clone()),
                    line,
                })
            }
            Expr::Index {
                array, index, line, ..
            } => {
                let array = self.check_expr(*array, env)?;
                let index = self.check_expr(*index, env)?;
                if *index.ty() != Type::Int {
                    return Err(CompileError::typing(line, "array index must be int"));
                }
                let array_ty = array.array_ty();
                let elem_ty = array_ty
                    .element_type()
                    .ok_or_else(|| CompileError::typing(line, "indexed value is not an array"))?
                    .clone();
                Ok(Expr::Index {
                    array: Box::new(array),
                    index: Box::new(index),
                    ty: Some(elem_ty),
                    line,
                })
            }
            Expr::Length { array, line } => {
                let array = self.check_expr(*array, env)?;
                if array.array_ty().element_type().is_none() {
                    return Err(CompileError::declaration(
                        line,
                        "'.length' is only valid on an array".to_string(),
                    ));
                }
                Ok(Expr::Length {
                    array: Box::new(array),
                    line,
                })
            }
            Expr::NewArray {
                elem_ty,
                count,
                line,
            } => {
                if elem_ty == Type::Void {
                    return Err(CompileError::declaration(
                        line,
                        "cannot allocate an array of void",
                    ));
                }
                let count = self.check_expr(*count, env)?;
                if *count.ty() != Type::Int {
                    return Err(CompileError::typing(line, "array length must be int"));
                }
                Ok(Expr::NewArray {
                    elem_ty,
                    count: Box::new(count),
                    line,
                })
            }
        }
    }

    fn type_binary(&self, op: BinOp, l: &Type, r: &Type, line: usize) -> Result<Type, CompileError> {
        use BinOp::*;
        match op {
            Add if *l == Type::String && *r == Type::String => Ok(Type::String),
            Add | Sub | Mul | Div | Mod => {
                if *l == Type::Int && *r == Type::Int {
                    Ok(Type::Int)
                } else {
                    Err(CompileError::typing(
                        line,
                        format!("operator expects int operands, found {l} and {r}"),
                    ))
                }
            }
            And | Or => {
                if *l == Type::Bool && *r == Type::Bool {
                    Ok(Type::Bool)
                } else {
                    Err(CompileError::typing(
                        line,
                        format!("operator expects boolean operands, found {l} and {r}"),
                    ))
                }
            }
            Lt | Le | Gt | Ge | Eq | Ne => {
                if l == r {
                    Ok(Type::Bool)
                } else {
                    Err(CompileError::typing(
                        line,
                        format!("cannot compare {l} with {r}"),
                    ))
                }
            }
        }
    }
}

fn user_fn_line(f: &FunDef) -> usize {
    match f {
        FunDef::User { line, .. } => *line,
        FunDef::Builtin { .. } => 0,
    }
}

/// If the last checked statement in a function's body doesn't already
/// return, append an implicit `return;` (only valid for void functions).
fn append_void_return(body: Stmt, line: usize) -> Stmt {
    match body {
        Stmt::Block { mut stmts, .. } => {
            stmts.push(Stmt::VoidReturn { line });
            Stmt::Block {
                stmts,
                returns: true,
            }
        }
        other => Stmt::Block {
            stmts: vec![other, Stmt::VoidReturn { line }],
            returns: true,
        },
    }
}

/// The name/type/line a declaration-shaped statement introduces into the
/// *next* statement's scope — checked separately from the statement's own
/// checking so a `decl`'s initializer can't see its own name.
fn decl_name(stmt: &Stmt) -> Option<(String, Type, usize)> {
    match stmt {
        Stmt::Decl { ty, name, line } | Stmt::DeclInit { ty, name, line, .. } => {
            Some((name.clone(), ty.clone(), *line))
        }
        _ => None,
    }
}

fn const_bool(expr: &Expr) -> Option<bool> {
    match expr {
        Expr::BoolLit { value, .. } => Some(*value),
        _ => None,
    }
}

fn const_int(expr: &Expr) -> Option<i64> {
    match expr {
        Expr::IntLit { value, .. } => Some(*value),
        _ => None,
    }
}

fn const_str(expr: &Expr) -> Option<&str> {
    match expr {
        Expr::StringLit { value, .. } => Some(value),
        _ => None,
    }
}

fn fold_unary(op: UnOp, operand: &Expr, line: usize) -> Option<Expr> {
    match op {
        UnOp::Neg => const_int(operand).map(|v| Expr::IntLit { value: -v, line }),
        UnOp::Not => const_bool(operand).map(|v| Expr::BoolLit { value: !v, line }),
    }
}

/// Constant-folds integer arithmetic with truncating division/modulo
/// (matching LLVM `sdiv`/`srem`), string concatenation, logical
/// short-circuit operators, and same-type comparisons.
fn fold_binary(op: BinOp, left: &Expr, right: &Expr, line: usize) -> Option<Expr> {
    use BinOp::*;
    if let (Some(a), Some(b)) = (const_int(left), const_int(right)) {
        let value = match op {
            Add => a.checked_add(b)?,
            Sub => a.checked_sub(b)?,
            Mul => a.checked_mul(b)?,
            Div => {
                if b == 0 {
                    return None;
                }
                a.wrapping_div(b)
            }
            Mod => {
                if b == 0 {
                    return None;
                }
                a.wrapping_rem(b)
            }
            Lt => return Some(Expr::BoolLit { value: a < b, line }),
            Le => return Some(Expr::BoolLit { value: a <= b, line }),
            Gt => return Some(Expr::BoolLit { value: a > b, line }),
            Ge => return Some(Expr::BoolLit { value: a >= b, line }),
            Eq => return Some(Expr::BoolLit { value: a == b, line }),
            Ne => return Some(Expr::BoolLit { value: a != b, line }),
            And | Or => return None,
        };
        return Some(Expr::IntLit { value, line });
    }
    if let (Some(a), Some(b)) = (const_str(left), const_str(right)) {
        return match op {
            Add => Some(Expr::StringLit {
                value: format!("{a}{b}"),
                line,
            }),
            Eq => Some(Expr::BoolLit { value: a == b, line }),
            Ne => Some(Expr::BoolLit { value: a != b, line }),
            _ => None,
        };
    }
    if let (Some(a), Some(b)) = (const_bool(left), const_bool(right)) {
        return match op {
            And => Some(Expr::BoolLit { value: a && b, line }),
            Or => Some(Expr::BoolLit { value: a || b, line }),
            Eq => Some(Expr::BoolLit { value: a == b, line }),
            Ne => Some(Expr::BoolLit { value: a != b, line }),
            _ => None,
        };
    }
    // Short-circuit folding when only one side is constant.
    match (op, const_bool(left)) {
        (And, Some(false)) => return Some(Expr::BoolLit { value: false, line }),
        (Or, Some(true)) => return Some(Expr::BoolLit { value: true, line }),
        _ => {}
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn check(src: &str) -> Result<Program, CompileError> {
        let program = Parser::new(src).unwrap().parse_program().unwrap();
        TypeChecker::new().check(program)
    }

    #[test]
    fn requires_main() {
        let err = check("int helper() { return 0; }").unwrap_err();
        assert!(matches!(err, CompileError::Declaration { .. }));
    }

    #[test]
    fn rejects_non_int_main() {
        let err = check("string main() { return \"x\"; }").unwrap_err();
        assert!(matches!(err, CompileError::Declaration { .. }));
    }

    #[test]
    fn folds_constant_arithmetic() {
        let program = check("int main() { return 2 + 3 * 4; }").unwrap();
        let FunDef::User { body, .. } = program.find("main").unwrap() else {
            panic!()
        };
        let Stmt::Block { stmts, .. } = body else {
            panic!()
        };
        assert!(matches!(
            stmts[0],
            Stmt::Return {
                value: Expr::IntLit { value: 14, .. },
                ..
            }
        ));
    }

    #[test]
    fn truncating_division_rounds_toward_zero() {
        let program = check("int main() { return -7 / 2; }").unwrap();
        let FunDef::User { body, .. } = program.find("main").unwrap() else {
            panic!()
        };
        let Stmt::Block { stmts, .. } = body else {
            panic!()
        };
        assert!(matches!(
            stmts[0],
            Stmt::Return {
                value: Expr::IntLit { value: -3, .. },
                ..
            }
        ));
    }

    #[test]
    fn missing_return_is_an_error() {
        let err = check("int main() { int x = 1; }").unwrap_err();
        assert!(matches!(err, CompileError::ReturnCoverage { .. }));
    }

    #[test]
    fn void_function_gets_implicit_return() {
        let program = check("void helper() { } int main() { helper(); return 0; }").unwrap();
        let FunDef::User { body, .. } = program.find("helper").unwrap() else {
            panic!()
        };
        assert!(body.returns());
    }

    #[test]
    fn while_true_folds_and_returns() {
        let program = check("int main() { while (true) { return 1; } }").unwrap();
        let FunDef::User { body, .. } = program.find("main").unwrap() else {
            panic!()
        };
        let Stmt::Block { stmts, .. } = body else {
            panic!()
        };
        assert!(matches!(stmts[0], Stmt::WhileTrue { .. }));
    }

    #[test]
    fn duplicate_variable_in_same_scope_is_an_error() {
        let err = check("int main() { int x = 1; int x = 2; return 0; }").unwrap_err();
        assert!(matches!(err, CompileError::Declaration { .. }));
    }

    #[test]
    fn shadowing_in_nested_block_is_allowed() {
        check("int main() { int x = 1; { int x = 2; } return x; }").unwrap();
    }

    #[test]
    fn reachability_pruning_drops_unreachable_builtins() {
        let program = check(
            r#"string greet(string name) { return "hi " + name; } int main() { printString(greet("x")); return 0; }"#,
        )
        .unwrap();
        let names: Vec<&str> = program.functions.iter().map(|f| f.name()).collect();
        assert!(names.contains(&"printString"));
        assert!(names.contains(&"$addStrings"));
        assert!(!names.contains(&"readInt"));
        assert!(!names.contains(&"readString"));
    }

    #[test]
    fn call_arity_mismatch_is_an_error() {
        let err = check("int helper(int x) { return x; } int main() { return helper(); }")
            .unwrap_err();
        assert!(matches!(err, CompileError::Resolution { .. }));
    }
}
