//! Abstract syntax tree (spec §3, §4.1).
//!
//! The parser builds this tree once; the semantic analyzer then mutates it
//! in place: expressions gain a `type`, statements gain a `returns` flag,
//! constant-foldable expressions and dead branches are replaced, and the
//! function list is filtered down to the reachable set.

use crate::types::Type;

/// A unary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Not,
}

/// A binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    And,
    Or,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl BinOp {
    /// Zero-based position in `[==, !=, <, <=, >, >=]`, used to select the
    /// `_compareStrings` runtime operation (spec §4.3).
    pub fn compare_op_id(self) -> i64 {
        match self {
            BinOp::Eq => 0,
            BinOp::Ne => 1,
            BinOp::Lt => 2,
            BinOp::Le => 3,
            BinOp::Gt => 4,
            BinOp::Ge => 5,
            _ => unreachable!("compare_op_id called on non-comparison operator"),
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge | BinOp::Eq | BinOp::Ne
        )
    }
}

/// An expression. Every variant carries the source line it was parsed
/// from; `ty` is `None` until the semantic analyzer fills it in.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    IntLit {
        value: i64,
        line: usize,
    },
    BoolLit {
        value: bool,
        line: usize,
    },
    StringLit {
        value: String,
        line: usize,
    },
    Var {
        name: String,
        ty: Option<Type>,
        line: usize,
    },
    Unary {
        op: UnOp,
        operand: Box<Expr>,
        ty: Option<Type>,
        line: usize,
    },
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
        ty: Option<Type>,
        line: usize,
    },
    Call {
        callee: String,
        args: Vec<Expr>,
        ty: Option<Type>,
        line: usize,
    },
    Index {
        array: Box<Expr>,
        index: Box<Expr>,
        ty: Option<Type>,
        line: usize,
    },
    Length {
        array: Box<Expr>,
        line: usize,
    },
    NewArray {
        elem_ty: Type,
        count: Box<Expr>,
        line: usize,
    },
}

impl Expr {
    pub fn line(&self) -> usize {
        match self {
            Expr::IntLit { line, .. }
            | Expr::BoolLit { line, .. }
            | Expr::StringLit { line, .. }
            | Expr::Var { line, .. }
            | Expr::Unary { line, .. }
            | Expr::Binary { line, .. }
            | Expr::Call { line, .. }
            | Expr::Index { line, .. }
            | Expr::Length { line, .. }
            | Expr::NewArray { line, .. } => *line,
        }
    }

    /// The type assigned by the semantic analyzer. Panics if called before
    /// checking; every expression is required to carry a type afterward
    /// (spec §3 invariant).
    pub fn ty(&self) -> &Type {
        match self {
            Expr::IntLit { .. } => &Type::Int,
            Expr::BoolLit { .. } => &Type::Bool,
            Expr::StringLit { .. } => &Type::String,
            Expr::Var { ty, .. } | Expr::Unary { ty, .. } | Expr::Binary { ty, .. } => ty
                .as_ref()
                .expect("expression type not yet assigned by semantic analyzer"),
            Expr::Call { ty, .. } | Expr::Index { ty, .. } => ty
                .as_ref()
                .expect("expression type not yet assigned by semantic analyzer"),
            Expr::Length { .. } => &Type::Int,
            Expr::NewArray { .. } => {
                panic!("NewArray carries its type via elem_ty, use array_ty()")
            }
        }
    }

    /// The array type a `new T[n]` expression produces. Separate from
    /// `ty()` because `NewArray` doesn't store a ready-made `Type` to
    /// borrow a reference from — it's built on demand from `elem_ty`.
    pub fn array_ty(&self) -> Type {
        match self {
            Expr::NewArray { elem_ty, .. } => Type::array_of(elem_ty.clone()),
            other => other.ty().clone(),
        }
    }

    /// Functions this expression (and its children) directly calls,
    /// including the synthetic `$addStrings`/`$compareStrings` helpers
    /// contributed by string `+` and string comparisons. Used by
    /// reachability pruning (spec §4.2).
    pub fn called_functions(&self, out: &mut std::collections::HashSet<String>) {
        match self {
            Expr::IntLit { .. } | Expr::BoolLit { .. } | Expr::StringLit { .. } | Expr::Var { .. } => {}
            Expr::Unary { operand, .. } => operand.called_functions(out),
            Expr::Binary {
                op, left, right, ..
            } => {
                left.called_functions(out);
                right.called_functions(out);
                let left_is_string = matches!(left.ty_opt(), Some(Type::String));
                if *op == BinOp::Add && left_is_string {
                    out.insert("$addStrings".to_string());
                } else if op.is_comparison() && left_is_string {
                    out.insert("$compareStrings".to_string());
                }
            }
            Expr::Call { callee, args, .. } => {
                out.insert(callee.clone());
                for a in args {
                    a.called_functions(out);
                }
            }
            Expr::Index { array, index, .. } => {
                array.called_functions(out);
                index.called_functions(out);
            }
            Expr::Length { array, .. } => array.called_functions(out),
            Expr::NewArray { count, .. } => count.called_functions(out),
        }
    }

    fn ty_opt(&self) -> Option<&Type> {
        match self {
            Expr::StringLit { .. } => Some(&Type::String),
            Expr::Var { ty, .. } | Expr::Unary { ty, .. } | Expr::Binary { ty, .. } => ty.as_ref(),
            Expr::Call { ty, .. } | Expr::Index { ty, .. } => ty.as_ref(),
            _ => None,
        }
    }
}

/// An assignable location.
#[derive(Debug, Clone, PartialEq)]
pub enum Lhs {
    Var { name: String, line: usize },
    Index {
        array: Box<Expr>,
        index: Box<Expr>,
        line: usize,
    },
}

impl Lhs {
    pub fn line(&self) -> usize {
        match self {
            Lhs::Var { line, .. } | Lhs::Index { line, .. } => *line,
        }
    }

    pub fn called_functions(&self, out: &mut std::collections::HashSet<String>) {
        if let Lhs::Index { array, index, .. } = self {
            array.called_functions(out);
            index.called_functions(out);
        }
    }
}

/// A statement. `returns` is filled in by the semantic analyzer: true iff
/// every execution path through this statement ends in an explicit
/// return (spec §3 "returns property").
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Skip,
    Decl {
        ty: Type,
        name: String,
        line: usize,
    },
    DeclInit {
        ty: Type,
        name: String,
        value: Expr,
        line: usize,
    },
    Assign {
        lhs: Lhs,
        value: Expr,
        line: usize,
    },
    Return {
        value: Expr,
        line: usize,
    },
    VoidReturn {
        line: usize,
    },
    If {
        cond: Expr,
        then_branch: Box<Stmt>,
        returns: bool,
        line: usize,
    },
    IfElse {
        cond: Expr,
        then_branch: Box<Stmt>,
        else_branch: Box<Stmt>,
        returns: bool,
        line: usize,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
        line: usize,
    },
    /// Optimizer-synthesized: a `while (true) { ... }` whose condition
    /// folded to the constant `true`. `returns` is always `true` — an
    /// unconditional loop with no break cannot exit (spec §4.2).
    WhileTrue {
        body: Box<Stmt>,
        line: usize,
    },
    ExprStmt {
        value: Expr,
        line: usize,
    },
    Block {
        stmts: Vec<Stmt>,
        returns: bool,
    },
}

impl Stmt {
    /// Whether every path through this statement ends in a return.
    pub fn returns(&self) -> bool {
        match self {
            Stmt::Return { .. } | Stmt::VoidReturn { .. } | Stmt::WhileTrue { .. } => true,
            Stmt::If { returns, .. } | Stmt::IfElse { returns, .. } | Stmt::Block { returns, .. } => {
                *returns
            }
            Stmt::Skip
            | Stmt::Decl { .. }
            | Stmt::DeclInit { .. }
            | Stmt::Assign { .. }
            | Stmt::While { .. }
            | Stmt::ExprStmt { .. } => false,
        }
    }

    pub fn called_functions(&self, out: &mut std::collections::HashSet<String>) {
        match self {
            Stmt::Skip | Stmt::Decl { .. } | Stmt::VoidReturn { .. } => {}
            Stmt::DeclInit { value, .. } => value.called_functions(out),
            Stmt::Assign { lhs, value, .. } => {
                lhs.called_functions(out);
                value.called_functions(out);
            }
            Stmt::Return { value, .. } => value.called_functions(out),
            Stmt::ExprStmt { value, .. } => value.called_functions(out),
            Stmt::If {
                cond, then_branch, ..
            } => {
                cond.called_functions(out);
                then_branch.called_functions(out);
            }
            Stmt::IfElse {
                cond,
                then_branch,
                else_branch,
                ..
            } => {
                cond.called_functions(out);
                then_branch.called_functions(out);
                else_branch.called_functions(out);
            }
            Stmt::While { cond, body, .. } => {
                cond.called_functions(out);
                body.called_functions(out);
            }
            Stmt::WhileTrue { body, .. } => body.called_functions(out),
            Stmt::Block { stmts, .. } => {
                for s in stmts {
                    s.called_functions(out);
                }
            }
        }
    }
}

/// An argument to a function declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub ty: Type,
    pub name: String,
    pub line: usize,
}

/// A function declaration: either user-defined (with a body) or a
/// built-in (declaration only).
#[derive(Debug, Clone, PartialEq)]
pub enum FunDef {
    User {
        name: String,
        params: Vec<Param>,
        ret: Type,
        body: Stmt,
        line: usize,
    },
    Builtin {
        name: String,
        params: Vec<Type>,
        ret: Type,
    },
}

impl FunDef {
    pub fn name(&self) -> &str {
        match self {
            FunDef::User { name, .. } | FunDef::Builtin { name, .. } => name,
        }
    }

    pub fn ret(&self) -> &Type {
        match self {
            FunDef::User { ret, .. } | FunDef::Builtin { ret, .. } => ret,
        }
    }

    pub fn param_types(&self) -> Vec<Type> {
        match self {
            FunDef::User { params, .. } => params.iter().map(|p| p.ty.clone()).collect(),
            FunDef::Builtin { params, .. } => params.clone(),
        }
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self, FunDef::Builtin { .. })
    }
}

/// An ordered list of function declarations.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub functions: Vec<FunDef>,
}

impl Program {
    pub fn find(&self, name: &str) -> Option<&FunDef> {
        self.functions.iter().find(|f| f.name() == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn while_true_always_returns() {
        let stmt = Stmt::WhileTrue {
            body: Box::new(Stmt::Skip),
            line: 1,
        };
        assert!(stmt.returns());
    }

    #[test]
    fn block_returns_follows_flag() {
        let block = Stmt::Block {
            stmts: vec![Stmt::Return {
                value: Expr::IntLit { value: 0, line: 1 },
                line: 1,
            }],
            returns: true,
        };
        assert!(block.returns());
    }

    #[test]
    fn call_contributes_callee_to_called_functions() {
        let expr = Expr::Call {
            callee: "helper".to_string(),
            args: vec![],
            ty: Some(Type::Int),
            line: 1,
        };
        let mut out = std::collections::HashSet::new();
        expr.called_functions(&mut out);
        assert!(out.contains("helper"));
    }

    #[test]
    fn string_plus_contributes_add_strings() {
        let expr = Expr::Binary {
            op: BinOp::Add,
            left: Box::new(Expr::StringLit {
                value: "a".to_string(),
                line: 1,
            }),
            right: Box::new(Expr::StringLit {
                value: "b".to_string(),
                line: 1,
            }),
            ty: Some(Type::String),
            line: 1,
        };
        let mut out = std::collections::HashSet::new();
        expr.called_functions(&mut out);
        assert!(out.contains("$addStrings"));
    }
}
