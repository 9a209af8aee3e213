//! Recursive-descent parser for the source language (spec §6).
//!
//! Produces the raw AST of spec.md §3: every expression's `ty` is `None`
//! and every statement's derived `returns` flag is left at its default —
//! the semantic analyzer (C2) fills both in. `x++`/`x--` and
//! `for (T x : a) s` are desugared here, as the spec requires.

use crate::ast::{BinOp, Expr, FunDef, Lhs, Param, Program, Stmt, UnOp};
use crate::lexer::{Token, TokenKind, tokenize};
use crate::types::Type;

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    fresh_counter: usize,
}

type PResult<T> = Result<T, (usize, String)>;

impl Parser {
    pub fn new(source: &str) -> PResult<Self> {
        let tokens = tokenize(source)?;
        Ok(Parser {
            tokens,
            pos: 0,
            fresh_counter: 0,
        })
    }

    pub fn parse_program(&mut self) -> PResult<Program> {
        let mut functions = Vec::new();
        while !self.at_eof() {
            functions.push(self.parse_function()?);
        }
        Ok(Program { functions })
    }

    // --- token stream helpers -------------------------------------------------

    fn at_eof(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn line(&self) -> usize {
        self.peek().line
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn is_symbol(&self, s: &str) -> bool {
        matches!(&self.peek().kind, TokenKind::Symbol(sym) if sym == s)
    }

    fn eat_symbol(&mut self, s: &str) -> PResult<()> {
        if self.is_symbol(s) {
            self.advance();
            Ok(())
        } else {
            Err((self.line(), format!("expected '{s}'")))
        }
    }

    fn eat_ident(&mut self) -> PResult<String> {
        match self.advance().kind {
            TokenKind::Ident(name) => Ok(name),
            other => Err((self.line(), format!("expected identifier, got {other:?}"))),
        }
    }

    fn fresh_name(&mut self, prefix: &str) -> String {
        self.fresh_counter += 1;
        format!("${prefix}${}", self.fresh_counter)
    }

    // --- types -----------------------------------------------------------------

    fn parse_base_type(&mut self) -> PResult<Type> {
        let tok = self.advance();
        let ty = match &tok.kind {
            TokenKind::Symbol(s) if s == "int" => Type::Int,
            TokenKind::Symbol(s) if s == "boolean" => Type::Bool,
            TokenKind::Symbol(s) if s == "string" => Type::String,
            TokenKind::Symbol(s) if s == "void" => Type::Void,
            other => return Err((tok.line, format!("expected a type, got {other:?}"))),
        };
        Ok(ty)
    }

    /// Parses a base type followed by zero or more `[]` suffixes.
    fn parse_type(&mut self) -> PResult<Type> {
        let mut ty = self.parse_base_type()?;
        while self.is_symbol("[") {
            self.advance();
            self.eat_symbol("]")?;
            ty = Type::array_of(ty);
        }
        Ok(ty)
    }

    /// True if the upcoming tokens look like a type (used to disambiguate
    /// `for (T x : a)` from other constructs, and is-a-declaration checks).
    fn peek_is_type_start(&self) -> bool {
        matches!(&self.peek().kind, TokenKind::Symbol(s) if matches!(s.as_str(), "int" | "boolean" | "string" | "void"))
    }

    // --- top level ---------------------------------------------------------

    fn parse_function(&mut self) -> PResult<FunDef> {
        let line = self.line();
        let ret = self.parse_type()?;
        let name = self.eat_ident()?;
        self.eat_symbol("(")?;
        let mut params = Vec::new();
        if !self.is_symbol(")") {
            loop {
                let pline = self.line();
                let pty = self.parse_type()?;
                let pname = self.eat_ident()?;
                params.push(Param {
                    ty: pty,
                    name: pname,
                    line: pline,
                });
                if self.is_symbol(",") {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.eat_symbol(")")?;
        let body = self.parse_block()?;
        Ok(FunDef::User {
            name,
            params,
            ret,
            body,
            line,
        })
    }

    // --- statements --------------------------------------------------------

    fn parse_block(&mut self) -> PResult<Stmt> {
        self.eat_symbol("{")?;
        let mut stmts = Vec::new();
        while !self.is_symbol("}") {
            stmts.push(self.parse_stmt()?);
        }
        self.advance();
        Ok(Stmt::Block {
            stmts,
            returns: false,
        })
    }

    fn parse_stmt(&mut self) -> PResult<Stmt> {
        let line = self.line();
        if self.is_symbol(";") {
            self.advance();
            return Ok(Stmt::Skip);
        }
        if self.is_symbol("{") {
            return self.parse_block();
        }
        if self.is_symbol("if") {
            return self.parse_if();
        }
        if self.is_symbol("while") {
            return self.parse_while();
        }
        if self.is_symbol("for") {
            return self.parse_for();
        }
        if self.is_symbol("return") {
            self.advance();
            if self.is_symbol(";") {
                self.advance();
                return Ok(Stmt::VoidReturn { line });
            }
            let value = self.parse_expr()?;
            self.eat_symbol(";")?;
            return Ok(Stmt::Return { value, line });
        }
        if self.peek_is_type_start() {
            return self.parse_decl();
        }
        // Either an assignment/increment/decrement or a bare expression
        // statement; both start with an expression-like prefix, so parse
        // an identifier-led primary and branch on what follows.
        self.parse_assign_or_expr_stmt()
    }

    fn parse_decl(&mut self) -> PResult<Stmt> {
        let ty = self.parse_type()?;
        let mut decls = Vec::new();
        loop {
            let dline = self.line();
            let name = self.eat_ident()?;
            if self.is_symbol("=") {
                self.advance();
                let value = self.parse_expr()?;
                decls.push(Stmt::DeclInit {
                    ty: ty.clone(),
                    name,
                    value,
                    line: dline,
                });
            } else {
                decls.push(Stmt::Decl {
                    ty: ty.clone(),
                    name,
                    line: dline,
                });
            }
            if self.is_symbol(",") {
                self.advance();
            } else {
                break;
            }
        }
        self.eat_symbol(";")?;
        if decls.len() == 1 {
            Ok(decls.into_iter().next().unwrap())
        } else {
            Ok(Stmt::Block {
                stmts: decls,
                returns: false,
            })
        }
    }

    fn parse_if(&mut self) -> PResult<Stmt> {
        let line = self.line();
        self.advance(); // 'if'
        self.eat_symbol("(")?;
        let cond = self.parse_expr()?;
        self.eat_symbol(")")?;
        let then_branch = Box::new(self.parse_stmt()?);
        if self.is_symbol("else") {
            self.advance();
            let else_branch = Box::new(self.parse_stmt()?);
            Ok(Stmt::IfElse {
                cond,
                then_branch,
                else_branch,
                returns: false,
                line,
            })
        } else {
            Ok(Stmt::If {
                cond,
                then_branch,
                returns: false,
                line,
            })
        }
    }

    fn parse_while(&mut self) -> PResult<Stmt> {
        let line = self.line();
        self.advance(); // 'while'
        self.eat_symbol("(")?;
        let cond = self.parse_expr()?;
        self.eat_symbol(")")?;
        let body = Box::new(self.parse_stmt()?);
        Ok(Stmt::While { cond, body, line })
    }

    /// Desugars `for (T x : a) s` into an index-based while loop:
    /// ```text
    /// { T[] $arr = a; int $idx = 0;
    ///   while ($idx < $arr.length) { T x = $arr[$idx]; s; $idx = $idx + 1; } }
    /// ```
    fn parse_for(&mut self) -> PResult<Stmt> {
        let line = self.line();
        self.advance(); // 'for'
        self.eat_symbol("(")?;
        let elem_ty = self.parse_type()?;
        let var_name = self.eat_ident()?;
        self.eat_symbol(":")?;
        let array_expr = self.parse_expr()?;
        self.eat_symbol(")")?;
        let body = self.parse_stmt()?;

        let arr_name = self.fresh_name("arr");
        let idx_name = self.fresh_name("idx");
        let array_ty = Type::array_of(elem_ty.clone());

        let arr_decl = Stmt::DeclInit {
            ty: array_ty,
            name: arr_name.clone(),
            value: array_expr,
            line,
        };
        let idx_decl = Stmt::DeclInit {
            ty: Type::Int,
            name: idx_name.clone(),
            value: Expr::IntLit { value: 0, line },
            line,
        };
        let arr_var = || Expr::Var {
            name: arr_name.clone(),
            ty: None,
            line,
        };
        let idx_var = || Expr::Var {
            name: idx_name.clone(),
            ty: None,
            line,
        };
        let cond = Expr::Binary {
            op: BinOp::Lt,
            left: Box::new(idx_var()),
            right: Box::new(Expr::Length {
                array: Box::new(arr_var()),
                line,
            }),
            ty: None,
            line,
        };
        let elem_decl = Stmt::DeclInit {
            ty: elem_ty,
            name: var_name,
            value: Expr::Index {
                array: Box::new(arr_var()),
                index: Box::new(idx_var()),
                ty: None,
                line,
            },
            line,
        };
        let incr = Stmt::Assign {
            lhs: Lhs::Var {
                name: idx_name.clone(),
                line,
            },
            value: Expr::Binary {
                op: BinOp::Add,
                left: Box::new(idx_var()),
                right: Box::new(Expr::IntLit { value: 1, line }),
                ty: None,
                line,
            },
            line,
        };
        let loop_body = Stmt::Block {
            stmts: vec![elem_decl, body, incr],
            returns: false,
        };
        let while_stmt = Stmt::While {
            cond,
            body: Box::new(loop_body),
            line,
        };
        Ok(Stmt::Block {
            stmts: vec![arr_decl, idx_decl, while_stmt],
            returns: false,
        })
    }

    /// Parses `lhs = e;`, `lhs++;`, `lhs--;`, or a bare `e;` expression
    /// statement, all of which share an expression-like prefix.
    fn parse_assign_or_expr_stmt(&mut self) -> PResult<Stmt> {
        let line = self.line();
        let expr = self.parse_expr()?;
        if self.is_symbol("=") {
            self.advance();
            let lhs = expr_to_lhs(expr, line)?;
            let value = self.parse_expr()?;
            self.eat_symbol(";")?;
            return Ok(Stmt::Assign { lhs, value, line });
        }
        if self.is_symbol("++") || self.is_symbol("--") {
            let op = if self.is_symbol("++") {
                BinOp::Add
            } else {
                BinOp::Sub
            };
            self.advance();
            self.eat_symbol(";")?;
            let lhs = expr_to_lhs(expr.clone(), line)?;
            let value = Expr::Binary {
                op,
                left: Box::new(expr),
                right: Box::new(Expr::IntLit { value: 1, line }),
                ty: None,
                line,
            };
            return Ok(Stmt::Assign { lhs, value, line });
        }
        self.eat_symbol(";")?;
        Ok(Stmt::ExprStmt { value: expr, line })
    }

    // --- expressions (precedence climbing) ----------------------------------

    fn parse_expr(&mut self) -> PResult<Expr> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_and()?;
        while self.is_symbol("||") {
            let line = self.line();
            self.advance();
            let rhs = self.parse_and()?;
            lhs = Expr::Binary {
                op: BinOp::Or,
                left: Box::new(lhs),
                right: Box::new(rhs),
                ty: None,
                line,
            };
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_cmp()?;
        while self.is_symbol("&&") {
            let line = self.line();
            self.advance();
            let rhs = self.parse_cmp()?;
            lhs = Expr::Binary {
                op: BinOp::And,
                left: Box::new(lhs),
                right: Box::new(rhs),
                ty: None,
                line,
            };
        }
        Ok(lhs)
    }

    fn parse_cmp(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_additive()?;
        while let TokenKind::Symbol(s) = &self.peek().kind {
            let op = match s.as_str() {
                "==" => BinOp::Eq,
                "!=" => BinOp::Ne,
                "<" => BinOp::Lt,
                "<=" => BinOp::Le,
                ">" => BinOp::Gt,
                ">=" => BinOp::Ge,
                _ => break,
            };
            let line = self.line();
            self.advance();
            let rhs = self.parse_additive()?;
            lhs = Expr::Binary {
                op,
                left: Box::new(lhs),
                right: Box::new(rhs),
                ty: None,
                line,
            };
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match &self.peek().kind {
                TokenKind::Symbol(s) if s == "+" => BinOp::Add,
                TokenKind::Symbol(s) if s == "-" => BinOp::Sub,
                _ => break,
            };
            let line = self.line();
            self.advance();
            let rhs = self.parse_multiplicative()?;
            lhs = Expr::Binary {
                op,
                left: Box::new(lhs),
                right: Box::new(rhs),
                ty: None,
                line,
            };
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match &self.peek().kind {
                TokenKind::Symbol(s) if s == "*" => BinOp::Mul,
                TokenKind::Symbol(s) if s == "/" => BinOp::Div,
                TokenKind::Symbol(s) if s == "%" => BinOp::Mod,
                _ => break,
            };
            let line = self.line();
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = Expr::Binary {
                op,
                left: Box::new(lhs),
                right: Box::new(rhs),
                ty: None,
                line,
            };
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> PResult<Expr> {
        let line = self.line();
        if self.is_symbol("-") {
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(Expr::Unary {
                op: UnOp::Neg,
                operand: Box::new(operand),
                ty: None,
                line,
            });
        }
        if self.is_symbol("!") {
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(Expr::Unary {
                op: UnOp::Not,
                operand: Box::new(operand),
                ty: None,
                line,
            });
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> PResult<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            let line = self.line();
            if self.is_symbol("[") {
                self.advance();
                let index = self.parse_expr()?;
                self.eat_symbol("]")?;
                expr = Expr::Index {
                    array: Box::new(expr),
                    index: Box::new(index),
                    ty: None,
                    line,
                };
            } else if self.is_symbol(".") {
                self.advance();
                let attr = self.eat_ident()?;
                if attr != "length" {
                    return Err((line, format!("unknown attribute '.{attr}'")));
                }
                expr = Expr::Length {
                    array: Box::new(expr),
                    line,
                };
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> PResult<Expr> {
        let line = self.line();
        if self.is_symbol("(") {
            self.advance();
            let expr = self.parse_expr()?;
            self.eat_symbol(")")?;
            return Ok(expr);
        }
        if self.is_symbol("true") {
            self.advance();
            return Ok(Expr::BoolLit { value: true, line });
        }
        if self.is_symbol("false") {
            self.advance();
            return Ok(Expr::BoolLit { value: false, line });
        }
        if self.is_symbol("new") {
            self.advance();
            let elem_ty = self.parse_base_type()?;
            self.eat_symbol("[")?;
            let count = self.parse_expr()?;
            self.eat_symbol("]")?;
            return Ok(Expr::NewArray {
                elem_ty,
                count: Box::new(count),
                line,
            });
        }
        match self.advance().kind {
            TokenKind::IntLit(value) => Ok(Expr::IntLit { value, line }),
            TokenKind::StringLit(value) => Ok(Expr::StringLit { value, line }),
            TokenKind::Ident(name) => {
                if self.is_symbol("(") {
                    self.advance();
                    let mut args = Vec::new();
                    if !self.is_symbol(")") {
                        loop {
                            args.push(self.parse_expr()?);
                            if self.is_symbol(",") {
                                self.advance();
                            } else {
                                break;
                            }
                        }
                    }
                    self.eat_symbol(")")?;
                    Ok(Expr::Call {
                        callee: name,
                        args,
                        ty: None,
                        line,
                    })
                } else {
                    Ok(Expr::Var {
                        name,
                        ty: None,
                        line,
                    })
                }
            }
            other => Err((line, format!("unexpected token {other:?}"))),
        }
    }
}

fn expr_to_lhs(expr: Expr, line: usize) -> PResult<Lhs> {
    match expr {
        Expr::Var { name, .. } => Ok(Lhs::Var { name, line }),
        Expr::Index { array, index, .. } => Ok(Lhs::Index {
            array,
            index,
            line,
        }),
        _ => Err((line, "invalid assignment target".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> Program {
        Parser::new(src).unwrap().parse_program().unwrap()
    }

    #[test]
    fn parses_minimal_main() {
        let program = parse("int main() { return 0; }");
        assert_eq!(program.functions.len(), 1);
        assert_eq!(program.functions[0].name(), "main");
    }

    #[test]
    fn parses_operator_precedence() {
        let program = parse("int main() { return 2 + 3 * 4; }");
        let FunDef::User { body, .. } = &program.functions[0] else {
            panic!("expected user function");
        };
        let Stmt::Block { stmts, .. } = body else {
            panic!("expected block");
        };
        let Stmt::Return { value, .. } = &stmts[0] else {
            panic!("expected return");
        };
        match value {
            Expr::Binary { op: BinOp::Add, right, .. } => {
                assert!(matches!(**right, Expr::Binary { op: BinOp::Mul, .. }));
            }
            other => panic!("expected top-level Add, got {other:?}"),
        }
    }

    #[test]
    fn desugars_increment() {
        let program = parse("int main() { int x = 0; x++; return x; }");
        let FunDef::User { body, .. } = &program.functions[0] else {
            panic!("expected user function");
        };
        let Stmt::Block { stmts, .. } = body else {
            panic!("expected block");
        };
        assert!(matches!(stmts[1], Stmt::Assign { .. }));
    }

    #[test]
    fn desugars_for_loop_to_while() {
        let program = parse("int main() { int[] a = new int[3]; for (int x : a) { } return 0; }");
        let FunDef::User { body, .. } = &program.functions[0] else {
            panic!("expected user function");
        };
        let Stmt::Block { stmts, .. } = body else {
            panic!("expected block");
        };
        // The desugared for-loop is itself a Block wrapping arr/idx decls + while.
        assert!(matches!(stmts[1], Stmt::Block { .. }));
    }

    #[test]
    fn parses_array_index_and_length() {
        let program = parse("int main() { int[] a = new int[3]; return a[0] + a.length; }");
        let FunDef::User { body, .. } = &program.functions[0] else {
            panic!("expected user function");
        };
        let Stmt::Block { stmts, .. } = body else {
            panic!("expected block");
        };
        assert!(matches!(stmts[0], Stmt::DeclInit { .. }));
    }

    #[test]
    fn syntax_error_reports_line() {
        let err = Parser::new("int main( { return 0; }")
            .unwrap()
            .parse_program()
            .unwrap_err();
        assert_eq!(err.0, 0);
    }
}
