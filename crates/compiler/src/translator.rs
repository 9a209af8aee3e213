//! IR translator (spec §4.3): lowers each checked function independently
//! to the non-SSA, load/store CFG-IR of `ir.rs`.
//!
//! `Builder` reproduces the predecessor-wiring-by-`succlabels` trick of
//! the teacher's bare-metal `Builder` class: a new block's predecessors
//! are discovered by scanning every earlier block's *pending* set of
//! branch targets, so the CFG comes out correct regardless of the order
//! blocks are visited in.

use crate::ast::{BinOp, Expr, FunDef, Lhs, Program, Stmt, UnOp};
use crate::ir::{BasicBlock, GepIndex, GlobalString, Instr, IrBinOp, IrFunction, IrParam, IrProgram, MemType, Value};
use crate::types::Type;
use std::collections::{HashMap, HashSet};

/// Global state shared across every function in one compilation: the
/// string-literal pool and the `@GN` name counter (spec §5). Threaded
/// explicitly rather than kept as process-wide statics.
#[derive(Default)]
struct GlobalCtx {
    global_counter: usize,
    string_pool: HashMap<String, String>,
    globals: Vec<GlobalString>,
}

impl GlobalCtx {
    fn fresh_global(&mut self) -> String {
        self.global_counter += 1;
        format!("@G{}", self.global_counter)
    }

    /// Pools `content`, returning its (possibly newly minted) global name.
    fn pool_string(&mut self, content: &str) -> String {
        if let Some(name) = self.string_pool.get(content) {
            return name.clone();
        }
        let name = self.fresh_global();
        self.string_pool.insert(content.to_string(), name.clone());
        self.globals.push(GlobalString {
            name: name.clone(),
            value: content.to_string(),
        });
        name
    }
}

/// Fresh-name supply for one function: `%tN` temps, `%locN` slots, `LN`
/// labels all draw from a single counter, as in the source translator.
#[derive(Default)]
struct IdGen(usize);

impl IdGen {
    fn fresh_temp(&mut self) -> String {
        self.0 += 1;
        format!("%t{}", self.0)
    }

    fn fresh_loc(&mut self) -> String {
        self.0 += 1;
        format!("%loc{}", self.0)
    }

    fn fresh_label(&mut self) -> String {
        self.0 += 1;
        format!("L{}", self.0)
    }
}

struct Builder {
    blocks: Vec<BasicBlock>,
    /// Parallel to `blocks`: branch targets emitted but not yet resolved
    /// into a successor edge because the target block doesn't exist yet.
    succlabels: Vec<HashSet<String>>,
    current: usize,
}

impl Builder {
    fn new(entry_label: String) -> Self {
        let mut builder = Builder {
            blocks: Vec::new(),
            succlabels: Vec::new(),
            current: 0,
        };
        builder.new_block(entry_label);
        builder
    }

    fn current_label(&self) -> String {
        self.blocks[self.current].label.clone()
    }

    fn add_stmt(&mut self, instr: Instr) {
        match &instr {
            Instr::Branch { target } => {
                self.succlabels[self.current].insert(target.clone());
            }
            Instr::CondBranch {
                then_label,
                else_label,
                ..
            } => {
                self.succlabels[self.current].insert(then_label.clone());
                self.succlabels[self.current].insert(else_label.clone());
            }
            _ => {}
        }
        self.blocks[self.current].instrs.push(instr);
    }

    fn new_block(&mut self, label: String) {
        let mut block = BasicBlock::new(label.clone());
        for i in 0..self.blocks.len() {
            if self.succlabels[i].remove(&label) {
                block.preds.push(self.blocks[i].label.clone());
                self.blocks[i].succs.push(label.clone());
            }
        }
        self.blocks.push(block);
        self.succlabels.push(HashSet::new());
        self.current = self.blocks.len() - 1;
    }

    fn finish(self) -> Vec<BasicBlock> {
        self.blocks
    }
}

/// Runtime ABI functions are declared with a `$`-free name (`_addStrings`
/// rather than `$addStrings`); every other callee keeps its source name.
fn runtime_symbol(name: &str) -> String {
    name.replace('$', "_")
}

struct FnTranslator<'a> {
    ctx: &'a mut GlobalCtx,
    ids: IdGen,
    builder: Builder,
}

impl<'a> FnTranslator<'a> {
    fn new(ctx: &'a mut GlobalCtx) -> Self {
        let mut ids = IdGen::default();
        let entry = ids.fresh_label();
        FnTranslator {
            ctx,
            ids,
            builder: Builder::new(entry),
        }
    }

    fn pool_string_value(&mut self, content: &str) -> Value {
        let global = self.ctx.pool_string(content);
        let dest = self.ids.fresh_temp();
        self.builder.add_stmt(Instr::GetGlobal {
            dest: dest.clone(),
            global,
            len: content.len() + 1,
        });
        Value::reg(dest)
    }

    fn translate_stmt(&mut self, stmt: &Stmt, env: &mut HashMap<String, String>) {
        match stmt {
            Stmt::Skip => {}
            Stmt::Decl { ty, name, .. } => {
                let default = self.default_value(ty);
                let loc = self.ids.fresh_loc();
                let noopt = matches!(ty, Type::Array(_));
                self.builder.add_stmt(Instr::Alloc {
                    dest: loc.clone(),
                    ty: ty.clone().into(),
                    noopt,
                });
                if let Some(default) = default {
                    self.builder.add_stmt(Instr::Store {
                        ty: ty.clone().into(),
                        value: default,
                        addr: Value::reg(loc.clone()),
                        noopt,
                    });
                }
                env.insert(name.clone(), loc);
            }
            Stmt::DeclInit { ty, name, value, .. } => {
                let v = self.translate_expr(value, env);
                let loc = self.ids.fresh_loc();
                let noopt = matches!(ty, Type::Array(_));
                self.builder.add_stmt(Instr::Alloc {
                    dest: loc.clone(),
                    ty: ty.clone().into(),
                    noopt,
                });
                self.builder.add_stmt(Instr::Store {
                    ty: ty.clone().into(),
                    value: v,
                    addr: Value::reg(loc.clone()),
                    noopt,
                });
                env.insert(name.clone(), loc);
            }
            Stmt::Assign { lhs, value, .. } => {
                let v = self.translate_expr(value, env);
                match lhs {
                    Lhs::Var { name, .. } => {
                        let addr = env.get(name).expect("resolved by the checker").clone();
                        let ty = value.array_ty();
                        let noopt = matches!(ty, Type::Array(_));
                        self.builder.add_stmt(Instr::Store {
                            ty: ty.into(),
                            value: v,
                            addr: Value::reg(addr),
                            noopt,
                        });
                    }
                    Lhs::Index { array, index, .. } => {
                        let (addr, elem_ty) = self.translate_elem_addr(array, index, env);
                        self.builder.add_stmt(Instr::Store {
                            ty: elem_ty.into(),
                            value: v,
                            addr,
                            noopt: true,
                        });
                    }
                }
            }
            Stmt::Return { value, .. } => {
                let v = self.translate_expr(value, env);
                self.builder.add_stmt(Instr::Return {
                    ty: value.array_ty(),
                    value: v,
                });
            }
            Stmt::VoidReturn { .. } => {
                self.builder.add_stmt(Instr::VoidReturn);
            }
            Stmt::If {
                cond, then_branch, ..
            } => {
                let ltrue = self.ids.fresh_label();
                let lfalse = self.ids.fresh_label();
                let cv = self.translate_expr(cond, env);
                self.builder.add_stmt(Instr::CondBranch {
                    cond: cv,
                    then_label: ltrue.clone(),
                    else_label: lfalse.clone(),
                });
                self.builder.new_block(ltrue);
                let mut then_env = env.clone();
                self.translate_stmt(then_branch, &mut then_env);
                if !then_branch.returns() {
                    self.builder.add_stmt(Instr::Branch {
                        target: lfalse.clone(),
                    });
                }
                self.builder.new_block(lfalse);
            }
            Stmt::IfElse {
                cond,
                then_branch,
                else_branch,
                ..
            } => {
                let ltrue = self.ids.fresh_label();
                let lfalse = self.ids.fresh_label();
                let cv = self.translate_expr(cond, env);
                self.builder.add_stmt(Instr::CondBranch {
                    cond: cv,
                    then_label: ltrue.clone(),
                    else_label: lfalse.clone(),
                });
                let overall_returns = then_branch.returns() && else_branch.returns();
                let lend = if overall_returns {
                    None
                } else {
                    Some(self.ids.fresh_label())
                };

                self.builder.new_block(ltrue);
                let mut then_env = env.clone();
                self.translate_stmt(then_branch, &mut then_env);
                if !then_branch.returns() {
                    self.builder.add_stmt(Instr::Branch {
                        target: lend.clone().expect("join block exists when a branch falls through"),
                    });
                }

                self.builder.new_block(lfalse);
                let mut else_env = env.clone();
                self.translate_stmt(else_branch, &mut else_env);
                if !else_branch.returns() {
                    self.builder.add_stmt(Instr::Branch {
                        target: lend.clone().expect("join block exists when a branch falls through"),
                    });
                    self.builder.new_block(lend.expect("just checked"));
                }
            }
            Stmt::While { cond, body, .. } => {
                let lcond = self.ids.fresh_label();
                let ltrue = self.ids.fresh_label();
                let lfalse = self.ids.fresh_label();
                self.builder.add_stmt(Instr::Branch {
                    target: lcond.clone(),
                });
                self.builder.new_block(lcond.clone());
                let cv = self.translate_expr(cond, env);
                self.builder.add_stmt(Instr::CondBranch {
                    cond: cv,
                    then_label: ltrue.clone(),
                    else_label: lfalse.clone(),
                });
                self.builder.new_block(ltrue);
                let mut body_env = env.clone();
                self.translate_stmt(body, &mut body_env);
                self.builder.add_stmt(Instr::Branch { target: lcond });
                self.builder.new_block(lfalse);
            }
            Stmt::WhileTrue { body, .. } => {
                let lstart = self.ids.fresh_label();
                self.builder.add_stmt(Instr::Branch {
                    target: lstart.clone(),
                });
                self.builder.new_block(lstart.clone());
                let mut body_env = env.clone();
                self.translate_stmt(body, &mut body_env);
                if !body.returns() {
                    self.builder.add_stmt(Instr::Branch { target: lstart });
                }
            }
            Stmt::ExprStmt { value, .. } => {
                self.translate_expr(value, env);
            }
            Stmt::Block { stmts, .. } => {
                let mut env = env.clone();
                for s in stmts {
                    self.translate_stmt(s, &mut env);
                    if s.returns() {
                        break;
                    }
                }
            }
        }
    }

    fn default_value(&mut self, ty: &Type) -> Option<Value> {
        match ty {
            Type::Int | Type::Bool => Some(Value::Int(0)),
            Type::String => Some(self.pool_string_value("")),
            Type::Array(_) => None,
            Type::Void => unreachable!("void local declarations are rejected by the checker"),
        }
    }

    fn translate_expr(&mut self, expr: &Expr, env: &HashMap<String, String>) -> Value {
        match expr {
            Expr::IntLit { value, .. } => Value::Int(*value),
            Expr::BoolLit { value, .. } => Value::Int(*value as i64),
            Expr::StringLit { value, .. } => self.pool_string_value(value),
            Expr::Var { name, ty, line } => {
                let addr = env
                    .get(name)
                    .unwrap_or_else(|| panic!("unresolved variable '{name}' at line {line}"))
                    .clone();
                let dest = self.ids.fresh_temp();
                let var_ty = ty.clone().expect("checker assigns every variable a type");
                let noopt = matches!(var_ty, Type::Array(_));
                self.builder.add_stmt(Instr::Load {
                    dest: dest.clone(),
                    ty: var_ty.into(),
                    addr: Value::reg(addr),
                    noopt,
                });
                Value::reg(dest)
            }
            Expr::Unary { op, operand, line, .. } => {
                let v = self.translate_expr(operand, env);
                let dest = self.ids.fresh_temp();
                let (irop, ty, lhs, rhs) = match op {
                    UnOp::Neg => (IrBinOp::Sub, Type::Int, Value::Int(0), v),
                    UnOp::Not => (IrBinOp::ICmpEq, Type::Bool, v, Value::Int(0)),
                };
                let _ = line;
                self.builder.add_stmt(Instr::BinOp {
                    dest: dest.clone(),
                    op: irop,
                    ty,
                    lhs,
                    rhs,
                });
                Value::reg(dest)
            }
            Expr::Binary {
                op, left, right, ..
            } => self.translate_binary(*op, left, right, env),
            Expr::Call { callee, args, ty, .. } => {
                let ret = ty.clone().expect("checker assigns every call a type");
                let mut arg_vals = Vec::with_capacity(args.len());
                for a in args {
                    let v = self.translate_expr(a, env);
                    arg_vals.push((a.array_ty(), v));
                }
                let dest = if ret == Type::Void {
                    None
                } else {
                    Some(self.ids.fresh_temp())
                };
                self.builder.add_stmt(Instr::Call {
                    dest: dest.clone(),
                    ret,
                    callee: runtime_symbol(callee),
                    args: arg_vals,
                });
                dest.map(Value::reg).unwrap_or(Value::Int(0))
            }
            Expr::Index { array, index, .. } => {
                let (addr, elem_ty) = self.translate_elem_addr(array, index, env);
                let dest = self.ids.fresh_temp();
                self.builder.add_stmt(Instr::Load {
                    dest: dest.clone(),
                    ty: elem_ty.into(),
                    addr,
                    noopt: true,
                });
                Value::reg(dest)
            }
            Expr::Length { array, .. } => {
                let array_ty = array.array_ty();
                let base = self.translate_expr(array, env);
                let field_addr = self.ids.fresh_temp();
                self.builder.add_stmt(Instr::Gep {
                    dest: field_addr.clone(),
                    base_ty: array_ty,
                    base,
                    indices: vec![
                        GepIndex {
                            ty: Type::Int,
                            index: Value::Int(0),
                        },
                        GepIndex {
                            ty: Type::Int,
                            index: Value::Int(0),
                        },
                    ],
                });
                let dest = self.ids.fresh_temp();
                self.builder.add_stmt(Instr::Load {
                    dest: dest.clone(),
                    ty: Type::Int.into(),
                    addr: Value::reg(field_addr),
                    noopt: true,
                });
                Value::reg(dest)
            }
            Expr::NewArray { elem_ty, count, .. } => {
                let n = self.translate_expr(count, env);
                let elements = self.ids.fresh_loc();
                self.builder.add_stmt(Instr::AllocArray {
                    dest: elements.clone(),
                    elem_ty: elem_ty.clone(),
                    count: n.clone(),
                    noopt: true,
                });
                let struct_ty = Type::array_of(elem_ty.clone());
                let slot = self.ids.fresh_loc();
                self.builder.add_stmt(Instr::Alloc {
                    dest: slot.clone(),
                    ty: struct_ty.clone().into(),
                    noopt: true,
                });
                let elements_field = self.ids.fresh_temp();
                self.builder.add_stmt(Instr::Gep {
                    dest: elements_field.clone(),
                    base_ty: struct_ty.clone(),
                    base: Value::reg(slot.clone()),
                    indices: vec![
                        GepIndex {
                            ty: Type::Int,
                            index: Value::Int(0),
                        },
                        GepIndex {
                            ty: Type::Int,
                            index: Value::Int(1),
                        },
                    ],
                });
                self.builder.add_stmt(Instr::Store {
                    ty: MemType::Ptr,
                    value: Value::reg(elements),
                    addr: Value::reg(elements_field),
                    noopt: true,
                });
                let length_field = self.ids.fresh_temp();
                self.builder.add_stmt(Instr::Gep {
                    dest: length_field.clone(),
                    base_ty: struct_ty.clone(),
                    base: Value::reg(slot.clone()),
                    indices: vec![
                        GepIndex {
                            ty: Type::Int,
                            index: Value::Int(0),
                        },
                        GepIndex {
                            ty: Type::Int,
                            index: Value::Int(0),
                        },
                    ],
                });
                self.builder.add_stmt(Instr::Store {
                    ty: Type::Int.into(),
                    value: n,
                    addr: Value::reg(length_field),
                    noopt: true,
                });
                let dest = self.ids.fresh_temp();
                self.builder.add_stmt(Instr::Load {
                    dest: dest.clone(),
                    ty: struct_ty.into(),
                    addr: Value::reg(slot),
                    noopt: true,
                });
                Value::reg(dest)
            }
        }
    }

    /// Lowers `a[i]` to the address of the indexed element: GEP the
    /// `elements` field, load the raw pointer, GEP the element.
    fn translate_elem_addr(
        &mut self,
        array: &Expr,
        index: &Expr,
        env: &HashMap<String, String>,
    ) -> (Value, Type) {
        let array_ty = array.array_ty();
        let elem_ty = array_ty
            .element_type()
            .expect("checker guarantees indexing targets an array")
            .clone();
        let base = self.translate_expr(array, env);
        let field_addr = self.ids.fresh_temp();
        self.builder.add_stmt(Instr::Gep {
            dest: field_addr.clone(),
            base_ty: array_ty,
            base,
            indices: vec![
                GepIndex {
                    ty: Type::Int,
                    index: Value::Int(0),
                },
                GepIndex {
                    ty: Type::Int,
                    index: Value::Int(1),
                },
            ],
        });
        let elements = self.ids.fresh_temp();
        self.builder.add_stmt(Instr::Load {
            dest: elements.clone(),
            ty: MemType::Ptr,
            addr: Value::reg(field_addr),
            noopt: true,
        });
        let idx = self.translate_expr(index, env);
        let elem_addr = self.ids.fresh_temp();
        self.builder.add_stmt(Instr::Gep {
            dest: elem_addr.clone(),
            base_ty: elem_ty.clone(),
            base: Value::reg(elements),
            indices: vec![GepIndex {
                ty: Type::Int,
                index: idx,
            }],
        });
        (Value::reg(elem_addr), elem_ty)
    }

    fn translate_binary(&mut self, op: BinOp, left: &Expr, right: &Expr, env: &HashMap<String, String>) -> Value {
        if matches!(op, BinOp::And | BinOp::Or) {
            return self.translate_short_circuit(op, left, right, env);
        }
        if *left.ty() == Type::String {
            let lv = self.translate_expr(left, env);
            let rv = self.translate_expr(right, env);
            let dest = self.ids.fresh_temp();
            if op == BinOp::Add {
                self.builder.add_stmt(Instr::Call {
                    dest: Some(dest.clone()),
                    ret: Type::String,
                    callee: "_addStrings".to_string(),
                    args: vec![(Type::String, lv), (Type::String, rv)],
                });
            } else {
                self.builder.add_stmt(Instr::Call {
                    dest: Some(dest.clone()),
                    ret: Type::Bool,
                    callee: "_compareStrings".to_string(),
                    args: vec![
                        (Type::Int, Value::Int(op.compare_op_id())),
                        (Type::String, lv),
                        (Type::String, rv),
                    ],
                });
            }
            return Value::reg(dest);
        }
        let lv = self.translate_expr(left, env);
        let rv = self.translate_expr(right, env);
        let operand_ty = left.ty().clone();
        let irop = map_int_binop(op);
        let dest = self.ids.fresh_temp();
        self.builder.add_stmt(Instr::BinOp {
            dest: dest.clone(),
            op: irop,
            ty: operand_ty,
            lhs: lv,
            rhs: rv,
        });
        Value::reg(dest)
    }

    /// `&&`/`||` evaluate the left side, branch, evaluate the right side
    /// only if needed, and join with a two-input phi (spec §4.3).
    fn translate_short_circuit(
        &mut self,
        op: BinOp,
        left: &Expr,
        right: &Expr,
        env: &HashMap<String, String>,
    ) -> Value {
        let lv = self.translate_expr(left, env);
        let left_block = self.builder.current_label();
        let lnext = self.ids.fresh_label();
        let lend = self.ids.fresh_label();
        let short_circuit_value = if op == BinOp::Or { 1 } else { 0 };
        if op == BinOp::And {
            self.builder.add_stmt(Instr::CondBranch {
                cond: lv,
                then_label: lnext.clone(),
                else_label: lend.clone(),
            });
        } else {
            self.builder.add_stmt(Instr::CondBranch {
                cond: lv,
                then_label: lend.clone(),
                else_label: lnext.clone(),
            });
        }
        self.builder.new_block(lnext);
        let rv = self.translate_expr(right, env);
        let right_block = self.builder.current_label();
        self.builder.add_stmt(Instr::Branch {
            target: lend.clone(),
        });
        self.builder.new_block(lend);
        let dest = self.ids.fresh_temp();
        self.builder.add_stmt(Instr::Phi {
            dest: dest.clone(),
            ty: Type::Bool,
            incoming: vec![(Value::Int(short_circuit_value), left_block), (rv, right_block)],
        });
        Value::reg(dest)
    }
}

fn map_int_binop(op: BinOp) -> IrBinOp {
    match op {
        BinOp::Add => IrBinOp::Add,
        BinOp::Sub => IrBinOp::Sub,
        BinOp::Mul => IrBinOp::Mul,
        BinOp::Div => IrBinOp::SDiv,
        BinOp::Mod => IrBinOp::SRem,
        BinOp::Lt => IrBinOp::ICmpSlt,
        BinOp::Le => IrBinOp::ICmpSle,
        BinOp::Gt => IrBinOp::ICmpSgt,
        BinOp::Ge => IrBinOp::ICmpSge,
        BinOp::Eq => IrBinOp::ICmpEq,
        BinOp::Ne => IrBinOp::ICmpNe,
        BinOp::And | BinOp::Or => unreachable!("short-circuit operators never reach map_int_binop"),
    }
}

fn translate_function(f: &FunDef, ctx: &mut GlobalCtx) -> IrFunction {
    let FunDef::User {
        name,
        params,
        ret,
        body,
        ..
    } = f
    else {
        unreachable!("builtins have no body to translate");
    };

    let mut tr = FnTranslator::new(ctx);
    let mut env = HashMap::new();
    let mut ir_params = Vec::with_capacity(params.len());
    for p in params {
        let arg_tmp = tr.ids.fresh_temp();
        let arg_loc = tr.ids.fresh_loc();
        let noopt = matches!(p.ty, Type::Array(_));
        tr.builder.add_stmt(Instr::Alloc {
            dest: arg_loc.clone(),
            ty: p.ty.clone().into(),
            noopt,
        });
        tr.builder.add_stmt(Instr::Store {
            ty: p.ty.clone().into(),
            value: Value::reg(arg_tmp.clone()),
            addr: Value::reg(arg_loc.clone()),
            noopt,
        });
        env.insert(p.name.clone(), arg_loc);
        ir_params.push(IrParam {
            name: arg_tmp,
            ty: p.ty.clone(),
        });
    }

    tr.translate_stmt(body, &mut env);
    if !body.returns() {
        tr.builder.add_stmt(Instr::VoidReturn);
    }

    IrFunction {
        name: name.clone(),
        ret: ret.clone(),
        params: ir_params,
        blocks: tr.builder.finish(),
    }
}

/// Translates every reachable user function of a checked program to IR.
/// Built-in declarations never get a function body (spec §3).
pub fn translate_program(program: &Program) -> IrProgram {
    let mut ctx = GlobalCtx::default();
    let mut functions = Vec::new();
    let mut externs = Vec::new();
    for f in &program.functions {
        match f {
            FunDef::User { .. } => functions.push(translate_function(f, &mut ctx)),
            FunDef::Builtin { name, .. } => externs.push(runtime_symbol(name)),
        }
    }
    IrProgram {
        globals: ctx.globals,
        functions,
        externs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use crate::typechecker::TypeChecker;

    fn translate(src: &str) -> IrProgram {
        let program = Parser::new(src).unwrap().parse_program().unwrap();
        let checked = TypeChecker::new().check(program).unwrap();
        translate_program(&checked)
    }

    #[test]
    fn main_entry_block_ends_with_return() {
        let ir = translate("int main() { return 2 + 3 * 4; }");
        let main = ir.functions.iter().find(|f| f.name == "main").unwrap();
        let entry = &main.blocks[0];
        assert!(matches!(entry.instrs.last(), Some(Instr::Return { .. })));
    }

    #[test]
    fn string_concat_lowers_to_runtime_call() {
        let ir = translate(
            "string concat(string a, string b) { return a + b; } int main() { printString(concat(\"a\", \"b\")); return 0; }",
        );
        let concat = ir.functions.iter().find(|f| f.name == "concat").unwrap();
        let has_call = concat.blocks.iter().any(|b| {
            b.instrs.iter().any(
                |i| matches!(i, Instr::Call { callee, .. } if callee == "_addStrings"),
            )
        });
        assert!(has_call);
        assert_eq!(ir.globals.len(), 2);
    }

    #[test]
    fn while_loop_builds_back_edge() {
        let ir = translate(
            "int main() { int x = 0; while (x < 10) { x = x + 1; } return x; }",
        );
        let main = ir.functions.iter().find(|f| f.name == "main").unwrap();
        assert!(main.blocks.len() >= 4);
    }

    #[test]
    fn array_new_and_index_use_noopt_memory_ops() {
        let ir = translate("int main() { int[] a = new int[3]; a[0] = 7; return a[0]; }");
        let main = ir.functions.iter().find(|f| f.name == "main").unwrap();
        let noopt_stores = main.blocks.iter().flat_map(|b| &b.instrs).filter(|i| {
            matches!(i, Instr::Store { noopt: true, .. }) || matches!(i, Instr::Load { noopt: true, .. })
        });
        assert!(noopt_stores.count() > 0);
    }
}
