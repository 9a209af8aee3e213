//! SSA construction and local optimization (spec §4.4).
//!
//! Runs per function, independently: insert phis for every address live
//! across a block boundary, rename loads/stores to SSA registers, fix up
//! the inserted phis' incoming values, eliminate the resulting `Assign`
//! placeholders, then fold constant binops to a fixed point.
//!
//! `noopt` instructions (array memory ops, spec §3) are left untouched by
//! every pass below — they are not candidates for SSA renaming.

use crate::ir::{BasicBlock, Instr, IrFunction, IrProgram, Value};
use std::collections::{HashMap, HashSet};

/// Draws `%name.N` registers from a per-original-name counter, matching
/// the one-counter-per-address scheme of the source optimizer.
#[derive(Default)]
struct LocGen {
    counters: HashMap<String, usize>,
}

impl LocGen {
    fn fresh(&mut self, base: &str) -> String {
        let n = self.counters.entry(base.to_string()).or_insert(0);
        *n += 1;
        format!("{base}.{n}")
    }
}

/// An address is live-in to a block if it is loaded before any store to
/// it within that block — scanning non-`noopt` `Load`/`Store` only.
fn live_in_addrs(block: &BasicBlock) -> Vec<String> {
    let mut live = Vec::new();
    let mut seen = HashSet::new();
    let mut stored = HashSet::new();
    for instr in &block.instrs {
        match instr {
            Instr::Load { addr: Value::Reg(a), noopt: false, .. }
                if !stored.contains(a) && seen.insert(a.clone()) => {
                    live.push(a.clone());
                }
            Instr::Store { addr: Value::Reg(a), noopt: false, .. } => {
                stored.insert(a.clone());
            }
            _ => {}
        }
    }
    live
}

/// A synthesized local-variable phi, placed at the front of a block
/// during the pre-pass. Distinguished from phis already present in the
/// incoming IR (from `&&`/`||` lowering) so the renaming pass knows which
/// ones still need their operand addresses turned into SSA values.
struct LocalPhi {
    address: String,
    ty_source_instr_index: usize,
}

fn optimize_function(f: &mut IrFunction) {
    // Phi pre-pass: one placeholder phi per live-in address, per block
    // with at least one predecessor.
    let mut local_phis: HashMap<String, Vec<LocalPhi>> = HashMap::new();
    for block in &f.blocks {
        if block.preds.is_empty() {
            continue;
        }
        let mut phis = Vec::new();
        for addr in live_in_addrs(block) {
            let ty_source_instr_index = f
                .blocks
                .iter()
                .flat_map(|b| &b.instrs)
                .position(|i| matches!(i, Instr::Alloc { dest, .. } if *dest == addr))
                .unwrap_or(0);
            phis.push(LocalPhi {
                address: addr,
                ty_source_instr_index,
            });
        }
        if !phis.is_empty() {
            local_phis.insert(block.label.clone(), phis);
        }
    }

    let alloc_types: HashMap<String, crate::types::Type> = f
        .blocks
        .iter()
        .flat_map(|b| &b.instrs)
        .filter_map(|i| match i {
            Instr::Alloc {
                dest,
                ty: crate::ir::MemType::Value(ty),
                noopt: false,
            } => Some((dest.clone(), ty.clone())),
            _ => None,
        })
        .collect();

    let mut locs = LocGen::default();
    // `phi_map[block][address] = current SSA name for address at the end
    // of `block` (or at the synthesized phi, for blocks that have one)`.
    let mut phi_map: HashMap<String, HashMap<String, String>> = HashMap::new();
    let mut rewritten: HashMap<String, Vec<Instr>> = HashMap::new();

    for block in &f.blocks {
        let mut out = Vec::new();
        let mut local_map: HashMap<String, String> = HashMap::new();

        if let Some(phis) = local_phis.get(&block.label) {
            for phi in phis {
                let name = locs.fresh(&phi.address);
                let ty = alloc_types
                    .get(&phi.address)
                    .cloned()
                    .unwrap_or(crate::types::Type::Int);
                let _ = phi.ty_source_instr_index;
                out.push(Instr::Phi {
                    dest: name.clone(),
                    ty,
                    // Placeholder: real incoming values are filled in by
                    // the fixup pass below, once every block's own
                    // `phi_map` entry has been recorded.
                    incoming: block
                        .preds
                        .iter()
                        .map(|p| (Value::reg(phi.address.clone()), p.clone()))
                        .collect(),
                });
                local_map.insert(phi.address.clone(), name);
            }
        }

        for instr in &block.instrs {
            match instr {
                Instr::Alloc { noopt: false, .. } => {}
                Instr::Store {
                    addr: Value::Reg(addr),
                    value,
                    noopt: false,
                    ..
                } => {
                    let name = locs.fresh(addr);
                    out.push(Instr::Assign {
                        dest: name.clone(),
                        value: value.clone(),
                    });
                    local_map.insert(addr.clone(), name);
                }
                Instr::Load {
                    dest,
                    addr: Value::Reg(addr),
                    noopt: false,
                    ..
                } => {
                    let current = local_map
                        .get(addr)
                        .cloned()
                        .unwrap_or_else(|| addr.clone());
                    out.push(Instr::Assign {
                        dest: dest.clone(),
                        value: Value::reg(current),
                    });
                }
                other => out.push(other.clone()),
            }
        }

        phi_map.insert(block.label.clone(), local_map);
        rewritten.insert(block.label.clone(), out);
    }

    // Phi fixup: resolve each synthesized phi's placeholder incoming
    // value per predecessor, recursing into predecessors that don't
    // define the address locally. `phi_map` entries are bound before
    // recursing so a cycle in the CFG can't loop forever.
    for (label, phis) in &local_phis {
        for phi in phis {
            let incoming: Vec<(Value, String)> = block_preds(f, label)
                .iter()
                .map(|pred| {
                    let v = resolve_phi_value(f, &mut phi_map, pred, &phi.address, &mut locs, &mut rewritten);
                    (v, pred.clone())
                })
                .collect();
            if let Some(instrs) = rewritten.get_mut(label)
                && let Some(Instr::Phi { dest, incoming: slot, .. }) =
                    instrs.iter_mut().find(|i| matches!(i, Instr::Phi { dest, .. } if *dest == locs_name_for(&phi_map, label, &phi.address)))
                {
                    let _ = dest;
                    *slot = incoming;
                }
        }
    }

    for block in &mut f.blocks {
        if let Some(instrs) = rewritten.remove(&block.label) {
            block.instrs = instrs;
        }
    }

    eliminate_assignments(f);
    fold_constants(f);
}

fn locs_name_for(phi_map: &HashMap<String, HashMap<String, String>>, label: &str, address: &str) -> String {
    phi_map
        .get(label)
        .and_then(|m| m.get(address))
        .cloned()
        .unwrap_or_default()
}

fn block_preds(f: &IrFunction, label: &str) -> Vec<String> {
    f.block(label).map(|b| b.preds.clone()).unwrap_or_default()
}

/// Looks up the SSA value live for `address` at the end of `label`. If
/// `label` doesn't define it locally (no store, no synthesized phi), the
/// search recurses into `label`'s own predecessors and a fresh phi is
/// synthesized there, single-predecessor phis degenerating to a plain
/// assignment of the predecessor's value.
fn resolve_phi_value(
    f: &IrFunction,
    phi_map: &mut HashMap<String, HashMap<String, String>>,
    label: &str,
    address: &str,
    locs: &mut LocGen,
    rewritten: &mut HashMap<String, Vec<Instr>>,
) -> Value {
    if let Some(name) = phi_map.get(label).and_then(|m| m.get(address)) {
        return Value::reg(name.clone());
    }

    let preds = block_preds(f, label);
    if preds.is_empty() {
        // No definition reaches here; the address was never stored on
        // this path. Fall back to its own name (uninitialized read).
        return Value::reg(address.to_string());
    }

    if preds.len() == 1 {
        let v = resolve_phi_value(f, phi_map, &preds[0], address, locs, rewritten);
        phi_map
            .entry(label.to_string())
            .or_default()
            .insert(address.to_string(), value_name(&v, address));
        return v;
    }

    // Bind a placeholder name before recursing so a predecessor cycle
    // resolves back to this same name instead of looping.
    let name = locs.fresh(address);
    phi_map
        .entry(label.to_string())
        .or_default()
        .insert(address.to_string(), name.clone());

    let incoming: Vec<(Value, String)> = preds
        .iter()
        .map(|p| {
            let v = resolve_phi_value(f, phi_map, p, address, locs, rewritten);
            (v, p.clone())
        })
        .collect();

    let ty = alloc_ty_hint(f, address);
    rewritten.entry(label.to_string()).or_default().insert(
        0,
        Instr::Phi {
            dest: name.clone(),
            ty,
            incoming,
        },
    );
    Value::reg(name)
}

fn alloc_ty_hint(f: &IrFunction, address: &str) -> crate::types::Type {
    f.blocks
        .iter()
        .flat_map(|b| &b.instrs)
        .find_map(|i| match i {
            Instr::Alloc {
                dest,
                ty: crate::ir::MemType::Value(ty),
                ..
            } if dest == address => Some(ty.clone()),
            _ => None,
        })
        .unwrap_or(crate::types::Type::Int)
}

fn value_name(v: &Value, fallback: &str) -> String {
    match v {
        Value::Reg(name) => name.clone(),
        Value::Int(_) => fallback.to_string(),
    }
}

/// Chases a `var_map` built from `Assign` instructions, then drops them.
fn eliminate_assignments(f: &mut IrFunction) {
    let mut var_map: HashMap<String, Value> = HashMap::new();
    for block in &f.blocks {
        for instr in &block.instrs {
            if let Instr::Assign { dest, value } = instr {
                var_map.insert(dest.clone(), value.clone());
            }
        }
    }

    fn chase(var_map: &HashMap<String, Value>, v: &Value) -> Value {
        match v {
            Value::Reg(name) => match var_map.get(name) {
                Some(next) if next != v => chase(var_map, next),
                _ => v.clone(),
            },
            Value::Int(_) => v.clone(),
        }
    }

    for block in &mut f.blocks {
        for instr in &mut block.instrs {
            rewrite_operands(instr, |v| *v = chase(&var_map, v));
        }
        block.instrs.retain(|i| !matches!(i, Instr::Assign { .. }));
    }
}

/// Applies `f` to every operand position of `instr` that can hold a
/// register name: binop/call/return/condbranch operands and phi incoming
/// values. Destinations and memory-op addresses are untouched.
fn rewrite_operands(instr: &mut Instr, mut f: impl FnMut(&mut Value)) {
    match instr {
        Instr::BinOp { lhs, rhs, .. } => {
            f(lhs);
            f(rhs);
        }
        Instr::Call { args, .. } => {
            for (_, v) in args {
                f(v);
            }
        }
        Instr::Return { value, .. } => f(value),
        Instr::CondBranch { cond, .. } => f(cond),
        Instr::Phi { incoming, .. } => {
            for (v, _) in incoming {
                f(v);
            }
        }
        Instr::Assign { value, .. } => f(value),
        _ => {}
    }
}

/// Fixed-point constant folding: repeatedly fold `BinOp`s whose operands
/// are both now literals, substituting the fold result everywhere and
/// dropping the instruction, until no more progress is made.
fn fold_constants(f: &mut IrFunction) {
    loop {
        let mut var_map: HashMap<String, Value> = HashMap::new();
        for block in &f.blocks {
            for instr in &block.instrs {
                if let Instr::BinOp { dest, op, lhs, rhs, .. } = instr
                    && let (Value::Int(a), Value::Int(b)) = (lhs, rhs)
                        && let Some(folded) = fold_binop(*op, *a, *b) {
                            var_map.insert(dest.clone(), Value::Int(folded));
                        }
            }
        }
        if var_map.is_empty() {
            break;
        }

        fn chase(var_map: &HashMap<String, Value>, v: &Value) -> Value {
            match v {
                Value::Reg(name) => match var_map.get(name) {
                    Some(Value::Int(n)) => Value::Int(*n),
                    _ => v.clone(),
                },
                Value::Int(_) => v.clone(),
            }
        }

        for block in &mut f.blocks {
            for instr in &mut block.instrs {
                rewrite_operands(instr, |v| *v = chase(&var_map, v));
            }
            block
                .instrs
                .retain(|i| !matches!(i, Instr::BinOp { dest, .. } if var_map.contains_key(dest)));
        }
    }
}

fn fold_binop(op: crate::ir::IrBinOp, a: i64, b: i64) -> Option<i64> {
    use crate::ir::IrBinOp::*;
    Some(match op {
        Add => a.wrapping_add(b),
        Sub => a.wrapping_sub(b),
        Mul => a.wrapping_mul(b),
        SDiv => {
            if b == 0 {
                return None;
            }
            a.wrapping_div(b)
        }
        SRem => {
            if b == 0 {
                return None;
            }
            a.wrapping_rem(b)
        }
        ICmpEq => (a == b) as i64,
        ICmpNe => (a != b) as i64,
        ICmpSlt => (a < b) as i64,
        ICmpSle => (a <= b) as i64,
        ICmpSgt => (a > b) as i64,
        ICmpSge => (a >= b) as i64,
    })
}

/// Runs SSA construction over every function in the program.
pub fn optimize_program(program: &mut IrProgram) {
    for f in &mut program.functions {
        optimize_function(f);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use crate::translator::translate_program;
    use crate::typechecker::TypeChecker;

    fn optimized(src: &str) -> IrProgram {
        let program = Parser::new(src).unwrap().parse_program().unwrap();
        let checked = TypeChecker::new().check(program).unwrap();
        let mut ir = translate_program(&checked);
        optimize_program(&mut ir);
        ir
    }

    #[test]
    fn straight_line_loads_eliminate_to_constants() {
        let ir = optimized("int main() { int x = 2; int y = 3; return x + y; }");
        let main = ir.functions.iter().find(|f| f.name == "main").unwrap();
        let has_alloc = main
            .blocks
            .iter()
            .flat_map(|b| &b.instrs)
            .any(|i| matches!(i, Instr::Alloc { noopt: false, .. }));
        assert!(!has_alloc);
        let returns_five = main.blocks.iter().flat_map(|b| &b.instrs).any(
            |i| matches!(i, Instr::Return { value: Value::Int(5), .. }),
        );
        assert!(returns_five);
    }

    #[test]
    fn while_loop_variable_becomes_a_phi() {
        let ir = optimized(
            "int main() { int x = 0; while (x < 10) { x = x + 1; } return x; }",
        );
        let main = ir.functions.iter().find(|f| f.name == "main").unwrap();
        let phi_count = main
            .blocks
            .iter()
            .flat_map(|b| &b.instrs)
            .filter(|i| matches!(i, Instr::Phi { .. }))
            .count();
        assert!(phi_count >= 1);
    }

    #[test]
    fn array_memory_ops_survive_untouched() {
        let ir = optimized("int main() { int[] a = new int[3]; a[0] = 7; return a[0]; }");
        let main = ir.functions.iter().find(|f| f.name == "main").unwrap();
        let noopt_count = main
            .blocks
            .iter()
            .flat_map(|b| &b.instrs)
            .filter(|i| {
                matches!(i, Instr::Store { noopt: true, .. }) || matches!(i, Instr::Load { noopt: true, .. })
            })
            .count();
        assert!(noopt_count > 0);
    }
}
