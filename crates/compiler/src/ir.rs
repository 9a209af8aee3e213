//! Non-SSA, load/store IR (spec §3, §4.3).
//!
//! Built by the translator as a control-flow graph of basic blocks; the
//! SSA optimizer (`ssa.rs`) rewrites it in place. Modeled as tagged
//! variants, exhaustively matched, rather than class dispatch.

use crate::types::Type;

/// An operand: either an SSA/slot register name or an integer literal.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Reg(String),
    Int(i64),
}

impl Value {
    pub fn reg(name: impl Into<String>) -> Self {
        Value::Reg(name.into())
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Reg(name) => write!(f, "{name}"),
            Value::Int(v) => write!(f, "{v}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrBinOp {
    Add,
    Sub,
    Mul,
    SDiv,
    SRem,
    ICmpEq,
    ICmpNe,
    ICmpSlt,
    ICmpSle,
    ICmpSgt,
    ICmpSge,
}

impl std::fmt::Display for IrBinOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            IrBinOp::Add => "add",
            IrBinOp::Sub => "sub",
            IrBinOp::Mul => "mul",
            IrBinOp::SDiv => "sdiv",
            IrBinOp::SRem => "srem",
            IrBinOp::ICmpEq => "icmp eq",
            IrBinOp::ICmpNe => "icmp ne",
            IrBinOp::ICmpSlt => "icmp slt",
            IrBinOp::ICmpSle => "icmp sle",
            IrBinOp::ICmpSgt => "icmp sgt",
            IrBinOp::ICmpSge => "icmp sge",
        };
        write!(f, "{s}")
    }
}

/// One `(type, index)` pair in a `getelementptr` instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct GepIndex {
    pub ty: Type,
    pub index: Value,
}

/// The type moved by a `load`/`store`/`alloca`. Every pointer in the
/// emitted text is LLVM's opaque `ptr` (no pointee-typed pointers), so a
/// raw element/elements-field pointer carries no further type
/// information — it's represented by `Ptr` rather than as a `Type`
/// variant, since pointers are never a source-level value type (§3).
#[derive(Debug, Clone, PartialEq)]
pub enum MemType {
    Value(Type),
    Ptr,
}

impl From<Type> for MemType {
    fn from(ty: Type) -> Self {
        MemType::Value(ty)
    }
}

/// A single IR instruction. Memory operations (`Load`/`Store`/`Alloc`)
/// carry a `noopt` flag: the SSA optimizer leaves `noopt` instructions
/// untouched (array-carrying slots, spec §4.3/§4.4).
#[derive(Debug, Clone, PartialEq)]
pub enum Instr {
    BinOp {
        dest: String,
        op: IrBinOp,
        ty: Type,
        lhs: Value,
        rhs: Value,
    },
    Call {
        dest: Option<String>,
        ret: Type,
        callee: String,
        args: Vec<(Type, Value)>,
    },
    Alloc {
        dest: String,
        ty: MemType,
        noopt: bool,
    },
    AllocArray {
        dest: String,
        elem_ty: Type,
        count: Value,
        noopt: bool,
    },
    Load {
        dest: String,
        ty: MemType,
        addr: Value,
        noopt: bool,
    },
    Store {
        ty: MemType,
        value: Value,
        addr: Value,
        noopt: bool,
    },
    Gep {
        dest: String,
        base_ty: Type,
        base: Value,
        indices: Vec<GepIndex>,
    },
    /// Materializes the address of a pooled string constant as an `i8*`
    /// (spec §3 "String representation"). `len` is the constant's byte
    /// length including the trailing NUL, needed to spell its array type.
    GetGlobal {
        dest: String,
        global: String,
        len: usize,
    },
    Branch {
        target: String,
    },
    CondBranch {
        cond: Value,
        then_label: String,
        else_label: String,
    },
    Phi {
        dest: String,
        ty: Type,
        /// `(incoming value, predecessor label)`, in predecessor order.
        incoming: Vec<(Value, String)>,
    },
    /// A placeholder renaming introduced by the SSA pass, eliminated by
    /// assignment elimination before the optimizer returns.
    Assign {
        dest: String,
        value: Value,
    },
    Return {
        ty: Type,
        value: Value,
    },
    VoidReturn,
}

impl Instr {
    /// The register this instruction defines, if any.
    pub fn dest(&self) -> Option<&str> {
        match self {
            Instr::BinOp { dest, .. }
            | Instr::Alloc { dest, .. }
            | Instr::AllocArray { dest, .. }
            | Instr::Load { dest, .. }
            | Instr::Gep { dest, .. }
            | Instr::GetGlobal { dest, .. }
            | Instr::Phi { dest, .. }
            | Instr::Assign { dest, .. } => Some(dest),
            Instr::Call { dest, .. } => dest.as_deref(),
            Instr::Store { .. }
            | Instr::Branch { .. }
            | Instr::CondBranch { .. }
            | Instr::Return { .. }
            | Instr::VoidReturn => None,
        }
    }

    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            Instr::Branch { .. } | Instr::CondBranch { .. } | Instr::Return { .. } | Instr::VoidReturn
        )
    }
}

/// A straight-line sequence of instructions ending in one terminator.
/// Predecessor/successor sets are populated during construction and kept
/// as insertion-ordered vectors: phi operand order is observable in the
/// emitted text (spec §5).
#[derive(Debug, Clone, PartialEq)]
pub struct BasicBlock {
    pub label: String,
    pub instrs: Vec<Instr>,
    pub preds: Vec<String>,
    pub succs: Vec<String>,
}

impl BasicBlock {
    pub fn new(label: impl Into<String>) -> Self {
        BasicBlock {
            label: label.into(),
            instrs: Vec::new(),
            preds: Vec::new(),
            succs: Vec::new(),
        }
    }

    pub fn has_terminator(&self) -> bool {
        self.instrs.last().is_some_and(|i| i.is_terminator())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IrParam {
    pub name: String,
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IrFunction {
    pub name: String,
    pub ret: Type,
    pub params: Vec<IrParam>,
    pub blocks: Vec<BasicBlock>,
}

impl IrFunction {
    pub fn block_mut(&mut self, label: &str) -> Option<&mut BasicBlock> {
        self.blocks.iter_mut().find(|b| b.label == label)
    }

    pub fn block(&self, label: &str) -> Option<&BasicBlock> {
        self.blocks.iter().find(|b| b.label == label)
    }
}

/// A private, process-lifetime string constant (spec §3 "String
/// representation").
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalString {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct IrProgram {
    pub globals: Vec<GlobalString>,
    pub functions: Vec<IrFunction>,
    /// Names of the built-in runtime functions still reachable after
    /// pruning (spec §4.2) — only these get a `declare`.
    pub externs: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_has_terminator_detects_trailing_return() {
        let mut block = BasicBlock::new("entry");
        block.instrs.push(Instr::Return {
            ty: Type::Int,
            value: Value::Int(0),
        });
        assert!(block.has_terminator());
    }

    #[test]
    fn call_dest_is_optional() {
        let call = Instr::Call {
            dest: None,
            ret: Type::Void,
            callee: "printInt".to_string(),
            args: vec![(Type::Int, Value::Int(1))],
        };
        assert_eq!(call.dest(), None);
    }
}
