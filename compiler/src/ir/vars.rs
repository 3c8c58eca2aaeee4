//! On-stack variables
//!
//! A `Variable` is a named stack slot: an incoming or outgoing parameter or a
//! local. Variables are created by the frontend walk, may be rewritten to
//! heap-indirect storage by the escape rewriter, and are then sealed: the
//! liveness analyzer reads them and only flips `needs_zero`.

use super::types::IrType;
use super::{FuncId, IrSourceLocation};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a variable in its function's variable arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VarId(pub u32);

impl VarId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Storage class of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VarKind {
    /// Incoming parameter (caller-initialized args region slot)
    ParamIn,

    /// Result parameter (args region slot written before return)
    ParamOut,

    /// Function-local slot in the locals region
    Local,

    /// Storage moved to the heap; the slot itself no longer exists and is
    /// reached through the `heap_addr` pointer variable
    HeapIndirect,
}

/// Escape state propagated by escape analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Escape {
    /// Not yet decided
    Unknown,

    /// Provably never escapes (compiler temporaries)
    Never,

    /// Escapes; storage lives on the heap
    Heap,
}

/// Sentinel for a frame offset that has not been assigned yet.
pub const BAD_OFFSET: i64 = -1_000_000_000;

/// A named stack slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variable {
    /// Source-level name; compiler temporaries use the `.autotmp_N` scheme
    pub name: String,

    /// Layout type of the slot
    pub ty: IrType,

    /// Storage class
    pub kind: VarKind,

    /// Byte offset within the variable's region: args region for parameters,
    /// locals region (negative, below the frame pointer) for locals.
    /// `BAD_OFFSET` until frame layout assigns it.
    pub frame_offset: i64,

    /// Whether the variable's address is taken anywhere in the function
    pub addr_taken: bool,

    /// False once frame allocation has pruned the slot; pseudo-ops may still
    /// reference pruned variables and must be ignored
    pub used: bool,

    /// Compiler-introduced temporary (eligible for aggressive reuse)
    pub auto_temp: bool,

    /// Set by the liveness epilogue: the slot must be zeroed at function
    /// entry because it is only initialized on some paths
    pub needs_zero: bool,

    /// Escape state
    pub escape: Escape,

    /// For a heap-indirect variable or a parameter stack copy: the local
    /// pointer slot holding the heap address
    pub heap_addr: Option<VarId>,

    /// For a heap-moved parameter: the on-stack shadow used at entry/return
    pub stack_copy: Option<VarId>,

    /// This variable is the heap-address slot of a result parameter and must
    /// stay live for deferred recovery to write the result back
    pub is_output_param_heap_addr: bool,

    /// For a closure upvalue: the defining variable in the enclosing function
    pub closure_defn: Option<(FuncId, VarId)>,

    /// The function this variable belongs to. Stamped at declaration and
    /// re-stamped by the variable registry; analyses cross-check it before
    /// trusting an aux reference.
    pub curfn: Option<FuncId>,

    /// Declaration site
    pub loc: IrSourceLocation,
}

impl Variable {
    pub fn new(name: impl Into<String>, ty: IrType, kind: VarKind) -> Self {
        Self {
            name: name.into(),
            ty,
            kind,
            frame_offset: BAD_OFFSET,
            addr_taken: false,
            used: true,
            auto_temp: false,
            needs_zero: false,
            escape: Escape::Unknown,
            heap_addr: None,
            stack_copy: None,
            is_output_param_heap_addr: false,
            closure_defn: None,
            curfn: None,
            loc: IrSourceLocation::unknown(),
        }
    }

    pub fn is_param(&self) -> bool {
        matches!(self.kind, VarKind::ParamIn | VarKind::ParamOut)
    }

    /// The on-stack copy of a parameter that moved to the heap.
    pub fn is_param_stack_copy(&self) -> bool {
        self.is_param() && self.heap_addr.is_some()
    }

    /// The heap-resident copy of a parameter that moved to the heap.
    pub fn is_param_heap_copy(&self) -> bool {
        self.kind == VarKind::HeapIndirect && self.stack_copy.is_some()
    }

    /// Whether the liveness analysis tracks this variable: on-stack classes
    /// only, and only if the storage contains at least one pointer word.
    pub fn should_track(&self) -> bool {
        matches!(
            self.kind,
            VarKind::ParamIn | VarKind::ParamOut | VarKind::Local
        ) && self.ty.has_pointers()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_track() {
        let p = Variable::new("p", IrType::ptr(IrType::Int64), VarKind::Local);
        assert!(p.should_track());

        let n = Variable::new("n", IrType::Int64, VarKind::Local);
        assert!(!n.should_track());

        let mut h = Variable::new("x", IrType::ptr(IrType::Int64), VarKind::HeapIndirect);
        h.heap_addr = Some(VarId(3));
        assert!(!h.should_track());
    }

    #[test]
    fn test_param_copies() {
        let mut sc = Variable::new("x", IrType::String, VarKind::ParamIn);
        sc.heap_addr = Some(VarId(1));
        assert!(sc.is_param_stack_copy());
        assert!(!sc.is_param_heap_copy());

        let mut hc = Variable::new("x", IrType::String, VarKind::HeapIndirect);
        hc.stack_copy = Some(VarId(0));
        assert!(hc.is_param_heap_copy());
    }
}
