//! SSA values
//!
//! A `Value` is one SSA instruction: an opcode, an optional auxiliary symbol
//! (the stack variable or external function it touches), operand references,
//! and a source location. The GC passes never interpret the arithmetic ops;
//! they dispatch on each opcode's symbol effect and call flag.

use super::vars::VarId;
use super::IrSourceLocation;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Index of a value in its function's value arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValueId(pub u32);

impl ValueId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.0)
    }
}

/// How an opcode touches the variable named by its aux symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymEffect(u8);

impl SymEffect {
    pub const NONE: SymEffect = SymEffect(0);
    pub const READ: SymEffect = SymEffect(1);
    pub const WRITE: SymEffect = SymEffect(2);
    pub const ADDR: SymEffect = SymEffect(4);

    pub fn contains(self, other: SymEffect) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for SymEffect {
    type Output = SymEffect;
    fn bitor(self, rhs: SymEffect) -> SymEffect {
        SymEffect(self.0 | rhs.0)
    }
}

impl BitOrAssign for SymEffect {
    fn bitor_assign(&mut self, rhs: SymEffect) {
        self.0 |= rhs.0;
    }
}

/// Opcodes, reduced to what the backend GC passes dispatch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Op {
    /// Constant materialization
    Const,

    /// Register-to-register copy
    Copy,

    /// SSA phi
    Phi,

    /// Any pure computation (arithmetic, comparison, conversion)
    Compute,

    /// Load from the aux stack slot
    Load,

    /// Store to the aux stack slot
    Store,

    /// Memory-to-memory move touching the aux slot
    Move,

    /// Take the address of the aux slot
    Addr,

    /// Clear the aux slot through its address (write-only address use)
    Zero,

    /// Reload a spilled value; args[0] is the spill slot
    LoadReg,

    /// Spill a value to its backing stack slot (the aux symbol)
    StoreReg,

    /// Pseudo-op: the aux variable is about to be fully initialized
    VarDef,

    /// Pseudo-op: the aux variable is dead
    VarKill,

    /// Pseudo-op: the aux variable must be treated as live here
    VarLive,

    /// Pseudo-op: keep args[0]'s backing slot live past this point
    KeepAlive,

    /// Direct call to the extern symbol in aux
    StaticCall,

    /// Call through a closure value
    ClosureCall,

    /// Call through an interface method
    InterCall,

    /// Scheduler suspension point (not a call, still a GC safe point)
    Suspend,
}

impl Op {
    /// The symbol effect of the opcode on its aux variable. Pseudo-ops and
    /// spills report NONE here; effect classification special-cases them.
    pub fn sym_effect(self) -> SymEffect {
        match self {
            Op::Load => SymEffect::READ,
            Op::Store => SymEffect::WRITE,
            Op::Move => SymEffect::READ | SymEffect::WRITE,
            Op::Addr => SymEffect::ADDR,
            Op::Zero => SymEffect::ADDR | SymEffect::WRITE,
            _ => SymEffect::NONE,
        }
    }

    pub fn is_call(self) -> bool {
        matches!(self, Op::StaticCall | Op::ClosureCall | Op::InterCall)
    }

    /// Safe points are the instructions at which the collector may observe
    /// the stack: every call, plus scheduler suspensions.
    pub fn is_safe_point(self) -> bool {
        self.is_call() || self == Op::Suspend
    }
}

/// Auxiliary symbol of a value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Aux {
    /// No symbol
    None,

    /// External symbol (call target)
    Extern(String),

    /// Parameter slot
    Arg(VarId),

    /// Local slot
    Auto(VarId),
}

impl Aux {
    /// The stack variable named by this aux, if any.
    pub fn var_id(&self) -> Option<VarId> {
        match self {
            Aux::Arg(id) | Aux::Auto(id) => Some(*id),
            _ => None,
        }
    }
}

/// One SSA instruction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Value {
    pub op: Op,
    pub aux: Aux,
    pub args: Vec<ValueId>,
    pub loc: IrSourceLocation,
}

impl Value {
    pub fn new(op: Op, aux: Aux, args: Vec<ValueId>) -> Self {
        Self {
            op,
            aux,
            args,
            loc: IrSourceLocation::unknown(),
        }
    }
}
