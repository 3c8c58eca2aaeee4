//! Basic blocks
//!
//! Blocks reference each other through predecessor/successor edge lists of
//! integer ids; the id doubles as the index into the function's block arena
//! and into the per-block state of the analysis passes.

use super::values::ValueId;
use super::IrSourceLocation;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for basic blocks; index into `Func::blocks`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockId(pub u32);

impl BlockId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bb{}", self.0)
    }
}

/// How control leaves a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockKind {
    /// Falls through to its successors
    Normal,

    /// Ordinary return: result parameters are read here
    Return,

    /// Tail-call return: re-presents all incoming parameters to the callee
    TailReturn,

    /// Process exit / unreachable end; nothing is live past it
    Exit,
}

/// A basic block: ordered values plus CFG edges.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    pub kind: BlockKind,

    /// Values in execution order
    pub values: Vec<ValueId>,

    /// Predecessors in the CFG
    pub preds: Vec<BlockId>,

    /// Successors in the CFG
    pub succs: Vec<BlockId>,

    pub loc: IrSourceLocation,
}

impl Block {
    pub fn new(id: BlockId, kind: BlockKind) -> Self {
        Self {
            id,
            kind,
            values: Vec::new(),
            preds: Vec::new(),
            succs: Vec::new(),
            loc: IrSourceLocation::unknown(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_display() {
        assert_eq!(format!("{}", BlockId(3)), "bb3");
    }

    #[test]
    fn test_block_new() {
        let b = Block::new(BlockId(0), BlockKind::Normal);
        assert!(b.values.is_empty());
        assert!(b.preds.is_empty());
        assert_eq!(b.kind, BlockKind::Normal);
    }
}
