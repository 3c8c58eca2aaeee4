//! Backend Intermediate Representation for the vesper compiler
//!
//! This module defines the SSA-level function shape the backend GC passes
//! operate on: basic blocks with predecessor/successor edges, values with
//! opcode-driven symbol effects, and the on-stack variables the liveness
//! analyzer tracks. The IR is produced by the SSA builder (out of tree) or by
//! `builder::FuncBuilder`, and is:
//! - Simple and explicit (no implicit operations)
//! - Strongly typed with explicit layout information (width, alignment,
//!   pointer locations)
//! - Stable under serialization for bundle dumps and debugging

pub mod blocks;
pub mod builder;
pub mod func;
pub mod heap_move;
pub mod types;
pub mod values;
pub mod vars;

pub use blocks::{Block, BlockId, BlockKind};
pub use builder::FuncBuilder;
pub use func::{Func, FuncId, Module};
pub use types::{IrType, StructField, PTR_WIDTH, REG_WIDTH};
pub use values::{Aux, Op, SymEffect, Value, ValueId};
pub use vars::{Escape, VarId, VarKind, Variable, BAD_OFFSET};

use serde::{Deserialize, Serialize};
use source_map::{FileId, SourcePosition, SourceSpan};

/// Source location information carried on IR entities for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IrSourceLocation {
    pub file_id: u32,
    pub line: u32,
    pub column: u32,
}

impl IrSourceLocation {
    pub fn new(file_id: u32, line: u32, column: u32) -> Self {
        Self { file_id, line, column }
    }

    pub fn unknown() -> Self {
        Self {
            file_id: 0,
            line: 0,
            column: 0,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.line == 0
    }

    /// Convert to a diagnostics span. The byte offset is unavailable this
    /// late in the pipeline; warning output only needs file, line, column.
    pub fn to_span(self) -> SourceSpan {
        SourceSpan::single_position(
            SourcePosition::new(self.line as usize, self.column as usize, 0),
            FileId::new(self.file_id as usize),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_location() {
        let loc = IrSourceLocation::unknown();
        assert!(loc.is_unknown());
        assert!(loc.to_span().is_unknown());
    }

    #[test]
    fn test_location_to_span() {
        let loc = IrSourceLocation::new(2, 14, 3);
        let span = loc.to_span();
        assert_eq!(span.start.line, 14);
        assert_eq!(span.start.column, 3);
        assert_eq!(span.file_id.as_usize(), 2);
    }
}
