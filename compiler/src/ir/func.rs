//! Functions and modules
//!
//! A `Func` owns three arenas — variables, values, blocks — all addressed by
//! dense integer ids, plus the declaration list that fixes variable order for
//! the registry and the zeroing planner. A `Module` groups the functions of
//! one compilation unit so that closure upvalues can refer across functions.

use super::blocks::{Block, BlockId};
use super::types::{round_up, PTR_WIDTH};
use super::values::{Value, ValueId};
use super::vars::{VarId, VarKind, Variable};
use super::IrSourceLocation;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for functions within a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FuncId(pub u32);

impl FuncId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for FuncId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fn{}", self.0)
    }
}

/// One function's SSA body plus its frame information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Func {
    /// Identity within the module; `FuncId(0)` until a module adopts the
    /// function. Variables carry it back as `curfn` for cross-checks.
    pub id: FuncId,

    pub name: String,

    /// Variable arena, addressed by `VarId`
    pub vars: Vec<Variable>,

    /// Declaration order: parameters first (in, then out), then locals.
    /// The escape rewriter edits this list; `vars` indices stay stable.
    pub decls: Vec<VarId>,

    /// Value arena, addressed by `ValueId`
    pub values: Vec<Value>,

    /// Block arena, addressed by `BlockId`
    pub blocks: Vec<Block>,

    /// Entry block
    pub entry: BlockId,

    /// Whether the function contains a deferred call that could recover
    pub has_defer: bool,

    /// Size in bytes of the args region (incoming + result parameters)
    pub arg_width: i64,

    /// Size in bytes of the pointer-bearing locals region
    pub stkptrsize: i64,

    pub loc: IrSourceLocation,
}

impl Func {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: FuncId(0),
            name: name.into(),
            vars: Vec::new(),
            decls: Vec::new(),
            values: Vec::new(),
            blocks: Vec::new(),
            entry: BlockId(0),
            has_defer: false,
            arg_width: 0,
            stkptrsize: 0,
            loc: IrSourceLocation::unknown(),
        }
    }

    pub fn var(&self, id: VarId) -> &Variable {
        &self.vars[id.index()]
    }

    pub fn var_mut(&mut self, id: VarId) -> &mut Variable {
        &mut self.vars[id.index()]
    }

    pub fn value(&self, id: ValueId) -> &Value {
        &self.values[id.index()]
    }

    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.index()]
    }

    /// The stack variable backing a spill-slot value, if any.
    pub fn auto_var(&self, id: ValueId) -> Option<VarId> {
        self.value(id).aux.var_id()
    }

    /// Assign frame offsets and region sizes. Runs after escape rewriting;
    /// re-running it re-lays the frame (heap-indirect variables have no
    /// slot and are skipped).
    ///
    /// Parameters are laid out from offset 0 upward in declaration order,
    /// incoming before results. Used locals grow downward with negative
    /// offsets, pointer-bearing ones first so the region the collector
    /// scans is a compact prefix; `stkptrsize` covers exactly that prefix.
    /// Pruned locals keep BAD_OFFSET.
    pub fn layout_frame(&mut self) {
        let mut arg_off: i64 = 0;
        for kind in [VarKind::ParamIn, VarKind::ParamOut] {
            for i in 0..self.decls.len() {
                let vid = self.decls[i];
                let var = self.var(vid);
                if var.kind != kind {
                    continue;
                }
                let (w, a) = (var.ty.width(), var.ty.align());
                arg_off = round_up(arg_off, a);
                self.var_mut(vid).frame_offset = arg_off;
                arg_off += w;
            }
        }
        self.arg_width = round_up(arg_off, PTR_WIDTH);

        let mut local_off: i64 = 0;
        for pointer_pass in [true, false] {
            for i in 0..self.decls.len() {
                let vid = self.decls[i];
                let var = self.var(vid);
                if var.kind != VarKind::Local
                    || !var.used
                    || var.ty.has_pointers() != pointer_pass
                {
                    continue;
                }
                let (w, a) = (var.ty.width(), var.ty.align());
                local_off = round_up(local_off + w, a);
                self.var_mut(vid).frame_offset = -local_off;
            }
            if pointer_pass {
                self.stkptrsize = round_up(local_off, PTR_WIDTH);
            }
        }
    }

    /// Blocks in postorder of a DFS from the entry. Unreachable blocks are
    /// not included; the dataflow solvers never need to visit them.
    pub fn postorder(&self) -> Vec<BlockId> {
        let mut order = Vec::with_capacity(self.blocks.len());
        if self.blocks.is_empty() {
            return order;
        }
        let mut visited = vec![false; self.blocks.len()];
        // Stack of (block, next successor index to visit).
        let mut stack = vec![(self.entry, 0usize)];
        visited[self.entry.index()] = true;
        while let Some(&(b, next)) = stack.last() {
            let succs = &self.blocks[b.index()].succs;
            if next < succs.len() {
                stack.last_mut().unwrap().1 += 1;
                let s = succs[next];
                if !visited[s.index()] {
                    visited[s.index()] = true;
                    stack.push((s, 0));
                }
            } else {
                stack.pop();
                order.push(b);
            }
        }
        order
    }
}

/// A compilation unit's functions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Module {
    pub name: String,

    pub funcs: Vec<Func>,

    /// True when compiling the runtime package itself, where moving
    /// variables to the heap is forbidden
    pub compiling_runtime: bool,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            funcs: Vec::new(),
            compiling_runtime: false,
        }
    }

    /// Adopt a function, assigning its module-wide id and re-stamping its
    /// variables' `curfn` to match.
    pub fn add_func(&mut self, mut func: Func) -> FuncId {
        let id = FuncId(self.funcs.len() as u32);
        func.id = id;
        for var in &mut func.vars {
            var.curfn = Some(id);
        }
        self.funcs.push(func);
        id
    }

    pub fn func(&self, id: FuncId) -> &Func {
        &self.funcs[id.index()]
    }

    pub fn func_mut(&mut self, id: FuncId) -> &mut Func {
        &mut self.funcs[id.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::blocks::BlockKind;

    fn diamond() -> Func {
        // bb0 -> bb1, bb2; bb1 -> bb3; bb2 -> bb3
        let mut f = Func::new("diamond");
        for i in 0..4 {
            f.blocks.push(Block::new(BlockId(i), BlockKind::Normal));
        }
        f.blocks[3].kind = BlockKind::Return;
        let edges = [(0u32, 1u32), (0, 2), (1, 3), (2, 3)];
        for (a, b) in edges {
            f.blocks[a as usize].succs.push(BlockId(b));
            f.blocks[b as usize].preds.push(BlockId(a));
        }
        f
    }

    #[test]
    fn test_postorder_visits_entry_last() {
        let f = diamond();
        let po = f.postorder();
        assert_eq!(po.len(), 4);
        assert_eq!(*po.last().unwrap(), BlockId(0));
        // The merge block comes before both branches.
        let pos = |b: u32| po.iter().position(|&x| x == BlockId(b)).unwrap();
        assert!(pos(3) < pos(1));
        assert!(pos(3) < pos(2));
    }

    #[test]
    fn test_postorder_skips_unreachable() {
        let mut f = diamond();
        f.blocks.push(Block::new(BlockId(4), BlockKind::Normal));
        let po = f.postorder();
        assert_eq!(po.len(), 4);
        assert!(!po.contains(&BlockId(4)));
    }
}
