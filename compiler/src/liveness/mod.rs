//! Garbage-collector liveness analysis
//!
//! For each function, computes — at every GC safe point — a pair of bitmaps
//! identifying which stack slots (arguments and locals) hold live pointers.
//! These bitmaps are the runtime contract with the collector: at a safe
//! point it scans exactly the slots marked live, so no live pointer may be
//! missed and no dead or uninitialized slot may be scanned.
//!
//! The analysis runs as a fixed pipeline over one function:
//!
//! 1. `prologue` — per-block upward-exposed-use / kill / address-taken-init
//!    summaries (solve.rs)
//! 2. `solve` — live-in/live-out and init-any/init-all fixed points
//! 3. `epilogue` — per-safe-point snapshot bitmaps, always-live slots for
//!    recovering defers, ambiguously-live detection (epilogue.rs)
//! 4. `compact` — dedup of identical bitmaps per call site (compact.rs)
//! 5. `emit` — the two runtime pointer-map symbols (ptrmap.rs, emit.rs)
//!
//! The debug surface mirrors the classic `-live` flag: level 1 reports live
//! variables at safe points and ambiguously-live slots as warnings, level 2
//! additionally dumps the full dataflow state (debug.rs).

pub mod bitvec;
pub mod compact;
pub mod debug;
pub mod effects;
pub mod emit;
pub mod epilogue;
pub mod ptrmap;
pub mod solve;

pub use bitvec::{BitVec, BlockBits, BlockSet, FNV_OFFSET, FNV_PRIME};

use crate::ir::{Func, Value, ValueId, VarId};
use crate::link::{LinkContext, LinkSymbol};
use diagnostics::Diagnostics;
use effects::EffectsCache;
use std::collections::HashMap;
use std::sync::Arc;

/// Whether the collector may observe the stack at `v`.
pub fn is_safe_point(v: &Value) -> bool {
    v.op.is_safe_point()
}

/// The result handed to the code emitter and linker.
#[derive(Debug)]
pub struct StackMaps {
    /// Safe point -> index into the compacted bitmap tables, used to tag
    /// PCDATA transitions.
    pub stack_map_index: HashMap<ValueId, usize>,

    /// Pointer bitmaps for the args region.
    pub args_sym: Arc<LinkSymbol>,

    /// Pointer bitmaps for the locals region.
    pub locals_sym: Arc<LinkSymbol>,
}

/// All state for one function's liveness analysis. Private to the analysis;
/// built, driven to completion, and discarded by [`liveness`].
pub struct Liveness<'a> {
    pub(crate) func: &'a mut Func,

    /// Tracked variables in declaration order.
    pub(crate) vars: Vec<VarId>,

    /// Side table: variable id -> dense index in `vars`, or -1.
    pub(crate) var_index: Vec<i32>,

    pub(crate) stkptrsize: i64,

    /// The seven per-block dataflow sets, bulk-allocated.
    pub(crate) bits: BlockBits,

    /// Per block: index into `livevars` of the last safe point within it.
    pub(crate) last_bitmap_index: Vec<i32>,

    /// One bitmap per safe point, plus the function-entry bitmap at index 0.
    /// Compaction shrinks this to the unique prefix.
    pub(crate) livevars: Vec<BitVec>,

    /// Safe point -> compacted bitmap index.
    pub(crate) stack_map_index: HashMap<ValueId, usize>,

    pub(crate) cache: EffectsCache,

    pub(crate) debug_level: u8,

    pub(crate) diags: &'a mut Diagnostics,
}

/// Scan the function's declaration list and collect the variables liveness
/// must track, assigning each its dense index in a side table. Each declared
/// variable is re-stamped with its owning function, which some
/// compiler-introduced names arrive without; `live_index` checks the stamp
/// before trusting an aux reference.
pub(crate) fn build_variables(func: &mut Func) -> (Vec<VarId>, Vec<i32>) {
    let mut vars = Vec::new();
    let mut index = vec![-1i32; func.vars.len()];
    for i in 0..func.decls.len() {
        let vid = func.decls[i];
        func.var_mut(vid).curfn = Some(func.id);
        if func.var(vid).should_track() {
            index[vid.index()] = vars.len() as i32;
            vars.push(vid);
        }
    }
    (vars, index)
}

impl<'a> Liveness<'a> {
    pub fn new(func: &'a mut Func, debug_level: u8, diags: &'a mut Diagnostics) -> Self {
        let (vars, var_index) = build_variables(func);
        let nvars = vars.len() as u32;
        let nblocks = func.blocks.len();
        let stkptrsize = func.stkptrsize;
        Self {
            func,
            vars,
            var_index,
            stkptrsize,
            bits: BlockBits::new(nvars, nblocks),
            last_bitmap_index: vec![-1; nblocks],
            livevars: Vec::new(),
            stack_map_index: HashMap::new(),
            cache: EffectsCache::default(),
            debug_level,
            diags,
        }
    }

    pub(crate) fn nvars(&self) -> u32 {
        self.vars.len() as u32
    }
}

/// Entry point for liveness analysis. Solves for the liveness of pointer
/// variables in the function, emits the runtime pointer-map symbols through
/// the link context, and returns the safe-point index map for the code
/// emitter.
pub fn liveness(
    func: &mut Func,
    link: &LinkContext,
    debug_level: u8,
    diags: &mut Diagnostics,
) -> StackMaps {
    log::debug!("liveness: analyzing {}", func.name);

    let mut lv = Liveness::new(func, debug_level, diags);

    lv.prologue();
    lv.solve();
    lv.epilogue();
    lv.compact();
    if lv.debug_level >= 2 {
        print!("{}", debug::dump(&lv));
    }

    let (args_sym, locals_sym) = lv.emit(link);
    StackMaps {
        stack_map_index: lv.stack_map_index,
        args_sym,
        locals_sym,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{FuncBuilder, IrType};

    #[test]
    fn test_build_variables_assigns_dense_indices() {
        let mut b = FuncBuilder::new("f");
        let x = b.param_in("x", IrType::ptr(IrType::Int64));
        let n = b.local("n", IrType::Int64);
        let p = b.local("p", IrType::String);
        let mut func = b.finish();

        let (vars, index) = build_variables(&mut func);
        assert_eq!(vars, vec![x, p]);
        assert_eq!(index[x.index()], 0);
        assert_eq!(index[n.index()], -1);
        assert_eq!(index[p.index()], 1);
    }

    #[test]
    #[should_panic(expected = "liveness cache initialized twice")]
    fn test_double_cache_init_panics() {
        let mut b = FuncBuilder::new("f");
        b.param_in("x", IrType::ptr(IrType::Int64));
        let mut func = b.finish();
        let mut diags = Diagnostics::new();
        let mut lv = Liveness::new(&mut func, 0, &mut diags);
        lv.init_cache();
        lv.init_cache();
    }

    #[test]
    fn test_cache_partitions_params() {
        let mut b = FuncBuilder::new("f");
        let x = b.param_in("x", IrType::ptr(IrType::Int64));
        let y = b.param_in("y", IrType::ptr(IrType::Int64));
        b.mark_addr_taken(y);
        let r = b.param_out("r", IrType::ptr(IrType::Int64));
        let s = b.param_out("s", IrType::ptr(IrType::Int64));
        b.mark_addr_taken(s);
        let _ = (x, r);
        let mut func = b.finish();
        let mut diags = Diagnostics::new();
        let mut lv = Liveness::new(&mut func, 0, &mut diags);
        lv.init_cache();

        // All incoming params re-read by tail returns; only the
        // address-taken one seeds the entry init set.
        assert_eq!(lv.cache.tail_uevar, vec![0, 1]);
        assert_eq!(lv.cache.text_avarinit_seed, vec![1]);
        // Only the non-address-taken result is read by a normal return.
        assert_eq!(lv.cache.ret_uevar, vec![2]);
    }
}
