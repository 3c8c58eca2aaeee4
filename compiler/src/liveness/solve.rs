//! Dataflow prologue and solve
//!
//! The prologue summarizes each block in isolation; the solver then pushes
//! the address-taken init sets forward and the liveness sets backward to
//! their fixed points. Both transfer functions are monotonic on finite
//! lattices, so the round-robin loops terminate; walking blocks in the
//! general direction of propagation (RPO forward, PO backward) only speeds
//! convergence up.

use super::bitvec::{BitVec, BlockSet};
use super::effects::Effect;
use super::Liveness;
use crate::ir::{BlockId, BlockKind};

impl Liveness<'_> {
    /// Initialize the per-block sets: a backward sweep accumulates
    /// upward-exposed uses and kills, a forward sweep the address-taken
    /// init bits (`avarinit` describes the state at block exit).
    pub(crate) fn prologue(&mut self) {
        self.init_cache();

        for b in 0..self.func.blocks.len() {
            for j in (0..self.func.blocks[b].values.len()).rev() {
                let vid = self.func.blocks[b].values[j];
                let (pos, e) = self.value_effects(vid);
                if e.contains(Effect::KILL) {
                    self.bits.set(b, BlockSet::Varkill, pos as u32);
                    self.bits.unset(b, BlockSet::Uevar, pos as u32);
                }
                if e.contains(Effect::USE) {
                    self.bits.set(b, BlockSet::Uevar, pos as u32);
                }
            }

            for j in 0..self.func.blocks[b].values.len() {
                let vid = self.func.blocks[b].values[j];
                let (pos, e) = self.value_effects(vid);
                if e.contains(Effect::KILL) {
                    self.bits.unset(b, BlockSet::Avarinit, pos as u32);
                }
                if e.contains(Effect::ADDRINIT) {
                    self.bits.set(b, BlockSet::Avarinit, pos as u32);
                }
            }
        }
    }

    /// Compute the init-any/init-all state at entry to `b` from its
    /// predecessors' at-exit sets. The entry block starts from the
    /// caller-initialized seed; an unreachable block starts empty.
    pub(crate) fn avarinit_any_all(&self, b: BlockId, any: &mut BitVec, all: &mut BitVec) {
        let block = self.func.block(b);
        if block.preds.is_empty() {
            any.clear();
            all.clear();
            if b == self.func.entry {
                for &pos in &self.cache.text_avarinit_seed {
                    any.set(pos);
                    all.set(pos);
                }
            }
            return;
        }

        let first = block.preds[0].index();
        any.copy_words(self.bits.row(first, BlockSet::AvarinitAny));
        all.copy_words(self.bits.row(first, BlockSet::AvarinitAll));
        for &pred in &block.preds[1..] {
            any.or_words(self.bits.row(pred.index(), BlockSet::AvarinitAny));
            all.and_words(self.bits.row(pred.index(), BlockSet::AvarinitAll));
        }
    }

    /// Solve the dataflow equations for both lattices.
    pub(crate) fn solve(&mut self) {
        // Temporaries reused across iterations to avoid churn in the loop.
        let nvars = self.nvars();
        let mut newlivein = BitVec::new(nvars);
        let mut newliveout = BitVec::new(nvars);
        let mut any = BitVec::new(nvars);
        let mut all = BitVec::new(nvars);

        // Push avarinitall/avarinitany forward.
        // avarinitall: the addressed var is initialized along all paths
        // reaching the block exit; avarinitany: along some path.
        for b in 0..self.func.blocks.len() {
            if BlockId(b as u32) == self.func.entry {
                self.bits.copy_row(b, BlockSet::AvarinitAll, BlockSet::Avarinit);
            } else {
                self.bits.fill_row(b, BlockSet::AvarinitAll);
            }
            self.bits.copy_row(b, BlockSet::AvarinitAny, BlockSet::Avarinit);
        }

        let po = self.func.postorder();

        let mut change = true;
        while change {
            change = false;
            for i in (0..po.len()).rev() {
                let b = po[i];
                let bi = b.index();
                self.avarinit_any_all(b, &mut any, &mut all);

                any.and_not_words(self.bits.row(bi, BlockSet::Varkill));
                all.and_not_words(self.bits.row(bi, BlockSet::Varkill));
                any.or_words(self.bits.row(bi, BlockSet::Avarinit));
                all.or_words(self.bits.row(bi, BlockSet::Avarinit));

                if !any.eq_words(self.bits.row(bi, BlockSet::AvarinitAny)) {
                    change = true;
                    self.bits.store(bi, BlockSet::AvarinitAny, &any);
                }
                if !all.eq_words(self.bits.row(bi, BlockSet::AvarinitAll)) {
                    change = true;
                    self.bits.store(bi, BlockSet::AvarinitAll, &all);
                }
            }
        }

        // Pull liveness backward in reverse round-robin fashion. The
        // iteration count is low enough that a work queue is not worth it.
        let mut change = true;
        while change {
            change = false;
            for &b in &po {
                let bi = b.index();

                newliveout.clear();
                match self.func.block(b).kind {
                    BlockKind::Return => {
                        for &pos in &self.cache.ret_uevar {
                            newliveout.set(pos);
                        }
                    }
                    BlockKind::TailReturn => {
                        for &pos in &self.cache.tail_uevar {
                            newliveout.set(pos);
                        }
                    }
                    BlockKind::Exit => {}
                    BlockKind::Normal => {
                        // out[b] = union of in[s] over successors s.
                        for &succ in &self.func.block(b).succs {
                            newliveout.or_words(self.bits.row(succ.index(), BlockSet::Livein));
                        }
                    }
                }

                if !newliveout.eq_words(self.bits.row(bi, BlockSet::Liveout)) {
                    change = true;
                    self.bits.store(bi, BlockSet::Liveout, &newliveout);
                }

                // in[b] = uevar[b] ∪ (out[b] \ varkill[b])
                newlivein.set_diff(
                    self.bits.row(bi, BlockSet::Liveout),
                    self.bits.row(bi, BlockSet::Varkill),
                );
                newlivein.or_words(self.bits.row(bi, BlockSet::Uevar));
                self.bits.store(bi, BlockSet::Livein, &newlivein);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{FuncBuilder, IrType};
    use diagnostics::Diagnostics;

    #[test]
    fn test_prologue_uevar_and_kill() {
        // Block: load p; store p; load q.
        // p is upward-exposed (used before set), q too; p is killed.
        let mut b = FuncBuilder::new("f");
        let p = b.local("p", IrType::ptr(IrType::Int64));
        let q = b.local("q", IrType::ptr(IrType::Int64));
        b.load(p);
        b.store(p);
        b.load(q);
        let ret = b.new_block(crate::ir::BlockKind::Return);
        b.edge_from_current(ret);
        let mut func = b.finish();
        let mut diags = Diagnostics::new();
        let mut lv = Liveness::new(&mut func, 0, &mut diags);
        lv.prologue();

        assert!(lv.bits.get(0, BlockSet::Uevar, 0)); // p
        assert!(lv.bits.get(0, BlockSet::Uevar, 1)); // q
        assert!(lv.bits.get(0, BlockSet::Varkill, 0));
        assert!(!lv.bits.get(0, BlockSet::Varkill, 1));
    }

    #[test]
    fn test_prologue_store_then_load_is_not_upward_exposed() {
        let mut b = FuncBuilder::new("f");
        let p = b.local("p", IrType::ptr(IrType::Int64));
        b.store(p);
        b.load(p);
        let mut func = b.finish();
        let mut diags = Diagnostics::new();
        let mut lv = Liveness::new(&mut func, 0, &mut diags);
        lv.prologue();

        assert!(!lv.bits.get(0, BlockSet::Uevar, 0));
        assert!(lv.bits.get(0, BlockSet::Varkill, 0));
    }

    #[test]
    fn test_prologue_avarinit_is_at_exit_state() {
        // addr-taken x: store (init), then VarKill clears it again.
        let mut b = FuncBuilder::new("f");
        let x = b.local("x", IrType::ptr(IrType::Int64));
        b.mark_addr_taken(x);
        b.store(x);
        b.var_kill(x);
        let mut func = b.finish();
        let mut diags = Diagnostics::new();
        let mut lv = Liveness::new(&mut func, 0, &mut diags);
        lv.prologue();

        assert!(!lv.bits.get(0, BlockSet::Avarinit, 0));
        // uevar is never set for address-taken variables.
        assert!(!lv.bits.get(0, BlockSet::Uevar, 0));
    }

    #[test]
    fn test_solve_liveness_across_branch() {
        // bb0: store p -> bb1 (uses p, returns) / bb2 (kills p, returns)
        let mut b = FuncBuilder::new("f");
        let p = b.local("p", IrType::ptr(IrType::Int64));
        b.store(p);
        let left = b.new_block(crate::ir::BlockKind::Normal);
        let right = b.new_block(crate::ir::BlockKind::Normal);
        let ret = b.new_block(crate::ir::BlockKind::Return);
        b.edge(b.current_block(), left);
        b.edge(b.current_block(), right);
        b.set_block(left);
        b.load(p);
        b.edge(left, ret);
        b.set_block(right);
        b.store(p);
        b.edge(right, ret);
        let mut func = b.finish();
        let mut diags = Diagnostics::new();
        let mut lv = Liveness::new(&mut func, 0, &mut diags);
        lv.prologue();
        lv.solve();

        // p is live out of bb0: the left branch reads it.
        assert!(lv.bits.get(0, BlockSet::Liveout, 0));
        assert!(lv.bits.get(left.index(), BlockSet::Livein, 0));
        assert!(!lv.bits.get(right.index(), BlockSet::Livein, 0));
        // Nothing is live into the entry block.
        assert!(!lv.bits.get(0, BlockSet::Livein, 0));
    }

    #[test]
    fn test_solve_return_kinds_seed_liveout() {
        let mut b = FuncBuilder::new("f");
        let x = b.param_in("x", IrType::ptr(IrType::Int64));
        let r = b.param_out("r", IrType::ptr(IrType::Int64));
        let _ = (x, r);
        let ret = b.new_block(crate::ir::BlockKind::Return);
        let tail = b.new_block(crate::ir::BlockKind::TailReturn);
        let exit = b.new_block(crate::ir::BlockKind::Exit);
        b.edge(b.current_block(), ret);
        b.edge(b.current_block(), tail);
        b.edge(b.current_block(), exit);
        let mut func = b.finish();
        let mut diags = Diagnostics::new();
        let mut lv = Liveness::new(&mut func, 0, &mut diags);
        lv.prologue();
        lv.solve();

        // Normal return reads the result param; tail return reads all
        // incoming params; exit reads nothing.
        assert!(!lv.bits.get(ret.index(), BlockSet::Liveout, 0));
        assert!(lv.bits.get(ret.index(), BlockSet::Liveout, 1));
        assert!(lv.bits.get(tail.index(), BlockSet::Liveout, 0));
        assert!(!lv.bits.get(tail.index(), BlockSet::Liveout, 1));
        assert!(!lv.bits.get(exit.index(), BlockSet::Liveout, 0));
        assert!(!lv.bits.get(exit.index(), BlockSet::Liveout, 1));
    }

    #[test]
    fn test_solve_init_sets_diverge_on_one_sided_init() {
        // Diamond: x (addr-taken) initialized only on the left path.
        // At the merge, any has x, all does not.
        let mut b = FuncBuilder::new("f");
        let x = b.local("x", IrType::ptr(IrType::Int64));
        b.mark_addr_taken(x);
        let left = b.new_block(crate::ir::BlockKind::Normal);
        let right = b.new_block(crate::ir::BlockKind::Normal);
        let merge = b.new_block(crate::ir::BlockKind::Return);
        b.edge(b.current_block(), left);
        b.edge(b.current_block(), right);
        b.set_block(left);
        b.store(x);
        b.edge(left, merge);
        b.edge(right, merge);
        let mut func = b.finish();
        let mut diags = Diagnostics::new();
        let mut lv = Liveness::new(&mut func, 0, &mut diags);
        lv.prologue();
        lv.solve();

        assert!(lv.bits.get(left.index(), BlockSet::AvarinitAny, 0));
        assert!(lv.bits.get(left.index(), BlockSet::AvarinitAll, 0));
        assert!(!lv.bits.get(right.index(), BlockSet::AvarinitAny, 0));

        let mut any = BitVec::new(1);
        let mut all = BitVec::new(1);
        lv.avarinit_any_all(merge, &mut any, &mut all);
        assert!(any.get(0));
        assert!(!all.get(0));
    }

    #[test]
    fn test_unreachable_block_meets_empty() {
        let mut b = FuncBuilder::new("f");
        let x = b.param_in("x", IrType::ptr(IrType::Int64));
        b.mark_addr_taken(x);
        let dead = b.new_block(crate::ir::BlockKind::Normal);
        let mut func = b.finish();
        let mut diags = Diagnostics::new();
        let mut lv = Liveness::new(&mut func, 0, &mut diags);
        lv.prologue();
        lv.solve();

        let mut any = BitVec::new(1);
        let mut all = BitVec::new(1);
        // Entry with no predecessors meets to the caller-written seed.
        lv.avarinit_any_all(crate::ir::BlockId(0), &mut any, &mut all);
        assert!(any.get(0) && all.get(0));
        // A predecessor-less non-entry block meets to the empty set.
        lv.avarinit_any_all(dead, &mut any, &mut all);
        assert!(!any.get(0) && !all.get(0));
    }
}
