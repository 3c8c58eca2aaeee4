//! Safe-point emission
//!
//! Visits every instruction and records, for each safe point, a snapshot
//! bitmap of the variables the collector must scan there. The forward sweep
//! seeds each snapshot with the address-taken variables that may be
//! initialized (flagging ambiguously-live ones for entry zeroing); the
//! backward sweep then folds in ordinary liveness and the always-live set
//! required by recovering defers.

use super::bitvec::{BitVec, BlockSet};
use super::effects::Effect;
use super::{is_safe_point, Liveness};
use crate::ir::VarKind;
use diagnostics::gc::GcDiagnostics;

impl Liveness<'_> {
    pub(crate) fn epilogue(&mut self) {
        let nvars = self.nvars();
        let mut liveout = BitVec::new(nvars);
        let mut any = BitVec::new(nvars);
        let mut all = BitVec::new(nvars);
        let mut ambiguous = BitVec::new(nvars);
        let mut livedefer = BitVec::new(nvars); // always-live variables

        // If there is a defer (that could recover), all output parameters
        // are live for the whole function, and so is any local holding the
        // heap address of an output parameter: the post-recovery path needs
        // that pointer to copy the result back to the stack.
        if self.func.has_defer {
            for i in 0..self.vars.len() {
                let vid = self.vars[i];
                let var = self.func.var(vid);
                if var.kind == VarKind::ParamOut {
                    if var.is_output_param_heap_addr {
                        // Heap addresses are locals.
                        panic!(
                            "variable {} both output param and heap output param",
                            var.name
                        );
                    }
                    if var.heap_addr.is_some() {
                        // The result itself moved to the heap; its stack
                        // copy is not what the recovery path writes.
                        continue;
                    }
                    // Zeroing of the slot itself is the frontend's job.
                    livedefer.set(i as u32);
                }
                if var.is_output_param_heap_addr {
                    self.func.var_mut(vid).needs_zero = true;
                    livedefer.set(i as u32);
                }
            }
        }

        {
            // Reserve an entry for function entry.
            let mut live = BitVec::new(nvars);
            for &pos in &self.cache.text_avarinit_seed {
                live.set(pos);
            }
            self.livevars.push(live);
        }

        for b in 0..self.func.blocks.len() {
            // Compute the init state at block entry; this duplicates what
            // the solver knew but avoids storing two more vectors per block.
            self.avarinit_any_all(crate::ir::BlockId(b as u32), &mut any, &mut all);

            // Walk forward and allocate a snapshot at each safe point,
            // seeded with the address-taken variables that may be
            // initialized here.
            for j in 0..self.func.blocks[b].values.len() {
                let vid = self.func.blocks[b].values[j];
                let (pos, e) = self.value_effects(vid);
                if e.contains(Effect::KILL) {
                    any.unset(pos as u32);
                    all.unset(pos as u32);
                }
                if e.contains(Effect::ADDRINIT) {
                    any.set(pos as u32);
                    all.set(pos as u32);
                }

                if !is_safe_point(self.func.value(vid)) {
                    continue;
                }

                // Variables initialized on some but not all paths are
                // ambiguously live: flag them for entry zeroing so the
                // collector never scans garbage.
                ambiguous.set_diff(any.words(), all.words());
                for posn in ambiguous.ones() {
                    all.set(posn); // silence future warnings in this block
                    let n = self.vars[posn as usize];
                    if !self.func.var(n).needs_zero {
                        self.func.var_mut(n).needs_zero = true;
                        if self.debug_level >= 1 {
                            let loc = self.func.value(vid).loc;
                            let d = GcDiagnostics::ambiguously_live(
                                loc.to_span(),
                                &self.func.name,
                                &self.func.var(n).name,
                            );
                            self.diags.push(d);
                        }
                    }
                }

                let mut live = BitVec::new(nvars);
                live.copy_from(&any);
                self.livevars.push(live);
            }

            self.last_bitmap_index[b] = self.livevars.len() as i32 - 1;
        }

        for b in 0..self.func.blocks.len() {
            // Walk backward and populate the snapshots with liveness.
            let mut index = self.last_bitmap_index[b];
            if index < 0 {
                // The entry reservation means every block has a
                // non-negative last index.
                panic!("liveness epilogue: lost bitmap index");
            }

            liveout.copy_words(self.bits.row(b, BlockSet::Liveout));
            for j in (0..self.func.blocks[b].values.len()).rev() {
                let vid = self.func.blocks[b].values[j];

                if is_safe_point(self.func.value(vid)) {
                    // Record the liveness information; the always-live set
                    // applies to every non-entry safe point.
                    let live = &mut self.livevars[index as usize];
                    live.or_words(liveout.words());
                    live.or_words(livedefer.words());
                    index -= 1;
                }

                let (pos, e) = self.value_effects(vid);
                if e.contains(Effect::KILL) {
                    liveout.unset(pos as u32);
                }
                if e.contains(Effect::USE) {
                    liveout.set(pos as u32);
                }
            }

            if crate::ir::BlockId(b as u32) == self.func.entry {
                if index != 0 {
                    panic!("bad index for entry point: {}", index);
                }

                // Record the variables live when the function starts.
                self.livevars[0].or_words(liveout.words());
            }
        }

        // Sanity check: on entry to the function, the only things that can
        // possibly be live are the incoming parameters.
        for (j, &vid) in self.vars.iter().enumerate() {
            let var = self.func.var(vid);
            if var.kind != VarKind::ParamIn && self.livevars[0].get(j as u32) {
                panic!(
                    "internal error: {} {} recorded as live on entry",
                    self.func.name, var.name
                );
            }
        }
    }
}
