//! Effect classification
//!
//! Maps each SSA value to the tracked variable it touches and the liveness
//! effect it has on it. The three effects drive the whole dataflow engine:
//!
//! - `USE`: the value reads the variable (upward-exposed if not preceded by
//!   a kill in the same block)
//! - `KILL`: the variable is definitively overwritten or marked dead
//! - `ADDRINIT`: for address-taken variables, proof that the storage has
//!   been written or referenced; such variables are tracked through the
//!   init-set lattice instead of ordinary liveness

use super::Liveness;
use crate::ir::{Op, SymEffect, Value, ValueId, VarId, VarKind};
use std::ops::{BitOr, BitOrAssign};

/// A set of liveness effects on a single variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Effect(u8);

impl Effect {
    pub const NONE: Effect = Effect(0);
    pub const USE: Effect = Effect(1);
    pub const KILL: Effect = Effect(2);
    pub const ADDRINIT: Effect = Effect(4);

    pub fn contains(self, other: Effect) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Effect {
    type Output = Effect;
    fn bitor(self, rhs: Effect) -> Effect {
        Effect(self.0 | rhs.0)
    }
}

impl BitOrAssign for Effect {
    fn bitor_assign(&mut self, rhs: Effect) {
        self.0 |= rhs.0;
    }
}

/// Per-function caches of the variable registry, built once before the
/// prologue walks any block.
#[derive(Debug, Default)]
pub struct EffectsCache {
    /// Address-taken incoming parameters: their backing slots are
    /// initialized at function entry because the caller wrote them.
    pub text_avarinit_seed: Vec<u32>,

    /// Result parameters without address taken: read by a normal return.
    pub ret_uevar: Vec<u32>,

    /// Every incoming parameter: a tail-call return must re-present all of
    /// them to the target and must not read the results.
    pub tail_uevar: Vec<u32>,

    pub initialized: bool,
}

impl Liveness<'_> {
    pub(super) fn init_cache(&mut self) {
        if self.cache.initialized {
            panic!("liveness cache initialized twice");
        }
        self.cache.initialized = true;

        for (i, &vid) in self.vars.iter().enumerate() {
            let var = self.func.var(vid);
            match var.kind {
                VarKind::ParamIn => {
                    self.cache.tail_uevar.push(i as u32);
                    if var.addr_taken {
                        self.cache.text_avarinit_seed.push(i as u32);
                    }
                }
                VarKind::ParamOut => {
                    // An address-taken result is tracked by the init-set
                    // code, which does not use uevar. Adding it here too
                    // would leave it live-at-entry with no kill in sight.
                    if !var.addr_taken {
                        self.cache.ret_uevar.push(i as u32);
                    }
                }
                _ => {}
            }
        }
    }

    /// The variable affected by `v` and the raw symbol effect, resolving the
    /// pseudo-op and spill special cases.
    fn affected_var(&self, v: &Value) -> (Option<VarId>, SymEffect) {
        match v.op {
            Op::LoadReg => (self.func.auto_var(v.args[0]), SymEffect::READ),
            Op::StoreReg => (v.aux.var_id(), SymEffect::WRITE),
            Op::VarLive => (self.pseudo_aux(v), SymEffect::READ),
            Op::VarDef | Op::VarKill => (self.pseudo_aux(v), SymEffect::WRITE),
            Op::KeepAlive => (self.func.auto_var(v.args[0]), SymEffect::READ),
            _ => {
                let e = v.op.sym_effect();
                if e.is_none() {
                    (None, SymEffect::NONE)
                } else {
                    (v.aux.var_id(), e)
                }
            }
        }
    }

    fn pseudo_aux(&self, v: &Value) -> Option<VarId> {
        match v.aux.var_id() {
            Some(id) => Some(id),
            None => panic!("weird aux on {:?}", v.op),
        }
    }

    /// Returns the dense index of the variable `v` affects and the liveness
    /// effects, or `(-1, NONE)` if no tracked variable is affected.
    pub(super) fn value_effects(&self, vid: ValueId) -> (i32, Effect) {
        let v = self.func.value(vid);
        let (node, e) = self.affected_var(v);
        if e.is_none() {
            return (-1, Effect::NONE);
        }

        // Frame allocation drops unused variables from the declaration
        // list, but pseudo-ops may still reference them. Ignore those
        // references rather than losing track of the variable.
        if matches!(v.op, Op::VarDef | Op::VarKill | Op::VarLive | Op::KeepAlive) {
            if let Some(n) = node {
                if !self.func.var(n).used {
                    return (-1, Effect::NONE);
                }
            }
        }

        let n = match node {
            Some(n) => n,
            None => return (-1, Effect::NONE),
        };
        let pos = self.live_index(n);
        if pos < 0 {
            return (-1, Effect::NONE);
        }

        let var = self.func.var(n);
        let mut effect = Effect::NONE;
        if var.addr_taken {
            // Address-taken variables are tracked through the init sets;
            // every touch except VarKill proves initialization.
            if v.op != Op::VarKill {
                effect |= Effect::ADDRINIT;
            }
            if v.op == Op::VarDef || v.op == Op::VarKill {
                effect |= Effect::KILL;
            }
        } else {
            // A read is a use, and a bare address-of is implicitly one too.
            // ADDR|WRITE means the address is taken only so the instruction
            // can overwrite the value; that is not a read.
            if e.contains(SymEffect::READ) || e == SymEffect::ADDR {
                effect |= Effect::USE;
            }
            // A partial write of a fat type does not kill the whole
            // variable; only VarDef asserts a full overwrite.
            if e.contains(SymEffect::WRITE) && (!var.ty.is_fat() || v.op == Op::VarDef) {
                effect |= Effect::KILL;
            }
        }

        (pos, effect)
    }

    /// Dense index of `n` in the tracked-variable vector, or -1 when `n` is
    /// not tracked or belongs to another function. An untracked variable
    /// that should be tracked is an internal inconsistency.
    pub(super) fn live_index(&self, n: VarId) -> i32 {
        let var = self.func.var(n);
        if var.curfn != Some(self.func.id) || !var.should_track() {
            return -1;
        }
        let pos = self.var_index[n.index()];
        if pos < 0 {
            panic!("lost track of variable in liveness: {}", var.name);
        }
        if pos as usize >= self.vars.len() || self.vars[pos as usize] != n {
            panic!("bad bookkeeping in liveness: {}", var.name);
        }
        pos
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{FuncBuilder, IrType};
    use diagnostics::Diagnostics;

    #[test]
    fn test_effect_bits() {
        let mut e = Effect::NONE;
        assert!(e.is_none());
        e |= Effect::USE;
        e |= Effect::KILL;
        assert!(e.contains(Effect::USE));
        assert!(e.contains(Effect::KILL));
        assert!(!e.contains(Effect::ADDRINIT));
    }

    #[test]
    fn test_classification() {
        let mut b = FuncBuilder::new("f");
        let p = b.local("p", IrType::ptr(IrType::Int64));
        let s = b.local("s", IrType::String);
        let n = b.local("n", IrType::Int64);
        let def = b.var_def(p);
        let rd = b.load(p);
        let wr = b.store(p);
        let ad = b.addr_of(p);
        let zr = b.zero_slot(p);
        let fat_wr = b.store(s);
        let fat_def = b.var_def(s);
        let int_rd = b.load(n);
        let mut func = b.finish();
        let mut diags = Diagnostics::new();
        let lv = Liveness::new(&mut func, 0, &mut diags);

        // VarDef on an ordinary pointer local: kill, no use.
        assert_eq!(lv.value_effects(def), (0, Effect::KILL));
        assert_eq!(lv.value_effects(rd), (0, Effect::USE));
        assert_eq!(lv.value_effects(wr), (0, Effect::KILL));
        // Bare address-of reads; taking the address only to overwrite the
        // value does not.
        assert_eq!(lv.value_effects(ad), (0, Effect::USE));
        assert_eq!(lv.value_effects(zr), (0, Effect::KILL));
        // Partial write of a fat type does not kill; VarDef does.
        assert_eq!(lv.value_effects(fat_wr), (1, Effect::NONE));
        assert_eq!(lv.value_effects(fat_def), (1, Effect::KILL));
        // Pointer-free variables are untracked.
        assert_eq!(lv.value_effects(int_rd), (-1, Effect::NONE));
    }

    #[test]
    fn test_addr_taken_classification() {
        let mut b = FuncBuilder::new("f");
        let x = b.local("x", IrType::ptr(IrType::Int64));
        b.mark_addr_taken(x);
        let st = b.store(x);
        let def = b.var_def(x);
        let kill = b.var_kill(x);
        let rd = b.load(x);
        let mut func = b.finish();
        let mut diags = Diagnostics::new();
        let lv = Liveness::new(&mut func, 0, &mut diags);

        // Never USE; touches prove initialization instead.
        assert_eq!(lv.value_effects(st), (0, Effect::ADDRINIT));
        assert_eq!(lv.value_effects(def), (0, Effect::ADDRINIT | Effect::KILL));
        assert_eq!(lv.value_effects(kill), (0, Effect::KILL));
        assert_eq!(lv.value_effects(rd), (0, Effect::ADDRINIT));
    }

    #[test]
    fn test_pruned_pseudo_op_is_ignored() {
        let mut b = FuncBuilder::new("f");
        let p = b.local("p", IrType::ptr(IrType::Int64));
        b.mark_unused(p);
        let def = b.var_def(p);
        let mut func = b.finish();
        func.decls.clear(); // frame allocation dropped the slot
        let mut diags = Diagnostics::new();
        let lv = Liveness::new(&mut func, 0, &mut diags);
        assert_eq!(lv.value_effects(def), (-1, Effect::NONE));
    }

    #[test]
    fn test_foreign_variable_is_ignored() {
        // A reference to a variable stamped with another function's
        // identity is not tracked here; contrast with the lost-track case
        // below, where the stamp matches but the registry has no index.
        let mut b = FuncBuilder::new("f");
        let p = b.local("p", IrType::ptr(IrType::Int64));
        let rd = b.load(p);
        let mut func = b.finish();
        func.decls.clear();
        func.var_mut(p).curfn = Some(crate::ir::FuncId(7));
        let mut diags = Diagnostics::new();
        let lv = Liveness::new(&mut func, 0, &mut diags);
        assert_eq!(lv.value_effects(rd), (-1, Effect::NONE));
    }

    #[test]
    #[should_panic(expected = "lost track of variable in liveness")]
    fn test_lost_track_panics() {
        let mut b = FuncBuilder::new("f");
        let p = b.local("p", IrType::ptr(IrType::Int64));
        let rd = b.load(p);
        let mut func = b.finish();
        func.decls.clear(); // tracked variable missing from the registry
        let mut diags = Diagnostics::new();
        let lv = Liveness::new(&mut func, 0, &mut diags);
        lv.value_effects(rd);
    }

    #[test]
    fn test_spill_ops() {
        let mut b = FuncBuilder::new("f");
        let p = b.local("p", IrType::ptr(IrType::Int64));
        let slot = b.store_reg(p);
        let reload = b.load_reg(slot);
        let keep = b.keep_alive(slot);
        let mut func = b.finish();
        let mut diags = Diagnostics::new();
        let lv = Liveness::new(&mut func, 0, &mut diags);

        assert_eq!(lv.value_effects(slot), (0, Effect::KILL));
        assert_eq!(lv.value_effects(reload), (0, Effect::USE));
        assert_eq!(lv.value_effects(keep), (0, Effect::USE));
    }
}
