//! Liveness debug surface
//!
//! Level 1 reports live-variable lists at safe points as warnings; level 2
//! dumps the full block-by-block dataflow state with per-value effect
//! classification, synthesizing the multiple passes into one listing.

use super::bitvec::BlockSet;
use super::effects::Effect;
use super::{is_safe_point, Liveness};
use crate::ir::{Aux, BlockId, ValueId};
use diagnostics::gc::GcDiagnostics;
use std::fmt::Write;

impl Liveness<'_> {
    /// Report the live variables at one safe point (or at entry, when `v`
    /// is None) as a warning. Init stubs and compiler-generated functions
    /// are skipped to keep the output focused on user code.
    pub(crate) fn show_live(&mut self, v: Option<ValueId>, index: usize) {
        if self.debug_level == 0 || self.func.name == "init" || self.func.name.starts_with('.') {
            return;
        }
        let live = &self.livevars[index];
        if live.is_empty() {
            return;
        }

        let loc = match v {
            Some(vid) => self.func.value(vid).loc,
            None => self.func.loc,
        };
        let site = match v {
            None => format!("entry to {}:", self.func.name),
            Some(vid) => match &self.func.value(vid).aux {
                Aux::Extern(name) => {
                    // Trim the package qualifier.
                    let short = match name.split_once('.') {
                        Some((_, rest)) => rest,
                        None => name.as_str(),
                    };
                    format!("call to {}:", short)
                }
                _ => "indirect call:".to_string(),
            },
        };

        let names: Vec<&str> = live
            .ones()
            .map(|i| self.func.var(self.vars[i as usize]).name.as_str())
            .collect();
        let d = GcDiagnostics::live_at(loc.to_span(), &site, &names);
        self.diags.push(d);
    }

    fn write_bvec(&self, out: &mut String, printed: &mut bool, name: &str, block: usize, set: BlockSet) {
        let mut started = false;
        for (i, &vid) in self.vars.iter().enumerate() {
            if !self.bits.get(block, set, i as u32) {
                continue;
            }
            if !started {
                out.push_str(if *printed { " " } else { "\t" });
                started = true;
                *printed = true;
                out.push_str(name);
                out.push('=');
            } else {
                out.push(',');
            }
            out.push_str(&self.func.var(vid).name);
        }
    }

    fn write_live_list(&self, out: &mut String, index: usize) {
        out.push_str("\tlive=");
        let mut printed = false;
        for (j, &vid) in self.vars.iter().enumerate() {
            if !self.livevars[index].get(j as u32) {
                continue;
            }
            if printed {
                out.push(',');
            }
            out.push_str(&self.func.var(vid).name);
            printed = true;
        }
        out.push('\n');
    }
}

/// Render the computed liveness information and its inputs (debug level 2).
pub fn dump(lv: &Liveness<'_>) -> String {
    let mut out = String::new();
    writeln!(out, "liveness: {}", lv.func.name).unwrap();

    let mut pcdata = 0usize;
    for (bi, block) in lv.func.blocks.iter().enumerate() {
        if bi > 0 {
            out.push('\n');
        }

        // bb#0 pred=1,2 succ=3,4
        write!(out, "bb#{} pred=", block.id.0).unwrap();
        for (j, p) in block.preds.iter().enumerate() {
            if j > 0 {
                out.push(',');
            }
            write!(out, "{}", p.0).unwrap();
        }
        out.push_str(" succ=");
        for (j, s) in block.succs.iter().enumerate() {
            if j > 0 {
                out.push(',');
            }
            write!(out, "{}", s.0).unwrap();
        }
        out.push('\n');

        let mut printed = false;
        lv.write_bvec(&mut out, &mut printed, "uevar", bi, BlockSet::Uevar);
        lv.write_bvec(&mut out, &mut printed, "livein", bi, BlockSet::Livein);
        if printed {
            out.push('\n');
        }

        // Program listing with individual effects.
        if BlockId(bi as u32) == lv.func.entry {
            writeln!(out, "function entry").unwrap();
            lv.write_live_list(&mut out, pcdata);
        }

        for &vid in &block.values {
            let v = lv.func.value(vid);
            writeln!(out, "{} = {:?} {}", vid, v.op, fmt_aux(lv, vid)).unwrap();

            if let Some(&idx) = lv.stack_map_index.get(&vid) {
                pcdata = idx;
            }

            let (pos, effect) = lv.value_effects(vid);
            let mut printed = false;
            for (flag, name) in [
                (Effect::USE, "uevar"),
                (Effect::KILL, "varkill"),
                (Effect::ADDRINIT, "avarinit"),
            ] {
                if effect.contains(flag) {
                    out.push_str(if printed { " " } else { "\t" });
                    write!(out, "{}={}", name, lv.func.var(lv.vars[pos as usize]).name).unwrap();
                    printed = true;
                }
            }
            if printed {
                out.push('\n');
            }

            if is_safe_point(v) {
                lv.write_live_list(&mut out, pcdata);
            }
        }

        out.push_str("end\n");
        let mut printed = false;
        lv.write_bvec(&mut out, &mut printed, "varkill", bi, BlockSet::Varkill);
        lv.write_bvec(&mut out, &mut printed, "liveout", bi, BlockSet::Liveout);
        lv.write_bvec(&mut out, &mut printed, "avarinit", bi, BlockSet::Avarinit);
        lv.write_bvec(&mut out, &mut printed, "avarinitany", bi, BlockSet::AvarinitAny);
        lv.write_bvec(&mut out, &mut printed, "avarinitall", bi, BlockSet::AvarinitAll);
        if printed {
            out.push('\n');
        }
    }

    out.push('\n');
    out
}

fn fmt_aux(lv: &Liveness<'_>, vid: ValueId) -> String {
    match &lv.func.value(vid).aux {
        Aux::None => String::new(),
        Aux::Extern(name) => format!("{{{}}}", name),
        Aux::Arg(id) | Aux::Auto(id) => format!("{{{}}}", lv.func.var(*id).name),
    }
}
