//! Stack-frame zeroing
//!
//! Emits the entry-code plan that zeroes ambiguously-live slots so the
//! collector only ever sees initialized values when it looks for pointers.
//! Declarations are visited in decreasing frame-offset order and adjacent
//! ranges merge when the gap between them is smaller than two register
//! widths; each merged range then picks a strategy by size: unrolled
//! stores, a jump into the shared zeroing trampoline, or a counted loop.

use crate::ir::{Func, VarKind, PTR_WIDTH, REG_WIDTH};

/// Ranges below this many pointer words unroll into individual stores.
pub const ZERO_UNROLL_WORDS: i64 = 4;

/// Ranges up to this many pointer words jump into the shared trampoline.
pub const ZERO_TRAMPOLINE_WORDS: i64 = 128;

/// Bytes of trampoline code per word cleared; the entry offset for a range
/// of `n` words is `(ZERO_TRAMPOLINE_WORDS - n) * TRAMPOLINE_STEP`.
const TRAMPOLINE_STEP: i64 = 4;

/// One zeroing action over a contiguous byte range of the frame. Offsets
/// are relative to the stack pointer after the frame is allocated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZeroCode {
    /// Store zero to each listed word offset.
    Unrolled { offsets: Vec<i64> },

    /// Point the runner register at `base` and jump into the shared
    /// zeroing trampoline at `entry_offset`.
    Trampoline { base: i64, entry_offset: i64 },

    /// Counted loop: `words` post-incrementing stores starting past `base`.
    Loop { base: i64, words: i64 },
}

/// Build the zeroing plan for a function whose liveness analysis has set
/// `needs_zero` flags. `frame` is the rounded locals-frame size.
pub fn plan_frame_zeroing(func: &Func, frame: i64) -> Vec<ZeroCode> {
    // Visit declarations in decreasing frame-offset order so ranges merge.
    let mut decls: Vec<_> = func
        .decls
        .iter()
        .map(|&vid| func.var(vid))
        .filter(|v| v.needs_zero)
        .collect();
    decls.sort_by_key(|v| std::cmp::Reverse(v.frame_offset));

    let mut plan = Vec::new();
    let mut hi: i64 = 0;
    let mut lo: i64 = hi;

    for var in decls {
        if var.kind != VarKind::Local {
            panic!("needs_zero on non-local {} ({:?})", var.name, var.kind);
        }
        let width = var.ty.width();
        if width % PTR_WIDTH != 0 || var.frame_offset % PTR_WIDTH != 0 || width == 0 {
            panic!(
                "var {} has size {} offset {}",
                var.name, width, var.frame_offset
            );
        }

        if lo != hi && var.frame_offset + width >= lo - 2 * REG_WIDTH {
            // Merge with the range we already have.
            lo = var.frame_offset;
            continue;
        }

        // Zero the old range, then start a new one.
        zero_range(&mut plan, frame, lo, hi);
        hi = var.frame_offset + width;
        lo = var.frame_offset;
    }

    zero_range(&mut plan, frame, lo, hi);
    plan
}

fn zero_range(plan: &mut Vec<ZeroCode>, frame: i64, lo: i64, hi: i64) {
    let cnt = hi - lo;
    if cnt == 0 {
        return;
    }

    if cnt < ZERO_UNROLL_WORDS * PTR_WIDTH {
        let offsets = (0..cnt)
            .step_by(PTR_WIDTH as usize)
            .map(|i| frame + lo + i)
            .collect();
        plan.push(ZeroCode::Unrolled { offsets });
    } else if cnt <= ZERO_TRAMPOLINE_WORDS * PTR_WIDTH {
        plan.push(ZeroCode::Trampoline {
            base: frame + lo - PTR_WIDTH,
            entry_offset: TRAMPOLINE_STEP * (ZERO_TRAMPOLINE_WORDS - cnt / PTR_WIDTH),
        });
    } else {
        plan.push(ZeroCode::Loop {
            base: frame + lo - PTR_WIDTH,
            words: cnt / PTR_WIDTH,
        });
    }
}
