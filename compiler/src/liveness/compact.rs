//! Bitmap compaction
//!
//! Coalesces identical per-safe-point bitmaps within one function. The
//! argument and local bitmap lists share a single PCDATA index, so the pairs
//! compact together: two safe points share an index exactly when their
//! variable-level snapshots are equal.

use super::bitvec::{BitVec, FNV_OFFSET};
use super::{is_safe_point, Liveness};
use crate::ir::ValueId;

/// Deduplicate a bitmap table in place, compacting the unique bitmaps into
/// the low prefix and truncating. Returns `remap`, where `remap[i]` is the
/// new index of old bit vector #i. Running it again on an already-compacted
/// table is the identity.
pub(crate) fn compact_bitmaps(livevars: &mut Vec<BitVec>) -> Vec<i32> {
    // Linear-probing hash table of bitmaps seen so far. The table has 4n
    // entries to keep the probe sequences short; -1 is an empty slot.
    let n = livevars.len();
    let tablesize = 4 * n;
    let mut table = vec![-1i32; tablesize];

    let mut remap = vec![-1i32; n];
    let mut uniq = 0usize; // unique bitmaps found so far

    // Consider bit vectors in turn: if new, assign the next compacted
    // index, move the vector into the low prefix, and enter it in the
    // table; if already seen, record the earlier index.
    'outer: for i in 0..n {
        let mut h = (livevars[i].hash(FNV_OFFSET) as usize) % tablesize;
        loop {
            let j = table[h];
            if j < 0 {
                break;
            }
            if livevars[i] == livevars[j as usize] {
                remap[i] = j;
                continue 'outer;
            }
            h += 1;
            if h == tablesize {
                h = 0;
            }
        }

        table[h] = uniq as i32;
        remap[i] = uniq as i32;
        if uniq != i {
            livevars.swap(uniq, i);
        }
        uniq += 1;
    }

    livevars.truncate(uniq);
    remap
}

impl Liveness<'_> {
    /// Deduplicate `livevars` and build the safe-point -> index map used to
    /// tag PCDATA transitions, reporting live sets at the debug level.
    pub(crate) fn compact(&mut self) {
        let remap = compact_bitmaps(&mut self.livevars);

        self.show_live(None, 0);
        let safepoints: Vec<ValueId> = self
            .func
            .blocks
            .iter()
            .flat_map(|b| b.values.iter().copied())
            .filter(|&vid| is_safe_point(self.func.value(vid)))
            .collect();
        let mut pos = 1usize;
        for vid in safepoints {
            let idx = remap[pos] as usize;
            self.show_live(Some(vid), idx);
            self.stack_map_index.insert(vid, idx);
            pos += 1;
        }
    }
}
