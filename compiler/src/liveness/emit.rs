//! Pointer-map serialization
//!
//! Dumps the compacted bitmap table into the two runtime symbols. Each
//! symbol starts with two u32 words — the number of bitmaps and the bits
//! per bitmap — followed by the bitmaps packed as raw bytes, each starting
//! on a byte boundary.

use super::bitvec::BitVec;
use super::Liveness;
use crate::link::{LinkContext, LinkSymbol};
use std::sync::Arc;

fn push_u32(data: &mut Vec<u8>, v: u32) {
    data.extend_from_slice(&v.to_le_bytes());
}

/// Append the bitmap's bits as packed bytes.
fn push_bitmap(data: &mut Vec<u8>, bv: &BitVec) {
    let mut j = 0u32;
    while j < bv.len() {
        let word = bv.words()[(j / 32) as usize];
        data.push((word >> (j % 32)) as u8);
        j += 8;
    }
}

impl Liveness<'_> {
    /// Serialize the args and locals pointer maps and register them with
    /// the link context.
    pub(crate) fn emit(&self, link: &LinkContext) -> (Arc<LinkSymbol>, Arc<LinkSymbol>) {
        let mut args = BitVec::new(self.args_words());
        let mut args_data = Vec::new();
        push_u32(&mut args_data, self.livevars.len() as u32); // number of bitmaps
        push_u32(&mut args_data, args.len()); // bits per bitmap

        let mut locals = BitVec::new(self.locals_words());
        let mut locals_data = Vec::new();
        push_u32(&mut locals_data, self.livevars.len() as u32);
        push_u32(&mut locals_data, locals.len());

        for live in &self.livevars {
            args.clear();
            locals.clear();

            self.live_pointer_maps(live, &mut args, &mut locals);

            push_bitmap(&mut args_data, &args);
            push_bitmap(&mut locals_data, &locals);
        }

        let args_sym = link.finish_gclocals(args_data);
        let locals_sym = link.finish_gclocals(locals_data);
        (args_sym, locals_sym)
    }
}

/// Decode a pointer-map symbol back into its bitmaps (test and tooling
/// support; the runtime reads the raw layout directly).
pub fn decode_maps(data: &[u8]) -> (u32, u32, Vec<Vec<u8>>) {
    let count = u32::from_le_bytes(data[0..4].try_into().unwrap());
    let nbits = u32::from_le_bytes(data[4..8].try_into().unwrap());
    let stride = ((nbits + 7) / 8) as usize;
    let mut maps = Vec::with_capacity(count as usize);
    let mut off = 8;
    for _ in 0..count {
        maps.push(data[off..off + stride].to_vec());
        off += stride;
    }
    (count, nbits, maps)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_bitmap_packs_bytes() {
        let mut bv = BitVec::new(12);
        bv.set(0);
        bv.set(9);
        let mut data = Vec::new();
        push_bitmap(&mut data, &bv);
        assert_eq!(data, vec![0b0000_0001, 0b0000_0010]);
    }

    #[test]
    fn test_push_bitmap_empty_width() {
        let bv = BitVec::new(0);
        let mut data = Vec::new();
        push_bitmap(&mut data, &bv);
        assert!(data.is_empty());
    }

    #[test]
    fn test_decode_round_trip() {
        let mut data = Vec::new();
        push_u32(&mut data, 2);
        push_u32(&mut data, 12);
        let mut a = BitVec::new(12);
        a.set(3);
        let mut b = BitVec::new(12);
        b.set(11);
        push_bitmap(&mut data, &a);
        push_bitmap(&mut data, &b);

        let (count, nbits, maps) = decode_maps(&data);
        assert_eq!((count, nbits), (2, 12));
        assert_eq!(maps[0], vec![0b1000, 0]);
        assert_eq!(maps[1], vec![0, 0b1000]);
    }
}
