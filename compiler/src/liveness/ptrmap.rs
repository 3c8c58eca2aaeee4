//! Pointer-map generation
//!
//! Converts a variable-indexed liveness bitmap into the word-indexed
//! pointer bitmaps the collector consumes: one over the args region, one
//! over the locals region. Each live variable's type layout is walked
//! recursively, setting a bit for every word that holds a pointer.

use super::bitvec::BitVec;
use super::Liveness;
use crate::ir::{IrType, VarKind, PTR_WIDTH};

/// Walk `ty` starting at `*offset`, setting a bit in `bv` for each
/// pointer-bearing word. Misalignment of a pointer-bearing leaf is an
/// internal inconsistency: the frame layout and this walk must agree.
pub(crate) fn onebit_walk_type(ty: &IrType, offset: &mut i64, bv: &mut BitVec) {
    let align = ty.align();
    if align > 0 && *offset % align != 0 {
        panic!("onebit_walk_type: invalid initial alignment for {}", ty);
    }

    match ty {
        IrType::Bool
        | IrType::Int8
        | IrType::Int16
        | IrType::Int32
        | IrType::Int64
        | IrType::Uint8
        | IrType::Uint16
        | IrType::Uint32
        | IrType::Uint64
        | IrType::Uintptr
        | IrType::Float32
        | IrType::Float64
        | IrType::Complex64
        | IrType::Complex128 => {
            *offset += ty.width();
        }

        IrType::Ptr(_) | IrType::UnsafePtr | IrType::Chan | IrType::Map | IrType::Func => {
            if *offset % PTR_WIDTH != 0 {
                panic!("onebit_walk_type: invalid alignment for {}", ty);
            }
            bv.set((*offset / PTR_WIDTH) as u32); // pointer
            *offset += ty.width();
        }

        IrType::String => {
            // struct { data *u8; len }
            if *offset % PTR_WIDTH != 0 {
                panic!("onebit_walk_type: invalid alignment for {}", ty);
            }
            bv.set((*offset / PTR_WIDTH) as u32); // pointer in first slot
            *offset += ty.width();
        }

        IrType::Interface => {
            // struct { tab; data } — both words are pointers
            if *offset % PTR_WIDTH != 0 {
                panic!("onebit_walk_type: invalid alignment for {}", ty);
            }
            bv.set((*offset / PTR_WIDTH) as u32);
            bv.set((*offset / PTR_WIDTH) as u32 + 1);
            *offset += ty.width();
        }

        IrType::Slice(_) => {
            // struct { data; len; cap } — pointer in first slot only
            if *offset % PTR_WIDTH != 0 {
                panic!("onebit_walk_type: invalid slice alignment for {}", ty);
            }
            bv.set((*offset / PTR_WIDTH) as u32);
            *offset += ty.width();
        }

        IrType::Array { elem, len } => {
            for _ in 0..*len {
                onebit_walk_type(elem, offset, bv);
            }
        }

        IrType::Struct { fields, .. } => {
            let mut o = 0i64;
            for field in fields {
                *offset += field.offset - o;
                onebit_walk_type(&field.ty, offset, bv);
                o = field.offset + field.ty.width();
            }
            // Trailing padding.
            *offset += ty.width() - o;
        }
    }
}

impl Liveness<'_> {
    /// Number of pointer words in the args region.
    pub(crate) fn args_words(&self) -> u32 {
        (self.func.arg_width / PTR_WIDTH) as u32
    }

    /// Number of pointer words in the locals region.
    pub(crate) fn locals_words(&self) -> u32 {
        (self.stkptrsize / PTR_WIDTH) as u32
    }

    /// Generate the live pointer maps for one snapshot bitmap.
    pub(crate) fn live_pointer_maps(&self, live: &BitVec, args: &mut BitVec, locals: &mut BitVec) {
        for i in live.ones() {
            let var = self.func.var(self.vars[i as usize]);
            let mut offset;
            match var.kind {
                VarKind::Local => {
                    offset = var.frame_offset + self.stkptrsize;
                    onebit_walk_type(&var.ty, &mut offset, locals);
                }
                VarKind::ParamIn | VarKind::ParamOut => {
                    offset = var.frame_offset;
                    onebit_walk_type(&var.ty, &mut offset, args);
                }
                VarKind::HeapIndirect => {
                    // Heap-indirect variables are never tracked.
                    panic!("pointer map for heap variable {}", var.name);
                }
            }
        }
    }
}
