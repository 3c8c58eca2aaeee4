//! vesper compiler backend — GC stack-map generation
//!
//! This crate hosts the backend passes that establish the runtime contract
//! between generated code and the garbage collector:
//!
//! - [`ir`] — the SSA-level function shape the passes consume, its layout
//!   type system, and the heap-escape rewriter that relocates address-taken
//!   variables
//! - [`liveness`] — the per-safe-point liveness analysis producing the
//!   argument and local pointer bitmaps
//! - [`codegen`] — per-target work plans derived from the analysis (frame
//!   zeroing of ambiguously-live slots)
//! - [`link`] — the shared symbol table with content-addressed pointer-map
//!   deduplication
//!
//! A driver runs, per function: escape rewriting, then `liveness::liveness`,
//! then feeds the returned stack-map indices to the instruction emitter and
//! the zeroing plan to the prologue generator.

pub mod codegen;
pub mod ir;
pub mod link;
pub mod liveness;
pub mod logging;
