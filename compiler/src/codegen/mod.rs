//! Machine-dependent code generation seams
//!
//! The machine-independent analyses hand the emitter small, per-target work
//! plans rather than instructions. The only plan the GC core drives is the
//! frame-zeroing schedule consumed by the function prologue generator.

pub mod frame_zero;

pub use frame_zero::{plan_frame_zeroing, ZeroCode, ZERO_TRAMPOLINE_WORDS, ZERO_UNROLL_WORDS};
