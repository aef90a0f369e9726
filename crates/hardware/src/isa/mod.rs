//! Instruction set definitions used by the reference stage models.
//!
//! The stage models only need to tell three kinds of instruction apart:
//! * `JAL`: unconditional PC-relative jump, resolved in Execute.
//! * `ECALL`: suspends the issuing thread.
//! * Everything else: a single-cycle ALU operation.

/// Instruction classification and immediate decoding.
pub mod decode;

/// Major opcodes and fixed encodings.
pub mod opcodes;

pub use decode::{InstClass, classify};
