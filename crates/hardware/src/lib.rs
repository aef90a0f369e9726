//! Cycle-level in-order pipeline with register fault injection.
//!
//! This crate models a four-stage in-order pipeline (Fetch1, Fetch2, Decode,
//! Execute) joined by five timed pipeline registers:
//! 1. **Core:** Orchestrator, timed buffers, activity tracking and drain.
//! 2. **Faults:** Single-bit upsets scheduled into one pipeline register, or
//!    into a functional unit.
//! 3. **ISA:** Just enough RISC-V decoding for the reference stages.
//! 4. **Simulation:** Program loading and a host loop driving the pipeline.
//! 5. **Statistics:** Cycle, snapshot and bubble-time counters.

/// Common types and errors.
pub mod common;
/// Simulator configuration (JSON, defaults, validation).
pub mod config;
/// Pipeline orchestrator, buffers and reference stages.
pub mod core;
/// Instruction classification for the reference stages.
pub mod isa;
/// Program loader and host simulation loop.
pub mod sim;
/// Pipeline statistics collection and reporting.
pub mod stats;

/// Root configuration type; use `Config::default()` or load it from JSON.
pub use crate::config::Config;
/// Pipeline orchestrator.
pub use crate::core::Pipeline;
/// Host loop owning a pipeline and its CPU context.
pub use crate::sim::Simulator;
