//! Four-stage in-order pipeline with fault-injectable registers.
//!
//! This module contains the pipeline orchestrator and everything it drives:
//! 1. **Edges and Latches:** The five inter-stage registers and their payloads.
//! 2. **Buffers:** Timed delay lines with bit-flip injection.
//! 3. **Activity:** Idle detection across stages and buffers.
//! 4. **Engine:** Per-cycle evaluation, drain handling and bubble statistics.
//! 5. **Stages:** Stage traits and the reference stage models.

/// Activity recorder used for idle detection.
pub mod activity;

/// Timed pipeline registers and stage input queues.
pub mod buffer;

/// The five pipeline-register edges.
pub mod edge;

/// Pipeline orchestrator.
pub mod engine;

/// Payloads carried by the pipeline registers.
pub mod latches;

/// Per-cycle register snapshot rendering.
pub mod snapshot;

/// Reference stage models.
pub mod stages;

/// Stage, port and CPU interfaces.
pub mod traits;

/// Scheduled fault injection into pipeline registers.
pub mod vulnerable;

pub use self::edge::Edge;
pub use self::engine::{Buffers, DrainState, Pipeline, StageSet};
