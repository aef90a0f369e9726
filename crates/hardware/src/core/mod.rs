//! Processor model.
//!
//! This module holds the pipeline orchestrator together with the program
//! image the reference fetch stage reads from.

/// Flat program image.
pub mod memory;

/// Pipeline registers, stages and orchestrator.
pub mod pipeline;

pub use self::memory::ProgramImage;
pub use self::pipeline::Pipeline;
