//! # Unit Components
//!
//! This module serves as the central hub for the pipeline unit suites,
//! organized the same way as the library modules they exercise.



/// Instruction classification used by the reference stages.
pub mod isa;


/// Statistic names and bubble percentages.
pub mod stats;
