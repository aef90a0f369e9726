//! Simulation host and program loading.
//!
//! Provides the loader that turns a program file into a [`ProgramImage`]
//! and the [`Simulator`] that clocks a pipeline built from it.
//!
//! [`ProgramImage`]: crate::core::ProgramImage

/// Program file loader.
pub mod loader;

/// Tick-driven host loop.
pub mod simulator;

pub use loader::{DEFAULT_BASE, load_program, parse_program};
pub use simulator::{RunReport, SimCpu, Simulator};
