//! Common types shared across the pipeline simulator.
//!
//! This module provides the small vocabulary used everywhere else:
//! 1. **Time:** `Tick` (host time unit) and `Cycle` (evaluated pipeline cycles).
//! 2. **Threads:** `ThreadId` for hardware thread contexts.
//! 3. **Error Handling:** Configuration error types.

/// Error types for configuration loading and validation.
pub mod error;

pub use error::ConfigError;

/// Host simulator time unit. One clock period is a fixed number of ticks.
pub type Tick = u64;

/// Count of pipeline evaluations (clock cycles actually simulated).
pub type Cycle = u64;

/// Hardware thread identifier.
pub type ThreadId = u32;
