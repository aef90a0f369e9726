/// Stub CPU context and tick loop.
pub mod harness;

/// `mockall` CPU context.
pub mod mocks;

/// Scripted probe stages.
pub mod probes;

/// Instruction image builder.
pub mod program;

/// In-memory `tracing` writer.
pub mod capture;
