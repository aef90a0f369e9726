
/// Branch redirect timing through a two-cycle eToF1.
pub mod branch;




/// Pipeline-register fault injection.
pub mod injection;


/// Idle detection and quiescence.
pub mod quiescence;

/// Reference stages running real programs.
pub mod reference_stages;

/// Debug channels.
pub mod tracing_channels;
