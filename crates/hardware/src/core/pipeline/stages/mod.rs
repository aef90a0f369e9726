//! Reference stage models.
//!
//! The orchestrator only knows the stage traits; these models give it
//! something concrete to drive. They cover the behaviour the pipeline
//! registers must carry:
//! 1. **Fetch1:** Line requests with a fixed instruction-cache latency.
//! 2. **Fetch2:** Line slicing and static `JAL` prediction.
//! 3. **Decode:** Bundle forwarding with backpressure.
//! 4. **Execute:** Fixed-latency functional units, branch resolution, drain.

/// Line-to-instruction stage.
pub mod fetch2;

/// Line fetch stage.
pub mod fetch1;

/// Decode stage.
pub mod decode;

/// Execute stage and the empty load/store queue.
pub mod execute;

/// Request/response counting memory port.
pub mod port;

pub use decode::Decode;
pub use execute::{Execute, NullLsq};
pub use fetch1::{FIRST_SEQ, Fetch1, FetchState};
pub use fetch2::Fetch2;
pub use port::SimplePort;

use crate::config::Config;
use crate::core::memory::ProgramImage;
use crate::core::pipeline::engine::{CPU_NAME, StageSet};

/// Builds the four reference stages over `image`, named `cpu.fetch1` and so on.
pub fn reference_stages(config: &Config, image: ProgramImage) -> StageSet {
    let entry = image.entry();
    StageSet {
        fetch1: Box::new(Fetch1::new(format!("{CPU_NAME}.fetch1"), config, image)),
        fetch2: Box::new(Fetch2::new(format!("{CPU_NAME}.fetch2"), config)),
        decode: Box::new(Decode::new(format!("{CPU_NAME}.decode"), config)),
        execute: Box::new(Execute::new(format!("{CPU_NAME}.execute"), config, entry)),
    }
}
