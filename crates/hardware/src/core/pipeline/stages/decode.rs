//! Decode: bundle forwarding.
//!
//! Bundles from Fetch2 are queued and passed on, one per cycle, whenever
//! Execute's input buffer can take another.

use crate::config::Config;
use crate::core::pipeline::buffer::{InputBuffer, InputStatus};
use crate::core::pipeline::latches::ForwardInstData;
use crate::core::pipeline::traits::{DecodePorts, DecodeStage, Stage, StageContext};

/// Reference Decode stage.
#[derive(Debug)]
pub struct Decode {
    name: String,
    input: InputBuffer<ForwardInstData>,
    addrs: Vec<String>,
}

impl Decode {
    /// Creates the stage with an empty input buffer.
    pub fn new(name: impl Into<String>, config: &Config) -> Self {
        Self {
            name: name.into(),
            input: InputBuffer::new(config.pipeline.decode_input_buffer_size),
            addrs: Vec::new(),
        }
    }
}

impl Stage for Decode {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_drained(&self) -> bool {
        self.input.is_empty()
    }

    fn minor_trace(&self) -> String {
        let queued: Vec<String> = self.input.iter().map(ToString::to_string).collect();
        format!("{} input=({})", self.name, queued.join(" "))
    }

    fn take_snapshot_addrs(&mut self) -> Vec<String> {
        std::mem::take(&mut self.addrs)
    }
}

impl DecodeStage for Decode {
    fn evaluate(&mut self, ctx: &mut StageContext<'_>, ports: DecodePorts<'_>) {
        let DecodePorts {
            insts_in,
            mut insts_out,
            next_stage_input,
        } = ports;

        self.input.push(insts_in.read());

        if next_stage_input.can_reserve() {
            if let Some(bundle) = self.input.pop() {
                self.addrs
                    .extend(bundle.insts().iter().map(|op| format!("{:#x}", op.pc)));
                insts_out.write(bundle);
                ctx.activity.activity();
            }
        }

        if !self.input.is_empty() {
            ctx.activity.activity();
        }
    }

    fn input_buffer(&self) -> &dyn InputStatus {
        &self.input
    }
}
