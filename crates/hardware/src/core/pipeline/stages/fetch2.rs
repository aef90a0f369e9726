//! Fetch2: lines to micro-ops.
//!
//! Lines are queued in the input buffer and sliced into 32-bit instructions.
//! A line whose stream or prediction sequence number no longer matches the
//! thread's expectation is discarded whole. With static jump prediction on,
//! a `JAL` ends the bundle and sends a `BranchPrediction` back to Fetch1.

use crate::common::ThreadId;
use crate::config::Config;
use crate::core::pipeline::buffer::{BufferInput, InputBuffer, InputStatus};
use crate::core::pipeline::latches::{
    BranchData, BranchReason, Flag, ForwardInstData, ForwardLineData, MicroOp, Payload,
};
use crate::core::pipeline::stages::fetch1::FIRST_SEQ;
use crate::core::pipeline::traits::{Fetch2Ports, Fetch2Stage, Stage, StageContext};
use crate::isa::opcodes::INSTRUCTION_BYTES;
use crate::isa::{InstClass, classify};

#[derive(Clone, Copy, Debug)]
struct ThreadExpect {
    stream_seq: u64,
    prediction_seq: u64,
}

/// Reference Fetch2 stage.
#[derive(Debug)]
pub struct Fetch2 {
    name: String,
    width: usize,
    predict_jumps: bool,
    input: InputBuffer<ForwardLineData>,
    threads: Vec<ThreadExpect>,
    cursor: Option<u64>,
    fetch_seq: u64,
    discarded_lines: u64,
    addrs: Vec<String>,
}

impl Fetch2 {
    /// Creates the stage expecting the first stream on every thread.
    pub fn new(name: impl Into<String>, config: &Config) -> Self {
        Self {
            name: name.into(),
            width: config.pipeline.decode_input_width as usize,
            predict_jumps: config.pipeline.predict_jumps,
            input: InputBuffer::new(config.pipeline.fetch2_input_buffer_size),
            threads: vec![
                ThreadExpect {
                    stream_seq: FIRST_SEQ,
                    prediction_seq: FIRST_SEQ,
                };
                config.general.num_threads as usize
            ],
            cursor: None,
            fetch_seq: 1,
            discarded_lines: 0,
            addrs: Vec::new(),
        }
    }

    /// Lines dropped because their stream or prediction was stale.
    pub const fn discarded_lines(&self) -> u64 {
        self.discarded_lines
    }

    fn is_current(&self, line: &ForwardLineData) -> bool {
        self.threads.get(line.thread_id as usize).is_some_and(|t| {
            t.stream_seq == line.stream_seq && t.prediction_seq == line.prediction_seq
        })
    }

    fn drop_head(&mut self) {
        let _ = self.input.pop();
        self.cursor = None;
    }

    /// Packs up to `width` micro-ops from the head lines.
    fn build_bundle(&mut self, prediction_out: &mut BufferInput<'_, BranchData>) -> ForwardInstData {
        let mut bundle = ForwardInstData::bubble(self.width);
        while !bundle.is_full() {
            let Some(line) = self.input.front() else {
                break;
            };
            if !self.is_current(line) {
                self.discarded_lines += 1;
                self.drop_head();
                continue;
            }
            if !bundle.is_bubble() && bundle.thread_id != line.thread_id {
                break;
            }
            let tid: ThreadId = line.thread_id;
            let stream_seq = line.stream_seq;
            let pc = self.cursor.unwrap_or(line.pc);
            let offset = pc.wrapping_sub(line.line_base) as usize;
            let word = line
                .data
                .get(offset..offset.saturating_add(INSTRUCTION_BYTES as usize))
                .and_then(|bytes| <[u8; 4]>::try_from(bytes).ok());
            let Some(word) = word else {
                self.drop_head();
                continue;
            };
            let inst = u32::from_le_bytes(word);
            self.cursor = Some(pc + INSTRUCTION_BYTES);

            let mut op = MicroOp {
                bubble: Flag::CLEAR,
                pc,
                seq_num: self.fetch_seq,
                stream_seq,
                inst,
                predicted_taken: Flag::CLEAR,
                predicted_target: 0,
            };
            self.fetch_seq += 1;
            self.addrs.push(format!("{pc:#x}"));

            let mut predicted = false;
            if self.predict_jumps {
                if let InstClass::Jump { offset } = classify(inst) {
                    let target = pc.wrapping_add_signed(offset);
                    op.predicted_taken = Flag::SET;
                    op.predicted_target = target;
                    if let Some(thread) = self.threads.get_mut(tid as usize) {
                        thread.prediction_seq += 1;
                        prediction_out.write(BranchData::new(
                            BranchReason::BranchPrediction,
                            tid,
                            target,
                            stream_seq,
                            thread.prediction_seq,
                        ));
                    }
                    predicted = true;
                }
            }

            bundle.thread_id = tid;
            if bundle.push(op).is_err() {
                break;
            }
            if predicted {
                self.drop_head();
                break;
            }
        }
        bundle
    }
}

impl Stage for Fetch2 {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_drained(&self) -> bool {
        self.input.is_empty()
    }

    fn minor_trace(&self) -> String {
        let lines: Vec<String> = self.input.iter().map(ToString::to_string).collect();
        format!(
            "{} input=({}) cursor={}",
            self.name,
            lines.join(","),
            self.cursor.map_or_else(|| "-".to_string(), |pc| format!("{pc:#x}"))
        )
    }

    fn take_snapshot_addrs(&mut self) -> Vec<String> {
        std::mem::take(&mut self.addrs)
    }
}

impl Fetch2Stage for Fetch2 {
    fn evaluate(&mut self, ctx: &mut StageContext<'_>, ports: Fetch2Ports<'_>) {
        let Fetch2Ports {
            lines_in,
            branch_in,
            mut prediction_out,
            mut insts_out,
            next_stage_input,
        } = ports;

        self.input.push(lines_in.read());

        let branch = branch_in.read();
        if branch.is_branch() && branch.reason.is_stream_change() {
            if let Some(thread) = self.threads.get_mut(branch.thread_id as usize) {
                thread.stream_seq = branch.new_stream_seq;
                thread.prediction_seq = branch.new_prediction_seq;
            }
        }

        if next_stage_input.can_reserve() {
            let bundle = self.build_bundle(&mut prediction_out);
            if !bundle.is_bubble() {
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
