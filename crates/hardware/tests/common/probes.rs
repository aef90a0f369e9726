//! Probe stages: they record every non-bubble payload they read, forward
//! what they receive one stage down, and write scripted payloads on cue.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use minorfi_core::common::{ThreadId, Tick};
use minorfi_core::config::Config;
use minorfi_core::core::pipeline::StageSet;
use minorfi_core::core::pipeline::buffer::{InputBuffer, InputStatus};
use minorfi_core::core::pipeline::latches::{
    BranchData, Flag, ForwardInstData, ForwardLineData, MicroOp, Payload,
};
use minorfi_core::core::pipeline::stages::{NullLsq, SimplePort};
use minorfi_core::core::pipeline::traits::{
    CachePort, DecodePorts, DecodeStage, ExecutePorts, ExecuteStage, Fetch1Ports, Fetch1Stage,
    Fetch2Ports, Fetch2Stage, LsqHooks, Stage, StageContext,
};

/// Everything the probes observed, keyed by the tick of observation.
#[derive(Debug, Default)]
pub struct Observations {
    pub fetch1_branches: Vec<(Tick, BranchData)>,
    pub fetch1_predictions: Vec<(Tick, BranchData)>,
    pub fetch2_lines: Vec<(Tick, ForwardLineData)>,
    pub decode_insts: Vec<(Tick, ForwardInstData)>,
    pub execute_insts: Vec<(Tick, ForwardInstData)>,
    pub fu_calls: u32,
    pub wakeups: Vec<ThreadId>,
    pub drains: u32,
}

pub type Shared = Rc<RefCell<Observations>>;

/// One-instruction bundle carrying `line`'s address.
pub fn bundle_for(line: &ForwardLineData, width: usize) -> ForwardInstData {
    let mut bundle = ForwardInstData::bubble(width);
    bundle.thread_id = line.thread_id;
    let op = MicroOp {
        bubble: Flag::CLEAR,
        pc: line.pc,
        seq_num: 1,
        stream_seq: line.stream_seq,
        inst: 0x13,
        predicted_taken: Flag::CLEAR,
        predicted_target: 0,
    };
    let _ = bundle.push(op);
    bundle
}

/// A live line at `pc`.
pub fn line_at(pc: u64) -> ForwardLineData {
    ForwardLineData {
        bubble: Flag::CLEAR,
        thread_id: 0,
        pc,
        line_base: pc,
        stream_seq: 1,
        prediction_seq: 1,
        data: vec![0x13, 0, 0, 0],
    }
}

/// Builder for a probe stage set.
#[derive(Debug, Default)]
pub struct Probes {
    lines: Vec<(Tick, ForwardLineData)>,
    branches: Vec<(Tick, BranchData)>,
    fu_result: bool,
}

impl Probes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch1 writes `line` into f1ToF2 at `tick`.
    pub fn line(mut self, tick: Tick, line: ForwardLineData) -> Self {
        self.lines.push((tick, line));
        self
    }

    /// Execute writes `branch` into eToF1 at `tick`.
    pub fn branch(mut self, tick: Tick, branch: BranchData) -> Self {
        self.branches.push((tick, branch));
        self
    }

    /// Value Execute's FU hook reports.
    pub fn fu_result(mut self, applied: bool) -> Self {
        self.fu_result = applied;
        self
    }

    pub fn build(self, config: &Config) -> (StageSet, Shared) {
        let seen = Shared::default();
        let width = config.pipeline.decode_input_width as usize;
        let stages = StageSet {
            fetch1: Box::new(ProbeFetch1 {
                seen: Rc::clone(&seen),
                lines: self.lines,
                port: SimplePort::new("probe.icache_port"),
            }),
            fetch2: Box::new(ProbeFetch2 {
                seen: Rc::clone(&seen),
                width,
                input: InputBuffer::new(1),
            }),
            decode: Box::new(ProbeDecode {
                seen: Rc::clone(&seen),
                input: InputBuffer::new(1),
            }),
            execute: Box::new(ProbeExecute {
                seen: Rc::clone(&seen),
                branches: self.branches,
                fu_result: self.fu_result,
                input: InputBuffer::new(1),
                port: SimplePort::new("probe.dcache_port"),
                lsq: NullLsq::default(),
            }),
        };
        (stages, seen)
    }
}

struct ProbeFetch1 {
    seen: Shared,
    lines: Vec<(Tick, ForwardLineData)>,
    port: SimplePort,
}

struct ProbeFetch2 {
    seen: Shared,
    width: usize,
    input: InputBuffer<ForwardLineData>,
}

struct ProbeDecode {
    seen: Shared,
    input: InputBuffer<ForwardInstData>,
}

struct ProbeExecute {
    seen: Shared,
    branches: Vec<(Tick, BranchData)>,
    fu_result: bool,
    input: InputBuffer<ForwardInstData>,
    port: SimplePort,
    lsq: NullLsq,
}

macro_rules! probe_stage {
    ($ty:ident, $name:literal) => {
        impl Stage for $ty {
            fn name(&self) -> &str {
                $name
            }

            fn is_drained(&self) -> bool {
                true
            }

            fn minor_trace(&self) -> String {
                $name.to_string()
            }
        }

        impl fmt::Debug for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str($name)
            }
        }
    };
}

probe_stage!(ProbeFetch1, "probe.fetch1");
probe_stage!(ProbeFetch2, "probe.fetch2");
probe_stage!(ProbeDecode, "probe.decode");
probe_stage!(ProbeExecute, "probe.execute");

impl Fetch1Stage for ProbeFetch1 {
    fn evaluate(&mut self, ctx: &mut StageContext<'_>, mut ports: Fetch1Ports<'_>) {
        let mut seen = self.seen.borrow_mut();
        let branch = ports.branch_in.read();
        if !branch.is_bubble() {
            seen.fetch1_branches.push((ctx.now, branch.clone()));
        }
        let prediction = ports.prediction_in.read();
        if !prediction.is_bubble() {
            seen.fetch1_predictions.push((ctx.now, prediction.clone()));
        }
        if let Some((_, line)) = self.lines.iter().find(|(t, _)| *t == ctx.now) {
            ports.lines_out.write(line.clone());
            ctx.activity.activity();
        }
    }

    fn wakeup_fetch(&mut self, tid: ThreadId) {
        self.seen.borrow_mut().wakeups.push(tid);
    }

    fn icache_port(&mut self) -> &mut dyn CachePort {
        &mut self.port
    }
}

impl Fetch2Stage for ProbeFetch2 {
    fn evaluate(&mut self, ctx: &mut StageContext<'_>, mut ports: Fetch2Ports<'_>) {
        let line = ports.lines_in.read();
        if !line.is_bubble() {
            self.seen
                .borrow_mut()
                .fetch2_lines
                .push((ctx.now, line.clone()));
            ports.insts_out.write(bundle_for(line, self.width));
            ctx.activity.activity();
        }
    }

    fn input_buffer(&self) -> &dyn InputStatus {
        &self.input
    }
}

impl DecodeStage for ProbeDecode {
    fn evaluate(&mut self, ctx: &mut StageContext<'_>, mut ports: DecodePorts<'_>) {
        let bundle = ports.insts_in.read();
        if !bundle.is_bubble() {
            self.seen
                .borrow_mut()
                .decode_insts
                .push((ctx.now, bundle.clone()));
            ports.insts_out.write(bundle.clone());
            ctx.activity.activity();
        }
    }

    fn input_buffer(&self) -> &dyn InputStatus {
        &self.input
    }
}

impl ExecuteStage for ProbeExecute {
    fn evaluate(&mut self, ctx: &mut StageContext<'_>, mut ports: ExecutePorts<'_>) {
        let bundle = ports.insts_in.read();
        if !bundle.is_bubble() {
            self.seen
                .borrow_mut()
                .execute_insts
                .push((ctx.now, bundle.clone()));
        }
        if let Some((_, branch)) = self.branches.iter().find(|(t, _)| *t == ctx.now) {
            ports.branch_out.write(branch.clone());
            ctx.activity.activity();
        }
    }

    fn input_buffer(&self) -> &dyn InputStatus {
        &self.input
    }

    fn dcache_port(&mut self) -> &mut dyn CachePort {
        &mut self.port
    }

    fn lsq(&mut self) -> &mut dyn LsqHooks {
        &mut self.lsq
    }

    fn inject_fault_to_fu(&mut self) -> bool {
        self.seen.borrow_mut().fu_calls += 1;
        self.fu_result
    }

    fn drain(&mut self) {
        self.seen.borrow_mut().drains += 1;
    }

    fn drain_resume(&mut self) {}

    fn print_all_fu(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        writeln!(out, "probe.execute.fu[0] IntAlu opLat=1 issueLat=1")
    }

    fn retired_insts(&self) -> u64 {
        0
    }
}
