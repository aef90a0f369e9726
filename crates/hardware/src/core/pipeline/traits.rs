//! Pipeline stage and collaborator interfaces.
//!
//! This module defines the contracts between the pipeline orchestrator and
//! the components it drives. It provides:
//! 1. **Stage Interfaces:** `Stage` plus one trait per stage (Fetch1, Fetch2,
//!    Decode, Execute) taking a context and a set of buffer handles.
//! 2. **Port Bundles:** Read handles to upstream outputs, write handles to
//!    downstream inputs, and the downstream input queue for backpressure.
//! 3. **CPU Interface:** Host time, thread count, drain signalling and the
//!    register-file injection hook.
//!
//! Stages never own each other or the buffers; everything they touch is lent
//! to them for one evaluation.

use std::fmt;

use crate::common::{Cycle, ThreadId, Tick};
use crate::core::pipeline::activity::ActivityRecorder;
use crate::core::pipeline::buffer::{BufferInput, BufferOutput, InputStatus};
use crate::core::pipeline::latches::{BranchData, ForwardInstData, ForwardLineData};

/// Everything a stage may use besides its ports during one evaluation.
#[derive(Debug)]
pub struct StageContext<'a> {
    /// Current host tick.
    pub now: Tick,
    /// Pipeline cycle number (evaluations so far).
    pub cycle: Cycle,
    /// Activity recorder; stages mark work here.
    pub activity: &'a mut ActivityRecorder,
}

/// Behaviour shared by all four stages.
pub trait Stage {
    /// Stage name, e.g. `cpu.fetch1`.
    fn name(&self) -> &str;

    /// No work in flight inside the stage.
    fn is_drained(&self) -> bool;

    /// One trace line describing internal state.
    fn minor_trace(&self) -> String;

    /// Addresses handled this cycle, for the snapshot renderer. Clears the list.
    fn take_snapshot_addrs(&mut self) -> Vec<String> {
        Vec::new()
    }
}

/// Memory-side port of a stage.
pub trait CachePort: fmt::Debug {
    /// Port name, e.g. `cpu.icache_port`.
    fn name(&self) -> &str;

    /// Requests sent so far.
    fn requests(&self) -> u64;

    /// Responses received so far.
    fn responses(&self) -> u64;
}

/// Fault-injection hooks of the load/store queue.
pub trait LsqHooks {
    /// Applies any LSQ fault scheduled for `now`.
    fn inject_fault(&mut self, now: Tick);

    /// Samples LSQ occupancy for fault-injection profiling.
    fn fi_profiling(&mut self, now: Tick);
}

/// Buffers lent to Fetch1.
#[derive(Debug)]
pub struct Fetch1Ports<'a> {
    /// Branches from Execute (eToF1 output).
    pub branch_in: BufferOutput<'a, BranchData>,
    /// Predictions from Fetch2 (f2ToF1 output).
    pub prediction_in: BufferOutput<'a, BranchData>,
    /// Lines to Fetch2 (f1ToF2 input).
    pub lines_out: BufferInput<'a, ForwardLineData>,
    /// Fetch2's input queue.
    pub next_stage_input: &'a dyn InputStatus,
}

/// Buffers lent to Fetch2.
#[derive(Debug)]
pub struct Fetch2Ports<'a> {
    /// Lines from Fetch1 (f1ToF2 output).
    pub lines_in: BufferOutput<'a, ForwardLineData>,
    /// Branches from Execute (eToF1 output).
    pub branch_in: BufferOutput<'a, BranchData>,
    /// Predictions to Fetch1 (f2ToF1 input).
    pub prediction_out: BufferInput<'a, BranchData>,
    /// Bundles to Decode (f2ToD input).
    pub insts_out: BufferInput<'a, ForwardInstData>,
    /// Decode's input queue.
    pub next_stage_input: &'a dyn InputStatus,
}

/// Buffers lent to Decode.
#[derive(Debug)]
pub struct DecodePorts<'a> {
    /// Bundles from Fetch2 (f2ToD output).
    pub insts_in: BufferOutput<'a, ForwardInstData>,
    /// Bundles to Execute (dToE input).
    pub insts_out: BufferInput<'a, ForwardInstData>,
    /// Execute's input queue.
    pub next_stage_input: &'a dyn InputStatus,
}

/// Buffers lent to Execute.
#[derive(Debug)]
pub struct ExecutePorts<'a> {
    /// Bundles from Decode (dToE output).
    pub insts_in: BufferOutput<'a, ForwardInstData>,
    /// Branches to Fetch1 (eToF1 input).
    pub branch_out: BufferInput<'a, BranchData>,
}

impl fmt::Debug for dyn InputStatus + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputStatus")
            .field("can_reserve", &self.can_reserve())
            .field("is_empty", &self.is_empty())
            .finish()
    }
}

/// Line fetch stage.
pub trait Fetch1Stage: Stage {
    /// Runs one cycle.
    fn evaluate(&mut self, ctx: &mut StageContext<'_>, ports: Fetch1Ports<'_>);

    /// Restarts fetch for `tid` after a suspension or halt.
    fn wakeup_fetch(&mut self, tid: ThreadId);

    /// Instruction-side memory port.
    fn icache_port(&mut self) -> &mut dyn CachePort;
}

/// Line-to-instruction stage.
pub trait Fetch2Stage: Stage {
    /// Runs one cycle.
    fn evaluate(&mut self, ctx: &mut StageContext<'_>, ports: Fetch2Ports<'_>);

    /// Queue Fetch1 checks before sending a line.
    fn input_buffer(&self) -> &dyn InputStatus;
}

/// Decode stage.
pub trait DecodeStage: Stage {
    /// Runs one cycle.
    fn evaluate(&mut self, ctx: &mut StageContext<'_>, ports: DecodePorts<'_>);

    /// Queue Fetch2 checks before sending a bundle.
    fn input_buffer(&self) -> &dyn InputStatus;
}

/// Execute stage.
pub trait ExecuteStage: Stage {
    /// Runs one cycle.
    fn evaluate(&mut self, ctx: &mut StageContext<'_>, ports: ExecutePorts<'_>);

    /// Queue Decode checks before sending a bundle.
    fn input_buffer(&self) -> &dyn InputStatus;

    /// Data-side memory port.
    fn dcache_port(&mut self) -> &mut dyn CachePort;

    /// Load/store queue hooks.
    fn lsq(&mut self) -> &mut dyn LsqHooks;

    /// Flips a functional-unit bit. Returns whether a fault was applied.
    fn inject_fault_to_fu(&mut self) -> bool;

    /// Stop accepting new work; let in-flight work retire.
    fn drain(&mut self);

    /// Leave the draining state.
    fn drain_resume(&mut self);

    /// Writes the functional-unit pool description.
    ///
    /// # Errors
    ///
    /// Propagates formatter errors.
    fn print_all_fu(&self, out: &mut dyn fmt::Write) -> fmt::Result;

    /// Micro-ops retired so far.
    fn retired_insts(&self) -> u64;

    /// Running hash of retired `(pc, inst)` pairs; differs from a fault-free
    /// run when a corrupted instruction retires.
    fn commit_signature(&self) -> u64 {
        0
    }
}

/// CPU-side services used by the pipeline.
pub trait CpuContext {
    /// Current host tick.
    fn cur_tick(&self) -> Tick;

    /// Number of hardware threads.
    fn num_threads(&self) -> ThreadId;

    /// Reports that a requested drain has completed.
    fn signal_drain_done(&mut self);

    /// Applies any register-file fault scheduled for the current tick.
    fn inject_fault_reg(&mut self);
}
