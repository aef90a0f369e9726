//! Execute: issue, branch resolution and retirement.
//!
//! Micro-ops are issued in order into a pool of fixed-latency functional
//! units and retire when their latency has elapsed. Branches resolve at
//! issue:
//! 1. **`JAL`:** `UnpredictedBranch` unless Fetch2 predicted the same target;
//!    a wrong predicted target gives `BadlyPredictedBranchTarget`.
//! 2. **`ECALL`:** `SuspendThread` to the next instruction.
//! 3. **Other:** `BadlyPredictedBranch` if Fetch2 marked it taken.
//!
//! A stream change bumps the thread's stream sequence number, so younger
//! micro-ops still in flight are squashed when they reach Execute.
//!
//! Draining stops issue and sends `HaltFetch` to every thread, carrying the
//! address fetch must resume from.

use std::collections::VecDeque;
use std::fmt;

use crate::common::{Cycle, ThreadId, Tick};
use crate::config::Config;
use crate::core::pipeline::buffer::{InputBuffer, InputStatus};
use crate::core::pipeline::latches::{BranchData, BranchReason, ForwardInstData, MicroOp};
use crate::core::pipeline::stages::fetch1::FIRST_SEQ;
use crate::core::pipeline::stages::port::SimplePort;
use crate::core::pipeline::traits::{
    CachePort, ExecutePorts, ExecuteStage, LsqHooks, Stage, StageContext,
};
use crate::isa::opcodes::INSTRUCTION_BYTES;
use crate::isa::{InstClass, classify};

/// FNV-1a offset basis.
const SIGNATURE_SEED: u64 = 0xcbf2_9ce4_8422_2325;

/// FNV-1a prime.
const SIGNATURE_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Load/store queue without memory operations; only the fault-injection
/// hooks are live.
#[derive(Clone, Debug, Default)]
pub struct NullLsq {
    injection_polls: u64,
    profile_samples: u64,
}

impl NullLsq {
    /// Times the injection hook was polled.
    pub const fn injection_polls(&self) -> u64 {
        self.injection_polls
    }

    /// Occupancy samples taken.
    pub const fn profile_samples(&self) -> u64 {
        self.profile_samples
    }
}

impl LsqHooks for NullLsq {
    fn inject_fault(&mut self, now: Tick) {
        self.injection_polls += 1;
        tracing::trace!(target: "minorfi::fault", "tick {}: LSQ empty, nothing to corrupt", now);
    }

    fn fi_profiling(&mut self, _now: Tick) {
        self.profile_samples += 1;
    }
}

#[derive(Clone, Debug)]
struct InFlightOp {
    op: MicroOp,
    done_at: Cycle,
}

#[derive(Clone, Copy, Debug)]
struct ThreadExec {
    stream_seq: u64,
    next_pc: u64,
    halt_pending: bool,
}

/// Reference Execute stage.
#[derive(Debug)]
pub struct Execute {
    name: String,
    input: InputBuffer<ForwardInstData>,
    issue_index: usize,
    fus: VecDeque<InFlightOp>,
    num_fus: usize,
    latency: Cycle,
    threads: Vec<ThreadExec>,
    draining: bool,
    fu_inject_loc: usize,
    retired: u64,
    squashed: u64,
    signature: u64,
    port: SimplePort,
    lsq: NullLsq,
    addrs: Vec<String>,
}

impl Execute {
    /// Creates the stage; every thread resumes at `entry` until it issues.
    pub fn new(name: impl Into<String>, config: &Config, entry: u64) -> Self {
        let name = name.into();
        let pipeline = &config.pipeline;
        Self {
            port: SimplePort::new(format!("{name}.dcache_port")),
            name,
            input: InputBuffer::new(pipeline.execute_input_buffer_size),
            issue_index: 0,
            fus: VecDeque::with_capacity(pipeline.num_functional_units),
            num_fus: pipeline.num_functional_units,
            latency: pipeline.execute_latency,
            threads: vec![
                ThreadExec {
                    stream_seq: FIRST_SEQ,
                    next_pc: entry,
                    halt_pending: false,
                };
                config.general.num_threads as usize
            ],
            draining: false,
            fu_inject_loc: config.fault_injection.fu_inject_loc,
            retired: 0,
            squashed: 0,
            signature: SIGNATURE_SEED,
            lsq: NullLsq::default(),
            addrs: Vec::new(),
        }
    }

    /// Micro-ops discarded because they belonged to an old stream.
    pub const fn squashed(&self) -> u64 {
        self.squashed
    }

    /// Address `tid` would execute next.
    pub fn next_pc(&self, tid: ThreadId) -> Option<u64> {
        self.threads.get(tid as usize).map(|t| t.next_pc)
    }

    /// LSQ hook counters.
    pub const fn lsq_counters(&self) -> &NullLsq {
        &self.lsq
    }

    fn retire(&mut self, cycle: Cycle) {
        while self.fus.front().is_some_and(|f| f.done_at <= cycle) {
            let Some(done) = self.fus.pop_front() else {
                break;
            };
            self.retired += 1;
            for value in [done.op.pc, u64::from(done.op.inst)] {
                self.signature = (self.signature ^ value).wrapping_mul(SIGNATURE_PRIME);
            }
        }
    }

    /// Issues from the head bundle until the FUs are full, a branch is
    /// raised or the input is exhausted.
    fn issue(&mut self, cycle: Cycle) -> Option<BranchData> {
        loop {
            let (tid, next) = {
                let bundle = self.input.front()?;
                (bundle.thread_id, bundle.insts().get(self.issue_index).cloned())
            };
            let Some(op) = next else {
                let _ = self.input.pop();
                self.issue_index = 0;
                continue;
            };
            let Some(thread) = self.threads.get(tid as usize) else {
                self.squashed += 1;
                self.issue_index += 1;
                continue;
            };
            if op.stream_seq != thread.stream_seq {
                self.squashed += 1;
                self.issue_index += 1;
                continue;
            }
            if self.draining || self.fus.len() >= self.num_fus {
                return None;
            }
            self.issue_index += 1;
            self.addrs.push(format!("{:#x}", op.pc));
            let branch = self.resolve(tid, &op);
            self.fus.push_back(InFlightOp {
                op,
                done_at: cycle + self.latency,
            });
            if branch.is_some() {
                return branch;
            }
        }
    }

    fn resolve(&mut self, tid: ThreadId, op: &MicroOp) -> Option<BranchData> {
        let thread = self.threads.get_mut(tid as usize)?;
        let fallthrough = op.pc.wrapping_add(INSTRUCTION_BYTES);
        let (reason, target) = match classify(op.inst) {
            InstClass::Jump { offset } => {
                let target = op.pc.wrapping_add_signed(offset);
                let reason = if !op.predicted_taken.is_set() {
                    BranchReason::UnpredictedBranch
                } else if op.predicted_target != target {
                    BranchReason::BadlyPredictedBranchTarget
                } else {
                    BranchReason::CorrectlyPredictedBranch
                };
                (reason, target)
            }
            InstClass::Suspend => (BranchReason::SuspendThread, fallthrough),
            InstClass::Alu if op.predicted_taken.is_set() => {
                (BranchReason::BadlyPredictedBranch, fallthrough)
            }
            InstClass::Alu => (BranchReason::NoBranch, fallthrough),
        };
        thread.next_pc = target;
        if !reason.is_stream_change() {
            return None;
        }
        thread.stream_seq += 1;
        Some(BranchData::new(
            reason,
            tid,
            target,
            thread.stream_seq,
            FIRST_SEQ,
        ))
    }

    fn halt_fetch(&mut self) -> Option<BranchData> {
        let (tid, thread) = self
            .threads
            .iter_mut()
            .enumerate()
            .find(|(_, t)| t.halt_pending)?;
        thread.halt_pending = false;
        thread.stream_seq += 1;
        Some(BranchData::new(
            BranchReason::HaltFetch,
            tid as ThreadId,
            thread.next_pc,
            thread.stream_seq,
            FIRST_SEQ,
        ))
    }
}

impl Stage for Execute {
    fn name(&self) -> &str {
        &self.name
    }

    /// Pending `HaltFetch`es are not counted; a thread still fetching keeps
    /// Fetch1 undrained until its halt arrives.
    fn is_drained(&self) -> bool {
        self.input.is_empty() && self.fus.is_empty()
    }

    fn minor_trace(&self) -> String {
        let in_flight: Vec<String> = self
            .fus
            .iter()
            .map(|f| format!("{}.{}", f.op.stream_seq, f.op.seq_num))
            .collect();
        format!(
            "{} input={} fus=({}) retired={} draining={}",
            self.name,
            self.input.len(),
            in_flight.join(","),
            self.retired,
            self.draining
        )
    }

    fn take_snapshot_addrs(&mut self) -> Vec<String> {
        std::mem::take(&mut self.addrs)
    }
}

impl ExecuteStage for Execute {
    fn evaluate(&mut self, ctx: &mut StageContext<'_>, ports: ExecutePorts<'_>) {
        let ExecutePorts {
            insts_in,
            mut branch_out,
        } = ports;

        let retired_before = self.retired;
        self.retire(ctx.cycle);
        self.input.push(insts_in.read());

        let branch = self.issue(ctx.cycle).or_else(|| self.halt_fetch());
        if let Some(branch) = branch {
            tracing::debug!("{}: {} for thread {}", self.name, branch, branch.thread_id);
            branch_out.write(branch);
            ctx.activity.activity();
        }

        let halts_pending = self.threads.iter().any(|t| t.halt_pending);
        if self.retired != retired_before || halts_pending || !self.is_drained() {
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
        let bit = self.fu_inject_loc % 32;
        let Some(oldest) = self.fus.front_mut() else {
            return false;
        };
        oldest.op.inst ^= 1 << bit;
        tracing::info!(
            target: "minorfi::fault",
            "{}: flipped bit {} of in-flight {:#x}",
            self.name,
            bit,
            oldest.op.pc
        );
        true
    }

    fn drain(&mut self) {
        self.draining = true;
        for thread in &mut self.threads {
            thread.halt_pending = true;
        }
    }

    fn drain_resume(&mut self) {
        self.draining = false;
        for thread in &mut self.threads {
            thread.halt_pending = false;
        }
    }

    fn print_all_fu(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        for i in 0..self.num_fus {
            writeln!(
                out,
                "{}.fu[{}] IntAlu opLat={} issueLat=1",
                self.name, i, self.latency
            )?;
        }
        Ok(())
    }

    fn retired_insts(&self) -> u64 {
        self.retired
    }

    fn commit_signature(&self) -> u64 {
        self.signature
    }
}
