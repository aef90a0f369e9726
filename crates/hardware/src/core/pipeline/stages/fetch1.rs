//! Fetch1: line fetch.
//!
//! Each thread owns a fetch address and the stream/prediction sequence
//! numbers its lines are stamped with. Per cycle the stage:
//! 1. **Redirects:** Applies a branch from Execute, or failing that a
//!    prediction from Fetch2 that belongs to the current stream.
//! 2. **Delivers:** Sends the oldest returned line to Fetch2 when Fetch2's
//!    input buffer has room.
//! 3. **Requests:** Issues one line request for the next running thread.

use std::collections::VecDeque;

use crate::common::{Cycle, ThreadId};
use crate::config::Config;
use crate::core::memory::ProgramImage;
use crate::core::pipeline::latches::{BranchData, BranchReason, Flag, ForwardLineData};
use crate::core::pipeline::stages::port::SimplePort;
use crate::core::pipeline::traits::{CachePort, Fetch1Ports, Fetch1Stage, Stage, StageContext};

/// Outstanding line requests.
const FETCH_LIMIT: usize = 1;

/// First stream and prediction sequence number.
pub const FIRST_SEQ: u64 = 1;

/// Per-thread fetch state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchState {
    /// Not fetching: never woken, or halted for a drain.
    Halted,
    /// Stopped by the thread itself (`ECALL`) until woken.
    Suspended,
    /// Fetching sequentially from `pc`.
    Running,
}

#[derive(Clone, Debug)]
struct ThreadFetch {
    state: FetchState,
    pc: u64,
    stream_seq: u64,
    prediction_seq: u64,
}

#[derive(Clone, Debug)]
struct PendingLine {
    ready_at: Cycle,
    line: ForwardLineData,
}

/// Reference Fetch1 stage.
#[derive(Debug)]
pub struct Fetch1 {
    name: String,
    image: ProgramImage,
    line_bytes: u64,
    icache_latency: Cycle,
    threads: Vec<ThreadFetch>,
    next_thread: usize,
    in_flight: VecDeque<PendingLine>,
    port: SimplePort,
    addrs: Vec<String>,
}

impl Fetch1 {
    /// Creates the stage with every thread halted at the image entry.
    pub fn new(name: impl Into<String>, config: &Config, image: ProgramImage) -> Self {
        let name = name.into();
        let threads = (0..config.general.num_threads)
            .map(|_| ThreadFetch {
                state: FetchState::Halted,
                pc: image.entry(),
                stream_seq: FIRST_SEQ,
                prediction_seq: FIRST_SEQ,
            })
            .collect();
        Self {
            port: SimplePort::new(format!("{name}.icache_port")),
            name,
            image,
            line_bytes: u64::from(config.pipeline.fetch_line_bytes),
            icache_latency: config.pipeline.icache_latency,
            threads,
            next_thread: 0,
            in_flight: VecDeque::with_capacity(FETCH_LIMIT),
            addrs: Vec::new(),
        }
    }

    /// Fetch state of `tid`.
    pub fn state(&self, tid: ThreadId) -> Option<FetchState> {
        self.threads.get(tid as usize).map(|t| t.state)
    }

    /// Next fetch address of `tid`.
    pub fn pc(&self, tid: ThreadId) -> Option<u64> {
        self.threads.get(tid as usize).map(|t| t.pc)
    }

    fn change_stream(&mut self, branch: &BranchData) {
        if !branch.reason.is_stream_change() {
            return;
        }
        let tid = branch.thread_id;
        let Some(thread) = self.threads.get_mut(tid as usize) else {
            tracing::warn!("{}: branch for unknown thread {}", self.name, tid);
            return;
        };
        thread.stream_seq = branch.new_stream_seq;
        thread.prediction_seq = branch.new_prediction_seq;
        thread.pc = branch.target;
        thread.state = match branch.reason {
            BranchReason::SuspendThread => FetchState::Suspended,
            BranchReason::HaltFetch => FetchState::Halted,
            _ => FetchState::Running,
        };
        let stream = thread.stream_seq;
        self.in_flight
            .retain(|p| p.line.thread_id != tid || p.line.stream_seq == stream);
    }

    fn apply_prediction(&mut self, prediction: &BranchData) {
        let tid = prediction.thread_id;
        let Some(thread) = self.threads.get_mut(tid as usize) else {
            return;
        };
        if thread.state != FetchState::Running || prediction.new_stream_seq != thread.stream_seq {
            return;
        }
        thread.prediction_seq = prediction.new_prediction_seq;
        thread.pc = prediction.target;
        let seq = thread.prediction_seq;
        self.in_flight
            .retain(|p| p.line.thread_id != tid || p.line.prediction_seq == seq);
    }

    fn pick_thread(&mut self) -> Option<usize> {
        let n = self.threads.len();
        let tid = (0..n)
            .map(|i| (self.next_thread + i) % n)
            .find(|&t| self.threads[t].state == FetchState::Running)?;
        self.next_thread = (tid + 1) % n;
        Some(tid)
    }

    fn request_line(&mut self, tid: usize, cycle: Cycle) {
        let thread = &mut self.threads[tid];
        let pc = thread.pc;
        let line_base = pc - pc % self.line_bytes;
        let line = ForwardLineData {
            bubble: Flag::CLEAR,
            thread_id: tid as ThreadId,
            pc,
            line_base,
            stream_seq: thread.stream_seq,
            prediction_seq: thread.prediction_seq,
            data: self.image.read(line_base, self.line_bytes as usize),
        };
        thread.pc = line_base + self.line_bytes;
        self.in_flight.push_back(PendingLine {
            ready_at: cycle + self.icache_latency,
            line,
        });
        self.port.record_request();
        self.addrs.push(format!("{pc:#x}"));
    }
}

impl Stage for Fetch1 {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_drained(&self) -> bool {
        self.in_flight.is_empty() && self.threads.iter().all(|t| t.state != FetchState::Running)
    }

    fn minor_trace(&self) -> String {
        let states: Vec<String> = self
            .threads
            .iter()
            .map(|t| {
                let s = match t.state {
                    FetchState::Halted => 'H',
                    FetchState::Suspended => 'S',
                    FetchState::Running => 'R',
                };
                format!("{s}{}.{}@{:#x}", t.stream_seq, t.prediction_seq, t.pc)
            })
            .collect();
        format!(
            "{} threads={} in_flight={}",
            self.name,
            states.join(","),
            self.in_flight.len()
        )
    }

    fn take_snapshot_addrs(&mut self) -> Vec<String> {
        std::mem::take(&mut self.addrs)
    }
}

impl Fetch1Stage for Fetch1 {
    fn evaluate(&mut self, ctx: &mut StageContext<'_>, ports: Fetch1Ports<'_>) {
        let Fetch1Ports {
            branch_in,
            prediction_in,
            mut lines_out,
            next_stage_input,
        } = ports;

        let branch = branch_in.read();
        let prediction = prediction_in.read();
        if branch.is_branch() {
            self.change_stream(branch);
        } else if prediction.is_branch() {
            self.apply_prediction(prediction);
        }

        let ready = self
            .in_flight
            .front()
            .is_some_and(|p| p.ready_at <= ctx.cycle);
        if ready && next_stage_input.can_reserve() {
            if let Some(pending) = self.in_flight.pop_front() {
                lines_out.write(pending.line);
                self.port.record_response();
                ctx.activity.activity();
            }
        }

        if self.in_flight.len() < FETCH_LIMIT {
            if let Some(tid) = self.pick_thread() {
                self.request_line(tid, ctx.cycle);
                ctx.activity.activity();
            }
        }

        if !self.in_flight.is_empty() {
            ctx.activity.activity();
        }
    }

    fn wakeup_fetch(&mut self, tid: ThreadId) {
        if let Some(thread) = self.threads.get_mut(tid as usize) {
            if thread.state != FetchState::Running {
                tracing::debug!("{}: waking thread {} at {:#x}", self.name, tid, thread.pc);
                thread.state = FetchState::Running;
            }
        }
    }

    fn icache_port(&mut self) -> &mut dyn CachePort {
        &mut self.port
    }
}
