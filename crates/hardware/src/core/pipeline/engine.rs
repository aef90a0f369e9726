//! Pipeline orchestrator.
//!
//! The `Pipeline` owns the four stages, the five pipeline registers, the
//! activity recorder and the fault-injection registry. One call to
//! [`Pipeline::evaluate`] is one clock cycle:
//! 1. **Observe:** Sample every register output (what the stages see).
//! 2. **Inject:** Apply due register flips, then the CPU, LSQ and FU hooks.
//! 3. **Stages:** Execute, Decode, Fetch2, Fetch1, in that order, so writes
//!    to a one-cycle register are seen by its consumer next cycle while the
//!    backward prediction register reaches Fetch1 in step with the forward ones.
//! 4. **Advance:** Every register moves one slot.
//! 5. **Account:** Bubble ticks, snapshot rendering, activity, idling, drain.

use std::fmt;

use tracing::Level;

use crate::common::{ConfigError, Cycle, ThreadId, Tick};
use crate::config::{Config, FuInjectionMode, PipelineConfig};
use crate::core::pipeline::activity::{ActivityRecorder, StageId};
use crate::core::pipeline::buffer::TimedBuffer;
use crate::core::pipeline::edge::Edge;
use crate::core::pipeline::latches::{BranchData, ForwardInstData, ForwardLineData, Payload};
use crate::core::pipeline::snapshot::{self, RegisterSnapshot, StageAddrs};
use crate::core::pipeline::traits::{
    CachePort, CpuContext, DecodePorts, DecodeStage, ExecutePorts, ExecuteStage, Fetch1Ports,
    Fetch1Stage, Fetch2Ports, Fetch2Stage, StageContext,
};
use crate::core::pipeline::vulnerable::{InjectionRecord, Vulnerable, VulnerableRegistry, VulnerableSet};
use crate::stats::PipelineStats;

/// Name prefix of every pipeline component.
pub const CPU_NAME: &str = "cpu";

/// Drain lifecycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DrainState {
    /// Normal operation.
    #[default]
    Running,
    /// A drain was requested; waiting for the pipeline to empty.
    Draining,
    /// Empty and stopped.
    Drained,
    /// Resumed; becomes `Running` at the next evaluation.
    Resuming,
}

/// The four stages driven by a pipeline.
pub struct StageSet {
    /// Line fetch.
    pub fetch1: Box<dyn Fetch1Stage>,
    /// Line to instruction.
    pub fetch2: Box<dyn Fetch2Stage>,
    /// Decode.
    pub decode: Box<dyn DecodeStage>,
    /// Execute.
    pub execute: Box<dyn ExecuteStage>,
}

impl fmt::Debug for StageSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageSet")
            .field("fetch1", &self.fetch1.name())
            .field("fetch2", &self.fetch2.name())
            .field("decode", &self.decode.name())
            .field("execute", &self.execute.name())
            .finish()
    }
}

/// The five pipeline registers.
#[derive(Debug)]
pub struct Buffers {
    /// Fetch1 -> Fetch2 lines.
    pub f1_to_f2: TimedBuffer<ForwardLineData>,
    /// Fetch2 -> Fetch1 predictions.
    pub f2_to_f1: TimedBuffer<BranchData>,
    /// Fetch2 -> Decode bundles.
    pub f2_to_d: TimedBuffer<ForwardInstData>,
    /// Decode -> Execute bundles.
    pub d_to_e: TimedBuffer<ForwardInstData>,
    /// Execute -> Fetch1 branches.
    pub e_to_f1: TimedBuffer<BranchData>,
}

impl Buffers {
    /// Builds all registers with their configured delays.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first delay below one.
    pub fn new(prefix: &str, config: &PipelineConfig) -> Result<Self, ConfigError> {
        let name = |edge: Edge| format!("{prefix}.{}", edge.config_name());
        let width = config.decode_input_width as usize;
        let make_lines = |edge: Edge| {
            TimedBuffer::new(name(edge), edge, config.delay(edge), ForwardLineData::bubble())
        };
        let make_insts = |edge: Edge| {
            TimedBuffer::new(name(edge), edge, config.delay(edge), ForwardInstData::bubble(width))
        };
        let make_branch =
            |edge: Edge| TimedBuffer::new(name(edge), edge, config.delay(edge), BranchData::bubble());
        Ok(Self {
            f1_to_f2: make_lines(Edge::F1ToF2)?,
            f2_to_d: make_insts(Edge::F2ToD)?,
            d_to_e: make_insts(Edge::DToE)?,
            e_to_f1: make_branch(Edge::EToF1)?,
            f2_to_f1: make_branch(Edge::F2ToF1)?,
        })
    }

    /// Bubble state of every output wire.
    pub fn snapshot(&self) -> RegisterSnapshot {
        let mut bubble = [false; Edge::COUNT];
        bubble[Edge::F1ToF2.index()] = self.f1_to_f2.output_wire().counts_as_bubble();
        bubble[Edge::F2ToD.index()] = self.f2_to_d.output_wire().counts_as_bubble();
        bubble[Edge::DToE.index()] = self.d_to_e.output_wire().counts_as_bubble();
        bubble[Edge::EToF1.index()] = self.e_to_f1.output_wire().counts_as_bubble();
        bubble[Edge::F2ToF1.index()] = self.f2_to_f1.output_wire().counts_as_bubble();
        RegisterSnapshot::new(
            bubble,
            self.f2_to_f1.output_wire().reason,
            self.e_to_f1.output_wire().reason,
        )
    }

    /// Advances every register by one cycle.
    pub fn evaluate(&mut self) {
        self.f1_to_f2.evaluate();
        self.f2_to_f1.evaluate();
        self.f2_to_d.evaluate();
        self.d_to_e.evaluate();
        self.e_to_f1.evaluate();
    }

    /// Whether every slot of `edge` holds a bubble.
    pub fn is_empty(&self, edge: Edge) -> bool {
        match edge {
            Edge::F1ToF2 => self.f1_to_f2.empty(),
            Edge::F2ToD => self.f2_to_d.empty(),
            Edge::DToE => self.d_to_e.empty(),
            Edge::EToF1 => self.e_to_f1.empty(),
            Edge::F2ToF1 => self.f2_to_f1.empty(),
        }
    }

    /// Schedules a flip on `edge`; see [`TimedBuffer::register_fi`].
    pub fn register_fi(&mut self, edge: Edge, tick: Tick, bit: usize, now: Tick) -> bool {
        match edge {
            Edge::F1ToF2 => self.f1_to_f2.register_fi(tick, bit, now),
            Edge::F2ToD => self.f2_to_d.register_fi(tick, bit, now),
            Edge::DToE => self.d_to_e.register_fi(tick, bit, now),
            Edge::EToF1 => self.e_to_f1.register_fi(tick, bit, now),
            Edge::F2ToF1 => self.f2_to_f1.register_fi(tick, bit, now),
        }
    }

    /// Trace line of `edge`.
    pub fn minor_trace(&self, edge: Edge) -> String {
        match edge {
            Edge::F1ToF2 => self.f1_to_f2.minor_trace(),
            Edge::F2ToD => self.f2_to_d.minor_trace(),
            Edge::DToE => self.d_to_e.minor_trace(),
            Edge::EToF1 => self.e_to_f1.minor_trace(),
            Edge::F2ToF1 => self.f2_to_f1.minor_trace(),
        }
    }
}

impl VulnerableSet for Buffers {
    fn vulnerable_mut(&mut self, edge: Edge) -> &mut dyn Vulnerable {
        match edge {
            Edge::F1ToF2 => &mut self.f1_to_f2,
            Edge::F2ToD => &mut self.f2_to_d,
            Edge::DToE => &mut self.d_to_e,
            Edge::EToF1 => &mut self.e_to_f1,
            Edge::F2ToF1 => &mut self.f2_to_f1,
        }
    }
}

/// Four-stage in-order pipeline.
pub struct Pipeline {
    stages: StageSet,
    buffers: Buffers,
    activity: ActivityRecorder,
    registry: VulnerableRegistry,
    allow_idling: bool,
    need_to_signal_drained: bool,
    drain_state: DrainState,
    running: bool,
    fu_injection: Option<FuInjectionMode>,
    fu_fault_injected: bool,
    stats: PipelineStats,
    last_snapshot_tick: Tick,
}

impl Pipeline {
    /// Builds the registers, wires the stages to them and registers the
    /// configured fault.
    ///
    /// The pipeline starts stopped; call [`Pipeline::start`] or
    /// [`Pipeline::wakeup_fetch`].
    ///
    /// # Errors
    ///
    /// Returns the first configuration error, naming the offending parameter.
    pub fn new(config: &Config, stages: StageSet) -> Result<Self, ConfigError> {
        config.validate()?;
        let pipeline_config = &config.pipeline;
        let mut buffers = Buffers::new(CPU_NAME, pipeline_config)?;
        let activity = ActivityRecorder::new(
            format!("{CPU_NAME}.activity"),
            pipeline_config.longest_forward_delay(),
        );

        if tracing::enabled!(target: "minorfi::print_all_fu", Level::DEBUG) {
            let mut listing = String::new();
            if stages.execute.print_all_fu(&mut listing).is_ok() {
                tracing::debug!(target: "minorfi::print_all_fu", "{}", listing.trim_end());
            }
        }
        tracing::debug!(
            target: "minorfi::forward_inst_data",
            "Instruction Width: {}",
            pipeline_config.decode_input_width
        );

        let mut registry = VulnerableRegistry::new();
        let fi = &config.fault_injection;
        if let Some(edge) = fi.target()? {
            if buffers.register_fi(edge, fi.inject_time, fi.inject_loc, 0) {
                registry.register(edge);
                tracing::info!(
                    target: "minorfi::fault",
                    "registered flip of bit {} on {}.{} at tick {}",
                    fi.inject_loc,
                    CPU_NAME,
                    edge,
                    fi.inject_time
                );
            }
        }

        Ok(Self {
            stages,
            buffers,
            activity,
            registry,
            allow_idling: pipeline_config.enable_idling,
            need_to_signal_drained: false,
            drain_state: DrainState::Running,
            running: false,
            fu_injection: fi.inject_fu.then_some(fi.fu_injection),
            fu_fault_injected: false,
            stats: PipelineStats::new(),
            last_snapshot_tick: 0,
        })
    }

    /// Runs one clock cycle.
    pub fn evaluate(&mut self, cpu: &mut dyn CpuContext) {
        let now = cpu.cur_tick();
        self.stats.num_cycles += 1;
        let cycle = self.stats.num_cycles;
        if self.drain_state == DrainState::Resuming {
            self.drain_state = DrainState::Running;
        }

        let observed = self.buffers.snapshot();

        self.registry.evaluate(now, &mut self.buffers);
        cpu.inject_fault_reg();
        let lsq = self.stages.execute.lsq();
        lsq.inject_fault(now);
        lsq.fi_profiling(now);
        self.inject_fault_to_fu();

        self.evaluate_stages(now, cycle);

        if tracing::enabled!(target: "minorfi::trace", Level::DEBUG) {
            for line in self.minor_trace() {
                tracing::debug!(target: "minorfi::trace", "{}", line);
            }
        }

        self.buffers.evaluate();

        let addrs = self.take_snapshot_addrs();
        if tracing::enabled!(target: "minorfi::bubble", Level::DEBUG) {
            let latched = self.buffers.snapshot();
            let drawing = snapshot::render(now, &observed, &latched, &addrs);
            tracing::debug!(target: "minorfi::bubble", "\n{}", drawing.trim_end());
        }

        let elapsed = now.saturating_sub(self.last_snapshot_tick);
        for edge in Edge::ALL {
            if observed.is_bubble(edge) {
                self.stats.add_bubble_ticks(edge, elapsed);
            }
        }
        self.stats.num_snapshot += 1;
        self.last_snapshot_tick = now;

        self.activity.evaluate();

        if self.allow_idling {
            if !self.activity.active() && !self.need_to_signal_drained {
                tracing::debug!(target: "minorfi::quiesce", "Suspending as the processor is idle");
                self.stop();
            }
            for stage in StageId::ALL {
                self.activity.deactivate_stage(stage);
            }
        }

        if self.need_to_signal_drained {
            tracing::debug!(target: "minorfi::drain", "Still draining");
            if self.is_drained() {
                tracing::debug!(target: "minorfi::drain", "Signalling end of draining");
                cpu.signal_drain_done();
                self.need_to_signal_drained = false;
                self.drain_state = DrainState::Drained;
                self.stop();
            }
        }
    }

    fn inject_fault_to_fu(&mut self) {
        match self.fu_injection {
            Some(FuInjectionMode::OneShot) if !self.fu_fault_injected => {
                self.fu_fault_injected = self.stages.execute.inject_fault_to_fu();
            }
            Some(FuInjectionMode::Repeat) => {
                let applied = self.stages.execute.inject_fault_to_fu();
                self.fu_fault_injected |= applied;
            }
            _ => {}
        }
    }

    fn evaluate_stages(&mut self, now: Tick, cycle: Cycle) {
        let stages = &mut self.stages;
        let buffers = &mut self.buffers;
        let mut ctx = StageContext {
            now,
            cycle,
            activity: &mut self.activity,
        };

        stages.execute.evaluate(
            &mut ctx,
            ExecutePorts {
                insts_in: buffers.d_to_e.output(),
                branch_out: buffers.e_to_f1.input(),
            },
        );
        stages.decode.evaluate(
            &mut ctx,
            DecodePorts {
                insts_in: buffers.f2_to_d.output(),
                insts_out: buffers.d_to_e.input(),
                next_stage_input: stages.execute.input_buffer(),
            },
        );
        stages.fetch2.evaluate(
            &mut ctx,
            Fetch2Ports {
                lines_in: buffers.f1_to_f2.output(),
                branch_in: buffers.e_to_f1.output(),
                prediction_out: buffers.f2_to_f1.input(),
                insts_out: buffers.f2_to_d.input(),
                next_stage_input: stages.decode.input_buffer(),
            },
        );
        stages.fetch1.evaluate(
            &mut ctx,
            Fetch1Ports {
                branch_in: buffers.e_to_f1.output(),
                prediction_in: buffers.f2_to_f1.output(),
                lines_out: buffers.f1_to_f2.input(),
                next_stage_input: stages.fetch2.input_buffer(),
            },
        );
    }

    fn take_snapshot_addrs(&mut self) -> StageAddrs {
        StageAddrs {
            fetch1: self.stages.fetch1.take_snapshot_addrs(),
            fetch2: self.stages.fetch2.take_snapshot_addrs(),
            decode: self.stages.decode.take_snapshot_addrs(),
            execute: self.stages.execute.take_snapshot_addrs(),
        }
    }

    /// Asks the pipeline to empty itself.
    ///
    /// Returns `true` when it is already drained; the pipeline then stops at
    /// once and no completion signal follows. Otherwise `signal_drain_done`
    /// is called from the evaluation at which the pipeline becomes empty, and
    /// the pipeline is started so that evaluation happens.
    pub fn drain(&mut self) -> bool {
        tracing::debug!(
            target: "minorfi::drain",
            "Draining pipeline by halting inst fetches. Execution should drain naturally"
        );
        self.stages.execute.drain();
        let drained = self.is_drained();
        self.need_to_signal_drained = !drained;
        if drained {
            self.drain_state = DrainState::Drained;
            self.stop();
        } else {
            self.drain_state = DrainState::Draining;
            self.start();
        }
        drained
    }

    /// Restarts fetch on every thread after a drain.
    pub fn drain_resume(&mut self, cpu: &dyn CpuContext) {
        tracing::debug!(target: "minorfi::drain", "Drain resume");
        for tid in 0..cpu.num_threads() {
            self.wakeup_fetch(tid);
        }
        self.stages.execute.drain_resume();
        self.need_to_signal_drained = false;
        self.drain_state = DrainState::Resuming;
    }

    /// All stages drained and every register empty.
    pub fn is_drained(&self) -> bool {
        let stages = [
            ("Fetch1", self.stages.fetch1.is_drained()),
            ("Fetch2", self.stages.fetch2.is_drained()),
            ("Decode", self.stages.decode.is_drained()),
            ("Execute", self.stages.execute.is_drained()),
        ];
        let edges = Edge::ALL.map(|edge| (edge, self.buffers.is_empty(edge)));
        let drained = stages.iter().all(|&(_, d)| d) && edges.iter().all(|&(_, e)| e);
        if !drained && tracing::enabled!(target: "minorfi::drain", Level::TRACE) {
            let mut busy: Vec<String> = stages
                .iter()
                .filter(|(_, d)| !d)
                .map(|(name, _)| (*name).to_string())
                .collect();
            busy.extend(
                edges
                    .iter()
                    .filter(|(_, e)| !e)
                    .map(|(edge, _)| edge.to_string()),
            );
            tracing::trace!(
                target: "minorfi::drain",
                "Pipeline undrained stages state: {}",
                busy.join(" ")
            );
        }
        drained
    }

    /// Wakes Fetch1 for `tid` and restarts the pipeline.
    pub fn wakeup_fetch(&mut self, tid: ThreadId) {
        self.stages.fetch1.wakeup_fetch(tid);
        self.activity.activate_stage(StageId::Fetch1);
        self.start();
    }

    /// Resumes cycling.
    pub fn start(&mut self) {
        self.running = true;
    }

    /// Suspends cycling until the next wakeup.
    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Whether the host should keep evaluating.
    pub const fn is_running(&self) -> bool {
        self.running
    }

    /// Instruction-side port (Fetch1's).
    pub fn inst_port(&mut self) -> &mut dyn CachePort {
        self.stages.fetch1.icache_port()
    }

    /// Data-side port (Execute's).
    pub fn data_port(&mut self) -> &mut dyn CachePort {
        self.stages.execute.dcache_port()
    }

    /// Counters.
    pub const fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    /// Micro-ops Execute has retired.
    pub fn retired_insts(&self) -> u64 {
        self.stages.execute.retired_insts()
    }

    /// Execute's hash of retired instructions.
    pub fn commit_signature(&self) -> u64 {
        self.stages.execute.commit_signature()
    }

    /// Register flips applied so far.
    pub fn injection_log(&self) -> &[InjectionRecord] {
        self.registry.log()
    }

    /// Registered targets that have not fired yet.
    pub fn pending_injections(&self) -> &[Edge] {
        self.registry.pending()
    }

    /// Whether the functional-unit hook has reported a successful flip.
    pub const fn fu_fault_injected(&self) -> bool {
        self.fu_fault_injected
    }

    /// Drain lifecycle state.
    pub const fn drain_state(&self) -> DrainState {
        self.drain_state
    }

    /// A drain is in progress and has not completed.
    pub const fn need_to_signal_drained(&self) -> bool {
        self.need_to_signal_drained
    }

    /// Activity recorder.
    pub const fn activity(&self) -> &ActivityRecorder {
        &self.activity
    }

    /// Pipeline registers.
    pub const fn buffers(&self) -> &Buffers {
        &self.buffers
    }

    /// Pipeline registers, mutably.
    ///
    /// Lets a harness place payloads directly on register inputs.
    pub fn buffers_mut(&mut self) -> &mut Buffers {
        &mut self.buffers
    }

    /// Tick of the last evaluation.
    pub const fn last_snapshot_tick(&self) -> Tick {
        self.last_snapshot_tick
    }

    /// Trace lines of every component, in dataflow order.
    pub fn minor_trace(&self) -> Vec<String> {
        vec![
            self.stages.fetch1.minor_trace(),
            self.buffers.minor_trace(Edge::F1ToF2),
            self.buffers.minor_trace(Edge::F2ToF1),
            self.stages.fetch2.minor_trace(),
            self.buffers.minor_trace(Edge::F2ToD),
            self.stages.decode.minor_trace(),
            self.buffers.minor_trace(Edge::DToE),
            self.stages.execute.minor_trace(),
            self.buffers.minor_trace(Edge::EToF1),
            self.activity.minor_trace(),
        ]
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stages)
            .field("running", &self.running)
            .field("drain_state", &self.drain_state)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
