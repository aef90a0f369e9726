//! Simulator: owns the CPU context and the pipeline side-by-side.
//!
//! The host clock lives in [`SimCpu`]. Each [`Simulator::step`] advances it
//! by one clock period and, if the pipeline is running, evaluates one cycle
//! with the CPU context lent to the pipeline.

use serde::Serialize;

use crate::common::{ConfigError, ThreadId, Tick};
use crate::config::Config;
use crate::core::memory::ProgramImage;
use crate::core::pipeline::engine::{Pipeline, StageSet};
use crate::core::pipeline::stages::reference_stages;
use crate::core::pipeline::traits::CpuContext;
use crate::core::pipeline::vulnerable::InjectionRecord;
use crate::stats::StatEntry;

/// Host clock and CPU-side services.
#[derive(Clone, Debug)]
pub struct SimCpu {
    tick: Tick,
    clock_period: Tick,
    num_threads: ThreadId,
    drains_signalled: u64,
    reg_fault_polls: u64,
}

impl SimCpu {
    /// Creates a CPU context at tick zero.
    pub const fn new(clock_period: Tick, num_threads: ThreadId) -> Self {
        Self {
            tick: 0,
            clock_period,
            num_threads,
            drains_signalled: 0,
            reg_fault_polls: 0,
        }
    }

    /// Times the pipeline reported a completed drain.
    pub const fn drains_signalled(&self) -> u64 {
        self.drains_signalled
    }

    /// Times the register-file injection hook was polled.
    pub const fn reg_fault_polls(&self) -> u64 {
        self.reg_fault_polls
    }

    fn advance(&mut self) {
        self.tick += self.clock_period;
    }
}

impl CpuContext for SimCpu {
    fn cur_tick(&self) -> Tick {
        self.tick
    }

    fn num_threads(&self) -> ThreadId {
        self.num_threads
    }

    fn signal_drain_done(&mut self) {
        self.drains_signalled += 1;
        tracing::debug!(target: "minorfi::drain", "tick {}: drain done", self.tick);
    }

    fn inject_fault_reg(&mut self) {
        self.reg_fault_polls += 1;
    }
}

/// Summary of a run, suitable for JSON output.
#[derive(Clone, Debug, Serialize)]
pub struct RunReport {
    /// Ticks simulated.
    pub sim_ticks: Tick,
    /// Micro-ops retired.
    pub retired_insts: u64,
    /// Hash of retired instructions.
    pub commit_signature: u64,
    /// Register flips that took effect.
    pub injections: Vec<InjectionRecord>,
    /// Whether the functional-unit hook applied a flip.
    pub fu_fault_injected: bool,
    /// Every statistic.
    pub stats: Vec<StatEntry>,
}

/// Top-level simulator: CPU context + pipeline.
#[derive(Debug)]
pub struct Simulator {
    cpu: SimCpu,
    pipeline: Pipeline,
}

impl Simulator {
    /// Builds a pipeline of reference stages over `image`.
    ///
    /// # Errors
    ///
    /// Returns the first configuration error.
    pub fn new(config: &Config, image: ProgramImage) -> Result<Self, ConfigError> {
        let stages = reference_stages(config, image);
        Self::with_stages(config, stages)
    }

    /// Builds a pipeline driving caller-supplied stages.
    ///
    /// # Errors
    ///
    /// Returns the first configuration error.
    pub fn with_stages(config: &Config, stages: StageSet) -> Result<Self, ConfigError> {
        let pipeline = Pipeline::new(config, stages)?;
        Ok(Self {
            cpu: SimCpu::new(config.general.clock_period, config.general.num_threads),
            pipeline,
        })
    }

    /// Advances the clock one period, evaluating the pipeline if it runs.
    pub fn step(&mut self) {
        self.cpu.advance();
        if self.pipeline.is_running() {
            self.pipeline.evaluate(&mut self.cpu);
        }
    }

    /// Steps until `max_ticks` is reached or the pipeline stops.
    ///
    /// Returns the tick reached.
    pub fn run(&mut self, max_ticks: Tick) -> Tick {
        while self.cpu.tick < max_ticks && self.pipeline.is_running() {
            self.step();
        }
        tracing::info!(
            "stopped at tick {} after {} cycles ({} retired)",
            self.cpu.tick,
            self.pipeline.stats().num_cycles,
            self.pipeline.retired_insts()
        );
        self.cpu.tick
    }

    /// Wakes fetch on `tid`.
    pub fn wakeup_fetch(&mut self, tid: ThreadId) {
        self.pipeline.wakeup_fetch(tid);
    }

    /// Wakes fetch on every thread.
    pub fn wakeup_all(&mut self) {
        for tid in 0..self.cpu.num_threads {
            self.pipeline.wakeup_fetch(tid);
        }
    }

    /// Requests a drain; see [`Pipeline::drain`].
    pub fn drain(&mut self) -> bool {
        self.pipeline.drain()
    }

    /// Resumes after a drain.
    pub fn drain_resume(&mut self) {
        self.pipeline.drain_resume(&self.cpu);
    }

    /// Ticks simulated so far.
    pub const fn sim_ticks(&self) -> Tick {
        self.cpu.tick
    }

    /// The pipeline.
    pub const fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// The pipeline, mutably.
    pub fn pipeline_mut(&mut self) -> &mut Pipeline {
        &mut self.pipeline
    }

    /// The CPU context.
    pub const fn cpu(&self) -> &SimCpu {
        &self.cpu
    }

    /// Collects the end-of-run summary.
    pub fn report(&self) -> RunReport {
        RunReport {
            sim_ticks: self.cpu.tick,
            retired_insts: self.pipeline.retired_insts(),
            commit_signature: self.pipeline.commit_signature(),
            injections: self.pipeline.injection_log().to_vec(),
            fu_fault_injected: self.pipeline.fu_fault_injected(),
            stats: self.pipeline.stats().entries(self.cpu.tick),
        }
    }
}
