use minorfi_core::common::{ThreadId, Tick};
use minorfi_core::config::Config;
use minorfi_core::core::pipeline::traits::CpuContext;
use minorfi_core::core::pipeline::{Pipeline, StageSet};

/// CPU context whose clock is set by the test.
#[derive(Debug, Default)]
pub struct StubCpu {
    pub now: Tick,
    pub threads: ThreadId,
    pub drains_signalled: u32,
    pub reg_polls: u32,
}

impl StubCpu {
    pub fn new(threads: ThreadId) -> Self {
        Self {
            threads,
            ..Self::default()
        }
    }
}

impl CpuContext for StubCpu {
    fn cur_tick(&self) -> Tick {
        self.now
    }

    fn num_threads(&self) -> ThreadId {
        self.threads
    }

    fn signal_drain_done(&mut self) {
        self.drains_signalled += 1;
    }

    fn inject_fault_reg(&mut self) {
        self.reg_polls += 1;
    }
}

/// A started pipeline plus the stub CPU that clocks it.
#[derive(Debug)]
pub struct Harness {
    pub pipeline: Pipeline,
    pub cpu: StubCpu,
}

impl Harness {
    pub fn new(config: &Config, stages: StageSet) -> Self {
        let mut pipeline =
            Pipeline::new(config, stages).unwrap_or_else(|e| panic!("pipeline: {e}"));
        pipeline.start();
        Self {
            pipeline,
            cpu: StubCpu::new(config.general.num_threads),
        }
    }

    /// Evaluates once at `tick`.
    pub fn eval_at(&mut self, tick: Tick) {
        self.cpu.now = tick;
        self.pipeline.evaluate(&mut self.cpu);
    }

    /// Evaluates every tick after the current one up to and including `tick`.
    pub fn run_to(&mut self, tick: Tick) {
        while self.cpu.now < tick {
            let next = self.cpu.now + 1;
            self.eval_at(next);
        }
    }
}

/// Default configuration with `edit` applied.
pub fn config_with(edit: impl FnOnce(&mut Config)) -> Config {
    let mut config = Config::default();
    edit(&mut config);
    config
}
