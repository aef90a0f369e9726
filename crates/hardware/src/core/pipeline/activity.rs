//! Activity recorder used to decide when the pipeline may idle.
//!
//! Stages report activity in two ways:
//! 1. **Per-cycle activity:** `activity()` marks the current cycle busy. The
//!    mark stays counted for `longest_latency` further cycles, long enough for
//!    anything written into a latch to reach its consumer.
//! 2. **Stage marks:** `activate_stage` keeps a stage awake until explicitly
//!    deactivated (the pipeline clears all marks every cycle when idling).

use std::fmt;

/// Stage slots tracked by the recorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageId {
    /// The CPU itself (external wakeups).
    Cpu,
    /// Fetch1.
    Fetch1,
    /// Fetch2.
    Fetch2,
    /// Decode.
    Decode,
    /// Execute.
    Execute,
}

impl StageId {
    /// Every stage id.
    pub const ALL: [Self; 5] = [
        Self::Cpu,
        Self::Fetch1,
        Self::Fetch2,
        Self::Decode,
        Self::Execute,
    ];

    /// Number of stage ids.
    pub const COUNT: usize = Self::ALL.len();

    const fn index(self) -> usize {
        self as usize
    }
}

/// Counts outstanding activity over a sliding window of cycles.
#[derive(Debug, Clone)]
pub struct ActivityRecorder {
    name: String,
    history: Vec<bool>,
    head: usize,
    activity_count: u32,
    stage_active: [bool; StageId::COUNT],
}

impl ActivityRecorder {
    /// Creates a recorder whose activity marks last `longest_latency` cycles.
    pub fn new(name: impl Into<String>, longest_latency: u32) -> Self {
        Self {
            name: name.into(),
            history: vec![false; longest_latency as usize + 1],
            head: 0,
            activity_count: 0,
            stage_active: [false; StageId::COUNT],
        }
    }

    /// Marks the current cycle as having done useful work.
    pub fn activity(&mut self) {
        if !self.history[self.head] {
            self.history[self.head] = true;
            self.activity_count += 1;
        }
    }

    /// Keeps `stage` awake until it is deactivated.
    pub fn activate_stage(&mut self, stage: StageId) {
        let slot = &mut self.stage_active[stage.index()];
        if !*slot {
            *slot = true;
            self.activity_count += 1;
        }
    }

    /// Clears the mark set by [`ActivityRecorder::activate_stage`].
    pub fn deactivate_stage(&mut self, stage: StageId) {
        let slot = &mut self.stage_active[stage.index()];
        if *slot {
            *slot = false;
            self.activity_count -= 1;
        }
    }

    /// Whether `stage` currently holds a mark.
    pub const fn is_stage_active(&self, stage: StageId) -> bool {
        self.stage_active[stage.index()]
    }

    /// Any activity or stage mark outstanding.
    pub const fn active(&self) -> bool {
        self.activity_count != 0
    }

    /// Advances the window by one cycle; the oldest mark expires.
    pub fn evaluate(&mut self) {
        let oldest = (self.head + 1) % self.history.len();
        if self.history[oldest] {
            self.history[oldest] = false;
            self.activity_count -= 1;
        }
        self.head = oldest;
    }

    /// One trace line.
    pub fn minor_trace(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ActivityRecorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} activity={} stages=", self.name, self.activity_count)?;
        for active in self.stage_active {
            f.write_str(if active { "E" } else { "-" })?;
        }
        Ok(())
    }
}
