//! Fault-injection registry for pipeline registers.
//!
//! Targets are registered while the pipeline is built. On every evaluation,
//! after the buffer outputs have been sampled and before any stage runs, the
//! registry asks each registered target to apply its scheduled bit flip.
//! Targets leave the registry as soon as their registration fires.

use serde::Serialize;

use crate::common::Tick;
use crate::core::pipeline::edge::Edge;

/// Result of asking a target to inject at the current tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InjectionOutcome {
    /// Nothing scheduled for this tick.
    Idle,
    /// The scheduled bit was flipped.
    Applied {
        /// Flipped bit.
        bit: usize,
    },
    /// The bit index is outside the payload image; nothing changed.
    OutOfRange {
        /// Requested bit.
        bit: usize,
        /// Image length in bits.
        bit_len: usize,
    },
    /// The scheduled tick passed without an evaluation (pipeline suspended).
    Missed {
        /// Tick the flip was scheduled for.
        scheduled: Tick,
    },
}

/// Something that can hold a scheduled bit flip.
pub trait Vulnerable {
    /// Name used in logs.
    fn vulnerable_name(&self) -> &str;

    /// Applies the registration if it is due at `now`, consuming it.
    fn inject(&mut self, now: Tick) -> InjectionOutcome;
}

/// Lookup from a registered edge to its buffer.
pub trait VulnerableSet {
    /// The buffer behind `edge`.
    fn vulnerable_mut(&mut self, edge: Edge) -> &mut dyn Vulnerable;
}

/// A bit flip that took effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct InjectionRecord {
    /// Corrupted pipeline register.
    pub edge: Edge,
    /// Tick of the flip.
    pub tick: Tick,
    /// Flipped bit.
    pub bit: usize,
}

/// Registered fault targets and the log of applied flips.
#[derive(Debug, Default)]
pub struct VulnerableRegistry {
    targets: Vec<Edge>,
    log: Vec<InjectionRecord>,
}

impl VulnerableRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `edge` to the set of targets polled each evaluation.
    pub fn register(&mut self, edge: Edge) {
        if !self.targets.contains(&edge) {
            self.targets.push(edge);
        }
    }

    /// Targets whose registration has not fired yet.
    pub fn pending(&self) -> &[Edge] {
        &self.targets
    }

    /// Flips applied so far.
    pub fn log(&self) -> &[InjectionRecord] {
        &self.log
    }

    /// Applies every registration due at `now`.
    pub fn evaluate(&mut self, now: Tick, set: &mut dyn VulnerableSet) {
        let log = &mut self.log;
        self.targets.retain(|&edge| {
            let target = set.vulnerable_mut(edge);
            match target.inject(now) {
                InjectionOutcome::Idle => true,
                InjectionOutcome::Applied { bit } => {
                    tracing::info!(
                        target: "minorfi::fault",
                        "tick {}: flipped bit {} of {}",
                        now,
                        bit,
                        target.vulnerable_name()
                    );
                    log.push(InjectionRecord {
                        edge,
                        tick: now,
                        bit,
                    });
                    false
                }
                InjectionOutcome::OutOfRange { bit, bit_len } => {
                    tracing::warn!(
                        target: "minorfi::fault",
                        "tick {}: bit {} outside {}-bit image of {}, nothing flipped",
                        now,
                        bit,
                        bit_len,
                        target.vulnerable_name()
                    );
                    false
                }
                InjectionOutcome::Missed { scheduled } => {
                    tracing::warn!(
                        target: "minorfi::fault",
                        "tick {}: injection into {} scheduled for tick {} was missed",
                        now,
                        target.vulnerable_name(),
                        scheduled
                    );
                    false
                }
            }
        });
    }
}
