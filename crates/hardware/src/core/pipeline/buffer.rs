//! Timed inter-stage buffers and stage input queues.
//!
//! 1. **`TimedBuffer`:** A fixed-delay latch chain. A value written to the
//!    input wire appears on the output wire `depth` evaluations later.
//! 2. **`BufferInput` / `BufferOutput`:** Write-only and read-only handles
//!    handed to stages for the duration of one evaluation.
//! 3. **`InputBuffer`:** The elastic queue a stage keeps in front of itself;
//!    its upstream neighbour peeks it through [`InputStatus`] for backpressure.

use std::collections::VecDeque;
use std::fmt::Write as _;

use crate::common::{ConfigError, Tick};
use crate::core::pipeline::edge::Edge;
use crate::core::pipeline::latches::Payload;
use crate::core::pipeline::vulnerable::{InjectionOutcome, Vulnerable};

/// Pending single-bit upset of a buffer's output wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FaultRegistration {
    /// Tick at which the bit is flipped.
    pub tick: Tick,
    /// Bit index within the output payload's image.
    pub bit: usize,
}

/// Delay line of `depth + 1` slots.
///
/// The input wire is the slot at `head`; the output wire is the slot after
/// it, which holds what was written `depth` evaluations ago.
#[derive(Debug)]
pub struct TimedBuffer<P: Payload> {
    name: String,
    edge: Edge,
    depth: usize,
    slots: Vec<P>,
    head: usize,
    bubble: P,
    fault: Option<FaultRegistration>,
}

impl<P: Payload> TimedBuffer<P> {
    /// Creates a buffer of `depth` cycles filled with `bubble`.
    ///
    /// # Errors
    ///
    /// A zero depth is rejected, naming the edge's delay parameter.
    pub fn new(
        name: impl Into<String>,
        edge: Edge,
        depth: u32,
        bubble: P,
    ) -> Result<Self, ConfigError> {
        if depth < 1 {
            return Err(ConfigError::at_least_one(
                edge.delay_param(),
                u64::from(depth),
            ));
        }
        let depth = depth as usize;
        Ok(Self {
            name: name.into(),
            edge,
            depth,
            slots: vec![bubble.clone(); depth + 1],
            head: 0,
            bubble,
            fault: None,
        })
    }

    /// Buffer name, e.g. `cpu.dToE`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Which pipeline register this is.
    pub const fn edge(&self) -> Edge {
        self.edge
    }

    /// Delay in cycles.
    pub const fn depth(&self) -> usize {
        self.depth
    }

    #[inline]
    const fn output_index(&self) -> usize {
        (self.head + 1) % (self.depth + 1)
    }

    /// Write handle for the input wire.
    pub fn input(&mut self) -> BufferInput<'_, P> {
        BufferInput { buffer: self }
    }

    /// Read handle for the output wire.
    pub fn output(&self) -> BufferOutput<'_, P> {
        BufferOutput {
            wire: self.output_wire(),
        }
    }

    /// Payload written `depth` evaluations ago.
    pub fn output_wire(&self) -> &P {
        &self.slots[self.output_index()]
    }

    /// Mutable access to the output wire (fault injection only).
    pub fn output_wire_mut(&mut self) -> &mut P {
        let idx = self.output_index();
        &mut self.slots[idx]
    }

    /// Payload being written this evaluation.
    pub fn input_wire(&self) -> &P {
        &self.slots[self.head]
    }

    /// Advances the delay line by one cycle.
    ///
    /// The slot that becomes the new input wire is reset to a bubble.
    pub fn evaluate(&mut self) {
        self.head = self.output_index();
        self.slots[self.head] = self.bubble.clone();
    }

    /// True iff every slot holds a bubble.
    pub fn empty(&self) -> bool {
        self.slots.iter().all(Payload::is_bubble)
    }

    /// Schedules a flip of output bit `bit` at tick `tick`.
    ///
    /// Replaces any earlier registration. Returns `false` and registers
    /// nothing when `tick` is already in the past at `now`.
    pub fn register_fi(&mut self, tick: Tick, bit: usize, now: Tick) -> bool {
        if tick < now {
            tracing::warn!(
                target: "minorfi::fault",
                "{}: injection tick {} already passed (now {}), ignored",
                self.name,
                tick,
                now
            );
            return false;
        }
        self.fault = Some(FaultRegistration { tick, bit });
        true
    }

    /// Registration still waiting to fire.
    pub const fn pending_fault(&self) -> Option<FaultRegistration> {
        self.fault
    }

    /// One trace line: slots from output to input.
    pub fn minor_trace(&self) -> String {
        let mut line = format!("{} {}=", self.name, self.edge.payload_label());
        let len = self.depth + 1;
        for i in 0..len {
            let idx = (self.output_index() + i) % len;
            if i > 0 {
                line.push(',');
            }
            let _ = write!(line, "{}", self.slots[idx]);
        }
        line
    }
}

impl<P: Payload> Vulnerable for TimedBuffer<P> {
    fn vulnerable_name(&self) -> &str {
        &self.name
    }

    fn inject(&mut self, now: Tick) -> InjectionOutcome {
        let Some(reg) = self.fault else {
            return InjectionOutcome::Idle;
        };
        if reg.tick > now {
            return InjectionOutcome::Idle;
        }
        self.fault = None;
        if reg.tick < now {
            return InjectionOutcome::Missed { scheduled: reg.tick };
        }
        if self.output_wire_mut().flip_bit(reg.bit) {
            InjectionOutcome::Applied { bit: reg.bit }
        } else {
            InjectionOutcome::OutOfRange {
                bit: reg.bit,
                bit_len: self.output_wire().bit_len(),
            }
        }
    }
}

/// Write-only handle onto a buffer's input wire.
#[derive(Debug)]
pub struct BufferInput<'a, P: Payload> {
    buffer: &'a mut TimedBuffer<P>,
}

impl<P: Payload> BufferInput<'_, P> {
    /// Replaces the value on the input wire.
    pub fn write(&mut self, payload: P) {
        let idx = self.buffer.head;
        self.buffer.slots[idx] = payload;
    }

    /// In-place access to the input wire.
    pub fn wire(&mut self) -> &mut P {
        let idx = self.buffer.head;
        &mut self.buffer.slots[idx]
    }

    /// What has been written so far this cycle.
    pub fn peek(&self) -> &P {
        self.buffer.input_wire()
    }
}

/// Read-only handle onto a buffer's output wire.
#[derive(Debug)]
pub struct BufferOutput<'a, P: Payload> {
    wire: &'a P,
}

impl<P: Payload> Clone for BufferOutput<'_, P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<P: Payload> Copy for BufferOutput<'_, P> {}

impl<'a, P: Payload> BufferOutput<'a, P> {
    /// Payload visible to the consuming stage this cycle.
    pub const fn read(&self) -> &'a P {
        self.wire
    }
}

/// Backpressure view of a stage's input queue.
pub trait InputStatus {
    /// Room for at least one more entry.
    fn can_reserve(&self) -> bool;

    /// Nothing queued.
    fn is_empty(&self) -> bool;
}

/// Elastic queue in front of a stage.
///
/// Upstream stages only send when [`InputStatus::can_reserve`] holds, but with
/// multi-cycle latches a few extra entries can already be in flight, so
/// `push` never drops data.
#[derive(Debug, Clone)]
pub struct InputBuffer<P> {
    entries: VecDeque<P>,
    capacity: usize,
}

impl<P: Payload> InputBuffer<P> {
    /// Creates a queue that reports full at `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Queues a payload unless it is a bubble.
    pub fn push(&mut self, payload: &P) {
        if !payload.is_bubble() {
            self.entries.push_back(payload.clone());
        }
    }

    /// Oldest entry.
    pub fn front(&self) -> Option<&P> {
        self.entries.front()
    }

    /// Oldest entry, mutably.
    pub fn front_mut(&mut self) -> Option<&mut P> {
        self.entries.front_mut()
    }

    /// Removes the oldest entry.
    pub fn pop(&mut self) -> Option<P> {
        self.entries.pop_front()
    }

    /// Drops entries failing `keep`.
    pub fn retain(&mut self, keep: impl FnMut(&P) -> bool) {
        self.entries.retain(keep);
    }

    /// Entries queued.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Iterates oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &P> {
        self.entries.iter()
    }
}

impl<P: Payload> InputStatus for InputBuffer<P> {
    fn can_reserve(&self) -> bool {
        self.entries.len() < self.capacity
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
