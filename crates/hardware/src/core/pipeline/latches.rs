//! Pipeline latch payloads for inter-stage communication.
//!
//! This module defines the data carried by the five pipeline registers:
//! 1. **`ForwardLineData`:** A fetched cache line (Fetch1 -> Fetch2).
//! 2. **`ForwardInstData`:** A bundle of micro-ops (Fetch2 -> Decode -> Execute).
//! 3. **`BranchData`:** A redirect or prediction (Execute -> Fetch1, Fetch2 -> Fetch1).
//!
//! Every payload has a fixed little-endian bit image. Fault injection flips a
//! bit of that image and decodes it back, so any single-bit upset of a latch
//! maps to a well-defined payload, bubbles included.

use std::fmt;

use crate::common::ThreadId;

/// Data that can sit in a pipeline register.
pub trait Payload: Clone + fmt::Debug + fmt::Display {
    /// True when the slot carries no useful data.
    fn is_bubble(&self) -> bool;

    /// True when bubble accounting should count this slot as empty.
    fn counts_as_bubble(&self) -> bool {
        self.is_bubble()
    }

    /// Appends the serialized bit image.
    fn encode(&self, out: &mut Vec<u8>);

    /// Rebuilds a payload from a bit image produced by [`Payload::encode`],
    /// possibly with bits flipped.
    fn decode(bytes: &[u8]) -> Self;

    /// Length of the serialized image in bits.
    fn bit_len(&self) -> usize {
        let mut image = Vec::new();
        self.encode(&mut image);
        image.len() * 8
    }

    /// Flips bit `bit` of the serialized image.
    ///
    /// Returns `false` (leaving the payload untouched) when `bit` lies outside
    /// the image.
    fn flip_bit(&mut self, bit: usize) -> bool {
        let mut image = Vec::new();
        self.encode(&mut image);
        let Some(byte) = image.get_mut(bit / 8) else {
            return false;
        };
        *byte ^= 1 << (bit % 8);
        *self = Self::decode(&image);
        true
    }
}

/// Little-endian cursor over a payload image. Reads past the end yield zero.
struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn u8(&mut self) -> u8 {
        let v = self.bytes.get(self.pos).copied().unwrap_or(0);
        self.pos += 1;
        v
    }

    fn array<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        for b in &mut out {
            *b = self.u8();
        }
        out
    }

    fn u32(&mut self) -> u32 {
        u32::from_le_bytes(self.array())
    }

    fn u64(&mut self) -> u64 {
        u64::from_le_bytes(self.array())
    }

    fn flag(&mut self) -> Flag {
        Flag(self.u8())
    }

    fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.pos)
    }

    fn rest(&mut self) -> Vec<u8> {
        let out = self.bytes.get(self.pos..).unwrap_or_default().to_vec();
        self.pos = self.bytes.len();
        out
    }
}

/// One-byte latch holding a boolean.
///
/// The value is the lowest bit; the other seven bits are latched and carried
/// along unchanged, so every bit of a payload image round-trips.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Flag(pub u8);

impl Flag {
    /// Latch holding `false`.
    pub const CLEAR: Self = Self(0);

    /// Latch holding `true`.
    pub const SET: Self = Self(1);

    /// Boolean value of the latch.
    pub const fn is_set(self) -> bool {
        self.0 & 1 != 0
    }
}

impl From<bool> for Flag {
    fn from(value: bool) -> Self {
        if value { Self::SET } else { Self::CLEAR }
    }
}

/// Cache line delivered by Fetch1.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ForwardLineData {
    /// No line in this slot.
    pub bubble: Flag,
    /// Fetching thread.
    pub thread_id: ThreadId,
    /// First fetch address within the line.
    pub pc: u64,
    /// Address of byte 0 of `data`.
    pub line_base: u64,
    /// Fetch stream the line belongs to.
    pub stream_seq: u64,
    /// Prediction sequence the line belongs to.
    pub prediction_seq: u64,
    /// Raw line bytes.
    pub data: Vec<u8>,
}

impl ForwardLineData {
    /// An empty slot.
    pub const fn bubble() -> Self {
        Self {
            bubble: Flag::SET,
            thread_id: 0,
            pc: 0,
            line_base: 0,
            stream_seq: 0,
            prediction_seq: 0,
            data: Vec::new(),
        }
    }

    /// Bytes of the line from the fetch address onward.
    pub fn fetched_bytes(&self) -> &[u8] {
        let offset = self.pc.saturating_sub(self.line_base) as usize;
        self.data.get(offset..).unwrap_or_default()
    }
}

impl Default for ForwardLineData {
    fn default() -> Self {
        Self::bubble()
    }
}

impl Payload for ForwardLineData {
    fn is_bubble(&self) -> bool {
        self.bubble.is_set()
    }

    fn encode(&self, out: &mut Vec<u8>) {
        out.push(self.bubble.0);
        out.extend_from_slice(&self.thread_id.to_le_bytes());
        out.extend_from_slice(&self.pc.to_le_bytes());
        out.extend_from_slice(&self.line_base.to_le_bytes());
        out.extend_from_slice(&self.stream_seq.to_le_bytes());
        out.extend_from_slice(&self.prediction_seq.to_le_bytes());
        out.extend_from_slice(&self.data);
    }

    fn decode(bytes: &[u8]) -> Self {
        let mut r = Reader::new(bytes);
        Self {
            bubble: r.flag(),
            thread_id: r.u32(),
            pc: r.u64(),
            line_base: r.u64(),
            stream_seq: r.u64(),
            prediction_seq: r.u64(),
            data: r.rest(),
        }
    }
}

impl fmt::Display for ForwardLineData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.bubble.is_set() {
            f.write_str("-")
        } else {
            write!(
                f,
                "{}.{}/{:#x}({})",
                self.stream_seq,
                self.prediction_seq,
                self.pc,
                self.data.len()
            )
        }
    }
}

/// A fetched or decoded instruction travelling down the pipeline.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MicroOp {
    /// Unused slot.
    pub bubble: Flag,
    /// Program counter.
    pub pc: u64,
    /// Fetch-order sequence number assigned by Fetch2.
    pub seq_num: u64,
    /// Fetch stream the instruction belongs to.
    pub stream_seq: u64,
    /// Raw 32-bit instruction encoding.
    pub inst: u32,
    /// Fetch2 redirected fetch after this instruction.
    pub predicted_taken: Flag,
    /// Target Fetch2 redirected to.
    pub predicted_target: u64,
}

impl MicroOp {
    /// Bytes in the serialized image of one micro-op.
    pub const IMAGE_BYTES: usize = 1 + 8 + 8 + 8 + 4 + 1 + 8;

    /// An unused slot.
    pub fn bubble() -> Self {
        Self {
            bubble: Flag::SET,
            ..Self::default()
        }
    }

    fn encode(&self, out: &mut Vec<u8>) {
        out.push(self.bubble.0);
        out.extend_from_slice(&self.pc.to_le_bytes());
        out.extend_from_slice(&self.seq_num.to_le_bytes());
        out.extend_from_slice(&self.stream_seq.to_le_bytes());
        out.extend_from_slice(&self.inst.to_le_bytes());
        out.push(self.predicted_taken.0);
        out.extend_from_slice(&self.predicted_target.to_le_bytes());
    }

    fn decode(r: &mut Reader<'_>) -> Self {
        Self {
            bubble: r.flag(),
            pc: r.u64(),
            seq_num: r.u64(),
            stream_seq: r.u64(),
            inst: r.u32(),
            predicted_taken: r.flag(),
            predicted_target: r.u64(),
        }
    }
}

/// Bundle of up to `decode_input_width` micro-ops.
///
/// The bundle always holds `width` slots; `num_insts` says how many are in
/// use. Keeping the slot array fixed makes every bit image decodable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ForwardInstData {
    /// Occupied slots (raw latch value; may exceed the width after a fault).
    pub num_insts: u8,
    /// Thread the bundle belongs to.
    pub thread_id: ThreadId,
    slots: Vec<MicroOp>,
}

impl ForwardInstData {
    /// An empty bundle with `width` slots.
    pub fn bubble(width: usize) -> Self {
        Self {
            num_insts: 0,
            thread_id: 0,
            slots: vec![MicroOp::bubble(); width],
        }
    }

    /// Slot count.
    pub fn width(&self) -> usize {
        self.slots.len()
    }

    /// True when no more micro-ops fit.
    pub fn is_full(&self) -> bool {
        usize::from(self.num_insts) >= self.slots.len()
    }

    /// Appends a micro-op. Returns it back when the bundle is full.
    pub fn push(&mut self, op: MicroOp) -> Result<(), MicroOp> {
        let idx = usize::from(self.num_insts);
        match self.slots.get_mut(idx) {
            Some(slot) => {
                *slot = op;
                self.num_insts += 1;
                Ok(())
            }
            None => Err(op),
        }
    }

    /// Occupied micro-ops in program order.
    pub fn insts(&self) -> &[MicroOp] {
        let n = usize::from(self.num_insts).min(self.slots.len());
        &self.slots[..n]
    }

    /// Mutable view of the occupied micro-ops.
    pub fn insts_mut(&mut self) -> &mut [MicroOp] {
        let n = usize::from(self.num_insts).min(self.slots.len());
        &mut self.slots[..n]
    }
}

impl Payload for ForwardInstData {
    fn is_bubble(&self) -> bool {
        self.num_insts == 0
    }

    fn encode(&self, out: &mut Vec<u8>) {
        out.push(self.num_insts);
        out.extend_from_slice(&self.thread_id.to_le_bytes());
        for op in &self.slots {
            op.encode(out);
        }
    }

    fn decode(bytes: &[u8]) -> Self {
        let mut r = Reader::new(bytes);
        let num_insts = r.u8();
        let thread_id = r.u32();
        let width = r.remaining() / MicroOp::IMAGE_BYTES;
        let slots = (0..width).map(|_| MicroOp::decode(&mut r)).collect();
        Self {
            num_insts,
            thread_id,
            slots,
        }
    }
}

impl fmt::Display for ForwardInstData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_bubble() {
            return f.write_str("-");
        }
        for (i, op) in self.insts().iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}.{}", op.stream_seq, op.seq_num)?;
        }
        Ok(())
    }
}

/// Why a branch record was raised.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BranchReason {
    /// No branch; the slot is effectively empty.
    #[default]
    NoBranch,
    /// A predicted branch resolved as predicted.
    CorrectlyPredictedBranch,
    /// A taken branch that was not predicted.
    UnpredictedBranch,
    /// Fetch2 prediction sent to Fetch1.
    BranchPrediction,
    /// Predicted taken, but to the wrong target.
    BadlyPredictedBranchTarget,
    /// Predicted taken, but not taken.
    BadlyPredictedBranch,
    /// Stop fetching for this thread until woken.
    SuspendThread,
    /// Redirect to an interrupt handler.
    Interrupt,
    /// Stop fetching for a drain.
    HaltFetch,
    /// Reason code corrupted to a value that names no reason.
    Unknown(u8),
}

impl BranchReason {
    /// Latch encoding.
    pub const fn code(self) -> u8 {
        match self {
            Self::NoBranch => 0,
            Self::CorrectlyPredictedBranch => 1,
            Self::UnpredictedBranch => 2,
            Self::BranchPrediction => 3,
            Self::BadlyPredictedBranchTarget => 4,
            Self::BadlyPredictedBranch => 5,
            Self::SuspendThread => 6,
            Self::Interrupt => 7,
            Self::HaltFetch => 8,
            Self::Unknown(code) => code,
        }
    }

    /// Inverse of [`BranchReason::code`].
    pub const fn from_code(code: u8) -> Self {
        match code {
            0 => Self::NoBranch,
            1 => Self::CorrectlyPredictedBranch,
            2 => Self::UnpredictedBranch,
            3 => Self::BranchPrediction,
            4 => Self::BadlyPredictedBranchTarget,
            5 => Self::BadlyPredictedBranch,
            6 => Self::SuspendThread,
            7 => Self::Interrupt,
            8 => Self::HaltFetch,
            other => Self::Unknown(other),
        }
    }

    /// Whether younger instructions must be discarded.
    pub const fn is_stream_change(self) -> bool {
        !matches!(self, Self::NoBranch | Self::CorrectlyPredictedBranch)
    }
}

impl fmt::Display for BranchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(code) => write!(f, "Unknown({code})"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// Redirect or prediction record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BranchData {
    /// No record in this slot.
    pub bubble: Flag,
    /// Why fetch is being redirected.
    pub reason: BranchReason,
    /// Thread being redirected.
    pub thread_id: ThreadId,
    /// New fetch address.
    pub target: u64,
    /// Stream sequence number fetch should adopt.
    pub new_stream_seq: u64,
    /// Prediction sequence number fetch should adopt.
    pub new_prediction_seq: u64,
}

impl BranchData {
    /// An empty slot.
    pub const fn bubble() -> Self {
        Self {
            bubble: Flag::SET,
            reason: BranchReason::NoBranch,
            thread_id: 0,
            target: 0,
            new_stream_seq: 0,
            new_prediction_seq: 0,
        }
    }

    /// A live branch record.
    pub const fn new(
        reason: BranchReason,
        thread_id: ThreadId,
        target: u64,
        new_stream_seq: u64,
        new_prediction_seq: u64,
    ) -> Self {
        Self {
            bubble: Flag::CLEAR,
            reason,
            thread_id,
            target,
            new_stream_seq,
            new_prediction_seq,
        }
    }

    /// Not a bubble and carries a real reason.
    pub fn is_branch(&self) -> bool {
        !self.bubble.is_set() && self.reason != BranchReason::NoBranch
    }
}

impl Default for BranchData {
    fn default() -> Self {
        Self::bubble()
    }
}

impl Payload for BranchData {
    fn is_bubble(&self) -> bool {
        self.bubble.is_set()
    }

    fn counts_as_bubble(&self) -> bool {
        !self.is_branch()
    }

    fn encode(&self, out: &mut Vec<u8>) {
        out.push(self.bubble.0);
        out.push(self.reason.code());
        out.extend_from_slice(&self.thread_id.to_le_bytes());
        out.extend_from_slice(&self.target.to_le_bytes());
        out.extend_from_slice(&self.new_stream_seq.to_le_bytes());
        out.extend_from_slice(&self.new_prediction_seq.to_le_bytes());
    }

    fn decode(bytes: &[u8]) -> Self {
        let mut r = Reader::new(bytes);
        Self {
            bubble: r.flag(),
            reason: BranchReason::from_code(r.u8()),
            thread_id: r.u32(),
            target: r.u64(),
            new_stream_seq: r.u64(),
            new_prediction_seq: r.u64(),
        }
    }
}

impl fmt::Display for BranchData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_branch() {
            write!(
                f,
                "{}({}.{})->{:#x}",
                self.reason, self.new_stream_seq, self.new_prediction_seq, self.target
            )
        } else {
            f.write_str("-")
        }
    }
}
