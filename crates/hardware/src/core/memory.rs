//! Program image backing the instruction-side port.

use crate::isa::opcodes::INSTRUCTION_BYTES;

/// Flat, read-only instruction memory.
///
/// Reads outside the image return zero bytes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProgramImage {
    base: u64,
    bytes: Vec<u8>,
}

impl ProgramImage {
    /// Builds an image of little-endian 32-bit words starting at `base`.
    pub fn from_words(base: u64, words: &[u32]) -> Self {
        let bytes = words.iter().flat_map(|w| w.to_le_bytes()).collect();
        Self { base, bytes }
    }

    /// Address of the first word; every thread starts fetching here.
    pub const fn entry(&self) -> u64 {
        self.base
    }

    /// Address one past the last byte.
    pub fn end(&self) -> u64 {
        self.base + self.bytes.len() as u64
    }

    /// Number of instruction words.
    pub fn len(&self) -> usize {
        self.bytes.len() / INSTRUCTION_BYTES as usize
    }

    /// True when the image holds no instructions.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Copies `len` bytes starting at `addr`, zero-filling outside the image.
    pub fn read(&self, addr: u64, len: usize) -> Vec<u8> {
        (0..len as u64)
            .map(|i| {
                addr.wrapping_add(i)
                    .checked_sub(self.base)
                    .and_then(|off| usize::try_from(off).ok())
                    .and_then(|off| self.bytes.get(off).copied())
                    .unwrap_or(0)
            })
            .collect()
    }
}
