use minorfi_core::core::ProgramImage;
use minorfi_core::isa::decode::encode_jal;
use minorfi_core::isa::opcodes::{ECALL, NOP};
use minorfi_core::sim::DEFAULT_BASE;

/// Fluent builder for instruction images.
#[derive(Debug, Clone)]
pub struct ProgramBuilder {
    base: u64,
    words: Vec<u32>,
}

impl Default for ProgramBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self {
            base: DEFAULT_BASE,
            words: Vec::new(),
        }
    }

    pub fn base(mut self, base: u64) -> Self {
        self.base = base;
        self
    }

    pub fn nops(mut self, n: usize) -> Self {
        self.words.extend(std::iter::repeat_n(NOP, n));
        self
    }

    /// `jal x0, offset` (byte offset from this instruction).
    pub fn jump(mut self, offset: i64) -> Self {
        self.words.push(encode_jal(0, offset));
        self
    }

    pub fn ecall(mut self) -> Self {
        self.words.push(ECALL);
        self
    }

    pub fn build(self) -> ProgramImage {
        ProgramImage::from_words(self.base, &self.words)
    }
}
