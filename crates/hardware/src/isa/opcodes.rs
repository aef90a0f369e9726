//! RISC-V major opcodes (bits 6-0) and fixed encodings.

/// Mask selecting the major opcode.
pub const OPCODE_MASK: u32 = 0x7F;

/// Jump and Link (JAL).
pub const OP_JAL: u32 = 0b1101111;

/// Environment Call (ECALL).
pub const ECALL: u32 = 0x0000_0073;

/// Canonical NOP (`addi x0, x0, 0`).
pub const NOP: u32 = 0x0000_0013;

/// Bytes per instruction.
pub const INSTRUCTION_BYTES: u64 = 4;
