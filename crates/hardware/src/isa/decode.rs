//! Instruction classification and J-type immediate handling.

use crate::isa::opcodes::{ECALL, OP_JAL, OPCODE_MASK};

/// Bit shift for extracting J-Type immediate bits 19-12.
const J_IMM_19_12_SHIFT: u32 = 12;

/// Bit mask for J-Type immediate bits 19-12 (8 bits).
const J_IMM_19_12_MASK: u32 = 0xFF;

/// Bit shift for extracting J-Type immediate bit 11 (bit 20 of instruction).
const J_IMM_11_SHIFT: u32 = 20;

/// Bit shift for extracting J-Type immediate bits 10-1 (bits 21-30 of instruction).
const J_IMM_10_1_SHIFT: u32 = 21;

/// Bit mask for J-Type immediate bits 10-1 (10 bits).
const J_IMM_10_1_MASK: u32 = 0x3FF;

/// Bit shift for extracting J-Type immediate bit 20 (bit 31 of instruction).
const J_IMM_20_SHIFT: u32 = 31;

/// Total number of bits in J-Type immediate (21 bits, sign-extended).
const J_IMM_BITS: u32 = 21;

/// Bit shift of the destination register field.
const RD_SHIFT: u32 = 7;

/// How the stage models treat an instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InstClass {
    /// `JAL` with its byte offset.
    Jump {
        /// Signed offset from the instruction's PC.
        offset: i64,
    },
    /// `ECALL`: stop fetching for the thread.
    Suspend,
    /// Any other encoding.
    Alu,
}

/// Classifies a raw 32-bit instruction.
pub const fn classify(inst: u32) -> InstClass {
    if inst & OPCODE_MASK == OP_JAL {
        InstClass::Jump {
            offset: decode_j_type_imm(inst),
        }
    } else if inst == ECALL {
        InstClass::Suspend
    } else {
        InstClass::Alu
    }
}

/// Decodes the immediate value for J-Type instructions.
///
/// J-Type format: `imm[20] | imm[10:1] | imm[11] | imm[19:12] | rd | opcode`
pub const fn decode_j_type_imm(inst: u32) -> i64 {
    let bits_19_12 = (inst >> J_IMM_19_12_SHIFT) & J_IMM_19_12_MASK;
    let bit_11 = (inst >> J_IMM_11_SHIFT) & 1;
    let bits_10_1 = (inst >> J_IMM_10_1_SHIFT) & J_IMM_10_1_MASK;
    let bit_20 = (inst >> J_IMM_20_SHIFT) & 1;

    let combined = (bit_20 << 20) | (bits_19_12 << 12) | (bit_11 << 11) | (bits_10_1 << 1);
    sign_extend(combined, J_IMM_BITS)
}

/// Encodes `jal rd, offset`. `offset` must be even and fit in 21 bits.
pub const fn encode_jal(rd: u32, offset: i64) -> u32 {
    let imm = offset as u32;
    let bit_20 = (imm >> 20) & 1;
    let bits_10_1 = (imm >> 1) & J_IMM_10_1_MASK;
    let bit_11 = (imm >> 11) & 1;
    let bits_19_12 = (imm >> 12) & J_IMM_19_12_MASK;
    (bit_20 << J_IMM_20_SHIFT)
        | (bits_10_1 << J_IMM_10_1_SHIFT)
        | (bit_11 << J_IMM_11_SHIFT)
        | (bits_19_12 << J_IMM_19_12_SHIFT)
        | ((rd & 0x1F) << RD_SHIFT)
        | OP_JAL
}

/// Sign-extends the low `bits` bits of `val`.
const fn sign_extend(val: u32, bits: u32) -> i64 {
    let shift = 32 - bits;
    ((val as i32) << shift >> shift) as i64
}
