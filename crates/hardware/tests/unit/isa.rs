//! # Instruction Classification Tests

use minorfi_core::isa::decode::encode_jal;
use minorfi_core::isa::opcodes::{ECALL, NOP};
use minorfi_core::isa::{InstClass, classify};
use rstest::rstest;

#[rstest]
#[case(NOP, InstClass::Alu)]
#[case(ECALL, InstClass::Suspend)]
#[case(0x0000_0033, InstClass::Alu)]
#[case(encode_jal(0, 8), InstClass::Jump { offset: 8 })]
#[case(encode_jal(1, -4), InstClass::Jump { offset: -4 })]
fn test_classify(#[case] inst: u32, #[case] expected: InstClass) {
    assert_eq!(classify(inst), expected);
}
