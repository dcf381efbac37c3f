//! Bytecode types for the NeCo compiler.
//!
//! - [`Opcode`] - the instruction set shared with the VM
//! - [`Instruction`] - one entry of an instruction stream
//! - [`ConstantPool`] - deduplicated string, int and float pools

mod constant;
mod instruction;
mod opcode;

pub use constant::{ConstantPool, MAX_POOL_LEN};
pub use instruction::Instruction;
pub use opcode::{
    BARE_START, LINE_OFFSET_BIT, MAX_LINE_DELTA, NARROW_START, Opcode, OperandWidth,
};
