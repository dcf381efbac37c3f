//! Binary module writer.

use neco_core::BinaryFormatError;

use super::compact::compact;
use super::{CODE_TAG, CONSTANTS_TAG, MAGIC, MAX_SEGMENT_LEN, VERSION};
use crate::Program;
use crate::bytecode::{Instruction, LINE_OFFSET_BIT, Opcode, OperandWidth};

type Result<T> = std::result::Result<T, BinaryFormatError>;

/// Serialize a program. Tombstones are dropped and jump distances are
/// recomputed on the way out.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn encode(program: &Program) -> Result<Vec<u8>> {
    let mut w = ModuleWriter::new();
    w.bytes(&MAGIC);
    w.u8(0);
    w.bytes(&VERSION);

    w.bytes(&CONSTANTS_TAG);
    let constants = &program.constants;
    let mut strings = Vec::new();
    for s in constants.strings() {
        if s.as_bytes().contains(&0) {
            return Err(BinaryFormatError::EmbeddedNul);
        }
        strings.extend_from_slice(s.as_bytes());
        strings.push(0);
    }
    w.segment(&strings)?;
    let ints: Vec<u8> = constants.ints().iter().flat_map(|v| v.to_be_bytes()).collect();
    w.segment(&ints)?;
    let floats: Vec<u8> = constants
        .floats()
        .iter()
        .flat_map(|v| v.to_bits().to_be_bytes())
        .collect();
    w.segment(&floats)?;

    w.bytes(&CODE_TAG);
    let first_line = u8::try_from(program.first_line)
        .map_err(|_| BinaryFormatError::FirstLineOutOfRange { line: program.first_line })?;
    w.segment(&[first_line])?;
    w.segment(&encode_stream(&compact(&program.globals)))?;

    let mut table = Vec::with_capacity(program.functions.len());
    let mut bodies = Vec::new();
    let mut previous_start = 0usize;
    for function in &program.functions {
        let start = bodies.len();
        push_table_delta(&mut table, start - previous_start);
        previous_start = start;
        bodies.extend(encode_stream(&compact(function)));
    }
    w.segment(&table)?;
    w.segment(&bodies)?;
    Ok(w.finish())
}

/// `0xFF` adds 255 and continues; any other byte adds itself and ends the
/// entry.
fn push_table_delta(table: &mut Vec<u8>, mut delta: usize) {
    while delta >= 0xFF {
        table.push(0xFF);
        delta -= 0xFF;
    }
    table.push(delta as u8);
}

pub(crate) fn encode_stream(code: &[Instruction]) -> Vec<u8> {
    let mut out = Vec::with_capacity(code.len() * 2);
    for insn in code {
        match insn.opcode {
            Opcode::Tombstone => {}
            Opcode::LineOffset => out.push(LINE_OFFSET_BIT | (insn.operand as u8 & 0x7F)),
            op => {
                let insn = Instruction::sized(op.narrow(), insn.operand);
                out.push(u8::from(insn.opcode));
                match insn.opcode.operand_width() {
                    OperandWidth::None => {}
                    OperandWidth::Byte => out.push(insn.operand as u8),
                    OperandWidth::Wide => out.extend_from_slice(&insn.operand.to_be_bytes()),
                }
            }
        }
    }
    out
}

struct ModuleWriter {
    buf: Vec<u8>,
}

impl ModuleWriter {
    fn new() -> Self {
        Self { buf: Vec::new() }
    }

    fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn bytes(&mut self, v: &[u8]) {
        self.buf.extend_from_slice(v);
    }

    /// A 3-byte big-endian length followed by the payload.
    fn segment(&mut self, payload: &[u8]) -> Result<()> {
        if payload.len() > MAX_SEGMENT_LEN {
            return Err(BinaryFormatError::SegmentTooLarge { len: payload.len() });
        }
        let len = (payload.len() as u32).to_be_bytes();
        self.bytes(&len[1..]);
        self.bytes(payload);
        Ok(())
    }

    fn finish(self) -> Vec<u8> {
        self.buf
    }
}
