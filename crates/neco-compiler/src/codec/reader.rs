//! Binary module reader.

use neco_core::BinaryFormatError;

use super::{CODE_TAG, CONSTANTS_TAG, MAGIC, VERSION};
use crate::Program;
use crate::bytecode::{ConstantPool, Instruction, LINE_OFFSET_BIT, Opcode, OperandWidth};

type Result<T> = std::result::Result<T, BinaryFormatError>;

/// Decode a binary module.
///
/// Modules with the same major version and a minor version not above ours
/// are accepted.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn decode(bytes: &[u8]) -> Result<Program> {
    let mut r = ModuleReader::new(bytes);
    if bytes.len() < MAGIC.len() || bytes[..MAGIC.len()] != MAGIC {
        return Err(BinaryFormatError::BadMagic);
    }
    r.take(MAGIC.len())?;
    let _reserved = r.u8()?;
    let version = r.take(3)?;
    let (major, minor, patch) = (version[0], version[1], version[2]);
    if major != VERSION[0] || minor > VERSION[1] {
        return Err(BinaryFormatError::UnsupportedVersion {
            major,
            minor,
            patch,
        });
    }

    r.tag(&CONSTANTS_TAG, "CNST")?;
    let (strings_offset, strings) = r.segment()?;
    let strings = decode_strings(strings, strings_offset)?;
    let (ints_offset, ints) = r.segment()?;
    let ints = decode_words(ints, ints_offset)?
        .into_iter()
        .map(|word| i64::from_be_bytes(word))
        .collect();
    let (floats_offset, floats) = r.segment()?;
    let floats = decode_words(floats, floats_offset)?
        .into_iter()
        .map(|word| f64::from_bits(u64::from_be_bytes(word)))
        .collect();

    r.tag(&CODE_TAG, "CODE")?;
    let (_, metadata) = r.segment()?;
    let first_line = metadata.first().map_or(1, |line| u32::from(*line));
    let (globals_offset, globals) = r.segment()?;
    let globals = decode_stream(globals, globals_offset)?;
    let (_, table) = r.segment()?;
    let (bodies_offset, bodies) = r.segment()?;
    let starts = decode_table(table, bodies.len())?;

    let mut functions = Vec::with_capacity(starts.len());
    for (i, &start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(bodies.len());
        functions.push(decode_stream(&bodies[start..end], bodies_offset + start)?);
    }

    Ok(Program {
        constants: ConstantPool::from_parts(strings, ints, floats),
        first_line,
        globals,
        functions,
    })
}

fn decode_strings(payload: &[u8], offset: usize) -> Result<Vec<String>> {
    if payload.is_empty() {
        return Ok(Vec::new());
    }
    let Some(body) = payload.strip_suffix(&[0]) else {
        return Err(BinaryFormatError::Truncated {
            offset: offset + payload.len(),
        });
    };
    body.split(|b| *b == 0)
        .map(|bytes| {
            String::from_utf8(bytes.to_vec()).map_err(|_| BinaryFormatError::InvalidUtf8)
        })
        .collect()
}

fn decode_words(payload: &[u8], offset: usize) -> Result<Vec<[u8; 8]>> {
    let chunks = payload.chunks_exact(8);
    if !chunks.remainder().is_empty() {
        return Err(BinaryFormatError::Truncated {
            offset: offset + payload.len(),
        });
    }
    Ok(chunks
        .map(|chunk| {
            let mut word = [0u8; 8];
            word.copy_from_slice(chunk);
            word
        })
        .collect())
}

/// Start offsets of the function bodies.
fn decode_table(table: &[u8], bodies_len: usize) -> Result<Vec<usize>> {
    let mut starts = Vec::new();
    let mut start = 0usize;
    let mut delta = 0usize;
    let mut open = false;
    for &byte in table {
        delta += usize::from(byte);
        open = byte == 0xFF;
        if !open {
            start += delta;
            delta = 0;
            starts.push(start);
        }
    }
    let malformed = open
        || starts.first().is_some_and(|first| *first != 0)
        || starts.last().is_some_and(|last| *last > bodies_len)
        || (starts.is_empty() && bodies_len > 0);
    if malformed {
        return Err(BinaryFormatError::MalformedFunctionTable);
    }
    Ok(starts)
}

/// Decode one instruction stream. `base` is the stream's offset in the
/// module, for error positions.
pub(crate) fn decode_stream(bytes: &[u8], base: usize) -> Result<Vec<Instruction>> {
    let mut code = Vec::with_capacity(bytes.len() / 2);
    let mut pos = 0;
    while pos < bytes.len() {
        let byte = bytes[pos];
        if byte & LINE_OFFSET_BIT != 0 {
            code.push(Instruction::new(Opcode::LineOffset, u16::from(byte & 0x7F)));
            pos += 1;
            continue;
        }
        let opcode = match Opcode::from_byte(byte) {
            Some(op) if op != Opcode::Tombstone => op,
            _ => {
                return Err(BinaryFormatError::UnknownOpcode {
                    byte,
                    offset: base + pos,
                });
            }
        };
        let width = match opcode.operand_width() {
            OperandWidth::None => 0,
            OperandWidth::Byte => 1,
            OperandWidth::Wide => 2,
        };
        let operand_bytes =
            bytes
                .get(pos + 1..pos + 1 + width)
                .ok_or(BinaryFormatError::Truncated {
                    offset: base + bytes.len(),
                })?;
        let operand = operand_bytes
            .iter()
            .fold(0u16, |acc, b| (acc << 8) | u16::from(*b));
        code.push(Instruction::new(opcode, operand));
        pos += 1 + width;
    }
    Ok(code)
}

struct ModuleReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ModuleReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let slice = self
            .bytes
            .get(self.pos..self.pos + n)
            .ok_or(BinaryFormatError::Truncated {
                offset: self.bytes.len(),
            })?;
        self.pos += n;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn tag(&mut self, expected: &[u8; 4], name: &'static str) -> Result<()> {
        match self.bytes.get(self.pos..self.pos + 4) {
            Some(found) if found == expected => {
                self.pos += 4;
                Ok(())
            }
            _ => Err(BinaryFormatError::MissingSegment { tag: name }),
        }
    }

    /// A 3-byte length and its payload, with the payload's module offset.
    fn segment(&mut self) -> Result<(usize, &'a [u8])> {
        let len = self
            .take(3)?
            .iter()
            .fold(0usize, |acc, b| (acc << 8) | usize::from(*b));
        let offset = self.pos;
        Ok((offset, self.take(len)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode;

    fn sample() -> Program {
        let mut program = Program {
            first_line: 3,
            ..Program::default()
        };
        program.constants.intern_string("hello").unwrap();
        program.constants.intern_string("").unwrap();
        program.constants.intern_int(-7).unwrap();
        program.constants.intern_float(2.5).unwrap();
        program.globals = vec![
            Instruction::new(Opcode::LoadConstString, 0),
            Instruction::new(Opcode::CallBuiltin, 1),
            Instruction::bare(Opcode::Pop),
        ];
        program.functions = vec![
            vec![Instruction::bare(Opcode::PushNone), Instruction::bare(Opcode::Return)],
            vec![
                Instruction::new(Opcode::LoadConstInt, 0),
                Instruction::bare(Opcode::Return),
            ],
        ];
        program
    }

    #[test]
    fn decode_inverts_encode() {
        let program = sample();
        let decoded = decode(&encode(&program).unwrap()).unwrap();
        assert_eq!(decoded, program);
    }

    #[test]
    fn bad_magic() {
        assert_eq!(decode(b"NoCo"), Err(BinaryFormatError::BadMagic));
        assert_eq!(decode(b"Ne"), Err(BinaryFormatError::BadMagic));
    }

    #[test]
    fn newer_minor_version_is_rejected() {
        let mut bytes = encode(&sample()).unwrap();
        bytes[6] = 1;
        assert!(matches!(
            decode(&bytes),
            Err(BinaryFormatError::UnsupportedVersion { major: 1, minor: 1, .. })
        ));
    }

    #[test]
    fn truncated_module() {
        let bytes = encode(&sample()).unwrap();
        assert!(matches!(
            decode(&bytes[..bytes.len() - 1]),
            Err(BinaryFormatError::Truncated { .. })
        ));
    }

    #[test]
    fn missing_code_segment() {
        let bytes = encode(&Program::default()).unwrap();
        assert_eq!(
            decode(&bytes[..21]),
            Err(BinaryFormatError::MissingSegment { tag: "CODE" })
        );
    }

    #[test]
    fn unknown_opcode() {
        assert!(matches!(
            decode_stream(&[0x55, 0x4F], 10),
            Err(BinaryFormatError::UnknownOpcode { byte: 0x4F, offset: 11 })
        ));
        assert!(matches!(
            decode_stream(&[0x7F], 0),
            Err(BinaryFormatError::UnknownOpcode { byte: 0x7F, .. })
        ));
    }

    #[test]
    fn function_table_must_terminate() {
        assert_eq!(
            decode_table(&[0, 0xFF], 300),
            Err(BinaryFormatError::MalformedFunctionTable)
        );
        assert_eq!(decode_table(&[0, 0xFF, 3], 300), Ok(vec![0, 258]));
        assert_eq!(
            decode_table(&[0, 9], 4),
            Err(BinaryFormatError::MalformedFunctionTable)
        );
    }
}
