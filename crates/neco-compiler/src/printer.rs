//! Human-readable listing of a [`Program`].

use std::fmt::Write;

use crate::Program;
use crate::bytecode::{Instruction, Opcode};

/// Render the constant pools and every instruction stream.
///
/// Each instruction line shows its index in the stream, the source line it
/// belongs to, the mnemonic and operand, and for jumps the landing index.
/// Tombstones are skipped but keep their index, so targets read true
/// against the in-memory stream.
pub fn disassemble(program: &Program) -> String {
    let mut out = String::new();
    let constants = &program.constants;

    let _ = writeln!(out, "== constants ==");
    for (i, s) in constants.strings().iter().enumerate() {
        let _ = writeln!(out, "  str   {i:>4}  {s:?}");
    }
    for (i, v) in constants.ints().iter().enumerate() {
        let _ = writeln!(out, "  int   {i:>4}  {v}");
    }
    for (i, v) in constants.floats().iter().enumerate() {
        let _ = writeln!(out, "  float {i:>4}  {v:?}");
    }

    let _ = writeln!(out, "== globals ==");
    print_stream(&mut out, &program.globals, program.first_line);
    for (i, code) in program.functions.iter().enumerate() {
        let _ = writeln!(out, "== function {i} ==");
        print_stream(&mut out, code, program.first_line);
    }
    out
}

fn print_stream(out: &mut String, code: &[Instruction], first_line: u32) {
    let mut line = first_line;
    for (i, insn) in code.iter().enumerate() {
        match insn.opcode {
            Opcode::Tombstone => continue,
            Opcode::LineOffset => {
                line += u32::from(insn.operand);
                continue;
            }
            _ => {}
        }
        let _ = write!(out, "{i:>5} {line:>5}  {insn}");
        if let Some(target) = insn.jump_target(i) {
            let _ = write!(out, " -> {target}");
        }
        out.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_resolves_jumps_and_lines() {
        let mut program = Program {
            first_line: 1,
            ..Program::default()
        };
        program.constants.intern_string("pos").unwrap();
        program.globals = vec![
            Instruction::bare(Opcode::PushTrue),
            Instruction::new(Opcode::JumpIfFalse, 2),
            Instruction::line(2),
            Instruction::bare(Opcode::Tombstone),
            Instruction::bare(Opcode::PushNone),
        ];
        let text = disassemble(&program);
        assert!(text.contains("str      0  \"pos\""));
        assert!(text.contains("    1     1  JUMP_IF_FALSE 2 -> 4"));
        assert!(text.contains("    4     3  PUSH_NONE"));
        assert!(!text.contains("TOMBSTONE"));
        assert!(!text.contains("LINE"));
    }
}
