//! Tombstone removal.
//!
//! Drops tombstones from a stream and recomputes every jump distance
//! against the shorter stream, choosing the narrow or extended form anew.
//! Distances only shrink, so a jump that was encodable stays encodable.

use crate::bytecode::{Instruction, Opcode};

pub fn compact(code: &[Instruction]) -> Vec<Instruction> {
    // new_index[i] = position of old instruction i (or of the next surviving
    // one when i is a tombstone); new_index[len] = the compacted length.
    let mut new_index = Vec::with_capacity(code.len() + 1);
    let mut next = 0usize;
    for insn in code {
        new_index.push(next);
        if !insn.is_tombstone() {
            next += 1;
        }
    }
    new_index.push(next);

    let mut out = Vec::with_capacity(next);
    for (old, insn) in code.iter().enumerate() {
        if insn.is_tombstone() {
            continue;
        }
        let Some(target) = insn.jump_target(old) else {
            out.push(*insn);
            continue;
        };
        let here = new_index[old];
        let target = new_index[target.min(code.len())];
        let distance = if insn.opcode.is_forward_jump() {
            target.saturating_sub(here + 1)
        } else {
            (here + 1).saturating_sub(target)
        };
        // Never wider than before: the old distance fit in 16 bits.
        let operand = u16::try_from(distance).unwrap_or(u16::MAX);
        out.push(Instruction::sized(insn.opcode.narrow(), operand));
    }
    out
}

/// Whether a stream holds no tombstones.
pub fn is_compact(code: &[Instruction]) -> bool {
    code.iter().all(|insn| insn.opcode != Opcode::Tombstone)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tomb() -> Instruction {
        Instruction::bare(Opcode::Tombstone)
    }

    #[test]
    fn forward_jump_over_tombstones() {
        let code = vec![
            Instruction::new(Opcode::JumpIfFalse, 3),
            tomb(),
            Instruction::bare(Opcode::Pop),
            tomb(),
            Instruction::bare(Opcode::Dup),
        ];
        let out = compact(&code);
        assert_eq!(
            out,
            vec![
                Instruction::new(Opcode::JumpIfFalse, 1),
                Instruction::bare(Opcode::Pop),
                Instruction::bare(Opcode::Dup),
            ]
        );
        assert!(is_compact(&out));
    }

    #[test]
    fn jump_onto_tombstone_lands_on_next_instruction() {
        let code = vec![
            Instruction::new(Opcode::Jump, 1),
            Instruction::bare(Opcode::Pop),
            tomb(),
        ];
        let out = compact(&code);
        assert_eq!(out[0].jump_target(0), Some(out.len()));
    }

    #[test]
    fn backward_jump_shrinks() {
        let code = vec![
            Instruction::bare(Opcode::Pop),
            tomb(),
            tomb(),
            Instruction::new(Opcode::JumpBack, 4),
        ];
        let out = compact(&code);
        assert_eq!(out[1], Instruction::new(Opcode::JumpBack, 2));
        assert_eq!(out[1].jump_target(1), Some(0));
    }

    #[test]
    fn extended_jump_can_narrow() {
        let mut code = vec![Instruction::new(Opcode::JumpExt, 300)];
        code.extend(std::iter::repeat_n(tomb(), 100));
        code.extend(std::iter::repeat_n(Instruction::bare(Opcode::Pop), 200));
        let out = compact(&code);
        assert_eq!(out[0], Instruction::new(Opcode::Jump, 200));
    }
}
