//! Peephole optimizer.
//!
//! Two local rewrites over one instruction stream:
//! - a forward `JUMP 0` (left behind by empty else/default bodies) is
//!   removed;
//! - runs of line offsets are merged while the summed delta still fits one
//!   instruction.
//!
//! Removed instructions become [`Opcode::Tombstone`] in place, so every
//! index and every jump distance computed during generation stays valid.
//! Consumers skip tombstones; the codec's compaction drops them.

use crate::bytecode::{Instruction, MAX_LINE_DELTA, Opcode};

#[cfg_attr(feature = "profiling", profiling::function)]
pub fn optimize(code: &mut [Instruction]) {
    remove_empty_jumps(code);
    merge_line_offsets(code);
}

fn remove_empty_jumps(code: &mut [Instruction]) {
    for insn in code.iter_mut() {
        if insn.opcode.narrow() == Opcode::Jump && insn.operand == 0 {
            *insn = Instruction::bare(Opcode::Tombstone);
        }
    }
}

fn merge_line_offsets(code: &mut [Instruction]) {
    // Index of the line offset currently absorbing its successors.
    let mut open: Option<usize> = None;
    for i in 0..code.len() {
        match code[i].opcode {
            Opcode::Tombstone => {}
            Opcode::LineOffset => match open {
                Some(j) if code[j].operand + code[i].operand <= MAX_LINE_DELTA => {
                    code[j].operand += code[i].operand;
                    code[i] = Instruction::bare(Opcode::Tombstone);
                }
                _ => open = Some(i),
            },
            _ => open = None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(delta: u16) -> Instruction {
        Instruction::line(delta)
    }

    #[test]
    fn adjacent_offsets_merge() {
        let mut code = vec![line(2), line(3), Instruction::bare(Opcode::Pop), line(1)];
        optimize(&mut code);
        assert_eq!(
            code,
            vec![
                line(5),
                Instruction::bare(Opcode::Tombstone),
                Instruction::bare(Opcode::Pop),
                line(1),
            ]
        );
    }

    #[test]
    fn merged_delta_stays_encodable() {
        let mut code = vec![line(100), line(27), line(1)];
        optimize(&mut code);
        assert_eq!(code[0], line(127));
        assert!(code[1].is_tombstone());
        assert_eq!(code[2], line(1));
    }

    #[test]
    fn zero_distance_jumps_are_removed() {
        let mut code = vec![
            Instruction::new(Opcode::Jump, 0),
            Instruction::new(Opcode::JumpIfFalse, 0),
            Instruction::new(Opcode::Jump, 1),
            Instruction::bare(Opcode::Pop),
        ];
        optimize(&mut code);
        assert!(code[0].is_tombstone());
        assert_eq!(code[1].opcode, Opcode::JumpIfFalse);
        assert_eq!(code[2].opcode, Opcode::Jump);
    }

    #[test]
    fn offsets_merge_across_removed_jumps() {
        let mut code = vec![line(1), Instruction::new(Opcode::Jump, 0), line(1)];
        optimize(&mut code);
        assert_eq!(code[0], line(2));
        assert!(code[1].is_tombstone());
        assert!(code[2].is_tombstone());
    }
}
