//! Statement `match`.

use neco_parser::ast::{Block, Expr};

use super::{Result, StmtCompiler};
use crate::bytecode::Opcode;

impl StmtCompiler<'_, '_> {
    /// Same dispatch as the expression form; bodies are blocks and the
    /// default may be absent.
    pub(super) fn compile_match(
        &mut self,
        scrutinee: &Expr,
        arms: &[(Expr, Block)],
        default: Option<&Block>,
    ) -> Result<()> {
        let arm_jumps = {
            let mut expr = self.expr();
            expr.compile(scrutinee)?;
            expr.compile_dispatch(arms.iter().map(|(pattern, _)| pattern))?
        };

        let mut end_jumps = Vec::with_capacity(arms.len() + 1);
        if let Some(default) = default {
            self.compile_block(default)?;
        }
        end_jumps.push(self.emitter.emit_jump(Opcode::Jump));

        let last = arms.len().saturating_sub(1);
        for (i, ((_, body), label)) in arms.iter().zip(arm_jumps).enumerate() {
            self.emitter.patch_jump(label)?;
            if i != last {
                self.emitter.emit(Opcode::Pop);
            }
            self.compile_block(body)?;
            end_jumps.push(self.emitter.emit_jump(Opcode::Jump));
        }
        for label in end_jumps {
            self.emitter.patch_jump(label)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::bytecode::Opcode;
    use crate::stmt::test_support::{compile_globals, ops};

    #[test]
    fn arms_compare_against_one_scrutinee() {
        let code = compile_globals(
            "enum Color { Red, Green, Blue }\n\
             Color c = Color.Green\n\
             match (c) {\n\
               Color.Red => printLine(\"r\")\n\
               Color.Green => { printLine(\"g\") }\n\
               default => { }\n\
             }",
            false,
        );
        let ops = ops(&code);
        assert_eq!(ops.iter().filter(|op| **op == Opcode::Dup).count(), 1);
        assert_eq!(ops.iter().filter(|op| **op == Opcode::Equal).count(), 2);
        assert_eq!(ops.iter().filter(|op| **op == Opcode::Pop).count(), 3);
        assert_eq!(
            ops.iter().filter(|op| **op == Opcode::LoadLocal).count(),
            1
        );
    }

    #[test]
    fn arm_jumps_land_on_their_bodies() {
        let code = compile_globals(
            "int n = 2\nmatch (n) { 1 => printLine(\"one\"), 2 => printLine(\"two\") }",
            true,
        );
        let taken: Vec<usize> = (0..code.len())
            .filter(|&i| code[i].opcode == Opcode::JumpIfTrue)
            .collect();
        assert_eq!(taken.len(), 2);
        let first = code[taken[0]].jump_target(taken[0]).unwrap();
        // The first arm drops the scrutinee left by its DUP.
        assert_eq!(code[first].opcode, Opcode::Pop);
        let second = code[taken[1]].jump_target(taken[1]).unwrap();
        assert_eq!(code[second].opcode, Opcode::LoadConstString);
    }
}
