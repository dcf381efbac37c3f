//! Loops. `while` and `for` arrive already desugared into `loop` with a
//! guard, so one lowering serves all three.

use neco_parser::ast::{Block, Stmt};

use super::{Result, StmtCompiler};

impl StmtCompiler<'_, '_> {
    /// ```text
    /// head:
    ///     body
    /// step:                  (continue lands here when there is a step)
    ///     step
    ///     JUMP_BACK head
    /// end:                   (break lands here)
    /// ```
    pub(super) fn compile_loop(&mut self, body: &Block, step: Option<&Stmt>) -> Result<()> {
        let head = self.emitter.enter_loop(step.is_some());
        self.compile_block(body)?;
        if let Some(step) = step {
            self.emitter.patch_continues()?;
            self.compile(step)?;
        }
        self.emitter.emit_jump_back(head)?;
        self.emitter.exit_loop()
    }
}

#[cfg(test)]
mod tests {
    use crate::bytecode::{Instruction, Opcode};
    use crate::stmt::test_support::compile_globals;

    fn find(code: &[Instruction], op: Opcode) -> Vec<usize> {
        (0..code.len()).filter(|&i| code[i].opcode == op).collect()
    }

    #[test]
    fn while_loop_breaks_past_the_back_jump() {
        let code = compile_globals("int i = 3\nwhile (i > 0) { i -= 1 }", true);
        let back = find(&code, Opcode::JumpBack);
        let brk = find(&code, Opcode::Jump);
        assert_eq!(back.len(), 1);
        assert_eq!(brk.len(), 1);
        assert_eq!(code[brk[0]].jump_target(brk[0]), Some(back[0] + 1));
        // Loop head is the guard's first instruction.
        let head = code[back[0]].jump_target(back[0]).unwrap();
        assert_eq!(code[head].opcode, Opcode::LoadLocal);
    }

    #[test]
    fn for_continue_runs_the_step() {
        let code = compile_globals(
            "for (int i = 0; i < 3; i += 1) {\n  if (i == 1) { continue }\n  printLine(i)\n}",
            true,
        );
        let back = find(&code, Opcode::JumpBack)[0];
        let jumps = find(&code, Opcode::Jump);
        // One break from the guard and one continue.
        assert_eq!(jumps.len(), 2);
        let targets: Vec<usize> = jumps
            .iter()
            .map(|&i| code[i].jump_target(i).unwrap())
            .collect();
        assert!(targets.contains(&(back + 1)));
        let step = targets.iter().copied().find(|&t| t != back + 1).unwrap();
        assert!(step < back);
        assert_eq!(code[step].opcode, Opcode::LoadLocal);
    }

    #[test]
    fn continue_without_step_jumps_back() {
        let code = compile_globals("loop {\n  continue\n}", true);
        let backs = find(&code, Opcode::JumpBack);
        assert_eq!(backs.len(), 2);
        for i in backs {
            assert_eq!(code[i].jump_target(i), Some(0));
        }
    }

    #[test]
    fn break_from_scoped_body_pops_scope() {
        let code = compile_globals("loop {\n  int a = 1\n  break\n}", true);
        let jump = find(&code, Opcode::Jump)[0];
        assert_eq!(code[jump - 1].opcode, Opcode::ScopePop);
    }
}
