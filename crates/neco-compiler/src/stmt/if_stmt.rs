//! If chains.

use neco_parser::ast::{Block, Expr};

use super::{Result, StmtCompiler};
use crate::bytecode::Opcode;

impl StmtCompiler<'_, '_> {
    /// ```text
    ///     cond_0; JUMP_IF_FALSE next_0; body_0; JUMP end
    /// next_0:
    ///     cond_1; JUMP_IF_FALSE next_1; body_1     (last branch, no else)
    /// next_1:
    /// end:
    /// ```
    ///
    /// A branch jumps to the end only when something follows it.
    pub(super) fn compile_if(
        &mut self,
        branches: &[(Expr, Block)],
        otherwise: Option<&Block>,
    ) -> Result<()> {
        let mut end_jumps = Vec::with_capacity(branches.len());
        for (i, (condition, body)) in branches.iter().enumerate() {
            self.emitter.set_line(condition.span.line);
            self.expr().compile(condition)?;
            let next = self.emitter.emit_jump(Opcode::JumpIfFalse);
            self.compile_block(body)?;
            let is_last = i + 1 == branches.len();
            if !is_last || otherwise.is_some() {
                end_jumps.push(self.emitter.emit_jump(Opcode::Jump));
            }
            self.emitter.patch_jump(next)?;
        }
        if let Some(otherwise) = otherwise {
            self.compile_block(otherwise)?;
        }
        for label in end_jumps {
            self.emitter.patch_jump(label)?;
        }
        Ok(())
    }
}
