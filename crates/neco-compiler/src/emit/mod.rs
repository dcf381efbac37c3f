//! Instruction emitter.
//!
//! The [`BytecodeEmitter`] builds one instruction stream (the globals code
//! or one function body). It owns operand sizing, line tracking, jump
//! backpatching and loop bookkeeping; the expression and statement
//! compilers drive it.
//!
//! # Example
//!
//! ```
//! use neco_compiler::bytecode::{ConstantPool, Opcode};
//! use neco_compiler::emit::BytecodeEmitter;
//!
//! let mut constants = ConstantPool::new();
//! let mut emitter = BytecodeEmitter::new(&mut constants, 1, true);
//!
//! emitter.emit_int(40).unwrap();
//! emitter.emit_int(2).unwrap();
//! emitter.emit(Opcode::Add);
//!
//! let code = emitter.finish();
//! assert_eq!(code.len(), 3);
//! ```

mod jumps;

pub use jumps::{ContinueTarget, JumpManager};

use neco_core::CodeGenError;

use crate::bytecode::{ConstantPool, Instruction, MAX_LINE_DELTA, Opcode};

/// Index of a forward jump awaiting its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JumpLabel(pub usize);

pub struct BytecodeEmitter<'pool> {
    code: Vec<Instruction>,

    /// Shared by every stream of the program.
    constants: &'pool mut ConstantPool,

    jumps: JumpManager,

    /// Line the stream's offsets have advanced to.
    current_line: u32,

    /// Runtime scopes currently pushed by this stream.
    scope_depth: usize,

    optimize: bool,
}

impl<'pool> BytecodeEmitter<'pool> {
    /// Create an emitter whose line counter starts at `first_line`.
    pub fn new(constants: &'pool mut ConstantPool, first_line: u32, optimize: bool) -> Self {
        Self {
            code: Vec::new(),
            constants,
            jumps: JumpManager::new(),
            current_line: first_line,
            scope_depth: 0,
            optimize,
        }
    }

    pub fn optimize(&self) -> bool {
        self.optimize
    }

    /// Advance the line counter to `line`, emitting line offsets.
    ///
    /// Offsets only move forward; a lower line (a `for` step emitted after
    /// its body) keeps the current line.
    pub fn set_line(&mut self, line: u32) {
        let mut remaining = line.saturating_sub(self.current_line);
        while remaining > 0 {
            let delta = remaining.min(u32::from(MAX_LINE_DELTA));
            self.code.push(Instruction::line(delta as u16));
            remaining -= delta;
        }
        self.current_line = self.current_line.max(line);
    }

    pub fn current_line(&self) -> u32 {
        self.current_line
    }

    /// Number of instructions emitted so far.
    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    pub fn finish(self) -> Vec<Instruction> {
        self.code
    }

    // ==========================================================================
    // Basic Emission
    // ==========================================================================

    /// Emit an opcode without an operand.
    pub fn emit(&mut self, op: Opcode) {
        self.code.push(Instruction::bare(op));
    }

    /// Emit an opcode with an operand, widening it when needed.
    pub fn emit_operand(&mut self, op: Opcode, operand: u16) {
        self.code.push(Instruction::sized(op, operand));
    }

    pub fn emit_byte(&mut self, op: Opcode, byte: u8) {
        self.code.push(Instruction::new(op, u16::from(byte)));
    }

    // ==========================================================================
    // Constants
    // ==========================================================================

    pub fn emit_int(&mut self, value: i64) -> Result<(), CodeGenError> {
        let index = self.constants.intern_int(value)?;
        self.emit_operand(Opcode::LoadConstInt, index);
        Ok(())
    }

    pub fn emit_float(&mut self, value: f64) -> Result<(), CodeGenError> {
        let index = self.constants.intern_float(value)?;
        self.emit_operand(Opcode::LoadConstFloat, index);
        Ok(())
    }

    pub fn emit_string(&mut self, value: &str) -> Result<(), CodeGenError> {
        let index = self.constants.intern_string(value)?;
        self.emit_operand(Opcode::LoadConstString, index);
        Ok(())
    }

    pub fn emit_bool(&mut self, value: bool) {
        self.emit(if value {
            Opcode::PushTrue
        } else {
            Opcode::PushFalse
        });
    }

    /// Fused "load constant, add to collection" forms.
    pub fn emit_insert_int(&mut self, value: i64) -> Result<(), CodeGenError> {
        let index = self.constants.intern_int(value)?;
        self.emit_operand(Opcode::InsertConstInt, index);
        Ok(())
    }

    pub fn emit_insert_float(&mut self, value: f64) -> Result<(), CodeGenError> {
        let index = self.constants.intern_float(value)?;
        self.emit_operand(Opcode::InsertConstFloat, index);
        Ok(())
    }

    pub fn emit_insert_string(&mut self, value: &str) -> Result<(), CodeGenError> {
        let index = self.constants.intern_string(value)?;
        self.emit_operand(Opcode::InsertConstString, index);
        Ok(())
    }

    // ==========================================================================
    // Scopes
    // ==========================================================================

    pub fn enter_scope(&mut self) {
        self.scope_depth += 1;
        self.emit(Opcode::ScopePush);
    }

    pub fn exit_scope(&mut self) {
        self.scope_depth = self.scope_depth.saturating_sub(1);
        self.emit(Opcode::ScopePop);
    }

    pub fn scope_depth(&self) -> usize {
        self.scope_depth
    }

    /// Emit scope pops down to `depth` without closing the scopes
    /// statically; the code after a break still runs inside them.
    fn unwind_scopes_to(&mut self, depth: usize) {
        for _ in depth..self.scope_depth {
            self.emit(Opcode::ScopePop);
        }
    }

    // ==========================================================================
    // Jumps
    // ==========================================================================

    /// Emit a forward jump with a placeholder distance.
    pub fn emit_jump(&mut self, op: Opcode) -> JumpLabel {
        let label = JumpLabel(self.code.len());
        self.code.push(Instruction::new(op.narrow(), 0));
        label
    }

    /// Point a forward jump at the next instruction to be emitted.
    pub fn patch_jump(&mut self, label: JumpLabel) -> Result<(), CodeGenError> {
        let distance = self.code.len() - (label.0 + 1);
        let operand =
            u16::try_from(distance).map_err(|_| CodeGenError::JumpOutOfRange { distance })?;
        let slot = self
            .code
            .get_mut(label.0)
            .ok_or_else(|| CodeGenError::Internal {
                message: format!("jump label {} out of range", label.0),
            })?;
        *slot = Instruction::sized(slot.opcode, operand);
        Ok(())
    }

    /// Emit a backward jump to the instruction at `target`.
    pub fn emit_jump_back(&mut self, target: usize) -> Result<(), CodeGenError> {
        let distance = self.code.len() + 1 - target;
        let operand =
            u16::try_from(distance).map_err(|_| CodeGenError::JumpOutOfRange { distance })?;
        self.emit_operand(Opcode::JumpBack, operand);
        Ok(())
    }

    // ==========================================================================
    // Loops
    // ==========================================================================

    /// Open a loop whose head is the next instruction.
    pub fn enter_loop(&mut self, has_step: bool) -> usize {
        let head = self.code.len();
        self.jumps.enter_loop(head, has_step, self.scope_depth);
        head
    }

    /// Patch the pending continue jumps of the innermost loop to here.
    pub fn patch_continues(&mut self) -> Result<(), CodeGenError> {
        for label in self.jumps.take_continues() {
            self.patch_jump(label)?;
        }
        Ok(())
    }

    /// Close the innermost loop and patch its breaks to here.
    pub fn exit_loop(&mut self) -> Result<(), CodeGenError> {
        for label in self.jumps.exit_loop() {
            self.patch_jump(label)?;
        }
        Ok(())
    }

    pub fn emit_break(&mut self, line: u32) -> Result<(), CodeGenError> {
        let depth = self.loop_scope_depth("break", line)?;
        self.unwind_scopes_to(depth);
        let label = self.emit_jump(Opcode::Jump);
        self.jumps.add_break(label);
        Ok(())
    }

    pub fn emit_continue(&mut self, line: u32) -> Result<(), CodeGenError> {
        let depth = self.loop_scope_depth("continue", line)?;
        self.unwind_scopes_to(depth);
        match self.jumps.continue_target() {
            Some(ContinueTarget::Head(head)) => self.emit_jump_back(head),
            Some(ContinueTarget::Step) => {
                let label = self.emit_jump(Opcode::Jump);
                self.jumps.add_continue(label);
                Ok(())
            }
            None => Err(CodeGenError::UnhandledNode {
                kind: "continue",
                line,
            }),
        }
    }

    fn loop_scope_depth(&self, kind: &'static str, line: u32) -> Result<usize, CodeGenError> {
        self.jumps
            .scope_depth()
            .ok_or(CodeGenError::UnhandledNode { kind, line })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emitter(pool: &mut ConstantPool) -> BytecodeEmitter<'_> {
        BytecodeEmitter::new(pool, 1, true)
    }

    #[test]
    fn short_forward_jump_stays_narrow() {
        let mut pool = ConstantPool::new();
        let mut e = emitter(&mut pool);
        let label = e.emit_jump(Opcode::JumpIfFalse);
        for _ in 0..255 {
            e.emit(Opcode::Dup);
        }
        e.patch_jump(label).unwrap();
        let code = e.finish();
        assert_eq!(code[0], Instruction::new(Opcode::JumpIfFalse, 255));
        assert_eq!(code[0].jump_target(0), Some(code.len()));
    }

    #[test]
    fn long_forward_jump_is_extended() {
        let mut pool = ConstantPool::new();
        let mut e = emitter(&mut pool);
        let label = e.emit_jump(Opcode::JumpIfFalse);
        for _ in 0..300 {
            e.emit(Opcode::Dup);
        }
        e.patch_jump(label).unwrap();
        let code = e.finish();
        assert_eq!(code[0], Instruction::new(Opcode::JumpIfFalseExt, 300));
        assert_eq!(code[0].jump_target(0), Some(301));
    }

    #[test]
    fn backward_jump_lands_on_head() {
        let mut pool = ConstantPool::new();
        let mut e = emitter(&mut pool);
        e.emit(Opcode::Pop);
        let head = e.enter_loop(false);
        e.emit(Opcode::Dup);
        e.emit(Opcode::Pop);
        e.emit_jump_back(head).unwrap();
        e.exit_loop().unwrap();
        let code = e.finish();
        assert_eq!(code[3].jump_target(3), Some(head));
    }

    #[test]
    fn lines_advance_in_chunks() {
        let mut pool = ConstantPool::new();
        let mut e = emitter(&mut pool);
        e.set_line(1);
        assert!(e.is_empty());
        e.set_line(201);
        e.set_line(150);
        let code = e.finish();
        assert_eq!(code, vec![Instruction::line(127), Instruction::line(73)]);
    }

    #[test]
    fn break_unwinds_scopes() {
        let mut pool = ConstantPool::new();
        let mut e = emitter(&mut pool);
        e.enter_loop(false);
        e.enter_scope();
        e.enter_scope();
        e.emit_break(1).unwrap();
        e.exit_scope();
        e.exit_scope();
        e.exit_loop().unwrap();
        let ops: Vec<Opcode> = e.finish().iter().map(|i| i.opcode).collect();
        assert_eq!(
            ops,
            vec![
                Opcode::ScopePush,
                Opcode::ScopePush,
                Opcode::ScopePop,
                Opcode::ScopePop,
                Opcode::Jump,
                Opcode::ScopePop,
                Opcode::ScopePop,
            ]
        );
    }

    #[test]
    fn constants_are_shared() {
        let mut pool = ConstantPool::new();
        let mut e = emitter(&mut pool);
        e.emit_int(5).unwrap();
        e.emit_int(5).unwrap();
        e.emit_string("x").unwrap();
        let code = e.finish();
        assert_eq!(code[0], code[1]);
        assert_eq!(pool.ints(), &[5]);
    }

    #[test]
    fn break_outside_loop_is_fatal() {
        let mut pool = ConstantPool::new();
        let mut e = emitter(&mut pool);
        assert!(matches!(
            e.emit_break(4),
            Err(CodeGenError::UnhandledNode { line: 4, .. })
        ));
    }
}
