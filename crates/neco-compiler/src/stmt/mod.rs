//! Statement compiler.
//!
//! The [`StmtCompiler`] lowers statements of one instruction stream:
//! - blocks, with a runtime scope when they declare variables
//! - variable declarations and assignments
//! - if chains, loops and `match`
//! - `break`/`continue`/`return`/`exit`
//!
//! Every statement starts by advancing the stream's line counter, so the
//! VM can attribute faults to a source line.

mod assignment;
mod if_stmt;
mod loop_stmt;
mod match_stmt;
mod var_decl;

use neco_core::CodeGenError;
use neco_parser::ast::{Block, Stmt, StmtKind};

use crate::bytecode::Opcode;
use crate::emit::BytecodeEmitter;
use crate::expr::ExprCompiler;

pub use var_decl::type_markers;

type Result<T> = std::result::Result<T, CodeGenError>;

pub struct StmtCompiler<'a, 'pool> {
    emitter: &'a mut BytecodeEmitter<'pool>,
}

impl<'a, 'pool> StmtCompiler<'a, 'pool> {
    pub fn new(emitter: &'a mut BytecodeEmitter<'pool>) -> Self {
        Self { emitter }
    }

    fn expr(&mut self) -> ExprCompiler<'_, 'pool> {
        ExprCompiler::new(&mut *self.emitter)
    }

    pub fn compile(&mut self, stmt: &Stmt) -> Result<()> {
        self.emitter.set_line(stmt.span.line);
        let line = stmt.span.line;
        match &stmt.kind {
            StmtKind::Expr(expr) => {
                self.expr().compile(expr)?;
                self.emitter.emit(Opcode::Pop);
                Ok(())
            }
            StmtKind::VarDecl { slot, ty, init, .. } => {
                self.compile_var_decl(*slot, ty, init.as_ref(), line)
            }
            StmtKind::Assign { place, value } => self.compile_assign(place, value),
            StmtKind::Block(block) => self.compile_block(block),
            StmtKind::If {
                branches,
                otherwise,
            } => self.compile_if(branches, otherwise.as_ref()),
            StmtKind::Loop { body, step } => self.compile_loop(body, step.as_deref()),
            StmtKind::Break => self.emitter.emit_break(line),
            StmtKind::Continue => self.emitter.emit_continue(line),
            StmtKind::Return(value) => {
                self.expr().compile(value)?;
                self.emitter.emit(Opcode::Return);
                Ok(())
            }
            StmtKind::Match {
                scrutinee,
                arms,
                default,
            } => self.compile_match(scrutinee, arms, default.as_ref()),
            StmtKind::Exit(code) => {
                self.expr().compile(code)?;
                self.emitter.emit(Opcode::Halt);
                Ok(())
            }
        }
    }

    pub fn compile_block(&mut self, block: &Block) -> Result<()> {
        if block.scoped {
            self.emitter.enter_scope();
        }
        for stmt in &block.stmts {
            self.compile(stmt)?;
        }
        if block.scoped {
            self.emitter.exit_scope();
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use neco_core::Diagnostics;
    use neco_parser::parse_source;

    use crate::Program;
    use crate::bytecode::{Instruction, Opcode};

    /// Compile `source` and return the globals stream.
    pub fn compile_globals(source: &str, optimize: bool) -> Vec<Instruction> {
        compile(source, optimize).globals
    }

    pub fn compile(source: &str, optimize: bool) -> Program {
        let mut diagnostics = Diagnostics::new();
        let script = parse_source(source, &mut diagnostics).unwrap();
        assert!(
            !diagnostics.has_errors(),
            "{:?}",
            diagnostics.iter().map(ToString::to_string).collect::<Vec<_>>()
        );
        crate::generate(&script, optimize).unwrap()
    }

    /// Opcodes of a stream without line offsets and tombstones.
    pub fn ops(code: &[Instruction]) -> Vec<Opcode> {
        code.iter()
            .map(|i| i.opcode)
            .filter(|op| !matches!(op, Opcode::LineOffset | Opcode::Tombstone))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{compile_globals, ops};
    use crate::bytecode::Opcode;

    #[test]
    fn expression_statements_discard_their_value() {
        let code = compile_globals("printLine(1)", true);
        assert_eq!(
            ops(&code),
            vec![Opcode::LoadConstInt, Opcode::CallBuiltin, Opcode::Pop]
        );
    }

    #[test]
    fn scoped_blocks_push_and_pop() {
        let code = compile_globals("{ int a = 1 }\n{ printLine(2) }", true);
        assert_eq!(
            ops(&code),
            vec![
                Opcode::ScopePush,
                Opcode::LoadConstInt,
                Opcode::StoreLocal,
                Opcode::ScopePop,
                Opcode::LoadConstInt,
                Opcode::CallBuiltin,
                Opcode::Pop,
            ]
        );
    }

    #[test]
    fn statements_on_later_lines_advance_the_line() {
        let code = compile_globals("int a = 1\n\n\nint b = 2", true);
        assert_eq!(code[2].opcode, Opcode::LineOffset);
        assert_eq!(code[2].operand, 3);
    }

    #[test]
    fn exit_halts_with_code() {
        let code = compile_globals("exit(3)", true);
        assert_eq!(ops(&code), vec![Opcode::LoadConstInt, Opcode::Halt]);
    }
}
