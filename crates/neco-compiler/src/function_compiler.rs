//! Whole-program generation.
//!
//! The top-level statements become the globals stream; each function body
//! becomes its own stream. All streams share one constant pool.
//!
//! A function stream starts with a prologue storing the arguments into
//! their parameter slots (the last argument is on top of the stack, so the
//! stores run in reverse) and ends with an implicit `return none`.

use neco_core::CodeGenError;
use neco_parser::ast::{Function, Script};

use crate::Program;
use crate::bytecode::{ConstantPool, Instruction, Opcode};
use crate::emit::BytecodeEmitter;
use crate::optimizer;
use crate::stmt::StmtCompiler;

type Result<T> = std::result::Result<T, CodeGenError>;

/// The module metadata stores the first line in one byte. Later starts
/// count from here and reach the real line through leading line offsets.
const MAX_FIRST_LINE: u32 = 0xFF;

/// Lower an analyzed script. `optimize` enables literal fusion, set
/// deduplication and the peephole pass.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn generate(script: &Script, optimize: bool) -> Result<Program> {
    if script.functions.len() > usize::from(u16::MAX) + 1 {
        return Err(CodeGenError::TooManyFunctions);
    }
    let mut constants = ConstantPool::with_capacity(script.constants.distinct());
    let first_line = script.first_line.min(MAX_FIRST_LINE);

    let mut globals = {
        let mut emitter = BytecodeEmitter::new(&mut constants, first_line, optimize);
        let mut compiler = StmtCompiler::new(&mut emitter);
        for stmt in &script.body {
            compiler.compile(stmt)?;
        }
        emitter.finish()
    };

    let mut functions = Vec::with_capacity(script.functions.len());
    for function in &script.functions {
        let compiler = FunctionCompiler::new(&mut constants, first_line, optimize);
        functions.push(compiler.compile(function)?);
    }

    if optimize {
        optimizer::optimize(&mut globals);
        for code in &mut functions {
            optimizer::optimize(code);
        }
    }

    Ok(Program {
        constants,
        first_line,
        globals,
        functions,
    })
}

/// Compiles a single function body.
pub struct FunctionCompiler<'pool> {
    emitter: BytecodeEmitter<'pool>,
}

impl<'pool> FunctionCompiler<'pool> {
    pub fn new(constants: &'pool mut ConstantPool, first_line: u32, optimize: bool) -> Self {
        Self {
            emitter: BytecodeEmitter::new(constants, first_line, optimize),
        }
    }

    pub fn compile(mut self, function: &Function) -> Result<Vec<Instruction>> {
        self.emitter.set_line(function.span.line);
        let params = u8::try_from(function.params.len()).map_err(|_| CodeGenError::Internal {
            message: format!("function '{}' has too many parameters", function.name),
        })?;
        for slot in (0..params).rev() {
            self.emitter.emit_byte(Opcode::StoreLocal, slot);
        }

        StmtCompiler::new(&mut self.emitter).compile_block(&function.body)?;

        self.emitter.emit(Opcode::PushNone);
        self.emitter.emit(Opcode::Return);
        Ok(self.emitter.finish())
    }
}

#[cfg(test)]
mod tests {
    use crate::bytecode::{Instruction, Opcode};
    use crate::stmt::test_support::{compile, compile_globals, ops};

    #[test]
    fn folded_arithmetic_is_one_load() {
        let program = compile("int a = 2 + 3 * 4", true);
        assert_eq!(
            program.globals,
            vec![
                Instruction::new(Opcode::LoadConstInt, 0),
                Instruction::new(Opcode::StoreLocal, 0),
            ]
        );
        assert_eq!(program.constants.ints(), &[14]);
        assert!(program.constants.strings().is_empty());
    }

    #[test]
    fn prologue_stores_params_in_reverse() {
        let program = compile("fn add(int a, int b) -> int { return a + b }", true);
        let code = &program.functions[0];
        let ops = ops(code);
        assert_eq!(
            ops,
            vec![
                Opcode::StoreLocal,
                Opcode::StoreLocal,
                Opcode::LoadLocal,
                Opcode::LoadLocal,
                Opcode::Add,
                Opcode::Return,
                Opcode::PushNone,
                Opcode::Return,
            ]
        );
        let stores: Vec<u16> = code
            .iter()
            .filter(|i| i.opcode == Opcode::StoreLocal)
            .map(|i| i.operand)
            .collect();
        assert_eq!(stores, vec![1, 0]);
    }

    #[test]
    fn function_streams_count_lines_from_the_first_line() {
        let source = "int a = 1\n\nfn f() {\n  printLine(a)\n}";
        let program = compile(source, false);
        let code = &program.functions[0];
        assert_eq!(code[0], Instruction::line(2));
        assert_eq!(code[1], Instruction::line(1));

        // Optimized, the adjacent offsets merge.
        let program = compile(source, true);
        assert_eq!(program.functions[0][0], Instruction::line(3));
    }

    #[test]
    fn late_first_line_is_carried_by_line_offsets() {
        let source = format!("{}int a = 1", "\n".repeat(299));
        let program = compile(&source, false);
        assert_eq!(program.first_line, 255);
        assert_eq!(program.globals[0], Instruction::line(45));
        assert_eq!(program.globals[1].opcode, Opcode::LoadConstInt);
    }

    #[test]
    fn calls_push_args_left_to_right() {
        let code = compile_globals(
            "fn pair(int a, string b) { }\npair(7, \"x\")",
            true,
        );
        let ops = ops(&code);
        assert_eq!(
            ops,
            vec![
                Opcode::LoadConstInt,
                Opcode::LoadConstString,
                Opcode::Call,
                Opcode::Pop,
            ]
        );
    }

    #[test]
    fn constants_are_shared_between_streams() {
        let program = compile("printLine(\"hi\")\nfn f() { printLine(\"hi\") }", true);
        assert_eq!(program.constants.strings(), &["hi".to_string()]);
    }
}
