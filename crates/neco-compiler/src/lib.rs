//! NeCo code generator.
//!
//! Lowers an analyzed [`Script`](neco_parser::ast::Script) into flat
//! instruction streams sharing one constant pool, and reads and writes the
//! binary module format.
//!
//! ## Modules
//!
//! - [`bytecode`]: opcodes, instructions and constant pools
//! - [`emit`]: instruction buffer with jump backpatching and loop tracking
//! - [`expr`]: expression lowering
//! - [`stmt`]: statement lowering
//! - [`optimizer`]: peephole pass
//! - [`codec`]: binary module reader and writer
//! - [`printer`]: disassembler
//!
//! ## Example
//!
//! ```
//! use neco_core::Diagnostics;
//! use neco_parser::parse_source;
//!
//! let mut diagnostics = Diagnostics::new();
//! let script = parse_source("int a = 2 + 3 * 4", &mut diagnostics).unwrap();
//! let program = neco_compiler::generate(&script, true).unwrap();
//! assert_eq!(program.constants.ints(), &[14]);
//!
//! let bytes = program.to_bytes().unwrap();
//! assert_eq!(neco_compiler::Program::from_bytes(&bytes).unwrap(), program.compacted());
//! ```

pub mod bytecode;
pub mod codec;
pub mod emit;
pub mod expr;
mod function_compiler;
pub mod optimizer;
pub mod printer;
pub mod stmt;

pub use bytecode::{ConstantPool, Instruction, Opcode};
pub use emit::{BytecodeEmitter, JumpLabel};
pub use expr::ExprCompiler;
pub use function_compiler::{FunctionCompiler, generate};
pub use printer::disassemble;
pub use stmt::StmtCompiler;

pub use neco_core::{BinaryFormatError, CodeGenError};

/// A generated program: the globals stream, one stream per function (in
/// declaration order, indexed by `CALL`), and the shared constant pool.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    pub constants: ConstantPool,
    /// Source line the line offsets of every stream count from.
    pub first_line: u32,
    pub globals: Vec<Instruction>,
    pub functions: Vec<Vec<Instruction>>,
}

impl Program {
    pub fn to_bytes(&self) -> Result<Vec<u8>, BinaryFormatError> {
        codec::encode(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, BinaryFormatError> {
        codec::decode(bytes)
    }

    /// The same program with tombstones removed and jumps renumbered.
    pub fn compacted(&self) -> Program {
        Program {
            constants: self.constants.clone(),
            first_line: self.first_line,
            globals: codec::compact(&self.globals),
            functions: self.functions.iter().map(|f| codec::compact(f)).collect(),
        }
    }

    pub fn is_compact(&self) -> bool {
        codec::is_compact(&self.globals) && self.functions.iter().all(|f| codec::is_compact(f))
    }
}
