//! NeCo: a statically typed scripting language compiled to a compact
//! bytecode and run on a stack machine.
//!
//! ```text
//! source -> neco_parser (tokenize, analyze) -> neco_compiler (generate,
//! optimize) -> binary module -> Vm
//! ```
//!
//! # Example
//!
//! ```
//! use neco::{CompileOptions, Vm, VmConfig};
//!
//! let code = neco::run_source("exit(40 + 2)", CompileOptions::default()).unwrap();
//! assert_eq!(code, 42);
//!
//! // The same program through the binary format.
//! let mut unit = neco::Unit::default();
//! unit.add_source("main.neco", "exit(40 + 2)").unwrap();
//! unit.build().unwrap();
//! let bytes = unit.to_bytes().unwrap();
//! let mut vm = Vm::from_bytes(&bytes, VmConfig::default()).unwrap();
//! assert_eq!(vm.run().unwrap(), 42);
//! ```

mod unit;
pub mod vm;

pub use unit::{BuildError, CompileOptions, Unit, UnitError};
pub use vm::{Value, Vm, VmConfig};

pub use neco_compiler::{Program, disassemble};
pub use neco_core::{
    BinaryFormatError, CodeGenError, DataType, Diagnostic, Diagnostics, RuntimeError,
    RuntimeErrorKind, Span,
};

/// Any failure along the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum NecoError {
    #[error(transparent)]
    Unit(#[from] UnitError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Binary(#[from] BinaryFormatError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl NecoError {
    pub fn is_runtime(&self) -> bool {
        matches!(self, NecoError::Runtime(_))
    }
}

/// Compile `source` and run it against stdout/stdin. Returns the exit code.
pub fn run_source(source: &str, options: CompileOptions) -> Result<i64, NecoError> {
    let mut unit = Unit::new(options);
    unit.add_source("<source>", source)?;
    let program = unit.build()?;
    Ok(Vm::from_program(program, VmConfig::default()).run()?)
}
