//! Compilation unit API.
//!
//! A [`Unit`] takes one source file through analysis and code generation,
//! keeps the diagnostics, and hands out the resulting [`Program`] or its
//! binary module.
//!
//! # Example
//!
//! ```
//! use neco::{CompileOptions, Unit, Vm, VmConfig};
//!
//! let mut unit = Unit::new(CompileOptions::default());
//! unit.add_source("main.neco", "int a = 2 + 3 * 4\nexit(a)").unwrap();
//! let program = unit.build().unwrap();
//!
//! let code = Vm::from_program(program, VmConfig::default()).run().unwrap();
//! assert_eq!(code, 14);
//! ```

use std::fmt::Write as _;
use std::path::Path;

use neco_compiler::Program;
use neco_core::{BinaryFormatError, CodeGenError, DEFAULT_ERROR_LIMIT, Diagnostics, TooManyErrors};
use neco_parser::parse_source;

/// Knobs for one compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileOptions {
    /// Literal fusion, set literal deduplication and the peephole pass.
    pub optimize: bool,
    /// Cumulative error count past which analysis stops.
    pub error_limit: usize,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            optimize: true,
            error_limit: DEFAULT_ERROR_LIMIT,
        }
    }
}

/// A compilation unit.
///
/// 1. Create a unit with [`Unit::new`]
/// 2. Add the source with [`Unit::add_source`]
/// 3. Build with [`Unit::build`]
/// 4. Run the program or serialize it with [`Unit::to_bytes`] / [`Unit::write`]
pub struct Unit {
    options: CompileOptions,
    source: Option<(String, String)>,
    diagnostics: Diagnostics,
    program: Option<Program>,
}

impl Default for Unit {
    fn default() -> Self {
        Self::new(CompileOptions::default())
    }
}

impl Unit {
    pub fn new(options: CompileOptions) -> Self {
        Self {
            options,
            source: None,
            diagnostics: Diagnostics::with_limit(options.error_limit),
            program: None,
        }
    }

    pub fn options(&self) -> CompileOptions {
        self.options
    }

    /// Add the source file to compile.
    ///
    /// # Errors
    ///
    /// A unit compiles exactly one source and cannot take new input once
    /// built.
    pub fn add_source(
        &mut self,
        name: impl Into<String>,
        source: impl Into<String>,
    ) -> Result<(), UnitError> {
        if self.program.is_some() {
            return Err(UnitError::AlreadyBuilt);
        }
        if let Some((existing, _)) = &self.source {
            return Err(UnitError::SourceAlreadyAdded(existing.clone()));
        }
        self.source = Some((name.into(), source.into()));
        Ok(())
    }

    /// Analyze and generate code.
    ///
    /// Diagnostics stay available through [`Unit::diagnostics`] whether the
    /// build succeeds or not.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn build(&mut self) -> Result<&Program, BuildError> {
        if self.program.is_some() {
            return Err(BuildError::AlreadyBuilt);
        }
        let Some((_, source)) = &self.source else {
            return Err(BuildError::NoSources);
        };

        self.diagnostics = Diagnostics::with_limit(self.options.error_limit);
        let script = parse_source(source, &mut self.diagnostics)?;
        if self.diagnostics.has_errors() {
            return Err(BuildError::Diagnostics {
                errors: self.diagnostics.error_count(),
            });
        }

        let program = neco_compiler::generate(&script, self.options.optimize)?;
        Ok(self.program.insert(program))
    }

    pub fn is_built(&self) -> bool {
        self.program.is_some()
    }

    /// The generated program (available after a successful build).
    pub fn program(&self) -> Option<&Program> {
        self.program.as_ref()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Diagnostics one per line, prefixed with the source name.
    pub fn render_diagnostics(&self) -> String {
        let name = self.source.as_ref().map_or("<unit>", |(name, _)| name.as_str());
        let mut out = String::new();
        for diagnostic in self.diagnostics.iter() {
            let _ = writeln!(out, "{name}:{diagnostic}");
        }
        out
    }

    /// Serialize the built program.
    pub fn to_bytes(&self) -> Result<Vec<u8>, BuildError> {
        let program = self.program.as_ref().ok_or(BuildError::NotBuilt)?;
        Ok(program.to_bytes()?)
    }

    /// Serialize the built program to `path`.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<(), BuildError> {
        let bytes = self.to_bytes()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Disassembly of the built program.
    pub fn disassemble(&self) -> Option<String> {
        self.program.as_ref().map(neco_compiler::disassemble)
    }

    /// Reset to an empty unit with the same options.
    pub fn clear(&mut self) {
        *self = Self::new(self.options);
    }
}

/// Errors that can occur when adding sources.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnitError {
    #[error("unit has already been built; clear() it to start over")]
    AlreadyBuilt,

    /// Only one source file per unit; multi-module linking is not supported.
    #[error("unit already holds source '{0}'")]
    SourceAlreadyAdded(String),
}

/// Errors that can occur while building or serializing a unit.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("no source added to unit")]
    NoSources,

    #[error("unit has already been built")]
    AlreadyBuilt,

    #[error("unit has not been built")]
    NotBuilt,

    /// Analysis reported errors; see [`Unit::diagnostics`].
    #[error("compilation failed with {errors} error(s)")]
    Diagnostics { errors: usize },

    #[error(transparent)]
    TooManyErrors(#[from] TooManyErrors),

    #[error(transparent)]
    CodeGen(#[from] CodeGenError),

    #[error(transparent)]
    Binary(#[from] BinaryFormatError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
