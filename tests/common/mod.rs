//! Test harness for end-to-end NeCo script tests.
//!
//! Loads scripts from `test_scripts/`, builds them through [`Unit`] and runs
//! the result on a [`Vm`] whose output is captured in memory.

#![allow(dead_code)]

use neco::{CompileOptions, Program, RuntimeError, Unit, Vm, VmConfig};
use std::cell::RefCell;
use std::fs;
use std::io::{self, Cursor, Write};
use std::path::PathBuf;
use std::rc::Rc;

/// A `Write` sink shared between the VM and the test.
#[derive(Clone, Default)]
pub struct Capture(Rc<RefCell<Vec<u8>>>);

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Capture {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

/// Exit status and captured output of one run.
#[derive(Debug, PartialEq)]
pub struct Outcome {
    pub result: Result<i64, RuntimeError>,
    pub output: String,
}

pub struct TestHarness {
    test_scripts_dir: PathBuf,
}

impl TestHarness {
    pub fn new() -> Self {
        let test_scripts_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_scripts");
        Self { test_scripts_dir }
    }

    pub fn load(&self, filename: &str) -> String {
        let path = self.test_scripts_dir.join(filename);
        fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("Failed to read {}: {}", path.display(), e))
    }

    /// Build a script file, panicking with rendered diagnostics on failure.
    pub fn build_file(&self, filename: &str, options: CompileOptions) -> Program {
        build(filename, &self.load(filename), options)
    }
}

pub fn build(name: &str, source: &str, options: CompileOptions) -> Program {
    let mut unit = Unit::new(options);
    unit.add_source(name, source).unwrap();
    if let Err(err) = unit.build() {
        panic!("{name} failed to build: {err}\n{}", unit.render_diagnostics());
    }
    unit.program().cloned().unwrap()
}

pub fn run_program(program: &Program, input: &str) -> Outcome {
    let capture = Capture::default();
    let config = VmConfig {
        seed: Some(7),
        ..VmConfig::default()
    };
    let mut vm = Vm::from_program(program, config)
        .with_output(capture.clone())
        .with_input(Cursor::new(input.to_string()));
    let result = vm.run();
    Outcome {
        result,
        output: capture.text(),
    }
}

/// Run the program as built and again after a trip through the binary
/// format; both runs must agree.
pub fn run_both_ways(program: &Program) -> Outcome {
    let direct = run_program(program, "");
    let bytes = program.to_bytes().unwrap();
    let capture = Capture::default();
    let config = VmConfig {
        seed: Some(7),
        ..VmConfig::default()
    };
    let mut vm = Vm::from_bytes(&bytes, config)
        .unwrap()
        .with_output(capture.clone());
    let loaded = Outcome {
        result: vm.run(),
        output: capture.text(),
    };
    assert_eq!(direct, loaded, "binary round trip changed behavior");
    direct
}
