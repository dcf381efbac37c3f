//! The NeCo virtual machine.
//!
//! A stack machine over the instruction streams of a [`Program`]:
//! - an operand stack of bounded capacity
//! - a call stack of frames, each with a slot table, scope marks and two
//!   scratch registers
//! - the built-in function table
//!
//! [`Program`]: neco_compiler::Program

mod builtins;
mod frames;
mod value;
#[allow(clippy::module_inception)]
mod vm;

pub use builtins::Rng;
pub use value::{SetKey, Value};
pub use vm::{Vm, VmConfig};
