//! The interpreter loop.

use std::cell::RefCell;
use std::io::{self, BufRead, Write};
use std::rc::Rc;

use neco_compiler::bytecode::{Instruction, Opcode};
use neco_compiler::{BinaryFormatError, Program};
use neco_core::arith;
use neco_core::{RuntimeError, RuntimeErrorKind};

use super::builtins::{Rng, char_at, checked_index};
use super::frames::FrameStack;
use super::value::Value;

type Result<T> = std::result::Result<T, RuntimeErrorKind>;

/// Execution limits and seeding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmConfig {
    /// Maximum number of values on the operand stack.
    pub stack_capacity: usize,
    /// Maximum number of nested script calls.
    pub max_call_depth: usize,
    /// Makes `random`/`randomFloat` deterministic.
    pub seed: Option<u64>,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            stack_capacity: 1024,
            max_call_depth: 256,
            seed: None,
        }
    }
}

/// One instruction stream with the source line of every instruction.
#[derive(Debug)]
struct Stream {
    code: Vec<Instruction>,
    lines: Vec<u32>,
}

impl Stream {
    fn new(code: Vec<Instruction>, first_line: u32) -> Self {
        let mut line = first_line;
        let lines = code
            .iter()
            .map(|insn| {
                if insn.opcode == Opcode::LineOffset {
                    line += u32::from(insn.operand);
                }
                line
            })
            .collect();
        Self { code, lines }
    }
}

enum Flow {
    Continue,
    Exit(i64),
}

#[derive(Clone, Copy)]
enum Arith {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
}

pub struct Vm {
    strings: Vec<Rc<str>>,
    ints: Vec<i64>,
    floats: Vec<f64>,
    /// The globals stream, then one stream per function.
    streams: Vec<Stream>,
    stack: Vec<Value>,
    stack_capacity: usize,
    frames: FrameStack,
    ip: usize,
    /// Index of the instruction being executed, for fault lines.
    executing: usize,
    pub(super) rng: Rng,
    output: Box<dyn Write>,
    input: Box<dyn BufRead>,
}

impl Vm {
    /// Load a binary module.
    pub fn from_bytes(bytes: &[u8], config: VmConfig) -> std::result::Result<Self, BinaryFormatError> {
        Ok(Self::load(Program::from_bytes(bytes)?, config))
    }

    /// Run a program straight from the generator. Tombstones are compacted
    /// away first, the same way the binary writer does.
    pub fn from_program(program: &Program, config: VmConfig) -> Self {
        Self::load(program.compacted(), config)
    }

    fn load(program: Program, config: VmConfig) -> Self {
        let first_line = program.first_line;
        let mut streams = Vec::with_capacity(program.functions.len() + 1);
        streams.push(Stream::new(program.globals, first_line));
        streams.extend(
            program
                .functions
                .into_iter()
                .map(|code| Stream::new(code, first_line)),
        );
        let constants = program.constants;
        Self {
            strings: constants.strings().iter().map(|s| Rc::from(s.as_str())).collect(),
            ints: constants.ints().to_vec(),
            floats: constants.floats().to_vec(),
            streams,
            stack: Vec::with_capacity(config.stack_capacity.min(1024)),
            stack_capacity: config.stack_capacity,
            frames: FrameStack::new(config.max_call_depth),
            ip: 0,
            executing: 0,
            rng: Rng::new(config.seed),
            output: Box::new(io::stdout()),
            input: Box::new(io::stdin().lock()),
        }
    }

    /// Redirect built-in printing.
    pub fn with_output(mut self, output: impl Write + 'static) -> Self {
        self.output = Box::new(output);
        self
    }

    /// Source for `read()`.
    pub fn with_input(mut self, input: impl BufRead + 'static) -> Self {
        self.input = Box::new(input);
        self
    }

    /// Execute the globals stream.
    ///
    /// Returns the `exit` code, or 0 when the program runs off the end.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn run(&mut self) -> std::result::Result<i64, RuntimeError> {
        let outcome = loop {
            match self.step() {
                Ok(Flow::Continue) => {}
                Ok(Flow::Exit(code)) => break Ok(code),
                Err(kind) => break Err(kind),
            }
        };
        let flushed = self.output.flush().map_err(io_error);
        outcome
            .and_then(|code| flushed.map(|()| code))
            .map_err(|kind| RuntimeError::new(kind, self.current_line()))
    }

    /// Source line of the instruction that executed last.
    pub fn current_line(&self) -> u32 {
        let stream = &self.streams[self.frames.current().stream];
        stream
            .lines
            .get(self.executing)
            .or(stream.lines.last())
            .copied()
            .unwrap_or(0)
    }

    // =========================================================================
    // Stack
    // =========================================================================

    pub(super) fn push(&mut self, value: Value) -> Result<()> {
        if self.stack.len() >= self.stack_capacity {
            return Err(RuntimeErrorKind::StackOverflow);
        }
        self.stack.push(value);
        Ok(())
    }

    pub(super) fn pop(&mut self) -> Result<Value> {
        self.stack.pop().ok_or(RuntimeErrorKind::StackUnderflow)
    }

    fn peek(&self) -> Result<&Value> {
        self.stack.last().ok_or(RuntimeErrorKind::StackUnderflow)
    }

    pub(super) fn write_output(&mut self, text: &str) -> Result<()> {
        self.output.write_all(text.as_bytes()).map_err(io_error)
    }

    /// One line of input without its line terminator; empty at end of input.
    pub(super) fn read_line(&mut self) -> Result<String> {
        self.output.flush().map_err(io_error)?;
        let mut line = String::new();
        self.input.read_line(&mut line).map_err(io_error)?;
        let trimmed = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(trimmed);
        Ok(line)
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    fn step(&mut self) -> Result<Flow> {
        let stream = self.frames.current().stream;
        let Some(&insn) = self.streams[stream].code.get(self.ip) else {
            return if stream == 0 {
                Ok(Flow::Exit(0))
            } else {
                Err(RuntimeErrorKind::InvalidJump)
            };
        };
        self.executing = self.ip;
        self.ip += 1;
        let operand = insn.operand;

        match insn.opcode {
            Opcode::LineOffset | Opcode::Tombstone => {}

            // Jumps
            Opcode::Jump | Opcode::JumpExt => self.ip += usize::from(operand),
            Opcode::JumpIfFalse | Opcode::JumpIfFalseExt => {
                if !self.pop()?.as_bool()? {
                    self.ip += usize::from(operand);
                }
            }
            Opcode::JumpIfTrue | Opcode::JumpIfTrueExt => {
                if self.pop()?.as_bool()? {
                    self.ip += usize::from(operand);
                }
            }
            Opcode::JumpBack | Opcode::JumpBackExt => {
                self.ip = self
                    .ip
                    .checked_sub(usize::from(operand))
                    .ok_or(RuntimeErrorKind::InvalidJump)?;
            }

            // Constants
            Opcode::LoadConstString | Opcode::LoadConstStringExt => {
                let value = Value::Str(self.string(operand)?);
                self.push(value)?;
            }
            Opcode::LoadConstInt | Opcode::LoadConstIntExt => {
                let value = Value::Int(self.int(operand)?);
                self.push(value)?;
            }
            Opcode::LoadConstFloat | Opcode::LoadConstFloatExt => {
                let value = Value::Float(self.float(operand)?);
                self.push(value)?;
            }
            Opcode::InsertConstString | Opcode::InsertConstStringExt => {
                let value = Value::Str(self.string(operand)?);
                self.add_to_collection(value)?;
            }
            Opcode::InsertConstInt | Opcode::InsertConstIntExt => {
                let value = Value::Int(self.int(operand)?);
                self.add_to_collection(value)?;
            }
            Opcode::InsertConstFloat | Opcode::InsertConstFloatExt => {
                let value = Value::Float(self.float(operand)?);
                self.add_to_collection(value)?;
            }

            // Variables
            Opcode::LoadLocal => {
                let value = self.frames.current().load(operand)?;
                self.push(value)?;
            }
            Opcode::StoreLocal => {
                let value = self.pop()?;
                self.frames.current_mut().store(operand, value);
            }
            Opcode::LoadGlobal => {
                let value = self.frames.globals().load(operand)?;
                self.push(value)?;
            }
            Opcode::StoreGlobal => {
                let value = self.pop()?;
                self.frames.globals_mut().store(operand, value);
            }
            Opcode::DeclareLocal => {
                let value = self.read_default()?;
                self.frames.current_mut().store(operand, value);
            }
            Opcode::LoadRegister => {
                let value = self.frames.current().register(operand)?;
                self.push(value)?;
            }
            Opcode::StoreRegister => {
                let value = self.pop()?;
                self.frames.current_mut().set_register(operand, value)?;
            }

            // Structs
            Opcode::CreateStruct => {
                let count = usize::from(operand);
                let start = self
                    .stack
                    .len()
                    .checked_sub(count)
                    .ok_or(RuntimeErrorKind::StackUnderflow)?;
                let fields = self.stack.split_off(start);
                self.push(Value::Struct(Rc::new(RefCell::new(fields))))?;
            }
            Opcode::GetField => {
                let object = self.pop()?;
                let fields = object.as_struct()?.borrow();
                let index = usize::from(operand);
                let value = fields
                    .get(index)
                    .cloned()
                    .ok_or(RuntimeErrorKind::IndexOutOfBounds {
                        index: i64::from(operand),
                        len: fields.len(),
                    })?;
                drop(fields);
                self.push(value)?;
            }
            Opcode::SetField => {
                let object = self.pop()?;
                let value = self.pop()?;
                let mut fields = object.as_struct()?.borrow_mut();
                let len = fields.len();
                let field = fields
                    .get_mut(usize::from(operand))
                    .ok_or(RuntimeErrorKind::IndexOutOfBounds {
                        index: i64::from(operand),
                        len,
                    })?;
                *field = value;
            }

            // Calls
            Opcode::Call | Opcode::CallExt => self.call(operand)?,
            Opcode::CallBuiltin => self.call_builtin(operand)?,
            Opcode::Return => {
                let value = self.pop()?;
                let frame = self.frames.pop().ok_or(RuntimeErrorKind::InvalidJump)?;
                self.ip = frame.return_ip;
                self.push(value)?;
            }
            Opcode::Halt => return Ok(Flow::Exit(self.pop()?.as_int()?)),

            // Stack
            Opcode::Pop => {
                self.pop()?;
            }
            Opcode::Dup => {
                let value = self.peek()?.clone();
                self.push(value)?;
            }
            Opcode::PushNone => self.push(Value::None)?,
            Opcode::PushTrue => self.push(Value::Bool(true))?,
            Opcode::PushFalse => self.push(Value::Bool(false))?,

            // Operators
            Opcode::Add => self.arithmetic(Arith::Add)?,
            Opcode::Sub => self.arithmetic(Arith::Sub)?,
            Opcode::Mul => self.arithmetic(Arith::Mul)?,
            Opcode::Div => self.arithmetic(Arith::Div)?,
            Opcode::Mod => self.arithmetic(Arith::Mod)?,
            Opcode::Pow => self.arithmetic(Arith::Pow)?,
            Opcode::Neg => {
                let value = match self.pop()? {
                    Value::Int(v) => Value::Int(v.wrapping_neg()),
                    Value::Float(v) => Value::Float(-v),
                    other => {
                        return Err(RuntimeErrorKind::TypeMismatch {
                            expected: "number",
                            actual: other.type_name(),
                        });
                    }
                };
                self.push(value)?;
            }
            Opcode::Not => {
                let value = self.pop()?.as_bool()?;
                self.push(Value::Bool(!value))?;
            }
            Opcode::Equal | Opcode::NotEqual => {
                let right = self.pop()?;
                let left = self.pop()?;
                let equal = left.equals(&right);
                self.push(Value::Bool(equal == (insn.opcode == Opcode::Equal)))?;
            }
            Opcode::Less | Opcode::LessEqual | Opcode::Greater | Opcode::GreaterEqual => {
                let right = self.pop()?;
                let left = self.pop()?;
                let result = compare(insn.opcode, &left, &right)?;
                self.push(Value::Bool(result))?;
            }
            Opcode::In => {
                let container = self.pop()?;
                let item = self.pop()?;
                let found = container.contains(&item)?;
                self.push(Value::Bool(found))?;
            }

            // Collections
            Opcode::CreateList => self.push(Value::list(Vec::new()))?,
            Opcode::CreateSet => self.push(Value::empty_set())?,
            Opcode::Append | Opcode::Insert => {
                let value = self.pop()?;
                self.add_to_collection(value)?;
            }
            Opcode::GetIndex => {
                let index = self.pop()?.as_int()?;
                let target = self.pop()?;
                let value = match &target {
                    Value::Str(s) => char_at(s, index)?,
                    other => {
                        let items = other.as_list()?.borrow();
                        items[checked_index(index, items.len())?].clone()
                    }
                };
                self.push(value)?;
            }
            Opcode::SetIndex => {
                let index = self.pop()?.as_int()?;
                let target = self.pop()?;
                let value = self.pop()?;
                let mut items = target.as_list()?.borrow_mut();
                let at = checked_index(index, items.len())?;
                items[at] = value;
            }

            // Scopes
            Opcode::ScopePush => self.frames.current_mut().scope_push(),
            Opcode::ScopePop => self.frames.current_mut().scope_pop()?,

            // Type markers are consumed by DECLARE_LOCAL.
            Opcode::TypeBool
            | Opcode::TypeInt
            | Opcode::TypeFloat
            | Opcode::TypeString
            | Opcode::TypeAny
            | Opcode::TypeNone
            | Opcode::TypeList
            | Opcode::TypeSet => return Err(RuntimeErrorKind::InvalidJump),
        }
        Ok(Flow::Continue)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn string(&self, index: u16) -> Result<Rc<str>> {
        self.strings
            .get(usize::from(index))
            .cloned()
            .ok_or(RuntimeErrorKind::InvalidSlot { slot: index })
    }

    fn int(&self, index: u16) -> Result<i64> {
        self.ints
            .get(usize::from(index))
            .copied()
            .ok_or(RuntimeErrorKind::InvalidSlot { slot: index })
    }

    fn float(&self, index: u16) -> Result<f64> {
        self.floats
            .get(usize::from(index))
            .copied()
            .ok_or(RuntimeErrorKind::InvalidSlot { slot: index })
    }

    /// Add `value` to the list or set on top of the stack, leaving the
    /// collection in place.
    fn add_to_collection(&mut self, value: Value) -> Result<()> {
        match self.peek()? {
            Value::List(items) => items.borrow_mut().push(value),
            Value::Set(set) => {
                set.borrow_mut().insert(value.to_key()?);
            }
            other => {
                return Err(RuntimeErrorKind::TypeMismatch {
                    expected: "collection",
                    actual: other.type_name(),
                });
            }
        }
        Ok(())
    }

    /// Default value described by the type markers following a
    /// `DECLARE_LOCAL`; advances past them.
    fn read_default(&mut self) -> Result<Value> {
        let code = &self.streams[self.frames.current().stream].code;
        let marker = code
            .get(self.ip)
            .map(|insn| insn.opcode)
            .filter(|op| op.is_type_marker())
            .ok_or(RuntimeErrorKind::InvalidJump)?;
        // A composite marker's element markers only matter to the analyzer:
        // a fresh collection starts empty whatever its element type.
        let mut end = self.ip;
        while code.get(end).is_some_and(|insn| insn.opcode.is_composite_marker()) {
            end += 1;
        }
        if !code.get(end).is_some_and(|insn| insn.opcode.is_type_marker()) {
            return Err(RuntimeErrorKind::InvalidJump);
        }
        self.ip = end + 1;
        Ok(match marker {
            Opcode::TypeBool => Value::Bool(false),
            Opcode::TypeInt => Value::Int(0),
            Opcode::TypeFloat => Value::Float(0.0),
            Opcode::TypeString => Value::string(""),
            Opcode::TypeList => Value::list(Vec::new()),
            Opcode::TypeSet => Value::empty_set(),
            _ => Value::None,
        })
    }

    fn call(&mut self, function: u16) -> Result<()> {
        let stream = usize::from(function) + 1;
        if stream >= self.streams.len() {
            return Err(RuntimeErrorKind::UnknownFunction { index: function });
        }
        self.frames.push(stream, self.ip)?;
        self.ip = 0;
        Ok(())
    }

    fn arithmetic(&mut self, op: Arith) -> Result<()> {
        let right = self.pop()?;
        let left = self.pop()?;
        let result = match (&left, &right) {
            (Value::Int(a), Value::Int(b)) => {
                let (a, b) = (*a, *b);
                Value::Int(match op {
                    Arith::Add => a.wrapping_add(b),
                    Arith::Sub => a.wrapping_sub(b),
                    Arith::Mul => a.wrapping_mul(b),
                    Arith::Div => arith::int_div(a, b).ok_or(RuntimeErrorKind::DivisionByZero)?,
                    Arith::Mod => arith::int_rem(a, b).ok_or(RuntimeErrorKind::DivisionByZero)?,
                    Arith::Pow => arith::int_pow(a, b),
                })
            }
            (Value::Str(a), Value::Str(b)) if matches!(op, Arith::Add) => {
                let mut joined = String::with_capacity(a.len() + b.len());
                joined.push_str(a);
                joined.push_str(b);
                Value::string(joined)
            }
            _ => {
                let (a, b) = (left.as_float()?, right.as_float()?);
                Value::Float(match op {
                    Arith::Add => a + b,
                    Arith::Sub => a - b,
                    Arith::Mul => a * b,
                    Arith::Div | Arith::Mod if b == 0.0 => {
                        return Err(RuntimeErrorKind::DivisionByZero);
                    }
                    Arith::Div => a / b,
                    Arith::Mod => a % b,
                    Arith::Pow => a.powf(b),
                })
            }
        };
        self.push(result)
    }
}

fn compare(op: Opcode, left: &Value, right: &Value) -> Result<bool> {
    // NaN is unordered: every comparison with it is false.
    if let (Ok(a), Ok(b)) = (left.as_float(), right.as_float())
        && (a.is_nan() || b.is_nan())
    {
        return Ok(false);
    }
    let ordering = left.compare(right)?;
    Ok(match op {
        Opcode::Less => ordering.is_lt(),
        Opcode::LessEqual => ordering.is_le(),
        Opcode::Greater => ordering.is_gt(),
        _ => ordering.is_ge(),
    })
}

fn io_error(err: io::Error) -> RuntimeErrorKind {
    RuntimeErrorKind::Io {
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::io::{self, Write};
    use std::rc::Rc;

    use neco_compiler::bytecode::{Instruction, Opcode};
    use neco_compiler::{ConstantPool, Program};
    use neco_core::{Diagnostics, RuntimeErrorKind};

    use super::*;

    #[derive(Clone, Default)]
    struct Capture(Rc<RefCell<Vec<u8>>>);

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
        fn text(&self) -> String {
            String::from_utf8(self.0.borrow().clone()).unwrap()
        }
    }

    fn compile(source: &str) -> Program {
        let mut diagnostics = Diagnostics::new();
        let script = neco_parser::parse_source(source, &mut diagnostics).unwrap();
        assert!(!diagnostics.has_errors(), "{:?}", diagnostics);
        neco_compiler::generate(&script, true).unwrap()
    }

    fn run(source: &str) -> (std::result::Result<i64, RuntimeError>, String) {
        let out = Capture::default();
        let mut vm = Vm::from_program(&compile(source), VmConfig::default())
            .with_output(out.clone())
            .with_input(io::empty());
        let result = vm.run();
        (result, out.text())
    }

    fn output(source: &str) -> String {
        let (result, text) = run(source);
        assert_eq!(result, Ok(0));
        text
    }

    #[test]
    fn arithmetic_and_printing() {
        assert_eq!(output("int a = 7\nprintLine(a / 2)\nprintLine(a % 4)"), "3\n3\n");
        assert_eq!(output("int a = 1\nprintLine(a + 0.5)"), "1.5\n");
        assert_eq!(output("string s = \"ab\"\nprint(s + \"cd\")"), "abcd");
    }

    #[test]
    fn exit_code() {
        assert_eq!(run("int a = 3\nexit(a * 2)").0, Ok(6));
    }

    #[test]
    fn while_loop_counts() {
        let text = output("int i = 0\nwhile (i < 3) { print(i)\ni += 1 }");
        assert_eq!(text, "012");
    }

    #[test]
    fn for_loop_with_continue_and_break() {
        let text = output(
            "for (int i = 0; i < 10; i += 1) {\n  if (i == 1) { continue }\n  if (i == 4) { break }\n  print(i)\n}",
        );
        assert_eq!(text, "023");
    }

    #[test]
    fn functions_and_recursion() {
        let text = output(
            "fn fib(int n) -> int {\n  if (n < 2) { return n }\n  return fib(n - 1) + fib(n - 2)\n}\nprintLine(fib(15))",
        );
        assert_eq!(text, "610\n");
    }

    #[test]
    fn functions_read_and_write_globals() {
        let text = output("int total = 0\nfn bump(int by) { total += by }\nbump(2)\nbump(3)\nprintLine(total)");
        assert_eq!(text, "5\n");
    }

    #[test]
    fn structs_are_shared_references() {
        let text = output(
            "struct P { int x; int y }\nP a = P { x: 1, y: 2 }\nP b = a\nb.y = 9\nprintLine(a.y)",
        );
        assert_eq!(text, "9\n");
    }

    #[test]
    fn collections() {
        let text = output(
            "var xs = [1, 2, 3]\nxs[0] += 10\nappend(xs, 4)\nprintLine(xs)\nprintLine(len(xs))\nSet<int> s = {1, 1, 2}\nprintLine(len(s))\nprintLine(2 in s)",
        );
        assert_eq!(text, "[11, 2, 3, 4]\n4\n2\ntrue\n");
    }

    #[test]
    fn match_and_unwrap() {
        let text = output(
            "int a = 2\nint n = match (a) { 1 => 10, 2 => 20, default => 0 }\nprintLine(n)\nint? m = parseInt(\"x\")\nprintLine(m ?? 5)",
        );
        assert_eq!(text, "20\n5\n");
    }

    #[test]
    fn declared_defaults() {
        let text = output("List<int> xs\nint a\na = 4\nprintLine(a)");
        assert_eq!(text, "4\n");

        // DECLARE_LOCAL 0 List<Set<int>>; exit(len(slot 0))
        let program = Program {
            globals: vec![
                Instruction::new(Opcode::DeclareLocal, 0),
                Instruction::bare(Opcode::TypeList),
                Instruction::bare(Opcode::TypeSet),
                Instruction::bare(Opcode::TypeInt),
                Instruction::new(Opcode::LoadLocal, 0),
                Instruction::new(Opcode::CallBuiltin, 12),
                Instruction::bare(Opcode::Halt),
            ],
            ..Program::default()
        };
        assert_eq!(Vm::from_program(&program, VmConfig::default()).run(), Ok(0));
    }

    #[test]
    fn declare_without_markers_is_malformed() {
        let program = Program {
            globals: vec![
                Instruction::new(Opcode::DeclareLocal, 0),
                Instruction::bare(Opcode::PushNone),
            ],
            ..Program::default()
        };
        let err = Vm::from_program(&program, VmConfig::default()).run().unwrap_err();
        assert_eq!(err.kind, RuntimeErrorKind::InvalidJump);
    }

    #[test]
    fn division_by_zero_reports_the_line() {
        let (result, _) = run("int a = 0\n\nint b = 1 / a");
        assert_eq!(
            result,
            Err(RuntimeError::new(RuntimeErrorKind::DivisionByZero, 3))
        );
    }

    #[test]
    fn index_out_of_bounds() {
        let (result, _) = run("var xs = [1]\nprintLine(xs[3])");
        assert!(matches!(
            result,
            Err(RuntimeError {
                kind: RuntimeErrorKind::IndexOutOfBounds { index: 3, len: 1 },
                line: 2
            })
        ));
    }

    #[test]
    fn runaway_recursion_is_bounded() {
        let (result, _) = run("fn f(int n) -> int { return f(n + 1) }\nf(0)");
        assert_eq!(result.unwrap_err().kind, RuntimeErrorKind::CallDepthExceeded);
    }

    #[test]
    fn stack_capacity_is_enforced() {
        let mut program = Program::default();
        program.globals = vec![Instruction::bare(Opcode::PushNone); 4];
        let config = VmConfig {
            stack_capacity: 3,
            ..VmConfig::default()
        };
        let mut vm = Vm::from_program(&program, config);
        assert_eq!(vm.run().unwrap_err().kind, RuntimeErrorKind::StackOverflow);
    }

    #[test]
    fn tombstones_do_not_disturb_jumps() {
        // JUMP_IF_FALSE over a tombstone lands on LOAD_CONST_INT 0; HALT.
        let mut constants = ConstantPool::new();
        constants.intern_int(1).unwrap();
        let program = Program {
            constants,
            first_line: 1,
            globals: vec![
                Instruction::bare(Opcode::PushFalse),
                Instruction::new(Opcode::JumpIfFalse, 2),
                Instruction::bare(Opcode::Tombstone),
                Instruction::bare(Opcode::Halt),
                Instruction::new(Opcode::LoadConstInt, 0),
                Instruction::bare(Opcode::Halt),
            ],
            functions: Vec::new(),
        };
        let mut vm = Vm::from_program(&program, VmConfig::default());
        assert_eq!(vm.run(), Ok(1));
    }

    #[test]
    fn read_strips_the_newline() {
        let program = compile("string line = read()\nprint(toUpper(line))");
        let out = Capture::default();
        let mut vm = Vm::from_program(&program, VmConfig::default())
            .with_output(out.clone())
            .with_input(io::Cursor::new(b"shout\r\nrest".to_vec()));
        assert_eq!(vm.run(), Ok(0));
        assert_eq!(out.text(), "SHOUT");
    }

    #[test]
    fn seeded_random_is_repeatable() {
        let program = compile("printLine(random(1, 100))\nprintLine(randomFloat())");
        let run_seeded = || {
            let out = Capture::default();
            let config = VmConfig {
                seed: Some(99),
                ..VmConfig::default()
            };
            let mut vm = Vm::from_program(&program, config).with_output(out.clone());
            vm.run().unwrap();
            out.text()
        };
        assert_eq!(run_seeded(), run_seeded());
    }
}
