//! Call frames and their slot tables.
//!
//! Each frame owns one flat slot table. A block scope does not get its own
//! table: `SCOPE_PUSH` records the table length and `SCOPE_POP` truncates
//! back to it, which matches how the analyzer numbers block slots after the
//! enclosing scope's. Frame 0 holds the globals.

use neco_core::RuntimeErrorKind;

use super::value::Value;

type Result<T> = std::result::Result<T, RuntimeErrorKind>;

/// Number of scratch registers per frame.
pub const REGISTER_COUNT: usize = 2;

#[derive(Debug)]
pub struct Frame {
    /// 0 for the globals stream, `n + 1` for function `n`.
    pub stream: usize,
    /// Where the caller resumes.
    pub return_ip: usize,
    slots: Vec<Value>,
    marks: Vec<usize>,
    registers: [Value; REGISTER_COUNT],
}

impl Frame {
    fn new(stream: usize, return_ip: usize) -> Self {
        Self {
            stream,
            return_ip,
            slots: Vec::new(),
            marks: Vec::new(),
            registers: Default::default(),
        }
    }

    pub fn load(&self, slot: u16) -> Result<Value> {
        self.slots
            .get(usize::from(slot))
            .cloned()
            .ok_or(RuntimeErrorKind::InvalidSlot { slot })
    }

    /// Store into `slot`, growing the table with `none` as needed.
    pub fn store(&mut self, slot: u16, value: Value) {
        let index = usize::from(slot);
        if index >= self.slots.len() {
            self.slots.resize(index + 1, Value::None);
        }
        self.slots[index] = value;
    }

    pub fn scope_push(&mut self) {
        self.marks.push(self.slots.len());
    }

    pub fn scope_pop(&mut self) -> Result<()> {
        let mark = self.marks.pop().ok_or(RuntimeErrorKind::StackUnderflow)?;
        self.slots.truncate(mark);
        Ok(())
    }

    pub fn register(&self, index: u16) -> Result<Value> {
        self.registers
            .get(usize::from(index))
            .cloned()
            .ok_or(RuntimeErrorKind::InvalidSlot { slot: index })
    }

    pub fn set_register(&mut self, index: u16, value: Value) -> Result<()> {
        let register = self
            .registers
            .get_mut(usize::from(index))
            .ok_or(RuntimeErrorKind::InvalidSlot { slot: index })?;
        *register = value;
        Ok(())
    }
}

/// The call stack. Never empty: the globals frame stays at the bottom.
#[derive(Debug)]
pub struct FrameStack {
    frames: Vec<Frame>,
    max_depth: usize,
}

impl FrameStack {
    pub fn new(max_depth: usize) -> Self {
        Self {
            frames: vec![Frame::new(0, 0)],
            max_depth,
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len() - 1
    }

    pub fn current(&self) -> &Frame {
        &self.frames[self.frames.len() - 1]
    }

    pub fn current_mut(&mut self) -> &mut Frame {
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    pub fn globals(&self) -> &Frame {
        &self.frames[0]
    }

    pub fn globals_mut(&mut self) -> &mut Frame {
        &mut self.frames[0]
    }

    pub fn push(&mut self, stream: usize, return_ip: usize) -> Result<()> {
        if self.depth() >= self.max_depth {
            return Err(RuntimeErrorKind::CallDepthExceeded);
        }
        self.frames.push(Frame::new(stream, return_ip));
        Ok(())
    }

    /// Pop a function frame. `None` in the globals frame.
    pub fn pop(&mut self) -> Option<Frame> {
        if self.frames.len() > 1 {
            self.frames.pop()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_scopes_release_their_slots() {
        let mut frame = Frame::new(0, 0);
        frame.store(0, Value::Int(1));
        frame.scope_push();
        frame.store(1, Value::Int(2));
        assert!(frame.load(1).is_ok());
        frame.scope_pop().unwrap();
        assert_eq!(
            frame.load(1).unwrap_err(),
            RuntimeErrorKind::InvalidSlot { slot: 1 }
        );
        assert!(frame.load(0).is_ok());
    }

    #[test]
    fn store_grows_the_table() {
        let mut frame = Frame::new(0, 0);
        frame.store(3, Value::Int(7));
        assert!(matches!(frame.load(0), Ok(Value::None)));
        assert!(matches!(frame.load(3), Ok(Value::Int(7))));
    }

    #[test]
    fn call_depth_is_bounded() {
        let mut frames = FrameStack::new(2);
        frames.push(1, 0).unwrap();
        frames.push(1, 0).unwrap();
        assert_eq!(frames.push(1, 0), Err(RuntimeErrorKind::CallDepthExceeded));
        assert!(frames.pop().is_some());
        assert!(frames.pop().is_some());
        assert!(frames.pop().is_none());
        assert_eq!(frames.depth(), 0);
    }

    #[test]
    fn registers() {
        let mut frame = Frame::new(0, 0);
        frame.set_register(1, Value::Int(4)).unwrap();
        assert!(matches!(frame.register(1), Ok(Value::Int(4))));
        assert!(frame.register(2).is_err());
    }
}
