//! Jump management for control flow.
//!
//! Tracks loop contexts for break/continue. A loop with a step statement
//! patches its `continue` jumps forward to the step; a loop without one
//! jumps straight back to its head.

use super::JumpLabel;

/// Stack of enclosing loops, innermost last.
#[derive(Debug, Default)]
pub struct JumpManager {
    loops: Vec<LoopContext>,
}

#[derive(Debug)]
struct LoopContext {
    /// Index of the loop's first instruction.
    head: usize,
    /// Whether `continue` goes to a step emitted after the body.
    has_step: bool,
    /// Open runtime scopes when the loop was entered.
    scope_depth: usize,
    break_labels: Vec<JumpLabel>,
    continue_labels: Vec<JumpLabel>,
}

/// What a `continue` in the current loop must do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContinueTarget {
    /// Jump back to the loop head at this index.
    Head(usize),
    /// Jump forward to the step; patched when the step is reached.
    Step,
}

impl JumpManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter_loop(&mut self, head: usize, has_step: bool, scope_depth: usize) {
        self.loops.push(LoopContext {
            head,
            has_step,
            scope_depth,
            break_labels: Vec::new(),
            continue_labels: Vec::new(),
        });
    }

    /// Leave the innermost loop, returning its pending break jumps.
    pub fn exit_loop(&mut self) -> Vec<JumpLabel> {
        self.loops
            .pop()
            .map(|ctx| ctx.break_labels)
            .unwrap_or_default()
    }

    pub fn in_loop(&self) -> bool {
        !self.loops.is_empty()
    }

    pub fn loop_depth(&self) -> usize {
        self.loops.len()
    }

    /// Runtime scope depth at the innermost loop's head.
    pub fn scope_depth(&self) -> Option<usize> {
        self.loops.last().map(|ctx| ctx.scope_depth)
    }

    pub fn add_break(&mut self, label: JumpLabel) {
        if let Some(ctx) = self.loops.last_mut() {
            ctx.break_labels.push(label);
        }
    }

    pub fn add_continue(&mut self, label: JumpLabel) {
        if let Some(ctx) = self.loops.last_mut() {
            ctx.continue_labels.push(label);
        }
    }

    /// Take the pending continue jumps of the innermost loop.
    pub fn take_continues(&mut self) -> Vec<JumpLabel> {
        self.loops
            .last_mut()
            .map(|ctx| std::mem::take(&mut ctx.continue_labels))
            .unwrap_or_default()
    }

    pub fn continue_target(&self) -> Option<ContinueTarget> {
        self.loops.last().map(|ctx| {
            if ctx.has_step {
                ContinueTarget::Step
            } else {
                ContinueTarget::Head(ctx.head)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_manager_not_in_loop() {
        let manager = JumpManager::new();
        assert!(!manager.in_loop());
        assert_eq!(manager.continue_target(), None);
    }

    #[test]
    fn nested_loops() {
        let mut manager = JumpManager::new();
        manager.enter_loop(10, false, 0);
        manager.enter_loop(20, true, 2);

        assert_eq!(manager.loop_depth(), 2);
        assert_eq!(manager.continue_target(), Some(ContinueTarget::Step));
        assert_eq!(manager.scope_depth(), Some(2));

        manager.exit_loop();
        assert_eq!(manager.continue_target(), Some(ContinueTarget::Head(10)));
        assert_eq!(manager.scope_depth(), Some(0));
    }

    #[test]
    fn exit_loop_returns_breaks() {
        let mut manager = JumpManager::new();
        manager.enter_loop(10, true, 0);
        manager.add_break(JumpLabel(100));
        manager.add_continue(JumpLabel(105));
        manager.add_break(JumpLabel(110));

        assert_eq!(manager.take_continues(), vec![JumpLabel(105)]);
        assert!(manager.take_continues().is_empty());
        let breaks = manager.exit_loop();
        assert_eq!(breaks, vec![JumpLabel(100), JumpLabel(110)]);
    }

    #[test]
    fn exit_empty_returns_empty() {
        let mut manager = JumpManager::new();
        assert!(manager.exit_loop().is_empty());
    }
}
