//! Expressions that branch: `and`/`or`, `??`, `?:` and `match`.

use neco_parser::ast::{Expr, MatchExpr};

use super::{ExprCompiler, Result};
use crate::bytecode::Opcode;

impl ExprCompiler<'_, '_> {
    /// `a and b` / `a or b`. The left value stays on the stack as the result
    /// when it decides the outcome.
    pub(super) fn compile_short_circuit(
        &mut self,
        left: &Expr,
        right: &Expr,
        jump: Opcode,
    ) -> Result<()> {
        self.compile(left)?;
        self.emitter.emit(Opcode::Dup);
        let skip = self.emitter.emit_jump(jump);
        self.emitter.emit(Opcode::Pop);
        self.compile(right)?;
        self.emitter.patch_jump(skip)
    }

    /// `value ?? default`
    pub(super) fn compile_unwrap(&mut self, value: &Expr, default: &Expr) -> Result<()> {
        self.compile(value)?;
        self.emitter.emit(Opcode::Dup);
        self.emitter.emit(Opcode::PushNone);
        self.emitter.emit(Opcode::Equal);
        let present = self.emitter.emit_jump(Opcode::JumpIfFalse);
        self.emitter.emit(Opcode::Pop);
        self.compile(default)?;
        self.emitter.patch_jump(present)
    }

    pub(super) fn compile_ternary(
        &mut self,
        condition: &Expr,
        then: &Expr,
        otherwise: &Expr,
    ) -> Result<()> {
        self.compile(condition)?;
        let else_jump = self.emitter.emit_jump(Opcode::JumpIfFalse);
        self.compile(then)?;
        let end_jump = self.emitter.emit_jump(Opcode::Jump);
        self.emitter.patch_jump(else_jump)?;
        self.compile(otherwise)?;
        self.emitter.patch_jump(end_jump)
    }

    /// Match in expression position.
    ///
    /// ```text
    ///     scrutinee
    ///     DUP; pattern_0; EQUAL; JUMP_IF_TRUE arm_0     (every arm but the last)
    ///     pattern_n; EQUAL; JUMP_IF_TRUE arm_n          (last arm, no DUP)
    ///     default; JUMP end
    /// arm_0:
    ///     POP; value_0; JUMP end                        (POP drops the scrutinee)
    /// arm_n:
    ///     value_n; JUMP end
    /// end:
    /// ```
    pub(super) fn compile_match(&mut self, m: &MatchExpr) -> Result<()> {
        self.compile(&m.scrutinee)?;
        let arm_jumps = self.compile_dispatch(m.arms.iter().map(|(pattern, _)| pattern))?;

        let mut end_jumps = Vec::with_capacity(m.arms.len() + 1);
        self.compile(&m.default)?;
        end_jumps.push(self.emitter.emit_jump(Opcode::Jump));

        let last = m.arms.len().saturating_sub(1);
        for (i, ((_, value), label)) in m.arms.iter().zip(arm_jumps).enumerate() {
            self.emitter.patch_jump(label)?;
            if i != last {
                self.emitter.emit(Opcode::Pop);
            }
            self.compile(value)?;
            end_jumps.push(self.emitter.emit_jump(Opcode::Jump));
        }
        for label in end_jumps {
            self.emitter.patch_jump(label)?;
        }
        Ok(())
    }

    /// Compare the scrutinee on top of the stack against each pattern in
    /// order. Returns one pending jump per pattern.
    ///
    /// On fall-through the scrutinee has been consumed. A taken jump of any
    /// pattern but the last leaves the scrutinee on the stack.
    pub(crate) fn compile_dispatch<'e>(
        &mut self,
        patterns: impl ExactSizeIterator<Item = &'e Expr>,
    ) -> Result<Vec<crate::emit::JumpLabel>> {
        let count = patterns.len();
        if count == 0 {
            self.emitter.emit(Opcode::Pop);
            return Ok(Vec::new());
        }
        let mut labels = Vec::with_capacity(count);
        for (i, pattern) in patterns.enumerate() {
            if i + 1 != count {
                self.emitter.emit(Opcode::Dup);
            }
            self.compile(pattern)?;
            self.emitter.emit(Opcode::Equal);
            labels.push(self.emitter.emit_jump(Opcode::JumpIfTrue));
        }
        Ok(labels)
    }
}

#[cfg(test)]
mod tests {
    use neco_core::{DataType, Span};
    use neco_parser::ast::{ExprKind, Literal};

    use super::*;
    use crate::bytecode::{ConstantPool, Instruction};
    use crate::emit::BytecodeEmitter;

    fn int(v: i64) -> Expr {
        Expr::literal(Literal::Int(v), Span::point(1, 1))
    }

    fn compile(expr: &Expr) -> Vec<Instruction> {
        let mut pool = ConstantPool::new();
        let mut emitter = BytecodeEmitter::new(&mut pool, 1, true);
        ExprCompiler::new(&mut emitter).compile(expr).unwrap();
        emitter.finish()
    }

    #[test]
    fn match_expression_layout() {
        let m = MatchExpr {
            scrutinee: int(1),
            arms: vec![(int(1), int(10)), (int(2), int(20))],
            default: int(0),
        };
        let expr = Expr::new(
            ExprKind::Match(Box::new(m)),
            DataType::Int,
            Span::point(1, 1),
        );
        let code = compile(&expr);
        let ops: Vec<Opcode> = code.iter().map(|i| i.opcode).collect();
        assert_eq!(
            ops,
            vec![
                Opcode::LoadConstInt, // 0 scrutinee
                Opcode::Dup,
                Opcode::LoadConstInt,
                Opcode::Equal,
                Opcode::JumpIfTrue, // 4
                Opcode::LoadConstInt,
                Opcode::Equal,
                Opcode::JumpIfTrue, // 7
                Opcode::LoadConstInt, // 8 default
                Opcode::Jump,         // 9
                Opcode::Pop,          // 10 arm 0
                Opcode::LoadConstInt,
                Opcode::Jump,         // 12
                Opcode::LoadConstInt, // 13 arm 1
                Opcode::Jump,         // 14
            ]
        );
        assert_eq!(code[4].jump_target(4), Some(10));
        assert_eq!(code[7].jump_target(7), Some(13));
        for i in [9, 12, 14] {
            assert_eq!(code[i].jump_target(i), Some(15));
        }
    }

    #[test]
    fn unwrap_keeps_present_value() {
        let expr = Expr::new(
            ExprKind::Unwrap {
                value: Box::new(Expr::literal(Literal::None, Span::point(1, 1))),
                default: Box::new(int(4)),
            },
            DataType::Int,
            Span::point(1, 1),
        );
        let code = compile(&expr);
        assert_eq!(code[4].opcode, Opcode::JumpIfFalse);
        assert_eq!(code[4].jump_target(4), Some(code.len()));
        assert_eq!(code[5].opcode, Opcode::Pop);
    }

    #[test]
    fn ternary_has_one_branch_each_way() {
        let expr = Expr::new(
            ExprKind::Ternary {
                condition: Box::new(Expr::literal(Literal::Bool(true), Span::point(1, 1))),
                then: Box::new(int(1)),
                otherwise: Box::new(int(2)),
            },
            DataType::Int,
            Span::point(1, 1),
        );
        let code = compile(&expr);
        assert_eq!(code[1].jump_target(1), Some(4));
        assert_eq!(code[3].jump_target(3), Some(5));
    }
}
