//! Expression compiler.
//!
//! Lowers a typed [`Expr`] to instructions that leave exactly one value on
//! the operand stack. Operands are evaluated left to right.

mod collections;
mod control;

use neco_core::{CodeGenError, DataType};
use neco_parser::ast::{BinaryOp, Expr, ExprKind, Literal, Storage, UnaryOp};

use crate::bytecode::Opcode;
use crate::emit::BytecodeEmitter;

type Result<T> = std::result::Result<T, CodeGenError>;

pub struct ExprCompiler<'a, 'pool> {
    emitter: &'a mut BytecodeEmitter<'pool>,
}

impl<'a, 'pool> ExprCompiler<'a, 'pool> {
    pub fn new(emitter: &'a mut BytecodeEmitter<'pool>) -> Self {
        Self { emitter }
    }

    pub fn compile(&mut self, expr: &Expr) -> Result<()> {
        match &expr.kind {
            ExprKind::Literal(lit) => self.compile_literal(lit, expr),
            ExprKind::Variable { storage, .. } => {
                match *storage {
                    Storage::Local(slot) => self.emitter.emit_byte(Opcode::LoadLocal, slot),
                    Storage::Global(slot) => self.emitter.emit_byte(Opcode::LoadGlobal, slot),
                }
                Ok(())
            }
            ExprKind::Binary { op, left, right } => match op {
                BinaryOp::And => self.compile_short_circuit(left, right, Opcode::JumpIfFalse),
                BinaryOp::Or => self.compile_short_circuit(left, right, Opcode::JumpIfTrue),
                _ => {
                    let opcode = binary_opcode(*op).ok_or(CodeGenError::UnhandledNode {
                        kind: "logical operator",
                        line: expr.span.line,
                    })?;
                    self.compile(left)?;
                    self.compile(right)?;
                    self.emitter.emit(opcode);
                    Ok(())
                }
            },
            ExprKind::Unary { op, operand } => {
                self.compile(operand)?;
                self.emitter.emit(match op {
                    UnaryOp::Neg => Opcode::Neg,
                    UnaryOp::Not => Opcode::Not,
                });
                Ok(())
            }
            ExprKind::Unwrap { value, default } => self.compile_unwrap(value, default),
            ExprKind::Ternary {
                condition,
                then,
                otherwise,
            } => self.compile_ternary(condition, then, otherwise),
            ExprKind::Call { function, args } => {
                self.compile_args(args)?;
                self.emitter.emit_operand(Opcode::Call, *function);
                Ok(())
            }
            ExprKind::BuiltinCall { builtin, args } => {
                self.compile_args(args)?;
                self.emitter.emit_byte(Opcode::CallBuiltin, u8::from(*builtin));
                Ok(())
            }
            ExprKind::Field { object, index } => {
                self.compile(object)?;
                self.emitter.emit_byte(Opcode::GetField, *index);
                Ok(())
            }
            ExprKind::Index { target, index } => {
                self.compile(target)?;
                self.compile(index)?;
                self.emitter.emit(Opcode::GetIndex);
                Ok(())
            }
            ExprKind::StructLiteral { fields, .. } => {
                let count = u8::try_from(fields.len()).map_err(|_| CodeGenError::Internal {
                    message: format!("struct literal with {} fields", fields.len()),
                })?;
                for field in fields {
                    self.compile(field)?;
                }
                self.emitter.emit_byte(Opcode::CreateStruct, count);
                Ok(())
            }
            ExprKind::EnumVariant { ordinal, .. } => self.emitter.emit_int(i64::from(*ordinal)),
            ExprKind::List(items) => self.compile_list(items),
            ExprKind::Set(items) => self.compile_set(items),
            ExprKind::Match(m) => self.compile_match(m),
        }
    }

    fn compile_literal(&mut self, lit: &Literal, expr: &Expr) -> Result<()> {
        // An `Unknown` literal is the analyzer's error placeholder.
        if expr.ty == DataType::Unknown {
            return Err(CodeGenError::UnhandledNode {
                kind: "error placeholder",
                line: expr.span.line,
            });
        }
        match lit {
            Literal::Int(v) => self.emitter.emit_int(*v),
            Literal::Float(v) => self.emitter.emit_float(*v),
            Literal::Str(s) => self.emitter.emit_string(s),
            Literal::Bool(b) => {
                self.emitter.emit_bool(*b);
                Ok(())
            }
            Literal::None => {
                self.emitter.emit(Opcode::PushNone);
                Ok(())
            }
        }
    }

    fn compile_args(&mut self, args: &[Expr]) -> Result<()> {
        args.iter().try_for_each(|arg| self.compile(arg))
    }
}

/// The stack opcode of a strict binary operator.
fn binary_opcode(op: BinaryOp) -> Option<Opcode> {
    Some(match op {
        BinaryOp::Equal => Opcode::Equal,
        BinaryOp::NotEqual => Opcode::NotEqual,
        BinaryOp::Less => Opcode::Less,
        BinaryOp::LessEqual => Opcode::LessEqual,
        BinaryOp::Greater => Opcode::Greater,
        BinaryOp::GreaterEqual => Opcode::GreaterEqual,
        BinaryOp::In => Opcode::In,
        BinaryOp::Add => Opcode::Add,
        BinaryOp::Sub => Opcode::Sub,
        BinaryOp::Mul => Opcode::Mul,
        BinaryOp::Div => Opcode::Div,
        BinaryOp::Mod => Opcode::Mod,
        BinaryOp::Pow => Opcode::Pow,
        BinaryOp::And | BinaryOp::Or => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::{ConstantPool, Instruction};
    use neco_core::Span;

    fn compile(expr: &Expr) -> (Vec<Instruction>, ConstantPool) {
        let mut pool = ConstantPool::new();
        let mut emitter = BytecodeEmitter::new(&mut pool, 1, true);
        ExprCompiler::new(&mut emitter).compile(expr).unwrap();
        let code = emitter.finish();
        (code, pool)
    }

    fn int(v: i64) -> Expr {
        Expr::literal(Literal::Int(v), Span::point(1, 1))
    }

    fn ops(code: &[Instruction]) -> Vec<Opcode> {
        code.iter().map(|i| i.opcode).collect()
    }

    #[test]
    fn arithmetic_evaluates_left_to_right() {
        let expr = Expr::new(
            ExprKind::Binary {
                op: BinaryOp::Sub,
                left: Box::new(int(7)),
                right: Box::new(int(2)),
            },
            DataType::Int,
            Span::point(1, 1),
        );
        let (code, pool) = compile(&expr);
        assert_eq!(
            code,
            vec![
                Instruction::new(Opcode::LoadConstInt, 0),
                Instruction::new(Opcode::LoadConstInt, 1),
                Instruction::bare(Opcode::Sub),
            ]
        );
        assert_eq!(pool.ints(), &[7, 2]);
    }

    #[test]
    fn and_short_circuits() {
        let flag = |b| Expr::literal(Literal::Bool(b), Span::point(1, 1));
        let expr = Expr::new(
            ExprKind::Binary {
                op: BinaryOp::And,
                left: Box::new(flag(true)),
                right: Box::new(flag(false)),
            },
            DataType::Bool,
            Span::point(1, 1),
        );
        let (code, _) = compile(&expr);
        assert_eq!(
            ops(&code),
            vec![
                Opcode::PushTrue,
                Opcode::Dup,
                Opcode::JumpIfFalse,
                Opcode::Pop,
                Opcode::PushFalse,
            ]
        );
        assert_eq!(code[2].jump_target(2), Some(5));
    }

    #[test]
    fn error_placeholder_is_fatal() {
        let mut pool = ConstantPool::new();
        let mut emitter = BytecodeEmitter::new(&mut pool, 1, true);
        let err = ExprCompiler::new(&mut emitter)
            .compile(&Expr::error(Span::point(3, 1)))
            .unwrap_err();
        assert!(matches!(err, CodeGenError::UnhandledNode { line: 3, .. }));
    }

    #[test]
    fn enum_variants_load_their_ordinal() {
        let expr = Expr::new(
            ExprKind::EnumVariant {
                name: "Color".into(),
                ordinal: 2,
            },
            DataType::Enum("Color".into()),
            Span::point(1, 1),
        );
        let (code, pool) = compile(&expr);
        assert_eq!(code, vec![Instruction::new(Opcode::LoadConstInt, 0)]);
        assert_eq!(pool.ints(), &[2]);
    }
}
