//! List and set literals.
//!
//! A literal collection is created empty and filled one element at a time.
//! With optimization on, a collection whose elements are all literals uses
//! the fused `INSERT_CONST_*` forms for pooled values, and a set literal
//! drops repeated literal elements up front.

use neco_parser::ast::{Expr, Literal};

use super::{ExprCompiler, Result};
use crate::bytecode::Opcode;

impl ExprCompiler<'_, '_> {
    pub(super) fn compile_list(&mut self, items: &[Expr]) -> Result<()> {
        self.emitter.emit(Opcode::CreateList);
        self.compile_elements(items.iter(), Opcode::Append)
    }

    pub(super) fn compile_set(&mut self, items: &[Expr]) -> Result<()> {
        self.emitter.emit(Opcode::CreateSet);
        if !self.emitter.optimize() {
            return self.compile_elements(items.iter(), Opcode::Insert);
        }
        let mut seen: Vec<&Literal> = Vec::with_capacity(items.len());
        let unique: Vec<&Expr> = items
            .iter()
            .filter(|item| match item.as_literal() {
                Some(lit) if seen.iter().any(|s| same_literal(s, lit)) => false,
                Some(lit) => {
                    seen.push(lit);
                    true
                }
                None => true,
            })
            .collect();
        self.compile_elements(unique.into_iter(), Opcode::Insert)
    }

    fn compile_elements<'e>(
        &mut self,
        items: impl Iterator<Item = &'e Expr> + Clone,
        add: Opcode,
    ) -> Result<()> {
        let fuse = self.emitter.optimize() && items.clone().all(Expr::is_literal);
        for item in items {
            if fuse {
                match item.as_literal() {
                    Some(Literal::Int(v)) => {
                        self.emitter.emit_insert_int(*v)?;
                        continue;
                    }
                    Some(Literal::Float(v)) => {
                        self.emitter.emit_insert_float(*v)?;
                        continue;
                    }
                    Some(Literal::Str(s)) => {
                        self.emitter.emit_insert_string(s)?;
                        continue;
                    }
                    _ => {}
                }
            }
            self.compile(item)?;
            self.emitter.emit(add);
        }
        Ok(())
    }
}

/// Literal equality for set deduplication; floats compare by bit pattern.
fn same_literal(a: &Literal, b: &Literal) -> bool {
    match (a, b) {
        (Literal::Float(x), Literal::Float(y)) => x.to_bits() == y.to_bits(),
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use neco_core::{DataType, Span};
    use neco_parser::ast::ExprKind;

    use super::*;
    use crate::bytecode::{ConstantPool, Instruction};
    use crate::emit::BytecodeEmitter;

    fn int(v: i64) -> Expr {
        Expr::literal(Literal::Int(v), Span::point(1, 1))
    }

    fn compile(expr: &Expr, optimize: bool) -> Vec<Instruction> {
        let mut pool = ConstantPool::new();
        let mut emitter = BytecodeEmitter::new(&mut pool, 1, optimize);
        ExprCompiler::new(&mut emitter).compile(expr).unwrap();
        emitter.finish()
    }

    fn inserts(code: &[Instruction]) -> usize {
        code.iter()
            .filter(|i| matches!(i.opcode.narrow(), Opcode::Insert | Opcode::InsertConstInt))
            .count()
    }

    fn set_of(items: Vec<Expr>) -> Expr {
        Expr::new(
            ExprKind::Set(items),
            DataType::set(DataType::Int),
            Span::point(1, 1),
        )
    }

    #[test]
    fn set_literal_dedups_when_optimizing() {
        let expr = set_of(vec![int(1), int(1), int(2)]);
        assert_eq!(inserts(&compile(&expr, true)), 2);
        assert_eq!(inserts(&compile(&expr, false)), 3);
    }

    #[test]
    fn literal_list_uses_fused_inserts() {
        let expr = Expr::new(
            ExprKind::List(vec![int(1), int(2)]),
            DataType::list(DataType::Int),
            Span::point(1, 1),
        );
        let code = compile(&expr, true);
        assert_eq!(
            code,
            vec![
                Instruction::bare(Opcode::CreateList),
                Instruction::new(Opcode::InsertConstInt, 0),
                Instruction::new(Opcode::InsertConstInt, 1),
            ]
        );
        let plain = compile(&expr, false);
        assert_eq!(plain.len(), 5);
        assert_eq!(plain[2].opcode, Opcode::Append);
    }

    #[test]
    fn mixed_list_is_not_fused() {
        let variable = Expr::new(
            ExprKind::Variable {
                name: "x".into(),
                storage: neco_parser::ast::Storage::Local(0),
            },
            DataType::Int,
            Span::point(1, 1),
        );
        let expr = Expr::new(
            ExprKind::List(vec![int(1), variable]),
            DataType::list(DataType::Int),
            Span::point(1, 1),
        );
        let code = compile(&expr, true);
        assert!(code.iter().all(|i| i.opcode != Opcode::InsertConstInt));
    }
}
