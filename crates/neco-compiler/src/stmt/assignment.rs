//! Assignments to variables, struct fields and collection elements.

use neco_parser::ast::{Expr, Place, Storage};

use super::{Result, StmtCompiler};
use crate::bytecode::Opcode;

impl StmtCompiler<'_, '_> {
    /// The destination's container and key are evaluated before the value
    /// and parked in registers 0 and 1 while the value is computed.
    ///
    /// ```text
    /// x = v       v; STORE_LOCAL x
    /// o.f = v     o; STORE_REGISTER 0; v; LOAD_REGISTER 0; SET_FIELD f
    /// c[k] = v    c; STORE_REGISTER 0; k; STORE_REGISTER 1; v;
    ///             LOAD_REGISTER 0; LOAD_REGISTER 1; SET_INDEX
    /// ```
    pub(super) fn compile_assign(&mut self, place: &Place, value: &Expr) -> Result<()> {
        match place {
            Place::Variable(Storage::Local(slot)) => {
                self.expr().compile(value)?;
                self.emitter.emit_byte(Opcode::StoreLocal, *slot);
            }
            Place::Variable(Storage::Global(slot)) => {
                self.expr().compile(value)?;
                self.emitter.emit_byte(Opcode::StoreGlobal, *slot);
            }
            Place::Field { object, index } => {
                self.expr().compile(object)?;
                self.emitter.emit_byte(Opcode::StoreRegister, 0);
                self.expr().compile(value)?;
                self.emitter.emit_byte(Opcode::LoadRegister, 0);
                self.emitter.emit_byte(Opcode::SetField, *index);
            }
            Place::Index { target, index } => {
                self.expr().compile(target)?;
                self.emitter.emit_byte(Opcode::StoreRegister, 0);
                self.expr().compile(index)?;
                self.emitter.emit_byte(Opcode::StoreRegister, 1);
                self.expr().compile(value)?;
                self.emitter.emit_byte(Opcode::LoadRegister, 0);
                self.emitter.emit_byte(Opcode::LoadRegister, 1);
                self.emitter.emit(Opcode::SetIndex);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::bytecode::Opcode;
    use crate::stmt::test_support::{compile, compile_globals, ops};

    #[test]
    fn field_assignment_uses_register_zero() {
        let code = compile_globals(
            "struct P { int x; int y }\nP p = P { x: 1, y: 2 }\np.y = 5",
            true,
        );
        let tail = &ops(&code)[4..];
        assert_eq!(
            tail,
            &[
                Opcode::LoadLocal,
                Opcode::StoreRegister,
                Opcode::LoadConstInt,
                Opcode::LoadRegister,
                Opcode::SetField,
            ]
        );
        let set = code.iter().find(|i| i.opcode == Opcode::SetField).unwrap();
        assert_eq!(set.operand, 1);
    }

    #[test]
    fn compound_index_assignment_reads_then_writes() {
        let code = compile_globals("var xs = [1, 2]\nxs[0] += 3", true);
        let ops = ops(&code);
        let start = ops.iter().position(|op| *op == Opcode::StoreRegister).unwrap();
        assert_eq!(
            &ops[start - 1..],
            &[
                Opcode::LoadLocal,
                Opcode::StoreRegister,
                Opcode::LoadConstInt,
                Opcode::StoreRegister,
                Opcode::LoadLocal,
                Opcode::LoadConstInt,
                Opcode::GetIndex,
                Opcode::LoadConstInt,
                Opcode::Add,
                Opcode::LoadRegister,
                Opcode::LoadRegister,
                Opcode::SetIndex,
            ]
        );
    }

    #[test]
    fn globals_written_from_functions() {
        let program = compile("int g = 0\nfn bump() { g = g + 1 }", true);
        let ops = ops(&program.functions[0]);
        assert!(ops.contains(&Opcode::LoadGlobal));
        assert!(ops.contains(&Opcode::StoreGlobal));
    }
}
