//! Variable declarations.

use neco_core::{CodeGenError, DataType};
use neco_parser::ast::Expr;

use super::{Result, StmtCompiler};
use crate::bytecode::Opcode;

impl StmtCompiler<'_, '_> {
    /// `T x = init` stores into the slot; `T x` declares the slot holding
    /// the default value of `T`, described by nested type markers.
    pub(super) fn compile_var_decl(
        &mut self,
        slot: u8,
        ty: &DataType,
        init: Option<&Expr>,
        line: u32,
    ) -> Result<()> {
        match init {
            Some(init) => {
                self.expr().compile(init)?;
                self.emitter.emit_byte(Opcode::StoreLocal, slot);
            }
            None => {
                let markers = type_markers(ty).ok_or(CodeGenError::UnhandledNode {
                    kind: "declaration of incomplete type",
                    line,
                })?;
                self.emitter.emit_byte(Opcode::DeclareLocal, slot);
                for marker in markers {
                    self.emitter.emit(marker);
                }
            }
        }
        Ok(())
    }
}

/// Marker sequence describing `ty`: composite markers are followed by
/// their element's markers, ending at a primitive marker.
///
/// Enums default to their first variant (ordinal 0) and use the int
/// marker; structs and options default to `none`.
pub fn type_markers(ty: &DataType) -> Option<Vec<Opcode>> {
    let mut markers = Vec::new();
    let mut current = ty;
    loop {
        let marker = match current {
            DataType::Bool => Opcode::TypeBool,
            DataType::Int | DataType::Enum(_) => Opcode::TypeInt,
            DataType::Float => Opcode::TypeFloat,
            DataType::String => Opcode::TypeString,
            DataType::Any => Opcode::TypeAny,
            DataType::None | DataType::Object(_) | DataType::Option(_) => Opcode::TypeNone,
            DataType::List(element) => {
                markers.push(Opcode::TypeList);
                current = element;
                continue;
            }
            DataType::Set(element) => {
                markers.push(Opcode::TypeSet);
                current = element;
                continue;
            }
            DataType::Unknown => return None,
        };
        markers.push(marker);
        return Some(markers);
    }
}
