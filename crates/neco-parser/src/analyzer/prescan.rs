//! Global prescan.
//!
//! Before the main pass the token stream is scanned four times, the cursor
//! reset each time, registering in order: enum definitions, struct names,
//! struct bodies, function headers. Struct fields may then name any struct
//! and function bodies may call functions declared later in the file.
//!
//! Only items at brace depth 0 are considered; nested definitions are
//! reported by the main pass.

use neco_core::{DataType, SemanticError, Span, TooManyErrors};

use super::symbol::{CallTarget, EnumSymbol, FunctionBucket, FunctionSymbol, StructSymbol, Symbol};
use super::{Analyzer, FnHeader, Interrupt, PResult};
use crate::ast::{Block, Function, Param};
use crate::lexer::TokenKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    Enums,
    StructNames,
    StructBodies,
    FunctionHeaders,
}

impl Analyzer<'_, '_> {
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub(super) fn prescan(&mut self) -> Result<(), TooManyErrors> {
        for pass in [
            Pass::Enums,
            Pass::StructNames,
            Pass::StructBodies,
            Pass::FunctionHeaders,
        ] {
            #[cfg(feature = "profiling")]
            profiling::scope!("prescan pass");
            if self.scan_pass(pass) == Err(Interrupt::Abort) {
                return Err(TooManyErrors {
                    limit: self.diagnostics.limit(),
                });
            }
        }
        self.pos = 0;
        Ok(())
    }

    fn scan_pass(&mut self, pass: Pass) -> PResult<()> {
        self.pos = 0;
        let mut depth = 0usize;
        while !self.is_eof() {
            let kind = self.peek().kind;
            let start = self.pos;
            let wanted = match kind {
                TokenKind::Enum => pass == Pass::Enums,
                TokenKind::Struct => matches!(pass, Pass::StructNames | Pass::StructBodies),
                TokenKind::Fn => pass == Pass::FunctionHeaders,
                TokenKind::LeftBrace => {
                    depth += 1;
                    false
                }
                TokenKind::RightBrace => {
                    depth = depth.saturating_sub(1);
                    false
                }
                _ => false,
            };
            if !(wanted && depth == 0) {
                self.advance();
                continue;
            }

            let result = match pass {
                Pass::Enums => self.scan_enum(),
                Pass::StructNames => self.scan_struct_name(),
                Pass::StructBodies => self.scan_struct_body(),
                Pass::FunctionHeaders => self.scan_function_header(start),
            };
            match result {
                Ok(()) => {}
                Err(Interrupt::Syntax) => {
                    self.pos = start;
                    self.skip_item();
                }
                Err(Interrupt::Abort) => return Err(Interrupt::Abort),
            }
            self.item_ends.insert(start, self.pos);
        }
        Ok(())
    }

    /// `enum Name { A, B, C }`
    fn scan_enum(&mut self) -> PResult<()> {
        self.expect(TokenKind::Enum)?;
        let name = self.expect_ident()?;
        self.expect(TokenKind::LeftBrace)?;
        let mut variants: Vec<String> = Vec::new();
        while !self.check(TokenKind::RightBrace) && !self.is_eof() {
            let variant = self.expect_ident()?;
            if variants.iter().any(|v| v == variant.lexeme) {
                self.semantic(SemanticError::other(
                    variant.span,
                    format!("duplicate variant '{}' in enum '{}'", variant.lexeme, name.lexeme),
                ))?;
            } else {
                variants.push(variant.lexeme.to_string());
            }
            if !self.eat(TokenKind::Comma) {
                self.eat_terminator();
                if !self.check(TokenKind::RightBrace) && !self.check(TokenKind::Identifier) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RightBrace)?;
        let symbol = Symbol::Enum(EnumSymbol {
            variants,
            span: name.span,
        });
        if let Err(err) = self.scopes.define_global(name.lexeme, symbol) {
            self.semantic(err)?;
        }
        Ok(())
    }

    /// `struct Name` of `struct Name { ... }`; the body is skipped.
    fn scan_struct_name(&mut self) -> PResult<()> {
        self.expect(TokenKind::Struct)?;
        let name = self.expect_ident()?;
        let symbol = Symbol::Struct(StructSymbol {
            fields: Vec::new(),
            span: name.span,
        });
        if let Err(err) = self.scopes.define_global(name.lexeme, symbol) {
            self.semantic(err)?;
        }
        self.skip_braces();
        Ok(())
    }

    /// `{ int x; List<Point> next }` of a struct already registered by name.
    fn scan_struct_body(&mut self) -> PResult<()> {
        self.expect(TokenKind::Struct)?;
        if !self.check(TokenKind::Identifier) {
            // Already reported by the name pass.
            self.skip_item();
            return Ok(());
        }
        let name = self.expect_ident()?;
        self.expect(TokenKind::LeftBrace)?;
        let mut fields: Vec<(String, DataType)> = Vec::new();
        while !self.check(TokenKind::RightBrace) && !self.is_eof() {
            let type_token = self.peek();
            let ty = self.parse_type()?;
            let field = self.expect_ident()?;
            self.require_complete(type_token.kind, &ty, field.span)?;
            if fields.iter().any(|(n, _)| n == field.lexeme) {
                self.semantic(SemanticError::Redeclaration {
                    name: field.lexeme.to_string(),
                    original: name.span,
                    span: field.span,
                })?;
            } else if fields.len() == usize::from(u8::MAX) {
                self.semantic(SemanticError::other(field.span, "more than 255 fields"))?;
            } else {
                fields.push((field.lexeme.to_string(), ty));
            }
            if !self.eat(TokenKind::Comma) {
                self.eat_terminator();
            }
        }
        self.expect(TokenKind::RightBrace)?;

        // A duplicate struct name was reported by the name pass; the first
        // definition keeps its fields.
        if let Some(Symbol::Struct(symbol)) = self.scopes.global_symbol_mut(name.lexeme)
            && symbol.span == name.span
        {
            symbol.fields = fields;
        }
        Ok(())
    }

    /// `fn name(type a, type b) -> type` followed by a body.
    fn scan_function_header(&mut self, start: usize) -> PResult<()> {
        self.expect(TokenKind::Fn)?;
        let name = self.expect_ident()?;
        self.expect(TokenKind::LeftParen)?;
        let mut params: Vec<Param> = Vec::new();
        while !self.check(TokenKind::RightParen) {
            let type_token = self.peek();
            let ty = self.parse_type()?;
            let param = self.expect_ident()?;
            self.require_complete(type_token.kind, &ty, param.span)?;
            params.push(Param {
                name: param.lexeme.to_string(),
                ty,
                span: param.span,
            });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RightParen)?;
        let return_type = if self.eat(TokenKind::Arrow) {
            let type_token = self.peek();
            let ty = self.parse_type()?;
            self.require_complete(type_token.kind, &ty, type_token.span)?;
            ty
        } else {
            DataType::None
        };
        let body_start = self.pos;
        if !self.check(TokenKind::LeftBrace) {
            self.expect(TokenKind::LeftBrace)?;
        }
        self.skip_braces();

        let index = match u16::try_from(self.functions.len()) {
            Ok(index) => index,
            Err(_) => {
                self.semantic(SemanticError::other(name.span, "more than 65535 functions"))?;
                return Ok(());
            }
        };
        let symbol = FunctionSymbol {
            params: params.iter().map(|p| p.ty.clone()).collect(),
            return_type: return_type.clone(),
            target: CallTarget::User(index),
            span: name.span,
        };

        let inserted = match self.scopes.global_symbol_mut(name.lexeme) {
            Some(Symbol::Functions(bucket)) => bucket.insert(symbol).map_err(|original| {
                SemanticError::Redeclaration {
                    name: name.lexeme.to_string(),
                    original,
                    span: name.span,
                }
            }),
            Some(_) => Err(SemanticError::Redeclaration {
                name: name.lexeme.to_string(),
                original: self
                    .scopes
                    .lookup(name.lexeme)
                    .map(Symbol::span)
                    .unwrap_or_default(),
                span: name.span,
            }),
            None => {
                let mut bucket = FunctionBucket::new();
                // A fresh bucket cannot hold a conflicting signature.
                let _ = bucket.insert(symbol);
                self.scopes
                    .define_global(name.lexeme, Symbol::Functions(bucket))
            }
        };
        if let Err(err) = inserted {
            self.semantic(err)?;
            return Ok(());
        }

        self.functions.push(Function {
            name: name.lexeme.to_string(),
            params: params.clone(),
            return_type: return_type.clone(),
            body: Block::default(),
            span: name.span,
        });
        self.headers.insert(
            start,
            FnHeader {
                index,
                params,
                return_type,
                body_start,
            },
        );
        Ok(())
    }
}

impl Analyzer<'_, '_> {
    /// Annotations outside declarations with an initializer cannot be
    /// inferred. A plain unknown type name was already reported.
    fn require_complete(&mut self, first: TokenKind, ty: &DataType, span: Span) -> PResult<()> {
        if first == TokenKind::Var || (!ty.is_complete() && !ty.is_unknown()) {
            self.semantic(SemanticError::IncompleteType {
                found: ty.clone(),
                span,
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::analyzer::test_support::{analyze_ok, analyze_source};

    #[test]
    fn functions_may_call_later_functions() {
        let script = analyze_ok(
            "fn a() -> int { return b() }
             fn b() -> int { return 1 }
             int x = a()",
        );
        assert_eq!(script.functions.len(), 2);
        assert_eq!(script.functions[1].name, "b");
    }

    #[test]
    fn structs_may_reference_each_other() {
        analyze_ok(
            "struct A { B? next }
             struct B { A? prev; int v }",
        );
    }

    #[test]
    fn enums_are_visible_in_struct_fields() {
        analyze_ok(
            "struct Pixel { Color c }
             enum Color { Red, Green }",
        );
    }

    #[test]
    fn duplicate_function_signature_is_reported() {
        let (_, errors) = analyze_source("fn f(int a) {} fn f(int b) {}");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("redeclared"), "{}", errors[0]);
    }

    #[test]
    fn overloads_by_parameter_type_are_allowed() {
        let script = analyze_ok("fn f(int a) {} fn f(string s) {}");
        assert_eq!(script.functions.len(), 2);
    }

    #[test]
    fn broken_header_is_reported_once() {
        let (_, errors) = analyze_source("fn f(int) {}\nint x = 1");
        assert_eq!(errors.len(), 1, "{errors:?}");
    }

    #[test]
    fn inferred_parameter_types_are_rejected() {
        let (_, errors) = analyze_source("fn f(var a) {}");
        assert_eq!(errors.len(), 1, "{errors:?}");
        assert!(errors[0].contains("complete type"));
    }

    #[test]
    fn duplicate_struct_is_reported() {
        let (_, errors) = analyze_source("struct P { int x }\nstruct P { int y }");
        assert_eq!(errors.len(), 1, "{errors:?}");
    }
}
