//! Expression parsing with type derivation and constant folding.
//!
//! Precedence climbing over [`Precedence`]: each binary level loops over
//! its operators so chains come out left-associative, except `**` which
//! recurses at its own level. Every node is typed as it is built.

use neco_core::{DataType, ParseError, ParseErrorKind, SemanticError, Span};

use super::builtins::refine_generic;
use super::fold::{fold_binary, fold_unary};
use super::overload::resolve_overload;
use super::symbol::{CallTarget, Symbol};
use super::types::{binary_result, unary_result};
use super::{Analyzer, PResult};
use crate::ast::{BinaryOp, Expr, ExprKind, Literal, MatchExpr, Precedence, UnaryOp};
use crate::lexer::TokenKind;

impl<'ast> Analyzer<'_, 'ast> {
    pub(super) fn parse_expression(&mut self) -> PResult<Expr> {
        self.parse_precedence(Precedence::Conditional)
    }

    fn parse_precedence(&mut self, level: Precedence) -> PResult<Expr> {
        match level {
            Precedence::Conditional => return self.parse_conditional(),
            Precedence::Unary | Precedence::Dot => return self.parse_unary(),
            _ => {}
        }
        let mut left = self.parse_precedence(level.next())?;
        loop {
            let token = self.peek();
            let Some(op) = BinaryOp::from_token(token.kind) else {
                break;
            };
            if op.precedence() != level {
                break;
            }
            self.advance();
            let right = if op.is_right_assoc() {
                self.parse_precedence(level)?
            } else {
                self.parse_precedence(level.next())?
            };
            left = self.binary(op, left, right, token.span)?;
        }
        Ok(left)
    }

    /// `c ? a : b` and `v ?? d`, both right-associative.
    fn parse_conditional(&mut self) -> PResult<Expr> {
        let value = self.parse_precedence(Precedence::Or)?;
        let token = self.peek();
        match token.kind {
            TokenKind::Question => {
                self.advance();
                let then = self.parse_expression()?;
                self.expect(TokenKind::Colon)?;
                let otherwise = self.parse_conditional()?;
                self.ternary(value, then, otherwise, token.span)
            }
            TokenKind::QuestionQuestion => {
                self.advance();
                let default = self.parse_conditional()?;
                self.unwrap_or(value, default, token.span)
            }
            _ => Ok(value),
        }
    }

    fn parse_unary(&mut self) -> PResult<Expr> {
        let token = self.peek();
        let op = match token.kind {
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Bang => UnaryOp::Not,
            _ => return self.parse_postfix(),
        };
        self.advance();
        let operand = self.parse_unary()?;
        self.unary(op, operand, token.span)
    }

    /// Field access and indexing.
    fn parse_postfix(&mut self) -> PResult<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            let token = self.peek();
            match token.kind {
                TokenKind::Dot => {
                    self.advance();
                    let field = self.expect_ident()?;
                    expr = self.field(expr, field.lexeme, field.span)?;
                }
                TokenKind::LeftBracket => {
                    self.advance();
                    let index = self.parse_expression()?;
                    self.expect(TokenKind::RightBracket)?;
                    expr = self.index(expr, index, token.span)?;
                }
                _ => return Ok(expr),
            }
        }
    }

    fn parse_primary(&mut self) -> PResult<Expr> {
        let token = self.peek();
        match token.kind {
            TokenKind::IntLiteral => {
                self.advance();
                match token.lexeme.parse::<i64>() {
                    Ok(v) => Ok(self.literal(Literal::Int(v), token.span)),
                    Err(err) => self.syntax_error(ParseError::new(
                        ParseErrorKind::InvalidLiteral,
                        token.span,
                        format!("invalid integer literal '{}': {err}", token.lexeme),
                    )),
                }
            }
            TokenKind::FloatLiteral => {
                self.advance();
                match token.lexeme.parse::<f64>() {
                    Ok(v) => Ok(self.literal(Literal::Float(v), token.span)),
                    Err(err) => self.syntax_error(ParseError::new(
                        ParseErrorKind::InvalidLiteral,
                        token.span,
                        format!("invalid float literal '{}': {err}", token.lexeme),
                    )),
                }
            }
            TokenKind::StringLiteral => {
                self.advance();
                Ok(self.literal(Literal::Str(token.lexeme.to_string()), token.span))
            }
            TokenKind::True | TokenKind::False => {
                self.advance();
                Ok(Expr::literal(
                    Literal::Bool(token.kind == TokenKind::True),
                    token.span,
                ))
            }
            TokenKind::None => {
                self.advance();
                Ok(Expr::literal(Literal::None, token.span))
            }
            TokenKind::LeftParen => {
                self.advance();
                let inner = self.parse_expression()?;
                self.expect(TokenKind::RightParen)?;
                Ok(inner)
            }
            TokenKind::LeftBracket => self.parse_collection(false),
            TokenKind::LeftBrace => self.parse_collection(true),
            TokenKind::Match => self.parse_match_expression(),
            // Conversion calls spelled with a type keyword.
            TokenKind::Int | TokenKind::Float if self.peek_nth(1).kind == TokenKind::LeftParen => {
                self.advance();
                self.parse_call(token.lexeme, token.span)
            }
            TokenKind::Identifier => self.parse_identifier(),
            TokenKind::Eof => self.syntax_error(ParseError::unexpected_eof(token.span)),
            _ => self.syntax_error(ParseError::expected_expression(
                token.span,
                token.kind.description(),
            )),
        }
    }

    fn parse_identifier(&mut self) -> PResult<Expr> {
        let token = self.advance();
        let name = token.lexeme;
        let span = token.span;
        if self.check(TokenKind::LeftParen) {
            return self.parse_call(name, span);
        }

        if let Some((var, storage)) = self.scopes.lookup_variable_mut(name) {
            let ty = var.data_type.clone();
            let initialized = var.is_initialized();
            if !initialized {
                self.semantic(SemanticError::UninitializedRead {
                    name: name.to_string(),
                    span,
                })?;
            }
            return Ok(Expr::new(
                ExprKind::Variable {
                    name: name.to_string(),
                    storage,
                },
                ty,
                span,
            ));
        }

        match self.scopes.lookup(name) {
            Some(Symbol::Struct(_)) if self.check(TokenKind::LeftBrace) => {
                self.parse_struct_literal(name, span)
            }
            Some(Symbol::Enum(symbol)) => {
                let symbol = symbol.clone();
                let ordinal = if self.check(TokenKind::Dot) {
                    self.advance();
                    let variant = self.expect_ident()?;
                    match symbol.ordinal(variant.lexeme) {
                        Some(ordinal) => Ok(ordinal),
                        None => Err(SemanticError::UnknownVariant {
                            enum_name: name.to_string(),
                            variant: variant.lexeme.to_string(),
                            span: variant.span,
                        }),
                    }
                } else {
                    Err(SemanticError::other(
                        span,
                        format!("enum '{name}' used as a value, expected '{name}.Variant'"),
                    ))
                };
                match ordinal {
                    Ok(ordinal) => Ok(Expr::new(
                        ExprKind::EnumVariant {
                            name: name.to_string(),
                            ordinal,
                        },
                        DataType::Enum(name.to_string()),
                        span,
                    )),
                    Err(err) => {
                        self.semantic(err)?;
                        Ok(Expr::error(span))
                    }
                }
            }
            Some(Symbol::Struct(_)) => {
                self.semantic(SemanticError::other(
                    span,
                    format!("struct '{name}' used as a value"),
                ))?;
                Ok(Expr::error(span))
            }
            Some(Symbol::Functions(_)) => {
                self.semantic(SemanticError::other(
                    span,
                    format!("function '{name}' used as a value"),
                ))?;
                Ok(Expr::error(span))
            }
            Some(Symbol::Variable(_)) | None => {
                self.semantic(SemanticError::UnknownVariable {
                    name: name.to_string(),
                    span,
                })?;
                Ok(Expr::error(span))
            }
        }
    }

    // ==========================================================================
    // Calls
    // ==========================================================================

    fn parse_call(&mut self, name: &str, span: Span) -> PResult<Expr> {
        self.expect(TokenKind::LeftParen)?;
        let mut args = Vec::new();
        while !self.check(TokenKind::RightParen) {
            args.push(self.parse_expression()?);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RightParen)?;

        let Some(Symbol::Functions(bucket)) = self.scopes.lookup(name) else {
            self.semantic(SemanticError::UnknownFunction {
                name: name.to_string(),
                span,
            })?;
            return Ok(Expr::error(span));
        };
        if args.iter().any(|a| a.ty.is_unknown()) {
            return Ok(Expr::error(span));
        }
        let arg_types: Vec<DataType> = args.iter().map(|a| a.ty.clone()).collect();
        let (target, return_type) = match resolve_overload(name, bucket, &arg_types, span) {
            Ok(symbol) => (symbol.target, symbol.return_type.clone()),
            Err(err) => {
                self.semantic(err)?;
                return Ok(Expr::error(span));
            }
        };

        match target {
            CallTarget::User(function) => Ok(Expr::new(
                ExprKind::Call { function, args },
                return_type,
                span,
            )),
            CallTarget::Builtin(builtin) => {
                let refined = match refine_generic(builtin, &arg_types, return_type, span) {
                    Ok(refined) => refined,
                    Err(err) => {
                        self.semantic(err)?;
                        return Ok(Expr::error(span));
                    }
                };
                if let Some(completed) = refined.completed {
                    self.complete_argument(&mut args[0], completed);
                }
                Ok(Expr::new(
                    ExprKind::BuiltinCall { builtin, args },
                    refined.return_type,
                    span,
                ))
            }
        }
    }

    /// Record a collection type completed by `append`/`add` on the variable
    /// it was read from.
    fn complete_argument(&mut self, arg: &mut Expr, completed: DataType) {
        if let ExprKind::Variable { name, .. } = &arg.kind
            && let Some((var, _)) = self.scopes.lookup_variable_mut(name)
        {
            var.data_type.try_complete_from(&completed);
        }
        arg.ty.try_complete_from(&completed);
    }

    // ==========================================================================
    // Aggregates
    // ==========================================================================

    /// `[a, b]` or `{a, b}`.
    fn parse_collection(&mut self, is_set: bool) -> PResult<Expr> {
        let open = self.advance();
        let close = if is_set {
            TokenKind::RightBrace
        } else {
            TokenKind::RightBracket
        };
        let mut items = Vec::new();
        let mut element = DataType::Unknown;
        let mut poisoned = false;
        while !self.check(close) {
            let item = self.parse_expression()?;
            if item.ty.is_unknown() {
                poisoned = true;
            } else if element.is_unknown() {
                element = item.ty.clone();
            } else if let Some(common) = element.common_with(&item.ty) {
                element = common;
            } else {
                self.semantic(SemanticError::TypeMismatch {
                    target: element.clone(),
                    source_type: item.ty.clone(),
                    span: item.span,
                })?;
                poisoned = true;
            }
            items.push(item);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(close)?;

        if poisoned {
            return Ok(Expr::error(open.span));
        }
        if is_set {
            if element.is_complete() && !element.is_hashable() {
                self.semantic(SemanticError::other(
                    open.span,
                    format!("'{element}' values cannot be stored in a set"),
                ))?;
                return Ok(Expr::error(open.span));
            }
            Ok(Expr::new(ExprKind::Set(items), DataType::set(element), open.span))
        } else {
            Ok(Expr::new(ExprKind::List(items), DataType::list(element), open.span))
        }
    }

    /// `Name { field: value, ... }`; every field must be given once.
    fn parse_struct_literal(&mut self, name: &str, span: Span) -> PResult<Expr> {
        let fields = match self.scopes.lookup(name) {
            Some(Symbol::Struct(symbol)) => symbol.fields.clone(),
            _ => Vec::new(),
        };
        self.expect(TokenKind::LeftBrace)?;
        let mut values: Vec<Option<Expr>> = vec![None; fields.len()];
        let mut ok = true;
        while !self.check(TokenKind::RightBrace) {
            let field = self.expect_ident()?;
            self.expect(TokenKind::Colon)?;
            let value = self.parse_expression()?;
            match fields.iter().position(|(n, _)| n == field.lexeme) {
                None => {
                    self.semantic(SemanticError::UnknownField {
                        type_name: name.to_string(),
                        field: field.lexeme.to_string(),
                        span: field.span,
                    })?;
                    ok = false;
                }
                Some(i) if values[i].is_some() => {
                    self.semantic(SemanticError::other(
                        field.span,
                        format!("field '{}' given twice", field.lexeme),
                    ))?;
                    ok = false;
                }
                Some(i) => {
                    let expected = &fields[i].1;
                    if !value.ty.is_unknown() && !expected.can_be_assigned(&value.ty) {
                        self.semantic(SemanticError::TypeMismatch {
                            target: expected.clone(),
                            source_type: value.ty.clone(),
                            span: value.span,
                        })?;
                        ok = false;
                    }
                    values[i] = Some(value);
                }
            }
            if !self.eat(TokenKind::Comma) {
                self.eat_terminator();
            }
        }
        self.expect(TokenKind::RightBrace)?;

        let mut exprs = Vec::with_capacity(values.len());
        for (value, (field, _)) in values.into_iter().zip(&fields) {
            match value {
                Some(value) => exprs.push(value),
                None => {
                    self.semantic(SemanticError::other(
                        span,
                        format!("missing field '{field}' in '{name}' literal"),
                    ))?;
                    ok = false;
                }
            }
        }
        if !ok {
            return Ok(Expr::error(span));
        }
        Ok(Expr::new(
            ExprKind::StructLiteral {
                name: name.to_string(),
                fields: exprs,
            },
            DataType::Object(name.to_string()),
            span,
        ))
    }

    /// `match (v) { p => e, ..., default => e }` used as a value.
    fn parse_match_expression(&mut self) -> PResult<Expr> {
        let keyword = self.expect(TokenKind::Match)?;
        let scrutinee = self.parse_expression()?;
        self.expect(TokenKind::LeftBrace)?;
        let mut arms = Vec::new();
        let mut default: Option<Expr> = None;
        let mut result = DataType::Unknown;
        let mut poisoned = scrutinee.ty.is_unknown();
        while !self.check(TokenKind::RightBrace) && !self.is_eof() {
            let pattern = if self.eat(TokenKind::Default) {
                None
            } else {
                let pattern = self.parse_expression()?;
                poisoned |= !self.check_pattern(&scrutinee, &pattern)?;
                Some(pattern)
            };
            self.expect(TokenKind::FatArrow)?;
            let value = self.parse_expression()?;

            if value.ty.is_unknown() {
                poisoned = true;
            } else if result.is_unknown() {
                result = value.ty.clone();
            } else if let Some(common) = result.common_with(&value.ty) {
                result = common;
            } else {
                self.semantic(SemanticError::TypeMismatch {
                    target: result.clone(),
                    source_type: value.ty.clone(),
                    span: value.span,
                })?;
                poisoned = true;
            }

            match pattern {
                Some(pattern) => arms.push((pattern, value)),
                None if default.is_some() => {
                    self.semantic(SemanticError::other(value.span, "duplicate 'default' arm"))?;
                }
                None => default = Some(value),
            }
            if !self.eat(TokenKind::Comma) {
                self.eat_terminator();
            }
        }
        self.expect(TokenKind::RightBrace)?;

        let Some(default) = default else {
            self.semantic(SemanticError::other(
                keyword.span,
                "match expression needs a 'default' arm",
            ))?;
            return Ok(Expr::error(keyword.span));
        };
        if poisoned {
            return Ok(Expr::error(keyword.span));
        }
        Ok(Expr::new(
            ExprKind::Match(Box::new(MatchExpr {
                scrutinee,
                arms,
                default,
            })),
            result,
            keyword.span,
        ))
    }

    /// Report a match pattern that cannot be compared with the scrutinee.
    pub(super) fn check_pattern(&mut self, scrutinee: &Expr, pattern: &Expr) -> PResult<bool> {
        if binary_result(BinaryOp::Equal, &scrutinee.ty, &pattern.ty).is_some() {
            return Ok(!pattern.ty.is_unknown());
        }
        self.semantic(SemanticError::InvalidOperands {
            op: BinaryOp::Equal.as_str(),
            left: scrutinee.ty.clone(),
            right: pattern.ty.clone(),
            span: pattern.span,
        })?;
        Ok(false)
    }

    // ==========================================================================
    // Node construction
    // ==========================================================================

    /// A literal node whose value is counted in the constant harvest.
    pub(super) fn literal(&mut self, lit: Literal, span: Span) -> Expr {
        self.constants.retain(&lit);
        Expr::literal(lit, span)
    }

    /// Count every literal of a duplicated subtree.
    pub(super) fn retain_literals(&mut self, expr: &Expr) {
        let constants = &mut self.constants;
        expr.for_each_literal(&mut |lit| constants.retain(lit));
    }

    pub(super) fn binary(&mut self, op: BinaryOp, left: Expr, right: Expr, span: Span) -> PResult<Expr> {
        let Some(ty) = binary_result(op, &left.ty, &right.ty) else {
            self.semantic(SemanticError::InvalidOperands {
                op: op.as_str(),
                left: left.ty.clone(),
                right: right.ty.clone(),
                span,
            })?;
            return Ok(Expr::error(span));
        };
        if let (Some(a), Some(b)) = (left.as_literal(), right.as_literal())
            && let Some(folded) = fold_binary(op, a, b)
        {
            self.constants.release(a);
            self.constants.release(b);
            return Ok(self.literal(folded, span));
        }
        Ok(Expr::new(
            ExprKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            ty,
            span,
        ))
    }

    pub(super) fn unary(&mut self, op: UnaryOp, operand: Expr, span: Span) -> PResult<Expr> {
        let Some(ty) = unary_result(op, &operand.ty) else {
            self.semantic(SemanticError::InvalidUnaryOperand {
                op: op.as_str(),
                operand: operand.ty.clone(),
                span,
            })?;
            return Ok(Expr::error(span));
        };
        if let Some(lit) = operand.as_literal()
            && let Some(folded) = fold_unary(op, lit)
        {
            self.constants.release(lit);
            return Ok(self.literal(folded, span));
        }
        Ok(Expr::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            ty,
            span,
        ))
    }

    fn ternary(&mut self, condition: Expr, then: Expr, otherwise: Expr, span: Span) -> PResult<Expr> {
        if !condition.ty.is_unknown() && condition.ty != DataType::Bool {
            self.semantic(SemanticError::TypeMismatch {
                target: DataType::Bool,
                source_type: condition.ty.clone(),
                span: condition.span,
            })?;
            return Ok(Expr::error(span));
        }
        if condition.ty.is_unknown() || then.ty.is_unknown() || otherwise.ty.is_unknown() {
            return Ok(Expr::error(span));
        }
        let Some(ty) = then.ty.common_with(&otherwise.ty) else {
            self.semantic(SemanticError::TypeMismatch {
                target: then.ty.clone(),
                source_type: otherwise.ty.clone(),
                span: otherwise.span,
            })?;
            return Ok(Expr::error(span));
        };
        Ok(Expr::new(
            ExprKind::Ternary {
                condition: Box::new(condition),
                then: Box::new(then),
                otherwise: Box::new(otherwise),
            },
            ty,
            span,
        ))
    }

    fn unwrap_or(&mut self, value: Expr, default: Expr, span: Span) -> PResult<Expr> {
        if value.ty.is_unknown() || default.ty.is_unknown() {
            return Ok(Expr::error(span));
        }
        let DataType::Option(inner) = &value.ty else {
            self.semantic(SemanticError::other(
                span,
                format!("'??' needs an optional value, found '{}'", value.ty),
            ))?;
            return Ok(Expr::error(span));
        };
        let ty = if inner.can_be_assigned(&default.ty) {
            (**inner).clone()
        } else if value.ty.can_be_assigned(&default.ty) {
            value.ty.clone()
        } else {
            self.semantic(SemanticError::TypeMismatch {
                target: (**inner).clone(),
                source_type: default.ty.clone(),
                span: default.span,
            })?;
            return Ok(Expr::error(span));
        };
        Ok(Expr::new(
            ExprKind::Unwrap {
                value: Box::new(value),
                default: Box::new(default),
            },
            ty,
            span,
        ))
    }

    fn field(&mut self, object: Expr, name: &str, span: Span) -> PResult<Expr> {
        if object.ty.is_unknown() {
            return Ok(Expr::error(span));
        }
        let found = match &object.ty {
            DataType::Object(type_name) => match self.scopes.lookup(type_name) {
                Some(Symbol::Struct(symbol)) => symbol.field(name).map(|(i, ty)| (i, ty.clone())),
                _ => None,
            },
            _ => None,
        };
        let Some((index, ty)) = found else {
            self.semantic(SemanticError::UnknownField {
                type_name: object.ty.to_string(),
                field: name.to_string(),
                span,
            })?;
            return Ok(Expr::error(span));
        };
        Ok(Expr::new(
            ExprKind::Field {
                object: Box::new(object),
                index,
            },
            ty,
            span,
        ))
    }

    fn index(&mut self, target: Expr, index: Expr, span: Span) -> PResult<Expr> {
        if target.ty.is_unknown() || index.ty.is_unknown() {
            return Ok(Expr::error(span));
        }
        let element = match &target.ty {
            DataType::List(element) if element.is_unknown() => {
                self.semantic(SemanticError::IncompleteType {
                    found: target.ty.clone(),
                    span,
                })?;
                return Ok(Expr::error(span));
            }
            DataType::List(element) => (**element).clone(),
            DataType::String => DataType::String,
            other => {
                self.semantic(SemanticError::other(
                    span,
                    format!("cannot index a value of type '{other}'"),
                ))?;
                return Ok(Expr::error(span));
            }
        };
        if index.ty != DataType::Int {
            self.semantic(SemanticError::TypeMismatch {
                target: DataType::Int,
                source_type: index.ty.clone(),
                span: index.span,
            })?;
            return Ok(Expr::error(span));
        }
        Ok(Expr::new(
            ExprKind::Index {
                target: Box::new(target),
                index: Box::new(index),
            },
            element,
            span,
        ))
    }
}
