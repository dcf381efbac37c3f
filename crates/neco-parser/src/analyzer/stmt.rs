//! Statement parsing, declarations and loop desugaring.

use neco_core::{DataType, ParseError, SemanticError, Span};

use super::scope::ScopeKind;
use super::symbol::{Symbol, VarFlags};
use super::{Analyzer, Interrupt, PResult};
use crate::ast::{Block, Expr, ExprKind, Literal, Place, Stmt, StmtKind, UnaryOp};
use crate::lexer::TokenKind;

impl Analyzer<'_, '_> {
    pub(super) fn parse_program(&mut self) -> PResult<()> {
        while !self.is_eof() {
            if let Some(stmt) = self.parse_statement_recovering()? {
                self.body.push(stmt);
            }
        }
        Ok(())
    }

    /// Parse one statement; a syntax error skips to the next statement
    /// boundary instead of unwinding further.
    fn parse_statement_recovering(&mut self) -> PResult<Option<Stmt>> {
        let start = self.pos;
        match self.parse_statement() {
            Ok(stmt) => Ok(stmt),
            Err(Interrupt::Syntax) => {
                self.synchronize(start);
                Ok(None)
            }
            Err(Interrupt::Abort) => Err(Interrupt::Abort),
        }
    }

    /// `None` for items and for statements dropped after an error.
    fn parse_statement(&mut self) -> PResult<Option<Stmt>> {
        let token = self.peek();
        let stmt = match token.kind {
            TokenKind::Fn | TokenKind::Struct | TokenKind::Enum => {
                self.parse_item()?;
                return Ok(None);
            }
            TokenKind::LeftBrace => {
                let block = self.parse_block()?;
                Some(Stmt::new(StmtKind::Block(block), token.span))
            }
            TokenKind::If => Some(self.parse_if()?),
            TokenKind::While => Some(self.parse_while()?),
            TokenKind::For => Some(self.parse_for()?),
            TokenKind::Loop => Some(self.parse_loop()?),
            TokenKind::Match => Some(self.parse_match_statement()?),
            TokenKind::Return => self.parse_return()?,
            TokenKind::Break | TokenKind::Continue => self.parse_jump()?,
            TokenKind::Exit => Some(self.parse_exit()?),
            _ if self.at_declaration() => Some(self.parse_declaration()?),
            _ => Some(self.parse_simple_statement()?),
        };
        self.eat_terminator();
        Ok(stmt)
    }

    // ==========================================================================
    // Items
    // ==========================================================================

    /// `fn`, `struct` or `enum`. The prescan registered top-level items;
    /// here function bodies are analyzed and everything else is skipped.
    fn parse_item(&mut self) -> PResult<()> {
        let start = self.pos;
        let keyword = self.peek();
        if !self.scopes.is_global() {
            let what = match keyword.kind {
                TokenKind::Fn => "functions",
                TokenKind::Struct => "structs",
                _ => "enums",
            };
            self.semantic(SemanticError::NestedDefinition {
                what,
                span: keyword.span,
            })?;
            self.skip_item();
            return Ok(());
        }

        if keyword.kind == TokenKind::Fn {
            self.parse_function_body(start)?;
        }
        match self.item_ends.get(&start) {
            Some(&end) => self.pos = end,
            None => self.skip_item(),
        }
        Ok(())
    }

    fn parse_function_body(&mut self, start: usize) -> PResult<()> {
        let Some(header) = self.headers.get(&start).cloned() else {
            return Ok(());
        };
        self.pos = header.body_start;
        self.scopes.push(ScopeKind::Function);
        for param in &header.params {
            if let Err(err) = self.scopes.declare_variable(
                &param.name,
                param.ty.clone(),
                VarFlags::INITIALIZED,
                param.span,
            ) {
                if let Err(abort) = self.semantic(err) {
                    self.scopes.pop();
                    return Err(abort);
                }
            }
        }
        let saved_return = self.return_type.replace(header.return_type.clone());
        let saved_loops = std::mem::replace(&mut self.loop_depth, 0);

        let result = self.parse_block_contents();

        self.loop_depth = saved_loops;
        self.return_type = saved_return;
        self.scopes.pop();

        let stmts = match result {
            Ok(stmts) => stmts,
            Err(Interrupt::Syntax) => Vec::new(),
            Err(Interrupt::Abort) => return Err(Interrupt::Abort),
        };
        if let Some(function) = self.functions.get_mut(usize::from(header.index)) {
            function.body = Block::new(stmts, false);
        }
        Ok(())
    }

    // ==========================================================================
    // Blocks
    // ==========================================================================

    /// `{ ... }` in its own scope.
    pub(super) fn parse_block(&mut self) -> PResult<Block> {
        self.scopes.push(ScopeKind::Block);
        let result = self.parse_block_contents();
        let scoped = self
            .scopes
            .pop()
            .is_some_and(|scope| scope.declared_locals());
        Ok(Block::new(result?, scoped))
    }

    fn parse_block_contents(&mut self) -> PResult<Vec<Stmt>> {
        self.expect(TokenKind::LeftBrace)?;
        let mut stmts = Vec::new();
        while !self.check(TokenKind::RightBrace) && !self.is_eof() {
            if let Some(stmt) = self.parse_statement_recovering()? {
                stmts.push(stmt);
            }
        }
        self.expect(TokenKind::RightBrace)?;
        Ok(stmts)
    }

    /// A block, or a single statement wrapped in one.
    fn parse_arm_body(&mut self) -> PResult<Block> {
        if self.check(TokenKind::LeftBrace) {
            return self.parse_block();
        }
        self.scopes.push(ScopeKind::Block);
        let result = self.parse_statement();
        let scoped = self
            .scopes
            .pop()
            .is_some_and(|scope| scope.declared_locals());
        Ok(Block::new(result?.into_iter().collect(), scoped))
    }

    fn parse_loop_body(&mut self) -> PResult<Block> {
        self.loop_depth += 1;
        let body = self.parse_block();
        self.loop_depth -= 1;
        body
    }

    // ==========================================================================
    // Declarations and assignments
    // ==========================================================================

    /// `type name [= value]`, `var name = value`, `const [type] name = value`.
    fn parse_declaration(&mut self) -> PResult<Stmt> {
        let start = self.peek();
        let constant = self.eat(TokenKind::Const);
        let inferred = constant
            && self.check(TokenKind::Identifier)
            && self.peek_nth(1).kind == TokenKind::Equal;
        let declared = if inferred {
            DataType::Unknown
        } else {
            self.parse_type()?
        };
        let name = self.expect_ident()?;
        let init = if self.eat(TokenKind::Equal) {
            Some(self.parse_expression()?)
        } else {
            None
        };

        let ty = match &init {
            Some(init) => self.initialized_type(declared, init)?,
            None => {
                if constant {
                    self.semantic(SemanticError::other(
                        name.span,
                        format!("constant '{}' needs a value", name.lexeme),
                    ))?;
                } else if !declared.is_complete() {
                    self.semantic(SemanticError::IncompleteType {
                        found: declared.clone(),
                        span: name.span,
                    })?;
                }
                declared
            }
        };

        let mut flags = VarFlags::empty();
        flags.set(VarFlags::INITIALIZED, init.is_some());
        flags.set(VarFlags::CONSTANT, constant);
        let slot = match self
            .scopes
            .declare_variable(name.lexeme, ty.clone(), flags, name.span)
        {
            Ok(slot) => slot,
            Err(err) => {
                self.semantic(err)?;
                0
            }
        };
        Ok(Stmt::new(
            StmtKind::VarDecl {
                name: name.lexeme.to_string(),
                slot,
                ty,
                init,
            },
            start.span,
        ))
    }

    /// Check an initializer against the annotation and complete the
    /// annotation's missing parts from it.
    fn initialized_type(&mut self, declared: DataType, init: &Expr) -> PResult<DataType> {
        if init.ty.is_unknown() {
            return Ok(declared);
        }
        if declared.is_unknown() {
            return Ok(init.ty.clone());
        }
        let mut ty = declared;
        if !ty.is_complete() && !ty.can_be_assigned(&init.ty) {
            // `List<var>` against `List<int>`: complete first, then check.
            let mut completed = ty.clone();
            completed.try_complete_from(&init.ty);
            ty = completed;
        }
        if !ty.can_be_assigned(&init.ty) {
            self.semantic(SemanticError::TypeMismatch {
                target: ty.clone(),
                source_type: init.ty.clone(),
                span: init.span,
            })?;
            return Ok(ty);
        }
        ty.try_complete_from(&init.ty);
        Ok(ty)
    }

    /// Assignment, compound assignment or an expression evaluated for its
    /// effects.
    fn parse_simple_statement(&mut self) -> PResult<Stmt> {
        let start = self.peek();
        if start.kind == TokenKind::Identifier && self.peek_nth(1).kind == TokenKind::Equal {
            self.advance();
            self.advance();
            let value = self.parse_expression()?;
            return self.assign_variable(start.lexeme, start.span, value);
        }

        let target = self.parse_expression()?;
        let op_token = self.peek();
        if op_token.kind == TokenKind::Equal {
            self.advance();
            let value = self.parse_expression()?;
            return self.assign_place(target, value, op_token.span);
        }
        if let Some(op) = crate::ast::BinaryOp::from_compound(op_token.kind) {
            self.advance();
            let rhs = self.parse_expression()?;
            let read = target.clone();
            self.retain_literals(&read);
            let value = self.binary(op, read, rhs, op_token.span)?;
            return self.assign_place(target, value, op_token.span);
        }
        Ok(Stmt::new(StmtKind::Expr(target), start.span))
    }

    /// `name = value`. The target may still be uninitialized.
    fn assign_variable(&mut self, name: &str, span: Span, value: Expr) -> PResult<Stmt> {
        let error = match self.scopes.lookup_variable_mut(name) {
            Some((var, storage)) => {
                let error = if var.is_constant() {
                    Some(SemanticError::AssignToConstant {
                        name: name.to_string(),
                        span,
                    })
                } else {
                    check_assignment(&mut var.data_type, &value)
                };
                var.flags.insert(VarFlags::INITIALIZED);
                if error.is_none() {
                    return Ok(Stmt::new(
                        StmtKind::Assign {
                            place: Place::Variable(storage),
                            value,
                        },
                        span,
                    ));
                }
                error
            }
            None => Some(match self.scopes.lookup(name) {
                Some(Symbol::Variable(_)) | None => SemanticError::UnknownVariable {
                    name: name.to_string(),
                    span,
                },
                Some(_) => SemanticError::NotAssignable { span },
            }),
        };
        if let Some(err) = error {
            self.semantic(err)?;
        }
        Ok(Stmt::new(StmtKind::Expr(Expr::error(span)), span))
    }

    /// `target = value` where the target was parsed as an expression.
    fn assign_place(&mut self, target: Expr, value: Expr, span: Span) -> PResult<Stmt> {
        if target.ty.is_unknown() {
            return Ok(Stmt::new(StmtKind::Expr(Expr::error(span)), span));
        }
        let place = match target.kind {
            ExprKind::Variable { name, .. } => {
                return self.assign_variable(&name, target.span, value);
            }
            ExprKind::Field { object, index } => Place::Field {
                object: *object,
                index,
            },
            ExprKind::Index { target: list, index } if matches!(list.ty, DataType::List(_)) => {
                Place::Index {
                    target: *list,
                    index: *index,
                }
            }
            _ => {
                self.semantic(SemanticError::NotAssignable { span: target.span })?;
                return Ok(Stmt::new(StmtKind::Expr(Expr::error(span)), span));
            }
        };
        let mut ty = target.ty;
        if let Some(err) = check_assignment(&mut ty, &value) {
            self.semantic(err)?;
        }
        Ok(Stmt::new(StmtKind::Assign { place, value }, span))
    }

    // ==========================================================================
    // Control flow
    // ==========================================================================

    fn parse_condition(&mut self) -> PResult<Expr> {
        let condition = self.parse_expression()?;
        if !condition.ty.is_unknown() && condition.ty != DataType::Bool {
            self.semantic(SemanticError::TypeMismatch {
                target: DataType::Bool,
                source_type: condition.ty.clone(),
                span: condition.span,
            })?;
        }
        Ok(condition)
    }

    /// `if c {..} else if c {..} else {..}` as one chain.
    fn parse_if(&mut self) -> PResult<Stmt> {
        let keyword = self.expect(TokenKind::If)?;
        let mut branches = Vec::new();
        let mut otherwise = None;
        loop {
            let condition = self.parse_condition()?;
            let body = self.parse_block()?;
            branches.push((condition, body));
            if !self.eat(TokenKind::Else) {
                break;
            }
            if !self.eat(TokenKind::If) {
                otherwise = Some(self.parse_block()?);
                break;
            }
        }
        Ok(Stmt::new(StmtKind::If { branches, otherwise }, keyword.span))
    }

    /// `while c {..}` becomes `loop { if !c { break } .. }`.
    fn parse_while(&mut self) -> PResult<Stmt> {
        let keyword = self.expect(TokenKind::While)?;
        let condition = self.parse_condition()?;
        let body = self.parse_loop_body()?;
        let body = self.guarded_body(condition, body)?;
        Ok(Stmt::new(StmtKind::Loop { body, step: None }, keyword.span))
    }

    /// `for (init; c; step) {..}` becomes
    /// `{ init; loop { if !c { break } .. } step }` with `continue` running
    /// the step.
    fn parse_for(&mut self) -> PResult<Stmt> {
        let keyword = self.expect(TokenKind::For)?;
        self.scopes.push(ScopeKind::Block);
        let result = self.parse_for_parts(keyword.span);
        let scoped = self
            .scopes
            .pop()
            .is_some_and(|scope| scope.declared_locals());
        let (init, looped) = result?;
        let stmts = init.into_iter().chain(std::iter::once(looped)).collect();
        Ok(Stmt::new(
            StmtKind::Block(Block::new(stmts, scoped)),
            keyword.span,
        ))
    }

    fn parse_for_parts(&mut self, span: Span) -> PResult<(Option<Stmt>, Stmt)> {
        self.expect(TokenKind::LeftParen)?;
        let init = if self.check(TokenKind::Semicolon) {
            None
        } else if self.at_declaration() {
            Some(self.parse_declaration()?)
        } else {
            Some(self.parse_simple_statement()?)
        };
        self.expect(TokenKind::Semicolon)?;
        let condition = if self.check(TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_condition()?)
        };
        self.expect(TokenKind::Semicolon)?;
        let step = if self.check(TokenKind::RightParen) {
            None
        } else {
            Some(Box::new(self.parse_simple_statement()?))
        };
        self.expect(TokenKind::RightParen)?;

        let body = self.parse_loop_body()?;
        let body = match condition {
            Some(condition) => self.guarded_body(condition, body)?,
            None => body,
        };
        Ok((init, Stmt::new(StmtKind::Loop { body, step }, span)))
    }

    /// Prefix a loop body with `if !condition { break }`.
    fn guarded_body(&mut self, condition: Expr, body: Block) -> PResult<Block> {
        let span = condition.span;
        let mut stmts = Vec::with_capacity(body.stmts.len() + 1);
        if condition.as_literal() != Some(&Literal::Bool(true)) {
            let negated = self.unary(UnaryOp::Not, condition, span)?;
            stmts.push(Stmt::new(
                StmtKind::If {
                    branches: vec![(negated, Block::new(vec![Stmt::new(StmtKind::Break, span)], false))],
                    otherwise: None,
                },
                span,
            ));
        }
        if body.scoped {
            stmts.push(Stmt::new(StmtKind::Block(body), span));
        } else {
            stmts.extend(body.stmts);
        }
        Ok(Block::new(stmts, false))
    }

    fn parse_loop(&mut self) -> PResult<Stmt> {
        let keyword = self.expect(TokenKind::Loop)?;
        let body = self.parse_loop_body()?;
        Ok(Stmt::new(StmtKind::Loop { body, step: None }, keyword.span))
    }

    /// `match v { p => body ... default => body }`; arm bodies are blocks or
    /// single statements.
    fn parse_match_statement(&mut self) -> PResult<Stmt> {
        let keyword = self.expect(TokenKind::Match)?;
        let scrutinee = self.parse_expression()?;
        self.expect(TokenKind::LeftBrace)?;
        let mut arms = Vec::new();
        let mut default: Option<Block> = None;
        while !self.check(TokenKind::RightBrace) && !self.is_eof() {
            let arm = self.peek();
            if self.eat(TokenKind::Default) {
                self.expect(TokenKind::FatArrow)?;
                let body = self.parse_arm_body()?;
                if default.is_some() {
                    self.semantic(SemanticError::other(arm.span, "duplicate 'default' arm"))?;
                } else {
                    default = Some(body);
                }
            } else {
                let pattern = self.parse_expression()?;
                self.check_pattern(&scrutinee, &pattern)?;
                self.expect(TokenKind::FatArrow)?;
                let body = self.parse_arm_body()?;
                arms.push((pattern, body));
            }
            self.eat(TokenKind::Comma);
            self.eat_terminator();
        }
        self.expect(TokenKind::RightBrace)?;
        Ok(Stmt::new(
            StmtKind::Match {
                scrutinee,
                arms,
                default,
            },
            keyword.span,
        ))
    }

    fn parse_return(&mut self) -> PResult<Option<Stmt>> {
        let keyword = self.expect(TokenKind::Return)?;
        let value = if matches!(
            self.peek().kind,
            TokenKind::RightBrace | TokenKind::Semicolon | TokenKind::Eof
        ) {
            Expr::literal(Literal::None, keyword.span)
        } else {
            self.parse_expression()?
        };
        let Some(expected) = self.return_type.clone() else {
            self.semantic(SemanticError::ReturnOutsideFunction { span: keyword.span })?;
            return Ok(None);
        };
        if !value.ty.is_unknown() && !expected.can_be_assigned(&value.ty) {
            self.semantic(SemanticError::TypeMismatch {
                target: expected,
                source_type: value.ty.clone(),
                span: value.span,
            })?;
        }
        Ok(Some(Stmt::new(StmtKind::Return(value), keyword.span)))
    }

    fn parse_jump(&mut self) -> PResult<Option<Stmt>> {
        let token = self.advance();
        let (kind, keyword) = if token.kind == TokenKind::Break {
            (StmtKind::Break, "break")
        } else {
            (StmtKind::Continue, "continue")
        };
        if self.loop_depth == 0 {
            self.semantic(SemanticError::OutsideLoop {
                keyword,
                span: token.span,
            })?;
            return Ok(None);
        }
        Ok(Some(Stmt::new(kind, token.span)))
    }

    /// `exit(code)`
    fn parse_exit(&mut self) -> PResult<Stmt> {
        let keyword = self.expect(TokenKind::Exit)?;
        if !self.check(TokenKind::LeftParen) {
            let found = self.peek();
            return self.syntax_error(ParseError::expected_token(
                found.span,
                "'('",
                found.kind.description(),
            ));
        }
        let code = self.parse_expression()?;
        if !code.ty.is_unknown() && code.ty != DataType::Int {
            self.semantic(SemanticError::TypeMismatch {
                target: DataType::Int,
                source_type: code.ty.clone(),
                span: code.span,
            })?;
        }
        Ok(Stmt::new(StmtKind::Exit(code), keyword.span))
    }
}

/// Check `value` against a destination type, completing an incomplete
/// destination from it.
fn check_assignment(target: &mut DataType, value: &Expr) -> Option<SemanticError> {
    if value.ty.is_unknown() || target.is_unknown() {
        return None;
    }
    if !target.can_be_assigned(&value.ty) {
        return Some(SemanticError::TypeMismatch {
            target: target.clone(),
            source_type: value.ty.clone(),
            span: value.span,
        });
    }
    target.try_complete_from(&value.ty);
    None
}
