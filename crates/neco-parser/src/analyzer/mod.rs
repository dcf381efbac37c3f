//! Combined parser and semantic analyzer.
//!
//! One pass over the token stream builds a fully typed [`Script`] while
//! resolving scopes, overloads and constant folding. A prescan registers
//! enums, structs and function headers first so that forward references
//! resolve without a link stage.
//!
//! Errors are reported into [`Diagnostics`] and analysis continues:
//! - syntax errors unwind to the enclosing statement, which resynchronizes;
//! - semantic errors produce `Unknown`-typed nodes and parsing goes on;
//! - once the cumulative error count passes the ceiling the whole phase
//!   returns [`TooManyErrors`].

mod builtins;
mod expr;
mod fold;
mod overload;
mod prescan;
mod scope;
mod stmt;
mod symbol;
mod types;

pub use overload::resolve_overload;
pub use scope::{ScopeKind, ScopeStack};
pub use symbol::{
    CallTarget, EnumSymbol, FunctionBucket, FunctionSymbol, StructSymbol, Symbol, VarFlags,
    VariableSymbol,
};

use neco_core::{DataType, Diagnostics, ParseError, SemanticError, Span, TooManyErrors};
use rustc_hash::FxHashMap;

use crate::ast::{ConstantHarvest, Function, Param, Script};
use crate::lexer::{Token, TokenKind};

/// Why parsing of the current construct stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Interrupt {
    /// A syntax error was reported; the statement level resynchronizes.
    Syntax,
    /// The error ceiling was exceeded.
    Abort,
}

impl From<TooManyErrors> for Interrupt {
    fn from(_: TooManyErrors) -> Self {
        Interrupt::Abort
    }
}

pub(crate) type PResult<T> = Result<T, Interrupt>;

/// A function header registered by the prescan.
#[derive(Debug, Clone)]
struct FnHeader {
    index: u16,
    params: Vec<Param>,
    return_type: DataType,
    /// Token index of the body's opening brace.
    body_start: usize,
}

/// Analyze a token stream ending in `Eof`.
///
/// Returns the script even when errors were reported; check
/// [`Diagnostics::has_errors`] before generating code from it.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn analyze(tokens: Vec<Token<'_>>, diagnostics: &mut Diagnostics) -> Result<Script, TooManyErrors> {
    let mut analyzer = Analyzer::new(tokens, diagnostics)?;
    analyzer.prescan()?;
    match analyzer.parse_program() {
        Ok(()) | Err(Interrupt::Syntax) => {}
        Err(Interrupt::Abort) => {
            return Err(TooManyErrors {
                limit: analyzer.diagnostics.limit(),
            });
        }
    }
    Ok(analyzer.finish())
}

pub(crate) struct Analyzer<'d, 'ast> {
    tokens: Vec<Token<'ast>>,
    pos: usize,
    diagnostics: &'d mut Diagnostics,
    scopes: ScopeStack,
    constants: ConstantHarvest,
    functions: Vec<Function>,
    body: Vec<crate::ast::Stmt>,
    /// `fn` token index to prescanned header.
    headers: FxHashMap<usize, FnHeader>,
    /// Item keyword token index to the token index just past the item.
    item_ends: FxHashMap<usize, usize>,
    loop_depth: u32,
    /// Declared return type of the function being parsed.
    return_type: Option<DataType>,
}

impl<'d, 'ast> Analyzer<'d, 'ast> {
    fn new(mut tokens: Vec<Token<'ast>>, diagnostics: &'d mut Diagnostics) -> Result<Self, TooManyErrors> {
        if tokens.last().is_none_or(|t| t.kind != TokenKind::Eof) {
            let end = tokens.last().map(|t| t.span).unwrap_or(Span::point(1, 1));
            tokens.push(Token::new(TokenKind::Eof, "", end));
        }
        let mut scopes = ScopeStack::new();
        if let Err(err) = builtins::register(&mut scopes) {
            diagnostics.report(err)?;
        }
        Ok(Self {
            tokens,
            pos: 0,
            diagnostics,
            scopes,
            constants: ConstantHarvest::new(),
            functions: Vec::new(),
            body: Vec::new(),
            headers: FxHashMap::default(),
            item_ends: FxHashMap::default(),
            loop_depth: 0,
            return_type: None,
        })
    }

    fn finish(self) -> Script {
        let first_line = self.tokens.first().map(|t| t.span.line).unwrap_or(1);
        Script {
            body: self.body,
            functions: self.functions,
            constants: self.constants,
            first_line,
        }
    }

    // ==========================================================================
    // Token access
    // ==========================================================================

    #[inline]
    fn peek(&self) -> Token<'ast> {
        self.peek_nth(0)
    }

    #[inline]
    fn peek_nth(&self, n: usize) -> Token<'ast> {
        let last = self.tokens.len() - 1;
        self.tokens[(self.pos + n).min(last)]
    }

    #[inline]
    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    #[inline]
    fn is_eof(&self) -> bool {
        self.check(TokenKind::Eof)
    }

    fn advance(&mut self) -> Token<'ast> {
        let token = self.peek();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> PResult<Token<'ast>> {
        if self.check(kind) {
            return Ok(self.advance());
        }
        let found = self.peek();
        let err = if found.kind == TokenKind::Eof {
            ParseError::unexpected_eof(found.span)
        } else {
            ParseError::expected_token(found.span, kind.description(), found.kind.description())
        };
        self.syntax_error(err)
    }

    fn expect_ident(&mut self) -> PResult<Token<'ast>> {
        if self.check(TokenKind::Identifier) {
            return Ok(self.advance());
        }
        let found = self.peek();
        self.syntax_error(ParseError::expected_identifier(
            found.span,
            found.kind.description(),
        ))
    }

    /// Optional statement terminator.
    fn eat_terminator(&mut self) {
        while self.eat(TokenKind::Semicolon) {}
    }

    // ==========================================================================
    // Error reporting
    // ==========================================================================

    fn syntax_error<T>(&mut self, err: ParseError) -> PResult<T> {
        self.diagnostics.report(err)?;
        Err(Interrupt::Syntax)
    }

    fn semantic(&mut self, err: SemanticError) -> PResult<()> {
        self.diagnostics.report(err)?;
        Ok(())
    }

    /// Skip tokens up to a plausible statement boundary: a `;`, a closing
    /// brace, a statement keyword, or the first token on a later line.
    fn synchronize(&mut self, start: usize) {
        if self.pos == start {
            self.advance();
        }
        let line = self.tokens[self.pos.saturating_sub(1)].span.line;
        let mut depth = 0usize;
        loop {
            let token = self.peek();
            match token.kind {
                TokenKind::Eof => return,
                TokenKind::Semicolon if depth == 0 => {
                    self.advance();
                    return;
                }
                TokenKind::RightBrace if depth == 0 => return,
                TokenKind::RightBrace => depth -= 1,
                TokenKind::LeftBrace => depth += 1,
                k if depth == 0 && (starts_statement(k) || token.span.line > line) => return,
                _ => {}
            }
            self.advance();
        }
    }

    /// Skip a braced item starting at the current token: everything up to
    /// and including the brace matching the first `{`.
    fn skip_item(&mut self) {
        while !self.is_eof() && !self.check(TokenKind::LeftBrace) {
            self.advance();
        }
        self.skip_braces();
    }

    /// Skip from a `{` to just past its matching `}`.
    fn skip_braces(&mut self) {
        let mut depth = 0usize;
        loop {
            match self.advance().kind {
                TokenKind::Eof => return,
                TokenKind::LeftBrace => depth += 1,
                TokenKind::RightBrace => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return;
                    }
                }
                _ => {}
            }
        }
    }

    // ==========================================================================
    // Type annotations
    // ==========================================================================

    /// Whether the current position starts a type annotation followed by a
    /// declared name.
    fn at_declaration(&self) -> bool {
        let kind = self.peek().kind;
        if matches!(kind, TokenKind::Var | TokenKind::Const) {
            return true;
        }
        if kind.is_type_keyword() && kind != TokenKind::None {
            // `int(` and `float(` are conversion calls.
            return self.peek_nth(1).kind != TokenKind::LeftParen;
        }
        if kind == TokenKind::Identifier
            && matches!(
                self.scopes.lookup(self.peek().lexeme),
                Some(Symbol::Struct(_) | Symbol::Enum(_))
            )
        {
            return matches!(
                self.peek_nth(1).kind,
                TokenKind::Identifier | TokenKind::Question
            );
        }
        false
    }

    /// Parse a type annotation. `var` yields `Unknown`.
    fn parse_type(&mut self) -> PResult<DataType> {
        let token = self.advance();
        let mut ty = match token.kind {
            TokenKind::Var => DataType::Unknown,
            TokenKind::Bool => DataType::Bool,
            TokenKind::Int => DataType::Int,
            TokenKind::Float => DataType::Float,
            TokenKind::String => DataType::String,
            TokenKind::Any => DataType::Any,
            TokenKind::None => DataType::None,
            TokenKind::List | TokenKind::Set | TokenKind::Option => {
                self.expect(TokenKind::Less)?;
                let inner = self.parse_type()?;
                self.expect(TokenKind::Greater)?;
                match token.kind {
                    TokenKind::List => DataType::list(inner),
                    TokenKind::Set => DataType::set(inner),
                    _ => DataType::option(inner),
                }
            }
            TokenKind::Identifier => match self.scopes.lookup(token.lexeme) {
                Some(Symbol::Struct(_)) => DataType::Object(token.lexeme.to_string()),
                Some(Symbol::Enum(_)) => DataType::Enum(token.lexeme.to_string()),
                _ => {
                    self.semantic(SemanticError::UnknownType {
                        name: token.lexeme.to_string(),
                        span: token.span,
                    })?;
                    DataType::Unknown
                }
            },
            _ => {
                return self.syntax_error(ParseError::expected_type(
                    token.span,
                    token.kind.description(),
                ));
            }
        };
        while self.check(TokenKind::Question) && !ty.is_unknown() {
            self.advance();
            ty = DataType::option(ty);
        }
        if let DataType::Set(element) = &ty
            && element.is_complete()
            && !element.is_hashable()
        {
            self.semantic(SemanticError::other(
                token.span,
                format!("'{element}' values cannot be stored in a set"),
            ))?;
        }
        Ok(ty)
    }
}

fn starts_statement(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::If
            | TokenKind::While
            | TokenKind::For
            | TokenKind::Loop
            | TokenKind::Match
            | TokenKind::Return
            | TokenKind::Break
            | TokenKind::Continue
            | TokenKind::Exit
            | TokenKind::Fn
            | TokenKind::Struct
            | TokenKind::Enum
            | TokenKind::Var
            | TokenKind::Const
    )
}

#[cfg(test)]
pub(crate) mod test_support {
    use bumpalo::Bump;
    use neco_core::Diagnostics;

    use crate::ast::Script;
    use crate::lexer::tokenize;

    /// Analyze source, returning the script and the rendered diagnostics.
    pub fn analyze_source(source: &str) -> (Script, Vec<String>) {
        let arena = Bump::new();
        let (tokens, lex_errors) = tokenize(source, &arena);
        let mut diagnostics = Diagnostics::new();
        for err in lex_errors {
            let _ = diagnostics.report(err);
        }
        let script = super::analyze(tokens, &mut diagnostics).unwrap_or_default();
        let messages = diagnostics.iter().map(|d| d.to_string()).collect();
        (script, messages)
    }

    /// Analyze source that must be error free.
    pub fn analyze_ok(source: &str) -> Script {
        let (script, errors) = analyze_source(source);
        assert!(errors.is_empty(), "unexpected diagnostics: {errors:#?}");
        script
    }
}
