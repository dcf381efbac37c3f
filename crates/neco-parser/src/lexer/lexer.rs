//! Character-classifying tokenizer.
//!
//! The [`Lexer`] converts source text into [`Token`]s, dispatching on the
//! first character. Lexemes are copied into a `bumpalo` arena so the source
//! string may be dropped once tokenizing completes.

use bumpalo::Bump;
use bumpalo::collections::String as BumpString;
use neco_core::{LexError, Span};

use super::cursor::{Cursor, is_ident_continue, is_ident_start};
use super::token::{Token, TokenKind, lookup_keyword};

/// Tokenize a whole source string.
///
/// Returns every token followed by a final [`TokenKind::Eof`], plus the
/// errors found on the way. Spans the lexer could not tokenize are left out
/// of the token list.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn tokenize<'ast>(source: &str, arena: &'ast Bump) -> (Vec<Token<'ast>>, Vec<LexError>) {
    let mut lexer = Lexer::new(source, arena);
    let mut tokens = Vec::with_capacity(source.len() / 4);
    loop {
        let token = lexer.next_token();
        match token.kind {
            TokenKind::Error => continue,
            TokenKind::Eof => {
                tokens.push(token);
                break;
            }
            _ => tokens.push(token),
        }
    }
    (tokens, lexer.take_errors())
}

pub struct Lexer<'src, 'ast> {
    cursor: Cursor<'src>,
    arena: &'ast Bump,
    errors: Vec<LexError>,
}

impl<'src, 'ast> Lexer<'src, 'ast> {
    pub fn new(source: &'src str, arena: &'ast Bump) -> Self {
        Self {
            cursor: Cursor::new(source),
            arena,
            errors: Vec::new(),
        }
    }

    pub fn take_errors(&mut self) -> Vec<LexError> {
        std::mem::take(&mut self.errors)
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Scan and return the next token. Returns `Eof` forever at the end.
    pub fn next_token(&mut self) -> Token<'ast> {
        if let Some(error) = self.skip_trivia() {
            return self.make_error(error);
        }

        let start = Start {
            line: self.cursor.line(),
            col: self.cursor.column(),
            offset: self.cursor.offset(),
        };

        let Some(c) = self.cursor.peek() else {
            return Token::new(TokenKind::Eof, "", Span::point(start.line, start.col));
        };

        match c {
            '"' => self.scan_string(start),
            c if c.is_ascii_digit() => self.scan_number(start),
            c if is_ident_start(c) => self.scan_identifier(start),
            _ => self.scan_operator(start),
        }
    }

    /// Skip whitespace and comments. Reports an unterminated block comment.
    fn skip_trivia(&mut self) -> Option<LexError> {
        loop {
            self.cursor.eat_while(|c| c.is_whitespace());
            if self.cursor.check_str("//") {
                self.cursor.eat_while(|c| c != '\n');
            } else if self.cursor.check_str("/*") {
                let span = Span::new(self.cursor.line(), self.cursor.column(), 2);
                self.cursor.advance();
                self.cursor.advance();
                loop {
                    if self.cursor.is_eof() {
                        return Some(LexError::UnterminatedComment { span });
                    }
                    if self.cursor.check_str("*/") {
                        self.cursor.advance();
                        self.cursor.advance();
                        break;
                    }
                    self.cursor.advance();
                }
            } else {
                return None;
            }
        }
    }

    fn span_from(&self, start: Start) -> Span {
        Span::new(
            start.line,
            start.col,
            (self.cursor.offset() - start.offset) as u32,
        )
    }

    fn make_token(&self, kind: TokenKind, start: Start) -> Token<'ast> {
        let lexeme = self.arena.alloc_str(self.cursor.slice_from(start.offset));
        Token::new(kind, lexeme, self.span_from(start))
    }

    fn make_error(&mut self, error: LexError) -> Token<'ast> {
        let span = error.span();
        self.errors.push(error);
        Token::new(TokenKind::Error, "", span)
    }

    /// Scan a string literal. The token's lexeme is the decoded value.
    fn scan_string(&mut self, start: Start) -> Token<'ast> {
        self.cursor.advance();
        let mut value = BumpString::new_in(self.arena);
        let mut bad_escape = None;

        loop {
            match self.cursor.peek() {
                None | Some('\n') => {
                    let span = self.span_from(start);
                    return self.make_error(LexError::UnterminatedString { span });
                }
                Some('"') => {
                    self.cursor.advance();
                    break;
                }
                Some('\\') => {
                    let escape_span = Span::new(self.cursor.line(), self.cursor.column(), 2);
                    self.cursor.advance();
                    let Some(esc) = self.cursor.advance() else {
                        continue;
                    };
                    match esc {
                        'n' => value.push('\n'),
                        't' => value.push('\t'),
                        'r' => value.push('\r'),
                        '\\' => value.push('\\'),
                        '"' => value.push('"'),
                        other => {
                            bad_escape.get_or_insert(LexError::InvalidEscape {
                                ch: other,
                                span: escape_span,
                            });
                        }
                    }
                }
                Some(c) => {
                    self.cursor.advance();
                    value.push(c);
                }
            }
        }

        if let Some(error) = bad_escape {
            return self.make_error(error);
        }
        Token::new(
            TokenKind::StringLiteral,
            value.into_bump_str(),
            self.span_from(start),
        )
    }

    /// Scan an integer or float literal.
    fn scan_number(&mut self, start: Start) -> Token<'ast> {
        self.cursor.eat_while(|c| c.is_ascii_digit());
        let mut is_float = false;

        if self.cursor.peek() == Some('.') && self.cursor.peek_nth(1).is_some_and(|c| c.is_ascii_digit())
        {
            is_float = true;
            self.cursor.advance();
            self.cursor.eat_while(|c| c.is_ascii_digit());
        }

        if matches!(self.cursor.peek(), Some('e' | 'E')) {
            let digits_at = match self.cursor.peek_nth(1) {
                Some('+' | '-') => 2,
                _ => 1,
            };
            if self.cursor.peek_nth(digits_at).is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                for _ in 0..digits_at {
                    self.cursor.advance();
                }
                self.cursor.eat_while(|c| c.is_ascii_digit());
            }
        }

        let text = self.cursor.slice_from(start.offset);
        if is_float {
            if text.parse::<f64>().is_err() {
                let span = self.span_from(start);
                return self.make_error(LexError::InvalidNumber {
                    span,
                    detail: format!("'{text}' is not a float"),
                });
            }
            self.make_token(TokenKind::FloatLiteral, start)
        } else {
            if text.parse::<i64>().is_err() {
                let span = self.span_from(start);
                return self.make_error(LexError::InvalidNumber {
                    span,
                    detail: format!("'{text}' does not fit in a 64-bit integer"),
                });
            }
            self.make_token(TokenKind::IntLiteral, start)
        }
    }

    fn scan_identifier(&mut self, start: Start) -> Token<'ast> {
        let ident = self.cursor.eat_while(is_ident_continue);
        let kind = lookup_keyword(ident).unwrap_or(TokenKind::Identifier);
        self.make_token(kind, start)
    }

    fn scan_operator(&mut self, start: Start) -> Token<'ast> {
        let Some(c) = self.cursor.advance() else {
            return Token::new(TokenKind::Eof, "", Span::point(start.line, start.col));
        };

        let kind = match c {
            '+' => self.pick('=', TokenKind::PlusEqual, TokenKind::Plus),
            '-' if self.cursor.eat('>') => TokenKind::Arrow,
            '-' => self.pick('=', TokenKind::MinusEqual, TokenKind::Minus),
            '*' if self.cursor.eat('*') => TokenKind::StarStar,
            '*' => self.pick('=', TokenKind::StarEqual, TokenKind::Star),
            '/' => self.pick('=', TokenKind::SlashEqual, TokenKind::Slash),
            '%' => self.pick('=', TokenKind::PercentEqual, TokenKind::Percent),
            '!' => self.pick('=', TokenKind::BangEqual, TokenKind::Bang),
            '=' if self.cursor.eat('>') => TokenKind::FatArrow,
            '=' => self.pick('=', TokenKind::EqualEqual, TokenKind::Equal),
            '<' => self.pick('=', TokenKind::LessEqual, TokenKind::Less),
            '>' => self.pick('=', TokenKind::GreaterEqual, TokenKind::Greater),
            '?' => self.pick('?', TokenKind::QuestionQuestion, TokenKind::Question),
            '&' if self.cursor.eat('&') => TokenKind::AmpAmp,
            '|' if self.cursor.eat('|') => TokenKind::PipePipe,
            '.' => TokenKind::Dot,
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            ';' => TokenKind::Semicolon,
            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            '{' => TokenKind::LeftBrace,
            '}' => TokenKind::RightBrace,
            '[' => TokenKind::LeftBracket,
            ']' => TokenKind::RightBracket,
            other => {
                let span = self.span_from(start);
                return self.make_error(LexError::UnexpectedChar { ch: other, span });
            }
        };

        self.make_token(kind, start)
    }

    #[inline]
    fn pick(&mut self, next: char, matched: TokenKind, otherwise: TokenKind) -> TokenKind {
        if self.cursor.eat(next) {
            matched
        } else {
            otherwise
        }
    }
}

#[derive(Clone, Copy)]
struct Start {
    line: u32,
    col: u32,
    offset: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let arena = Bump::new();
        let (tokens, errors) = tokenize(source, &arena);
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
        tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn empty_source_is_just_eof() {
        assert_eq!(kinds("  \n\t "), vec![TokenKind::Eof]);
    }

    #[test]
    fn keywords_and_identifiers() {
        assert_eq!(
            kinds("fn add var List printLine"),
            vec![
                TokenKind::Fn,
                TokenKind::Identifier,
                TokenKind::Var,
                TokenKind::List,
                TokenKind::Identifier,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn numbers() {
        let arena = Bump::new();
        let (tokens, _) = tokenize("42 3.14 1e3 7.", &arena);
        let got: Vec<_> = tokens.iter().map(|t| (t.kind, t.lexeme)).collect();
        assert_eq!(
            got,
            vec![
                (TokenKind::IntLiteral, "42"),
                (TokenKind::FloatLiteral, "3.14"),
                (TokenKind::FloatLiteral, "1e3"),
                (TokenKind::IntLiteral, "7"),
                (TokenKind::Dot, "."),
                (TokenKind::Eof, ""),
            ]
        );
    }

    #[test]
    fn integer_overflow_is_reported() {
        let arena = Bump::new();
        let (_, errors) = tokenize("99999999999999999999", &arena);
        assert!(matches!(errors[0], LexError::InvalidNumber { .. }));
    }

    #[test]
    fn string_escapes_are_decoded() {
        let arena = Bump::new();
        let (tokens, errors) = tokenize(r#""a\tb\n\"q\"""#, &arena);
        assert!(errors.is_empty());
        assert_eq!(tokens[0].kind, TokenKind::StringLiteral);
        assert_eq!(tokens[0].lexeme, "a\tb\n\"q\"");
    }

    #[test]
    fn nul_escape_is_rejected() {
        let arena = Bump::new();
        let (tokens, errors) = tokenize(r#""a\0" x"#, &arena);
        assert!(matches!(errors[0], LexError::InvalidEscape { ch: '0', .. }));
        assert_eq!(tokens[0].kind, TokenKind::Identifier);
    }

    #[test]
    fn unterminated_string() {
        let arena = Bump::new();
        let (_, errors) = tokenize("\"abc\nint", &arena);
        assert!(matches!(errors[0], LexError::UnterminatedString { .. }));
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(
            kinds("a // line\n /* block\n */ b"),
            vec![TokenKind::Identifier, TokenKind::Identifier, TokenKind::Eof]
        );
    }

    #[test]
    fn unterminated_comment() {
        let arena = Bump::new();
        let (_, errors) = tokenize("a /* never", &arena);
        assert!(matches!(errors[0], LexError::UnterminatedComment { .. }));
    }

    #[test]
    fn multi_char_operators() {
        assert_eq!(
            kinds("** ?? -> => == != <= >= && || += %="),
            vec![
                TokenKind::StarStar,
                TokenKind::QuestionQuestion,
                TokenKind::Arrow,
                TokenKind::FatArrow,
                TokenKind::EqualEqual,
                TokenKind::BangEqual,
                TokenKind::LessEqual,
                TokenKind::GreaterEqual,
                TokenKind::AmpAmp,
                TokenKind::PipePipe,
                TokenKind::PlusEqual,
                TokenKind::PercentEqual,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn unexpected_character_is_skipped() {
        let arena = Bump::new();
        let (tokens, errors) = tokenize("a @ b", &arena);
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], LexError::UnexpectedChar { ch: '@', .. }));
        assert_eq!(tokens.len(), 3);
    }

    #[test]
    fn spans_track_lines() {
        let arena = Bump::new();
        let (tokens, _) = tokenize("a\n  bb", &arena);
        assert_eq!(tokens[1].span, Span::new(2, 3, 2));
    }
}
