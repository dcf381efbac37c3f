//! Token types for the NeCo tokenizer.

use neco_core::Span;
use std::fmt;

/// A token from the source code.
///
/// The lexeme lives in the arena passed to the lexer, so the source string
/// may be dropped once tokenizing is done. For string literals the lexeme is
/// the decoded value (quotes removed, escapes resolved).
#[derive(Clone, Copy, PartialEq)]
pub struct Token<'ast> {
    pub kind: TokenKind,
    pub lexeme: &'ast str,
    pub span: Span,
}

impl<'ast> Token<'ast> {
    #[inline]
    pub fn new(kind: TokenKind, lexeme: &'ast str, span: Span) -> Self {
        Self { kind, lexeme, span }
    }
}

impl fmt::Debug for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({:?} @ {:?})", self.kind, self.lexeme, self.span)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Literals
    IntLiteral,
    FloatLiteral,
    StringLiteral,
    Identifier,

    // Type keywords
    Bool,
    Int,
    Float,
    String,
    Any,
    Var,
    List,
    Set,
    Option,

    // Value keywords
    True,
    False,
    None,

    // Control flow
    If,
    Else,
    While,
    For,
    Loop,
    Break,
    Continue,
    Return,
    Match,
    Default,
    Exit,

    // Declarations
    Fn,
    Struct,
    Enum,
    Const,

    // Word operators
    And,
    Or,
    In,

    // Operators
    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    Percent,
    Bang,
    Equal,
    EqualEqual,
    BangEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    AmpAmp,
    PipePipe,
    PlusEqual,
    MinusEqual,
    StarEqual,
    SlashEqual,
    PercentEqual,
    Question,
    QuestionQuestion,
    Arrow,
    FatArrow,

    // Punctuation
    Dot,
    Comma,
    Colon,
    Semicolon,
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,

    Eof,
    /// Placeholder for a span the lexer could not tokenize.
    Error,
}

impl TokenKind {
    /// Keywords that name a type and may start a declaration.
    pub fn is_type_keyword(self) -> bool {
        matches!(
            self,
            TokenKind::Bool
                | TokenKind::Int
                | TokenKind::Float
                | TokenKind::String
                | TokenKind::Any
                | TokenKind::None
                | TokenKind::Var
                | TokenKind::List
                | TokenKind::Set
                | TokenKind::Option
        )
    }

    pub fn is_literal(self) -> bool {
        matches!(
            self,
            TokenKind::IntLiteral
                | TokenKind::FloatLiteral
                | TokenKind::StringLiteral
                | TokenKind::True
                | TokenKind::False
                | TokenKind::None
        )
    }

    /// Compound assignment operators.
    pub fn is_compound_assign(self) -> bool {
        matches!(
            self,
            TokenKind::PlusEqual
                | TokenKind::MinusEqual
                | TokenKind::StarEqual
                | TokenKind::SlashEqual
                | TokenKind::PercentEqual
        )
    }

    pub fn description(self) -> &'static str {
        match self {
            TokenKind::IntLiteral => "integer literal",
            TokenKind::FloatLiteral => "float literal",
            TokenKind::StringLiteral => "string literal",
            TokenKind::Identifier => "identifier",
            TokenKind::Bool => "'bool'",
            TokenKind::Int => "'int'",
            TokenKind::Float => "'float'",
            TokenKind::String => "'string'",
            TokenKind::Any => "'any'",
            TokenKind::Var => "'var'",
            TokenKind::List => "'List'",
            TokenKind::Set => "'Set'",
            TokenKind::Option => "'Option'",
            TokenKind::True => "'true'",
            TokenKind::False => "'false'",
            TokenKind::None => "'none'",
            TokenKind::If => "'if'",
            TokenKind::Else => "'else'",
            TokenKind::While => "'while'",
            TokenKind::For => "'for'",
            TokenKind::Loop => "'loop'",
            TokenKind::Break => "'break'",
            TokenKind::Continue => "'continue'",
            TokenKind::Return => "'return'",
            TokenKind::Match => "'match'",
            TokenKind::Default => "'default'",
            TokenKind::Exit => "'exit'",
            TokenKind::Fn => "'fn'",
            TokenKind::Struct => "'struct'",
            TokenKind::Enum => "'enum'",
            TokenKind::Const => "'const'",
            TokenKind::And => "'and'",
            TokenKind::Or => "'or'",
            TokenKind::In => "'in'",
            TokenKind::Plus => "'+'",
            TokenKind::Minus => "'-'",
            TokenKind::Star => "'*'",
            TokenKind::StarStar => "'**'",
            TokenKind::Slash => "'/'",
            TokenKind::Percent => "'%'",
            TokenKind::Bang => "'!'",
            TokenKind::Equal => "'='",
            TokenKind::EqualEqual => "'=='",
            TokenKind::BangEqual => "'!='",
            TokenKind::Less => "'<'",
            TokenKind::LessEqual => "'<='",
            TokenKind::Greater => "'>'",
            TokenKind::GreaterEqual => "'>='",
            TokenKind::AmpAmp => "'&&'",
            TokenKind::PipePipe => "'||'",
            TokenKind::PlusEqual => "'+='",
            TokenKind::MinusEqual => "'-='",
            TokenKind::StarEqual => "'*='",
            TokenKind::SlashEqual => "'/='",
            TokenKind::PercentEqual => "'%='",
            TokenKind::Question => "'?'",
            TokenKind::QuestionQuestion => "'??'",
            TokenKind::Arrow => "'->'",
            TokenKind::FatArrow => "'=>'",
            TokenKind::Dot => "'.'",
            TokenKind::Comma => "','",
            TokenKind::Colon => "':'",
            TokenKind::Semicolon => "';'",
            TokenKind::LeftParen => "'('",
            TokenKind::RightParen => "')'",
            TokenKind::LeftBrace => "'{'",
            TokenKind::RightBrace => "'}'",
            TokenKind::LeftBracket => "'['",
            TokenKind::RightBracket => "']'",
            TokenKind::Eof => "end of file",
            TokenKind::Error => "invalid token",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Map an identifier to its keyword kind, if it is one.
pub fn lookup_keyword(ident: &str) -> Option<TokenKind> {
    let kind = match ident {
        "bool" => TokenKind::Bool,
        "int" => TokenKind::Int,
        "float" => TokenKind::Float,
        "string" => TokenKind::String,
        "any" => TokenKind::Any,
        "var" => TokenKind::Var,
        "List" => TokenKind::List,
        "Set" => TokenKind::Set,
        "Option" => TokenKind::Option,
        "true" => TokenKind::True,
        "false" => TokenKind::False,
        "none" => TokenKind::None,
        "if" => TokenKind::If,
        "else" => TokenKind::Else,
        "while" => TokenKind::While,
        "for" => TokenKind::For,
        "loop" => TokenKind::Loop,
        "break" => TokenKind::Break,
        "continue" => TokenKind::Continue,
        "return" => TokenKind::Return,
        "match" => TokenKind::Match,
        "default" => TokenKind::Default,
        "exit" => TokenKind::Exit,
        "fn" => TokenKind::Fn,
        "struct" => TokenKind::Struct,
        "enum" => TokenKind::Enum,
        "const" => TokenKind::Const,
        "and" => TokenKind::And,
        "or" => TokenKind::Or,
        "in" => TokenKind::In,
        _ => return None,
    };
    Some(kind)
}
