use std::{fmt, ops::Range};

use crate::lexer;

#[derive(Copy, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Token {
        Token { kind, span }
    }

    pub fn span(&self) -> Span {
        self.span
    }

    pub fn line(&self) -> u32 {
        self.span.line
    }

    pub fn column(&self) -> u32 {
        self.span.column
    }

    /// Returns the source text covered by this token.
    pub fn lexeme<'src>(&self, src: &'src str) -> &'src str {
        self.span.substr(src)
    }

    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({:?}, {})", self.kind, self.span)
    }
}

/// A region of the source. Besides the byte bounds, a span remembers the
/// 1-based line and column of its first character.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct Span {
    pub lo: usize,
    pub len: u32,
    pub line: u32,
    pub column: u32,
}

impl Span {
    pub fn new_of_bounds(Range { start: lo, end: hi }: Range<usize>, line: u32, column: u32) -> Span {
        debug_assert!(hi >= lo);
        let len = u32::try_from(hi - lo).expect("token length exceeds u32");
        Span {
            lo,
            len,
            line,
            column,
        }
    }

    pub fn hi(&self) -> usize {
        self.lo + self.len as usize
    }

    pub fn range(&self) -> Range<usize> {
        self.lo..self.hi()
    }

    pub fn substr<'src>(&self, src: &'src str) -> &'src str {
        &src[self.range()]
    }

    /// Returns a span with the provided increments on each bound. The
    /// position (line and column) is shifted along with the lower bound.
    pub fn offset(&self, lo: isize, hi: isize) -> Span {
        let new_lo = self.lo.checked_add_signed(lo).unwrap();
        let new_hi = self.hi().checked_add_signed(hi).unwrap();
        let column = self.column.checked_add_signed(lo as i32).unwrap();
        Span::new_of_bounds(new_lo..new_hi, self.line, column)
    }

    /// Joins two spans, from the start of `self` to the end of `other`.
    pub fn to(self, other: Span) -> Span {
        Span::new_of_bounds(self.lo..other.hi().max(self.lo), self.line, self.column)
    }

    pub fn wrap<T>(self, inner: T) -> Spanned<T> {
        Spanned { span: self, inner }
    }

    pub fn position(&self) -> Position {
        Position {
            line: self.line,
            column: self.column,
        }
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Span({self}, at {})", self.position())
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lo = self.lo;
        let hi = self.hi();
        write!(f, "{lo}..{hi}")
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Spanned<T> {
    pub span: Span,
    pub inner: T,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TokenKind {
    Number,
    String,
    True,
    False,
    Null,

    Identifier,
    Var,
    Func,
    Return,
    If,
    Else,
    While,
    For,
    Break,
    Continue,
    Import,

    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    /// `=`
    Equal,
    /// `==`
    EqualEqual,
    /// `!=`
    BangEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    /// `&&`
    AndAnd,
    /// `||`
    OrOr,
    Bang,
    /// `&`
    Amp,
    /// `|`
    Pipe,
    /// `^`
    Caret,
    Tilde,
    /// `<<`
    Shl,
    /// `>>`
    Shr,
    PlusEqual,
    MinusEqual,
    StarEqual,
    SlashEqual,
    /// `++`
    Increment,
    /// `--`
    Decrement,

    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Dot,
    Colon,
    Semicolon,
    /// `->`
    Arrow,

    Newline,
    Eof,
    Error(lexer::Error),
}

impl TokenKind {
    pub fn is_error(&self) -> bool {
        matches!(self, TokenKind::Error(_))
    }

    /// Trivia tokens never reach the parser.
    pub fn is_trivia(&self) -> bool {
        matches!(self, TokenKind::Newline)
    }
}

pub static KEYWORDS: phf::Map<&'static str, TokenKind> = phf::phf_map! {
    "var" => TokenKind::Var,
    "func" => TokenKind::Func,
    "return" => TokenKind::Return,
    "if" => TokenKind::If,
    "else" => TokenKind::Else,
    "while" => TokenKind::While,
    "for" => TokenKind::For,
    "break" => TokenKind::Break,
    "continue" => TokenKind::Continue,
    "import" => TokenKind::Import,
    "true" => TokenKind::True,
    "false" => TokenKind::False,
    "null" => TokenKind::Null,
};
