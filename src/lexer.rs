use std::{fmt, iter::Peekable, num::ParseFloatError};

use crate::{
    token::{Span, Token, TokenKind, KEYWORDS},
    util::BreakableIteratorExt,
};

pub const SUGGESTED_TOKENS_CAPACITY: usize = 8_192;

/// Lexes the provided string, producing the tokens into the provided buffer.
///
/// Every token is produced, including newlines, up to (and including) the
/// end-of-file token.
pub fn lex(src: &str, tokens: &mut Vec<Token>) {
    assert_eq!(tokens.len(), 0, "must pass clean tokens buffer");
    tokens.extend(Lexer::new(src).up_to(Token::is_eof));
    log::debug!("lexed {} tokens from {} bytes", tokens.len(), src.len());
}

/// A convenience function that allocates a new buffer per lexed input and
/// returns it.
pub fn lex_in_new(src: &str) -> Vec<Token> {
    let mut tokens = Vec::with_capacity(SUGGESTED_TOKENS_CAPACITY);
    lex(src, &mut tokens);
    tokens
}

/// The meow lexer.
///
/// Tokens are produced lazily, one per call to [`Lexer::next_token`]. Once the
/// input is exhausted, the lexer keeps producing [`TokenKind::Eof`].
pub struct Lexer<'src> {
    src: &'src str,
    iter: Peekable<std::str::Chars<'src>>,
    cursor: usize,
    line: u32,
    column: u32,
    current_lo: usize,
    current_line: u32,
    current_column: u32,
}

impl Lexer<'_> {
    pub fn new(src: &str) -> Lexer<'_> {
        Lexer {
            src,
            iter: src.chars().peekable(),
            cursor: 0,
            line: 1,
            column: 1,
            current_lo: 0,
            current_line: 1,
            current_column: 1,
        }
    }

    /// Scans the next token.
    pub fn next_token(&mut self) -> Token {
        self.skip_blanks();
        let kind = self.scan_token_kind();
        self.produce(kind)
    }

    /// Tries to scan the current character.
    fn scan_token_kind(&mut self) -> TokenKind {
        use TokenKind::*;
        if self.is_at_end() {
            self.mark();
            return Eof;
        }
        match self.mark_advance() {
            '\n' => Newline,
            '(' => LParen,
            ')' => RParen,
            '{' => LBrace,
            '}' => RBrace,
            '[' => LBracket,
            ']' => RBracket,
            ',' => Comma,
            '.' => Dot,
            ':' => Colon,
            ';' => Semicolon,
            '%' => Percent,
            '^' => Caret,
            '~' => Tilde,
            '+' => match self.peek() {
                '+' => self.advance_with(Increment),
                '=' => self.advance_with(PlusEqual),
                _ => Plus,
            },
            '-' => match self.peek() {
                '-' => self.advance_with(Decrement),
                '=' => self.advance_with(MinusEqual),
                '>' => self.advance_with(Arrow),
                _ => Minus,
            },
            '*' => match self.peek() {
                '=' => self.advance_with(StarEqual),
                _ => Star,
            },
            '/' => match self.peek() {
                '=' => self.advance_with(SlashEqual),
                _ => Slash,
            },
            '=' => match self.peek() {
                '=' => self.advance_with(EqualEqual),
                _ => Equal,
            },
            '!' => match self.peek() {
                '=' => self.advance_with(BangEqual),
                _ => Bang,
            },
            '<' => match self.peek() {
                '<' => self.advance_with(Shl),
                '=' => self.advance_with(LessEqual),
                _ => Less,
            },
            '>' => match self.peek() {
                '>' => self.advance_with(Shr),
                '=' => self.advance_with(GreaterEqual),
                _ => Greater,
            },
            '&' => match self.peek() {
                '&' => self.advance_with(AndAnd),
                _ => Amp,
            },
            '|' => match self.peek() {
                '|' => self.advance_with(OrOr),
                _ => Pipe,
            },
            quote @ ('"' | '\'') => self.string(quote),
            c if c.is_ascii_alphabetic() || c == '_' => self.identifier_or_keyword(),
            c if c.is_ascii_digit() => self.number(),
            _ => Error(self::Error::UnexpectedChar),
        }
    }

    /// Skips spaces, tabs, carriage returns and comments. Newlines are left
    /// in place since they are produced as tokens.
    fn skip_blanks(&mut self) {
        loop {
            match self.peek() {
                ' ' | '\t' | '\r' => {
                    self.advance();
                }
                '/' if self.rest().starts_with("//") => {
                    while !self.is_at_end() && self.peek() != '\n' {
                        self.advance();
                    }
                }
                '/' if self.rest().starts_with("/*") => {
                    self.advance();
                    self.advance();
                    // An unclosed comment silently runs until the end.
                    while !self.is_at_end() && !self.rest().starts_with("*/") {
                        self.advance();
                    }
                    if !self.is_at_end() {
                        self.advance();
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    /// Lexes a string delimited by `quote`. A backslash escapes the character
    /// that follows it, but no escape sequence is resolved here: the token
    /// keeps the raw text.
    fn string(&mut self, quote: char) -> TokenKind {
        loop {
            if self.is_at_end() {
                return TokenKind::Error(Error::UnterminatedString);
            }
            match self.advance() {
                '\\' => {
                    if self.is_at_end() {
                        return TokenKind::Error(Error::UnterminatedString);
                    }
                    self.advance();
                }
                c if c == quote => return TokenKind::String,
                _ => (),
            }
        }
    }

    fn identifier_or_keyword(&mut self) -> TokenKind {
        let valid_identifier_suffix = |c: char| c.is_ascii_alphanumeric() || c == '_';

        while valid_identifier_suffix(self.peek()) {
            self.advance();
        }
        KEYWORDS
            .get(self.substr())
            .copied()
            .unwrap_or(TokenKind::Identifier)
    }

    fn number(&mut self) -> TokenKind {
        while self.peek().is_ascii_digit() {
            self.advance();
        }
        // A trailing dot which isn't followed by a digit is not part of the
        // number.
        if self.peek() == '.' && self.peek_next().is_ascii_digit() {
            self.advance();
            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }
        TokenKind::Number
    }
}

impl Lexer<'_> {
    /// Starts a new token "mark".
    fn mark(&mut self) {
        self.current_lo = self.cursor;
        self.current_line = self.line;
        self.current_column = self.column;
    }

    /// Starts a new token "mark" and advances the iterator.
    fn mark_advance(&mut self) -> char {
        self.mark();
        self.advance()
    }

    /// Returns the next character and advances the iterator, keeping track of
    /// the current line and column.
    fn advance(&mut self) -> char {
        let Some(c) = self.iter.next() else {
            return '\0';
        };
        self.cursor += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        c
    }

    /// Advances and returns the provided value.
    fn advance_with<T>(&mut self, value: T) -> T {
        self.advance();
        value
    }

    /// Returns the next character without advancing the iterator.
    fn peek(&mut self) -> char {
        self.iter.peek().copied().unwrap_or('\0')
    }

    /// Returns the character after the next one, without advancing.
    fn peek_next(&self) -> char {
        self.rest().chars().nth(1).unwrap_or('\0')
    }

    fn is_at_end(&self) -> bool {
        self.cursor >= self.src.len()
    }

    /// Returns the input which wasn't consumed yet.
    fn rest(&self) -> &str {
        &self.src[self.cursor..]
    }

    /// Returns the current span.
    fn span(&self) -> Span {
        Span::new_of_bounds(
            self.current_lo..self.cursor,
            self.current_line,
            self.current_column,
        )
    }

    /// Returns the substring of the current marked bounds.
    fn substr(&self) -> &str {
        self.span().substr(self.src)
    }

    /// Produces a token using the marked bounds.
    fn produce(&self, kind: TokenKind) -> Token {
        Token::new(kind, self.span())
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    /// Never returns `None`; bound it with [`BreakableIteratorExt::up_to`].
    fn next(&mut self) -> Option<Token> {
        Some(self.next_token())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Error {
    UnterminatedString,
    UnexpectedChar,
}

impl Error {
    pub fn message(self) -> &'static str {
        match self {
            Error::UnterminatedString => "Unterminated string",
            Error::UnexpectedChar => "Unexpected character",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

pub mod extract {
    use super::*;

    pub fn number(token: Token, src: &str) -> Result<f64, ParseFloatError> {
        debug_assert_eq!(token.kind, TokenKind::Number);
        token.lexeme(src).parse()
    }

    pub fn ident(token: Token, src: &str) -> &str {
        debug_assert_eq!(token.kind, TokenKind::Identifier);
        token.lexeme(src)
    }

    /// Returns the raw contents of a string token, without the delimiting
    /// quotes. Escapes are kept as written.
    pub fn string(token: Token, src: &str) -> Box<str> {
        debug_assert_eq!(token.kind, TokenKind::String);
        let s = token.span().offset(1, -1).substr(src);
        s.to_string().into_boxed_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_demo_program_no_errors() {
        let input = include_str!("../demos/primes.meow");
        let has_errors = lex_in_new(input).into_iter().any(|t| t.kind.is_error());
        assert!(!has_errors);
    }

    #[test]
    fn test_eof_is_idempotent() {
        let mut lexer = Lexer::new("x");
        assert_eq!(lexer.next_token().kind, TokenKind::Identifier);
        for _ in 0..3 {
            let token = lexer.next_token();
            assert_eq!(token.kind, TokenKind::Eof);
            assert_eq!(token.span().range(), 1..1);
        }
    }

    #[test]
    fn test_comments_and_blanks_are_skipped() {
        let kinds_and_text = |src: &'static str| -> Vec<(TokenKind, &'static str)> {
            lex_in_new(src)
                .into_iter()
                .filter(|t| !t.kind.is_trivia())
                .map(|t| (t.kind, t.lexeme(src)))
                .collect()
        };
        assert_eq!(kinds_and_text("1  // c\n+2"), kinds_and_text("1+2"));
        assert_eq!(kinds_and_text("1 /* a\nb */ + \t\r2"), kinds_and_text("1+2"));
    }

    #[test]
    fn test_positions() {
        let src = "var x\n  = 'a\nb' ;";
        let positions: Vec<_> = lex_in_new(src)
            .into_iter()
            .map(|t| (t.kind, t.line(), t.column()))
            .collect();
        assert_eq!(
            positions,
            [
                (TokenKind::Var, 1, 1),
                (TokenKind::Identifier, 1, 5),
                (TokenKind::Newline, 1, 6),
                (TokenKind::Equal, 2, 3),
                (TokenKind::String, 2, 5),
                (TokenKind::Semicolon, 3, 4),
                (TokenKind::Eof, 3, 5),
            ]
        );
    }

    #[test]
    fn test_extract() {
        let src = r#"12.5 foo "a\"b" 'it''s'"#;
        let tokens = lex_in_new(src);
        assert_eq!(extract::number(tokens[0], src), Ok(12.5));
        assert_eq!(extract::ident(tokens[1], src), "foo");
        assert_eq!(&*extract::string(tokens[2], src), r#"a\"b"#);
        assert_eq!(&*extract::string(tokens[3], src), "it");
        assert_eq!(&*extract::string(tokens[4], src), "s");
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(Error::UnterminatedString.to_string(), "Unterminated string");
        assert_eq!(Error::UnexpectedChar.to_string(), "Unexpected character");
    }

    #[test]
    fn tests_with_span() {
        use TokenKind::*;
        let cases = cases!(match .. {
            "+-*/%" => [
                (Plus, 0..1),
                (Minus, 1..2),
                (Star, 2..3),
                (Slash, 3..4),
                (Percent, 4..5),
                (Eof, 5..5),
            ],
            "+ ++ += +++=" => [
                (Plus, 0..1),
                (Increment, 2..4),
                (PlusEqual, 5..7),
                (Increment, 8..10),
                (PlusEqual, 10..12),
                (Eof, 12..12),
            ],
            "- -- -= -> --->" => [
                (Minus, 0..1),
                (Decrement, 2..4),
                (MinusEqual, 5..7),
                (Arrow, 8..10),
                (Decrement, 11..13),
                (Arrow, 13..15),
                (Eof, 15..15),
            ],
            "*= /= = == ! != ~ ^" => [
                (StarEqual, 0..2),
                (SlashEqual, 3..5),
                (Equal, 6..7),
                (EqualEqual, 8..10),
                (Bang, 11..12),
                (BangEqual, 13..15),
                (Tilde, 16..17),
                (Caret, 18..19),
                (Eof, 19..19),
            ],
            "< << <= > >> >= <<=" => [
                (Less, 0..1),
                (Shl, 2..4),
                (LessEqual, 5..7),
                (Greater, 8..9),
                (Shr, 10..12),
                (GreaterEqual, 13..15),
                (Shl, 16..18),
                (Equal, 18..19),
                (Eof, 19..19),
            ],
            "& && | || &&&" => [
                (Amp, 0..1),
                (AndAnd, 2..4),
                (Pipe, 5..6),
                (OrOr, 7..9),
                (AndAnd, 10..12),
                (Amp, 12..13),
                (Eof, 13..13),
            ],
            "()[]{},.:;" => [
                (LParen, 0..1),
                (RParen, 1..2),
                (LBracket, 2..3),
                (RBracket, 3..4),
                (LBrace, 4..5),
                (RBrace, 5..6),
                (Comma, 6..7),
                (Dot, 7..8),
                (Colon, 8..9),
                (Semicolon, 9..10),
                (Eof, 10..10),
            ],
            "var func return if else while for break continue import" => [
                (Var, 0..3),
                (Func, 4..8),
                (Return, 9..15),
                (If, 16..18),
                (Else, 19..23),
                (While, 24..29),
                (For, 30..33),
                (Break, 34..39),
                (Continue, 40..48),
                (Import, 49..55),
                (Eof, 55..55),
            ],
            "true false null True VAR _x x_1 vars" => [
                (True, 0..4),
                (False, 5..10),
                (Null, 11..15),
                (Identifier, 16..20),
                (Identifier, 21..24),
                (Identifier, 25..27),
                (Identifier, 28..31),
                (Identifier, 32..36),
                (Eof, 36..36),
            ],
            "1 12.5 3. 4.x 1.2.3" => [
                (Number, 0..1),
                (Number, 2..6),
                (Number, 7..8),
                (Dot, 8..9),
                (Number, 10..11),
                (Dot, 11..12),
                (Identifier, 12..13),
                (Number, 14..17),
                (Dot, 17..18),
                (Number, 18..19),
                (Eof, 19..19),
            ],
            r#""" "a b" 'c' "it's" 'say "hi"'"# => [
                (String, 0..2),
                (String, 3..8),
                (String, 9..12),
                (String, 13..19),
                (String, 20..30),
                (Eof, 30..30),
            ],
            r#""a\"b" 'a\'b' "\\" "x"# => [
                (String, 0..6),
                (String, 7..13),
                (String, 14..18),
                (Error(self::Error::UnterminatedString), 19..21),
                (Eof, 21..21),
            ],
            r#"'oi\"# => [(Error(self::Error::UnterminatedString), 0..4), (Eof, 4..4)],
            "a\n\nb" => [
                (Identifier, 0..1),
                (Newline, 1..2),
                (Newline, 2..3),
                (Identifier, 3..4),
                (Eof, 4..4),
            ],
            "x // comment\ny /* block\n */ z" => [
                (Identifier, 0..1),
                (Newline, 12..13),
                (Identifier, 13..14),
                (Identifier, 28..29),
                (Eof, 29..29),
            ],
            "1 /* unclosed" => [(Number, 0..1), (Eof, 13..13)],
            "a $ # é b" => [
                (Identifier, 0..1),
                (Error(self::Error::UnexpectedChar), 2..3),
                (Error(self::Error::UnexpectedChar), 4..5),
                (Error(self::Error::UnexpectedChar), 6..8),
                (Identifier, 9..10),
                (Eof, 10..10),
            ],
        });

        for (input, tokens) in cases {
            let lexed: Vec<_> = lex_in_new(input)
                .into_iter()
                .map(|t| (t.kind, t.span().range()))
                .collect();
            assert_eq!(lexed, *tokens, "input: {input:?}");
        }
    }

    macro_rules! cases {
        (match .. {
            $($str:expr => [$(($kind:expr, $range:expr)),* $(,)?]),* $(,)?
        }) => {{
            &[$((
                $str,
                vec![$({
                    let range: std::ops::Range<usize> = $range;
                    ($kind, range)
                }),*],
            )),*]
        }};
    }
    use cases;
}
