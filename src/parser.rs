use crate::{
    ast::{
        BinaryOperator, Expr, ExprKind, Func, Ident, Literal, LogicalOperator, Program, Stmt,
        StmtKind, UnaryOperator, VarDecl,
    },
    lexer::{self, extract, Lexer},
    token::{Span, Spanned, Token, TokenKind},
    util::{intern::Interner, BreakableIteratorExt},
};

type Result<T, E = ()> = std::result::Result<T, E>;

/// The outcome of a parse. A unit with any syntax error never yields a tree.
pub type ParseResult<T> = Result<T, Vec<Spanned<Error>>>;

pub fn parse_program(
    src: &str,
    tokens: &mut Vec<Token>,
    ident_interner: &mut Interner,
) -> ParseResult<Program> {
    parse(src, tokens, ident_interner, Parser::parse_program)
}

/// Parses a single expression spanning the whole input.
pub fn parse_expr(
    src: &str,
    tokens: &mut Vec<Token>,
    ident_interner: &mut Interner,
) -> ParseResult<Expr> {
    parse(src, tokens, ident_interner, |p| {
        let expr = p.parse_expr()?;
        p.consume(TokenKind::Eof)?;
        Ok(expr)
    })
}

fn parse<'src, 'tok, 'ident, T>(
    src: &'src str,
    tokens: &'tok mut Vec<Token>,
    ident_interner: &'ident mut Interner,
    f: impl for<'a> FnOnce(&'a mut Parser<'src, 'tok, 'ident>) -> Result<T>,
) -> ParseResult<T> {
    assert!(tokens.is_empty(), "must pass clean tokens buffer");

    // The whole token sequence is buffered up front. Newlines carry no
    // meaning in the grammar, so they never reach the parser.
    tokens.extend(
        Lexer::new(src)
            .up_to(Token::is_eof)
            .filter(|token| !token.kind.is_trivia()),
    );
    log::debug!("parsing {} tokens", tokens.len());

    let mut p = Parser::new(src, tokens, ident_interner);
    let parse_result = f(&mut p);

    match parse_result {
        Ok(el) if p.errors.is_empty() => Ok(el),
        Err(()) if p.errors.is_empty() => unreachable!("parse failed without reporting errors"),
        _ => {
            log::debug!("parse failed with {} error(s)", p.errors.len());
            Err(p.errors)
        }
    }
}

struct Parser<'src, 'tok, 'ident> {
    src: &'src str,
    tokens: &'tok [Token],
    ident_interner: &'ident mut Interner,
    cursor: usize,
    errors: Vec<Spanned<Error>>,
}

impl Parser<'_, '_, '_> {
    fn parse_program(&mut self) -> Result<Program> {
        let mut statements = Vec::with_capacity(16);
        while self.except([]) {
            if let Ok(stmt) = self.synchronize(&[], Parser::parse_declaration) {
                statements.push(stmt);
            }
        }
        self.consume(TokenKind::Eof)?;
        Ok(Program { statements })
    }

    fn parse_declaration(&mut self) -> Result<Stmt> {
        match self.peek().kind {
            TokenKind::Var => {
                let var = self.advance();
                self.parse_var_decl(var)
            }
            TokenKind::Func => {
                let func = self.advance();
                self.parse_func(func)
            }
            _ => self.parse_statement(),
        }
    }

    /// Parses the rest of a variable declaration, after the `var` keyword.
    fn parse_var_decl(&mut self, var: Token) -> Result<Stmt> {
        let name = self.parse_ident()?;
        let initializer = if self.take(TokenKind::Equal) {
            Some(self.parse_expr()?)
        } else {
            None
        };
        let end = self.consume(TokenKind::Semicolon)?;
        Ok(Stmt {
            kind: StmtKind::VarDecl(VarDecl { name, initializer }),
            span: var.span().to(end.span()),
        })
    }

    /// Parses the rest of a function declaration, after the `func` keyword.
    fn parse_func(&mut self, func: Token) -> Result<Stmt> {
        let name = self.parse_ident()?;
        self.consume(TokenKind::LParen)?;
        let params = self.parse_list(TokenKind::RParen, TokenKind::Comma, Parser::parse_ident)?;
        self.consume(TokenKind::RParen)?;
        let (body, body_span) = self.parse_body()?;
        Ok(Stmt {
            kind: StmtKind::Func(Func { name, params, body }),
            span: func.span().to(body_span),
        })
    }

    fn parse_statement(&mut self) -> Result<Stmt> {
        let start = self.peek();
        let (kind, span) = match start.kind {
            TokenKind::Return => {
                self.advance();
                let value = if self.is(TokenKind::Semicolon) {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                let end = self.consume(TokenKind::Semicolon)?;
                (StmtKind::Return(value), start.span().to(end.span()))
            }

            // If: if ( expr ) { ... } [else { ... }]
            TokenKind::If => {
                self.advance();
                let condition = self.parse_condition()?;
                let then_arm = self.parse_block()?;
                let else_arm = if self.take(TokenKind::Else) {
                    Some(self.parse_block()?)
                } else {
                    None
                };
                let end = else_arm.as_ref().unwrap_or(&then_arm).span;
                let cond = StmtKind::If {
                    condition,
                    then_arm: Box::new(then_arm),
                    else_arm: else_arm.map(Box::new),
                };
                (cond, start.span().to(end))
            }

            // Loop: while ( expr ) { ... }
            TokenKind::While => {
                self.advance();
                let condition = self.parse_condition()?;
                let body = self.parse_block()?;
                let span = start.span().to(body.span);
                let w = StmtKind::While {
                    condition,
                    body: Box::new(body),
                };
                (w, span)
            }

            // Loop: for ( [init] ; [cond] ; [incr] ) { ... }
            TokenKind::For => {
                self.advance();
                self.consume(TokenKind::LParen)?;
                let initializer = match self.peek().kind {
                    TokenKind::Semicolon => {
                        self.advance();
                        None
                    }
                    TokenKind::Var => {
                        let var = self.advance();
                        Some(Box::new(self.parse_var_decl(var)?))
                    }
                    _ => Some(Box::new(self.parse_expr_stmt()?)),
                };
                let condition = if self.is(TokenKind::Semicolon) {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                self.consume(TokenKind::Semicolon)?;
                let increment = if self.is(TokenKind::RParen) {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                self.consume(TokenKind::RParen)?;
                let body = self.parse_block()?;
                let span = start.span().to(body.span);
                let f = StmtKind::For {
                    initializer,
                    condition,
                    increment,
                    body: Box::new(body),
                };
                (f, span)
            }

            TokenKind::Break => {
                self.advance();
                let end = self.consume(TokenKind::Semicolon)?;
                (StmtKind::Break, start.span().to(end.span()))
            }

            TokenKind::Continue => {
                self.advance();
                let end = self.consume(TokenKind::Semicolon)?;
                (StmtKind::Continue, start.span().to(end.span()))
            }

            _ => return self.parse_expr_stmt(),
        };
        Ok(Stmt { kind, span })
    }

    fn parse_expr_stmt(&mut self) -> Result<Stmt> {
        let expr = self.parse_expr()?;
        let end = self.consume(TokenKind::Semicolon)?;
        Ok(Stmt {
            span: expr.span.to(end.span()),
            kind: StmtKind::Expr(expr),
        })
    }

    /// Parses a parenthesized condition, as in `if` and `while`.
    fn parse_condition(&mut self) -> Result<Expr> {
        self.consume(TokenKind::LParen)?;
        let condition = self.parse_expr()?;
        self.consume(TokenKind::RParen)?;
        Ok(condition)
    }

    fn parse_block(&mut self) -> Result<Stmt> {
        let (body, span) = self.parse_body()?;
        Ok(Stmt {
            kind: StmtKind::Block(body),
            span,
        })
    }

    /// Parses `'{' declaration* '}'`, returning the declarations and the span
    /// which includes both braces.
    fn parse_body(&mut self) -> Result<(Vec<Stmt>, Span)> {
        let start = self.consume(TokenKind::LBrace)?;
        let mut body = Vec::new();
        while self.except([TokenKind::RBrace]) {
            if let Ok(stmt) = self.synchronize(&[TokenKind::RBrace], Parser::parse_declaration) {
                body.push(stmt);
            }
        }
        let end = self.consume(TokenKind::RBrace)?;
        Ok((body, start.span().to(end.span())))
    }

    fn parse_ident(&mut self) -> Result<Ident> {
        let token = self.consume(TokenKind::Identifier)?;
        Ok(Ident {
            name: self.ident_interner.intern(extract::ident(token, self.src)),
            span: token.span(),
        })
    }

    fn parse_expr(&mut self) -> Result<Expr> {
        self.parse_expr_bp(0)
    }

    fn parse_expr_bp(&mut self, min_bp: u8) -> Result<Expr> {
        let mut lhs = self.parse_nud()?;

        loop {
            let op_token = self.peek();

            if let Some((lbp, rbp)) = Self::infix_binding_power(op_token.kind) {
                if lbp < min_bp {
                    // Operator binds less tightly than the minimum required
                    break;
                }

                self.advance(); // Operator
                lhs = self.parse_led(op_token, lhs, rbp)?;
            } else {
                // Not an infix operator
                break;
            }
        }

        Ok(lhs)
    }

    /// nud: Parses tokens that start an expression
    /// (prefix operators, literals, grouping)
    ///
    /// The current token is only consumed if it can start an expression.
    fn parse_nud(&mut self) -> Result<Expr> {
        let token = self.peek();
        let (kind, span) = match token.kind {
            TokenKind::Identifier => {
                let ident = self.parse_ident()?;
                (ExprKind::Variable(ident), ident.span)
            }
            TokenKind::Number => {
                self.advance();
                let Ok(parsed) = extract::number(token, self.src) else {
                    self.error(token.span().wrap(Error::InvalidNumber));
                    return Err(());
                };
                (ExprKind::Literal(Literal::Number(parsed)), token.span())
            }
            TokenKind::String => {
                self.advance();
                let string = extract::string(token, self.src);
                (ExprKind::Literal(Literal::String(string)), token.span())
            }
            kind @ (TokenKind::True | TokenKind::False | TokenKind::Null) => {
                self.advance();
                let literal = match kind {
                    TokenKind::True => Literal::Bool(true),
                    TokenKind::False => Literal::Bool(false),
                    _ => Literal::Null,
                };
                (ExprKind::Literal(literal), token.span())
            }

            // Grouping: ( expr )
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expr()?;
                let end = self.consume(TokenKind::RParen)?;
                (expr.kind, token.span().to(end.span()))
            }

            // Array: [ expr, ... ]
            TokenKind::LBracket => {
                self.advance();
                let elements =
                    self.parse_list(TokenKind::RBracket, TokenKind::Comma, Parser::parse_expr)?;
                let end = self.consume(TokenKind::RBracket)?;
                (ExprKind::Array(elements), token.span().to(end.span()))
            }

            // Prefix operators: !, -, +, ~, ++, --
            kind @ (TokenKind::Bang
            | TokenKind::Minus
            | TokenKind::Plus
            | TokenKind::Tilde
            | TokenKind::Increment
            | TokenKind::Decrement) => {
                self.advance();
                let op = match kind {
                    TokenKind::Bang => UnaryOperator::Not,
                    TokenKind::Minus => UnaryOperator::Neg,
                    TokenKind::Plus => UnaryOperator::Plus,
                    TokenKind::Tilde => UnaryOperator::BitNot,
                    TokenKind::Increment => UnaryOperator::PreIncrement,
                    TokenKind::Decrement => UnaryOperator::PreDecrement,
                    _ => unreachable!(),
                };
                let expr = self.parse_expr_bp(Self::PREFIX_BINDING_POWER)?;

                if matches!(op, UnaryOperator::PreIncrement | UnaryOperator::PreDecrement)
                    && !expr.kind.is_place()
                {
                    self.error(expr.span.wrap(Error::InvalidAssignmentTarget));
                    return Err(());
                }

                let span = token.span().to(expr.span);
                let unary = ExprKind::Unary {
                    op,
                    expr: Box::new(expr),
                };
                (unary, span)
            }

            TokenKind::Error(error) => {
                self.error(token.span().wrap(Error::Lexer(error)));
                return Err(());
            }

            other => {
                let error = Error::UnexpectedTokenInExpr { token: other };
                self.error(token.span().wrap(error));
                return Err(());
            }
        };

        Ok(Expr { kind, span })
    }

    /// led: Parses tokens that follow a left-hand-side expression
    /// (infix/postfix operators)
    fn parse_led(&mut self, op_token: Token, lhs: Expr, rbp: u8) -> Result<Expr> {
        let (kind, span) = match op_token.kind {
            // Short-circuiting operators: &&, ||
            kind @ (TokenKind::AndAnd | TokenKind::OrOr) => {
                let op = match kind {
                    TokenKind::AndAnd => LogicalOperator::And,
                    _ => LogicalOperator::Or,
                };
                let rhs = self.parse_expr_bp(rbp)?;
                let span = lhs.span.to(rhs.span);
                let logical = ExprKind::Logical {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                };
                (logical, span)
            }

            // Assignment: place (= | += | -= | *= | /=) expr
            kind @ (TokenKind::Equal
            | TokenKind::PlusEqual
            | TokenKind::MinusEqual
            | TokenKind::StarEqual
            | TokenKind::SlashEqual) => {
                if !lhs.kind.is_place() {
                    self.error(lhs.span.wrap(Error::InvalidAssignmentTarget));
                    return Err(());
                }
                let op = match kind {
                    TokenKind::PlusEqual => Some(BinaryOperator::Add),
                    TokenKind::MinusEqual => Some(BinaryOperator::Sub),
                    TokenKind::StarEqual => Some(BinaryOperator::Mul),
                    TokenKind::SlashEqual => Some(BinaryOperator::Div),
                    _ => None,
                };
                let value = self.parse_expr_bp(rbp)?;
                let span = lhs.span.to(value.span);
                let assign = ExprKind::Assignment {
                    target: Box::new(lhs),
                    op,
                    value: Box::new(value),
                };
                (assign, span)
            }

            // Call: expr ( [expr [, expr]*] )
            TokenKind::LParen => {
                let args = self.parse_list(TokenKind::RParen, TokenKind::Comma, Parser::parse_expr)?;
                let end = self.consume(TokenKind::RParen)?;
                let span = lhs.span.to(end.span());
                let call = ExprKind::Call {
                    callee: Box::new(lhs),
                    args,
                };
                (call, span)
            }

            // Index: expr [ expr ]
            TokenKind::LBracket => {
                let index = self.parse_expr()?;
                let end = self.consume(TokenKind::RBracket)?;
                let span = lhs.span.to(end.span());
                let index = ExprKind::Index {
                    object: Box::new(lhs),
                    index: Box::new(index),
                };
                (index, span)
            }

            // Member: expr . ID
            TokenKind::Dot => {
                let member = self.parse_ident()?;
                let span = lhs.span.to(member.span);
                let member = ExprKind::Member {
                    object: Box::new(lhs),
                    member,
                };
                (member, span)
            }

            // Binary operators
            kind => {
                let op = Self::binary_operator(kind).expect("infix token without an operator");
                // Parse right operand with correct precedence
                let rhs = self.parse_expr_bp(rbp)?;
                let span = lhs.span.to(rhs.span);
                let binary = ExprKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                };
                (binary, span)
            }
        };

        Ok(Expr { kind, span })
    }

    /// Parses `item (delim item)*` until `end_delim` is found. Does **NOT**
    /// consume the end delimiter. A trailing separator is accepted.
    fn parse_list<T>(
        &mut self,
        end_delim: TokenKind,
        separator: TokenKind,
        parse_item: impl Fn(&mut Self) -> Result<T>,
    ) -> Result<Vec<T>> {
        debug_assert_ne!(end_delim, separator);

        let mut items = Vec::new();
        while self.except([end_delim]) {
            items.push(parse_item(self)?);

            // After consuming an item, we must consume the separator.
            if !self.take(separator) {
                if self.is(end_delim) {
                    // If, however, it is not present, then we check if the end
                    // delimiter is current. If so, we can stop.
                    break;
                }
                // However, if the current token is not the separator nor
                // the end delimiter, we must return an error.
                let c = self.peek();
                self.unexpected(c, |actual| Error::UnexpectedAny {
                    actual,
                    expected: Box::from([separator, end_delim]),
                });
                return Err(());
            }
        }

        Ok(items)
    }

    /// Binding power of prefix operators. Binds tighter than any binary
    /// operator, but looser than calls, indexing and member access.
    const PREFIX_BINDING_POWER: u8 = 19;

    fn infix_binding_power(kind: TokenKind) -> Option<(u8, u8)> {
        let bp = match kind {
            // Assignment (right-associative)
            TokenKind::Equal
            | TokenKind::PlusEqual
            | TokenKind::MinusEqual
            | TokenKind::StarEqual
            | TokenKind::SlashEqual => (2, 1),

            TokenKind::OrOr => (3, 4),
            TokenKind::AndAnd => (5, 6),
            TokenKind::EqualEqual | TokenKind::BangEqual => (7, 8),
            TokenKind::Less | TokenKind::LessEqual | TokenKind::Greater | TokenKind::GreaterEqual => {
                (9, 10)
            }
            TokenKind::Amp | TokenKind::Pipe | TokenKind::Caret => (11, 12),
            TokenKind::Shl | TokenKind::Shr => (13, 14),
            TokenKind::Plus | TokenKind::Minus => (15, 16),
            TokenKind::Star | TokenKind::Slash | TokenKind::Percent => (17, 18),

            // Postfix: call, index and member access (left-associative)
            TokenKind::LParen | TokenKind::LBracket | TokenKind::Dot => (21, 22),

            _ => return None,
        };
        Some(bp)
    }

    fn binary_operator(kind: TokenKind) -> Option<BinaryOperator> {
        let op = match kind {
            TokenKind::Plus => BinaryOperator::Add,
            TokenKind::Minus => BinaryOperator::Sub,
            TokenKind::Star => BinaryOperator::Mul,
            TokenKind::Slash => BinaryOperator::Div,
            TokenKind::Percent => BinaryOperator::Rem,
            TokenKind::EqualEqual => BinaryOperator::Eq,
            TokenKind::BangEqual => BinaryOperator::Ne,
            TokenKind::Less => BinaryOperator::Lt,
            TokenKind::LessEqual => BinaryOperator::Le,
            TokenKind::Greater => BinaryOperator::Gt,
            TokenKind::GreaterEqual => BinaryOperator::Ge,
            TokenKind::Amp => BinaryOperator::BitAnd,
            TokenKind::Pipe => BinaryOperator::BitOr,
            TokenKind::Caret => BinaryOperator::BitXor,
            TokenKind::Shl => BinaryOperator::Shl,
            TokenKind::Shr => BinaryOperator::Shr,
            _ => return None,
        };
        Some(op)
    }
}

impl Parser<'_, '_, '_> {
    fn new<'src, 'tok, 'ident>(
        src: &'src str,
        tokens: &'tok [Token],
        ident_interner: &'ident mut Interner,
    ) -> Parser<'src, 'tok, 'ident> {
        assert!(
            tokens.last().is_some_and(Token::is_eof),
            "token buffer must end with eof"
        );
        Parser {
            src,
            tokens,
            ident_interner,
            cursor: 0,
            errors: Vec::with_capacity(8),
        }
    }

    /// Records an error.
    fn error(&mut self, error: Spanned<Error>) {
        self.errors.push(error);
    }

    /// Records an error for the unexpected token `actual`. Lexical error
    /// tokens are reported as such.
    fn unexpected(&mut self, actual: Token, f: impl FnOnce(TokenKind) -> Error) {
        let error = match actual.kind {
            TokenKind::Error(error) => Error::Lexer(error),
            kind => f(kind),
        };
        self.error(actual.span().wrap(error));
    }

    /// Returns the current token. Past the end, this is always the
    /// end-of-file token.
    #[inline]
    fn peek(&self) -> Token {
        let last = self.tokens.len() - 1;
        self.tokens[self.cursor.min(last)]
    }

    /// Returns the current token and advances. Never advances past the
    /// end-of-file token.
    fn advance(&mut self) -> Token {
        let c = self.peek();
        if !c.is_eof() {
            self.cursor += 1;
        }
        c
    }

    /// Checks whether the current token matches the given one.
    fn is(&self, expect: TokenKind) -> bool {
        self.peek().kind == expect
    }

    /// Advances if the current token matches the provided one, returning true.
    /// If not, returns false and doesn't advance.
    fn take(&mut self, expect: TokenKind) -> bool {
        if self.is(expect) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Advances if the current token matches the provided one, returning it.
    /// If not, records an error.
    fn consume(&mut self, expect: TokenKind) -> Result<Token> {
        let c = self.peek();
        if self.is(expect) {
            self.advance();
            Ok(c)
        } else {
            self.unexpected(c, |actual| Error::Unexpected {
                actual,
                expected: expect,
            });
            Err(())
        }
    }

    /// Returns true while the current token does *not* match one of the
    /// provided ones. [`TokenKind::Eof`] is implicitly included in the list.
    ///
    /// This won't advance the cursor.
    fn except(&mut self, except: impl IntoIterator<Item = TokenKind>) -> bool {
        let c = self.peek();
        for e in except {
            if c.kind == e {
                return false;
            }
        }
        c.kind != TokenKind::Eof
    }

    /// Runs `f`. In the case of an error, skips tokens until just after the
    /// next `;`, or until a token in `stop_cond` (which is not consumed), so
    /// that the caller may keep parsing and report further errors.
    fn synchronize<T>(
        &mut self,
        stop_cond: &[TokenKind],
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let result = f(self);
        if result.is_err() {
            loop {
                let c = self.peek().kind;
                if c == TokenKind::Eof || stop_cond.contains(&c) {
                    break;
                }
                self.advance();
                if c == TokenKind::Semicolon {
                    break;
                }
            }
        }
        result
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    InvalidAssignmentTarget,
    InvalidNumber,
    UnexpectedTokenInExpr {
        token: TokenKind,
    },
    Unexpected {
        actual: TokenKind,
        expected: TokenKind,
    },
    UnexpectedAny {
        actual: TokenKind,
        expected: Box<[TokenKind]>,
    },
    /// An error token produced by the lexer.
    Lexer(lexer::Error),
}
