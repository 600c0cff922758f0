// program ::= declaration*
// declaration ::= 'var' var_decl | 'func' func_decl | statement
// var_decl ::= ID ['=' expr] ';'
// func_decl ::= ID '(' [ID (',' ID)*] ')' block
// block ::= '{' declaration* '}'
// statement ::= 'return' [expr] ';'
//             | 'if' '(' expr ')' block ['else' block]
//             | 'while' '(' expr ')' block
//             | 'for' '(' ('var' var_decl | expr ';' | ';') [expr] ';' [expr] ')' block
//             | 'break' ';'
//             | 'continue' ';'
//             | expr ';'
// expr ::= expr ('=' | '+=' | '-=' | '*=' | '/=') expr
//        | expr '||' expr
//        | expr '&&' expr
//        | expr ('==' | '!=') expr
//        | expr ('<' | '<=' | '>' | '>=') expr
//        | expr ('&' | '|' | '^') expr
//        | expr ('<<' | '>>') expr
//        | expr ('+' | '-') expr
//        | expr ('*' | '/' | '%') expr
//        | ('!' | '-' | '+' | '~' | '++' | '--') expr
//        | expr '(' [expr (',' expr)*] ')'
//        | expr '[' expr ']'
//        | expr '.' ID
//        | '(' expr ')'
//        | '[' [expr (',' expr)*] ']'
//        | ID
//        | number
//        | string
//        | true
//        | false
//        | null

// Precedence (tightest first)
//
// call, index, member
// unary
// * / %
// + -
// << >>
// & | ^
// < <= > >=
// == !=
// &&
// ||
// = += -= *= /=

use crate::{token::Span, util::intern::Symbol};

/// The top-level statements of a compilation unit, in source order.
#[derive(Debug, PartialEq, Default)]
pub struct Program {
    pub statements: Vec<Stmt>,
}

#[derive(Debug, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug, PartialEq)]
pub enum StmtKind {
    Expr(Expr),
    VarDecl(VarDecl),
    Block(Vec<Stmt>),
    If {
        condition: Expr,
        then_arm: Box<Stmt>,
        else_arm: Option<Box<Stmt>>,
    },
    While {
        condition: Expr,
        body: Box<Stmt>,
    },
    For {
        /// Either a [`StmtKind::VarDecl`] or a [`StmtKind::Expr`].
        initializer: Option<Box<Stmt>>,
        condition: Option<Expr>,
        increment: Option<Expr>,
        body: Box<Stmt>,
    },
    Func(Func),
    Return(Option<Expr>),
    Break,
    Continue,
}

#[derive(Debug, PartialEq)]
pub struct VarDecl {
    pub name: Ident,
    pub initializer: Option<Expr>,
}

#[derive(Debug, PartialEq)]
pub struct Func {
    pub name: Ident,
    pub params: Vec<Ident>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, PartialEq)]
pub enum ExprKind {
    Literal(Literal),
    Variable(Ident),
    Binary {
        op: BinaryOperator,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary {
        op: UnaryOperator,
        expr: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    /// Short-circuiting `&&` and `||`.
    Logical {
        op: LogicalOperator,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Assignment {
        target: Box<Expr>,
        /// The arithmetic operator of a compound assignment (`+=` and
        /// friends). `None` for a plain `=`.
        op: Option<BinaryOperator>,
        value: Box<Expr>,
    },
    Array(Vec<Expr>),
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },
    Member {
        object: Box<Expr>,
        member: Ident,
    },
}

impl ExprKind {
    /// Whether this expression may appear on the left side of an assignment.
    pub fn is_place(&self) -> bool {
        matches!(
            self,
            ExprKind::Variable(_) | ExprKind::Index { .. } | ExprKind::Member { .. }
        )
    }
}

#[derive(Debug, PartialEq)]
pub enum Literal {
    Number(f64),
    /// The raw text between the quotes; escapes are kept as written.
    String(Box<str>),
    Bool(bool),
    Null,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UnaryOperator {
    Not,
    Neg,
    Plus,
    BitNot,
    PreIncrement,
    PreDecrement,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LogicalOperator {
    And,
    Or,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Ident {
    pub name: Symbol,
    pub span: Span,
}

impl From<Ident> for Symbol {
    fn from(value: Ident) -> Self {
        value.name
    }
}

impl From<&Ident> for Symbol {
    fn from(value: &Ident) -> Self {
        value.name
    }
}
