use std::{
    collections::HashMap,
    fmt::{self, Write},
    format_args as f, mem,
};

use crate::{
    ast::{
        BinaryOperator, Expr, ExprKind, Func, Ident, Literal, LogicalOperator, Program, Stmt,
        StmtKind, UnaryOperator, VarDecl,
    },
    codegen::Error,
    token::{Span, Spanned},
    util::intern::{well_known, Interner, Symbol},
};

const DEFAULT_CODE_CAPACITY: usize = 4 * 1024; // 4 KiB

const INDENT: &str = "    ";

/// The runtime every lowered program starts with.
pub const PRELUDE: &str = r#"#include <stdio.h>
#include <stdlib.h>

static long long meow_print(long long value) {
    printf("%lld\n", value);
    return 0;
}

static long long meow_print_str(const char *value) {
    printf("%s\n", value);
    return 0;
}

"#;

/// How a variable is stored in the emitted code.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Storage {
    Scalar,
    Array,
}

pub struct Generator<'ident> {
    ident_interner: &'ident Interner,
    /// The code of the function being lowered. Top-level statements are
    /// lowered into the body of `main`.
    code: String,
    indent: usize,
    /// Top-level scalar variables, which live at file scope.
    globals: Vec<Symbol>,
    prototypes: Vec<String>,
    /// Hoisted function definitions, in source order.
    functions: Vec<String>,
    /// Names declared in each enclosing scope. The first one is the top-level
    /// scope.
    scopes: Vec<HashMap<Symbol, Storage>>,
    loop_depth: usize,
    errors: Vec<Spanned<Error>>,
}

impl<'ident> Generator<'ident> {
    pub fn new(ident_interner: &'ident Interner) -> Generator<'ident> {
        Generator {
            ident_interner,
            code: String::with_capacity(DEFAULT_CODE_CAPACITY),
            indent: 0,
            globals: Vec::new(),
            prototypes: Vec::new(),
            functions: Vec::new(),
            scopes: vec![HashMap::new()],
            loop_depth: 0,
            errors: Vec::new(),
        }
    }

    pub fn generate(mut self, program: &Program) -> Result<String, Vec<Spanned<Error>>> {
        self.indented(|this| {
            for stmt in &program.statements {
                this.g_stmt(stmt);
            }
            this.out("return 0;");
        });

        if !self.errors.is_empty() {
            log::debug!("lowering failed with {} error(s)", self.errors.len());
            return Err(self.errors);
        }

        let main = mem::replace(&mut self.code, String::with_capacity(DEFAULT_CODE_CAPACITY));
        self.g_translation_unit(&main);
        log::debug!(
            "lowered {} statement(s) into {} bytes of C",
            program.statements.len(),
            self.code.len()
        );
        Ok(self.code)
    }

    fn g_translation_unit(&mut self, main: &str) {
        self.emit(PRELUDE);

        if !self.globals.is_empty() {
            for global in mem::take(&mut self.globals) {
                let name = self.name(global);
                self.out(f!("long long {name};"));
            }
            self.out_line();
        }

        if !self.prototypes.is_empty() {
            for prototype in mem::take(&mut self.prototypes) {
                self.out(f!("{prototype};"));
            }
            self.out_line();
        }

        for function in mem::take(&mut self.functions) {
            self.emit(function);
        }

        self.out("int main(void) {");
        self.emit(main);
        self.out("}");
    }
}

/// Statements.
impl Generator<'_> {
    fn g_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Expr(expr) => {
                self.start_line();
                self.g_expr_bare(expr);
                self.end_line(";");
            }
            StmtKind::VarDecl(decl) => {
                self.start_line();
                self.g_var_decl(decl);
                self.end_line(";");
            }
            StmtKind::Block(body) => {
                self.out("{");
                self.g_block_body(body);
                self.out("}");
            }
            StmtKind::If {
                condition,
                then_arm,
                else_arm,
            } => {
                self.start_line();
                self.emit("if (");
                self.g_expr_bare(condition);
                self.emit(") ");
                self.g_arm(then_arm);
                if let Some(else_arm) = else_arm {
                    self.emit(" else ");
                    self.g_arm(else_arm);
                }
                self.end_line("");
            }
            StmtKind::While { condition, body } => {
                self.start_line();
                self.emit("while (");
                self.g_expr_bare(condition);
                self.emit(") ");
                self.in_loop(|this| this.g_arm(body));
                self.end_line("");
            }
            StmtKind::For {
                initializer,
                condition,
                increment,
                body,
            } => {
                // The loop header has a scope of its own.
                self.scopes.push(HashMap::new());
                self.start_line();
                self.emit("for (");
                match initializer.as_deref().map(|stmt| &stmt.kind) {
                    Some(StmtKind::VarDecl(decl)) => self.g_var_decl(decl),
                    Some(StmtKind::Expr(expr)) => self.g_expr_bare(expr),
                    Some(_) => unreachable!("for initializer must be a declaration or expression"),
                    None => (),
                }
                self.emit(";");
                if let Some(condition) = condition {
                    self.emit(" ");
                    self.g_expr_bare(condition);
                }
                self.emit(";");
                if let Some(increment) = increment {
                    self.emit(" ");
                    self.g_expr_bare(increment);
                }
                self.emit(") ");
                self.in_loop(|this| this.g_arm(body));
                self.end_line("");
                self.scopes.pop();
            }
            StmtKind::Func(func) => self.g_func(func),
            StmtKind::Return(value) => {
                self.start_line();
                self.emit("return ");
                self.g_initializer(value.as_ref());
                self.end_line(";");
            }
            StmtKind::Break => {
                if self.loop_depth == 0 {
                    self.error(stmt.span.wrap(Error::BreakOutsideLoop));
                }
                self.out("break;");
            }
            StmtKind::Continue => {
                if self.loop_depth == 0 {
                    self.error(stmt.span.wrap(Error::ContinueOutsideLoop));
                }
                self.out("continue;");
            }
        }
    }

    /// Lowers the declaration without indentation or terminator, so that it
    /// may also be used in a `for` header.
    ///
    /// A scalar already declared in the current scope is assigned to instead.
    /// Top-level scalars are assigned to as well, since their storage is
    /// declared at file scope. Arrays can't be assigned to, so an array is
    /// never redeclared in the scope it was declared in.
    fn g_var_decl(&mut self, VarDecl { name: ident, initializer }: &VarDecl) {
        let name = self.name(ident);
        let elements = match initializer {
            Some(Expr {
                kind: ExprKind::Array(elements),
                ..
            }) => Some(elements),
            _ => None,
        };
        let storage = if elements.is_some() {
            Storage::Array
        } else {
            Storage::Scalar
        };

        let redeclared = match self.declared_in_scope(ident.name) {
            Some(previous) if previous == Storage::Array || storage == Storage::Array => {
                let error = Error::ArrayRedeclaration {
                    name: ident.name,
                    was_array: previous == Storage::Array,
                };
                self.error(ident.span.wrap(error));
                return;
            }
            previous => previous.is_some(),
        };

        if redeclared || (self.at_top_level() && elements.is_none()) {
            if !redeclared {
                self.globals.push(ident.name);
            }
            self.emit(f!("{name} = "));
            self.g_initializer(initializer.as_ref());
        } else if let Some(elements) = elements {
            self.emit(f!("long long {name}[] = "));
            self.g_array_elements(elements);
        } else {
            self.emit(f!("long long {name} = "));
            self.g_initializer(initializer.as_ref());
        }

        self.declare(ident.name, storage);
    }

    /// Lowers the expression, or zero if there is none.
    fn g_initializer(&mut self, expr: Option<&Expr>) {
        match expr {
            Some(expr) => self.g_expr_bare(expr),
            None => self.emit("0"),
        }
    }

    /// Lowers the arm of a conditional or the body of a loop as a braced block,
    /// leaving the line open after the closing brace.
    fn g_arm(&mut self, stmt: &Stmt) {
        self.emit("{\n");
        match &stmt.kind {
            StmtKind::Block(body) => self.g_block_body(body),
            _ => self.g_block_body(std::slice::from_ref(stmt)),
        }
        self.start_line();
        self.emit("}");
    }

    fn g_block_body(&mut self, body: &[Stmt]) {
        self.scopes.push(HashMap::new());
        self.indented(|this| {
            for stmt in body {
                this.g_stmt(stmt);
            }
        });
        self.scopes.pop();
    }

    /// Hoists the function to file scope. Falling off its end returns zero.
    fn g_func(&mut self, Func { name, params, body }: &Func) {
        let c_name = self.name(name);
        log::trace!("hoisting function {c_name}");

        let mut signature = format!("long long {c_name}(");
        if params.is_empty() {
            signature.push_str("void");
        }
        for (i, param) in params.iter().enumerate() {
            if i > 0 {
                signature.push_str(", ");
            }
            let param = self.name(param);
            write!(signature, "long long {param}").expect("code emit should be infallible");
        }
        signature.push(')');

        // Reserve the slot before lowering the body, which may hoist functions
        // of its own.
        let slot = self.functions.len();
        self.functions.push(String::new());

        let code = self.hoisted(|this| {
            this.out(f!("{signature} {{"));
            // Parameters share the scope of the function body.
            this.scopes.push(
                params
                    .iter()
                    .map(|param| (param.name, Storage::Scalar))
                    .collect(),
            );
            this.indented(|this| {
                for stmt in body {
                    this.g_stmt(stmt);
                }
                if !matches!(body.last().map(|stmt| &stmt.kind), Some(StmtKind::Return(_))) {
                    this.out("return 0;");
                }
            });
            this.scopes.pop();
            this.out("}");
            this.out_line();
        });

        self.functions[slot] = code;
        self.prototypes.push(signature);
    }
}

/// Expressions.
impl Generator<'_> {
    /// Lowers the expression, parenthesized when it is an operation.
    fn g_expr(&mut self, expr: &Expr) {
        self.g_expr_in(expr, true);
    }

    /// Lowers the expression without outer parentheses, for positions which
    /// are already delimited (statements, arguments, conditions, subscripts).
    fn g_expr_bare(&mut self, expr: &Expr) {
        self.g_expr_in(expr, false);
    }

    fn g_expr_in(&mut self, expr: &Expr, grouped: bool) {
        let (open, close) = if grouped { ("(", ")") } else { ("", "") };

        match &expr.kind {
            ExprKind::Literal(literal) => self.g_literal(literal),
            ExprKind::Variable(ident) => {
                let name = self.name(ident);
                self.emit(name);
            }
            ExprKind::Binary { op, lhs, rhs } => {
                self.emit(open);
                self.g_expr(lhs);
                self.emit(f!(" {} ", binary_operator(*op)));
                self.g_expr(rhs);
                self.emit(close);
            }
            ExprKind::Logical { op, lhs, rhs } => {
                let op = match op {
                    LogicalOperator::And => "&&",
                    LogicalOperator::Or => "||",
                };
                self.emit(open);
                self.g_expr(lhs);
                self.emit(f!(" {op} "));
                self.g_expr(rhs);
                self.emit(close);
            }
            ExprKind::Unary { op, expr: operand } => {
                let op = match op {
                    UnaryOperator::Not => "!",
                    UnaryOperator::Neg => "-",
                    UnaryOperator::Plus => "+",
                    UnaryOperator::BitNot => "~",
                    UnaryOperator::PreIncrement => "++",
                    UnaryOperator::PreDecrement => "--",
                };
                self.emit(open);
                self.emit(op);
                self.g_expr(operand);
                self.emit(close);
            }
            ExprKind::Assignment { target, op, value } => {
                let op = op.map_or("", binary_operator);
                self.emit(open);
                self.g_expr(target);
                self.emit(f!(" {op}= "));
                self.g_expr_bare(value);
                self.emit(close);
            }
            ExprKind::Call { callee, args } => self.g_call(expr.span, callee, args),
            ExprKind::Array(elements) => {
                self.emit("((long long[])");
                self.g_array_elements(elements);
                self.emit(")");
            }
            ExprKind::Index { object, index } => {
                self.g_expr(object);
                self.emit("[");
                self.g_expr_bare(index);
                self.emit("]");
            }
            ExprKind::Member { member, .. } => {
                let error = Error::MemberAccess {
                    member: member.name,
                };
                self.error(expr.span.wrap(error));
            }
        }
    }

    fn g_call(&mut self, span: Span, callee: &Expr, args: &[Expr]) {
        let ExprKind::Variable(ident) = &callee.kind else {
            self.error(callee.span.wrap(Error::IndirectCall));
            return;
        };

        if ident.name == well_known::PRINT {
            self.g_print(span, ident, args);
            return;
        }

        let name = self.name(ident);
        self.emit(f!("{name}("));
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                self.emit(", ");
            }
            self.g_expr_bare(arg);
        }
        self.emit(")");
    }

    fn g_print(&mut self, span: Span, ident: &Ident, args: &[Expr]) {
        let [arg] = args else {
            let error = Error::IntrinsicArity {
                name: ident.name,
                expected: 1,
                actual: args.len(),
            };
            self.error(span.wrap(error));
            return;
        };

        if let ExprKind::Literal(Literal::String(string)) = &arg.kind {
            self.emit(f!("meow_print_str({})", Quoted(string)));
        } else {
            self.emit("meow_print(");
            self.g_expr_bare(arg);
            self.emit(")");
        }
    }

    fn g_array_elements(&mut self, elements: &[Expr]) {
        // C has no empty initializer lists.
        if elements.is_empty() {
            self.emit("{0}");
            return;
        }
        self.emit("{");
        for (i, element) in elements.iter().enumerate() {
            if i > 0 {
                self.emit(", ");
            }
            self.g_expr_bare(element);
        }
        self.emit("}");
    }

    fn g_literal(&mut self, literal: &Literal) {
        match literal {
            Literal::Number(number) => self.g_number(*number),
            // The value of a string is its address.
            Literal::String(string) => self.emit(f!("((long long){})", Quoted(string))),
            Literal::Bool(true) => self.emit("1"),
            Literal::Bool(false) | Literal::Null => self.emit("0"),
        }
    }

    /// `long long` is the only scalar type of the emitted code, so decimals
    /// are truncated toward zero. Values past its range saturate.
    #[allow(clippy::cast_possible_truncation)]
    fn g_number(&mut self, number: f64) {
        self.emit(number as i64);
    }
}

/// Utility functions.
impl<'ident> Generator<'ident> {
    fn emit(&mut self, f: impl fmt::Display) {
        write!(self.code, "{f}").expect("code emit should be infallible");
    }

    /// Writes the indentation of a new line.
    fn start_line(&mut self) {
        for _ in 0..self.indent {
            self.code.push_str(INDENT);
        }
    }

    fn end_line(&mut self, terminator: &str) {
        self.code.push_str(terminator);
        self.code.push('\n');
    }

    /// Prints a line.
    fn out(&mut self, f: impl fmt::Display) {
        self.start_line();
        self.emit(f);
        self.code.push('\n');
    }

    /// Prints an empty line.
    fn out_line(&mut self) {
        self.code.push('\n');
    }

    fn indented<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        self.indent += 1;
        let res = f(self);
        self.indent -= 1;
        res
    }

    fn in_loop<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        self.loop_depth += 1;
        let res = f(self);
        self.loop_depth -= 1;
        res
    }

    /// Lowers a function body in a fresh buffer, returning its code.
    fn hoisted(&mut self, f: impl FnOnce(&mut Self)) -> String {
        let code = mem::replace(&mut self.code, String::with_capacity(DEFAULT_CODE_CAPACITY));
        let indent = mem::replace(&mut self.indent, 0);
        let loop_depth = mem::replace(&mut self.loop_depth, 0);
        f(self);
        self.indent = indent;
        self.loop_depth = loop_depth;
        mem::replace(&mut self.code, code)
    }

    fn name(&self, ident: impl Into<Symbol>) -> CName<'ident> {
        CName(self.ident_interner.get(ident))
    }

    fn error(&mut self, error: Spanned<Error>) {
        self.errors.push(error);
    }

    fn at_top_level(&self) -> bool {
        self.scopes.len() == 1
    }

    fn declared_in_scope(&self, name: Symbol) -> Option<Storage> {
        self.scopes.last()?.get(&name).copied()
    }

    fn declare(&mut self, name: Symbol, storage: Storage) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name, storage);
        }
    }
}

fn binary_operator(op: BinaryOperator) -> &'static str {
    match op {
        BinaryOperator::Add => "+",
        BinaryOperator::Sub => "-",
        BinaryOperator::Mul => "*",
        BinaryOperator::Div => "/",
        BinaryOperator::Rem => "%",
        BinaryOperator::Eq => "==",
        BinaryOperator::Ne => "!=",
        BinaryOperator::Lt => "<",
        BinaryOperator::Le => "<=",
        BinaryOperator::Gt => ">",
        BinaryOperator::Ge => ">=",
        BinaryOperator::BitAnd => "&",
        BinaryOperator::BitOr => "|",
        BinaryOperator::BitXor => "^",
        BinaryOperator::Shl => "<<",
        BinaryOperator::Shr => ">>",
    }
}

/// An identifier as written in C. Every meow name is prefixed, so it can't
/// collide with C keywords, the prelude, or the declarations of the headers.
#[derive(Copy, Clone)]
struct CName<'i>(&'i str);

impl fmt::Display for CName<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m_{}", self.0)
    }
}

/// A C string literal for the raw contents of a meow string. Escape pairs
/// which are simple escapes in C are kept as written.
struct Quoted<'a>(&'a str);

impl fmt::Display for Quoted<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_char('"')?;
        let mut chars = self.0.chars();
        while let Some(c) = chars.next() {
            if c != '\\' {
                write_plain_char(f, c)?;
                continue;
            }
            match chars.next() {
                Some(
                    escaped @ ('n' | 't' | 'r' | '\\' | '"' | '\'' | '0' | 'a' | 'b' | 'f' | 'v'
                    | '?'),
                ) => {
                    f.write_char('\\')?;
                    f.write_char(escaped)?;
                }
                // Not an escape in C, so the backslash is kept literally.
                Some(other) => {
                    f.write_str("\\\\")?;
                    write_plain_char(f, other)?;
                }
                None => f.write_str("\\\\")?,
            }
        }
        f.write_char('"')
    }
}

fn write_plain_char(f: &mut fmt::Formatter<'_>, c: char) -> fmt::Result {
    match c {
        '"' => f.write_str("\\\""),
        '\n' => f.write_str("\\n"),
        '\t' => f.write_str("\\t"),
        '\r' => f.write_str("\\r"),
        c if c.is_ascii_control() => write!(f, "\\{:03o}", u32::from(c)),
        c => f.write_char(c),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_prefixed() {
        assert_eq!(CName("int").to_string(), "m_int");
        assert_eq!(CName("main").to_string(), "m_main");
        assert_eq!(CName("meow_print").to_string(), "m_meow_print");
        assert_eq!(CName("fflush").to_string(), "m_fflush");
        assert_eq!(CName("count").to_string(), "m_count");
    }

    #[test]
    fn test_quoted() {
        assert_eq!(Quoted("hi").to_string(), r#""hi""#);
        assert_eq!(Quoted(r"a\nb").to_string(), r#""a\nb""#);
        assert_eq!(Quoted(r#"say \"hi\""#).to_string(), r#""say \"hi\"""#);
        assert_eq!(Quoted(r#"it's "ok""#).to_string(), r#""it's \"ok\"""#);
        assert_eq!(Quoted("two\nlines\t!").to_string(), r#""two\nlines\t!""#);
        assert_eq!(Quoted("\u{7}").to_string(), r#""\007""#);
    }

    #[test]
    fn test_quoted_keeps_only_c_escapes() {
        assert_eq!(Quoted(r"a\x").to_string(), r#""a\\x""#);
        assert_eq!(Quoted(r"\q\0\?\'").to_string(), r#""\\q\0\?\'""#);
        assert_eq!(Quoted(r"\\d").to_string(), r#""\\d""#);
        assert_eq!(Quoted("\\\n").to_string(), r#""\\\n""#);
    }
}
