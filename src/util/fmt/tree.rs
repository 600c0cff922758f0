use std::io::Write;

use crate::{
    ast::{Expr, ExprKind, Func, Literal, Program, Stmt, StmtKind, VarDecl},
    util::intern::Interner,
};

const INDENT_WIDTH: usize = 2;

pub fn print_program_string(idents: &Interner, program: &Program) -> String {
    let mut buf = Vec::with_capacity(1024);
    print_program(&mut buf, idents, program).unwrap();
    String::from_utf8(buf).unwrap()
}

pub fn print_expr_string(idents: &Interner, expr: &Expr) -> String {
    let mut buf = Vec::with_capacity(512);
    print_expr(&mut buf, idents, 0, expr).unwrap();
    String::from_utf8(buf).unwrap()
}

pub fn print_program(
    w: &mut impl Write,
    idents: &Interner,
    program: &Program,
) -> std::io::Result<()> {
    for stmt in &program.statements {
        print_stmt(w, idents, 0, stmt)?;
    }
    Ok(())
}

pub fn print_stmt(
    w: &mut impl Write,
    idents: &Interner,
    i: usize,
    stmt: &Stmt,
) -> std::io::Result<()> {
    sp(w, i)?;
    let span = stmt.span;
    match &stmt.kind {
        StmtKind::Expr(expr) => {
            writeln!(w, "expr ({span})")?;
            print_expr(w, idents, i + 1, expr)?;
        }
        StmtKind::VarDecl(VarDecl { name, initializer }) => {
            writeln!(w, "var {} ({span})", idents.get(name))?;
            if let Some(initializer) = initializer {
                print_expr(w, idents, i + 1, initializer)?;
            }
        }
        StmtKind::Block(body) => {
            writeln!(w, "block ({span})")?;
            for stmt in body {
                print_stmt(w, idents, i + 1, stmt)?;
            }
        }
        StmtKind::If {
            condition,
            then_arm,
            else_arm,
        } => {
            writeln!(w, "if ({span})")?;
            print_expr(w, idents, i + 1, condition)?;
            print_stmt(w, idents, i + 1, then_arm)?;
            if let Some(else_arm) = else_arm {
                sp(w, i + 1)?;
                writeln!(w, "else")?;
                print_stmt(w, idents, i + 2, else_arm)?;
            }
        }
        StmtKind::While { condition, body } => {
            writeln!(w, "while ({span})")?;
            print_expr(w, idents, i + 1, condition)?;
            print_stmt(w, idents, i + 1, body)?;
        }
        StmtKind::For {
            initializer,
            condition,
            increment,
            body,
        } => {
            writeln!(w, "for ({span})")?;
            if let Some(initializer) = initializer {
                print_stmt(w, idents, i + 1, initializer)?;
            }
            if let Some(condition) = condition {
                sp(w, i + 1)?;
                writeln!(w, "condition")?;
                print_expr(w, idents, i + 2, condition)?;
            }
            if let Some(increment) = increment {
                sp(w, i + 1)?;
                writeln!(w, "increment")?;
                print_expr(w, idents, i + 2, increment)?;
            }
            print_stmt(w, idents, i + 1, body)?;
        }
        StmtKind::Func(Func { name, params, body }) => {
            write!(w, "func {}(", idents.get(name))?;
            for (idx, param) in params.iter().enumerate() {
                if idx > 0 {
                    write!(w, ", ")?;
                }
                write!(w, "{}", idents.get(param))?;
            }
            writeln!(w, ") ({span})")?;
            for stmt in body {
                print_stmt(w, idents, i + 1, stmt)?;
            }
        }
        StmtKind::Return(value) => {
            writeln!(w, "return ({span})")?;
            if let Some(value) = value {
                print_expr(w, idents, i + 1, value)?;
            }
        }
        StmtKind::Break => writeln!(w, "break ({span})")?,
        StmtKind::Continue => writeln!(w, "continue ({span})")?,
    }
    Ok(())
}

pub fn print_expr(
    w: &mut impl Write,
    idents: &Interner,
    i: usize,
    expr: &Expr,
) -> std::io::Result<()> {
    sp(w, i)?;
    let span = expr.span;
    match &expr.kind {
        ExprKind::Literal(Literal::Number(val)) => {
            writeln!(w, "number {val} ({span})")?;
        }
        ExprKind::Literal(Literal::String(val)) => {
            writeln!(w, "string {val:?} ({span})")?;
        }
        ExprKind::Literal(Literal::Bool(val)) => {
            writeln!(w, "bool {val} ({span})")?;
        }
        ExprKind::Literal(Literal::Null) => {
            writeln!(w, "null ({span})")?;
        }
        ExprKind::Variable(ident) => {
            writeln!(w, "variable {} ({span})", idents.get(ident))?;
        }
        ExprKind::Binary { op, lhs, rhs } => {
            writeln!(w, "binary {op:?} ({span})")?;
            print_expr(w, idents, i + 1, lhs)?;
            print_expr(w, idents, i + 1, rhs)?;
        }
        ExprKind::Logical { op, lhs, rhs } => {
            writeln!(w, "logical {op:?} ({span})")?;
            print_expr(w, idents, i + 1, lhs)?;
            print_expr(w, idents, i + 1, rhs)?;
        }
        ExprKind::Unary {
            op,
            expr: inner_expr,
        } => {
            writeln!(w, "unary {op:?} ({span})")?;
            print_expr(w, idents, i + 1, inner_expr)?;
        }
        ExprKind::Assignment { target, op, value } => {
            match op {
                Some(op) => writeln!(w, "assignment {op:?} ({span})")?,
                None => writeln!(w, "assignment ({span})")?,
            }
            print_expr(w, idents, i + 1, target)?;
            print_expr(w, idents, i + 1, value)?;
        }
        ExprKind::Call { callee, args } => {
            writeln!(w, "call ({span})")?;
            print_expr(w, idents, i + 1, callee)?;
            if !args.is_empty() {
                sp(w, i + 1)?;
                writeln!(w, "arguments")?;
                for arg in args {
                    print_expr(w, idents, i + 2, arg)?;
                }
            }
        }
        ExprKind::Array(elements) => {
            writeln!(w, "array ({span})")?;
            for element in elements {
                print_expr(w, idents, i + 1, element)?;
            }
        }
        ExprKind::Index { object, index } => {
            writeln!(w, "index ({span})")?;
            print_expr(w, idents, i + 1, object)?;
            print_expr(w, idents, i + 1, index)?;
        }
        ExprKind::Member { object, member } => {
            writeln!(w, "member {} ({span})", idents.get(member))?;
            print_expr(w, idents, i + 1, object)?;
        }
    }
    Ok(())
}

fn sp(w: &mut impl Write, i: usize) -> std::io::Result<()> {
    write!(w, "{:width$}", "", width = i * INDENT_WIDTH)
}
