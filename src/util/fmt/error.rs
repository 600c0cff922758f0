use crate::{
    codegen, lexer, parser,
    token::Spanned,
    util::fmt::Show,
};

impl Show for Spanned<parser::Error> {
    fn show(&self, f: &mut std::fmt::Formatter<'_>, _: &super::Context<'_>) -> std::fmt::Result {
        let Spanned { span, inner: error } = self;

        if f.alternate() {
            write!(f, "{}: ", span.position())?;
        }

        use parser::Error::*;
        match error {
            InvalidAssignmentTarget => write!(f, "invalid assignment target"),
            InvalidNumber => write!(f, "invalid number literal"),
            UnexpectedTokenInExpr { token } => {
                write!(f, "unexpected token {token:?} in expression")
            }
            Unexpected { actual, expected } => {
                write!(f, "expected token {expected:?}, but got {actual:?}")
            }
            UnexpectedAny { actual, expected } => {
                write!(f, "expected one of {expected:?}, but got {actual:?}")
            }
            Lexer(error) => write!(f, "{error}"),
        }
    }
}

impl Show for Spanned<codegen::Error> {
    fn show(&self, f: &mut std::fmt::Formatter<'_>, ctx: &super::Context<'_>) -> std::fmt::Result {
        let i = ctx.ident_interner;
        let Spanned { span, inner: error } = self;

        if f.alternate() {
            write!(f, "{}: ", span.position())?;
        }

        use codegen::Error::*;
        match error {
            MemberAccess { member } => {
                let member = i.get(member);
                write!(f, "member access `.{member}` is not supported")
            }
            IndirectCall => write!(f, "only named functions can be called"),
            BreakOutsideLoop => write!(f, "break outside of a loop"),
            ContinueOutsideLoop => write!(f, "continue outside of a loop"),
            IntrinsicArity {
                name,
                expected,
                actual,
            } => {
                let name = i.get(name);
                write!(
                    f,
                    "{name} takes exactly {expected} argument(s), but got {actual}"
                )
            }
            ArrayRedeclaration { name, was_array } => {
                let name = i.get(name);
                if *was_array {
                    write!(f, "array `{name}` can't be redeclared in the same scope")
                } else {
                    write!(
                        f,
                        "`{name}` can't be redeclared as an array in the same scope"
                    )
                }
            }
        }
    }
}

impl Show for Spanned<lexer::Error> {
    fn show(&self, f: &mut std::fmt::Formatter<'_>, _: &super::Context<'_>) -> std::fmt::Result {
        if f.alternate() {
            write!(f, "{}: ", self.span.position())?;
        }
        write!(f, "{}", self.inner)
    }
}
