/// The lexer takes the source input, mapping it into a sequence of tokens.
pub mod lexer;

/// The parser takes a sequence of tokens, mapping it into an AST.
pub mod parser;

/// The code generator lowers an AST into the text of a C program.
pub mod codegen;

pub mod ast;
pub mod token;
pub mod util;

use crate::util::{
    fmt::{Context, Show},
    intern::Interner,
};

/// Compiles a meow program into C.
///
/// Lowering only runs on a program which parsed without errors.
pub fn compile(src: &str) -> Result<String, Diagnostics> {
    let mut tokens = Vec::with_capacity(lexer::SUGGESTED_TOKENS_CAPACITY);
    let mut ident_interner = Interner::with_capacity(256);

    let program = parser::parse_program(src, &mut tokens, &mut ident_interner)
        .map_err(|errors| Diagnostics::new(&ident_interner, &errors))?;
    codegen::generate(&ident_interner, &program)
        .map_err(|errors| Diagnostics::new(&ident_interner, &errors))
}

/// The rendered errors of a failed compilation, one per line, each prefixed
/// with its `line:column` position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostics {
    messages: Vec<String>,
}

impl Diagnostics {
    pub fn new<E>(ident_interner: &Interner, errors: &[token::Spanned<E>]) -> Diagnostics
    where
        token::Spanned<E>: Show,
    {
        let ctx = Context { ident_interner };
        let messages = errors
            .iter()
            .map(|error| format!("{:#}", error.display(&ctx)))
            .collect();
        Diagnostics { messages }
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }
}

impl std::fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, message) in self.messages.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{message}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostics {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_ok() {
        let code = compile("var x = 1; if (x == 1) { print(x); }").unwrap();
        assert!(code.starts_with(codegen::PRELUDE));
        assert!(code.contains("meow_print(m_x);"));
        assert!(code.trim_end().ends_with("return 0;\n}"));
    }

    #[test]
    fn test_compile_reports_parse_errors() {
        let diagnostics = compile("var = ;\nvar y = 1 +;").unwrap_err();
        assert_eq!(
            diagnostics.messages(),
            [
                "1:5: expected token Identifier, but got Equal",
                "2:12: unexpected token Semicolon in expression",
            ]
        );
        assert_eq!(
            diagnostics.to_string(),
            "1:5: expected token Identifier, but got Equal\n\
             2:12: unexpected token Semicolon in expression"
        );
    }

    #[test]
    fn test_compile_reports_lowering_errors() {
        let diagnostics = compile("continue;").unwrap_err();
        assert_eq!(diagnostics.messages(), ["1:1: continue outside of a loop"]);
    }
}
