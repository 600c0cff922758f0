use crate::{
    ast::Program,
    codegen::c::Generator,
    token::Spanned,
    util::intern::{Interner, Symbol},
};

/// Lowers a parsed program into the text of a standalone C99 translation
/// unit.
///
/// Lowering never stops at the first problem: every error found is returned,
/// and no code is returned alongside them.
pub fn generate(
    ident_interner: &Interner,
    program: &Program,
) -> Result<String, Vec<Spanned<Error>>> {
    Generator::new(ident_interner).generate(program)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// Member access (`object.member`) has no lowering.
    MemberAccess { member: Symbol },
    /// Only named functions may be called.
    IndirectCall,
    BreakOutsideLoop,
    ContinueOutsideLoop,
    /// An intrinsic was called with the wrong number of arguments.
    IntrinsicArity {
        name: Symbol,
        expected: usize,
        actual: usize,
    },
    /// A declaration would redeclare an array, or redeclare a scalar as an
    /// array, in the scope the name was declared in.
    ArrayRedeclaration { name: Symbol, was_array: bool },
}
