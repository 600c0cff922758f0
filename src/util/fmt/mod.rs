//! Rendering of meow trees and diagnostics.
//!
//! Identifiers are interned, so nothing in the AST or in an error can be
//! printed on its own. [`Show`] threads the [`Interner`] through instead.

use crate::util::intern::Interner;

pub mod error;
pub mod tree;

/// What a [`Show`] implementation may look up while rendering.
pub struct Context<'ident> {
    pub ident_interner: &'ident Interner,
}

/// Like [`std::fmt::Display`], but with access to the [`Context`]. The
/// alternate flag (`{:#}`) prefixes diagnostics with their `line:column`.
pub trait Show {
    fn show(&self, f: &mut std::fmt::Formatter<'_>, ctx: &Context<'_>) -> std::fmt::Result;

    /// Returns a type which can be displayed.
    fn display(&self, ctx: &Context<'_>) -> impl std::fmt::Display
    where
        Self: Sized,
    {
        Display(self, ctx)
    }
}

struct Display<'this, 'ctx, 'ident, T: Show>(&'this T, &'ctx Context<'ident>);

impl<T> std::fmt::Display for Display<'_, '_, '_, T>
where
    T: Show,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Display(this, ctx) = self;
        this.show(f, ctx)
    }
}
