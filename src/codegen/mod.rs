//! Lowering of the AST into C.
//!
//! Every meow value is a `long long`. Functions are hoisted to file scope, and
//! the top-level statements run, in order, inside the synthesized `main`.

mod c;
pub mod interface;


pub use c::PRELUDE;
pub use interface::{generate, Error};
