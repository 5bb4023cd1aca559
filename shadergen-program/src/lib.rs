//! The resolved program representation consumed by shadergen.
//!
//! A front end parses and type-checks the host language, folds constants, resolves every
//! name to a `(declaring type, member, kind)` triple and hands the result over as a
//! [`ResolvedProgram`]. Nothing in this crate performs analysis; it only describes the
//! input contract and offers constructors that keep hand-built programs readable.
//!
//! Re-exported as `shadergen::program`.

mod decl;
mod error;
mod location;
mod program;
mod tree;
mod types;
mod visit;

pub use decl::*;
pub use error::*;
pub use location::*;
pub use program::*;
pub use tree::*;
pub use types::*;
