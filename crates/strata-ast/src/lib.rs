//! The Strata configuration language's type-checked AST.
//!
//! Strata is a struct-and-schema configuration language. This crate is
//! the data model shared by the resolver and the semantic validator: a
//! fully resolved AST, source locations, and the side table mapping
//! expressions to their resolved types.
//!
//! Parsing and name/type resolution live upstream; everything here is
//! read-only input for later phases.

#![warn(missing_docs)]

pub mod arena;
mod ast;
mod loc;
mod types;

#[cfg(test)]
mod tests;

pub use ast::*;
pub use loc::{Located, Location};
pub use types::{Type, TypeTable};
