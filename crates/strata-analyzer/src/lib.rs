//! Static semantic validation for the Strata configuration language.
//!
//! The validator proves two families of facts about a type-checked
//! module, neither of which a tree-walking evaluator can provide:
//!
//! - **Definite assignment and call multiplicity**: every required
//!   property of a struct is assigned on every execution path before
//!   the instance completes, single-assign (`val`) properties are
//!   never written twice along any feasible path, and `once` methods
//!   are invoked at most once per path.
//! - **Match exhaustiveness and reachability**: every `match` covers
//!   its scrutinee's full value domain (or carries an `else`), and
//!   arms past the point of full coverage are flagged as unreachable.
//!
//! Both are single-pass forward dataflow problems over an acyclic
//! control-flow graph; the language has no loops, so no fixed-point
//! iteration is needed.
//!
//! The input, a type-checked AST and a resolved type table, is
//! consumed read-only. The output is an ordered list of structured
//! [`Diagnostic`]s and a codegen gate; rendering diagnostics into
//! caret/underline output is the host's concern.

mod analyze;
mod assign;
mod builtins;
mod cfg;
mod diag;
mod exhaust;

pub use analyze::{AliasMultiplicity, Analyzer, ModuleReport, UnitReport, analyze_unit};
pub use builtins::{BUILTINS, BuiltinSig, GLOBAL_CONSTS, GlobalConst, Shape, builtin, global_const};
pub use diag::{Diagnostic, DiagnosticKind, Diagnostics, Severity};
