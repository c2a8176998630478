//! Interpreter module for neet.
//!
//! This module provides variable scopes, `$` interpolation and the tick
//! engine that evaluates one line at a time.
//!
//! # Architecture
//!
//! - **Scope**: Variable bindings with fixed tags, one per instance plus the global scope
//! - **interpolate**: Single-pass `$` expansion against a merged local/global view
//! - **tick**: Line evaluation, the `LineContext` given to commands, and counter advance
//!
//! # Example
//!
//! ```
//! use neet_kernel::interpreter::{interpolate, Scope};
//! use neet_types::Variable;
//!
//! let mut scope = Scope::new();
//! scope.assign("name", Variable::text("world")).unwrap();
//!
//! let out = interpolate("hello $name$$n", |n| {
//!     scope.get(n).and_then(Variable::as_text).map(str::to_string)
//! });
//! assert_eq!(out, "hello world\n");
//! ```

mod interpolate;
mod scope;
pub(crate) mod tick;

pub use interpolate::{interpolate, lookup_text};
pub use scope::{validate_name, AssignError, Scope};
pub use tick::{EvalMode, Evaluation, TickOutcome};
