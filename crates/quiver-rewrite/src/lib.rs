//! Pattern-driven identifier rewrite rules.
//!
//! A [`Rule`] pairs a regular expression with an identifier template; applied
//! to a path-like input (a filename, an import path), a matching rule yields
//! a [`VName`](quiver_types::VName) whose fields are expanded from the
//! match's capture groups. [`Rules`] is an ordered list of rules where the
//! first match wins. This is the mechanism indexers use to assign consistent
//! identifiers to files across corpora.
//!
//! Rule files are JSON:
//!
//! ```json
//! [
//!   {
//!     "pattern": "src/(.*)",
//!     "vname": { "corpus": "main", "path": "@1@" }
//!   }
//! ]
//! ```
//!
//! Patterns are implicitly anchored at both ends. Template fields may carry
//! `@n@` markers that expand to the n'th capture group of a successful
//! match.

pub mod error;
pub mod rules;

pub use error::{RewriteError, RewriteResult};
pub use rules::{Rule, Rules, VNameTemplate};
