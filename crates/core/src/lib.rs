//! rover-core: validator for the Rover robot-control language.
//!
//! Rover is a small Smalltalk-flavored language: variable blocks
//! (`|a b|`), procedure definitions (`proc fill: n [ ... ]`),
//! `if:then:else:`, `while:do:`, `for:repeat:`, assignments (`x := 5 .`),
//! and keyword-message calls to user procedures or the built-in robot
//! primitives (`move: 2 inDir: #north .`). The crate answers one
//! question: is a program syntactically and referentially valid, given
//! the variables and procedures accumulated so far?
//!
//! # Public API
//!
//! Key entry points are re-exported at the crate root:
//!
//! - [`check()`] -- tokenize and validate a whole program
//! - [`lex()`] -- tokenize source text
//! - [`validate()`] -- run the structural validator over a token sequence
//! - [`CheckContext`] -- registries plus global scope for one run
//! - [`CheckError`] / [`ErrorKind`] -- the failure classification

pub mod check;
pub mod error;
pub mod lexer;
pub mod matcher;
pub mod registry;
pub mod scope;
pub mod validate;

pub use check::check;
pub use error::{CheckError, ErrorKind};
pub use lexer::{lex, Spanned, Token};
pub use registry::{builtin_conditions, builtin_procedures, ParamKind, Registry, Selector};
pub use scope::{Binding, Scopes, ValueKind};
pub use validate::{validate, CheckContext};
