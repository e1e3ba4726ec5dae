//! Whole-program validation: tokenize, then structurally validate against
//! a fresh context.

use crate::error::CheckError;
use crate::lexer;
use crate::validate::{self, CheckContext};

/// Validate Rover source text. Returns the first error encountered, or
/// `Ok(())` when the program is valid. Each call builds its own
/// [`CheckContext`], so concurrent callers never share state; use
/// [`validate::validate`] directly to accumulate definitions across
/// ranges.
pub fn check(source: &str, filename: &str) -> Result<(), CheckError> {
    let tokens = lexer::lex(source, filename)?;
    let mut ctx = CheckContext::new();
    validate::validate(&tokens, filename, &mut ctx)
}
