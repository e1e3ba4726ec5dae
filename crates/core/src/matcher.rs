//! Signature matching for keyword-message calls and conditions.

use crate::lexer::{Spanned, Token};
use crate::registry::{ParamKind, Registry, Selector};
use crate::scope::{Scopes, ValueKind};

/// A parsed keyword-message run: selector parts plus argument tokens, in
/// call order.
#[derive(Debug)]
pub struct Call {
    pub selector: Selector,
    pub args: Vec<Spanned>,
}

/// Why a call failed to match a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchFailure {
    /// No signature is registered under this selector.
    UnknownSelector,
    /// The selector exists but the argument count disagrees with it.
    Shape,
    /// Argument at `index` (0-based) does not satisfy its descriptor.
    Argument { index: usize },
}

/// Match a parsed call against one registry. The selector is a canonical
/// map key, so keyword-part and colon-placement agreement is exact and
/// ambiguous partial matches cannot occur; arguments are then checked in
/// order against the signature's descriptors.
pub fn match_signature(
    call: &Call,
    registry: &Registry,
    scopes: &Scopes,
) -> Result<(), MatchFailure> {
    let params = registry
        .lookup(&call.selector)
        .ok_or(MatchFailure::UnknownSelector)?;
    if params.len() != call.args.len() {
        return Err(MatchFailure::Shape);
    }
    for (index, (param, arg)) in params.iter().zip(&call.args).enumerate() {
        if !argument_satisfies(param, &arg.token, scopes) {
            return Err(MatchFailure::Argument { index });
        }
    }
    Ok(())
}

fn argument_satisfies(param: &ParamKind, arg: &Token, scopes: &Scopes) -> bool {
    match (param, arg) {
        (ParamKind::Numeric, Token::Number(_)) => true,
        (ParamKind::Numeric, Token::Ident(name)) => {
            scopes.resolve_kind(name) == Some(ValueKind::Numeric)
        }
        // Enum slots are literal-only: a variable bound to a matching
        // constant never qualifies.
        (ParamKind::Symbol(allowed), Token::Constant(lexeme)) => {
            allowed.contains(&lexeme.as_str())
        }
        (ParamKind::Variable, Token::Ident(name)) => scopes.contains(name),
        (ParamKind::Variable, Token::Number(_) | Token::Constant(_)) => true,
        _ => false,
    }
}
