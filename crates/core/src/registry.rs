//! Signature tables for procedures and conditions.
//!
//! Three registries exist per validation run: the two fixed built-in
//! tables constructed here, and the user-procedure table that grows as
//! `proc` definitions are validated.

use std::collections::BTreeMap;
use std::fmt;

/// Canonical key for a keyword-message pattern: the ordered keyword parts.
/// `move: 2 inDir: #north` has the selector parts `["move", "inDir"]`.
/// Selectors from different token instances compare equal whenever their
/// parts do, so textually identical patterns always hit the same entry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Selector(Vec<String>);

impl Selector {
    pub fn new(parts: Vec<String>) -> Self {
        Selector(parts)
    }

    pub fn from_parts(parts: &[&str]) -> Self {
        Selector(parts.iter().map(|p| (*p).to_owned()).collect())
    }

    pub fn parts(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(":"))
    }
}

/// What one signature slot accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// A number literal, or a variable whose binding chain reaches one.
    Numeric,
    /// A constant literal drawn from the allowed set. Literal only: a
    /// variable bound to a matching constant never qualifies.
    Symbol(&'static [&'static str]),
    /// Any visible variable, or a literal. User-procedure parameters are
    /// untyped placeholders and all register as this.
    Variable,
}

pub const DIRECTIONS: &[&str] = &["#north", "#south", "#west", "#east"];
pub const SIDES: &[&str] = &["#front", "#back", "#left", "#right"];
pub const SPINS: &[&str] = &["#left", "#right", "#around"];
pub const ITEMS: &[&str] = &["#chips", "#balloons"];

/// Signature table: selector -> expected argument kinds, in call order.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    entries: BTreeMap<Selector, Vec<ParamKind>>,
}

impl Registry {
    pub fn new() -> Self {
        Registry {
            entries: BTreeMap::new(),
        }
    }

    /// Register a signature. Re-registering an existing selector replaces
    /// the previous entry: the latest definition governs dispatch.
    pub fn register(&mut self, selector: Selector, params: Vec<ParamKind>) {
        self.entries.insert(selector, params);
    }

    pub fn lookup(&self, selector: &Selector) -> Option<&[ParamKind]> {
        self.entries.get(selector).map(Vec::as_slice)
    }

    pub fn contains(&self, selector: &Selector) -> bool {
        self.entries.contains_key(selector)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The fixed table of robot action primitives.
pub fn builtin_procedures() -> Registry {
    use ParamKind::{Numeric, Symbol};
    let mut r = Registry::new();
    r.register(Selector::from_parts(&["goTo", "with"]), vec![Numeric, Numeric]);
    r.register(Selector::from_parts(&["move"]), vec![Numeric]);
    r.register(Selector::from_parts(&["turn"]), vec![Symbol(SPINS)]);
    r.register(Selector::from_parts(&["face"]), vec![Symbol(DIRECTIONS)]);
    r.register(Selector::from_parts(&["put", "ofType"]), vec![Numeric, Symbol(ITEMS)]);
    r.register(Selector::from_parts(&["pick", "ofType"]), vec![Numeric, Symbol(ITEMS)]);
    r.register(Selector::from_parts(&["move", "toThe"]), vec![Numeric, Symbol(SIDES)]);
    r.register(Selector::from_parts(&["jump", "toThe"]), vec![Numeric, Symbol(SIDES)]);
    r.register(Selector::from_parts(&["move", "inDir"]), vec![Numeric, Symbol(DIRECTIONS)]);
    r.register(Selector::from_parts(&["jump", "inDir"]), vec![Numeric, Symbol(DIRECTIONS)]);
    r.register(Selector::from_parts(&["nop"]), vec![]);
    r
}

/// The fixed table of robot query conditions. A condition call may carry a
/// `not:` prefix; the validator strips it before matching here.
pub fn builtin_conditions() -> Registry {
    use ParamKind::{Numeric, Symbol};
    let mut r = Registry::new();
    r.register(Selector::from_parts(&["facing"]), vec![Symbol(DIRECTIONS)]);
    r.register(Selector::from_parts(&["canPut", "ofType"]), vec![Numeric, Symbol(ITEMS)]);
    r.register(Selector::from_parts(&["canPick", "ofType"]), vec![Numeric, Symbol(ITEMS)]);
    r.register(Selector::from_parts(&["canMove", "inDir"]), vec![Numeric, Symbol(DIRECTIONS)]);
    r.register(Selector::from_parts(&["canJump", "inDir"]), vec![Numeric, Symbol(DIRECTIONS)]);
    r.register(Selector::from_parts(&["canMove", "toThe"]), vec![Numeric, Symbol(SIDES)]);
    r.register(Selector::from_parts(&["canJump", "toThe"]), vec![Numeric, Symbol(SIDES)]);
    r
}
