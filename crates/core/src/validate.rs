//! Recursive structural validation of a token sequence.
//!
//! The validator is a recursive-descent walk: each construct consumes a
//! contiguous run of tokens and recurses into nested block bodies with the
//! appropriate scope. All mutable state lives in the [`CheckContext`]
//! passed in by the caller; nothing is ambient, so independent runs never
//! interfere.

use crate::error::{CheckError, ErrorKind};
use crate::lexer::{Spanned, Token};
use crate::matcher::{self, Call, MatchFailure};
use crate::registry::{self, ParamKind, Registry, Selector};
use crate::scope::{Binding, Scopes, ValueKind};

/// Nesting depth bound for blocks and procedure bodies.
const MAX_DEPTH: u32 = 128;

/// All state for one validation run: the fixed built-in tables, the
/// growing user-procedure table, and the variable scopes. Construct one
/// per run; the built-in tables are built exactly once per context.
#[derive(Debug)]
pub struct CheckContext {
    procedures: Registry,
    conditions: Registry,
    user: Registry,
    scopes: Scopes,
}

impl CheckContext {
    pub fn new() -> Self {
        CheckContext {
            procedures: registry::builtin_procedures(),
            conditions: registry::builtin_conditions(),
            user: Registry::new(),
            scopes: Scopes::new(),
        }
    }

    /// The user-procedure table accumulated so far.
    pub fn user_procedures(&self) -> &Registry {
        &self.user
    }
}

impl Default for CheckContext {
    fn default() -> Self {
        CheckContext::new()
    }
}

/// Validate a whole token sequence against the context. Fail-fast: the
/// first error aborts the run and propagates out of every enclosing
/// construct.
pub fn validate(
    tokens: &[Spanned],
    filename: &str,
    ctx: &mut CheckContext,
) -> Result<(), CheckError> {
    if tokens.is_empty() {
        return Err(CheckError::new(
            ErrorKind::UnterminatedConstruct,
            filename,
            1,
            0,
            "empty program",
        ));
    }
    let mut checker = Checker {
        tokens,
        pos: 0,
        depth: 0,
        file: filename.to_owned(),
        ctx,
    };
    checker.program()
}

struct Checker<'a> {
    tokens: &'a [Spanned],
    pos: usize,
    depth: u32,
    file: String,
    ctx: &'a mut CheckContext,
}

impl<'a> Checker<'a> {
    fn cur(&self) -> &Spanned {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek(&self) -> &Token {
        &self.cur().token
    }

    fn peek2(&self) -> &Token {
        let i = (self.pos + 1).min(self.tokens.len() - 1);
        &self.tokens[i].token
    }

    fn advance(&mut self) -> &Spanned {
        let i = self.pos.min(self.tokens.len() - 1);
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        &self.tokens[i]
    }

    fn err(&self, kind: ErrorKind, msg: impl Into<String>) -> CheckError {
        let s = self.cur();
        CheckError::new(kind, &self.file, s.line, s.column, msg)
    }

    fn err_at(&self, kind: ErrorKind, at: &Spanned, msg: impl Into<String>) -> CheckError {
        CheckError::new(kind, &self.file, at.line, at.column, msg)
    }

    fn expect_colon(&mut self, kind: ErrorKind, after: &str) -> Result<(), CheckError> {
        if self.peek() == &Token::Colon {
            self.advance();
            Ok(())
        } else {
            Err(self.err(kind, format!("expected ':' after '{}'", after)))
        }
    }

    fn expect_keyword(&mut self, want: Token, kind: ErrorKind) -> Result<(), CheckError> {
        if self.peek() == &want {
            self.advance();
            Ok(())
        } else {
            Err(self.err(
                kind,
                format!("expected '{}', got '{}'", want.lexeme(), self.peek().lexeme()),
            ))
        }
    }

    fn expect_block(&mut self, kind: ErrorKind) -> Result<(), CheckError> {
        if self.peek() != &Token::BracketOpen {
            return Err(self.err(kind, "expected '[' to open block"));
        }
        self.block()
    }

    fn program(&mut self) -> Result<(), CheckError> {
        if self.peek() == &Token::Eof {
            return Err(self.err(ErrorKind::UnterminatedConstruct, "empty program"));
        }
        while self.peek() != &Token::Eof {
            if self.peek() == &Token::BracketClose {
                return Err(self.err(ErrorKind::UnterminatedConstruct, "unmatched ']'"));
            }
            self.statement()?;
        }
        Ok(())
    }

    fn statement(&mut self) -> Result<(), CheckError> {
        match self.peek() {
            Token::Pipe => self.variable_block(),
            Token::Proc => self.procedure_definition(),
            Token::If => self.if_statement(),
            Token::While => self.while_statement(),
            Token::For => self.for_statement(),
            Token::BracketOpen => self.block(),
            Token::Ident(_) => {
                if self.peek2() == &Token::Assign {
                    self.assignment()
                } else {
                    self.call()
                }
            }
            other => Err(self.err(
                ErrorKind::ProcedureCall,
                format!("unexpected token '{}'", other.lexeme()),
            )),
        }
    }

    /// `| name* |` -- every token between the pipes must be an identifier;
    /// each becomes an unbound binding in the innermost scope.
    fn variable_block(&mut self) -> Result<(), CheckError> {
        self.advance();
        loop {
            match self.peek().clone() {
                Token::Pipe => {
                    self.advance();
                    return Ok(());
                }
                Token::Ident(name) => {
                    self.advance();
                    self.ctx.scopes.declare(&name);
                }
                Token::Eof | Token::BracketClose => {
                    return Err(
                        self.err(ErrorKind::UnterminatedConstruct, "unclosed variable block")
                    );
                }
                other => {
                    return Err(self.err(
                        ErrorKind::VariableDefinition,
                        format!("expected variable name, got '{}'", other.lexeme()),
                    ));
                }
            }
        }
    }

    /// `proc k1 [: p1 [k2 : p2 ...]] [ body ]` -- the header mirrors the
    /// keyword shape of a call. The selector is registered before the body
    /// is validated, so a procedure may call itself; the body runs with a
    /// fresh locals frame seeded from the parameters.
    fn procedure_definition(&mut self) -> Result<(), CheckError> {
        self.advance();
        let mut parts: Vec<String> = Vec::new();
        let mut params: Vec<String> = Vec::new();

        match self.peek().clone() {
            Token::Ident(name) => {
                self.advance();
                parts.push(name);
            }
            other => {
                return Err(self.err(
                    ErrorKind::ProcedureDefinition,
                    format!("expected procedure name, got '{}'", other.lexeme()),
                ));
            }
        }

        if self.peek() == &Token::Colon {
            loop {
                self.advance();
                match self.peek().clone() {
                    Token::Ident(p) => {
                        self.advance();
                        params.push(p);
                    }
                    other => {
                        return Err(self.err(
                            ErrorKind::ProcedureDefinition,
                            format!("expected parameter name, got '{}'", other.lexeme()),
                        ));
                    }
                }
                match (self.peek().clone(), self.peek2().clone()) {
                    (Token::Ident(part), Token::Colon) => {
                        self.advance();
                        parts.push(part);
                        // loop consumes the ':'
                    }
                    _ => break,
                }
            }
        }

        if self.peek() != &Token::BracketOpen {
            return Err(self.err(
                ErrorKind::ProcedureDefinition,
                "expected '[' to open procedure body",
            ));
        }

        self.ctx
            .user
            .register(Selector::new(parts), vec![ParamKind::Variable; params.len()]);

        self.ctx.scopes.push_frame(&params);
        let body = self.block();
        self.ctx.scopes.pop_frame();
        body
    }

    /// `if: cond then: [ ... ] else: [ ... ]` -- both branches share the
    /// enclosing scope; conditionals introduce no new bindings.
    fn if_statement(&mut self) -> Result<(), CheckError> {
        self.advance();
        self.expect_colon(ErrorKind::IfStatement, "if")?;
        self.condition(ErrorKind::IfStatement)?;
        self.expect_keyword(Token::Then, ErrorKind::IfStatement)?;
        self.expect_colon(ErrorKind::IfStatement, "then")?;
        self.expect_block(ErrorKind::IfStatement)?;
        self.expect_keyword(Token::Else, ErrorKind::IfStatement)?;
        self.expect_colon(ErrorKind::IfStatement, "else")?;
        self.expect_block(ErrorKind::IfStatement)
    }

    /// `while: cond do: [ ... ]`.
    fn while_statement(&mut self) -> Result<(), CheckError> {
        self.advance();
        self.expect_colon(ErrorKind::WhileStatement, "while")?;
        self.condition(ErrorKind::WhileStatement)?;
        self.expect_keyword(Token::Do, ErrorKind::WhileStatement)?;
        self.expect_colon(ErrorKind::WhileStatement, "do")?;
        self.expect_block(ErrorKind::WhileStatement)
    }

    /// `for: count repeat: [ ... ]` -- the count must be a number literal
    /// or a variable that resolves to one.
    fn for_statement(&mut self) -> Result<(), CheckError> {
        self.advance();
        self.expect_colon(ErrorKind::ForStatement, "for")?;
        match self.peek().clone() {
            Token::Number(_) => {
                self.advance();
            }
            Token::Ident(name) => {
                if self.ctx.scopes.resolve_kind(&name) != Some(ValueKind::Numeric) {
                    return Err(self.err(
                        ErrorKind::ForStatement,
                        format!("'{}' does not resolve to a number", name),
                    ));
                }
                self.advance();
            }
            other => {
                return Err(self.err(
                    ErrorKind::ForStatement,
                    format!("expected repeat count, got '{}'", other.lexeme()),
                ));
            }
        }
        self.expect_keyword(Token::Repeat, ErrorKind::ForStatement)?;
        self.expect_colon(ErrorKind::ForStatement, "repeat")?;
        self.expect_block(ErrorKind::ForStatement)
    }

    /// A built-in condition, optionally negated: `[not:] name [: arg ...]`.
    /// The `not:` prefix is stripped before the selector is matched. A run
    /// too malformed to parse as a keyword message is a condition error; a
    /// well-shaped run that matches no built-in condition takes the
    /// enclosing statement's error kind.
    fn condition(&mut self, kind: ErrorKind) -> Result<(), CheckError> {
        if matches!(self.peek(), Token::Ident(w) if w == "not") && self.peek2() == &Token::Colon {
            self.advance();
            self.advance();
        }
        let start = self.cur().clone();
        let call = self.parse_keyword_run(ErrorKind::Condition)?;
        match matcher::match_signature(&call, &self.ctx.conditions, &self.ctx.scopes) {
            Ok(()) => Ok(()),
            Err(MatchFailure::UnknownSelector | MatchFailure::Shape) => Err(self.err_at(
                kind,
                &start,
                format!("unknown condition '{}'", call.selector),
            )),
            Err(MatchFailure::Argument { index }) => Err(self.err_at(
                kind,
                &start,
                format!(
                    "condition '{}': argument {} does not match",
                    call.selector,
                    index + 1
                ),
            )),
        }
    }

    /// Parse `name [: arg [name2 : arg2 ...]]` into a selector plus
    /// argument tokens. Does not consume the terminator.
    fn parse_keyword_run(&mut self, kind: ErrorKind) -> Result<Call, CheckError> {
        let mut parts: Vec<String> = Vec::new();
        let mut args: Vec<Spanned> = Vec::new();

        match self.peek().clone() {
            Token::Ident(name) => {
                self.advance();
                parts.push(name);
            }
            other => {
                return Err(self.err(
                    kind,
                    format!("expected identifier, got '{}'", other.lexeme()),
                ));
            }
        }

        if self.peek() == &Token::Colon {
            loop {
                self.advance();
                match self.peek() {
                    Token::Number(_) | Token::Constant(_) | Token::Ident(_) => {
                        let arg = self.advance().clone();
                        args.push(arg);
                    }
                    other => {
                        return Err(self.err(
                            kind,
                            format!("expected argument, got '{}'", other.lexeme()),
                        ));
                    }
                }
                match (self.peek().clone(), self.peek2().clone()) {
                    (Token::Ident(part), Token::Colon) => {
                        self.advance();
                        parts.push(part);
                        // loop consumes the ':'
                    }
                    _ => break,
                }
            }
        }

        Ok(Call {
            selector: Selector::new(parts),
            args,
        })
    }

    /// A keyword-message call, tried against user procedures first, then
    /// built-in procedures; the first full match wins. The run ends at '.'
    /// (consumed) or at the ']' closing the enclosing block (left in
    /// place). There is no retry: a run either matches or fails here.
    fn call(&mut self) -> Result<(), CheckError> {
        let start = self.cur().clone();
        let call = self.parse_keyword_run(ErrorKind::ProcedureCall)?;

        match self.peek() {
            Token::Period => {
                self.advance();
            }
            Token::BracketClose => {}
            _ => {
                return Err(self.err(
                    ErrorKind::ProcedureCall,
                    format!("expected '.' after call to '{}'", call.selector),
                ));
            }
        }

        let outcome = matcher::match_signature(&call, &self.ctx.user, &self.ctx.scopes).or_else(
            |user_failure| {
                matcher::match_signature(&call, &self.ctx.procedures, &self.ctx.scopes).map_err(
                    |builtin_failure| match (user_failure, builtin_failure) {
                        // keep the failure that got past selector lookup
                        (f @ MatchFailure::Argument { .. }, MatchFailure::UnknownSelector) => f,
                        (_, f) => f,
                    },
                )
            },
        );

        match outcome {
            Ok(()) => Ok(()),
            Err(MatchFailure::UnknownSelector | MatchFailure::Shape) => Err(self.err_at(
                ErrorKind::ProcedureCall,
                &start,
                format!("no procedure matches '{}'", call.selector),
            )),
            Err(MatchFailure::Argument { index }) => Err(self.err_at(
                ErrorKind::ProcedureCall,
                &start,
                format!(
                    "call to '{}': argument {} does not match",
                    call.selector,
                    index + 1
                ),
            )),
        }
    }

    /// `IDENT := (NUMBER|CONSTANT|IDENT) .` -- rebinding, not
    /// redeclaration: the target (and an identifier right-hand side) must
    /// already be visible.
    fn assignment(&mut self) -> Result<(), CheckError> {
        let target_span = self.cur().clone();
        let target = match self.peek().clone() {
            Token::Ident(name) => name,
            other => {
                return Err(self.err(
                    ErrorKind::VariableAssignment,
                    format!("expected variable name, got '{}'", other.lexeme()),
                ));
            }
        };
        self.advance();
        if !self.ctx.scopes.contains(&target) {
            return Err(self.err_at(
                ErrorKind::VariableAssignment,
                &target_span,
                format!("variable '{}' used but never defined", target),
            ));
        }

        if self.peek() != &Token::Assign {
            return Err(self.err(ErrorKind::VariableAssignment, "expected ':='"));
        }
        self.advance();

        let binding = match self.peek().clone() {
            Token::Number(n) => Binding::Number(n),
            Token::Constant(c) => Binding::Symbol(c),
            Token::Ident(name) => {
                if !self.ctx.scopes.contains(&name) {
                    return Err(self.err(
                        ErrorKind::VariableAssignment,
                        format!("variable '{}' used but never defined", name),
                    ));
                }
                Binding::Alias(name)
            }
            other => {
                return Err(self.err(
                    ErrorKind::VariableAssignment,
                    format!(
                        "expected number, constant, or variable, got '{}'",
                        other.lexeme()
                    ),
                ));
            }
        };
        self.advance();

        if self.peek() != &Token::Period {
            return Err(self.err(ErrorKind::VariableAssignment, "expected '.' after assignment"));
        }
        self.advance();

        self.ctx.scopes.assign(&target, binding);
        Ok(())
    }

    /// `[ ... ]` -- validates the body in the current scope, depth-bounded.
    fn block(&mut self) -> Result<(), CheckError> {
        if self.depth >= MAX_DEPTH {
            return Err(self.err(ErrorKind::RecursionLimit, "blocks nested too deeply"));
        }
        self.depth += 1;
        let open = self.cur().clone();
        self.advance();
        let result = loop {
            match self.peek() {
                Token::BracketClose => {
                    self.advance();
                    break Ok(());
                }
                Token::Eof => {
                    break Err(self.err_at(
                        ErrorKind::UnterminatedConstruct,
                        &open,
                        "unclosed block",
                    ));
                }
                _ => {
                    if let Err(e) = self.statement() {
                        break Err(e);
                    }
                }
            }
        };
        self.depth -= 1;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;

    fn run(src: &str) -> Result<(), CheckError> {
        let tokens = lex(src, "test.rov").expect("lexes");
        let mut ctx = CheckContext::new();
        validate(&tokens, "test.rov", &mut ctx)
    }

    fn kind_of(src: &str) -> ErrorKind {
        run(src).expect_err("should fail").kind
    }

    #[test]
    fn declared_variable_flows_into_a_call() {
        assert!(run("|x| x := 5 . move: x .").is_ok());
    }

    #[test]
    fn assignment_to_undeclared_variable_fails() {
        assert_eq!(kind_of("|x| y := 5 ."), ErrorKind::VariableAssignment);
    }

    #[test]
    fn undeclared_right_hand_side_fails() {
        assert_eq!(kind_of("|x| x := y ."), ErrorKind::VariableAssignment);
    }

    #[test]
    fn variable_is_unusable_before_its_block() {
        assert_eq!(kind_of("x := 5 . |x|"), ErrorKind::VariableAssignment);
    }

    #[test]
    fn numeric_acceptance_is_transitive() {
        assert!(run("|x y z| x := 5 . y := x . z := y . move: z .").is_ok());
    }

    #[test]
    fn enum_slot_rejects_a_variable_bound_to_a_matching_constant() {
        assert_eq!(
            kind_of("|d| d := #north . move: 1 inDir: d ."),
            ErrorKind::ProcedureCall
        );
    }

    #[test]
    fn procedure_definition_then_call() {
        assert!(run("proc turnAround [ turn: #around . ] turnAround .").is_ok());
    }

    #[test]
    fn procedure_parameters_are_visible_in_the_body() {
        assert!(run("proc helper: v [ nop . ] proc fill: n [ helper: n . ] fill: 3 .").is_ok());
    }

    #[test]
    fn unassigned_parameter_does_not_satisfy_a_numeric_slot() {
        // parameters start unbound; a numeric slot needs a resolved type
        assert_eq!(kind_of("proc fill: n [ move: n . ] fill: 3 ."), ErrorKind::ProcedureCall);
    }

    #[test]
    fn rebound_parameter_satisfies_numeric_slots() {
        assert!(run("proc fill: n [ n := 2 . move: n . ] fill: 3 .").is_ok());
    }

    #[test]
    fn multi_keyword_procedure_header() {
        assert!(run("proc fill: n with: kind [ nop . ] fill: 2 with: #chips .").is_ok());
    }

    #[test]
    fn locals_do_not_leak_out_of_the_body() {
        assert_eq!(
            kind_of("proc fill: n [ nop . ] move: n ."),
            ErrorKind::ProcedureCall
        );
    }

    #[test]
    fn globals_stay_visible_inside_a_body() {
        assert!(run("|g| g := 2 . proc go [ move: g . ] go .").is_ok());
    }

    #[test]
    fn procedures_may_call_themselves() {
        assert!(run("proc again [ again . ] again .").is_ok());
    }

    #[test]
    fn user_procedures_shadow_builtins() {
        // the builtin `turn` only accepts #left/#right/#around; the user
        // definition takes any variable or literal and is consulted first
        assert!(run("proc turn: d [ nop . ] turn: #north .").is_ok());
    }

    #[test]
    fn latest_procedure_redefinition_wins() {
        assert!(run("proc go [ nop . ] proc go: n [ move: n . ] go: 2 .").is_ok());
        // zero-argument `go` was replaced by the one-argument form
        assert_eq!(
            kind_of("proc go [ nop . ] proc go: n [ move: n . ] go ."),
            ErrorKind::ProcedureCall
        );
    }

    #[test]
    fn if_requires_a_known_condition() {
        assert!(
            run("if: canMove: 1 inDir: #north then: [ move: 1 inDir: #north . ] else: [ nop . ]")
                .is_ok()
        );
        assert_eq!(
            kind_of("if: happy then: [ nop . ] else: [ nop . ]"),
            ErrorKind::IfStatement
        );
    }

    #[test]
    fn if_condition_may_be_negated() {
        assert!(run("if: not: facing: #south then: [ turn: #around . ] else: [ nop . ]").is_ok());
    }

    #[test]
    fn if_without_else_fails() {
        assert_eq!(
            kind_of("if: facing: #north then: [ nop . ]"),
            ErrorKind::IfStatement
        );
    }

    #[test]
    fn empty_condition_is_a_condition_error() {
        assert_eq!(
            kind_of("if: then: [ nop . ] else: [ nop . ]"),
            ErrorKind::Condition
        );
    }

    #[test]
    fn while_do_validates_guard_and_body() {
        assert!(run("while: canPick: 1 ofType: #chips do: [ pick: 1 ofType: #chips . ]").is_ok());
        assert_eq!(
            kind_of("while: facing: #north [ nop . ]"),
            ErrorKind::WhileStatement
        );
    }

    #[test]
    fn for_count_must_resolve_to_a_number() {
        assert!(run("for: 3 repeat: [ move: 1 . ]").is_ok());
        assert!(run("|n| n := 4 . for: n repeat: [ move: 1 . ]").is_ok());
        assert_eq!(
            kind_of("|d| d := #north . for: d repeat: [ nop . ]"),
            ErrorKind::ForStatement
        );
    }

    #[test]
    fn bare_blocks_share_the_enclosing_scope() {
        assert!(run("|x| [ x := 5 . [ move: x . ] ]").is_ok());
    }

    #[test]
    fn cyclic_assignment_never_resolves() {
        assert_eq!(kind_of("|x| x := x . move: x ."), ErrorKind::ProcedureCall);
    }

    #[test]
    fn unclosed_procedure_body_is_unterminated() {
        assert_eq!(
            kind_of("proc p [ move: 1 ."),
            ErrorKind::UnterminatedConstruct
        );
    }

    #[test]
    fn stray_bracket_close_is_unterminated() {
        assert_eq!(kind_of("nop . ]"), ErrorKind::UnterminatedConstruct);
    }

    #[test]
    fn unclosed_variable_block_is_unterminated() {
        assert_eq!(kind_of("|x y"), ErrorKind::UnterminatedConstruct);
    }

    #[test]
    fn non_identifier_in_variable_block() {
        assert_eq!(kind_of("|x 5|"), ErrorKind::VariableDefinition);
    }

    #[test]
    fn empty_program_is_invalid() {
        assert_eq!(kind_of(""), ErrorKind::UnterminatedConstruct);
    }

    #[test]
    fn call_may_be_closed_by_the_enclosing_block() {
        assert!(run("[ move: 1 ]").is_ok());
    }

    #[test]
    fn deep_nesting_hits_the_recursion_limit() {
        let mut src = String::new();
        for _ in 0..200 {
            src.push('[');
        }
        src.push_str("nop .");
        for _ in 0..200 {
            src.push(']');
        }
        assert_eq!(kind_of(&src), ErrorKind::RecursionLimit);
    }

    #[test]
    fn validated_definitions_land_in_the_user_table() {
        let mut ctx = CheckContext::new();
        let tokens = lex("proc fill: n with: kind [ nop . ]", "test.rov").expect("lexes");
        validate(&tokens, "test.rov", &mut ctx).expect("valid");
        let table = ctx.user_procedures();
        assert_eq!(table.len(), 1);
        assert!(table.contains(&crate::registry::Selector::from_parts(&["fill", "with"])));
    }

    #[test]
    fn scope_state_survives_across_statements() {
        let mut ctx = CheckContext::new();
        let tokens = lex("|x| x := 5 .", "test.rov").expect("lexes");
        validate(&tokens, "test.rov", &mut ctx).expect("valid");
        // same context: x is still bound for a later range
        let tokens = lex("move: x .", "test.rov").expect("lexes");
        assert!(validate(&tokens, "test.rov", &mut ctx).is_ok());
    }
}
