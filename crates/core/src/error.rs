use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a validation failure.
///
/// Validation is fail-fast: the first error of any kind aborts the run, so
/// a program is only ever associated with one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    /// An invalid character voids the whole token stream.
    Lexical,
    VariableDefinition,
    ProcedureDefinition,
    ProcedureCall,
    Condition,
    IfStatement,
    WhileStatement,
    ForStatement,
    VariableAssignment,
    /// Some construct flag (bracket nesting, pipe parity) did not return
    /// to its initial state by the end of the range.
    UnterminatedConstruct,
    /// Block nesting exceeded the depth bound.
    RecursionLimit,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Lexical => "lexical",
            ErrorKind::VariableDefinition => "variable-definition",
            ErrorKind::ProcedureDefinition => "procedure-definition",
            ErrorKind::ProcedureCall => "procedure-call",
            ErrorKind::Condition => "condition",
            ErrorKind::IfStatement => "if-statement",
            ErrorKind::WhileStatement => "while-statement",
            ErrorKind::ForStatement => "for-statement",
            ErrorKind::VariableAssignment => "variable-assignment",
            ErrorKind::UnterminatedConstruct => "unterminated-construct",
            ErrorKind::RecursionLimit => "recursion-limit",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validation error: the failure kind plus the offending token's
/// position. The core does no presentation beyond this; the CLI owns
/// formatting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind} error at {file}:{line}:{column}: {message}")]
pub struct CheckError {
    pub kind: ErrorKind,
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub message: String,
}

impl CheckError {
    pub fn new(
        kind: ErrorKind,
        file: &str,
        line: u32,
        column: u32,
        message: impl Into<String>,
    ) -> Self {
        CheckError {
            kind,
            file: file.to_owned(),
            line,
            column,
            message: message.into(),
        }
    }

    pub fn lexical(file: &str, line: u32, column: u32, message: impl Into<String>) -> Self {
        CheckError::new(ErrorKind::Lexical, file, line, column, message)
    }

    /// Serialize to a stable JSON shape for machine consumers.
    pub fn to_json_value(&self) -> serde_json::Value {
        serde_json::json!({
            "kind":    self.kind.as_str(),
            "file":    self.file,
            "line":    self.line,
            "column":  self.column,
            "message": self.message,
        })
    }
}
