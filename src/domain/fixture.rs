// Parse outcomes and fixture records for cel-fixtures.

use cel_syntax::Ast;

/// Result of handing one expression to the expression parser.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    /// Tree plus macro-call provenance (carried in `Ast::source_info`).
    Parsed(Ast),
    /// The parser's display text for all reported errors.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordResult {
    Ast(String),
    Error(String),
}

/// One `(expression, rendering-or-error)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureRecord {
    pub expression: String,
    pub result: RecordResult,
}

impl FixtureRecord {
    pub fn parsed(expression: impl Into<String>, rendering: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            result: RecordResult::Ast(rendering.into()),
        }
    }

    pub fn failed(expression: impl Into<String>, error_text: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            result: RecordResult::Error(error_text.into()),
        }
    }

    pub fn annotated_rendering(&self) -> Option<&str> {
        match &self.result {
            RecordResult::Ast(text) => Some(text),
            RecordResult::Error(_) => None,
        }
    }

    pub fn error_text(&self) -> Option<&str> {
        match &self.result {
            RecordResult::Error(text) => Some(text),
            RecordResult::Ast(_) => None,
        }
    }

    pub fn is_parsed(&self) -> bool {
        matches!(self.result, RecordResult::Ast(_))
    }
}
