//! Parser configuration.

use thiserror::Error;

use crate::macros::Macro;
use crate::parser::Parser;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptionError {
    #[error("max recursion depth must be greater than or equal to -1: {0}")]
    MaxRecursionDepth(i32),
    #[error("error recovery limit must be greater than or equal to -1: {0}")]
    ErrorRecoveryLimit(i32),
    #[error("error recovery lookahead token limit must be at least 1: {0}")]
    ErrorRecoveryLookahead(i32),
    #[error("expression size code point limit must be greater than or equal to -1: {0}")]
    ExpressionSizeCodePointLimit(i32),
}

/// Resolved settings shared by every parse run of one [`Parser`].
#[derive(Debug, Clone)]
pub(crate) struct Options {
    /// `None` means unlimited.
    pub max_recursion_depth: Option<usize>,
    pub error_recovery_limit: Option<usize>,
    pub error_recovery_lookahead_token_limit: usize,
    pub expression_size_code_point_limit: Option<usize>,
    pub populate_macro_calls: bool,
    pub enable_variadic_operator_asts: bool,
    pub enable_optional_syntax: bool,
    pub enable_ident_escape_syntax: bool,
    pub macros: Vec<Macro>,
}

/// Builder for [`Parser`]. Values are validated by [`ParserBuilder::build`].
#[derive(Debug, Clone)]
pub struct ParserBuilder {
    max_recursion_depth: i32,
    error_recovery_limit: i32,
    error_recovery_lookahead_token_limit: i32,
    expression_size_code_point_limit: i32,
    populate_macro_calls: bool,
    enable_variadic_operator_asts: bool,
    enable_optional_syntax: bool,
    enable_ident_escape_syntax: bool,
    macros: Vec<Macro>,
}

impl Default for ParserBuilder {
    fn default() -> Self {
        Self {
            max_recursion_depth: 250,
            error_recovery_limit: 30,
            error_recovery_lookahead_token_limit: 256,
            expression_size_code_point_limit: 100_000,
            populate_macro_calls: false,
            enable_variadic_operator_asts: false,
            enable_optional_syntax: false,
            enable_ident_escape_syntax: false,
            macros: Vec::new(),
        }
    }
}

impl ParserBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register macros. Later registrations with the same key win.
    pub fn macros(mut self, macros: impl IntoIterator<Item = Macro>) -> Self {
        self.macros.extend(macros);
        self
    }

    /// `-1` disables the limit.
    pub fn max_recursion_depth(mut self, limit: i32) -> Self {
        self.max_recursion_depth = limit;
        self
    }

    /// `-1` disables the limit.
    pub fn error_recovery_limit(mut self, limit: i32) -> Self {
        self.error_recovery_limit = limit;
        self
    }

    pub fn error_recovery_lookahead_token_limit(mut self, limit: i32) -> Self {
        self.error_recovery_lookahead_token_limit = limit;
        self
    }

    /// `-1` disables the limit.
    pub fn expression_size_code_point_limit(mut self, limit: i32) -> Self {
        self.expression_size_code_point_limit = limit;
        self
    }

    pub fn populate_macro_calls(mut self, enabled: bool) -> Self {
        self.populate_macro_calls = enabled;
        self
    }

    pub fn enable_variadic_operator_asts(mut self, enabled: bool) -> Self {
        self.enable_variadic_operator_asts = enabled;
        self
    }

    pub fn enable_optional_syntax(mut self, enabled: bool) -> Self {
        self.enable_optional_syntax = enabled;
        self
    }

    pub fn enable_ident_escape_syntax(mut self, enabled: bool) -> Self {
        self.enable_ident_escape_syntax = enabled;
        self
    }

    pub fn build(self) -> Result<Parser, OptionError> {
        let unlimited_or = |limit: i32, err: fn(i32) -> OptionError| -> Result<Option<usize>, OptionError> {
            match limit {
                -1 => Ok(None),
                l if l < -1 => Err(err(l)),
                l => Ok(Some(l as usize)),
            }
        };

        let max_recursion_depth = unlimited_or(self.max_recursion_depth, OptionError::MaxRecursionDepth)?;
        let error_recovery_limit = unlimited_or(self.error_recovery_limit, OptionError::ErrorRecoveryLimit)?;
        let expression_size_code_point_limit = unlimited_or(
            self.expression_size_code_point_limit,
            OptionError::ExpressionSizeCodePointLimit,
        )?;
        if self.error_recovery_lookahead_token_limit < 1 {
            return Err(OptionError::ErrorRecoveryLookahead(
                self.error_recovery_lookahead_token_limit,
            ));
        }

        Ok(Parser::new(Options {
            max_recursion_depth,
            error_recovery_limit,
            error_recovery_lookahead_token_limit: self.error_recovery_lookahead_token_limit as usize,
            expression_size_code_point_limit,
            populate_macro_calls: self.populate_macro_calls,
            enable_variadic_operator_asts: self.enable_variadic_operator_asts,
            enable_optional_syntax: self.enable_optional_syntax,
            enable_ident_escape_syntax: self.enable_ident_escape_syntax,
            macros: self.macros,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_build() {
        assert!(ParserBuilder::new().build().is_ok());
    }

    #[test]
    fn test_negative_one_means_unlimited() {
        assert!(ParserBuilder::new()
            .max_recursion_depth(-1)
            .error_recovery_limit(-1)
            .expression_size_code_point_limit(-1)
            .build()
            .is_ok());
    }

    #[test]
    fn test_rejects_out_of_range_values() {
        let err = ParserBuilder::new().max_recursion_depth(-2).build().unwrap_err();
        assert_eq!(err, OptionError::MaxRecursionDepth(-2));

        let err = ParserBuilder::new()
            .error_recovery_lookahead_token_limit(0)
            .build()
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "error recovery lookahead token limit must be at least 1: 0"
        );
    }
}
