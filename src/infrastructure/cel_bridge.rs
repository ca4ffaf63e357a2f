// Expression parser bridge over cel-syntax for cel-fixtures.

use cel_syntax::ast::Expr;
use cel_syntax::debug::{to_adorned_debug_string, Adorner};
use cel_syntax::{macros, OptionError, Parser, Source};
use tracing::debug;

use crate::domain::fixture::ParseOutcome;
use crate::ports::{ExpressionParser, TreeRenderer};

/// A cel-syntax parser configured the way cel-go's own parser tests are.
#[derive(Debug, Clone)]
pub struct CelParserBridge {
    parser: Parser,
}

impl CelParserBridge {
    pub fn new() -> Result<Self, OptionError> {
        let parser = Parser::builder()
            .macros(macros::all_macros())
            .max_recursion_depth(32)
            .error_recovery_limit(4)
            .error_recovery_lookahead_token_limit(4)
            .populate_macro_calls(true)
            .enable_variadic_operator_asts(true)
            .build()?;
        Ok(Self { parser })
    }
}

impl ExpressionParser for CelParserBridge {
    fn parse(&self, expression: &str) -> ParseOutcome {
        let (ast, errors) = self.parser.parse(&Source::new(expression));
        match ast {
            Some(ast) if errors.is_empty() => ParseOutcome::Parsed(ast),
            _ => {
                debug!(errors = errors.len(), "Expression failed to parse");
                ParseOutcome::Failed(errors.to_display_string())
            }
        }
    }
}

/// Base renderer: cel-syntax's debug string with adornments.
pub struct DebugStringRenderer;

impl TreeRenderer for DebugStringRenderer {
    fn render(&self, expr: &Expr, adorner: &dyn Adorner) -> String {
        to_adorned_debug_string(expr, adorner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::adorner::annotate;

    fn render(expression: &str) -> String {
        let bridge = CelParserBridge::new().unwrap();
        match bridge.parse(expression) {
            ParseOutcome::Parsed(ast) => annotate(&ast, &DebugStringRenderer),
            ParseOutcome::Failed(text) => panic!("{expression} failed: {text}"),
        }
    }

    #[test]
    fn test_addition_is_an_int_call() {
        assert_eq!(
            render("1 + 2"),
            "_+_(\n  1^#*expr.Constant_Int64Value#,\n  2^#*expr.Constant_Int64Value#\n)^#*expr.Expr_CallExpr#"
        );
    }

    #[test]
    fn test_macro_root_is_tagged_with_macro_name() {
        let rendering = render("[1, 2].exists(x, x > 1)");
        assert!(rendering.ends_with(")^#exists#"), "{rendering}");
        assert!(!rendering.ends_with("^#*expr.Expr_ComprehensionExpr#"));
        assert!(rendering.starts_with("__comprehension__(\n"), "{rendering}");
    }

    #[test]
    fn test_has_is_tagged_as_macro() {
        assert_eq!(render("has(a.b)"), "a^#*expr.Expr_IdentExpr#.b~test-only^#has#");
    }

    #[test]
    fn test_unbalanced_parens_fail_with_display_text() {
        let bridge = CelParserBridge::new().unwrap();
        assert_eq!(
            bridge.parse("(1 + 2"),
            ParseOutcome::Failed(
                "ERROR: <input>:1:7: Syntax error: missing ')' at '<EOF>'\n | (1 + 2\n | ......^"
                    .to_string()
            )
        );
    }

    #[test]
    fn test_recursion_is_capped() {
        let bridge = CelParserBridge::new().unwrap();
        let deep = format!("{}1{}", "[".repeat(40), "]".repeat(40));
        assert!(matches!(bridge.parse(&deep), ParseOutcome::Failed(_)));
    }
}
