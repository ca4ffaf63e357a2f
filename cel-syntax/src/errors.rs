//! Parse error collection and display.

use crate::source::{Location, Source};

const DEFAULT_MAX_ERRORS_TO_REPORT: usize = 100;
const MAX_SNIPPET_LENGTH: usize = 16384;

const DOT: char = '.';
const IND: char = '^';
const WIDE_DOT: char = '\u{ff0e}';
const WIDE_IND: char = '\u{ff3e}';

/// A single parse error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CelError {
    pub location: Location,
    pub message: String,
}

impl CelError {
    /// Render as `ERROR: <desc>:<line>:<col>: <msg>` plus a source snippet
    /// with a caret under the offending column.
    pub fn to_display_string(&self, source: &Source) -> String {
        let mut result = format!(
            "ERROR: {}:{}:{}: {}",
            source.description(),
            self.location.line,
            self.location.column + 1,
            self.message
        );
        if let Some(snippet) = source.snippet(self.location.line) {
            if snippet.len() <= MAX_SNIPPET_LENGTH {
                let snippet = snippet.replace('\t', " ");
                let chars: Vec<char> = snippet.chars().collect();
                let column = self.location.column.max(0) as usize;
                let mut indicator = String::new();
                for c in chars.iter().take(column) {
                    indicator.push(if c.len_utf8() > 1 { WIDE_DOT } else { DOT });
                }
                match chars.get(column) {
                    Some(c) if c.len_utf8() > 1 => indicator.push(WIDE_IND),
                    _ => indicator.push(IND),
                }
                result.push_str("\n | ");
                result.push_str(&snippet);
                result.push_str("\n | ");
                result.push_str(&indicator);
            }
        }
        result
    }
}

/// Errors collected while parsing one source.
#[derive(Debug, Clone)]
pub struct Errors {
    source: Source,
    errors: Vec<CelError>,
    num_errors: usize,
    max_errors_to_report: usize,
}

impl Errors {
    pub fn new(source: &Source) -> Self {
        Self {
            source: source.clone(),
            errors: Vec::new(),
            num_errors: 0,
            max_errors_to_report: DEFAULT_MAX_ERRORS_TO_REPORT,
        }
    }

    pub fn report(&mut self, location: Location, message: impl Into<String>) {
        self.num_errors += 1;
        if self.num_errors > self.max_errors_to_report {
            return;
        }
        self.errors.push(CelError {
            location,
            message: message.into(),
        });
    }

    pub fn syntax_error(&mut self, location: Location, message: &str) {
        self.report(location, format!("Syntax error: {}", message));
    }

    /// Report an error that has no meaningful source location.
    pub fn internal_error(&mut self, message: impl Into<String>) {
        self.report(Location::NONE, message);
    }

    pub fn errors(&self) -> &[CelError] {
        &self.errors
    }

    pub fn is_empty(&self) -> bool {
        self.num_errors == 0
    }

    pub fn len(&self) -> usize {
        self.num_errors
    }

    /// All errors ordered by position, one per entry, joined by newlines.
    pub fn to_display_string(&self) -> String {
        let mut sorted = self.errors.clone();
        sorted.sort_by(|a, b| {
            (a.location.line, a.location.column).cmp(&(b.location.line, b.location.column))
        });
        let mut parts: Vec<String> = sorted
            .iter()
            .take(self.max_errors_to_report)
            .map(|e| e.to_display_string(&self.source))
            .collect();
        if self.num_errors > self.max_errors_to_report {
            parts.push(format!(
                "{} more errors were truncated",
                self.num_errors - self.max_errors_to_report
            ));
        }
        parts.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_snippet() {
        let source = Source::new("(1 + 2");
        let mut errors = Errors::new(&source);
        errors.syntax_error(Location::new(1, 6), "missing ')' at '<EOF>'");
        assert_eq!(
            errors.to_display_string(),
            "ERROR: <input>:1:7: Syntax error: missing ')' at '<EOF>'\n | (1 + 2\n | ......^"
        );
    }

    #[test]
    fn test_display_without_location() {
        let source = Source::new("a");
        let mut errors = Errors::new(&source);
        errors.internal_error("expression recursion limit exceeded: 32");
        assert_eq!(
            errors.to_display_string(),
            "ERROR: <input>:-1:0: expression recursion limit exceeded: 32"
        );
    }

    #[test]
    fn test_errors_sorted_by_position() {
        let source = Source::new("a b c");
        let mut errors = Errors::new(&source);
        errors.report(Location::new(1, 4), "second");
        errors.report(Location::new(1, 2), "first");
        let text = errors.to_display_string();
        assert!(text.find("first").unwrap() < text.find("second").unwrap());
    }

    #[test]
    fn test_wide_characters_use_wide_markers() {
        let source = Source::new("'\u{00e9}' x");
        let mut errors = Errors::new(&source);
        errors.report(Location::new(1, 1), "bad");
        let text = errors.to_display_string();
        assert!(text.ends_with("\n | .\u{ff3e}"));
    }

    #[test]
    fn test_truncation_message() {
        let source = Source::new("x");
        let mut errors = Errors::new(&source);
        for _ in 0..102 {
            errors.report(Location::NONE, "boom");
        }
        assert_eq!(errors.len(), 102);
        assert!(errors
            .to_display_string()
            .ends_with("2 more errors were truncated"));
    }
}
