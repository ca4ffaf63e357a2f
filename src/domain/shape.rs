// Fixture shapes for cel-fixtures.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("do not know what to extract from {0}")]
pub struct ShapeError(pub String);

/// Where the test expressions live inside a given cel-go test file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixtureShape {
    /// Top-level `var testCases = []testInfo{{I: "..."}, ...}`.
    DeclaredTestCases,
    /// `func TestXxx(t *testing.T) { tests := []struct{...}{{expr: "..."}, ...} }`.
    FunctionTestMap,
}

impl FixtureShape {
    /// Select the shape from the target file's name.
    pub fn for_file(path: &str) -> Result<Self, ShapeError> {
        if path.ends_with("parser_test.go") {
            Ok(FixtureShape::DeclaredTestCases)
        } else if path.ends_with("comprehensions_test.go") {
            Ok(FixtureShape::FunctionTestMap)
        } else {
            Err(ShapeError(path.to_string()))
        }
    }

    /// Key of the record entry holding the expression text.
    pub fn expression_key(self) -> &'static str {
        match self {
            FixtureShape::DeclaredTestCases => "I",
            FixtureShape::FunctionTestMap => "expr",
        }
    }
}

pub const TEST_CASES_BINDING: &str = "testCases";
pub const TEST_FUNCTION_PREFIX: &str = "Test";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_selected_by_suffix() {
        assert_eq!(
            FixtureShape::for_file("parser/parser_test.go"),
            Ok(FixtureShape::DeclaredTestCases)
        );
        assert_eq!(
            FixtureShape::for_file("ext/comprehensions_test.go"),
            Ok(FixtureShape::FunctionTestMap)
        );
    }

    #[test]
    fn test_unknown_file_is_rejected() {
        let err = FixtureShape::for_file("ext/strings_test.go").unwrap_err();
        assert_eq!(err.to_string(), "do not know what to extract from ext/strings_test.go");
    }
}
