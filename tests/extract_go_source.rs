use cel_fixtures::domain::extract::extract;
use cel_fixtures::domain::shape::FixtureShape;
use cel_fixtures::infrastructure::parse_go_source;

#[test]
fn test_declared_shape_skips_non_literal_entries() {
    let src = include_str!("../testdata/parser_test.go");
    let file = parse_go_source("parser/parser_test.go", src).unwrap();
    let exprs = extract(&file, FixtureShape::DeclaredTestCases).unwrap();
    assert_eq!(exprs.len(), 7);
    assert!(!exprs.iter().any(|e| e == "x"));
}

#[test]
fn test_extraction_is_stable_across_runs() {
    let src = include_str!("../testdata/comprehensions_test.go");
    let first = extract(
        &parse_go_source("ext/comprehensions_test.go", src).unwrap(),
        FixtureShape::FunctionTestMap,
    )
    .unwrap();
    let second = extract(
        &parse_go_source("ext/comprehensions_test.go", src).unwrap(),
        FixtureShape::FunctionTestMap,
    )
    .unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), 5);
}

#[test]
fn test_shapes_do_not_cross_match() {
    let src = include_str!("../testdata/comprehensions_test.go");
    let file = parse_go_source("ext/comprehensions_test.go", src).unwrap();
    assert!(extract(&file, FixtureShape::DeclaredTestCases).unwrap().is_empty());
}

#[test]
fn test_grouped_var_block_and_raw_strings() {
    let src = "package parser

var (
	unrelated = 1
	testCases = []testInfo{
		{I: `a
b`},
		{I: '\\''},
	}
)
";
    let file = parse_go_source("parser_test.go", src).unwrap();
    let exprs = extract(&file, FixtureShape::DeclaredTestCases).unwrap();
    assert_eq!(exprs, vec!["a\nb".to_string(), "'".to_string()]);
}
