//! Fixture extraction
//!
//! Each shape is an ordered chain of typed descents over [`SourceFile`]:
//! declaration, binding, record literal, keyed entry, text literal. A step
//! that does not match skips the candidate. Only decoding a literal that was
//! found can fail the run.

use thiserror::Error;

use crate::domain::go_literal::{unquote, UnquoteError};
use crate::domain::shape::{FixtureShape, TEST_CASES_BINDING, TEST_FUNCTION_PREFIX};
use crate::domain::syntax::{BasicLit, CompositeLit, Decl, Expr, SourceFile, Stmt};

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("cannot unquote {raw}: {source}")]
    Unquote {
        raw: String,
        #[source]
        source: UnquoteError,
    },
}

/// Collect the expression strings of `file` in declaration order.
pub fn extract(file: &SourceFile, shape: FixtureShape) -> Result<Vec<String>, ExtractError> {
    let mut out = Vec::new();
    match shape {
        FixtureShape::DeclaredTestCases => extract_declared(file, shape.expression_key(), &mut out)?,
        FixtureShape::FunctionTestMap => extract_function_map(file, shape.expression_key(), &mut out)?,
    }
    Ok(out)
}

fn extract_declared(file: &SourceFile, key: &str, out: &mut Vec<String>) -> Result<(), ExtractError> {
    let gen_decls = file.decls.iter().filter_map(|decl| match decl {
        Decl::Gen(gen) => Some(gen),
        _ => None,
    });
    for gen in gen_decls {
        for spec in &gen.specs {
            if !spec.names.iter().any(|name| name == TEST_CASES_BINDING) {
                continue;
            }
            for value in &spec.values {
                if let Some(cases) = value.as_composite() {
                    collect_records(cases, key, out)?;
                }
            }
        }
    }
    Ok(())
}

fn extract_function_map(file: &SourceFile, key: &str, out: &mut Vec<String>) -> Result<(), ExtractError> {
    let funcs = file.decls.iter().filter_map(|decl| match decl {
        Decl::Func(func) if func.name.starts_with(TEST_FUNCTION_PREFIX) => Some(func),
        _ => None,
    });
    for func in funcs {
        let Some(Stmt::Assign(assign)) = func.first_statement() else {
            continue;
        };
        for rhs in &assign.rhs {
            if let Some(tests) = rhs.as_composite() {
                collect_records(tests, key, out)?;
            }
        }
    }
    Ok(())
}

/// Elements of `list` that are record literals contribute their `key` entries.
fn collect_records(list: &CompositeLit, key: &str, out: &mut Vec<String>) -> Result<(), ExtractError> {
    for record in list.elts.iter().filter_map(Expr::as_composite) {
        for value in record.values_for(key) {
            if let Some(lit) = value.as_text_literal() {
                out.push(decode(lit)?);
            }
        }
    }
    Ok(())
}

fn decode(lit: &BasicLit) -> Result<String, ExtractError> {
    unquote(&lit.raw).map_err(|source| ExtractError::Unquote {
        raw: lit.raw.clone(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::syntax::{
        AssignStmt, DeclKeyword, FuncDecl, GenDecl, KeyValue, LitKind, ValueSpec,
    };

    fn text(raw: &str) -> Expr {
        Expr::BasicLit(BasicLit::new(LitKind::String, raw))
    }

    fn record(entries: Vec<(&str, Expr)>) -> Expr {
        Expr::CompositeLit(CompositeLit {
            type_text: None,
            elts: entries
                .into_iter()
                .map(|(k, v)| {
                    Expr::KeyValue(Box::new(KeyValue {
                        key: Expr::Ident(k.to_string()),
                        value: v,
                    }))
                })
                .collect(),
        })
    }

    fn list(elts: Vec<Expr>) -> Expr {
        Expr::CompositeLit(CompositeLit {
            type_text: Some("[]testInfo".into()),
            elts,
        })
    }

    fn var(name: &str, value: Expr) -> Decl {
        Decl::Gen(GenDecl {
            keyword: DeclKeyword::Var,
            specs: vec![ValueSpec {
                names: vec![name.to_string()],
                values: vec![value],
            }],
        })
    }

    fn test_func(name: &str, body: Vec<Stmt>) -> Decl {
        Decl::Func(FuncDecl {
            name: name.to_string(),
            body: Some(body),
        })
    }

    #[test]
    fn test_declared_cases_in_order_with_duplicates() {
        let file = SourceFile {
            decls: vec![var(
                "testCases",
                list(vec![
                    record(vec![("I", text("\"a\"")), ("P", text("\"ignored\""))]),
                    record(vec![("I", text("`b`"))]),
                    record(vec![("I", text("\"a\""))]),
                ]),
            )],
        };
        let exprs = extract(&file, FixtureShape::DeclaredTestCases).unwrap();
        assert_eq!(exprs, vec!["a", "b", "a"]);
    }

    #[test]
    fn test_mismatches_are_skipped() {
        let file = SourceFile {
            decls: vec![
                var("otherCases", list(vec![record(vec![("I", text("\"no\""))])])),
                var(
                    "testCases",
                    list(vec![
                        record(vec![("I", Expr::Ident("someConst".into()))]),
                        record(vec![("I", Expr::BasicLit(BasicLit::new(LitKind::Int, "1")))]),
                        record(vec![("E", text("\"missing I\""))]),
                        text("\"not a record\""),
                        record(vec![("I", text("\"yes\""))]),
                    ]),
                ),
            ],
        };
        let exprs = extract(&file, FixtureShape::DeclaredTestCases).unwrap();
        assert_eq!(exprs, vec!["yes"]);
    }

    #[test]
    fn test_bad_escape_fails_the_run() {
        let file = SourceFile {
            decls: vec![var("testCases", list(vec![record(vec![("I", text(r#""\q""#))])]))],
        };
        let err = extract(&file, FixtureShape::DeclaredTestCases).unwrap_err();
        assert_eq!(err.to_string(), r#"cannot unquote "\q": invalid syntax"#);
    }

    #[test]
    fn test_function_map_reads_first_statement_of_test_funcs() {
        let tests = |exprs: &[&str]| {
            Stmt::Assign(AssignStmt {
                lhs: vec![Expr::Ident("tests".into())],
                rhs: vec![list(
                    exprs
                        .iter()
                        .map(|e| record(vec![("expr", text(&format!("`{e}`")))]))
                        .collect(),
                )],
            })
        };
        let file = SourceFile {
            decls: vec![
                test_func("TestOne", vec![tests(&["x.all(i, i > 0)", "[1].map(y, y)"])]),
                test_func("helper", vec![tests(&["skipped"])]),
                test_func(
                    "TestSecondStatement",
                    vec![Stmt::Other("expression_statement".into()), tests(&["skipped"])],
                ),
                test_func("TestTwo", vec![tests(&["a"])]),
            ],
        };
        let exprs = extract(&file, FixtureShape::FunctionTestMap).unwrap();
        assert_eq!(exprs, vec!["x.all(i, i > 0)", "[1].map(y, y)", "a"]);
    }

    #[test]
    fn test_empty_file_yields_nothing() {
        let exprs = extract(&SourceFile::default(), FixtureShape::FunctionTestMap).unwrap();
        assert!(exprs.is_empty());
    }
}
