use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::domain::adorner::annotate;
use crate::domain::extract::extract;
use crate::domain::fixture::{FixtureRecord, ParseOutcome};
use crate::domain::shape::FixtureShape;
use crate::ports::{ExpressionParser, FixtureExporter, SourceResolver, TreeRenderer};

/// Counts reported after a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateSummary {
    pub provenance: String,
    pub parsed: usize,
    pub failed: usize,
}

impl GenerateSummary {
    pub fn total(&self) -> usize {
        self.parsed + self.failed
    }
}

pub struct GenerateUsecase<'a> {
    pub resolver: &'a dyn SourceResolver,
    pub parser: &'a dyn ExpressionParser,
    pub renderer: &'a dyn TreeRenderer,
    pub exporter: &'a dyn FixtureExporter,
}

impl<'a> GenerateUsecase<'a> {
    /// Mine `source_file` and write its fixtures to `output`.
    pub fn run(&self, source_file: &str, output: &Path) -> Result<GenerateSummary> {
        let shape = FixtureShape::for_file(source_file)?;
        let resolved = self
            .resolver
            .resolve(source_file)
            .with_context(|| format!("Failed to load {}", source_file))?;
        let expressions = extract(&resolved.file, shape)
            .with_context(|| format!("Failed to extract expressions from {}", resolved.provenance))?;
        info!(count = expressions.len(), ?shape, "Extracted expressions");
        if expressions.is_empty() {
            warn!(file = source_file, "No expressions matched; the test file layout may have changed");
        }

        let records = self.records_for(&expressions);
        self.exporter
            .export(&records, &resolved.provenance, output)
            .with_context(|| format!("Failed to write {}", output.display()))?;

        let parsed = records.iter().filter(|r| r.is_parsed()).count();
        Ok(GenerateSummary {
            provenance: resolved.provenance,
            parsed,
            failed: records.len() - parsed,
        })
    }

    pub fn records_for(&self, expressions: &[String]) -> Vec<FixtureRecord> {
        expressions.iter().map(|e| self.record_for(e)).collect()
    }

    pub fn record_for(&self, expression: &str) -> FixtureRecord {
        match self.parser.parse(expression) {
            ParseOutcome::Parsed(ast) => {
                debug!(expression, "Parsed");
                FixtureRecord::parsed(expression, annotate(&ast, self.renderer))
            }
            ParseOutcome::Failed(error_text) => {
                debug!(expression, "Recorded parse error");
                FixtureRecord::failed(expression, error_text)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use cel_syntax::ast::{Expr, ExprKind, SourceInfo};
    use cel_syntax::debug::{Adornable, Adorner};
    use cel_syntax::Ast;

    use crate::domain::syntax::SourceFile;
    use crate::ports::ResolvedSource;

    struct NoSource;

    impl SourceResolver for NoSource {
        fn resolve(&self, _relative_path: &str) -> Result<ResolvedSource> {
            Ok(ResolvedSource {
                file: SourceFile::default(),
                provenance: "m@v/parser/parser_test.go".into(),
            })
        }
    }

    /// Parses any expression starting with `x` into an identifier.
    struct IdentParser;

    impl ExpressionParser for IdentParser {
        fn parse(&self, expression: &str) -> ParseOutcome {
            if expression.starts_with('x') {
                ParseOutcome::Parsed(Ast {
                    expr: Expr {
                        id: 1,
                        kind: ExprKind::Ident(expression.to_string()),
                    },
                    source_info: SourceInfo::default(),
                })
            } else {
                ParseOutcome::Failed(format!("bad: {expression}"))
            }
        }
    }

    struct NameRenderer;

    impl TreeRenderer for NameRenderer {
        fn render(&self, expr: &Expr, adorner: &dyn Adorner) -> String {
            match &expr.kind {
                ExprKind::Ident(name) => format!("{name}{}", adorner.metadata(Adornable::Expr(expr))),
                _ => String::new(),
            }
        }
    }

    #[derive(Default)]
    struct Capture {
        written: RefCell<Option<(Vec<FixtureRecord>, String)>>,
    }

    impl FixtureExporter for Capture {
        fn export(&self, records: &[FixtureRecord], provenance: &str, _path: &Path) -> Result<()> {
            *self.written.borrow_mut() = Some((records.to_vec(), provenance.to_string()));
            Ok(())
        }
    }

    #[test]
    fn test_each_record_has_exactly_one_result() {
        let capture = Capture::default();
        let usecase = GenerateUsecase {
            resolver: &NoSource,
            parser: &IdentParser,
            renderer: &NameRenderer,
            exporter: &capture,
        };
        let records = usecase.records_for(&["x1".into(), "(".into()]);
        assert_eq!(records[0], FixtureRecord::parsed("x1", "x1^#*expr.Expr_IdentExpr#"));
        assert_eq!(records[1], FixtureRecord::failed("(", "bad: ("));
        for record in &records {
            assert!(record.annotated_rendering().is_some() != record.error_text().is_some());
        }
    }

    #[test]
    fn test_unknown_shape_fails_before_resolution() {
        let capture = Capture::default();
        let usecase = GenerateUsecase {
            resolver: &NoSource,
            parser: &IdentParser,
            renderer: &NameRenderer,
            exporter: &capture,
        };
        let err = usecase.run("ext/strings_test.go", Path::new("out.json")).unwrap_err();
        assert_eq!(err.to_string(), "do not know what to extract from ext/strings_test.go");
        assert!(capture.written.borrow().is_none());
    }

    #[test]
    fn test_empty_extraction_still_writes_output() {
        let capture = Capture::default();
        let usecase = GenerateUsecase {
            resolver: &NoSource,
            parser: &IdentParser,
            renderer: &NameRenderer,
            exporter: &capture,
        };
        let summary = usecase.run("parser/parser_test.go", Path::new("out.json")).unwrap();
        assert_eq!(summary.total(), 0);
        let written = capture.written.borrow();
        let (records, provenance) = written.as_ref().unwrap();
        assert!(records.is_empty());
        assert_eq!(provenance, "m@v/parser/parser_test.go");
    }
}
