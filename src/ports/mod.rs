use std::path::Path;

use cel_syntax::ast::Expr;
use cel_syntax::debug::Adorner;

use crate::domain::fixture::{FixtureRecord, ParseOutcome};
use crate::domain::syntax::SourceFile;

/// A Go source file located in the reference module.
#[derive(Debug, Clone)]
pub struct ResolvedSource {
    pub file: SourceFile,
    /// `<module>@<version>/<relative path>`.
    pub provenance: String,
}

pub trait SourceResolver {
    fn resolve(&self, relative_path: &str) -> anyhow::Result<ResolvedSource>;
}

pub trait ExpressionParser {
    fn parse(&self, expression: &str) -> ParseOutcome;
}

pub trait TreeRenderer {
    fn render(&self, expr: &Expr, adorner: &dyn Adorner) -> String;
}

pub trait FixtureExporter {
    fn export(&self, records: &[FixtureRecord], provenance: &str, path: &Path) -> anyhow::Result<()>;
}
