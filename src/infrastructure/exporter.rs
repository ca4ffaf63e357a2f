//! Fixture file exporter
//!
//! Writes records either as a plain JSON array or as a TypeScript module
//! exporting the same array as a constant. JSON strings are escaped the way
//! Go's `encoding/json` escapes them so that regenerated fixtures diff
//! cleanly against ones produced by Go tooling.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::ser::Formatter;
use tracing::info;

use crate::api::dto::ParserTestDto;
use crate::domain::fixture::FixtureRecord;
use crate::ports::FixtureExporter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireFormat {
    Json,
    TypeScript,
}

impl WireFormat {
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("ts") => WireFormat::TypeScript,
            _ => WireFormat::Json,
        }
    }
}

pub struct FileExporter;

impl FixtureExporter for FileExporter {
    fn export(&self, records: &[FixtureRecord], provenance: &str, path: &Path) -> Result<()> {
        let format = WireFormat::for_path(path);
        let bytes = render(records, provenance, format)?;
        fs::write(path, &bytes).with_context(|| format!("failed to write {}", path.display()))?;
        info!(path = %path.display(), records = records.len(), ?format, "Wrote fixtures");
        Ok(())
    }
}

/// Output bytes for `records` in the given format.
pub fn render(records: &[FixtureRecord], provenance: &str, format: WireFormat) -> Result<Vec<u8>> {
    let json = to_go_json(records)?;
    Ok(match format {
        WireFormat::Json => json,
        WireFormat::TypeScript => {
            let mut out = Vec::with_capacity(json.len() + provenance.len() + 64);
            writeln!(out, "// Generated from {} {provenance}", module_label(provenance))?;
            out.extend_from_slice(b"export const parserTests = ");
            out.extend_from_slice(&json);
            out.extend_from_slice(b" as const;\n");
            out
        }
    })
}

/// Last path element of the module in a `<module>@<version>/<path>` provenance.
fn module_label(provenance: &str) -> &str {
    let module = provenance.split('@').next().unwrap_or_default();
    module.rsplit('/').next().unwrap_or(module)
}

/// Compact JSON array of the records.
pub fn to_go_json(records: &[FixtureRecord]) -> Result<Vec<u8>> {
    let dtos: Vec<ParserTestDto> = records.iter().map(ParserTestDto::from).collect();
    let mut out = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut out, GoEscapeFormatter);
    dtos.serialize(&mut ser)
        .context("Failed to serialize fixture records")?;
    Ok(out)
}

/// Compact formatter that additionally escapes `<`, `>`, `&`, U+2028 and U+2029.
struct GoEscapeFormatter;

impl Formatter for GoEscapeFormatter {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let mut start = 0;
        for (i, c) in fragment.char_indices() {
            let escape = match c {
                '<' => "\\u003c",
                '>' => "\\u003e",
                '&' => "\\u0026",
                '\u{2028}' => "\\u2028",
                '\u{2029}' => "\\u2029",
                _ => continue,
            };
            writer.write_all(fragment[start..i].as_bytes())?;
            writer.write_all(escape.as_bytes())?;
            start = i + c.len_utf8();
        }
        writer.write_all(fragment[start..].as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_sensitive_characters_are_escaped() {
        let records = [FixtureRecord::failed("a < b && c > d\u{2028}", "x\ty")];
        let json = String::from_utf8(to_go_json(&records).unwrap()).unwrap();
        assert_eq!(
            json,
            r#"[{"expr":"a \u003c b \u0026\u0026 c \u003e d\u2028","error":"x\ty"}]"#
        );
    }

    #[test]
    fn test_empty_record_list_is_an_empty_array() {
        assert_eq!(to_go_json(&[]).unwrap(), b"[]");
    }

    #[test]
    fn test_typescript_wrapper() {
        let records = [FixtureRecord::parsed("a", "a^#*expr.Expr_IdentExpr#")];
        let out = render(&records, "github.com/google/cel-go@v0.22.1/parser/parser_test.go", WireFormat::TypeScript).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "// Generated from cel-go github.com/google/cel-go@v0.22.1/parser/parser_test.go\n\
             export const parserTests = [{\"expr\":\"a\",\"ast\":\"a^#*expr.Expr_IdentExpr#\"}] as const;\n"
        );
    }

    #[test]
    fn test_typescript_header_names_the_module() {
        let out = render(&[], "example.com/forks/cel-go-fork@v1.0.0/parser/parser_test.go", WireFormat::TypeScript).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(
            text.starts_with("// Generated from cel-go-fork example.com/forks/cel-go-fork@v1.0.0/parser/parser_test.go\n"),
            "{text}"
        );
    }

    #[test]
    fn test_format_follows_extension() {
        assert_eq!(WireFormat::for_path(Path::new("out/parser.ts")), WireFormat::TypeScript);
        assert_eq!(WireFormat::for_path(Path::new("out/parser.json")), WireFormat::Json);
        assert_eq!(WireFormat::for_path(Path::new("out/parser")), WireFormat::Json);
    }
}
