/// Benchmarks for the cel-fixtures pipeline.
///
/// Run with: `cargo bench`
///
/// - Go source lowering and extraction of a synthetic parser_test.go
/// - Parsing plus kind annotation of extracted expressions
/// - Fixture JSON encoding
use cel_fixtures::application::GenerateUsecase;
use cel_fixtures::domain::extract::extract;
use cel_fixtures::domain::fixture::FixtureRecord;
use cel_fixtures::domain::shape::FixtureShape;
use cel_fixtures::domain::syntax::SourceFile;
use cel_fixtures::infrastructure::exporter::to_go_json;
use cel_fixtures::infrastructure::{
    parse_go_source, CelParserBridge, DebugStringRenderer, FileExporter,
};
use cel_fixtures::ports::{ResolvedSource, SourceResolver};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

// ═══════════════════════════════════════════════════════════════════════════
// Synthetic Data Generators
// ═══════════════════════════════════════════════════════════════════════════

const EXPRESSIONS: &[&str] = &[
    "1 + 2 * 3",
    "a.b.c == 'x' && d[0] > 1u",
    "has(msg.field) ? msg.field : null",
    "[1, 2, 3].map(x, x * 2).filter(y, y > 2)",
    "{'k': b'v', 'n': -1.5e3}.exists(k, k.startsWith('k'))",
    "google.protobuf.Duration{seconds: 5}",
    "(a || b) && !c || d",
    "x.all(i, i in [1, 2]) == true",
];

/// A parser_test.go with `cases` test cases.
fn synthetic_parser_test(cases: usize) -> String {
    let mut src = String::from("package parser\n\nvar testCases = []testInfo{\n");
    for i in 0..cases {
        let expr = EXPRESSIONS[i % EXPRESSIONS.len()];
        src.push_str(&format!("\t{{\n\t\tI: `{}`,\n\t\tP: `case {}`,\n\t}},\n", expr, i));
    }
    src.push_str("}\n");
    src
}

struct NoSource;

impl SourceResolver for NoSource {
    fn resolve(&self, _relative_path: &str) -> anyhow::Result<ResolvedSource> {
        Ok(ResolvedSource {
            file: SourceFile::default(),
            provenance: String::new(),
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Benchmarks
// ═══════════════════════════════════════════════════════════════════════════

fn bench_extraction(c: &mut Criterion) {
    let mut group = c.benchmark_group("extraction");

    for cases in [100usize, 1_000] {
        let src = synthetic_parser_test(cases);
        group.throughput(Throughput::Elements(cases as u64));
        group.bench_with_input(BenchmarkId::from_parameter(cases), &src, |b, src| {
            b.iter(|| {
                let file = parse_go_source("parser_test.go", black_box(src)).unwrap();
                extract(&file, FixtureShape::DeclaredTestCases).unwrap()
            })
        });
    }

    group.finish();
}

fn bench_annotation(c: &mut Criterion) {
    let parser = CelParserBridge::new().unwrap();
    let usecase = GenerateUsecase {
        resolver: &NoSource,
        parser: &parser,
        renderer: &DebugStringRenderer,
        exporter: &FileExporter,
    };
    let expressions: Vec<String> = EXPRESSIONS.iter().map(|e| e.to_string()).collect();

    let mut group = c.benchmark_group("annotation");
    group.throughput(Throughput::Elements(expressions.len() as u64));
    group.bench_function("parse_and_annotate", |b| {
        b.iter(|| usecase.records_for(black_box(&expressions)))
    });
    group.finish();
}

fn bench_encoding(c: &mut Criterion) {
    let records: Vec<FixtureRecord> = (0..1_000)
        .map(|i| {
            FixtureRecord::parsed(
                format!("a{i} < b && c > {i}"),
                format!("_<_(\n  a{i}^#*expr.Expr_IdentExpr#,\n  b^#*expr.Expr_IdentExpr#\n)^#*expr.Expr_CallExpr#"),
            )
        })
        .collect();

    c.bench_function("go_json_1000_records", |b| {
        b.iter(|| to_go_json(black_box(&records)).unwrap())
    });
}

criterion_group!(benches, bench_extraction, bench_annotation, bench_encoding);
criterion_main!(benches);
