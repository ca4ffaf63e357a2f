// Command-line entry point for cel-fixtures.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use cel_fixtures::application::{GenerateSummary, GenerateUsecase};
use cel_fixtures::infrastructure::{
    CelParserBridge, DebugStringRenderer, FileExporter, ModuleCacheConfig, ModuleCacheResolver,
    DEFAULT_MODULE,
};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// go.mod pinning the cel-go version
    #[arg(long = "module-descriptor", visible_alias = "gomod", default_value = "go.mod")]
    module_descriptor: PathBuf,

    /// Module whose sources are mined
    #[arg(long, default_value = DEFAULT_MODULE)]
    module: String,

    /// Output file path (.ts for a TypeScript module, JSON otherwise)
    #[arg(short, long)]
    output: PathBuf,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Test file inside the module, e.g. parser/parser_test.go
    source_file: String,
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<GenerateSummary> {
    let resolver = ModuleCacheResolver::new(
        &cli.module_descriptor,
        cli.module.as_str(),
        ModuleCacheConfig::from_env(),
    );
    let parser = CelParserBridge::new().context("Failed to configure the CEL parser")?;

    let usecase = GenerateUsecase {
        resolver: &resolver,
        parser: &parser,
        renderer: &DebugStringRenderer,
        exporter: &FileExporter,
    };
    usecase.run(&cli.source_file, &cli.output)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(summary) => {
            println!(
                "Fixtures written to {} ({} parsed, {} errors, from {})",
                cli.output.display(),
                summary.parsed,
                summary.failed,
                summary.provenance
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {:?}", e);
            ExitCode::FAILURE
        }
    }
}
