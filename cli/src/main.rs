mod pipeline;

use std::fs;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use modcat_core::validate_artifact;
use modcat_db::{RunConfig, Stage, expand, read_artifact, read_compact};
use tracing_subscriber::EnvFilter;

use crate::pipeline::RunOptions;

#[derive(Debug, Parser)]
#[command(name = "modcat")]
#[command(about = "Link runtime module introspection with protobuf schema catalogs")]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the link, prune and compact stages.
    Run(RunArgs),
    /// Expand a compact artifact back into JSON with file paths.
    Expand(ExpandArgs),
    /// Check a verbose artifact's invariants.
    Validate(ValidateArgs),
}

#[derive(Debug, Args)]
struct RunArgs {
    /// YAML run configuration.
    #[arg(long)]
    config: PathBuf,
    /// Stage index to resume from (0 link, 1 prune, 2 compact).
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=2))]
    from_stage: u8,
    /// Skip debugger lookups; leave all locations absent.
    #[arg(long)]
    no_locations: bool,
    /// Skip the usage-example search.
    #[arg(long)]
    no_examples: bool,
}

#[derive(Debug, Args)]
struct ExpandArgs {
    /// Compact artifact (`compact.json.gz`).
    input: PathBuf,
    /// Write here instead of stdout.
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct ValidateArgs {
    /// Verbose artifact (`combined.json` or `pruned.json`).
    input: PathBuf,
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Command::Run(args) => run_pipeline(args),
        Command::Expand(args) => run_expand(args),
        Command::Validate(args) => run_validate(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run_pipeline(args: RunArgs) -> Result<(), String> {
    let config = RunConfig::load(&args.config).map_err(|e| {
        format!("failed to load config '{}': {e}", args.config.display())
    })?;
    let from_stage = Stage::from_index(args.from_stage)
        .ok_or_else(|| format!("unknown stage index {}", args.from_stage))?;

    let defaults = RunOptions::from_config(&config);
    let options = RunOptions {
        from_stage,
        resolve_locations: defaults.resolve_locations && !args.no_locations,
        find_examples: defaults.find_examples && !args.no_examples,
    };

    let summaries = pipeline::run(&config, &options).map_err(|e| e.to_string())?;
    for summary in summaries {
        println!("{summary}");
    }
    Ok(())
}

fn run_expand(args: ExpandArgs) -> Result<(), String> {
    let compacted = read_compact(&args.input).map_err(|e| {
        format!("failed to read '{}': {e}", args.input.display())
    })?;
    let expanded = expand(&compacted).map_err(|e| e.to_string())?;
    let json = serde_json::to_string_pretty(&expanded)
        .map_err(|e| format!("failed to serialize expanded artifact: {e}"))?;

    match args.output {
        Some(path) => fs::write(&path, format!("{json}\n"))
            .map_err(|e| format!("failed to write '{}': {e}", path.display()))?,
        None => println!("{json}"),
    }
    Ok(())
}

fn run_validate(args: ValidateArgs) -> Result<(), String> {
    let artifact = read_artifact(&args.input).map_err(|e| {
        format!("failed to read '{}': {e}", args.input.display())
    })?;
    let problems = validate_artifact(&artifact);
    if problems.is_empty() {
        println!(
            "{}: ok ({} modules, {} types)",
            args.input.display(),
            artifact.modules.len(),
            artifact.types.len()
        );
        return Ok(());
    }

    for problem in &problems {
        println!("{}: {problem}", args.input.display());
    }
    Err(format!("{} validation problem(s)", problems.len()))
}
