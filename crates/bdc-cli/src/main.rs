#![forbid(unsafe_code)]

mod cmd;
mod output;

use bdc_core::Stage;
use clap::{CommandFactory, Parser, Subcommand};
use cmd::stages::{Project, run_stages};
use output::{CliError, OutputMode};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "bdc: broadband availability and challenge snapshot pipeline",
    long_about = None
)]
struct Cli {
    /// Config file (default: <root>/bdc.toml, then the user config dir).
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Project root that relative data paths resolve against.
    #[arg(long, global = true, value_name = "DIR")]
    root: Option<PathBuf>,

    /// Output format.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Emit JSON output (alias for --format json).
    #[arg(long, global = true, hide = true)]
    json: bool,

    /// Enable debug logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress stage reports and informational logs.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Availability",
        about = "Consolidate raw availability files per state",
        long_about = "Read every technology file of every state and snapshot, derive the geoid chain, classify the service tier, and write one table per state.",
        after_help = "EXAMPLES:\n    # Consolidate every snapshot\n    bdc consolidate\n\n    # Use another project root\n    bdc --root /data/bdc consolidate"
    )]
    Consolidate,

    #[command(
        next_help_heading = "Availability",
        about = "Resolve one geolocation per location",
        long_about = "Resolve the most recent geoid chain of every location across snapshots and states into bsl_geolocation.csv.",
        after_help = "EXAMPLES:\n    # Resolve geolocations\n    bdc geolocate"
    )]
    Geolocate,

    #[command(
        next_help_heading = "Challenges",
        about = "Consolidate and geolocate challenges",
        long_about = "Deduplicate challenges, code their outcomes, and attach the resolved geolocation of each challenged location.",
        after_help = "EXAMPLES:\n    # Build challenge.csv\n    bdc challenges"
    )]
    Challenges,

    #[command(
        next_help_heading = "Challenges",
        about = "Extract availability of challenged locations",
        after_help = "EXAMPLES:\n    # Write cbsl.csv for every snapshot\n    bdc extract-cbsl"
    )]
    ExtractCbsl,

    #[command(
        next_help_heading = "Summaries",
        about = "Summarize availability per geography",
        after_help = "EXAMPLES:\n    # Nation through block summaries for every snapshot\n    bdc summarize-availability"
    )]
    SummarizeAvailability,

    #[command(
        next_help_heading = "Summaries",
        about = "Summarize availability per challenged location",
        after_help = "EXAMPLES:\n    # Write cbsl_summary.csv for every snapshot\n    bdc summarize-cbsl"
    )]
    SummarizeCbsl,

    #[command(
        next_help_heading = "Summaries",
        about = "Summarize challenges per geography",
        after_help = "EXAMPLES:\n    # Nation through block challenge summaries\n    bdc summarize-challenges"
    )]
    SummarizeChallenges,

    #[command(
        next_help_heading = "Summaries",
        about = "Summarize challenges per location",
        after_help = "EXAMPLES:\n    # Write bsl_summary.csv\n    bdc summarize-challenge-bsls"
    )]
    SummarizeChallengeBsls,

    #[command(
        next_help_heading = "Summaries",
        about = "Merge challenge and availability summaries",
        after_help = "EXAMPLES:\n    # Merge every level for every snapshot\n    bdc merge\n\n    # Emit machine-readable output\n    bdc merge --json"
    )]
    Merge,

    #[command(
        next_help_heading = "Pipeline",
        about = "Run every stage in order",
        long_about = "Run every stage in order. Finished units of work are skipped, so an interrupted run resumes where it stopped.",
        after_help = "EXAMPLES:\n    # Run the whole pipeline\n    bdc run\n\n    # With debug logs as JSON\n    BDC_LOG_FORMAT=json bdc -v run"
    )]
    Run,

    #[command(
        next_help_heading = "Pipeline",
        about = "Generate shell completion scripts",
        after_help = "EXAMPLES:\n    # Generate bash completions\n    bdc completions bash\n\n    # Generate zsh completions\n    bdc completions zsh"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

impl Commands {
    /// Stages this command runs; `None` for commands outside the pipeline.
    fn stages(&self) -> Option<Vec<Stage>> {
        let stage = match self {
            Self::Consolidate => Stage::Consolidate,
            Self::Geolocate => Stage::Geolocate,
            Self::Challenges => Stage::Challenges,
            Self::ExtractCbsl => Stage::ExtractCbsl,
            Self::SummarizeAvailability => Stage::SummarizeAvailability,
            Self::SummarizeCbsl => Stage::SummarizeCbsl,
            Self::SummarizeChallenges => Stage::SummarizeChallenges,
            Self::SummarizeChallengeBsls => Stage::SummarizeChallengeBsls,
            Self::Merge => Stage::Merge,
            Self::Run => return Some(Stage::ALL.to_vec()),
            Self::Completions(_) => return None,
        };
        Some(vec![stage])
    }
}

fn init_tracing(verbose: bool, quiet: bool) {
    let filter = EnvFilter::try_from_env("BDC_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "bdc=debug,info"
        } else if quiet {
            "warn"
        } else {
            "bdc=info,warn"
        })
    });

    let format = env::var("BDC_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    if let Commands::Completions(args) = &cli.command {
        let mut command = Cli::command();
        return cmd::completions::run_completions(args.shell, &mut command);
    }
    let stages = cli.command.stages().unwrap_or_default();

    let project = Project::open(cli.root.as_deref(), cli.config.as_deref())?;
    let mode = output::resolve_output_mode(cli.format, cli.json, project.config.output.as_deref());
    debug!(?mode, stages = stages.len(), "running");

    let reports = run_stages(&project.pipeline(), &stages)?;
    if cli.quiet && !mode.is_json() {
        return Ok(());
    }
    output::render_reports(mode, &reports)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let mode = output::resolve_output_mode(cli.format, cli.json, None);
            if let Err(render_err) = output::render_error(mode, &CliError::from(&err)) {
                eprintln!("error: {err:#} ({render_err})");
            }
            ExitCode::FAILURE
        }
    }
}
