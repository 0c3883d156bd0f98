use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use cityquest_cli::{
    build_provider, compare_files, describe_outcome, explain, load_config, match_files,
};
use console::style;
use core_types::config::EncoderBackend;
use matcher::{AnswerImageResolver, MatchError};
use tracing_subscriber::EnvFilter;

/// Debug / scripting CLI for CityQuest image matching.
#[derive(Parser, Debug)]
#[command(name = "cityquest-cli", version, about = "CityQuest matcher diagnostics")]
struct Cli {
    /// Config file (default: $CITYQUEST_CONFIG or config/cityquest.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Override the encoder backend.
    #[arg(long, global = true)]
    backend: Option<EncoderBackend>,
    /// Log resolver and matcher activity to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Similarity of two local image files.
    Compare { a: PathBuf, b: PathBuf },
    /// Score a probe photo against answer image identifiers.
    Match {
        probe: PathBuf,
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Show where an answer image identifier resolves to.
    Resolve {
        id: String,
        /// Print every path tried, in order.
        #[arg(long)]
        explain: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let cfg = load_config(cli.config.as_deref(), cli.backend)?;
    let resolver = AnswerImageResolver::new(&cfg.paths);

    match cli.command {
        Commands::Compare { a, b } => {
            let provider = build_provider(&cfg.model)?;
            let score = compare_files(&provider, &a, &b)?;
            println!("{} {score:.4}", style("similarity").bold());
        }
        Commands::Match { probe, ids } => {
            let provider = build_provider(&cfg.model)?;
            match match_files(&provider, &resolver, &probe, &ids) {
                Ok(report) => {
                    let best = report.result.best_candidate_id.as_deref();
                    for outcome in &report.outcomes {
                        println!("{}", describe_outcome(outcome, best));
                    }
                    println!(
                        "{} {} ({:.4})",
                        style("best").bold(),
                        best.unwrap_or("-"),
                        report.result.score
                    );
                }
                Err(err) => {
                    if let Some(MatchError::NoValidCandidates(outcomes)) = err.downcast_ref() {
                        for outcome in outcomes {
                            eprintln!("{}", describe_outcome(outcome, None));
                        }
                    }
                    return Err(err);
                }
            }
        }
        Commands::Resolve { id, explain: true } => {
            for probe in explain(&resolver, &id)? {
                let mark = if probe.exists {
                    style("found").green().to_string()
                } else {
                    style("-").dim().to_string()
                };
                println!("{mark:>5}  {}", probe.path.display());
            }
        }
        Commands::Resolve { id, explain: false } => {
            let found = resolver.resolve(&id)?;
            println!("{} ({} bytes)", found.path.display(), found.bytes.len());
        }
    }
    Ok(())
}
