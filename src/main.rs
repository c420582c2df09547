//! Solverboard CLI
//!
//! Ingests solver logs (`.log`) and leaderboard pages (`.html`/`.htm`) and
//! prints comparative analytics.
//!
//! Usage:
//!   solverboard report runs/*.log board.html --output report.json
//!   solverboard owners runs/*.log
//!   solverboard outliers runs/*.log board.html

use anyhow::Result;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use solverboard::analytics::{all_owners, best_per_instance, compute, find_outliers, rank_owners};
use solverboard::config::{AppConfig, CONFIG_PATH_ENV};
use solverboard::ingest::{ingest_paths, FileReport};
use solverboard::report::AnalyticsReport;
use solverboard::store::RecordStore;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Compare solver results across logs and leaderboards
#[derive(Parser, Debug)]
#[command(name = "solverboard")]
#[command(about = "Normalize solver logs and leaderboard pages and compare results")]
struct Cli {
    /// Path to a TOML config file
    #[arg(short, long, env = CONFIG_PATH_ENV)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Full analytics report as JSON
    Report {
        /// Source files
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output file path (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Per-owner standings
    Owners {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Best score and holders per instance
    Instances {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Notable instances (mixed outcomes, wide score gaps)
    Outliers {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Per-file ingestion status only
    Sources {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

impl Commands {
    fn files(&self) -> &[PathBuf] {
        match self {
            Commands::Report { files, .. }
            | Commands::Owners { files }
            | Commands::Instances { files }
            | Commands::Outliers { files }
            | Commands::Sources { files } => files,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::from_env(),
    };
    init_tracing(&config);

    let store = RecordStore::new();
    let reports = ingest_paths(cli.command.files(), &config.ingest).await;
    print_file_status(&reports);
    store.commit_batch(reports);

    let snapshot = store.snapshot();
    let records = snapshot.records();

    match &cli.command {
        Commands::Report { output, .. } => {
            let report = AnalyticsReport::build(&snapshot, &config.insights);
            match output {
                Some(path) => {
                    report.write_json(path)?;
                    println!("Report written to {:?}", path);
                }
                None => println!("{}", serde_json::to_string_pretty(&report)?),
            }
        }
        Commands::Owners { .. } => {
            let metrics = compute(records);
            println!(
                "\n{:>4} {:<32} {:>12} {:>8} {:>8} {:>6}",
                "Rank", "Owner", "Avg Score", "Solved", "Total", "Best"
            );
            println!("{}", "-".repeat(75));
            for row in rank_owners(&metrics) {
                println!(
                    "{:>4} {:<32} {:>12} {:>8} {:>8} {:>6}",
                    row.rank.map(|r| r.to_string()).unwrap_or_else(|| "-".into()),
                    row.owner,
                    row.avg_score
                        .map(|s| format!("{:.2}", s))
                        .unwrap_or_else(|| "-".into()),
                    row.solved_count,
                    row.total_problems,
                    row.best_solutions
                );
            }
        }
        Commands::Instances { .. } => {
            println!(
                "\n{:<28} {:>12} {:>6}/{:<6} Best",
                "Instance", "Best Score", "Solved", "Tried"
            );
            println!("{}", "-".repeat(75));
            for row in best_per_instance(records) {
                println!(
                    "{:<28} {:>12} {:>6}/{:<6} {}",
                    row.instance,
                    row.best_score
                        .map(|s| format!("{:.2}", s))
                        .unwrap_or_else(|| "--".into()),
                    row.solved,
                    row.attempted,
                    row.best_owners.join(", ")
                );
            }
        }
        Commands::Outliers { .. } => {
            let observations = find_outliers(records, &all_owners(records), &config.insights);
            if observations.is_empty() {
                println!("\nNo notable instances.");
            }
            for observation in observations {
                println!("  • {}", observation.text);
            }
        }
        Commands::Sources { .. } => {
            for source in snapshot.sources() {
                println!(
                    "  {} ({}): {} records, {} owners",
                    source.name,
                    source.source_type.map(|t| t.as_str()).unwrap_or("?"),
                    source.records,
                    source.owners
                );
            }
        }
    }

    Ok(())
}

fn init_tracing(config: &AppConfig) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.filter.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn print_file_status(reports: &[FileReport]) {
    eprintln!("=== Sources ===");
    for report in reports {
        match report.error_message() {
            None => eprintln!(
                "  ✓ {} ({} records, {} skipped)",
                report.source_name,
                report.outcome.records.len(),
                report.outcome.diagnostics.len()
            ),
            Some(message) => eprintln!("  ✗ {}: {}", report.source_name, message),
        }
    }
}
