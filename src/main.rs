//! Box Score Replay CLI
//!
//! Replays standardized JSON game documents and reports snapshot counts, invariant
//! diagnostics and the verification grade.
//!
//! # Usage
//!
//! ```bash
//! boxscore_replay replay --input games/0022300001.json --output outcome.json
//! boxscore_replay batch --dir games/ --workers 8 --output summary.json
//! ```
//!
//! # Exit Codes
//!
//! - 0: Success, every replayed game verified with a passing grade and no violations
//! - 1: Replay completed but a game graded F, failed, or broke an invariant
//! - 2: Configuration error
//! - 3: Runtime error (I/O, unreadable game documents)

use anyhow::{Context, Result};
use boxscore_replay::replay::{
    BatchRunner, JsonGameAdapter, QualityGrade, ReplayConfig, ReplayDriver, ReplayOutcome,
};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const SOURCE_IDENTIFIER: &str = "json";

// =============================================================================
// CLI ARGUMENTS
// =============================================================================

/// Play-by-play box score replay and verification
#[derive(Parser, Debug)]
#[command(name = "boxscore_replay")]
#[command(about = "Replay basketball play-by-play into per-event box score snapshots")]
struct Cli {
    /// Replay config (TOML). Falls back to REPLAY_CONFIG_PATH, then replay.toml, then defaults
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a single game document
    Replay {
        /// Path to the game document
        #[arg(short, long)]
        input: PathBuf,

        /// Skip ground-truth verification
        #[arg(long)]
        no_verify: bool,

        /// Write the full outcome (snapshots included) as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Replay every game document in a directory
    Batch {
        /// Directory of *.json game documents
        #[arg(short, long)]
        dir: PathBuf,

        /// Override max_concurrent_games
        #[arg(short, long, env = "REPLAY_WORKERS")]
        workers: Option<usize>,

        /// Skip ground-truth verification
        #[arg(long)]
        no_verify: bool,

        /// Write the batch summary as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "boxscore_replay=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_config(path: Option<&Path>) -> Result<ReplayConfig> {
    match path {
        Some(path) => ReplayConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(ReplayConfig::from_env()),
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    info!(path = %path.display(), "Wrote output");
    Ok(())
}

fn passed(outcome: &ReplayOutcome) -> bool {
    let grade_ok = outcome
        .verification
        .as_ref()
        .map(|v| v.quality_grade != QualityGrade::F)
        .unwrap_or(true);
    grade_ok && outcome.is_fully_valid()
}

fn print_outcome(outcome: &ReplayOutcome) {
    println!("game {} ({})", outcome.game_id, outcome.source_identifier);
    println!("  snapshots:        {}", outcome.snapshots.len());
    println!("  degraded records: {}", outcome.degraded_records.len());
    println!("  no-op updates:    {}", outcome.no_op_updates);
    println!("  invalid snapshots: {}", outcome.diagnostics.len());
    if let Some(last) = outcome.final_snapshot() {
        println!(
            "  final: {} {} - {} {} (Q{} {})",
            last.home_team_id,
            last.home_score,
            last.away_score,
            last.away_team_id,
            last.period,
            last.clock_display
        );
    }
    if let Some(v) = &outcome.verification {
        println!(
            "  grade: {} ({} discrepancies, score match: {})",
            v.quality_grade, v.total_discrepancy_count, v.final_score_match
        );
        for note in &v.notes {
            println!("  note: {}", note);
        }
    }
    if let Some(fp) = &outcome.fingerprint {
        println!("  fingerprint: {}", fp);
    }
}

// =============================================================================
// COMMANDS
// =============================================================================

async fn run_replay(
    config: ReplayConfig,
    input: &Path,
    output: Option<&Path>,
) -> Result<ExitCode> {
    let adapter = JsonGameAdapter::new(SOURCE_IDENTIFIER);
    let game_id = adapter.load_file(input).await?;

    let outcome = match ReplayDriver::new(&adapter, &config).run(&game_id).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(game_id = %game_id, error = %e, "Replay failed");
            return Ok(ExitCode::from(1));
        }
    };

    print_outcome(&outcome);
    if let Some(path) = output {
        write_json(path, &outcome)?;
    }
    Ok(if passed(&outcome) {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

async fn run_batch(config: ReplayConfig, dir: &Path, output: Option<&Path>) -> Result<ExitCode> {
    let adapter = Arc::new(JsonGameAdapter::new(SOURCE_IDENTIFIER));
    let game_ids = adapter.load_dir(dir).await?;
    if game_ids.is_empty() {
        warn!(dir = %dir.display(), "No game documents found");
    }

    let runner = BatchRunner::new(adapter, config);
    let cancel = runner.cancel_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received; finishing in-flight games");
            cancel.store(true, Ordering::SeqCst);
        }
    });

    let report = runner.run(game_ids).await;
    let summary = report.summary();

    println!("batch {}", summary.run_id);
    println!(
        "  games: {} completed, {} failed, {} cancelled",
        summary.completed, summary.failed, summary.cancelled
    );
    for grade in QualityGrade::all() {
        println!("  {}: {}", grade, summary.grades.get(grade).copied().unwrap_or(0));
    }
    for (game_id, kind) in &summary.failures {
        println!("  failed {}: {}", game_id, kind);
    }

    if let Some(path) = output {
        write_json(path, &summary)?;
    }

    let all_passed = summary.failed == 0
        && summary.cancelled == 0
        && report.completed().all(passed);
    Ok(if all_passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenv();
    init_tracing();

    let cli = Cli::parse();
    let mut config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %format!("{:#}", e), "Invalid configuration");
            return ExitCode::from(2);
        }
    };

    let result = match cli.command {
        Commands::Replay {
            input,
            no_verify,
            output,
        } => {
            if no_verify {
                config.verify = false;
            }
            run_replay(config, &input, output.as_deref()).await
        }
        Commands::Batch {
            dir,
            workers,
            no_verify,
            output,
        } => {
            if let Some(workers) = workers {
                config.max_concurrent_games = workers;
            }
            if no_verify {
                config.verify = false;
            }
            run_batch(config, &dir, output.as_deref()).await
        }
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            error!(error = %format!("{:#}", e), "Replay run failed");
            ExitCode::from(3)
        }
    }
}
