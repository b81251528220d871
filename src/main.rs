//! CpetLab - CPET data cleaning and metrics
//!
//! Command-line entry point.
//!
//! ```bash
//! # Clean and analyse one export, printing key metrics as JSON
//! cpetlab process test01.csv --weight 72.5
//!
//! # Several files, with AUC between 50% and 80% of peak, CSV exports and history
//! cpetlab process a.csv b.csv --weight 70 --auc 50,80 --export-dir out --save
//!
//! # Inspect the stored history
//! cpetlab history list
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use cpetlab::metrics::AucResult;
use cpetlab::pipeline::{load_batch, run_batch, PipelineRun};
use cpetlab::series::exporter_csv::{
    export_audit_csv, export_rows_csv, export_summary_csv, generate_csv_filename, write_csv_file,
};
use cpetlab::storage::config::{get_config_path, load_config, save_config, AppConfig};
use cpetlab::storage::{DatabaseError, HistoryRecord, HistoryRepository, SqliteHistory};
use cpetlab::{CleaningStats, KeyMetrics};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

#[derive(Parser)]
#[command(
    name = "cpetlab",
    version,
    about = "Clean CPET exports and derive VO2max/peak metrics"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Run the cleaning and metrics pipeline on one or more CSV exports
    Process {
        /// CSV files to process
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Body weight in kg (defaults to the configured weight)
        #[arg(long)]
        weight: Option<f64>,

        /// Test duration in seconds, overriding the elapsed time of the series
        #[arg(long)]
        duration: Option<f64>,

        /// Integrate VO2 between two percentages of peak, e.g. "50,80"
        #[arg(long, value_parser = parse_auc_bounds)]
        auc: Option<(f64, f64)>,

        /// Write cleaned, smoothed, percentile, audit and summary CSVs here
        #[arg(long)]
        export_dir: Option<PathBuf>,

        /// Append the results to the history database
        #[arg(long)]
        save: bool,
    },

    /// Stored run history
    History {
        #[command(subcommand)]
        action: HistoryCommand,
    },

    /// Configuration file
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },
}

#[derive(Subcommand)]
enum HistoryCommand {
    /// List stored runs, oldest first
    List,
    /// Delete one stored run
    Delete { id: Uuid },
    /// Delete all stored runs
    Clear,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the effective configuration
    Show,
    /// Write a default configuration file if none exists
    Init,
}

/// JSON report printed for each processed file.
#[derive(Serialize)]
struct RunReport<'a> {
    source: &'a str,
    label: &'static str,
    key_metrics: &'a KeyMetrics,
    stats: &'a CleaningStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    auc: Option<AucResult>,
}

fn parse_auc_bounds(value: &str) -> std::result::Result<(f64, f64), String> {
    let (start, end) = value
        .split_once(',')
        .ok_or_else(|| format!("expected <start>,<end>, got '{}'", value))?;
    let start: f64 = start
        .trim()
        .parse()
        .map_err(|_| format!("invalid start percentage '{}'", start))?;
    let end: f64 = end
        .trim()
        .parse()
        .map_err(|_| format!("invalid end percentage '{}'", end))?;
    Ok((start, end))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = load_config().context("Failed to load configuration")?;

    match cli.command {
        Command::Process {
            files,
            weight,
            duration,
            auc,
            export_dir,
            save,
        } => process(
            &config,
            &files,
            weight,
            duration,
            auc,
            export_dir.as_deref(),
            save,
        ),
        Command::History { action } => history(&config, action),
        Command::Config { action } => config_command(&config, action),
    }
}

fn process(
    config: &AppConfig,
    files: &[PathBuf],
    weight: Option<f64>,
    duration: Option<f64>,
    auc: Option<(f64, f64)>,
    export_dir: Option<&Path>,
    save: bool,
) -> Result<()> {
    let Some(weight_kg) = weight.or(config.default_weight_kg) else {
        bail!("No body weight given; pass --weight or set default_weight_kg in the config");
    };

    let (inputs, unreadable) = load_batch(files, weight_kg, duration);
    for (name, e) in &unreadable {
        tracing::error!("Failed to read {}: {}", name, e);
    }
    let mut failures = unreadable.len();

    let results = run_batch(&inputs, &config.analysis);

    let mut history = if save {
        Some(SqliteHistory::open(&config.history_db_path()).context("Failed to open history")?)
    } else {
        None
    };

    for (name, result) in results {
        let run = match result {
            Ok(run) => run,
            Err(e) => {
                tracing::error!("{}: {}", name, e);
                failures += 1;
                continue;
            }
        };

        let auc_result = match auc {
            Some((start, end)) => run
                .auc(start, end)
                .with_context(|| format!("AUC for {}", name))?,
            None => None,
        };
        if auc.is_some() && auc_result.is_none() {
            tracing::warn!("{}: requested AUC bracket not reached", name);
        }

        let report = RunReport {
            source: &name,
            label: run.key_metrics.vo2_label(),
            key_metrics: &run.key_metrics,
            stats: &run.stats,
            auc: auc_result,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);

        if let Some(dir) = export_dir {
            export_run(config, &name, &run, dir)
                .with_context(|| format!("Failed to export {}", name))?;
        }

        if let Some(history) = history.as_mut() {
            let id = history.append(HistoryRecord::from_run(name.as_str(), &run))?;
            tracing::info!("Saved {} as {}", name, id);
        }
    }

    if failures > 0 {
        bail!("{} of {} inputs failed", failures, files.len());
    }

    Ok(())
}

fn export_run(config: &AppConfig, name: &str, run: &PipelineRun, dir: &Path) -> Result<()> {
    let decimals = config.export.decimals;

    let mut outputs = vec![
        ("cleaned", export_rows_csv(&run.cleaned, decimals)?),
        ("smoothed", export_rows_csv(&run.smoothed, decimals)?),
        ("audit", export_audit_csv(&run.audit_log, decimals)?),
        ("summary", export_summary_csv(&run.key_metrics, &run.stats)?),
    ];
    if !run.percentiles.is_empty() {
        outputs.push(("percentiles", export_rows_csv(&run.percentiles, decimals)?));
    }
    if config.export.include_raw {
        outputs.push(("raw", export_rows_csv(&run.raw, decimals)?));
    }

    for (kind, content) in outputs {
        let path = dir.join(generate_csv_filename(name, kind));
        write_csv_file(&content, &path)?;
        tracing::debug!("Wrote {}", path.display());
    }

    Ok(())
}

fn history(config: &AppConfig, action: HistoryCommand) -> Result<()> {
    let mut db =
        SqliteHistory::open(&config.history_db_path()).context("Failed to open history")?;

    match action {
        HistoryCommand::List => {
            for record in db.list()? {
                println!(
                    "{}  {}  {}  {} {:.3} L/min  {:.1} kg",
                    record.id,
                    record.created_at.format("%Y-%m-%d %H:%M"),
                    record.source_name,
                    record.key_metrics.vo2_label(),
                    record.key_metrics.vo2max,
                    record.weight_kg,
                );
            }
        }
        HistoryCommand::Delete { id } => {
            if !db.delete(id)? {
                return Err(DatabaseError::NotFound(id).into());
            }
            println!("Deleted {}", id);
        }
        HistoryCommand::Clear => {
            db.clear()?;
            println!("History cleared");
        }
    }

    Ok(())
}

fn config_command(config: &AppConfig, action: ConfigCommand) -> Result<()> {
    match action {
        ConfigCommand::Show => {
            println!("# {}", get_config_path().display());
            println!("{}", toml::to_string_pretty(config)?);
        }
        ConfigCommand::Init => {
            let path = get_config_path();
            if path.exists() {
                println!("Config already exists at {}", path.display());
            } else {
                save_config(config)?;
                println!("Wrote default config to {}", path.display());
            }
        }
    }

    Ok(())
}
