//! `occur` CLI -- materialize occurrences and plan edits over a JSON snapshot
//! of event definitions.
//!
//! ## Usage
//!
//! ```sh
//! # Occurrences for a date range (definitions from a file)
//! occur -d family.json materialize --from 2025-06-02 --to 2025-06-15
//!
//! # The week containing a date, grouped by day (definitions from stdin)
//! cat family.json | occur materialize --from 2025-06-04 --week --by-day
//!
//! # What write would this edit need?
//! occur -d family.json plan --intent edit.json
//!
//! # Plan and apply it, writing the updated definitions
//! occur -d family.json apply --intent edit.json -o family.json
//!
//! # Check every definition is well-formed
//! occur -d family.json validate
//! ```

mod config;

use std::io::{self, Read};

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate};
use clap::{Parser, Subcommand};
use occurrence_engine::dates::{parse_date, week_window};
use occurrence_engine::{
    apply_plan, group_by_day, materialize, plan_mutation, EventDefinition, Intent,
};
use tracing_subscriber::EnvFilter;

use crate::config::{load_config, Config};

#[derive(Parser)]
#[command(
    name = "occur",
    version,
    about = "Family calendar occurrence engine CLI"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Definitions JSON file (reads from stdin if omitted)
    #[arg(short, long, global = true)]
    definitions: Option<String>,

    /// TOML config file
    #[arg(long, global = true)]
    config: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the occurrences inside a date window as JSON
    Materialize {
        /// First day of the window (YYYY-MM-DD)
        #[arg(long)]
        from: String,
        /// Last day of the window, inclusive (defaults to the configured window length)
        #[arg(long, conflicts_with = "week")]
        to: Option<String>,
        /// Use the whole week containing --from
        #[arg(long)]
        week: bool,
        /// Group occurrences under their date
        #[arg(long)]
        by_day: bool,
    },
    /// Print the write plan for an intent without applying it
    Plan {
        /// Intent JSON file
        #[arg(short, long)]
        intent: String,
    },
    /// Plan an intent, apply it, and print the updated definitions
    Apply {
        /// Intent JSON file
        #[arg(short, long)]
        intent: String,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Check every definition and report the invalid ones
    Validate,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    init_logging(&config);

    let definitions = read_definitions(cli.definitions.as_deref())?;
    tracing::debug!(count = definitions.len(), "loaded definitions");

    match cli.command {
        Commands::Materialize {
            from,
            to,
            week,
            by_day,
        } => {
            let (window_start, window_end) = resolve_window(&config, &from, to.as_deref(), week)?;
            let occurrences = materialize(&definitions, window_start, window_end);

            let json = if by_day {
                serde_json::to_string_pretty(&group_by_day(&occurrences))?
            } else {
                serde_json::to_string_pretty(&occurrences)?
            };
            write_output(None, &json)?;
        }
        Commands::Plan { intent } => {
            let intent = read_intent(&intent)?;
            let plan = plan_mutation(&definitions, &intent)
                .with_context(|| format!("Failed to plan {}", intent.name()))?;
            write_output(None, &serde_json::to_string_pretty(&plan)?)?;
        }
        Commands::Apply { intent, output } => {
            let intent = read_intent(&intent)?;
            let mut definitions = definitions;
            let plan = plan_mutation(&definitions, &intent)
                .with_context(|| format!("Failed to plan {}", intent.name()))?;
            apply_plan(&mut definitions, &plan).context("Failed to apply write plan")?;
            write_output(output.as_deref(), &serde_json::to_string_pretty(&definitions)?)?;
        }
        Commands::Validate => {
            let mut invalid = 0usize;
            for definition in &definitions {
                match definition.validate() {
                    Ok(()) => println!("ok       {}", definition.id),
                    Err(e) => {
                        invalid += 1;
                        println!("invalid  {}", e);
                    }
                }
            }
            if invalid > 0 {
                anyhow::bail!("{} of {} definitions are invalid", invalid, definitions.len());
            }
        }
    }

    Ok(())
}

/// `RUST_LOG` wins over the config file's `log_level`.
fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Turn the `materialize` arguments into an inclusive window.
fn resolve_window(
    config: &Config,
    from: &str,
    to: Option<&str>,
    week: bool,
) -> Result<(NaiveDate, NaiveDate)> {
    let start = parse_date(from).context("Invalid --from")?;

    if week {
        return Ok(week_window(start, config.week_starts_on.into()));
    }
    let end = match to {
        Some(to) => parse_date(to).context("Invalid --to")?,
        None => start
            .checked_add_signed(Duration::days(i64::from(config.default_window_days) - 1))
            .with_context(|| {
                format!(
                    "default_window_days = {} runs past the last representable date",
                    config.default_window_days
                )
            })?,
    };
    Ok((start, end))
}

fn read_definitions(path: Option<&str>) -> Result<Vec<EventDefinition>> {
    let raw = read_input(path)?;
    serde_json::from_str(&raw).context("Failed to parse definitions JSON")
}

fn read_intent(path: &str) -> Result<Intent> {
    let raw = read_input(Some(path))?;
    serde_json::from_str(&raw).context("Failed to parse intent JSON")
}

fn read_input(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path))
        }
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}

fn write_output(path: Option<&str>, content: &str) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write file: {}", path))?;
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
