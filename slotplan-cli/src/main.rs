use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use slotplan_core::time::parse_local_datetime;
use slotplan_core::{find_collision, optimize, OptimizeOptions, Scenario, Schedule};
use slotplan_ingest::{build_scenario, RawTask, RawTimeSlot};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

mod calendar;
mod config;
mod state;

use crate::config::{init_config, load_config, Config};

#[derive(Parser, Debug)]
#[command(
    name = "slotplan",
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("SLOTPLAN_BUILD_SHA"), ")"),
    about = "Place tasks into recurring working hours with tabu search"
)]
struct Cli {
    /// Config file (default: ~/.slotplan/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write the default config file if it does not exist yet
    InitConfig,

    /// Optimize a scenario JSON file (tasks, time_slots, existing_schedule)
    Optimize {
        #[arg(long)]
        scenario: PathBuf,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Build a scenario from stored task and time-slot rows, then optimize it
    Plan {
        /// JSON array of task rows
        #[arg(long)]
        tasks: PathBuf,

        /// JSON array of availability rows
        #[arg(long)]
        time_slots: PathBuf,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Check a saved schedule (or optimize output) for overlapping segments
    Check {
        #[arg(long)]
        schedule: PathBuf,
    },
}

#[derive(Args, Debug, Clone, Default)]
struct RunArgs {
    /// Local wall-clock "now" as "YYYY-MM-DD HH:MM" (default: current time)
    #[arg(long)]
    now: Option<String>,

    /// Re-plan tasks that already have a saved placement
    #[arg(long)]
    include_scheduled: bool,

    #[arg(long)]
    max_iterations: Option<usize>,

    #[arg(long)]
    tabu_tenure: Option<usize>,

    #[arg(long)]
    max_no_improvement: Option<usize>,

    /// Print an ICS calendar instead of JSON
    #[arg(long)]
    ics: bool,
}

impl RunArgs {
    fn options(&self) -> OptimizeOptions {
        OptimizeOptions {
            include_scheduled_tasks: self.include_scheduled,
            coefficients: None,
            max_iterations: self.max_iterations,
            tabu_tenure: self.tabu_tenure,
            max_no_improvement: self.max_no_improvement,
        }
    }
}

/// `check` accepts either a bare schedule or a full optimize result.
#[derive(Deserialize)]
#[serde(untagged)]
enum SavedSchedule {
    Result { schedule: Schedule },
    Bare(Schedule),
}

#[derive(Serialize)]
struct CheckReport<'a> {
    valid: bool,
    tasks: usize,
    partial: usize,
    collision: Option<&'a slotplan_core::Collision>,
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Command::InitConfig => {
            init_config(cli.config.as_deref())?;
        }

        Command::Optimize { scenario, run } => {
            let cfg = load_config(cli.config.as_deref())?;
            let scenario: Scenario = read_json(&scenario)?;
            run_and_print(&scenario, &run, &cfg)?;
        }

        Command::Plan {
            tasks,
            time_slots,
            run,
        } => {
            let cfg = load_config(cli.config.as_deref())?;
            let tasks: Vec<RawTask> = read_json(&tasks)?;
            let slots: Vec<RawTimeSlot> = read_json(&time_slots)?;
            match build_scenario(&tasks, &slots, run.include_scheduled)? {
                Some(scenario) => run_and_print(&scenario, &run, &cfg)?,
                None => eprintln!("Nothing to schedule: no tasks or no working hours."),
            }
        }

        Command::Check { schedule } => {
            let saved: SavedSchedule = read_json(&schedule)?;
            let schedule = match saved {
                SavedSchedule::Result { schedule } | SavedSchedule::Bare(schedule) => schedule,
            };
            let collision = find_collision(&schedule);
            let report = CheckReport {
                valid: collision.is_none(),
                tasks: schedule.len(),
                partial: schedule.partial_count(),
                collision: collision.as_ref(),
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
            if let Some(c) = collision {
                bail!(
                    "tasks '{}' and '{}' overlap at {}",
                    c.first_task,
                    c.second_task,
                    slotplan_core::time::to_utc(c.at())
                );
            }
        }
    }

    Ok(())
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_env("SLOTPLAN_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .compact();

    let _ = subscriber.try_init();
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let s = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&s).with_context(|| format!("parse {}", path.display()))
}

fn resolve_now(run: &RunArgs, cfg: &Config) -> Result<DateTime<Utc>> {
    let Some(local) = run.now.as_deref() else {
        return Ok(Utc::now());
    };
    let tz = cfg.scheduler.tz()?;
    match parse_local_datetime(local, tz) {
        Some(now) => Ok(now),
        None => bail!("--now must look like \"YYYY-MM-DD HH:MM\" and exist in {tz}, got {local:?}"),
    }
}

fn run_and_print(scenario: &Scenario, run: &RunArgs, cfg: &Config) -> Result<()> {
    let now = resolve_now(run, cfg)?;
    debug!(%now, tasks = scenario.tasks.len(), "running optimizer");
    let result = optimize(scenario, &run.options(), &cfg.scheduler, now)
        .context("optimization failed")?;

    if run.ics {
        let events = calendar::schedule_to_events(&result.schedule, &cfg.output.ics_prefix);
        print!("{}", calendar::events_to_ics(&events));
    } else if cfg.output.pretty {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", serde_json::to_string(&result)?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optimize_flags_parse() {
        let cli = Cli::try_parse_from([
            "slotplan",
            "--config",
            "/tmp/c.toml",
            "optimize",
            "--scenario",
            "s.json",
            "--now",
            "2025-05-05 08:31",
            "--include-scheduled",
            "--max-iterations",
            "25",
            "--ics",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
        let Command::Optimize { scenario, run } = cli.command else {
            panic!("expected optimize");
        };
        assert_eq!(scenario, PathBuf::from("s.json"));
        assert!(run.ics);
        let opts = run.options();
        assert!(opts.include_scheduled_tasks);
        assert_eq!(opts.max_iterations, Some(25));
        assert_eq!(opts.tabu_tenure, None);
    }

    #[test]
    fn test_now_is_read_in_configured_timezone() {
        let mut cfg = Config::default();
        cfg.scheduler.timezone = "America/Chicago".into();
        let run = RunArgs {
            now: Some("2025-05-05 08:30".into()),
            ..Default::default()
        };
        let now = resolve_now(&run, &cfg).unwrap();
        assert_eq!(now.to_rfc3339(), "2025-05-05T13:30:00+00:00");

        let bad = RunArgs {
            now: Some("tomorrow".into()),
            ..Default::default()
        };
        assert!(resolve_now(&bad, &cfg).is_err());
    }

    #[test]
    fn test_check_accepts_result_or_bare_schedule() {
        let json = r#"{"tasks":[],"time_slots":{},"existing_schedule":[],
            "metadata":{"generated_at":"2025-05-05T08:00:00Z","search_start":0,"search_end":0,
                        "include_scheduled_tasks":false}}"#;
        let bare: SavedSchedule = serde_json::from_str(json).unwrap();
        assert!(matches!(bare, SavedSchedule::Bare(_)));

        let wrapped = format!(r#"{{"schedule":{json},"objective_value":null,"stats":{{}}}}"#);
        let wrapped: SavedSchedule = serde_json::from_str(&wrapped).unwrap();
        assert!(matches!(wrapped, SavedSchedule::Result { .. }));
    }
}
