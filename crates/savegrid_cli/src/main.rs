//! Command-line driver for the savings grid.
//!
//! # Responsibility
//! - Open the owner's tracker on a SQLite file and apply one edit batch.
//! - Keep output line-oriented (`key=value`) for scripting and smoke checks.
//!
//! Usage: `savegrid_cli [DB_PATH] <command> [args...]`
//!
//! Commands: `status`, `layout`, `add N`, `remove N`, `toggle INDEX...`,
//! `group INDEX`, `row INDEX`, `target AMOUNT`, `reset`.
//!
//! Environment: `SAVEGRID_OWNER` (default `local`), `SAVEGRID_LOG_DIR`
//! (absolute path; logging stays off when unset).

use savegrid_core::db::open_db;
use savegrid_core::{
    core_version, default_log_level, init_logging, GridConfig, GroupCell, SavingsTracker,
    SqliteGoalRepository, SqliteGridStore,
};
use std::process::ExitCode;

const DEFAULT_DB_PATH: &str = "savegrid.sqlite3";
const DEFAULT_OWNER: &str = "local";

fn main() -> ExitCode {
    match run(std::env::args().skip(1).collect()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error={message}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Vec<String>) -> Result<(), String> {
    if let Ok(log_dir) = std::env::var("SAVEGRID_LOG_DIR") {
        init_logging(default_log_level(), &log_dir)?;
    }

    let (db_path, args) = split_db_path(args);
    let owner = std::env::var("SAVEGRID_OWNER").unwrap_or_else(|_| DEFAULT_OWNER.to_string());
    let Some(command) = args.first().cloned() else {
        return Err(format!("missing command; savegrid_cli {}", core_version()));
    };
    let rest = &args[1..];

    let conn = open_db(&db_path).map_err(|err| err.to_string())?;
    let (mut tracker, report) = SavingsTracker::open(
        SqliteGoalRepository::new(&conn),
        SqliteGridStore::new(&conn, owner.as_str()),
        owner.as_str(),
        GridConfig::standard(),
    )
    .map_err(|err| err.to_string())?;
    if let Some(err) = report.init.load_error {
        eprintln!("warning=grid_load_failed detail={err}");
    }
    if let Some(stored) = report.clamped_target {
        eprintln!("warning=target_clamped stored={stored}");
    }

    match command.as_str() {
        "status" => {}
        "layout" => print_layout(tracker.engine().group_layout()),
        "add" => {
            let count = parse_count(rest)?.min(tracker.engine().capacity());
            for _ in 0..count {
                tracker.engine_mut().increment_one();
            }
        }
        "remove" => {
            let count = parse_count(rest)?.min(tracker.engine().capacity());
            for _ in 0..count {
                tracker.engine_mut().decrement_one();
            }
        }
        "toggle" => {
            for raw in rest {
                tracker.engine_mut().toggle_unit(parse_index(raw)?);
            }
        }
        "group" => {
            tracker.engine_mut().toggle_group(parse_index(first(rest)?)?);
        }
        "row" => {
            tracker.engine_mut().toggle_row(parse_index(first(rest)?)?);
        }
        "target" => {
            let change = tracker
                .change_target(first(rest)?)
                .map_err(|err| err.to_string())?;
            if let Some(delta) = change.resize.forced_delta {
                println!("forced_delta={delta}");
            }
        }
        "reset" => tracker.reset().map_err(|err| err.to_string())?,
        other => return Err(format!("unknown command `{other}`")),
    }

    if let Some(delta) = tracker.commit().map_err(|err| err.to_string())? {
        println!("delta={delta}");
    }

    let progress = tracker.progress();
    println!("owner={}", tracker.owner_id());
    println!("current={}", tracker.current_amount());
    println!("target={}", tracker.target_amount());
    println!("percentage={}", progress.percentage);
    println!("remaining={}", progress.remaining);
    println!("goal_reached={}", progress.is_goal_reached());
    Ok(())
}

/// A leading argument that is not a command names the database file.
fn split_db_path(mut args: Vec<String>) -> (String, Vec<String>) {
    match args.first() {
        Some(head) if !is_command(head) => {
            let path = args.remove(0);
            (path, args)
        }
        _ => (DEFAULT_DB_PATH.to_string(), args),
    }
}

fn is_command(value: &str) -> bool {
    matches!(
        value,
        "status" | "layout" | "add" | "remove" | "toggle" | "group" | "row" | "target" | "reset"
    )
}

fn first(rest: &[String]) -> Result<&str, String> {
    rest.first()
        .map(String::as_str)
        .ok_or_else(|| "missing argument".to_string())
}

fn parse_count(rest: &[String]) -> Result<usize, String> {
    match rest.first() {
        Some(raw) => parse_index(raw),
        None => Ok(1),
    }
}

fn parse_index(raw: &str) -> Result<usize, String> {
    raw.trim()
        .parse::<usize>()
        .map_err(|_| format!("expected a non-negative integer, got `{raw}`"))
}

fn print_layout(layout: Vec<GroupCell>) {
    let line: String = layout
        .iter()
        .map(|cell| match cell {
            GroupCell::Filled { .. } => "#".to_string(),
            GroupCell::Units { states, .. } => states
                .iter()
                .map(|active| if *active { 'o' } else { '.' })
                .collect(),
        })
        .collect::<Vec<_>>()
        .join(" ");
    println!("layout={line}");
}
