use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use chrono::NaiveDate;
use clap::{ArgAction, Args, Parser, Subcommand};
use taskdeck_shared::{TaskId, TaskPriority, TaskStatus};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::filter::{PriorityFilter, StatusFilter};

#[derive(Debug, Clone)]
pub struct PreprocessedArgs {
    pub cleaned_args: Vec<OsString>,
    pub rc_overrides: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "taskdeck",
    version,
    about = "taskdeck: command-line client for a personal task tracker",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append,
        global = true
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "config", global = true)]
    pub config: Option<PathBuf>,

    #[arg(long = "data", global = true)]
    pub data: Option<PathBuf>,

    #[arg(long = "api-url", global = true)]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Load tasks and print the filtered list.
    List(ListArgs),
    /// Create a task.
    Add(AddArgs),
    /// Replace fields of an existing task.
    Edit(EditArgs),
    /// Delete a task after confirmation.
    Delete(DeleteArgs),
    /// Toggle the starred flag of a task.
    Star(IdArg),
    /// Store session tokens obtained from the backend.
    Login(LoginArgs),
    /// Forget session tokens.
    Logout,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    #[arg(long, default_value = "ALL")]
    pub status: StatusFilter,

    #[arg(long, default_value = "ALL")]
    pub priority: PriorityFilter,

    #[arg(long)]
    pub starred: bool,

    #[arg(long, default_value = "")]
    pub search: String,
}

#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    pub title: String,

    #[arg(short = 'd', long)]
    pub description: Option<String>,

    #[arg(long, value_parser = parse_due_date)]
    pub due: Option<String>,

    #[arg(long)]
    pub priority: Option<TaskPriority>,

    #[arg(long)]
    pub status: Option<TaskStatus>,

    #[arg(long)]
    pub starred: bool,
}

#[derive(Args, Debug, Clone)]
pub struct EditArgs {
    pub id: TaskId,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(short = 'd', long)]
    pub description: Option<String>,

    #[arg(long, value_parser = parse_due_date, conflicts_with = "clear_due")]
    pub due: Option<String>,

    #[arg(long)]
    pub clear_due: bool,

    #[arg(long)]
    pub priority: Option<TaskPriority>,

    #[arg(long)]
    pub status: Option<TaskStatus>,

    #[arg(long)]
    pub starred: Option<bool>,
}

#[derive(Args, Debug, Clone)]
pub struct DeleteArgs {
    pub id: TaskId,

    /// Skip the confirmation prompt.
    #[arg(short = 'y', long)]
    pub yes: bool,
}

#[derive(Args, Debug, Clone)]
pub struct IdArg {
    pub id: TaskId,
}

#[derive(Args, Debug, Clone)]
pub struct LoginArgs {
    #[arg(long)]
    pub access_token: String,

    #[arg(long)]
    pub refresh_token: String,
}

/// Accepts `YYYY-MM-DD` and returns it unchanged.
pub fn parse_due_date(raw: &str) -> anyhow::Result<String> {
    let trimmed = raw.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .map_err(|e| anyhow!("invalid due date {raw:?}, expected YYYY-MM-DD: {e}"))?;
    Ok(trimmed.to_string())
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

#[tracing::instrument(skip_all)]
pub fn preprocess_args(raw: &[OsString]) -> anyhow::Result<PreprocessedArgs> {
    let mut cleaned = Vec::with_capacity(raw.len());
    let mut overrides: Vec<(String, String)> = Vec::new();

    let mut iter = raw.iter().cloned();
    if let Some(bin) = iter.next() {
        cleaned.push(bin);
    }

    for arg in iter {
        let s = arg.to_string_lossy();
        if let Some(rest) = s.strip_prefix("rc.") {
            let parsed = if let Some((k, v)) = rest.split_once('=') {
                Some((format!("rc.{k}"), v.to_string()))
            } else if let Some((k, v)) = rest.split_once(':') {
                Some((format!("rc.{k}"), v.to_string()))
            } else {
                None
            };

            if let Some((k, v)) = parsed {
                debug!(key = %k, value = %v, "captured positional rc override");
                overrides.push((k, v));
                continue;
            }
        }

        cleaned.push(arg);
    }

    Ok(PreprocessedArgs {
        cleaned_args: cleaned,
        rc_overrides: overrides,
    })
}

#[cfg(test)]
mod tests {
    use std::ffi::OsString;

    use clap::Parser;
    use taskdeck_shared::{TaskPriority, TaskStatus};

    use super::{Command, GlobalCli, parse_due_date, preprocess_args};
    use crate::filter::{PriorityFilter, StatusFilter};

    fn os(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    #[test]
    fn list_filters_parse() {
        let cli = GlobalCli::try_parse_from([
            "taskdeck",
            "list",
            "--status",
            "completed",
            "--starred",
            "--search",
            "release",
        ])
        .expect("parse");

        let Some(Command::List(args)) = cli.command else {
            panic!("expected list command");
        };
        assert_eq!(args.status, StatusFilter::Only(TaskStatus::Completed));
        assert_eq!(args.priority, PriorityFilter::All);
        assert!(args.starred);
        assert_eq!(args.search, "release");
    }

    #[test]
    fn add_rejects_bad_due_date() {
        let err = GlobalCli::try_parse_from(["taskdeck", "add", "Write report", "--due", "soon"]);
        assert!(err.is_err());

        let cli = GlobalCli::try_parse_from([
            "taskdeck",
            "add",
            "Write report",
            "--due",
            "2026-12-01",
            "--priority",
            "high",
        ])
        .expect("parse");
        let Some(Command::Add(args)) = cli.command else {
            panic!("expected add command");
        };
        assert_eq!(args.due.as_deref(), Some("2026-12-01"));
        assert_eq!(args.priority, Some(TaskPriority::High));
    }

    #[test]
    fn edit_due_and_clear_due_conflict() {
        let err = GlobalCli::try_parse_from([
            "taskdeck",
            "edit",
            "3",
            "--due",
            "2026-12-01",
            "--clear-due",
        ]);
        assert!(err.is_err());
    }

    #[test]
    fn positional_rc_overrides_are_captured() {
        let pre = preprocess_args(&os(&["taskdeck", "rc.confirm:off", "list", "rc.color=off"]))
            .expect("preprocess");

        assert_eq!(pre.cleaned_args, os(&["taskdeck", "list"]));
        assert_eq!(
            pre.rc_overrides,
            vec![
                ("rc.confirm".to_string(), "off".to_string()),
                ("rc.color".to_string(), "off".to_string()),
            ]
        );
    }

    #[test]
    fn due_date_is_trimmed() {
        assert_eq!(parse_due_date(" 2026-02-28 ").expect("valid"), "2026-02-28");
        assert!(parse_due_date("2026-02-30").is_err());
    }
}
