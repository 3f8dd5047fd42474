//! CLI module for Opspilot
//!
//! Provides commands:
//! - `ask`: answer one question through the orchestrator
//! - `trace`: show, list and compare recorded traces
//! - `assets`: check the configuration asset manifest

use clap::{Parser, Subcommand};
use uuid::Uuid;

pub mod ask;
pub mod assets;
pub mod trace;

/// Opspilot operational query CLI
#[derive(Parser, Debug)]
#[command(name = "opspilot")]
#[command(about = "Answer operational questions with bounded replanning")]
#[command(version)]
pub struct Cli {
    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ask a question
    Ask(AskArgs),
    /// Inspect recorded traces
    #[command(subcommand)]
    Trace(TraceCommands),
    /// Inspect configuration assets
    #[command(subcommand)]
    Assets(AssetsCommands),
}

#[derive(clap::Args, Debug)]
pub struct AskArgs {
    /// Question text
    pub question: String,
    /// Tenant the question belongs to
    #[arg(long, default_value = "default")]
    pub tenant: String,
    /// User asking the question
    #[arg(long)]
    pub user: Option<String>,
    /// Use asset version overrides (key=version)
    #[arg(long = "override", value_parser = parse_override)]
    pub overrides: Vec<(String, String)>,
    /// Mark the run as a test run
    #[arg(long)]
    pub test_mode: bool,
    /// Compare the run against a recorded trace
    #[arg(long)]
    pub baseline: Option<Uuid>,
    /// Print the full result as JSON
    #[arg(long)]
    pub json: bool,
    /// Print route cache counters
    #[arg(long)]
    pub stats: bool,
}

#[derive(Subcommand, Debug)]
pub enum TraceCommands {
    /// Show one trace
    Show {
        id: Uuid,
        /// Print the stored payload as JSON
        #[arg(long)]
        json: bool,
    },
    /// Compare two traces stage by stage
    Diff { left: Uuid, right: Uuid },
    /// List recent traces
    List {
        #[arg(long)]
        tenant: Option<String>,
        /// Filter by outcome (success, guidance, action_requested, ...)
        #[arg(long)]
        outcome: Option<String>,
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
    /// Delete traces older than the given number of days
    Prune {
        #[arg(long, default_value_t = 30)]
        older_than_days: i64,
    },
}

#[derive(Subcommand, Debug)]
pub enum AssetsCommands {
    /// Check that every asset key has a published version
    Check,
}

fn parse_override(raw: &str) -> Result<(String, String), String> {
    let (key, version) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=version, got '{raw}'"))?;
    let key = key.trim();
    key.parse::<opspilot_core::AssetKey>()?;
    Ok((key.to_string(), version.trim().to_string()))
}

/// Run the CLI command
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = crate::app::load_config()?;
    match cli.command {
        Some(Commands::Ask(args)) => ask::run(&config, args).await,
        Some(Commands::Trace(cmd)) => trace::run(&config, cmd).await,
        Some(Commands::Assets(AssetsCommands::Check)) => assets::check(&config).await,
        None => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            cmd.print_help()?;
            println!();
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_override() {
        assert_eq!(
            parse_override("result_shaping = rs-strict").unwrap(),
            ("result_shaping".to_string(), "rs-strict".to_string())
        );
        assert!(parse_override("result_shaping").is_err());
        assert!(parse_override("colour=blue").is_err());
    }

    #[test]
    fn test_cli_parses_ask() {
        let cli = Cli::parse_from([
            "opspilot",
            "ask",
            "cpu on web-1",
            "--tenant",
            "acme",
            "--override",
            "result_shaping=rs-strict",
            "--stats",
        ]);
        let Some(Commands::Ask(args)) = cli.command else {
            panic!("expected ask");
        };
        assert_eq!(args.tenant, "acme");
        assert_eq!(args.overrides.len(), 1);
        assert!(args.stats);
        assert!(!args.json);
    }

    #[test]
    fn test_cli_parses_trace_prune() {
        let cli = Cli::parse_from(["opspilot", "trace", "prune", "--older-than-days", "7"]);
        let Some(Commands::Trace(TraceCommands::Prune { older_than_days })) = cli.command else {
            panic!("expected trace prune");
        };
        assert_eq!(older_than_days, 7);
    }
}
