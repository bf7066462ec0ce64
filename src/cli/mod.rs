//! CLI definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

pub mod commands;

/// session-sync - keep agent session logs in sync between a server and this machine
#[derive(Parser, Debug)]
#[command(name = "ssync", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: ./config.json, then ~/.session-sync/config.json)
    #[arg(long, global = true, env = "SSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output as JSON (for scripts and schedulers)
    #[arg(long, global = true)]
    pub json: bool,

    /// Show what would be synced without moving any files
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Transfer timeout in seconds (overrides transfer.timeout_secs; 0 = none)
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List configured projects
    List,

    /// List project directories on the server or locally
    Scan {
        #[arg(value_enum)]
        target: ScanTarget,
    },

    /// Interactive setup wizard
    Setup {
        /// Start over instead of extending an existing config
        #[arg(long)]
        force: bool,
    },

    /// Copy a project's sessions from the server to this machine
    Pull {
        /// Project name
        name: String,
    },

    /// Copy a project's sessions from this machine to the server
    Push {
        /// Project name
        name: String,

        /// Skip the confirmation prompt (bidirectional projects only)
        #[arg(short, long)]
        yes: bool,
    },

    /// Pull every enabled project that allows pulling
    SyncAll,

    /// Check that a sample file survives a rewrite round trip
    Verify {
        /// Session file to check
        file: PathBuf,

        /// Which machine the file's paths come from
        #[arg(long, value_enum, default_value_t = Side::Server)]
        from: Side,
    },

    /// Show the last sync result per project
    Status,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Print version information
    Version,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanTarget {
    Server,
    Local,
}

/// Which machine a piece of content was written on.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Server,
    #[value(alias = "mac")]
    Local,
}

/// Supported shells for completions.
#[derive(ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_push_flags() {
        let cli = Cli::parse_from(["ssync", "--dry-run", "push", "app", "--yes"]);
        assert!(cli.dry_run);
        match cli.command {
            Commands::Push { name, yes } => {
                assert_eq!(name, "app");
                assert!(yes);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_verify_defaults_to_server() {
        let cli = Cli::parse_from(["ssync", "verify", "a.jsonl"]);
        assert!(matches!(cli.command, Commands::Verify { from: Side::Server, .. }));
    }
}
