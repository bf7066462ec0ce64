//! session-sync CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use ssync::cli::commands;
use ssync::cli::{Cli, Commands};
use ssync::error::Error;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    init_tracing(cli.verbose, cli.quiet);

    // Resolve effective JSON mode: --json OR non-TTY stdout
    let json = cli.json || !std::io::IsTerminal::is_terminal(&std::io::stdout());

    match run(&cli, json) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if json {
                eprintln!("{}", e.to_structured_json());
            } else if !cli.quiet {
                if let Some(hint) = e.hint() {
                    eprintln!("Error: {e}\n  Hint: {hint}");
                } else {
                    eprintln!("Error: {e}");
                }
            }
            ExitCode::from(e.exit_code())
        }
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    if quiet {
        return;
    }

    // Honor RUST_LOG if set, otherwise use verbosity flag
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("info"),
            2 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn run(cli: &Cli, json: bool) -> Result<(), Error> {
    let config = cli.config.as_ref();

    match &cli.command {
        Commands::List => commands::list::execute(config, json),
        Commands::Scan { target } => commands::scan::execute(*target, config, cli.timeout, json),
        Commands::Setup { force } => commands::setup::execute(config, *force, cli.timeout),

        // Sync
        Commands::Pull { name } => {
            commands::pull::execute(name, config, cli.dry_run, cli.timeout, json)
        }
        Commands::Push { name, yes } => {
            commands::push::execute(name, *yes, config, cli.dry_run, cli.timeout, json)
        }
        Commands::SyncAll => commands::sync_all::execute(config, cli.dry_run, cli.timeout, json),

        Commands::Verify { file, from } => commands::verify::execute(file, *from, config, json),
        Commands::Status => commands::status::execute(config, json),

        Commands::Completions { shell } => commands::completions::execute(shell),
        Commands::Version => commands::version::execute(json),
    }
}
