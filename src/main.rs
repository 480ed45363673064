use bug_trends::cli::commands;
use bug_trends::cli::{Cli, Commands};
use bug_trends::config;
use bug_trends::logging::init_logging;
use bug_trends::output::OutputContext;
use bug_trends::{StructuredError, TrendsError};
use clap::Parser;
use std::io::{self, IsTerminal};

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose, cli.quiet, cli.log_file.as_deref()) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let ctx = OutputContext::from_args(&cli);
    let overrides = build_cli_overrides(&cli);

    let result = config::load_config(&overrides).and_then(|config| match &cli.command {
        Commands::Ingest(args) => commands::ingest::execute(args, &config, &ctx),
        Commands::Issues(args) => commands::issues::execute(args, &config, &ctx),
        Commands::Snapshot(args) => commands::snapshot::execute(args, &config, &ctx),
        Commands::Release(args) => commands::release::execute(args, &config, &ctx),
        Commands::Releases(args) => commands::releases::execute(args, &config, &ctx),
        Commands::Rollups(args) => commands::rollups::execute(args, &config, &ctx),
        Commands::History(args) => commands::history::execute(args, &config, &ctx),
        Commands::Dates(args) => commands::dates::execute(args, &config, &ctx),
        Commands::Prune => commands::prune::execute(&config, &ctx),
        Commands::Config => commands::config::execute(&config, &ctx),
    });

    if let Err(e) = result {
        handle_error(&e, cli.json);
    }
}

/// Handle errors with structured output support.
///
/// When --json is set or stdout is not a TTY, outputs structured JSON to stderr.
/// Otherwise, outputs human-readable error with optional color.
fn handle_error(err: &TrendsError, json_mode: bool) -> ! {
    let structured = StructuredError::from_error(err);
    let exit_code = structured.code.exit_code();

    let use_json = json_mode || !io::stdout().is_terminal();

    if use_json {
        let json = structured.to_json();
        eprintln!(
            "{}",
            serde_json::to_string_pretty(&json).unwrap_or_else(|_| json.to_string())
        );
    } else {
        let use_color = io::stderr().is_terminal();
        eprintln!("{}", structured.to_human(use_color));
    }

    std::process::exit(exit_code);
}

fn build_cli_overrides(cli: &Cli) -> config::CliOverrides {
    config::CliOverrides {
        config: cli.config.clone(),
        db: cli.db.clone(),
        read_pool_size: cli.read_pool_size,
    }
}
