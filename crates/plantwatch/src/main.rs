mod cli;
mod commands;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use plantwatch_core::Monitor;

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Offline commands don't need a broker connection
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),
        Command::Topics => commands::topics::handle(&cli.global),

        // Shell completions generation
        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "plantwatch", &mut std::io::stdout());
            Ok(())
        }

        // Watch and status require a live monitor
        cmd => {
            let monitor_config = build_monitor_config(&cli.global)?;
            let monitor = Monitor::new(monitor_config);

            tracing::debug!(command = ?cmd, "dispatching command");
            commands::dispatch(cmd, &monitor, &cli.global).await
        }
    }
}

/// Build a `MonitorConfig` from the config file and CLI overrides.
fn build_monitor_config(global: &cli::GlobalOpts) -> Result<plantwatch_core::MonitorConfig, CliError> {
    let cfg = plantwatch_config::load_config_or_default();
    let monitor_config = plantwatch_config::to_monitor_config(&cfg, global.broker.as_deref())?;
    Ok(monitor_config)
}
