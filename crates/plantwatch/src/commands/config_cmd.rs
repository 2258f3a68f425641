//! Config subcommand handlers.

use plantwatch_config::{Config, config_path, load_config_or_default, save_config};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

/// Format the resolved config for display.
fn format_config(cfg: &Config) -> String {
    use std::fmt::Write;
    let mut out = String::new();

    let _ = writeln!(out, "broker = \"{}\"", cfg.broker);
    if let Some(ref id) = cfg.client_id {
        let _ = writeln!(out, "client_id = \"{id}\"");
    }
    let _ = writeln!(out, "keep_alive_secs = {}", cfg.keep_alive_secs);
    let _ = writeln!(out);
    let _ = writeln!(out, "[reconnect]");
    let _ = writeln!(out, "initial_delay_secs = {}", cfg.reconnect.initial_delay_secs);
    let _ = writeln!(out, "max_delay_secs = {}", cfg.reconnect.max_delay_secs);
    if let Some(retries) = cfg.reconnect.max_retries {
        let _ = writeln!(out, "max_retries = {retries}");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "[topics]");
    let _ = writeln!(out, "temperature = \"{}\"", cfg.topics.temperature);
    let _ = writeln!(out, "humidity = \"{}\"", cfg.topics.humidity);
    let _ = writeln!(out, "light = \"{}\"", cfg.topics.light);
    let _ = writeln!(out, "moisture = \"{}\"", cfg.topics.moisture);
    let _ = writeln!(out, "classification = \"{}\"", cfg.topics.classification);

    out.trim_end().to_owned()
}

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            output::print_output(&config_path().display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = load_config_or_default();
            let out = match global.output {
                OutputFormat::Json => output::render_json_pretty(&cfg),
                OutputFormat::JsonCompact => output::render_json_compact(&cfg),
                OutputFormat::Table | OutputFormat::Plain => format_config(&cfg),
            };
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Init { force } => {
            let path = config_path();
            if path.exists() && !force {
                return Err(CliError::ConfigExists {
                    path: path.display().to_string(),
                });
            }
            let written = save_config(&Config::default())?;
            output::print_output(
                &format!("Wrote default config to {}", written.display()),
                global.quiet,
            );
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formatted_config_lists_defaults() {
        let out = format_config(&Config::default());
        assert!(out.contains("broker = \"wss://test.mosquitto.org:8081\""));
        assert!(out.contains("[topics]"));
        assert!(out.contains("temperature = \"/ThinkIOT/temp\""));
        assert!(out.contains("initial_delay_secs = 1"));
        // Unbounded retries leave the key out entirely.
        assert!(!out.contains("max_retries"));
    }
}
