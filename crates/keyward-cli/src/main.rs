//! Keyward CLI entrypoint.

use clap::Parser;
use keyward_trace::{TracingConfig, init_tracing};
use std::process::ExitCode;

mod commands;
mod config;
mod handlers;

use commands::{Commands, ConfigCommands};
use config::CliConfig;

#[derive(Parser)]
#[command(name = "keyward")]
#[command(author, version, about = "Resolve secrets through the Keyward provider chain", long_about = None)]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let tracing_config = if cli.log_json {
        TracingConfig::json()
    } else {
        TracingConfig::default()
    };
    init_tracing(&tracing_config.with_filter("warn"))?;

    let config = CliConfig::load().unwrap_or_default();

    let code = match cli.command {
        Commands::Get {
            key,
            ttl_ms,
            fallback,
            reveal,
        } => handlers::get(&config, &key, ttl_ms, fallback, reveal).await?,
        Commands::Check { keys } => handlers::check(&config, &keys).await?,
        Commands::Hash { key } => {
            handlers::hash(&key);
            ExitCode::SUCCESS
        }
        Commands::Config { command } => {
            match command.unwrap_or(ConfigCommands::Show) {
                ConfigCommands::Show => handlers::show_config(&config)?,
                ConfigCommands::Set { key, value } => handlers::set_config(&key, &value)?,
            }
            ExitCode::SUCCESS
        }
    };

    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_get_with_options() {
        let cli = Cli::try_parse_from([
            "keyward", "get", "DB_PASSWORD", "--ttl-ms", "1500", "--reveal",
        ])
        .unwrap();
        match cli.command {
            Commands::Get {
                key,
                ttl_ms,
                fallback,
                reveal,
            } => {
                assert_eq!(key, "DB_PASSWORD");
                assert_eq!(ttl_ms, Some(1500));
                assert_eq!(fallback, None);
                assert!(reveal);
            }
            _ => panic!("expected get"),
        }

        let cli = Cli::try_parse_from(["keyward", "get", "DB_PASSWORD", "--fallback", "dev"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Get { fallback: Some(ref f), ttl_ms: None, .. } if f == "dev"
        ));
    }

    #[test]
    fn test_parse_rejects_ttl_with_fallback() {
        let err = Cli::try_parse_from([
            "keyward", "get", "K", "--ttl-ms", "1500", "--fallback", "dev",
        ])
        .err()
        .unwrap();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_parse_rejects_zero_ttl() {
        assert!(Cli::try_parse_from(["keyward", "get", "K", "--ttl-ms", "0"]).is_err());
    }

    #[test]
    fn test_check_requires_keys() {
        assert!(Cli::try_parse_from(["keyward", "check"]).is_err());

        let cli = Cli::try_parse_from(["keyward", "check", "A", "B", "--log-json"]).unwrap();
        assert!(cli.log_json);
        assert!(matches!(cli.command, Commands::Check { keys } if keys == ["A", "B"]));
    }

    #[test]
    fn test_config_defaults_to_show() {
        let cli = Cli::try_parse_from(["keyward", "config"]).unwrap();
        assert!(matches!(cli.command, Commands::Config { command: None }));

        let cli = Cli::try_parse_from(["keyward", "config", "set", "reveal", "true"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config {
                command: Some(ConfigCommands::Set { .. })
            }
        ));
    }
}
