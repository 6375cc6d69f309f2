//! Command handlers.

use crate::config::{CliConfig, OutputFormat};
use anyhow::Result;
use chrono::{DateTime, Utc};
use console::style;
use keyward_core::{Error, KeyHash, SecretKey, SecretResult, SecretSource, SecretString};
use keyward_secrets::{ResolverConfig, shared};
use serde::Serialize;
use std::process::ExitCode;
use std::time::Duration;

#[derive(Debug, Serialize)]
struct SecretView {
    key_hash: KeyHash,
    source: Option<SecretSource>,
    value: String,
    fetched_at: Option<DateTime<Utc>>,
    ttl_secs: Option<u64>,
}

impl SecretView {
    fn from_result(result: &SecretResult, reveal: bool) -> Self {
        Self {
            key_hash: result.key.hash(),
            source: Some(result.source),
            value: render(&result.value, reveal),
            fetched_at: Some(result.fetched_at),
            ttl_secs: result.ttl.map(|t| t.as_secs()),
        }
    }
}

#[derive(Debug, Serialize)]
struct CheckRow {
    key_hash: KeyHash,
    /// Source name, or `MISSING`.
    status: String,
}

#[derive(Debug, Serialize)]
struct ConfigView {
    encryption_seed: &'static str,
    default_ttl_secs: Option<u64>,
    provider_timeout_ms: u64,
    env_provider: bool,
    platform_provider: bool,
    vault_provider: bool,
    env_prefix: Option<String>,
    platform_bindings_file: Option<String>,
    sweep_interval_secs: Option<u64>,
    output_format: OutputFormat,
    reveal: bool,
}

fn render(value: &SecretString, reveal: bool) -> String {
    if reveal {
        value.expose_secret().to_string()
    } else {
        value.to_string()
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Resolve one key.
pub async fn get(
    config: &CliConfig,
    key: &str,
    ttl_ms: Option<u64>,
    fallback: Option<String>,
    reveal: bool,
) -> Result<ExitCode> {
    let resolver = shared::global().await?;
    let key = SecretKey::new(key);
    let reveal = reveal || config.reveal;

    if let Some(fallback) = fallback {
        let value = resolver.get_secret_with_fallback(&key, fallback).await;
        match config.output_format {
            OutputFormat::Json => print_json(&SecretView {
                key_hash: key.hash(),
                source: None,
                value: render(&value, reveal),
                fetched_at: None,
                ttl_secs: None,
            })?,
            OutputFormat::Table => println!("{}", render(&value, reveal)),
        }
        return Ok(ExitCode::SUCCESS);
    }

    match resolver.get_secret(&key, ttl_ms.map(Duration::from_millis)).await {
        Ok(result) => {
            let view = SecretView::from_result(&result, reveal);
            match config.output_format {
                OutputFormat::Json => print_json(&view)?,
                OutputFormat::Table => {
                    println!("{} {}", style("✓").green(), style(&view.key_hash).bold());
                    println!("  Source:  {}", result.source);
                    println!("  Fetched: {}", result.fetched_at.to_rfc3339());
                    if let Some(ttl) = view.ttl_secs {
                        println!("  TTL:     {}s", ttl);
                    }
                    println!("  Value:   {}", view.value);
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(Error::SecretNotFound(_)) => {
            eprintln!("{} {} not found", style("✗").red(), style(key.hash()).bold());
            Ok(ExitCode::FAILURE)
        }
        Err(e) => Err(e.into()),
    }
}

/// Resolve several keys and report which are missing.
pub async fn check(config: &CliConfig, keys: &[String]) -> Result<ExitCode> {
    let resolver = shared::global().await?;
    let mut rows = Vec::with_capacity(keys.len());

    for key in keys {
        let key = SecretKey::new(key.as_str());
        let status = match resolver.get_secret(&key, None).await {
            Ok(result) => result.source.to_string(),
            Err(Error::SecretNotFound(_)) => "MISSING".to_string(),
            Err(e) => return Err(e.into()),
        };
        rows.push(CheckRow {
            key_hash: key.hash(),
            status,
        });
    }

    let missing = rows.iter().filter(|r| r.status == "MISSING").count();

    match config.output_format {
        OutputFormat::Json => print_json(&rows)?,
        OutputFormat::Table => {
            println!("{:<10} STATUS", "KEY");
            for row in &rows {
                let status = if row.status == "MISSING" {
                    style(row.status.as_str()).red()
                } else {
                    style(row.status.as_str()).green()
                };
                println!("{:<10} {}", row.key_hash, status);
            }
            if missing > 0 {
                println!("\n{} {} of {} keys missing", style("✗").red(), missing, rows.len());
            }
        }
    }

    Ok(if missing > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

/// Print the log/metrics hash of a key.
pub fn hash(key: &str) {
    println!("{}", SecretKey::new(key).hash());
}

/// Print the effective resolver and CLI configuration.
pub fn show_config(config: &CliConfig) -> Result<()> {
    let resolver = ResolverConfig::from_env()?;
    let view = ConfigView {
        encryption_seed: if resolver.encryption_seed.is_some() {
            "[REDACTED]"
        } else {
            "[NOT SET]"
        },
        default_ttl_secs: resolver.default_ttl.map(|t| t.as_secs()),
        provider_timeout_ms: resolver.provider_timeout.as_millis() as u64,
        env_provider: resolver.providers.env,
        platform_provider: resolver.providers.platform,
        vault_provider: resolver.providers.vault,
        env_prefix: resolver.env_prefix,
        platform_bindings_file: resolver
            .platform_bindings_file
            .map(|p| p.display().to_string()),
        sweep_interval_secs: resolver.sweep_interval.map(|t| t.as_secs()),
        output_format: config.output_format,
        reveal: config.reveal,
    };

    match config.output_format {
        OutputFormat::Json => print_json(&view)?,
        OutputFormat::Table => {
            println!("{}", style("Resolver").bold());
            println!("  encryption_seed:        {}", view.encryption_seed);
            println!("  default_ttl_secs:       {}", display_opt(view.default_ttl_secs));
            println!("  provider_timeout_ms:    {}", view.provider_timeout_ms);
            println!(
                "  providers:              env={} platform={} vault={}",
                view.env_provider, view.platform_provider, view.vault_provider
            );
            println!("  env_prefix:             {}", display_opt(view.env_prefix.as_ref()));
            println!(
                "  platform_bindings_file: {}",
                display_opt(view.platform_bindings_file.as_ref())
            );
            println!("  sweep_interval_secs:    {}", display_opt(view.sweep_interval_secs));
            println!("{}", style("CLI").bold());
            println!("  output_format:          {:?}", view.output_format);
            println!("  reveal:                 {}", view.reveal);
        }
    }
    Ok(())
}

/// Update one CLI preference and persist it.
pub fn set_config(key: &str, value: &str) -> Result<()> {
    let mut config = CliConfig::load()?;
    config.set(key, value)?;
    config.save()?;
    println!("{} Set {} = {}", style("✓").green(), key, value);
    Ok(())
}

fn display_opt<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}
