//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `geoip_refresh` library that handles:
//! - Command-line argument parsing
//! - Environment variable loading (.env file)
//! - Logger initialization
//! - User-facing output formatting
//!
//! All core functionality is implemented in the library crate.

use anyhow::{Context, Result};
use chrono::DateTime;
use clap::Parser;
use serde_json::json;
use std::process;

use geoip_refresh::config::{Command, LookupKind, Opt};
use geoip_refresh::initialization::init_logger_with;
use geoip_refresh::{Clock, GeoReader, IpInput, SystemClock};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file (if it exists)
    // This allows setting MAXMIND_LICENSE_KEY or AWS credentials in .env
    // Try loading from current directory first, then from the executable's directory
    if dotenvy::dotenv().is_err() {
        if let Ok(exe_path) = std::env::current_exe() {
            if let Some(exe_dir) = exe_path.parent() {
                let env_path = exe_dir.join(".env");
                if env_path.exists() {
                    let _ = dotenvy::from_path(&env_path);
                }
            }
        }
    }

    let opt = Opt::parse();

    init_logger_with(opt.log_level.clone().into(), opt.log_format.clone())
        .context("Failed to initialize logger")?;

    match run(opt).await {
        Ok(all_ok) => {
            if !all_ok {
                process::exit(1);
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("geoip_refresh error: {:#}", e);
            process::exit(1);
        }
    }
}

/// Runs the selected command. Returns false if any lookup failed.
async fn run(opt: Opt) -> Result<bool> {
    let config = opt.reader_config()?;
    let started_at = SystemClock.now_epoch_seconds();
    let reader = GeoReader::open(config)
        .await
        .context("Failed to open GeoIP reader")?;

    match opt.command {
        Command::Lookup { kind, ips } => {
            let mut all_ok = true;
            for ip in &ips {
                let line = match lookup(&reader, kind, ip).await {
                    Ok(record) => json!({ "ip": ip, "record": record }),
                    Err(e) => {
                        all_ok = false;
                        json!({ "ip": ip, "error": e.to_string() })
                    }
                };
                println!("{}", line);
            }
            Ok(all_ok)
        }
        Command::Refresh => {
            // Opening a cold or stale cache already fetched a new snapshot
            if reader.last_refresh() < started_at {
                reader.refresh_now().await?;
            }
            let snapshot = reader
                .current_snapshot()?
                .map(|handle| handle.path().display().to_string());
            println!(
                "Refreshed from {} into {}",
                reader.source_description(),
                snapshot.as_deref().unwrap_or("(no snapshot)")
            );
            Ok(true)
        }
        Command::Status => {
            let metadata = reader.metadata().await?;
            let snapshot = reader.current_snapshot()?;
            let status = json!({
                "cache_dir": reader.cache_dir().display().to_string(),
                "source": reader.source_description(),
                "snapshot": snapshot.map(|handle| handle.file_name().to_string()),
                "last_refresh": format_epoch(reader.last_refresh()),
                "next_refresh_due": format_epoch(reader.next_refresh_due()),
                "database": metadata,
            });
            println!("{}", serde_json::to_string_pretty(&status)?);
            Ok(true)
        }
    }
}

async fn lookup(
    reader: &GeoReader,
    kind: LookupKind,
    ip: &str,
) -> Result<serde_json::Value, geoip_refresh::GeoError> {
    // Bare digits are the integer form of an address
    let input = match ip.parse::<u128>() {
        Ok(value) => IpInput::from(value),
        Err(_) => IpInput::from(ip),
    };
    let value = match kind {
        LookupKind::City => serde_json::to_value(reader.city(input).await?),
        LookupKind::Country => serde_json::to_value(reader.country(input).await?),
        LookupKind::Asn => serde_json::to_value(reader.asn(input).await?),
    };
    Ok(value.unwrap_or(serde_json::Value::Null))
}

fn format_epoch(seconds: u64) -> String {
    i64::try_from(seconds)
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| seconds.to_string())
}
