//! Courier relay daemon.
//!
//! Loads a TOML config (optional), applies command-line overrides, installs
//! logging, and serves until killed.

use std::path::PathBuf;

use clap::Parser;
use courier::prelude::*;
use tracing_subscriber::EnvFilter;

/// Store-and-forward relay for end-to-end encrypted messages.
#[derive(Parser, Debug)]
#[command(name = "courier-relay", version, about, long_about = None)]
struct Args {
    /// Path to a TOML config file. Defaults are used when omitted.
    #[arg(short, long, env = "COURIER_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind, overriding the config file.
    #[arg(short, long)]
    bind: Option<String>,

    /// Proof-of-work difficulty (leading hex zeros), overriding the config file.
    #[arg(short, long)]
    difficulty: Option<u8>,
}

impl Args {
    fn into_config(self) -> Result<RelayConfig, CourierError> {
        let mut config = match &self.config {
            Some(path) => RelayConfig::load(path)?,
            None => RelayConfig::default(),
        };
        if let Some(bind) = self.bind {
            config.bind = bind;
        }
        if let Some(difficulty) = self.difficulty {
            config.difficulty = difficulty;
        }
        Ok(config)
    }
}

/// `RUST_LOG` wins over the configured filter.
fn init_logging(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Args::parse().into_config()?;
    init_logging(&config.log_filter);

    tracing::info!(bind = %config.bind, "starting courier relay");

    let server = RelayServer::builder().config(config).build().await?;
    server.run().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_without_flags_use_defaults() {
        let args = Args::parse_from(["courier-relay"]);
        assert_eq!(args.into_config().unwrap(), RelayConfig::default());
    }

    #[test]
    fn test_args_overrides_apply() {
        let args = Args::parse_from([
            "courier-relay",
            "--bind",
            "0.0.0.0:7000",
            "--difficulty",
            "3",
        ]);
        let config = args.into_config().unwrap();
        assert_eq!(config.bind, "0.0.0.0:7000");
        assert_eq!(config.difficulty, 3);
    }

    #[test]
    fn test_args_missing_config_file_is_error() {
        let args = Args::parse_from(["courier-relay", "--config", "/nonexistent/relay.toml"]);
        assert!(matches!(args.into_config(), Err(CourierError::Config(_))));
    }
}
