//! Command-line arguments and configuration loading.

use anyhow::{bail, Context};
use askdb_core::AskdbConfig;
use clap::Parser;
use std::path::{Path, PathBuf};

/// Configuration file used when none is given.
pub const DEFAULT_CONFIG_PATH: &str = "askdb.toml";

#[derive(Debug, Clone, Parser)]
#[command(name = "askdb-server", version, about = "Ask questions about your database over WebSocket")]
pub struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, env = "ASKDB_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Override `server.bind`, e.g. 127.0.0.1:9000.
    #[arg(long, env = "ASKDB_BIND")]
    pub bind: Option<String>,
}

/// Load, patch and validate the configuration.
///
/// A missing file is only tolerated for the default path, in which case
/// every setting takes its default.
pub fn load_config(args: &Args) -> anyhow::Result<AskdbConfig> {
    let mut config = if args.config.exists() {
        AskdbConfig::from_file(&args.config)
            .with_context(|| format!("failed to load {}", args.config.display()))?
    } else if args.config == Path::new(DEFAULT_CONFIG_PATH) {
        AskdbConfig::default()
    } else {
        bail!("config file not found: {}", args.config.display());
    };

    config.apply_env_overrides();
    if let Some(bind) = &args.bind {
        config.server.bind = bind.clone();
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}
