// Copyright (c) 2025 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

use clap::Parser;
use std::path::{Path, PathBuf};
use tokio::runtime::Runtime;

use super::ServerContext;
use crate::config::Config;
use crate::error::{Error, ErrorKind};
use crate::log::init_log;

pub const DEFAULT_CONFIG: &str = "/etc/nimbus/nimbus.toml";

/// High performance MQTT 5 server.
#[derive(Debug, Parser)]
#[command(name = "nimbus", version, about)]
struct Options {
    /// Specify config file path.
    #[arg(short, long, value_name = "config_file")]
    config: Option<PathBuf>,

    /// Test config file and exit.
    #[arg(short = 't', long)]
    test: bool,
}

fn load_config(path: &Path) -> Result<Config, Error> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content).map_err(|err| {
        Error::from_string(ErrorKind::ConfigError, format!("Invalid config: {err}"))
    })?;
    config.validate()?;
    Ok(config)
}

/// Entry point of the server.
///
/// # Errors
///
/// Returns error if the config file is invalid or the runtime fails to
/// start.
pub fn run_server() -> Result<(), Error> {
    let options = Options::parse();

    let config_file = options.config.or_else(|| {
        let default = Path::new(DEFAULT_CONFIG);
        default.exists().then(|| default.to_path_buf())
    });

    let config = if let Some(config_file) = config_file {
        let config = load_config(&config_file)?;
        if options.test {
            println!("The configuration file {} syntax is Ok", config_file.display());
            return Ok(());
        }
        config
    } else {
        toml::from_str("").map_err(|err| {
            Error::from_string(ErrorKind::ConfigError, format!("Invalid defaults: {err}"))
        })?
    };

    init_log(config.log())?;

    let runtime = Runtime::new()?;
    let mut server = ServerContext::new(config);
    runtime.block_on(async move { run_loop(&mut server).await })
}

/// Run the server until ctrl-c.
async fn run_loop(server: &mut ServerContext) -> Result<(), Error> {
    let handles = server.init_modules().await?;

    tokio::signal::ctrl_c().await?;
    log::info!("Shutting down");
    for handle in handles {
        handle.abort();
    }
    Ok(())
}

/// Run the server with a fixed config on the current runtime.
///
/// Useful for integration tests.
///
/// # Errors
///
/// Returns error if a listener address cannot be bound.
pub async fn run_with_config(config: Config) -> Result<Vec<tokio::task::JoinHandle<()>>, Error> {
    config.validate()?;
    let mut server = ServerContext::new(config);
    server.init_modules().await
}
