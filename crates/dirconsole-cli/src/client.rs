use anyhow::{Context, Result};
use clap::Args;
use dirconsole_client::{ConsoleSession, Transport};
use dirconsole_common::ConsoleConfig;
use std::path::{Path, PathBuf};
use tokio::net::TcpStream;

/// Where and how to reach the director console
#[derive(Debug, Args)]
pub struct ConnectionArgs {
    /// Config file (default: ~/.dirconsole/config.json)
    #[clap(long, global = true, value_name = "PATH")]
    pub config: Option<String>,

    /// Director console address, overrides the config file
    #[clap(long, global = true, value_name = "HOST:PORT")]
    pub address: Option<String>,

    /// Unix socket of a console endpoint, takes precedence over the address
    #[clap(long, global = true, value_name = "PATH")]
    pub socket: Option<String>,

    /// Round-trip timeout per command in seconds
    #[clap(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,
}

impl ConnectionArgs {
    /// Load the config file and apply command line overrides
    pub fn resolve(&self) -> Result<ConsoleConfig> {
        let path = match &self.config {
            Some(raw) => Some(expand_path(raw)?),
            None => ConsoleConfig::default_path(),
        };

        let mut config = match path {
            Some(path) => ConsoleConfig::load(&path)?,
            None => ConsoleConfig::default(),
        };

        if let Some(address) = &self.address {
            config.address = address.clone();
        }
        if let Some(socket) = &self.socket {
            config.socket_path = Some(expand_path(socket)?);
        }
        if let Some(timeout) = self.timeout {
            config.timeout_secs = timeout;
        }

        Ok(config)
    }
}

/// Expand `~` and environment variables in a user supplied path
pub fn expand_path(raw: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(raw).with_context(|| format!("Failed to expand path {}", raw))?;
    Ok(PathBuf::from(expanded.as_ref()))
}

/// Open the transport named by `config` and bind a session to it
pub async fn connect(config: &ConsoleConfig) -> Result<ConsoleSession<Box<dyn Transport>>> {
    let transport: Box<dyn Transport> = match &config.socket_path {
        Some(path) => connect_unix(path).await?,
        None => {
            let stream = TcpStream::connect(&config.address)
                .await
                .with_context(|| format!("Failed to connect to director at {}", config.address))?;
            Box::new(stream)
        }
    };

    tracing::debug!("Connected, timeout {:?}", config.timeout());
    Ok(ConsoleSession::new(transport).with_timeout(config.timeout()))
}

#[cfg(unix)]
async fn connect_unix(path: &Path) -> Result<Box<dyn Transport>> {
    let stream = tokio::net::UnixStream::connect(path)
        .await
        .with_context(|| format!("Failed to connect to console socket {:?}", path))?;
    Ok(Box::new(stream))
}

#[cfg(not(unix))]
async fn connect_unix(path: &Path) -> Result<Box<dyn Transport>> {
    anyhow::bail!("Unix sockets are not supported on this platform: {:?}", path)
}
