// ABOUTME: Validated, immutable configuration built from the command line.
// ABOUTME: Rejects a missing username or key path before any I/O happens.

use crate::cli::Cli;
use crate::error::{Error, Result};
use crate::ssh::{ConnectConfig, HostKeyPolicy};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: &str = "22";

/// Everything needed to open one interactive shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub user: String,
    pub host: String,
    /// Kept as given; only parsed when the connection is attempted.
    pub port: String,
    pub key_path: PathBuf,
    pub host_key_policy: HostKeyPolicy,
    pub known_hosts_path: Option<PathBuf>,
    pub connect_timeout: Duration,
    /// `None` turns keepalives off.
    pub keepalive_interval: Option<Duration>,
}

impl Config {
    /// Build a configuration from parsed flags.
    pub fn from_cli(cli: Cli) -> Result<Self> {
        if cli.user.is_empty() {
            return Err(Error::MissingUsername);
        }
        if cli.pkey.is_empty() {
            return Err(Error::MissingPrivateKey);
        }

        Ok(Self {
            user: cli.user,
            host: cli.ip,
            port: cli.port,
            key_path: PathBuf::from(cli.pkey),
            host_key_policy: cli.host_key_policy,
            known_hosts_path: cli.known_hosts,
            connect_timeout: Duration::from_secs(cli.connect_timeout),
            keepalive_interval: (cli.keepalive > 0).then(|| Duration::from_secs(cli.keepalive)),
        })
    }

    /// The `host:port` address, bracketing IPv6 literals.
    pub fn address(&self) -> String {
        join_host_port(&self.host, &self.port)
    }

    /// Connection parameters for the SSH transport.
    pub fn connect_config(&self) -> ConnectConfig {
        let config = ConnectConfig::new(&self.host, &self.user)
            .port(&self.port)
            .host_key_policy(self.host_key_policy)
            .connect_timeout(self.connect_timeout)
            .keepalive_interval(self.keepalive_interval);

        match &self.known_hosts_path {
            Some(path) => config.known_hosts_path(path),
            None => config,
        }
    }
}

pub fn join_host_port(host: &str, port: &str) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}
