// ABOUTME: SSH connection management using russh.
// ABOUTME: Handles TCP connect, host key verification, and public-key authentication.

use super::error::{Error, Result};
use super::host_key::{HostKeyPolicy, verify_host_key};
use super::key::SigningKey;
use crate::config::join_host_port;
use parking_lot::Mutex;
use russh::Disconnect;
use russh::client::{self, Config, Handle};
use russh::keys::{PrivateKeyWithHashAlg, ssh_key};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;

/// Configuration for establishing an SSH connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectConfig {
    /// Remote host to connect to.
    pub host: String,
    /// SSH port as given by the user; parsed when connecting.
    pub port: String,
    /// Username for authentication.
    pub user: String,
    /// How the server's host key is verified.
    pub host_key_policy: HostKeyPolicy,
    /// Optional path to known_hosts file.
    /// If None, uses the default ~/.ssh/known_hosts.
    pub known_hosts_path: Option<PathBuf>,
    /// Limit for TCP connect plus handshake and authentication (default: 10 seconds).
    pub connect_timeout: Duration,
    /// Interval between keepalive requests on an idle session.
    pub keepalive_interval: Option<Duration>,
}

impl ConnectConfig {
    pub fn new(host: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: "22".to_string(),
            user: user.into(),
            host_key_policy: HostKeyPolicy::default(),
            known_hosts_path: None,
            connect_timeout: Duration::from_secs(10),
            keepalive_interval: Some(Duration::from_secs(30)),
        }
    }

    pub fn port(mut self, port: impl Into<String>) -> Self {
        self.port = port.into();
        self
    }

    pub fn host_key_policy(mut self, policy: HostKeyPolicy) -> Self {
        self.host_key_policy = policy;
        self
    }

    pub fn known_hosts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.known_hosts_path = Some(path.into());
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn keepalive_interval(mut self, interval: Option<Duration>) -> Self {
        self.keepalive_interval = interval;
        self
    }

    /// The `host:port` address used for the TCP connection.
    pub fn address(&self) -> String {
        join_host_port(&self.host, &self.port)
    }
}

/// SSH client handler for russh.
pub(crate) struct SshHandler {
    host: String,
    port: u16,
    policy: HostKeyPolicy,
    known_hosts_path: Option<PathBuf>,
    /// Detailed host key rejection, surfaced instead of russh's generic UnknownKey.
    host_key_error: Arc<Mutex<Option<Error>>>,
}

impl client::Handler for SshHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &ssh_key::PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        match verify_host_key(
            self.policy,
            &self.host,
            self.port,
            server_public_key,
            self.known_hosts_path.as_deref(),
        ) {
            Ok(()) => Ok(true),
            Err(e) => {
                *self.host_key_error.lock() = Some(e);
                Ok(false)
            }
        }
    }
}

/// An established, authenticated SSH connection.
pub struct Connection {
    config: ConnectConfig,
    handle: Handle<SshHandler>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("config", &self.config)
            .field("handle", &"<russh::Handle>")
            .finish()
    }
}

impl Connection {
    /// Connect to the remote host and authenticate with `key`.
    ///
    /// The key is consumed and dropped once authentication completes.
    pub async fn connect(config: ConnectConfig, key: SigningKey) -> Result<Self> {
        let addr = config.address();
        let timeout = config.connect_timeout;

        match tokio::time::timeout(timeout, Self::establish(&config, key)).await {
            Ok(Ok(handle)) => {
                tracing::info!(addr = %addr, user = %config.user, "Authenticated");
                Ok(Self { config, handle })
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(Error::ConnectTimeout { addr, timeout }),
        }
    }

    async fn establish(config: &ConnectConfig, key: SigningKey) -> Result<Handle<SshHandler>> {
        let addr = config.address();
        let port: u16 = config.port.parse().map_err(|_| Error::Connection {
            addr: addr.clone(),
            reason: format!("invalid port {:?}", config.port),
        })?;

        tracing::debug!(addr = %addr, "Opening TCP connection");
        let stream = TcpStream::connect(addr.as_str())
            .await
            .map_err(|e| Error::Connection {
                addr: addr.clone(),
                reason: e.to_string(),
            })?;

        let russh_config = Config {
            keepalive_interval: config.keepalive_interval,
            ..Default::default()
        };

        let host_key_error = Arc::new(Mutex::new(None));
        let handler = SshHandler {
            host: config.host.clone(),
            port,
            policy: config.host_key_policy,
            known_hosts_path: config.known_hosts_path.clone(),
            host_key_error: Arc::clone(&host_key_error),
        };

        let mut handle = client::connect_stream(Arc::new(russh_config), stream, handler)
            .await
            .map_err(|source| {
                host_key_error
                    .lock()
                    .take()
                    .unwrap_or_else(|| Error::Handshake {
                        addr: addr.clone(),
                        source,
                    })
            })?;

        Self::authenticate(&mut handle, &config.user, key).await?;
        Ok(handle)
    }

    /// Offer the single public key; no other method is attempted.
    async fn authenticate(
        handle: &mut Handle<SshHandler>,
        user: &str,
        key: SigningKey,
    ) -> Result<()> {
        tracing::debug!(user = %user, key = %key.path().display(), "Authenticating with public key");

        let hash_alg = handle
            .best_supported_rsa_hash()
            .await
            .map_err(Error::Protocol)?
            .flatten();

        let result = handle
            .authenticate_publickey(user, PrivateKeyWithHashAlg::new(key.into_inner(), hash_alg))
            .await
            .map_err(Error::Protocol)?;

        if !result.success() {
            return Err(Error::AuthenticationFailed {
                user: user.to_string(),
            });
        }
        Ok(())
    }

    pub(crate) fn handle(&self) -> &Handle<SshHandler> {
        &self.handle
    }

    /// Disconnect the session.
    pub async fn disconnect(self) -> Result<()> {
        tracing::debug!(addr = %self.config.address(), "Disconnecting");
        self.handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await
            .map_err(Error::Protocol)?;
        Ok(())
    }
}
