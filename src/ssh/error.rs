// ABOUTME: SSH-specific error types.
// ABOUTME: Covers key loading, connection, host key, authentication, and session failures.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read private key from {path}: {source}")]
    KeyRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse private key {path}: {reason}")]
    KeyParse { path: PathBuf, reason: String },

    #[error("failed to connect to {addr}: {reason}")]
    Connection { addr: String, reason: String },

    #[error("connecting to {addr} timed out after {timeout:?}")]
    ConnectTimeout {
        addr: String,
        timeout: std::time::Duration,
    },

    #[error("host key for {host}:{port} is not trusted (not found in known_hosts)")]
    HostKeyUnknown { host: String, port: u16 },

    #[error(
        "host key for {host}:{port} does not match known_hosts line {line}, possible man-in-the-middle attack"
    )]
    HostKeyChanged { host: String, port: u16, line: usize },

    #[error("known_hosts error: {0}")]
    KnownHosts(String),

    #[error("SSH handshake with {addr} failed: {source}")]
    Handshake {
        addr: String,
        #[source]
        source: russh::Error,
    },

    #[error("authentication rejected for user {user}")]
    AuthenticationFailed { user: String },

    #[error("cannot open session channel: {0}")]
    Channel(String),

    #[error("pseudo-terminal request failed: {0}")]
    TerminalRequest(String),

    #[error("shell request failed: {0}")]
    ShellStart(String),

    #[error("terminal I/O failed: {0}")]
    Bridge(#[source] std::io::Error),

    #[error("SSH protocol error: {0}")]
    Protocol(#[from] russh::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
