// ABOUTME: SSH client module for interactive remote shells.
// ABOUTME: Supports key-based authentication with configurable known_hosts verification.

mod bridge;
mod client;
mod error;
mod host_key;
mod key;
mod pty;
mod session;

pub use bridge::{DEFAULT_DRAIN_TIMEOUT, EndReason, IoBridge, SessionEnd};
pub use client::{ConnectConfig, Connection};
pub use error::{Error, Result};
pub use host_key::{HostKeyPolicy, verify_host_key};
pub use key::SigningKey;
pub use pty::PtyRequest;
pub use session::{RemoteShell, ShellEvent, ShellSession};
