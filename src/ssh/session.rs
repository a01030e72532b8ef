// ABOUTME: Interactive shell channel on an established connection.
// ABOUTME: Opens one session channel, requests a PTY, and starts the remote shell.

use super::client::Connection;
use super::error::{Error, Result};
use super::pty::PtyRequest;
use async_trait::async_trait;
use bytes::Bytes;
use russh::ChannelMsg;
use russh::client::Msg;
use std::collections::VecDeque;

/// Output and lifecycle events produced by a remote shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellEvent {
    /// Bytes written to the remote standard output.
    Stdout(Bytes),
    /// Bytes written to the remote standard error.
    Stderr(Bytes),
    /// The remote shell exited with this status.
    ExitStatus(u32),
    /// The remote shell was killed by a signal.
    ExitSignal(String),
    /// The remote side will send no more output.
    Eof,
}

/// A running remote shell the I/O bridge can drive.
#[async_trait]
pub trait RemoteShell: Send {
    /// Write bytes to the remote standard input.
    async fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Signal end of input to the remote side.
    async fn send_eof(&mut self) -> Result<()>;

    /// Wait for the next event. `None` once the channel is closed.
    async fn next_event(&mut self) -> Option<ShellEvent>;
}

/// One interactive shell running on a session channel.
pub struct ShellSession {
    channel: russh::Channel<Msg>,
    /// Messages that arrived while a request reply was still outstanding.
    pending: VecDeque<ChannelMsg>,
}

impl std::fmt::Debug for ShellSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShellSession")
            .field("channel", &self.channel.id())
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl ShellSession {
    /// Open a session channel, allocate a PTY, and start a login shell.
    pub async fn open(connection: &Connection, pty: &PtyRequest) -> Result<Self> {
        let mut channel = connection
            .handle()
            .channel_open_session()
            .await
            .map_err(|e| Error::Channel(e.to_string()))?;

        tracing::debug!(
            term = %pty.term,
            rows = pty.rows,
            cols = pty.cols,
            "Requesting PTY"
        );
        channel
            .request_pty(true, &pty.term, pty.cols, pty.rows, 0, 0, &pty.modes)
            .await
            .map_err(|e| Error::TerminalRequest(e.to_string()))?;
        let mut pending = VecDeque::new();
        wait_for_reply(&mut channel, &mut pending)
            .await
            .map_err(Error::TerminalRequest)?;

        channel
            .request_shell(true)
            .await
            .map_err(|e| Error::ShellStart(e.to_string()))?;
        wait_for_reply(&mut channel, &mut pending)
            .await
            .map_err(Error::ShellStart)?;

        tracing::info!(channel = ?channel.id(), "Remote shell started");
        Ok(Self { channel, pending })
    }

    /// Close the channel.
    pub async fn close(self) -> Result<()> {
        self.channel.close().await.map_err(Error::Protocol)
    }
}

/// Wait for the success or failure reply to a `want_reply` request.
///
/// Anything else the server sends first is queued in `pending` so the
/// shell can replay it in order.
async fn wait_for_reply(
    channel: &mut russh::Channel<Msg>,
    pending: &mut VecDeque<ChannelMsg>,
) -> std::result::Result<(), String> {
    loop {
        match channel.wait().await {
            Some(ChannelMsg::Success) => return Ok(()),
            Some(ChannelMsg::Failure) => return Err("refused by server".to_string()),
            Some(ChannelMsg::Close) | None => {
                return Err("channel closed before the server replied".to_string());
            }
            Some(other) => {
                tracing::trace!("Queueing {:?} received before request reply", other);
                pending.push_back(other);
            }
        }
    }
}

#[async_trait]
impl RemoteShell for ShellSession {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        self.channel.data(data).await.map_err(Error::Protocol)
    }

    async fn send_eof(&mut self) -> Result<()> {
        self.channel.eof().await.map_err(Error::Protocol)
    }

    async fn next_event(&mut self) -> Option<ShellEvent> {
        loop {
            let msg = match self.pending.pop_front() {
                Some(msg) => msg,
                None => self.channel.wait().await?,
            };
            match msg {
                ChannelMsg::Data { data } => {
                    return Some(ShellEvent::Stdout(Bytes::copy_from_slice(&data)));
                }
                ChannelMsg::ExtendedData { data, ext } => {
                    if ext == 1 {
                        // stderr
                        return Some(ShellEvent::Stderr(Bytes::copy_from_slice(&data)));
                    }
                }
                ChannelMsg::ExitStatus { exit_status } => {
                    return Some(ShellEvent::ExitStatus(exit_status));
                }
                ChannelMsg::ExitSignal { signal_name, .. } => {
                    return Some(ShellEvent::ExitSignal(format!("{signal_name:?}")));
                }
                ChannelMsg::Eof => return Some(ShellEvent::Eof),
                ChannelMsg::Close => return None,
                _ => {}
            }
        }
    }
}
