// ABOUTME: Relays local terminal I/O to and from a remote shell.
// ABOUTME: Stops cleanly on remote close, local end-of-input, or interrupt.

use super::error::{Error, Result};
use super::session::{RemoteShell, ShellEvent};
use std::future::Future;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::Instant;

const BUFFER_SIZE: usize = 8192;

/// How long remote output is still relayed after local input ends.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Why the relay stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// The remote side closed the channel.
    RemoteClosed,
    /// Local input ended and the remote did not close within the drain timeout.
    InputClosed,
    /// The user interrupted the session locally.
    Interrupted,
}

impl EndReason {
    /// Process exit status for a session that ended this way.
    pub fn exit_code(self) -> i32 {
        match self {
            EndReason::RemoteClosed | EndReason::InputClosed => 0,
            // 128 + SIGINT
            EndReason::Interrupted => 130,
        }
    }
}

/// Outcome of a finished relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEnd {
    pub reason: EndReason,
    /// Exit status reported by the remote shell, if any.
    pub exit_status: Option<u32>,
}

/// Copies local input to a remote shell and its output back to local streams.
pub struct IoBridge<I, O, E> {
    input: I,
    stdout: O,
    stderr: E,
    drain_timeout: Duration,
}

impl<I, O, E> IoBridge<I, O, E>
where
    I: AsyncRead + Unpin,
    O: AsyncWrite + Unpin,
    E: AsyncWrite + Unpin,
{
    pub fn new(input: I, stdout: O, stderr: E) -> Self {
        Self {
            input,
            stdout,
            stderr,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
        }
    }

    pub fn drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    /// Relay until the remote closes, input ends, or `interrupt` resolves.
    ///
    /// End of local input is forwarded once as channel EOF; remote output
    /// keeps flowing until the remote closes or the drain timeout elapses.
    pub async fn run<S>(
        mut self,
        shell: &mut S,
        interrupt: impl Future<Output = ()>,
    ) -> Result<SessionEnd>
    where
        S: RemoteShell + ?Sized,
    {
        let mut buf = vec![0u8; BUFFER_SIZE];
        let mut input_open = true;
        let mut drain_deadline: Option<Instant> = None;
        let mut exit_status = None;
        tokio::pin!(interrupt);

        let reason = loop {
            tokio::select! {
                read = self.input.read(&mut buf), if input_open => {
                    match read.map_err(Error::Bridge)? {
                        0 => {
                            tracing::debug!("EOF received on local input");
                            input_open = false;
                            shell.send_eof().await?;
                            drain_deadline = Some(Instant::now() + self.drain_timeout);
                        }
                        n => shell.send(&buf[..n]).await?,
                    }
                }

                event = shell.next_event() => {
                    match event {
                        Some(ShellEvent::Stdout(data)) => {
                            write_flush(&mut self.stdout, &data).await?;
                        }
                        Some(ShellEvent::Stderr(data)) => {
                            write_flush(&mut self.stderr, &data).await?;
                        }
                        Some(ShellEvent::ExitStatus(status)) => {
                            tracing::debug!(status, "Remote shell exited");
                            exit_status = Some(status);
                        }
                        Some(ShellEvent::ExitSignal(signal)) => {
                            tracing::debug!(signal = %signal, "Remote shell killed by signal");
                        }
                        Some(ShellEvent::Eof) => {
                            tracing::debug!("Remote output finished");
                        }
                        None => break EndReason::RemoteClosed,
                    }
                }

                _ = tokio::time::sleep_until(drain_deadline.unwrap_or_else(Instant::now)),
                    if drain_deadline.is_some() => {
                    tracing::debug!("Remote still open after input ended, closing");
                    break EndReason::InputClosed;
                }

                _ = &mut interrupt => {
                    tracing::debug!("Interrupted");
                    break EndReason::Interrupted;
                }
            }
        };

        Ok(SessionEnd {
            reason,
            exit_status,
        })
    }
}

async fn write_flush<W: AsyncWrite + Unpin>(writer: &mut W, data: &[u8]) -> Result<()> {
    writer.write_all(data).await.map_err(Error::Bridge)?;
    writer.flush().await.map_err(Error::Bridge)
}
