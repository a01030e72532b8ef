// ABOUTME: In-process SSH server for integration tests.
// ABOUTME: Records channel, PTY, and shell requests and echoes shell input back.

use parking_lot::Mutex;
use russh::keys::{PrivateKey, load_secret_key, ssh_key};
use russh::server::{self, Auth, Msg, Session};
use russh::{Channel, ChannelId, CryptoVec, Pty};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// The only user the server accepts.
pub const TEST_USER: &str = "alice";

/// Sent on the shell's stderr as soon as the shell starts.
pub const GREETING: &[u8] = b"welcome to the test shell\r\n";

/// A PTY request as the server received it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PtyRecord {
    pub term: String,
    pub cols: u32,
    pub rows: u32,
    pub modes: Vec<(Pty, u32)>,
}

/// Everything the server observed, across all connections.
#[derive(Debug, Default, Clone)]
pub struct Recorded {
    pub auth_attempts: Vec<String>,
    pub channels_opened: usize,
    pub pty_requests: Vec<PtyRecord>,
    pub shell_requests: usize,
    pub input: Vec<u8>,
    pub eof_received: bool,
}

/// Sent on stdout ahead of the shell request's success reply when
/// [`ServerOptions::early_output`] is set.
pub const EARLY_OUTPUT: &[u8] = b"motd before reply\r\n";

/// Knobs for making the server misbehave.
#[derive(Debug, Default, Clone, Copy)]
pub struct ServerOptions {
    pub refuse_channel: bool,
    pub refuse_pty: bool,
    pub refuse_shell: bool,
    /// Write [`EARLY_OUTPUT`] before replying to the shell request.
    pub early_output: bool,
    /// Keep the channel open after the client sends EOF.
    pub ignore_eof: bool,
}

/// Running server bound to an ephemeral localhost port.
pub struct TestServer {
    pub port: u16,
    recorded: Arc<Mutex<Recorded>>,
}

impl TestServer {
    pub async fn start() -> Self {
        Self::start_with(ServerOptions::default()).await
    }

    pub async fn start_with(options: ServerOptions) -> Self {
        let host_key = load_secret_key(super::fixture("host_key"), None)
            .expect("host key fixture should load");
        let config = Arc::new(server::Config {
            keys: vec![host_key],
            auth_rejection_time: Duration::from_millis(10),
            auth_rejection_time_initial: Some(Duration::ZERO),
            ..Default::default()
        });

        let authorized = client_key().public_key().clone();
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("should bind test listener");
        let port = listener.local_addr().unwrap().port();
        let recorded = Arc::new(Mutex::new(Recorded::default()));

        let shared = Arc::clone(&recorded);
        tokio::spawn(async move {
            while let Ok((stream, peer)) = listener.accept().await {
                tracing::debug!(?peer, "Test server accepted connection");
                let handler = TestHandler {
                    authorized: authorized.clone(),
                    options,
                    recorded: Arc::clone(&shared),
                };
                let config = Arc::clone(&config);
                tokio::spawn(async move {
                    if let Ok(session) = server::run_stream(config, stream, handler).await {
                        let _ = session.await;
                    }
                });
            }
        });

        Self { port, recorded }
    }

    /// Snapshot of what the server has seen so far.
    pub fn recorded(&self) -> Recorded {
        self.recorded.lock().clone()
    }
}

/// The client key the server authorizes for [`TEST_USER`].
pub fn client_key() -> PrivateKey {
    load_secret_key(super::fixture("test_key"), None).expect("client key fixture should load")
}

/// Public half of the server's host key.
pub fn host_public_key() -> ssh_key::PublicKey {
    load_secret_key(super::fixture("host_key"), None)
        .expect("host key fixture should load")
        .public_key()
        .clone()
}

struct TestHandler {
    authorized: ssh_key::PublicKey,
    options: ServerOptions,
    recorded: Arc<Mutex<Recorded>>,
}

impl server::Handler for TestHandler {
    type Error = russh::Error;

    async fn auth_publickey(
        &mut self,
        user: &str,
        public_key: &ssh_key::PublicKey,
    ) -> Result<Auth, Self::Error> {
        self.recorded.lock().auth_attempts.push(user.to_string());

        if user == TEST_USER && public_key.key_data() == self.authorized.key_data() {
            Ok(Auth::Accept)
        } else {
            Ok(Auth::Reject {
                proceed_with_methods: None,
                partial_success: false,
            })
        }
    }

    async fn channel_open_session(
        &mut self,
        _channel: Channel<Msg>,
        _session: &mut Session,
    ) -> Result<bool, Self::Error> {
        if self.options.refuse_channel {
            return Ok(false);
        }
        self.recorded.lock().channels_opened += 1;
        Ok(true)
    }

    #[allow(clippy::too_many_arguments)]
    async fn pty_request(
        &mut self,
        channel: ChannelId,
        term: &str,
        col_width: u32,
        row_height: u32,
        _pix_width: u32,
        _pix_height: u32,
        modes: &[(Pty, u32)],
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        self.recorded.lock().pty_requests.push(PtyRecord {
            term: term.to_string(),
            cols: col_width,
            rows: row_height,
            modes: modes.to_vec(),
        });

        if self.options.refuse_pty {
            let _ = session.channel_failure(channel);
        } else {
            let _ = session.channel_success(channel);
        }
        Ok(())
    }

    async fn shell_request(
        &mut self,
        channel: ChannelId,
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        self.recorded.lock().shell_requests += 1;

        if self.options.refuse_shell {
            let _ = session.channel_failure(channel);
        } else {
            if self.options.early_output {
                let _ = session.data(channel, CryptoVec::from_slice(EARLY_OUTPUT));
            }
            let _ = session.channel_success(channel);
            let _ = session.extended_data(channel, 1, CryptoVec::from_slice(GREETING));
        }
        Ok(())
    }

    async fn data(
        &mut self,
        channel: ChannelId,
        data: &[u8],
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        self.recorded.lock().input.extend_from_slice(data);
        let _ = session.data(channel, CryptoVec::from_slice(data));
        Ok(())
    }

    async fn channel_eof(
        &mut self,
        channel: ChannelId,
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        self.recorded.lock().eof_received = true;
        if self.options.ignore_eof {
            return Ok(());
        }
        let _ = session.exit_status_request(channel, 0);
        let _ = session.eof(channel);
        let _ = session.close(channel);
        Ok(())
    }
}
