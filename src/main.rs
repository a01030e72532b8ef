// ABOUTME: Entry point for the keyshell CLI application.
// ABOUTME: Connects, starts a remote shell, relays terminal I/O, then releases the session.

use keyshell::cli::Cli;
use keyshell::config::Config;
use keyshell::diagnostics::{Diagnostics, Warning};
use keyshell::error::Result;
use keyshell::ssh::{
    Connection, EndReason, IoBridge, PtyRequest, SessionEnd, ShellSession, SigningKey,
};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse_normalized();

    // Logs go to stderr; stdout carries only remote output.
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let code = match run(cli).await {
        Ok(end) => end.reason.exit_code(),
        Err(e) => {
            eprintln!("Error: {e}");
            e.exit_code()
        }
    };

    // A blocking stdin read may still be pending; don't wait for it on shutdown.
    std::process::exit(code);
}

async fn run(cli: Cli) -> Result<SessionEnd> {
    let config = Config::from_cli(cli)?;

    let key = SigningKey::load(&config.key_path)?;

    tracing::info!(addr = %config.address(), user = %config.user, "Connecting");
    let connection = Connection::connect(config.connect_config(), key).await?;

    let mut shell = ShellSession::open(&connection, &PtyRequest::default()).await?;

    let bridge = IoBridge::new(tokio::io::stdin(), tokio::io::stdout(), tokio::io::stderr());
    let result = bridge.run(&mut shell, interrupted()).await;

    if let Ok(end) = &result {
        tracing::info!(reason = ?end.reason, exit_status = ?end.exit_status, "Session ended");
    }

    // A remote close has already released the channel.
    let channel_open = !matches!(&result, Ok(end) if end.reason == EndReason::RemoteClosed);

    let mut diag = Diagnostics::default();
    release(shell, channel_open, connection, &config, &mut diag).await;
    let _ = diag.report(&mut std::io::stderr());

    result.map_err(Into::into)
}

/// Close the channel, then the connection. Failures are recorded, not returned.
async fn release(
    shell: ShellSession,
    channel_open: bool,
    connection: Connection,
    config: &Config,
    diag: &mut Diagnostics,
) {
    if channel_open {
        if let Err(e) = shell.close().await {
            diag.warn(Warning::channel_close(format!(
                "closing shell channel failed: {e}"
            )));
        }
    }

    if let Err(e) = connection.disconnect().await {
        diag.warn(Warning::ssh_disconnect(format!(
            "SSH disconnect failed for {}: {e}",
            config.address()
        )));
    }
}

/// Resolves on Ctrl-C. Never resolves if the handler cannot be installed.
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::debug!("Cannot listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
