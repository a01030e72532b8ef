// ABOUTME: Teardown problems that are shown to the user but never change the exit status.
// ABOUTME: Release steps record them here; main prints them once the session is gone.

use std::fmt;
use std::io::{self, Write};

/// Problems hit while releasing the channel and connection.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    pub fn warn(&mut self, warning: Warning) {
        tracing::debug!(kind = ?warning.kind, "{}", warning.message);
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Write one `Warning: ...` line per recorded problem, in release order.
    pub fn report(&self, out: &mut impl Write) -> io::Result<()> {
        for warning in &self.warnings {
            writeln!(out, "Warning: {warning}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    pub fn channel_close(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::ChannelClose,
            message: message.into(),
        }
    }

    pub fn ssh_disconnect(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::SshDisconnect,
            message: message.into(),
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Which release step went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// Closing the shell channel failed.
    ChannelClose,
    /// Sending the SSH disconnect failed.
    SshDisconnect,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_release_reports_nothing() {
        let diag = Diagnostics::default();
        let mut out = Vec::new();
        diag.report(&mut out).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn report_follows_release_order() {
        let mut diag = Diagnostics::default();
        diag.warn(Warning::channel_close("closing shell channel failed: broken pipe"));
        diag.warn(Warning::ssh_disconnect(
            "SSH disconnect failed for 10.0.0.5:22: connection reset",
        ));

        let kinds: Vec<_> = diag.warnings().iter().map(|w| w.kind).collect();
        assert_eq!(kinds, [WarningKind::ChannelClose, WarningKind::SshDisconnect]);

        let mut out = Vec::new();
        diag.report(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Warning: closing shell channel failed: broken pipe\n\
             Warning: SSH disconnect failed for 10.0.0.5:22: connection reset\n"
        );
    }
}
