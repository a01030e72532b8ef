// ABOUTME: Pseudo-terminal request parameters sent when opening a shell.
// ABOUTME: Defaults to a 40x80 vt220 terminal with remote echo disabled.

use russh::Pty;

pub const DEFAULT_TERM: &str = "vt220";
pub const DEFAULT_ROWS: u32 = 40;
pub const DEFAULT_COLS: u32 = 80;

/// Terminal type, size, and line-discipline modes for the remote PTY.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PtyRequest {
    pub term: String,
    pub rows: u32,
    pub cols: u32,
    pub modes: Vec<(Pty, u32)>,
}

impl Default for PtyRequest {
    fn default() -> Self {
        Self {
            term: DEFAULT_TERM.to_string(),
            rows: DEFAULT_ROWS,
            cols: DEFAULT_COLS,
            // The local terminal already echoes what is typed.
            modes: vec![(Pty::ECHO, 0)],
        }
    }
}
