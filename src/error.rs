// ABOUTME: Application-wide error types for keyshell.
// ABOUTME: Uses thiserror for ergonomic error handling.

use thiserror::Error;

/// Exit status for every failure, matching clap's usage-error status.
pub const FAILURE_EXIT_CODE: i32 = 2;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Must supply username")]
    MissingUsername,

    #[error("Must supply private key")]
    MissingPrivateKey,

    #[error(transparent)]
    Ssh(#[from] crate::ssh::Error),
}

impl Error {
    /// Process exit status for this error. No failure is retried.
    pub fn exit_code(&self) -> i32 {
        FAILURE_EXIT_CODE
    }
}

pub type Result<T> = std::result::Result<T, Error>;
