// ABOUTME: Library root for keyshell - exposes public types for testing.
// ABOUTME: The main binary is in main.rs.

pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod ssh;
