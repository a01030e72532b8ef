// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Accepts Go-style single-dash long flags by normalizing them first.

use crate::ssh::HostKeyPolicy;
use clap::{CommandFactory, Parser};
use std::ffi::OsString;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Parser)]
#[command(name = "keyshell")]
#[command(about = "Interactive SSH shell using public-key authentication")]
#[command(version)]
pub struct Cli {
    /// Remote username
    #[arg(long, default_value = "", allow_hyphen_values = true)]
    pub user: String,

    /// Unencrypted private key file
    #[arg(long, default_value = "", allow_hyphen_values = true)]
    pub pkey: String,

    /// SSH server IP or hostname
    #[arg(long, default_value = "127.0.0.1", allow_hyphen_values = true)]
    pub ip: String,

    /// SSH server port
    #[arg(long, default_value = "22", allow_hyphen_values = true)]
    pub port: String,

    /// How the server's host key is verified
    #[arg(long, value_enum, default_value_t = HostKeyPolicy::Strict)]
    pub host_key_policy: HostKeyPolicy,

    /// known_hosts file (default: ~/.ssh/known_hosts)
    #[arg(long)]
    pub known_hosts: Option<PathBuf>,

    /// Seconds allowed for connecting and completing the SSH handshake
    #[arg(long, default_value_t = 10)]
    pub connect_timeout: u64,

    /// Seconds between keepalive requests on an idle session (0 disables)
    #[arg(long, default_value_t = 30)]
    pub keepalive: u64,

    /// Enable debug logging on stderr
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Parse the process arguments, accepting `-flag` as well as `--flag`.
    pub fn parse_normalized() -> Self {
        Self::parse_from(normalize_args(std::env::args_os()))
    }
}

/// Rewrite single-dash long flags (`-user`, `-port=22`) into clap's
/// double-dash form. Only names of real long flags are rewritten, so a value
/// such as `-pkey -mykey` stays a value. Short flags and anything after `--`
/// pass through.
pub fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let long_flags = long_flag_names();
    let mut normalized = Vec::new();
    let mut passthrough = false;

    for (index, arg) in args.into_iter().enumerate() {
        let arg: OsString = arg.into();
        if index == 0 || passthrough {
            normalized.push(arg);
            continue;
        }

        let rewritten = match arg.to_str() {
            Some("--") => {
                passthrough = true;
                None
            }
            Some(s) if is_single_dash_long_flag(s, &long_flags) => {
                Some(OsString::from(format!("-{s}")))
            }
            _ => None,
        };
        normalized.push(rewritten.unwrap_or(arg));
    }

    normalized
}

fn long_flag_names() -> Vec<String> {
    let mut names: Vec<String> = Cli::command()
        .get_arguments()
        .filter_map(|arg| arg.get_long().map(str::to_string))
        .collect();
    // Added by clap when the command is built.
    names.extend(["help".to_string(), "version".to_string()]);
    names
}

fn is_single_dash_long_flag(arg: &str, long_flags: &[String]) -> bool {
    let Some(rest) = arg.strip_prefix('-') else {
        return false;
    };
    if rest.starts_with('-') {
        return false;
    }
    let name = rest.split('=').next().unwrap_or(rest);
    long_flags.iter().any(|flag| flag == name)
}
