// ABOUTME: Server host key verification against known_hosts.
// ABOUTME: Strict by default; trust-on-first-use and insecure acceptance are opt-in.

use super::error::Error;
use russh::keys::known_hosts::{
    check_known_hosts, check_known_hosts_path, learn_known_hosts, learn_known_hosts_path,
};
use russh::keys::ssh_key;
use std::path::Path;

/// How the server's host key is checked before authenticating.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum HostKeyPolicy {
    /// Only accept hosts already present in known_hosts.
    #[default]
    Strict,
    /// Accept and remember unknown hosts; reject changed keys.
    AcceptNew,
    /// Accept any host key without checking. Vulnerable to impersonation.
    Insecure,
}

impl std::fmt::Display for HostKeyPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HostKeyPolicy::Strict => write!(f, "strict"),
            HostKeyPolicy::AcceptNew => write!(f, "accept-new"),
            HostKeyPolicy::Insecure => write!(f, "insecure"),
        }
    }
}

/// Decide whether `key` is acceptable for `host:port` under `policy`.
///
/// `known_hosts` overrides the default `~/.ssh/known_hosts`. Under
/// [`HostKeyPolicy::AcceptNew`] an unknown key is appended to that file;
/// a failed write is logged and the key is still accepted.
pub fn verify_host_key(
    policy: HostKeyPolicy,
    host: &str,
    port: u16,
    key: &ssh_key::PublicKey,
    known_hosts: Option<&Path>,
) -> Result<(), Error> {
    if policy == HostKeyPolicy::Insecure {
        tracing::warn!(
            "Host key verification disabled: accepting {} key for {}:{} unchecked",
            key.algorithm(),
            host,
            port
        );
        return Ok(());
    }

    // known_hosts entries carry no comment, and key equality includes it.
    let key = &ssh_key::PublicKey::from(key.key_data().clone());

    let check_result = match known_hosts {
        Some(path) => check_known_hosts_path(host, port, key, path),
        None => check_known_hosts(host, port, key),
    };

    match check_result {
        Ok(true) => {
            tracing::debug!("Host key for {}:{} matches known_hosts", host, port);
            Ok(())
        }
        Ok(false) if policy == HostKeyPolicy::AcceptNew => {
            tracing::warn!(
                "Trust-On-First-Use: accepting unknown host key for {}:{}",
                host,
                port
            );
            let learn_result = match known_hosts {
                Some(path) => learn_known_hosts_path(host, port, key, path),
                None => learn_known_hosts(host, port, key),
            };
            if let Err(e) = learn_result {
                tracing::warn!("Failed to save host key to known_hosts: {}", e);
            }
            Ok(())
        }
        Ok(false) => Err(Error::HostKeyUnknown {
            host: host.to_string(),
            port,
        }),
        Err(russh::keys::Error::KeyChanged { line }) => Err(Error::HostKeyChanged {
            host: host.to_string(),
            port,
            line,
        }),
        Err(e) => Err(Error::KnownHosts(e.to_string())),
    }
}
