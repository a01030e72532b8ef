// ABOUTME: Private key loading for public-key authentication.
// ABOUTME: Reads an unencrypted OpenSSH/PEM key from disk into a signing credential.

use super::error::{Error, Result};
use russh::keys::{PrivateKey, decode_secret_key};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Private key used to prove the client's identity during authentication.
pub struct SigningKey {
    path: PathBuf,
    key: Arc<PrivateKey>,
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("path", &self.path)
            .field("algorithm", &self.key.algorithm().as_str())
            .finish()
    }
}

impl SigningKey {
    /// Read and parse the key at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| Error::KeyRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(path, &bytes)
    }

    /// Parse raw key bytes. `path` is only used for diagnostics.
    pub fn from_bytes(path: impl Into<PathBuf>, bytes: &[u8]) -> Result<Self> {
        let path = path.into();
        let text = std::str::from_utf8(bytes).map_err(|_| Error::KeyParse {
            path: path.clone(),
            reason: "key file is not valid UTF-8".to_string(),
        })?;

        let key = decode_secret_key(text, None).map_err(|e| Error::KeyParse {
            path: path.clone(),
            reason: match e {
                russh::keys::Error::KeyIsEncrypted => {
                    "key is passphrase-protected, which is not supported".to_string()
                }
                other => other.to_string(),
            },
        })?;

        tracing::debug!(
            path = %path.display(),
            algorithm = %key.algorithm(),
            "Loaded private key"
        );

        Ok(Self {
            path,
            key: Arc::new(key),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn into_inner(self) -> Arc<PrivateKey> {
        self.key
    }

    #[cfg(test)]
    pub(crate) fn public_key(&self) -> &russh::keys::PublicKey {
        self.key.public_key()
    }
}
