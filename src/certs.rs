// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! TLS material for the admission and conversion webhooks.

use crate::constants::secret_keys;
use crate::error::{InstallerError, Result};
use k8s_openapi::ByteString;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

/// Certificates issued for one webhook endpoint
#[derive(Clone)]
pub struct TlsBundle {
    pub ca_cert: Vec<u8>,
    pub public_cert: Vec<u8>,
    pub private_key: Vec<u8>,
}

impl std::fmt::Debug for TlsBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsBundle")
            .field("ca_cert", &self.ca_cert.len())
            .field("public_cert", &self.public_cert.len())
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// CA certificate bytes embedded in webhook client configs. Never empty.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaBundle(Vec<u8>);

impl CaBundle {
    pub fn new(bytes: Vec<u8>) -> Result<Self> {
        if bytes.is_empty() {
            return Err(InstallerError::EmptyCaBundle);
        }
        Ok(CaBundle(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_byte_string(&self) -> ByteString {
        ByteString(self.0.clone())
    }
}

impl TlsBundle {
    pub fn ca_bundle(&self) -> Result<CaBundle> {
        CaBundle::new(self.ca_cert.clone())
    }
}

/// Issues serving certificates for a set of DNS names.
pub trait CertificateAuthority {
    fn issue(&self, dns_names: &[String]) -> Result<TlsBundle>;
}

/// Loads pre-issued PEM files from `<root>/<first dns name>/`.
///
/// Each directory holds `ca.pem`, `cert.pem` and `key.pem`.
pub struct FileAuthority {
    root: PathBuf,
}

impl FileAuthority {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn read(&self, dir: &Path, file: &str) -> Result<Vec<u8>> {
        let path = dir.join(file);
        let bytes = fs::read(&path).map_err(|e| {
            InstallerError::CertificateError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        if bytes.is_empty() {
            return Err(InstallerError::CertificateError(format!(
                "{} is empty",
                path.display()
            )));
        }
        Ok(bytes)
    }
}

impl CertificateAuthority for FileAuthority {
    #[instrument(skip(self), fields(root = %self.root.display()))]
    fn issue(&self, dns_names: &[String]) -> Result<TlsBundle> {
        let Some(primary) = dns_names.first() else {
            return Err(InstallerError::CertificateError(
                "no DNS names requested".to_string(),
            ));
        };

        let dir = self.root.join(primary);
        debug!("Loading certificates from {}", dir.display());

        Ok(TlsBundle {
            ca_cert: self.read(&dir, secret_keys::CA_CERT)?,
            public_cert: self.read(&dir, secret_keys::PUBLIC_CERT)?,
            private_key: self.read(&dir, secret_keys::PRIVATE_KEY)?,
        })
    }
}
