// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InstallerError {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("{kind} ({group}) is not served in any supported version, tried [{tried}]")]
    UnsupportedVersion {
        group: String,
        kind: String,
        tried: String,
    },

    #[error("identity '{0}' does not yield a valid resource name")]
    InvalidIdentity(String),

    #[error("CA bundle is empty")]
    EmptyCaBundle,

    #[error("Failed to serialize manifest: {0}")]
    SerializationError(#[from] serde_yaml::Error),

    #[error("Failed to convert manifest: {0}")]
    ConversionError(#[from] serde_json::Error),

    #[error("Failed to write manifest: {0}")]
    OutputError(#[from] std::io::Error),

    #[error("Certificate error: {0}")]
    CertificateError(String),

    #[error("installation failed: {source} installer={step} identity={identity}")]
    InstallationFailed {
        step: &'static str,
        identity: String,
        source: Box<InstallerError>,
    },
}

impl InstallerError {
    /// The API server answered 404 for the requested object
    pub fn is_not_found(&self) -> bool {
        matches!(self, InstallerError::KubeError(kube::Error::Api(err)) if err.code == 404)
    }

    /// The API server refused a create because the object is already there
    pub fn is_already_exists(&self) -> bool {
        matches!(self, InstallerError::KubeError(kube::Error::Api(err)) if err.code == 409)
    }
}

pub type Result<T> = std::result::Result<T, InstallerError>;
