// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::naming::sanitize_resource_name;
use anyhow::{bail, Context, Result};
use k8s_openapi::api::core::v1::Toleration;
use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;

pub const DEFAULT_IDENTITY: &str = "localdrive.csi.io";
pub const DEFAULT_DRIVER_IMAGE: &str = "localdrive:v1.0.0";
pub const DEFAULT_REGISTRY: &str = "quay.io";
pub const DEFAULT_ORG: &str = "localdrive";
pub const DEFAULT_CERTS_DIR: &str = "/etc/localdrive/certs";

/// Installer configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Driver identity, sanitized into the name and namespace of most objects
    pub identity: String,
    pub driver_image: String,
    pub registry: String,
    pub org: String,
    /// Write manifests to the output sink only, never call the API
    pub dry_run: bool,
    pub loopback_only: bool,
    pub dynamic_discovery: bool,
    pub node_selector: BTreeMap<String, String>,
    pub tolerations: Vec<Toleration>,
    pub seccomp_profile: Option<String>,
    pub apparmor_profile: Option<String>,
    /// File the generated manifests are written to
    pub output_file: Option<PathBuf>,
    /// Root of the pre-issued webhook certificates
    pub certs_dir: PathBuf,
}

impl Config {
    /// Configuration with defaults for everything but the identity
    pub fn new(identity: impl Into<String>) -> Self {
        Config {
            identity: identity.into(),
            driver_image: DEFAULT_DRIVER_IMAGE.to_string(),
            registry: DEFAULT_REGISTRY.to_string(),
            org: DEFAULT_ORG.to_string(),
            dry_run: false,
            loopback_only: false,
            dynamic_discovery: false,
            node_selector: BTreeMap::new(),
            tolerations: Vec::new(),
            seccomp_profile: None,
            apparmor_profile: None,
            output_file: None,
            certs_dir: PathBuf::from(DEFAULT_CERTS_DIR),
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let identity = env::var("IDENTITY").unwrap_or_else(|_| DEFAULT_IDENTITY.to_string());
        if sanitize_resource_name(&identity).is_empty() {
            bail!("IDENTITY '{}' does not yield a valid resource name", identity);
        }

        let mut config = Config::new(identity);

        if let Some(image) = non_empty_var("DRIVER_IMAGE") {
            config.driver_image = image;
        }
        if let Ok(registry) = env::var("IMAGE_REGISTRY") {
            config.registry = registry;
        }
        if let Ok(org) = env::var("IMAGE_ORG") {
            config.org = org;
        }

        config.dry_run = bool_var("DRY_RUN")?;
        config.loopback_only = bool_var("LOOPBACK_ONLY")?;
        config.dynamic_discovery = bool_var("DYNAMIC_DISCOVERY")?;

        if let Some(selector) = non_empty_var("NODE_SELECTOR") {
            config.node_selector = parse_node_selector(&selector)
                .context("NODE_SELECTOR environment variable is malformed")?;
        }
        if let Some(tolerations) = non_empty_var("TOLERATIONS") {
            config.tolerations = parse_tolerations(&tolerations)
                .context("TOLERATIONS environment variable is malformed")?;
        }

        config.seccomp_profile = non_empty_var("SECCOMP_PROFILE");
        config.apparmor_profile = non_empty_var("APPARMOR_PROFILE");
        config.output_file = non_empty_var("OUTPUT_FILE").map(PathBuf::from);
        if let Some(dir) = non_empty_var("CERTS_DIR") {
            config.certs_dir = PathBuf::from(dir);
        }

        Ok(config)
    }

    /// Sanitized identity, used as name and namespace
    pub fn name(&self) -> String {
        sanitize_resource_name(&self.identity)
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn bool_var(key: &str) -> Result<bool> {
    match non_empty_var(key) {
        Some(value) => value
            .trim()
            .parse()
            .with_context(|| format!("{} must be 'true' or 'false', got '{}'", key, value)),
        None => Ok(false),
    }
}

/// Parse `key=value,key2=value2`
pub fn parse_node_selector(input: &str) -> Result<BTreeMap<String, String>> {
    let mut selector = BTreeMap::new();
    for pair in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let Some((key, value)) = pair.split_once('=') else {
            bail!("expected key=value, got '{}'", pair);
        };
        if key.trim().is_empty() {
            bail!("empty key in '{}'", pair);
        }
        selector.insert(key.trim().to_string(), value.trim().to_string());
    }
    Ok(selector)
}

/// Parse `key[=value][:Effect]` entries separated by commas.
///
/// `key=value` uses the `Equal` operator, a bare `key` uses `Exists`.
pub fn parse_tolerations(input: &str) -> Result<Vec<Toleration>> {
    input
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(parse_toleration)
        .collect()
}

fn parse_toleration(input: &str) -> Result<Toleration> {
    let (selector, effect) = match input.rsplit_once(':') {
        Some((selector, effect)) => (selector, Some(effect.trim())),
        None => (input, None),
    };

    if let Some(effect) = effect {
        if !matches!(effect, "NoSchedule" | "PreferNoSchedule" | "NoExecute") {
            bail!("unknown toleration effect '{}' in '{}'", effect, input);
        }
    }

    let (key, value, operator) = match selector.split_once('=') {
        Some((key, value)) => (key.trim(), Some(value.trim().to_string()), "Equal"),
        None => (selector.trim(), None, "Exists"),
    };
    if key.is_empty() {
        bail!("empty key in toleration '{}'", input);
    }

    Ok(Toleration {
        key: Some(key.to_string()),
        operator: Some(operator.to_string()),
        value,
        effect: effect.map(str::to_string),
        ..Default::default()
    })
}
