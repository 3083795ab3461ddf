// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Resource name sanitizing and the names derived from a driver identity.

use crate::constants::{names, paths, ports};
use rand::Rng;

/// Longest legal DNS-1123 label, which also bounds label values.
const MAX_NAME_LEN: usize = 63;
const SUFFIX_LEN: usize = 5;
const SUFFIX_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Map an arbitrary identity to a legal resource name.
///
/// Lowercases, replaces every character outside `[a-z0-9-]` with `-`,
/// truncates to 63 characters and strips leading/trailing dashes.
pub fn sanitize_resource_name(identity: &str) -> String {
    let mapped: String = identity
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'a'..='z' | '0'..='9' | '-' => c,
            _ => '-',
        })
        .take(MAX_NAME_LEN)
        .collect();

    mapped.trim_matches('-').to_string()
}

/// Generate a selector token unique to one workload build.
///
/// The result is `<sanitized-name>-<5 random chars>` and never exceeds 63
/// characters, so it is valid both as a name and as a label value.
pub fn unique_selector_value(name: &str) -> String {
    let mut base = sanitize_resource_name(name);
    base.truncate(MAX_NAME_LEN - SUFFIX_LEN - 1);
    let base = base.trim_end_matches('-');

    let mut rng = rand::thread_rng();
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| SUFFIX_ALPHABET[rng.gen_range(0..SUFFIX_ALPHABET.len())] as char)
        .collect();

    format!("{}-{}", base, suffix)
}

/// In-cluster DNS name of the driver service serving the conversion webhook
pub fn conversion_webhook_dns_name(identity: &str) -> String {
    let name = sanitize_resource_name(identity);
    format!("{}.{}.svc", name, name)
}

/// In-cluster DNS name of the validation controller service
pub fn admission_webhook_dns_name(identity: &str) -> String {
    format!(
        "{}.{}.svc",
        names::VALIDATION_CONTROLLER,
        sanitize_resource_name(identity)
    )
}

pub fn conversion_healthz_url(identity: &str) -> String {
    format!(
        "https://{}:{}{}",
        conversion_webhook_dns_name(identity),
        ports::CONVERSION_WEBHOOK,
        ports::HEALTHZ_PATH
    )
}

/// Directory below the kubelet plugins dir holding the driver socket
pub fn plugin_socket_dir(name: &str) -> String {
    format!(
        "{}/plugins/{}",
        paths::KUBELET_DIR,
        sanitize_resource_name(name)
    )
}

/// Join registry, org and image into a reference, skipping empty parts.
pub fn image_ref(registry: &str, org: &str, image: &str) -> String {
    [registry, org, image]
        .iter()
        .map(|part| part.trim_matches('/'))
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}
