// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Schema version negotiation against the cluster's advertised API groups

use crate::error::{InstallerError, Result};
use kube::{
    api::{ApiResource, GroupVersionKind},
    discovery::Discovery,
    Client,
};
use std::fmt;
use tracing::{debug, info, instrument};

/// Schema versions the installer can build objects for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaVersion {
    V1,
    V1Beta1,
}

impl SchemaVersion {
    /// Candidates in order of preference
    pub const PREFERENCE: [SchemaVersion; 2] = [SchemaVersion::V1, SchemaVersion::V1Beta1];

    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaVersion::V1 => "v1",
            SchemaVersion::V1Beta1 => "v1beta1",
        }
    }

    /// API resource for `group`/`kind` in this version
    pub fn api_resource(&self, group: &str, kind: &str) -> ApiResource {
        ApiResource::from_gvk(&GroupVersionKind::gvk(group, self.as_str(), kind))
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pick the first candidate version in which the cluster serves `group`/`kind`.
#[instrument(skip(client))]
pub async fn negotiate(
    client: &Client,
    group: &str,
    kind: &str,
    candidates: &[SchemaVersion],
) -> Result<SchemaVersion> {
    let discovery = Discovery::new(client.clone())
        .filter(&[group])
        .run()
        .await?;

    if let Some(api_group) = discovery.get(group) {
        debug!(
            "Group {} serves versions [{}]",
            group,
            api_group.versions().collect::<Vec<_>>().join(", ")
        );
        for candidate in candidates {
            let served = api_group
                .versioned_resources(candidate.as_str())
                .iter()
                .any(|(ar, _)| ar.kind == kind);
            if served {
                info!("Using {}/{} for {}", group, candidate, kind);
                return Ok(*candidate);
            }
        }
    }

    Err(InstallerError::UnsupportedVersion {
        group: group.to_string(),
        kind: kind.to_string(),
        tried: candidates
            .iter()
            .map(SchemaVersion::as_str)
            .collect::<Vec<_>>()
            .join(", "),
    })
}
