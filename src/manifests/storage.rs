// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! CSIDriver and StorageClass, both served from `storage.k8s.io`.

use super::cluster_object_meta;
use crate::constants::selectors;
use crate::naming::sanitize_resource_name;
use k8s_openapi::api::core::v1::{TopologySelectorLabelRequirement, TopologySelectorTerm};
use k8s_openapi::api::storage::v1::{CSIDriver, CSIDriverSpec, StorageClass};
use std::collections::BTreeMap;

pub fn csi_driver(identity: &str) -> CSIDriver {
    CSIDriver {
        metadata: cluster_object_meta(identity),
        spec: CSIDriverSpec {
            pod_info_on_mount: Some(true),
            attach_required: Some(false),
            volume_lifecycle_modes: Some(vec![
                "Persistent".to_string(),
                "Ephemeral".to_string(),
            ]),
            ..Default::default()
        },
    }
}

/// Restrict provisioning to nodes running this driver identity
fn topology_selector_term(identity: &str) -> TopologySelectorTerm {
    TopologySelectorTerm {
        match_label_expressions: Some(vec![TopologySelectorLabelRequirement {
            key: selectors::TOPOLOGY_DRIVER_IDENTITY.to_string(),
            values: vec![sanitize_resource_name(identity)],
        }]),
    }
}

pub fn storage_class(identity: &str) -> StorageClass {
    StorageClass {
        metadata: cluster_object_meta(identity),
        provisioner: sanitize_resource_name(identity),
        allow_volume_expansion: Some(false),
        volume_binding_mode: Some("WaitForFirstConsumer".to_string()),
        reclaim_policy: Some("Delete".to_string()),
        allowed_topologies: Some(vec![topology_selector_term(identity)]),
        parameters: Some(BTreeMap::from([(
            "fstype".to_string(),
            "xfs".to_string(),
        )])),
        ..Default::default()
    }
}
