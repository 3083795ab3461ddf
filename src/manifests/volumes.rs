// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use k8s_openapi::api::core::v1::{HostPathVolumeSource, SecretVolumeSource, Volume, VolumeMount};

pub fn host_path_volume(name: &str, path: &str) -> Volume {
    Volume {
        name: name.to_string(),
        host_path: Some(HostPathVolumeSource {
            path: path.to_string(),
            type_: Some("DirectoryOrCreate".to_string()),
        }),
        ..Default::default()
    }
}

pub fn secret_volume(name: &str, secret_name: &str) -> Volume {
    Volume {
        name: name.to_string(),
        secret: Some(SecretVolumeSource {
            secret_name: Some(secret_name.to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub fn volume_mount(name: &str, path: &str, bidirectional: bool, read_only: bool) -> VolumeMount {
    let propagation = if bidirectional { "Bidirectional" } else { "None" };
    VolumeMount {
        name: name.to_string(),
        mount_path: path.to_string(),
        read_only: Some(read_only),
        mount_propagation: Some(propagation.to_string()),
        ..Default::default()
    }
}
