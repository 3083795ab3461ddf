// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Builders for every object the installer creates.
//!
//! All builders are pure: they take the [`Config`](crate::config::Config)
//! and any TLS material and return a typed object.

pub mod resources;
pub mod storage;
pub mod volumes;
pub mod webhook;
pub mod workloads;

use crate::constants::meta;
use crate::error::Result;
use crate::kubernetes::SchemaVersion;
use crate::naming::sanitize_resource_name;
use kube::api::{DynamicObject, ObjectMeta};
use kube::Resource;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;

pub fn created_by_annotations() -> BTreeMap<String, String> {
    BTreeMap::from([(meta::CREATED_BY.to_string(), meta::CREATED_BY_VALUE.to_string())])
}

pub fn app_labels() -> BTreeMap<String, String> {
    BTreeMap::from([
        (meta::APP_LABEL.to_string(), meta::APP_VALUE.to_string()),
        (meta::TYPE_LABEL.to_string(), meta::TYPE_VALUE.to_string()),
    ])
}

/// Metadata for a cluster-scoped object named after the identity
pub fn cluster_object_meta(identity: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(sanitize_resource_name(identity)),
        annotations: Some(created_by_annotations()),
        labels: Some(app_labels()),
        ..Default::default()
    }
}

/// Metadata for an object named after the identity, living in its namespace
pub fn object_meta(identity: &str) -> ObjectMeta {
    ObjectMeta {
        namespace: Some(sanitize_resource_name(identity)),
        ..cluster_object_meta(identity)
    }
}

/// Metadata for a fixed-name object in the identity's namespace
pub fn named_object_meta(name: &str, identity: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        ..object_meta(identity)
    }
}

pub fn delete_protection_finalizer(identity: &str) -> String {
    format!(
        "{}{}",
        sanitize_resource_name(identity),
        meta::DELETE_PROTECTION_FINALIZER_SUFFIX
    )
}

/// Re-label a typed object with the negotiated schema version of its group.
///
/// The kinds negotiated here share one shape across versions, so only
/// `apiVersion` changes.
pub fn versioned<K>(obj: &K, schema: SchemaVersion) -> Result<DynamicObject>
where
    K: Resource<DynamicType = ()> + Serialize,
{
    let mut value = serde_json::to_value(obj)?;
    value["apiVersion"] = serde_json::Value::String(format!(
        "{}/{}",
        K::group(&()),
        schema.as_str()
    ));
    Ok(serde_json::from_value(value)?)
}

/// Write one object to the sink as a YAML document
pub fn write_object<T: Serialize>(out: &mut dyn Write, obj: &T) -> Result<()> {
    let yaml = serde_yaml::to_string(obj)?;
    out.write_all(b"---\n")?;
    out.write_all(yaml.as_bytes())?;
    out.flush()?;
    Ok(())
}
