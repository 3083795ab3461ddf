// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Namespace, services and secrets.

use super::{cluster_object_meta, named_object_meta, object_meta};
use crate::certs::TlsBundle;
use crate::constants::{names, ports, secret_keys, selectors};
use k8s_openapi::api::core::v1::{Namespace, NamespaceSpec, Secret, Service, ServicePort, ServiceSpec};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use k8s_openapi::ByteString;
use std::collections::BTreeMap;

pub fn namespace(identity: &str) -> Namespace {
    Namespace {
        metadata: cluster_object_meta(identity),
        spec: Some(NamespaceSpec {
            finalizers: Some(Vec::new()),
        }),
        ..Default::default()
    }
}

/// Service fronting the conversion webhook of every driver pod
pub fn driver_service(identity: &str) -> Service {
    let unused = ServicePort {
        name: Some(ports::UNUSED_NAME.to_string()),
        port: ports::UNUSED,
        ..Default::default()
    };
    let conversion_webhook = ServicePort {
        name: Some(ports::CONVERSION_WEBHOOK_NAME.to_string()),
        port: ports::CONVERSION_WEBHOOK,
        target_port: Some(IntOrString::String(
            ports::CONVERSION_WEBHOOK_NAME.to_string(),
        )),
        ..Default::default()
    };

    Service {
        metadata: object_meta(identity),
        spec: Some(ServiceSpec {
            ports: Some(vec![unused, conversion_webhook]),
            selector: Some(BTreeMap::from([(
                selectors::WEBHOOK.to_string(),
                selectors::ENABLED.to_string(),
            )])),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Service routing admission reviews to the controller pods of one deployment.
///
/// `selector_value` must be the token the deployment was built with.
pub fn validation_controller_service(identity: &str, selector_value: &str) -> Service {
    let admission_webhook = ServicePort {
        port: ports::ADMISSION_WEBHOOK,
        target_port: Some(IntOrString::String(
            ports::ADMISSION_WEBHOOK_NAME.to_string(),
        )),
        ..Default::default()
    };

    Service {
        metadata: named_object_meta(names::VALIDATION_CONTROLLER, identity),
        spec: Some(ServiceSpec {
            ports: Some(vec![admission_webhook]),
            selector: Some(BTreeMap::from([(
                selectors::DRIVER.to_string(),
                selector_value.to_string(),
            )])),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn tls_secret(name: &str, identity: &str, data: BTreeMap<String, ByteString>) -> Secret {
    Secret {
        metadata: named_object_meta(name, identity),
        data: Some(data),
        ..Default::default()
    }
}

fn key_pair_data(bundle: &TlsBundle) -> BTreeMap<String, ByteString> {
    BTreeMap::from([
        (
            secret_keys::PRIVATE_KEY.to_string(),
            ByteString(bundle.private_key.clone()),
        ),
        (
            secret_keys::PUBLIC_CERT.to_string(),
            ByteString(bundle.public_cert.clone()),
        ),
    ])
}

/// Serving key pair of the validation controller
pub fn admission_secret(identity: &str, bundle: &TlsBundle) -> Secret {
    tls_secret(names::ADMISSION_WEBHOOK_SECRET, identity, key_pair_data(bundle))
}

/// Serving key pair of the conversion webhook
pub fn conversion_key_pair_secret(identity: &str, bundle: &TlsBundle) -> Secret {
    tls_secret(names::CONVERSION_KEY_PAIR_SECRET, identity, key_pair_data(bundle))
}

/// CA the driver uses to verify the conversion webhook
pub fn conversion_ca_secret(identity: &str, bundle: &TlsBundle) -> Secret {
    tls_secret(
        names::CONVERSION_CA_CERT_SECRET,
        identity,
        BTreeMap::from([(
            secret_keys::CA_CERT.to_string(),
            ByteString(bundle.ca_cert.clone()),
        )]),
    )
}
