// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use super::{cluster_object_meta, delete_protection_finalizer};
use crate::certs::CaBundle;
use crate::constants::names;
use crate::naming::sanitize_resource_name;
use k8s_openapi::api::admissionregistration::v1::{
    RuleWithOperations, ServiceReference, ValidatingWebhook, ValidatingWebhookConfiguration,
    WebhookClientConfig,
};

const REVIEW_VERSIONS: [&str; 4] = ["v1", "v1beta1", "v1beta2", "v1beta3"];
const VALIDATE_DRIVE_PATH: &str = "/validatedrive";

/// Validating webhook guarding drive updates, trusting `ca_bundle`
pub fn drive_validating_webhook(
    identity: &str,
    ca_bundle: &CaBundle,
) -> ValidatingWebhookConfiguration {
    let client_config = WebhookClientConfig {
        service: Some(ServiceReference {
            namespace: sanitize_resource_name(identity),
            name: names::VALIDATION_CONTROLLER.to_string(),
            path: Some(VALIDATE_DRIVE_PATH.to_string()),
            ..Default::default()
        }),
        ca_bundle: Some(ca_bundle.to_byte_string()),
        ..Default::default()
    };

    let rule = RuleWithOperations {
        operations: Some(vec!["UPDATE".to_string()]),
        api_groups: Some(vec!["*".to_string()]),
        api_versions: Some(vec!["*".to_string()]),
        resources: Some(vec![names::DRIVE_RESOURCE.to_string()]),
        ..Default::default()
    };

    let webhook = ValidatingWebhook {
        name: names::VALIDATION_WEBHOOK_CONFIG.to_string(),
        client_config,
        admission_review_versions: REVIEW_VERSIONS.iter().map(|v| v.to_string()).collect(),
        side_effects: "None".to_string(),
        rules: Some(vec![rule]),
        ..Default::default()
    };

    let mut metadata = cluster_object_meta(identity);
    metadata.name = Some(names::VALIDATION_WEBHOOK_CONFIG.to_string());
    metadata.finalizers = Some(vec![delete_protection_finalizer(identity)]);

    ValidatingWebhookConfiguration {
        metadata,
        webhooks: Some(vec![webhook]),
    }
}
