// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Node plugin daemon set and controller deployment.
//!
//! Each build draws a fresh selector token and stamps it on both the
//! workload selector and the pod template, so a workload never adopts pods
//! left behind by an earlier installation.

use super::volumes::{host_path_volume, secret_volume, volume_mount};
use super::{created_by_annotations, delete_protection_finalizer, object_meta};
use crate::config::Config;
use crate::constants::{
    containers, names, paths, ports, selectors, volumes, APPARMOR_ANNOTATION_PREFIX,
};
use crate::naming::{conversion_healthz_url, image_ref, plugin_socket_dir, unique_selector_value};
use k8s_openapi::api::apps::v1::{DaemonSet, DaemonSetSpec, Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, EnvVar, EnvVarSource, HTTPGetAction, ObjectFieldSelector,
    PodSpec, PodTemplateSpec, Probe, SeccompProfile, SecurityContext, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::api::ObjectMeta;
use std::collections::BTreeMap;

const TERMINATION_MESSAGE_POLICY: &str = "FallbackToLogsOnError";

/// The selector token a workload was built with
pub fn selector_value(selector: &LabelSelector) -> Option<&str> {
    selector
        .match_labels
        .as_ref()
        .and_then(|labels| labels.get(selectors::DRIVER))
        .map(String::as_str)
}

fn workload_selector(selector_value: &str) -> LabelSelector {
    LabelSelector {
        match_labels: Some(BTreeMap::from([(
            selectors::DRIVER.to_string(),
            selector_value.to_string(),
        )])),
        ..Default::default()
    }
}

fn pod_template_meta(
    name: &str,
    selector_value: &str,
    annotations: BTreeMap<String, String>,
) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(name.to_string()),
        annotations: Some(annotations),
        labels: Some(BTreeMap::from([
            (selectors::DRIVER.to_string(), selector_value.to_string()),
            (selectors::WEBHOOK.to_string(), selectors::ENABLED.to_string()),
        ])),
        ..Default::default()
    }
}

fn node_name_env() -> EnvVar {
    EnvVar {
        name: containers::NODE_NAME_ENV.to_string(),
        value_from: Some(EnvVarSource {
            field_ref: Some(ObjectFieldSelector {
                api_version: Some("v1".to_string()),
                field_path: "spec.nodeName".to_string(),
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn endpoint_env() -> EnvVar {
    EnvVar {
        name: containers::ENDPOINT_ENV.to_string(),
        value: Some(paths::CSI_ENDPOINT.to_string()),
        ..Default::default()
    }
}

fn container_port(port: i32, name: &str) -> ContainerPort {
    ContainerPort {
        container_port: port,
        name: Some(name.to_string()),
        protocol: Some("TCP".to_string()),
        ..Default::default()
    }
}

/// Readiness is gated on the conversion webhook answering over TLS
fn conversion_readiness_probe() -> Probe {
    Probe {
        http_get: Some(HTTPGetAction {
            path: Some(ports::HEALTHZ_PATH.to_string()),
            port: IntOrString::String(ports::CONVERSION_WEBHOOK_NAME.to_string()),
            scheme: Some("HTTPS".to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn privileged() -> SecurityContext {
    SecurityContext {
        privileged: Some(true),
        ..Default::default()
    }
}

fn conversion_secret_volumes() -> [Volume; 2] {
    [
        secret_volume(names::CONVERSION_CA_CERT_SECRET, names::CONVERSION_CA_CERT_SECRET),
        secret_volume(names::CONVERSION_KEY_PAIR_SECRET, names::CONVERSION_KEY_PAIR_SECRET),
    ]
}

fn conversion_secret_mounts() -> [VolumeMount; 2] {
    [
        volume_mount(names::CONVERSION_CA_CERT_SECRET, paths::CONVERSION_CA_DIR, false, false),
        volume_mount(names::CONVERSION_KEY_PAIR_SECRET, paths::CONVERSION_CERTS_DIR, false, false),
    ]
}

fn socket_dir_mount() -> VolumeMount {
    volume_mount(volumes::SOCKET_DIR, paths::SOCKET_DIR, false, false)
}

fn node_volumes(config: &Config) -> (Vec<Volume>, Vec<VolumeMount>) {
    let name = config.name();
    let pods_dir = format!("{}/pods", paths::KUBELET_DIR);
    let plugins_dir = format!("{}/plugins", paths::KUBELET_DIR);

    let mut vols = vec![
        host_path_volume(volumes::SOCKET_DIR, &plugin_socket_dir(&name)),
        host_path_volume(volumes::MOUNTPOINT_DIR, &pods_dir),
        host_path_volume(
            volumes::REGISTRATION_DIR,
            &format!("{}/plugins_registry", paths::KUBELET_DIR),
        ),
        host_path_volume(volumes::PLUGINS_DIR, &plugins_dir),
        host_path_volume(volumes::DRIVER_ROOT, paths::DRIVER_ROOT),
    ];
    vols.extend(conversion_secret_volumes());

    let mut mounts = vec![
        socket_dir_mount(),
        volume_mount(volumes::MOUNTPOINT_DIR, &pods_dir, true, false),
        volume_mount(volumes::PLUGINS_DIR, &plugins_dir, true, false),
        volume_mount(volumes::DRIVER_ROOT, paths::DRIVER_ROOT, true, false),
    ];
    mounts.extend(conversion_secret_mounts());

    vols.push(host_path_volume(volumes::SYS_DIR, paths::SYS_DIR));
    mounts.push(volume_mount(volumes::SYS_DIR, paths::SYS_DIR, true, true));

    if config.dynamic_discovery {
        for (volume, path) in [
            (volumes::DEV_DIR, paths::DEV_DIR),
            (volumes::RUN_UDEV_DATA_DIR, paths::RUN_UDEV_DATA_DIR),
        ] {
            vols.push(host_path_volume(volume, path));
            mounts.push(volume_mount(volume, path, true, true));
        }
    }

    (vols, mounts)
}

fn node_driver_args(config: &Config) -> Vec<String> {
    let mut args = vec![
        format!("--identity={}", config.name()),
        format!("-v={}", containers::LOG_LEVEL),
        format!("--endpoint=$({})", containers::ENDPOINT_ENV),
        format!("--node-id=$({})", containers::NODE_NAME_ENV),
        format!("--conversion-healthz-url={}", conversion_healthz_url(&config.identity)),
        "--driver".to_string(),
    ];
    if config.loopback_only {
        args.push("--loopback-only".to_string());
    }
    if config.dynamic_discovery {
        args.push("--enable-dynamic-discovery".to_string());
    }
    args
}

fn node_driver_security_context(config: &Config) -> SecurityContext {
    let mut context = privileged();
    if let Some(profile) = config.seccomp_profile.as_deref().filter(|p| !p.is_empty()) {
        context.seccomp_profile = Some(SeccompProfile {
            type_: "Localhost".to_string(),
            localhost_profile: Some(profile.to_string()),
        });
    }
    context
}

fn node_pod_spec(config: &Config) -> PodSpec {
    let name = config.name();
    let (vols, driver_mounts) = node_volumes(config);

    let registrar = Container {
        name: containers::NODE_DRIVER_REGISTRAR.to_string(),
        image: Some(image_ref(
            &config.registry,
            &config.org,
            containers::NODE_DRIVER_REGISTRAR_IMAGE,
        )),
        args: Some(vec![
            format!("--v={}", containers::LOG_LEVEL),
            format!("--csi-address={}", paths::CSI_ENDPOINT),
            format!(
                "--kubelet-registration-path={}/csi.sock",
                plugin_socket_dir(&name)
            ),
        ]),
        env: Some(vec![node_name_env()]),
        volume_mounts: Some(vec![
            socket_dir_mount(),
            volume_mount(volumes::REGISTRATION_DIR, "/registration", false, false),
        ]),
        termination_message_policy: Some(TERMINATION_MESSAGE_POLICY.to_string()),
        termination_message_path: Some("/var/log/driver-registrar-termination-log".to_string()),
        ..Default::default()
    };

    let driver = Container {
        name: containers::DRIVER.to_string(),
        image: Some(image_ref(&config.registry, &config.org, &config.driver_image)),
        args: Some(node_driver_args(config)),
        security_context: Some(node_driver_security_context(config)),
        env: Some(vec![node_name_env(), endpoint_env()]),
        termination_message_policy: Some(TERMINATION_MESSAGE_POLICY.to_string()),
        termination_message_path: Some("/var/log/driver-termination-log".to_string()),
        volume_mounts: Some(driver_mounts),
        ports: Some(vec![
            container_port(ports::HEALTHZ, ports::HEALTHZ_NAME),
            container_port(ports::CONVERSION_WEBHOOK, ports::CONVERSION_WEBHOOK_NAME),
        ]),
        readiness_probe: Some(conversion_readiness_probe()),
        liveness_probe: Some(Probe {
            failure_threshold: Some(5),
            initial_delay_seconds: Some(300),
            timeout_seconds: Some(5),
            period_seconds: Some(5),
            http_get: Some(HTTPGetAction {
                path: Some(ports::HEALTHZ_PATH.to_string()),
                port: IntOrString::String(ports::HEALTHZ_NAME.to_string()),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    };

    let liveness = Container {
        name: containers::LIVENESS_PROBE.to_string(),
        image: Some(image_ref(
            &config.registry,
            &config.org,
            containers::LIVENESS_PROBE_IMAGE,
        )),
        args: Some(vec![
            "--csi-address=/csi/csi.sock".to_string(),
            format!("--health-port={}", ports::HEALTHZ),
        ]),
        termination_message_policy: Some(TERMINATION_MESSAGE_POLICY.to_string()),
        termination_message_path: Some(
            "/var/log/driver-liveness-termination-log".to_string(),
        ),
        volume_mounts: Some(vec![socket_dir_mount()]),
        ..Default::default()
    };

    let mut spec = PodSpec {
        service_account_name: Some(name),
        host_ipc: Some(true),
        host_pid: Some(true),
        volumes: Some(vols),
        containers: vec![registrar, driver, liveness],
        node_selector: (!config.node_selector.is_empty()).then(|| config.node_selector.clone()),
        tolerations: (!config.tolerations.is_empty()).then(|| config.tolerations.clone()),
        ..Default::default()
    };

    if config.dynamic_discovery {
        spec.host_network = Some(true);
        spec.dns_policy = Some("ClusterFirstWithHostNet".to_string());
    }

    spec
}

/// Node plugin, one pod per eligible node
pub fn daemon_set(config: &Config) -> DaemonSet {
    let name = config.name();
    let selector_value = unique_selector_value(&name);

    let mut annotations = created_by_annotations();
    if let Some(profile) = config.apparmor_profile.as_deref().filter(|p| !p.is_empty()) {
        annotations.insert(
            format!("{}{}", APPARMOR_ANNOTATION_PREFIX, containers::DRIVER),
            profile.to_string(),
        );
    }

    DaemonSet {
        metadata: object_meta(&config.identity),
        spec: Some(DaemonSetSpec {
            selector: workload_selector(&selector_value),
            template: PodTemplateSpec {
                metadata: Some(pod_template_meta(&name, &selector_value, annotations)),
                spec: Some(node_pod_spec(config)),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn controller_pod_spec(config: &Config) -> PodSpec {
    let name = config.name();

    let mut vols = vec![
        host_path_volume(
            volumes::SOCKET_DIR,
            &plugin_socket_dir(&format!("{}-controller", name)),
        ),
        secret_volume(volumes::ADMISSION_CERTS, names::ADMISSION_WEBHOOK_SECRET),
    ];
    vols.extend(conversion_secret_volumes());

    let mut driver_mounts = vec![
        socket_dir_mount(),
        volume_mount(volumes::ADMISSION_CERTS, paths::ADMISSION_CERTS_DIR, false, false),
    ];
    driver_mounts.extend(conversion_secret_mounts());

    let provisioner = Container {
        name: containers::CSI_PROVISIONER.to_string(),
        image: Some(image_ref(
            &config.registry,
            &config.org,
            containers::CSI_PROVISIONER_IMAGE,
        )),
        args: Some(vec![
            format!("--v={}", containers::LOG_LEVEL),
            "--timeout=300s".to_string(),
            format!("--csi-address=$({})", containers::ENDPOINT_ENV),
            "--leader-election".to_string(),
            "--feature-gates=Topology=true".to_string(),
            "--strict-topology".to_string(),
        ]),
        env: Some(vec![endpoint_env()]),
        volume_mounts: Some(vec![socket_dir_mount()]),
        termination_message_policy: Some(TERMINATION_MESSAGE_POLICY.to_string()),
        termination_message_path: Some(
            "/var/log/controller-provisioner-termination-log".to_string(),
        ),
        security_context: Some(privileged()),
        ..Default::default()
    };

    let driver = Container {
        name: containers::DRIVER.to_string(),
        image: Some(image_ref(&config.registry, &config.org, &config.driver_image)),
        args: Some(vec![
            format!("-v={}", containers::LOG_LEVEL),
            format!("--identity={}", name),
            format!("--endpoint=$({})", containers::ENDPOINT_ENV),
            format!("--conversion-healthz-url={}", conversion_healthz_url(&config.identity)),
            "--controller".to_string(),
        ]),
        security_context: Some(privileged()),
        ports: Some(vec![
            container_port(ports::ADMISSION_WEBHOOK, ports::ADMISSION_WEBHOOK_NAME),
            container_port(ports::HEALTHZ, ports::HEALTHZ_NAME),
            container_port(ports::CONVERSION_WEBHOOK, ports::CONVERSION_WEBHOOK_NAME),
        ]),
        readiness_probe: Some(conversion_readiness_probe()),
        env: Some(vec![node_name_env(), endpoint_env()]),
        volume_mounts: Some(driver_mounts),
        ..Default::default()
    };

    PodSpec {
        service_account_name: Some(name),
        volumes: Some(vols),
        containers: vec![provisioner, driver],
        ..Default::default()
    }
}

/// Controller replicas serving provisioning and the validating webhook
pub fn deployment(config: &Config) -> Deployment {
    let name = config.name();
    let selector_value = unique_selector_value(&name);

    let mut metadata = object_meta(&config.identity);
    metadata.finalizers = Some(vec![delete_protection_finalizer(&config.identity)]);

    Deployment {
        metadata,
        spec: Some(DeploymentSpec {
            replicas: Some(containers::CONTROLLER_REPLICAS),
            selector: workload_selector(&selector_value),
            template: PodTemplateSpec {
                metadata: Some(pod_template_meta(
                    &name,
                    &selector_value,
                    created_by_annotations(),
                )),
                spec: Some(controller_pod_spec(config)),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}
