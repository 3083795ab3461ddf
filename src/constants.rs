// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// Metadata stamped on every object the installer creates
pub mod meta {
    /// Annotation key recording which tool created the object
    pub const CREATED_BY: &str = "created-by";
    pub const CREATED_BY_VALUE: &str = "localdrive-installer";
    pub const APP_LABEL: &str = "app";
    pub const APP_VALUE: &str = "localdrive";
    pub const TYPE_LABEL: &str = "type";
    pub const TYPE_VALUE: &str = "CSIDriver";
    /// Appended to the sanitized identity to form the delete-protection finalizer
    pub const DELETE_PROTECTION_FINALIZER_SUFFIX: &str = "/delete-protection";
}

/// Label keys used to tie workloads, services and webhooks together
pub mod selectors {
    pub const DRIVER: &str = "selector.localdrive.csi.io";
    pub const WEBHOOK: &str = "selector.localdrive.csi.io.webhook";
    pub const ENABLED: &str = "enabled";
    /// Node topology label the driver publishes its identity under
    pub const TOPOLOGY_DRIVER_IDENTITY: &str = "localdrive.csi.io/identity";
}

/// Fixed object names
pub mod names {
    pub const VALIDATION_CONTROLLER: &str = "localdrive-validation-controller";
    pub const VALIDATION_WEBHOOK_CONFIG: &str = "drive.validation.controller";
    pub const ADMISSION_WEBHOOK_SECRET: &str = "validationwebhookcerts";
    pub const CONVERSION_KEY_PAIR_SECRET: &str = "conversionkeypair";
    pub const CONVERSION_CA_CERT_SECRET: &str = "conversioncacert";
    /// Resource the validating webhook guards
    pub const DRIVE_RESOURCE: &str = "localdrives";
}

/// Keys inside the TLS secrets
pub mod secret_keys {
    pub const PRIVATE_KEY: &str = "key.pem";
    pub const PUBLIC_CERT: &str = "cert.pem";
    pub const CA_CERT: &str = "ca.pem";
}

pub mod ports {
    pub const CONVERSION_WEBHOOK: i32 = 30443;
    pub const CONVERSION_WEBHOOK_NAME: &str = "convwebhook";
    pub const ADMISSION_WEBHOOK: i32 = 443;
    pub const ADMISSION_WEBHOOK_NAME: &str = "validatinghook";
    pub const HEALTHZ: i32 = 9898;
    pub const HEALTHZ_NAME: &str = "healthz";
    pub const HEALTHZ_PATH: &str = "/healthz";
    /// Placeholder port, a service needs at least one
    pub const UNUSED: i32 = 12345;
    pub const UNUSED_NAME: &str = "unused";
}

/// Host and container paths
pub mod paths {
    pub const KUBELET_DIR: &str = "/var/lib/kubelet";
    pub const DRIVER_ROOT: &str = "/var/lib/localdrive/";
    pub const SOCKET_DIR: &str = "/csi";
    pub const CSI_ENDPOINT: &str = "unix:///csi/csi.sock";
    pub const SYS_DIR: &str = "/sys";
    pub const DEV_DIR: &str = "/dev";
    pub const RUN_UDEV_DATA_DIR: &str = "/run/udev/data";
    pub const CONVERSION_CA_DIR: &str = "/etc/conversion/CAs";
    pub const CONVERSION_CERTS_DIR: &str = "/etc/conversion/certs";
    pub const ADMISSION_CERTS_DIR: &str = "/etc/admission/certs";
}

pub mod volumes {
    pub const SOCKET_DIR: &str = "socket-dir";
    pub const MOUNTPOINT_DIR: &str = "mountpoint-dir";
    pub const REGISTRATION_DIR: &str = "registration-dir";
    pub const PLUGINS_DIR: &str = "plugins-dir";
    pub const DRIVER_ROOT: &str = "localdrive-common-root";
    pub const SYS_DIR: &str = "sysfs";
    pub const DEV_DIR: &str = "devfs";
    pub const RUN_UDEV_DATA_DIR: &str = "run-udev-data-dir";
    pub const ADMISSION_CERTS: &str = "admission-webhook-certs";
}

pub mod containers {
    pub const DRIVER: &str = "localdrive";
    pub const NODE_DRIVER_REGISTRAR: &str = "node-driver-registrar";
    pub const LIVENESS_PROBE: &str = "liveness-probe";
    pub const CSI_PROVISIONER: &str = "csi-provisioner";

    pub const NODE_DRIVER_REGISTRAR_IMAGE: &str = "csi-node-driver-registrar:v2.2.0";
    pub const LIVENESS_PROBE_IMAGE: &str = "livenessprobe:v2.2.0";
    pub const CSI_PROVISIONER_IMAGE: &str = "csi-provisioner:v2.2.0";

    pub const LOG_LEVEL: u8 = 3;
    pub const ENDPOINT_ENV: &str = "CSI_ENDPOINT";
    pub const NODE_NAME_ENV: &str = "KUBE_NODE_NAME";
    pub const CONTROLLER_REPLICAS: i32 = 3;
}

/// Pod annotation prefix that binds an AppArmor profile to a container
pub const APPARMOR_ANNOTATION_PREFIX: &str = "container.apparmor.security.beta.kubernetes.io/";
