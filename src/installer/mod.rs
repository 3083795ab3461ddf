// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Installer operations.
//!
//! Every operation builds its object, writes it to the output sink when one
//! is configured (dry-run included) and, unless running dry, creates it
//! through the API.

mod webhooks;

use crate::certs::{CaBundle, CertificateAuthority};
use crate::config::Config;
use crate::error::{InstallerError, Result};
use crate::kubernetes::{negotiate, SchemaVersion};
use crate::manifests::{resources, storage, versioned, workloads, write_object};
use k8s_openapi::api::apps::v1::DaemonSet;
use k8s_openapi::api::core::v1::{Namespace, Service};
use kube::{
    api::{DynamicObject, PostParams},
    Api, Client, Resource, ResourceExt,
};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Debug;
use std::io::Write;
use tracing::{debug, info, instrument};

const STORAGE_GROUP: &str = "storage.k8s.io";

pub struct Installer {
    client: Client,
    config: Config,
    authority: Box<dyn CertificateAuthority + Send + Sync>,
    output: Option<Box<dyn Write + Send>>,
}

impl Installer {
    /// Fails when the identity sanitizes to an empty name.
    pub fn new(
        client: Client,
        config: Config,
        authority: impl CertificateAuthority + Send + Sync + 'static,
    ) -> Result<Self> {
        if config.name().is_empty() {
            return Err(InstallerError::InvalidIdentity(config.identity));
        }
        Ok(Self {
            client,
            config,
            authority: Box::new(authority),
            output: None,
        })
    }

    /// Write every generated object to `output` as YAML
    pub fn with_output(mut self, output: impl Write + Send + 'static) -> Self {
        self.output = Some(Box::new(output));
        self
    }

    fn name(&self) -> String {
        self.config.name()
    }

    fn emit<T: Serialize>(&mut self, obj: &T) -> Result<()> {
        if let Some(out) = self.output.as_mut() {
            write_object(out.as_mut(), obj)?;
        }
        Ok(())
    }

    /// Emit `obj`, then create it unless running dry
    async fn submit<K>(&mut self, api: Api<K>, kind: &str, obj: &K) -> Result<()>
    where
        K: Resource + Clone + Debug + Serialize + DeserializeOwned,
    {
        self.emit(obj)?;

        let name = obj.name_any();
        if self.config.dry_run {
            debug!(
                "Dry run, not creating {} {}:\n{}",
                kind,
                name,
                serde_yaml::to_string(obj)?
            );
            return Ok(());
        }

        api.create(&PostParams::default(), obj).await?;
        info!("{} {} created", kind, name);
        Ok(())
    }

    /// Submit a `storage.k8s.io` object in the schema version the cluster serves
    async fn submit_storage_object<K>(&mut self, kind: &str, obj: &K) -> Result<()>
    where
        K: Resource<DynamicType = ()> + Serialize,
    {
        let schema = negotiate(&self.client, STORAGE_GROUP, kind, &SchemaVersion::PREFERENCE).await?;
        let obj = versioned(obj, schema)?;
        let api: Api<DynamicObject> =
            Api::all_with(self.client.clone(), &schema.api_resource(STORAGE_GROUP, kind));
        self.submit(api, kind, &obj).await
    }

    #[instrument(skip(self), fields(identity = %self.config.identity))]
    pub async fn create_namespace(&mut self) -> Result<()> {
        let ns = resources::namespace(&self.config.identity);
        let api: Api<Namespace> = Api::all(self.client.clone());
        self.submit(api, "Namespace", &ns).await
    }

    #[instrument(skip(self), fields(identity = %self.config.identity))]
    pub async fn create_csi_driver(&mut self) -> Result<()> {
        let driver = storage::csi_driver(&self.config.identity);
        self.submit_storage_object("CSIDriver", &driver).await
    }

    #[instrument(skip(self), fields(identity = %self.config.identity))]
    pub async fn create_storage_class(&mut self) -> Result<()> {
        let class = storage::storage_class(&self.config.identity);
        self.submit_storage_object("StorageClass", &class).await
    }

    #[instrument(skip(self), fields(identity = %self.config.identity))]
    pub async fn create_service(&mut self) -> Result<()> {
        let svc = resources::driver_service(&self.config.identity);
        let api: Api<Service> = Api::namespaced(self.client.clone(), &self.name());
        self.submit(api, "Service", &svc).await
    }

    #[instrument(skip(self), fields(identity = %self.config.identity))]
    pub async fn create_daemon_set(&mut self) -> Result<()> {
        let ds = workloads::daemon_set(&self.config);
        let api: Api<DaemonSet> = Api::namespaced(self.client.clone(), &self.name());
        self.submit(api, "DaemonSet", &ds).await
    }

    /// Run every installation step in order.
    ///
    /// Stops at the first failing step. Returns the conversion webhook CA
    /// bundle for wiring CRD conversion.
    pub async fn install(&mut self) -> Result<CaBundle> {
        let identity = self.config.identity.clone();
        info!(
            "Installing driver '{}' (dry_run={})",
            identity, self.config.dry_run
        );

        self.create_namespace()
            .await
            .map_err(step_failed("namespace", &identity))?;
        self.create_csi_driver()
            .await
            .map_err(step_failed("csi-driver", &identity))?;
        self.create_storage_class()
            .await
            .map_err(step_failed("storage-class", &identity))?;
        self.create_service()
            .await
            .map_err(step_failed("service", &identity))?;
        self.create_daemon_set()
            .await
            .map_err(step_failed("daemonset", &identity))?;
        let admission_ca = self
            .create_deployment()
            .await
            .map_err(step_failed("deployment", &identity))?;
        self.register_drive_validation_rules(&admission_ca)
            .await
            .map_err(step_failed("validation-rules", &identity))?;
        let issued = self
            .create_conversion_webhook_secrets()
            .await
            .map_err(step_failed("conversion-secrets", &identity))?;

        let conversion_ca = match issued {
            Some(ca) => ca,
            None => self
                .conversion_ca_bundle(None)
                .await
                .map_err(step_failed("conversion-ca-bundle", &identity))?,
        };

        info!("Driver '{}' installed", identity);
        Ok(conversion_ca)
    }
}

fn step_failed(step: &'static str, identity: &str) -> impl FnOnce(InstallerError) -> InstallerError {
    let identity = identity.to_string();
    move |source| InstallerError::InstallationFailed {
        step,
        identity,
        source: Box::new(source),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MockService, SharedBuffer, StaticAuthority};
    use k8s_openapi::api::apps::v1::Deployment;
    use k8s_openapi::api::core::v1::Secret;
    use k8s_openapi::api::storage::v1::StorageClass;

    fn storage_cluster(versions: &[&str]) -> MockService {
        MockService::new().with_api_group(
            "storage.k8s.io",
            versions,
            &[("csidrivers", "CSIDriver"), ("storageclasses", "StorageClass")],
        )
    }

    fn make_installer(mock: &MockService, dry_run: bool) -> (Installer, SharedBuffer) {
        let mut config = Config::new("my-driver");
        config.dry_run = dry_run;
        let buffer = SharedBuffer::default();
        let installer = Installer::new(mock.clone().into_client(), config, StaticAuthority::new())
            .unwrap()
            .with_output(buffer.clone());
        (installer, buffer)
    }

    #[tokio::test]
    async fn test_identity_without_legal_name_rejected() {
        let mock = MockService::new();
        let mut config = Config::new("...");
        config.dry_run = true;

        let err = Installer::new(mock.clone().into_client(), config, StaticAuthority::new())
            .err()
            .unwrap();

        assert!(matches!(err, InstallerError::InvalidIdentity(ref id) if id == "..."));
        assert!(mock.requests().is_empty());
    }

    #[tokio::test]
    async fn test_dry_run_namespace_writes_yaml_without_api_calls() {
        let mock = MockService::new();
        let (mut installer, buffer) = make_installer(&mock, true);

        installer.create_namespace().await.unwrap();

        let yaml = buffer.contents();
        assert!(yaml.contains("kind: Namespace"));
        assert!(yaml.contains("name: my-driver"));
        assert!(mock.requests().is_empty());
    }

    #[tokio::test]
    async fn test_create_namespace() {
        let mock = MockService::new();
        let (mut installer, buffer) = make_installer(&mock, false);

        installer.create_namespace().await.unwrap();

        let ns: Namespace = mock.stored("/api/v1/namespaces/my-driver").unwrap();
        assert_eq!(ns.metadata.labels.unwrap().get("app").unwrap(), "localdrive");
        assert!(buffer.contents().contains("kind: Namespace"));
    }

    #[tokio::test]
    async fn test_create_failure_surfaces() {
        let mock = MockService::new().with_object(
            "/api/v1/namespaces/my-driver",
            serde_json::json!({"apiVersion": "v1", "kind": "Namespace", "metadata": {"name": "my-driver"}}),
        );
        let (mut installer, _) = make_installer(&mock, false);

        let err = installer.create_namespace().await.unwrap_err();
        assert!(err.is_already_exists());
    }

    #[tokio::test]
    async fn test_csi_driver_created_in_v1() {
        let mock = storage_cluster(&["v1", "v1beta1"]);
        let (mut installer, _) = make_installer(&mock, false);

        installer.create_csi_driver().await.unwrap();

        let posts = mock.requests_with_method("POST");
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].path, "/apis/storage.k8s.io/v1/csidrivers");
    }

    #[tokio::test]
    async fn test_storage_class_created_in_beta_on_old_clusters() {
        let mock = storage_cluster(&["v1beta1"]);
        let (mut installer, buffer) = make_installer(&mock, false);

        installer.create_storage_class().await.unwrap();

        let stored: serde_json::Value = mock
            .stored("/apis/storage.k8s.io/v1beta1/storageclasses/my-driver")
            .unwrap();
        assert_eq!(stored["apiVersion"], "storage.k8s.io/v1beta1");
        assert_eq!(stored["provisioner"], "my-driver");
        assert!(buffer.contents().contains("apiVersion: storage.k8s.io/v1beta1"));
    }

    #[tokio::test]
    async fn test_unsupported_storage_version_issues_no_create() {
        let mock = storage_cluster(&["v1alpha1"]);
        let (mut installer, buffer) = make_installer(&mock, false);

        let err = installer.create_csi_driver().await.unwrap_err();

        assert!(matches!(err, InstallerError::UnsupportedVersion { .. }));
        assert!(mock.requests_with_method("POST").is_empty());
        assert!(buffer.contents().is_empty());
    }

    #[tokio::test]
    async fn test_service_and_daemon_set_in_identity_namespace() {
        let mock = MockService::new();
        let (mut installer, _) = make_installer(&mock, false);

        installer.create_service().await.unwrap();
        installer.create_daemon_set().await.unwrap();

        let svc: Service = mock
            .stored("/api/v1/namespaces/my-driver/services/my-driver")
            .unwrap();
        assert_eq!(svc.spec.unwrap().ports.unwrap().len(), 2);
        let ds: DaemonSet = mock
            .stored("/apis/apps/v1/namespaces/my-driver/daemonsets/my-driver")
            .unwrap();
        assert!(ds.spec.is_some());
    }

    #[tokio::test]
    async fn test_install_creates_everything() {
        let mock = storage_cluster(&["v1"]);
        let (mut installer, buffer) = make_installer(&mock, false);

        let conversion_ca = installer.install().await.unwrap();
        assert_eq!(conversion_ca.as_bytes(), b"ca:my-driver.my-driver.svc");

        let class: StorageClass = mock
            .stored("/apis/storage.k8s.io/v1/storageclasses/my-driver")
            .unwrap();
        assert_eq!(class.provisioner, "my-driver");

        let deployment: Deployment = mock
            .stored("/apis/apps/v1/namespaces/my-driver/deployments/my-driver")
            .unwrap();
        let controller: Service = mock
            .stored("/api/v1/namespaces/my-driver/services/localdrive-validation-controller")
            .unwrap();
        let token = workloads::selector_value(&deployment.spec.unwrap().selector)
            .unwrap()
            .to_string();
        assert_eq!(
            controller.spec.unwrap().selector.unwrap().get("selector.localdrive.csi.io"),
            Some(&token)
        );
        assert_eq!(controller.metadata.namespace, deployment.metadata.namespace);

        for name in ["validationwebhookcerts", "conversionkeypair", "conversioncacert"] {
            let secret: Option<Secret> =
                mock.stored(&format!("/api/v1/namespaces/my-driver/secrets/{}", name));
            assert!(secret.is_some(), "missing secret {}", name);
        }

        let yaml = buffer.contents();
        for kind in [
            "kind: Namespace",
            "kind: CSIDriver",
            "kind: StorageClass",
            "kind: Service",
            "kind: DaemonSet",
            "kind: Deployment",
            "kind: Secret",
            "kind: ValidatingWebhookConfiguration",
        ] {
            assert!(yaml.contains(kind), "output is missing {}", kind);
        }
    }

    #[tokio::test]
    async fn test_dry_run_install_only_discovers() {
        let mock = storage_cluster(&["v1"]);
        let (mut installer, buffer) = make_installer(&mock, true);

        installer.install().await.unwrap();

        assert!(mock
            .requests()
            .iter()
            .all(|r| r.method == "GET" && r.path.starts_with("/apis")));
        assert!(mock
            .requests()
            .iter()
            .all(|r| !r.path.contains("/namespaces/")));
        assert!(buffer.contents().contains("kind: ValidatingWebhookConfiguration"));
    }

    #[tokio::test]
    async fn test_rerun_fails_at_first_existing_object() {
        let mock = storage_cluster(&["v1"]);
        let (mut installer, _) = make_installer(&mock, false);
        installer.install().await.unwrap();

        let (mut rerun, _) = make_installer(&mock, false);
        let err = rerun.install().await.unwrap_err();

        match err {
            InstallerError::InstallationFailed {
                step,
                identity,
                source,
            } => {
                assert_eq!(step, "namespace");
                assert_eq!(identity, "my-driver");
                assert!(source.is_already_exists());
            }
            other => panic!("unexpected error: {}", other),
        }
    }
}
