// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Validation controller, admission rules and conversion webhook TLS.

use super::Installer;
use crate::certs::{CaBundle, TlsBundle};
use crate::constants::{names, secret_keys};
use crate::error::{InstallerError, Result};
use crate::kubernetes::reconcile_secret;
use crate::manifests::{resources, webhook, workloads};
use crate::naming::{admission_webhook_dns_name, conversion_webhook_dns_name};
use k8s_openapi::api::admissionregistration::v1::ValidatingWebhookConfiguration;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Secret, Service};
use kube::Api;
use tracing::{debug, info, instrument, warn};

impl Installer {
    /// Create the validation controller deployment with its TLS secret and
    /// service. Returns the CA bundle that signed the controller's certificate.
    #[instrument(skip(self), fields(identity = %self.config.identity))]
    pub async fn create_deployment(&mut self) -> Result<CaBundle> {
        let bundle = self
            .authority
            .issue(&[admission_webhook_dns_name(&self.config.identity)])?;
        let ca = bundle.ca_bundle()?;

        self.create_admission_secret(&bundle).await?;

        let deployment = workloads::deployment(&self.config);
        let selector_value = deployment
            .spec
            .as_ref()
            .and_then(|spec| workloads::selector_value(&spec.selector))
            .unwrap_or_default()
            .to_string();

        let api: Api<Deployment> = Api::namespaced(self.client.clone(), &self.name());
        self.submit(api, "Deployment", &deployment).await?;

        self.create_validation_controller_service(&selector_value)
            .await?;
        Ok(ca)
    }

    async fn create_admission_secret(&mut self, bundle: &TlsBundle) -> Result<()> {
        let secret = resources::admission_secret(&self.config.identity, bundle);
        let api: Api<Secret> = Api::namespaced(self.client.clone(), &self.name());
        match self.submit(api, "Secret", &secret).await {
            Err(e) if e.is_already_exists() => {
                warn!(
                    "Secret {} already exists, keeping it",
                    names::ADMISSION_WEBHOOK_SECRET
                );
                Ok(())
            }
            other => other,
        }
    }

    async fn create_validation_controller_service(&mut self, selector_value: &str) -> Result<()> {
        let svc = resources::validation_controller_service(&self.config.identity, selector_value);
        let api: Api<Service> = Api::namespaced(self.client.clone(), &self.name());
        self.submit(api, "Service", &svc).await
    }

    /// Register the validating webhook for drive updates, trusting `ca`
    #[instrument(skip(self, ca), fields(identity = %self.config.identity))]
    pub async fn register_drive_validation_rules(&mut self, ca: &CaBundle) -> Result<()> {
        let config = webhook::drive_validating_webhook(&self.config.identity, ca);
        let api: Api<ValidatingWebhookConfiguration> = Api::all(self.client.clone());
        self.submit(api, "ValidatingWebhookConfiguration", &config)
            .await
    }

    /// Make sure the conversion webhook key pair and CA secrets exist.
    ///
    /// Returns the freshly issued CA bundle, or `None` when both secrets were
    /// already present and nothing was touched. Dry-run always issues.
    #[instrument(skip(self), fields(identity = %self.config.identity))]
    pub async fn create_conversion_webhook_secrets(&mut self) -> Result<Option<CaBundle>> {
        if !self.config.dry_run {
            match self.conversion_secrets_present().await {
                Ok(()) => {
                    info!("Conversion webhook secrets present, leaving them alone");
                    return Ok(None);
                }
                Err(e) if e.is_not_found() => {
                    debug!("Conversion webhook secrets incomplete, issuing new ones");
                }
                Err(e) => return Err(e),
            }
        }

        let bundle = self
            .authority
            .issue(&[conversion_webhook_dns_name(&self.config.identity)])?;
        let ca = bundle.ca_bundle()?;

        let key_pair = resources::conversion_key_pair_secret(&self.config.identity, &bundle);
        self.converge_secret(key_pair).await?;
        let ca_secret = resources::conversion_ca_secret(&self.config.identity, &bundle);
        self.converge_secret(ca_secret).await?;

        Ok(Some(ca))
    }

    /// Emit `secret`, then reconcile it into the identity namespace
    async fn converge_secret(&mut self, secret: Secret) -> Result<()> {
        self.emit(&secret)?;
        reconcile_secret(&self.client, &self.name(), secret, self.config.dry_run).await
    }

    async fn conversion_secrets_present(&self) -> Result<()> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), &self.name());
        api.get(names::CONVERSION_KEY_PAIR_SECRET).await?;
        api.get(names::CONVERSION_CA_CERT_SECRET).await?;
        Ok(())
    }

    /// Read the conversion CA bundle back from the cluster.
    ///
    /// In dry-run a missing secret yields `fallback` instead.
    #[instrument(skip(self, fallback), fields(identity = %self.config.identity))]
    pub async fn conversion_ca_bundle(&self, fallback: Option<&CaBundle>) -> Result<CaBundle> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), &self.name());
        match api.get(names::CONVERSION_CA_CERT_SECRET).await {
            Ok(secret) => {
                let ca = secret
                    .data
                    .and_then(|mut data| data.remove(secret_keys::CA_CERT))
                    .ok_or(InstallerError::EmptyCaBundle)?;
                CaBundle::new(ca.0)
            }
            Err(kube::Error::Api(err)) if err.code == 404 && self.config.dry_run => {
                debug!("Dry run, conversion CA secret not in cluster");
                fallback.cloned().ok_or(InstallerError::EmptyCaBundle)
            }
            Err(e) => Err(e.into()),
        }
    }
}
