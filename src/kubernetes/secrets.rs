// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Get-or-create-or-update for TLS secrets

use crate::error::Result;
use k8s_openapi::api::core::v1::Secret;
use kube::{api::PostParams, Api, Client, ResourceExt};
use tracing::{debug, info, instrument};

/// Converge `secret` in `namespace` to the supplied data.
///
/// Creates the secret when absent, otherwise replaces the data of the
/// existing object in place. Nothing is sent in dry-run.
///
/// Does not write to any output sink; callers emit the secret first.
#[instrument(skip(client, secret), fields(secret = %secret.name_any()))]
pub async fn reconcile_secret(
    client: &Client,
    namespace: &str,
    secret: Secret,
    dry_run: bool,
) -> Result<()> {
    let name = secret.name_any();
    if dry_run {
        debug!("Dry run, not reconciling secret {}/{}", namespace, name);
        return Ok(());
    }

    let secrets: Api<Secret> = Api::namespaced(client.clone(), namespace);

    match secrets.get(&name).await {
        Ok(mut existing) => {
            existing.data = secret.data;
            secrets
                .replace(&name, &PostParams::default(), &existing)
                .await?;
            info!("Secret {}/{} updated", namespace, name);
            Ok(())
        }
        Err(kube::Error::Api(err)) if err.code == 404 => {
            secrets.create(&PostParams::default(), &secret).await?;
            info!("Secret {}/{} created", namespace, name);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
