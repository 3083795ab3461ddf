// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::{Context, Result};
use kube::Client;
use std::fs::File;
use std::io::BufWriter;
use tracing::info;

use localdrive_installer::certs::FileAuthority;
use localdrive_installer::config::Config;
use localdrive_installer::installer::Installer;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    info!("Starting localdrive installer");

    // Load configuration
    let config = Config::from_env()?;
    info!(
        "Configuration loaded: identity={} dry_run={} certs_dir={}",
        config.identity,
        config.dry_run,
        config.certs_dir.display()
    );

    // Create Kubernetes client
    let client = Client::try_default().await?;
    info!("Connected to Kubernetes cluster");

    let authority = FileAuthority::new(config.certs_dir.clone());
    let output_file = config.output_file.clone();
    let mut installer = Installer::new(client, config, authority)?;

    if let Some(path) = output_file {
        let file = File::create(&path)
            .with_context(|| format!("Failed to create output file {}", path.display()))?;
        info!("Writing manifests to {}", path.display());
        installer = installer.with_output(BufWriter::new(file));
    }

    installer.install().await?;

    info!("Installation finished");
    Ok(())
}
