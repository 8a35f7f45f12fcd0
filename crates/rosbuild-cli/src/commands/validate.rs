//! Jobs-file validation command.

use anyhow::{Context, Result};
use rosbuild_core::secret::EnvSecretStore;

use super::assemble;

/// Environment prefix for rendered secrets, e.g. `ROSBUILD_SECRET_OathToken`.
const SECRET_ENV_PREFIX: &str = "ROSBUILD_SECRET_";

pub async fn validate(path: &str, render_secrets: bool) -> Result<()> {
    let (mut master, _pool) = assemble(path)?;

    for builder in &master.builders {
        println!("ok: {}", builder.name);
    }

    if render_secrets {
        let secrets = EnvSecretStore::new(SECRET_ENV_PREFIX);
        master
            .reconfigure_change_sources(&secrets)
            .await
            .context("Failed to configure change sources")?;
        println!("change sources configured: {}", master.change_sources.len());
    }

    println!(
        "{} builder(s), {} scheduler(s), {} change source(s)",
        master.builders.len(),
        master.schedulers.len(),
        master.change_sources.len()
    );
    Ok(())
}
