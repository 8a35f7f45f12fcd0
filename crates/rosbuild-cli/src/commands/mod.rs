pub mod show;
pub mod validate;

use std::sync::Arc;

use anyhow::{Context, Result};
use rosbuild_core::master::MasterConfig;
use rosbuild_jobs::ros_testbuild;
use rosbuild_poller::HttpClientPool;

/// Load a jobs file and assemble every job into a master configuration.
pub fn assemble(path: &str) -> Result<(MasterConfig, Arc<HttpClientPool>)> {
    let specs = rosbuild_config::load_jobs(path)
        .with_context(|| format!("Failed to load jobs file: {}", path))?;

    let mut master = MasterConfig::new();
    let pool = Arc::new(HttpClientPool::new());
    for spec in &specs {
        ros_testbuild(&mut master, spec, pool.clone())
            .with_context(|| format!("Failed to assemble job '{}'", spec.job_name))?;
    }
    Ok((master, pool))
}
