//! Master registration surfaces.
//!
//! Job assembly appends change sources, trigger rules and builders here;
//! the executing framework owns everything that happens after
//! configuration load. The collections are append-only from the
//! assembler's perspective, and builder/scheduler names are checked for
//! uniqueness at registration time because the project name doubles as
//! category key and builder name: a silent collision would misroute
//! change events.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::secret::SecretStore;
use crate::step::BuildPipeline;
use crate::{Error, Result};

/// A registered origin of change events.
///
/// Every change source carries a caller-supplied `name` distinct from its
/// polled target, so several instances can watch overlapping repositories
/// with different filters and credentials.
#[async_trait]
pub trait ChangeSource: Send + Sync {
    /// Instance identity, never inferred from the target address.
    fn name(&self) -> &str;

    /// Category attached to emitted changes, matched by trigger rules.
    fn category(&self) -> Option<&str>;

    /// Whether the framework should poll immediately at launch.
    fn poll_at_launch(&self) -> bool;

    /// Resolve secrets and acquire collaborators. Called by the framework
    /// on every (re)configuration; failure is fatal for this instance and
    /// is surfaced at load time, not deferred to the first poll.
    async fn reconfigure(&mut self, secrets: &dyn SecretStore) -> Result<()>;
}

/// Direct poller on a source branch; no per-instance state to resolve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchPoller {
    pub name: String,
    pub repo_url: String,
    pub branch: String,
    pub category: String,
    pub poll_at_launch: bool,
}

#[async_trait]
impl ChangeSource for BranchPoller {
    fn name(&self) -> &str {
        &self.name
    }

    fn category(&self) -> Option<&str> {
        Some(&self.category)
    }

    fn poll_at_launch(&self) -> bool {
        self.poll_at_launch
    }

    async fn reconfigure(&mut self, _secrets: &dyn SecretStore) -> Result<()> {
        Ok(())
    }
}

/// Selects which changes a trigger rule reacts to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeFilter {
    pub category: String,
}

/// A single-branch trigger rule: changes matching the filter start the
/// named builders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerRule {
    pub name: String,
    pub builder_names: Vec<String>,
    pub change_filter: ChangeFilter,
}

impl TriggerRule {
    pub fn single_branch(
        name: impl Into<String>,
        builder_names: Vec<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            builder_names,
            change_filter: ChangeFilter {
                category: category.into(),
            },
        }
    }
}

/// A named, worker-bound build pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuilderConfig {
    pub name: String,
    pub worker_names: Vec<String>,
    pub pipeline: BuildPipeline,
    /// Locks serializing access to shared resources across concurrent
    /// builds, e.g. chroot base images.
    pub locks: Vec<String>,
}

/// Everything job assembly registers with the master.
#[derive(Default)]
pub struct MasterConfig {
    pub change_sources: Vec<Box<dyn ChangeSource>>,
    pub schedulers: Vec<TriggerRule>,
    pub builders: Vec<BuilderConfig>,
}

impl MasterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_change_source(&mut self, source: Box<dyn ChangeSource>) {
        self.change_sources.push(source);
    }

    pub fn register_scheduler(&mut self, rule: TriggerRule) -> Result<()> {
        if self.schedulers.iter().any(|r| r.name == rule.name) {
            return Err(Error::DuplicateProject(rule.name));
        }
        self.schedulers.push(rule);
        Ok(())
    }

    pub fn register_builder(&mut self, builder: BuilderConfig) -> Result<()> {
        if self.builders.iter().any(|b| b.name == builder.name) {
            return Err(Error::DuplicateProject(builder.name));
        }
        self.builders.push(builder);
        Ok(())
    }

    pub fn builder(&self, name: &str) -> Option<&BuilderConfig> {
        self.builders.iter().find(|b| b.name == name)
    }

    /// Reconfigure every registered change source in order. Each
    /// instance's own setup is sequential; the first failure aborts the
    /// load.
    pub async fn reconfigure_change_sources(&mut self, secrets: &dyn SecretStore) -> Result<()> {
        for source in &mut self.change_sources {
            source.reconfigure(secrets).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::BuildPipeline;

    fn builder(name: &str) -> BuilderConfig {
        BuilderConfig {
            name: name.to_string(),
            worker_names: vec!["worker1".to_string()],
            pipeline: BuildPipeline::new(vec![]),
            locks: vec![],
        }
    }

    #[test]
    fn test_register_builder_rejects_duplicate_name() {
        let mut master = MasterConfig::new();
        master.register_builder(builder("navigation_groovy_testbuild")).unwrap();
        let err = master
            .register_builder(builder("navigation_groovy_testbuild"))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateProject(_)));
        assert_eq!(master.builders.len(), 1);
    }

    #[test]
    fn test_register_scheduler_rejects_duplicate_name() {
        let mut master = MasterConfig::new();
        let rule = TriggerRule::single_branch("p", vec!["p".to_string()], "p");
        master.register_scheduler(rule.clone()).unwrap();
        assert!(master.register_scheduler(rule).is_err());
    }
}
