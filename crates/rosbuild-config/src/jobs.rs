//! Jobs-file parsing.
//!
//! Example:
//!
//! ```kdl
//! defaults {
//!     distro "precise"
//!     arch "amd64"
//!     rosdistro "groovy"
//!     othermirror "deb http://repo.example.com precise main"
//!     keys "ros.key"
//!     machines "worker1" "worker2"
//!     locks "cowbuilder"
//! }
//!
//! job "navigation" {
//!     url "git@github.com:ros-planning/navigation.git"
//!     branch "groovy-devel"
//!     source #false
//! }
//! ```
//!
//! Job-level values override defaults; `url` and `branch` are always
//! per-job. Every field required by assembly must be present after
//! merging.

use crate::{ConfigError, ConfigResult};
use kdl::{KdlDocument, KdlNode};
use rosbuild_core::job::TestbuildSpec;

/// Accumulated values for one job or the defaults block.
#[derive(Debug, Clone, Default)]
struct PartialJob {
    url: Option<String>,
    branch: Option<String>,
    distro: Option<String>,
    arch: Option<String>,
    rosdistro: Option<String>,
    othermirror: Option<String>,
    machines: Option<Vec<String>>,
    keys: Option<Vec<String>>,
    locks: Option<Vec<String>>,
    source: Option<bool>,
}

impl PartialJob {
    fn merged_over(self, defaults: &PartialJob) -> PartialJob {
        PartialJob {
            url: self.url,
            branch: self.branch,
            distro: self.distro.or_else(|| defaults.distro.clone()),
            arch: self.arch.or_else(|| defaults.arch.clone()),
            rosdistro: self.rosdistro.or_else(|| defaults.rosdistro.clone()),
            othermirror: self.othermirror.or_else(|| defaults.othermirror.clone()),
            machines: self.machines.or_else(|| defaults.machines.clone()),
            keys: self.keys.or_else(|| defaults.keys.clone()),
            locks: self.locks.or_else(|| defaults.locks.clone()),
            source: self.source.or(defaults.source),
        }
    }

    fn into_spec(self, job_name: String) -> ConfigResult<TestbuildSpec> {
        let require = |field: &str, value: Option<String>| {
            value.ok_or_else(|| ConfigError::MissingField(format!("{} ({})", field, job_name)))
        };

        let machines = self.machines.unwrap_or_default();
        if machines.is_empty() {
            return Err(ConfigError::MissingField(format!("machines ({})", job_name)));
        }

        let url = require("url", self.url)?;
        let branch = require("branch", self.branch)?;
        let distro = require("distro", self.distro)?;
        let arch = require("arch", self.arch)?;
        let rosdistro = require("rosdistro", self.rosdistro)?;
        let othermirror = require("othermirror", self.othermirror)?;

        Ok(TestbuildSpec {
            job_name,
            url,
            branch,
            distro,
            arch,
            rosdistro,
            machines,
            othermirror,
            keys: self.keys.unwrap_or_default(),
            locks: self.locks.unwrap_or_default(),
            source: self.source.unwrap_or(true),
        })
    }
}

/// Parse testbuild job specifications from KDL text.
pub fn parse_jobs(kdl: &str) -> ConfigResult<Vec<TestbuildSpec>> {
    let doc: KdlDocument = kdl.parse()?;

    let mut defaults = PartialJob::default();
    let mut jobs: Vec<(String, PartialJob)> = Vec::new();

    for node in doc.nodes() {
        match node.name().value() {
            "defaults" => {
                defaults = parse_fields(node)?;
            }
            "job" => {
                let name = get_first_string_arg(node)
                    .ok_or_else(|| ConfigError::MissingField("job name".to_string()))?;
                if jobs.iter().any(|(n, _)| *n == name) {
                    return Err(ConfigError::Duplicate(format!("job '{}'", name)));
                }
                jobs.push((name, parse_fields(node)?));
            }
            _ => {} // Ignore unknown nodes
        }
    }

    jobs.into_iter()
        .map(|(name, partial)| partial.merged_over(&defaults).into_spec(name))
        .collect()
}

/// Read and parse a jobs file from disk.
pub fn load_jobs(path: &str) -> ConfigResult<Vec<TestbuildSpec>> {
    let content = std::fs::read_to_string(path)?;
    parse_jobs(&content)
}

fn parse_fields(node: &KdlNode) -> ConfigResult<PartialJob> {
    let mut partial = PartialJob::default();

    let Some(children) = node.children() else {
        return Ok(partial);
    };

    for child in children.nodes() {
        let field = child.name().value();
        match field {
            "url" => partial.url = Some(require_string_arg(child)?),
            "branch" => partial.branch = Some(require_string_arg(child)?),
            "distro" => partial.distro = Some(require_string_arg(child)?),
            "arch" => partial.arch = Some(require_string_arg(child)?),
            "rosdistro" => partial.rosdistro = Some(require_string_arg(child)?),
            "othermirror" => partial.othermirror = Some(require_string_arg(child)?),
            "machines" => partial.machines = Some(get_all_string_args(child)),
            "keys" => partial.keys = Some(get_all_string_args(child)),
            "locks" => partial.locks = Some(get_all_string_args(child)),
            "source" => {
                partial.source = Some(get_first_bool_arg(child).ok_or_else(|| {
                    ConfigError::InvalidValue {
                        field: "source".to_string(),
                        message: "expected #true or #false".to_string(),
                    }
                })?)
            }
            other => {
                return Err(ConfigError::InvalidValue {
                    field: other.to_string(),
                    message: "unknown field".to_string(),
                });
            }
        }
    }

    Ok(partial)
}

// Helper functions for extracting values from KDL nodes

fn get_first_string_arg(node: &KdlNode) -> Option<String> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_string())
        .map(|s| s.to_string())
}

fn require_string_arg(node: &KdlNode) -> ConfigResult<String> {
    get_first_string_arg(node).ok_or_else(|| ConfigError::InvalidValue {
        field: node.name().value().to_string(),
        message: "expected a string argument".to_string(),
    })
}

fn get_all_string_args(node: &KdlNode) -> Vec<String> {
    node.entries()
        .iter()
        .filter(|e| e.name().is_none())
        .filter_map(|e| e.value().as_string())
        .map(|s| s.to_string())
        .collect()
}

fn get_first_bool_arg(node: &KdlNode) -> Option<bool> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_bool())
}
