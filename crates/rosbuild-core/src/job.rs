//! Testbuild job specifications.

use serde::{Deserialize, Serialize};

/// Input to testbuild job assembly: one ROS package repository to build and
/// test in a chroot on a pool of workers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestbuildSpec {
    /// Job name, typically the metapackage name.
    pub job_name: String,
    /// URL of the source repository.
    pub url: String,
    /// Branch to check out.
    pub branch: String,
    /// Ubuntu distro to build for, e.g. "precise".
    pub distro: String,
    /// Architecture to build for, e.g. "amd64".
    pub arch: String,
    /// ROS distro, e.g. "groovy".
    pub rosdistro: String,
    /// Workers this job can build on.
    pub machines: Vec<String>,
    /// Cowbuilder othermirror parameter.
    pub othermirror: String,
    /// Keys cowbuilder will need to trust.
    pub keys: Vec<String>,
    /// Poll the source branch directly; when false, poll pull requests
    /// against it instead.
    pub source: bool,
    /// Locks serializing access to shared chroot base images.
    pub locks: Vec<String>,
}

impl TestbuildSpec {
    /// The derived project name, used as category key, scheduler name and
    /// builder name. Unique per (job_name, rosdistro, mode).
    pub fn project_name(&self) -> String {
        project_name(&self.job_name, &self.rosdistro, self.source)
    }
}

/// Join job name, rosdistro and the mode suffix into a project name.
pub fn project_name(job_name: &str, rosdistro: &str, source: bool) -> String {
    let suffix = if source { "testbuild" } else { "pr_testbuild" };
    [job_name, rosdistro, suffix].join("_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_name_suffix_per_mode() {
        assert_eq!(project_name("navigation", "groovy", true), "navigation_groovy_testbuild");
        assert_eq!(
            project_name("navigation", "groovy", false),
            "navigation_groovy_pr_testbuild"
        );
    }

    #[test]
    fn test_project_names_distinct_for_distinct_specs() {
        let names = [
            project_name("navigation", "groovy", true),
            project_name("navigation", "hydro", true),
            project_name("moveit", "groovy", true),
            project_name("moveit", "hydro", true),
        ];
        for (i, a) in names.iter().enumerate() {
            for b in names.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }
}
