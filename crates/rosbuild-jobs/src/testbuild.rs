//! Testbuild job assembly.
//!
//! One invocation per configured package at configuration-load time. Both
//! poll modes converge on the same five-step pipeline: cleanup, checkout,
//! script fetch, chroot environment update, then build-and-test inside
//! the chroot with the bind directory mounted.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use rosbuild_core::job::TestbuildSpec;
use rosbuild_core::master::{BranchPoller, BuilderConfig, MasterConfig, TriggerRule};
use rosbuild_core::secret::SecretRef;
use rosbuild_core::step::{
    Argument, BuildPipeline, CheckoutMode, CheckoutStep, FileDownloadStep, Prop, ShellStep, Step,
};
use rosbuild_core::{Error, Result};
use rosbuild_poller::{HttpClientPool, LinkStyle, PrChangeSource, PrPollerSettings};

/// Secret holding the hosting-service API token for pull-request polling.
const TOKEN_SECRET: &str = "OathToken";

/// Extract (owner, repo) from a strict `git@<host>:<owner>/<repo>.git` URL.
///
/// Owner and repo are the substrings between the last ':' and the last '/'
/// and between that '/' and the ".git" suffix. Anything else is a fatal
/// configuration error.
pub fn parse_ssh_url(url: &str) -> Result<(String, String)> {
    let malformed = || Error::MalformedSourceUrl(url.to_string());

    let (head, path) = url.rsplit_once(':').ok_or_else(malformed)?;
    let host = head.strip_prefix("git@").ok_or_else(malformed)?;
    if host.is_empty() {
        return Err(malformed());
    }

    let path = path.strip_suffix(".git").ok_or_else(malformed)?;
    let (owner, repo) = path.rsplit_once('/').ok_or_else(malformed)?;
    if owner.is_empty() || repo.is_empty() {
        return Err(malformed());
    }

    Ok((owner.to_string(), repo.to_string()))
}

/// Register a testbuild job for CI testing of a source repository.
///
/// Registers a change source and a matching single-branch trigger rule,
/// then a builder binding the pipeline to the job's worker pool and
/// locks. Returns the project name of the job created.
pub fn ros_testbuild(
    master: &mut MasterConfig,
    spec: &TestbuildSpec,
    pool: Arc<HttpClientPool>,
) -> Result<String> {
    let project_name = spec.project_name();

    if spec.source {
        master.add_change_source(Box::new(BranchPoller {
            name: spec.url.clone(),
            repo_url: spec.url.clone(),
            branch: spec.branch.clone(),
            category: project_name.clone(),
            poll_at_launch: true,
        }));
    } else {
        let (owner, repo) = parse_ssh_url(&spec.url)?;
        let mut settings = PrPollerSettings::new(owner, repo);
        settings.branches = Some(vec![spec.branch.clone()]);
        settings.category = Some(project_name.clone());
        settings.poll_at_launch = true;
        settings.token = Some(SecretRef::new(TOKEN_SECRET));
        settings.repository_style = LinkStyle::Ssh;
        master.add_change_source(Box::new(PrChangeSource::new(
            project_name.clone(),
            settings,
            pool,
        )));
    }

    master.register_scheduler(TriggerRule::single_branch(
        project_name.clone(),
        vec![project_name.clone()],
        project_name.clone(),
    ))?;

    // Directory which will be bind-mounted into the chroot.
    let binddir = format!("/tmp/{}", project_name);

    let mut steps = Vec::new();

    // Remove any old crud from a previous build.
    steps.push(Step::Shell(ShellStep {
        hide_on_success: true,
        ..ShellStep::new(vec!["rm".into(), "-rf".into(), binddir.clone().into()])
    }));

    // Check out the repository into the bind directory. A triggering
    // change may override repository and branch through properties.
    steps.push(Step::Checkout(CheckoutStep {
        repo_url: Prop::with_default("repository", &spec.url),
        branch: Prop::with_default("branch", &spec.branch),
        workdir: format!("{}/src/{}", binddir, spec.job_name),
        mode: CheckoutMode::Full,
        always_use_latest: true,
    }));

    // Transfer the build-orchestration script from the master.
    steps.push(Step::FileDownload(FileDownloadStep {
        name: format!("{}-grab-script", spec.job_name),
        master_src: "scripts/testbuild.py".to_string(),
        worker_dest: Argument::interpolate("%(prop:builddir)s/testbuild.py"),
        hide_on_success: true,
    }));

    // Update the cowbuilder environment for this distro/arch.
    let mut update = vec![
        Argument::literal("cowbuilder-update.py"),
        spec.distro.clone().into(),
        spec.arch.clone().into(),
    ];
    update.extend(spec.keys.iter().map(|k| Argument::literal(k)));
    steps.push(Step::Shell(ShellStep {
        hide_on_success: true,
        ..ShellStep::new(update)
    }));

    // Make and run tests inside the cowbuilder chroot.
    steps.push(Step::Shell(ShellStep {
        name: Some(format!("{}-build", spec.job_name)),
        command: vec![
            "sudo".into(),
            "cowbuilder".into(),
            "--execute".into(),
            Argument::interpolate("%(prop:builddir)s/testbuild.py"),
            "--distribution".into(),
            spec.distro.clone().into(),
            "--architecture".into(),
            spec.arch.clone().into(),
            "--bindmounts".into(),
            binddir.clone().into(),
            "--basepath".into(),
            format!("/var/cache/pbuilder/base-{}-{}.cow", spec.distro, spec.arch).into(),
            "--override-config".into(),
            "--othermirror".into(),
            spec.othermirror.clone().into(),
            "--".into(),
            binddir.clone().into(),
            spec.rosdistro.clone().into(),
        ],
        hide_on_success: false,
        logfiles: HashMap::from([("tests".to_string(), format!("{}/testresults", binddir))]),
        description_done: vec!["make and test".to_string(), spec.job_name.clone()],
    }));

    master.register_builder(BuilderConfig {
        name: project_name.clone(),
        worker_names: spec.machines.clone(),
        pipeline: BuildPipeline::new(steps),
        locks: spec.locks.clone(),
    })?;

    info!(
        project = %project_name,
        mode = if spec.source { "testbuild" } else { "pr_testbuild" },
        "registered testbuild job"
    );
    Ok(project_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(source: bool) -> TestbuildSpec {
        TestbuildSpec {
            job_name: "navigation".to_string(),
            url: "git@github.com:ros-planning/navigation.git".to_string(),
            branch: "groovy-devel".to_string(),
            distro: "precise".to_string(),
            arch: "amd64".to_string(),
            rosdistro: "groovy".to_string(),
            machines: vec!["worker1".to_string(), "worker2".to_string()],
            othermirror: "deb http://repo.example.com precise main".to_string(),
            keys: vec!["ros.key".to_string()],
            source,
            locks: vec!["cowbuilder".to_string()],
        }
    }

    fn assemble(spec: &TestbuildSpec) -> (MasterConfig, String) {
        let mut master = MasterConfig::new();
        let name = ros_testbuild(&mut master, spec, Arc::new(HttpClientPool::new())).unwrap();
        (master, name)
    }

    #[test]
    fn test_parse_ssh_url_extracts_owner_and_repo() {
        let (owner, repo) = parse_ssh_url("git@github.com:ros-planning/navigation.git").unwrap();
        assert_eq!(owner, "ros-planning");
        assert_eq!(repo, "navigation");
    }

    #[test]
    fn test_parse_ssh_url_uses_last_separator() {
        let (owner, repo) = parse_ssh_url("git@host:group/sub/repo.git").unwrap();
        assert_eq!(owner, "group/sub");
        assert_eq!(repo, "repo");
    }

    #[test]
    fn test_parse_ssh_url_rejects_other_schemes() {
        assert!(parse_ssh_url("https://github.com/ros-planning/navigation.git").is_err());
        assert!(parse_ssh_url("git@github.com:ros-planning/navigation").is_err());
        assert!(parse_ssh_url("git@github.com:navigation.git").is_err());
        assert!(parse_ssh_url("git@:owner/repo.git").is_err());
        assert!(parse_ssh_url("").is_err());
    }

    #[test]
    fn test_source_mode_registers_branch_poller() {
        let (master, name) = assemble(&spec(true));
        assert_eq!(name, "navigation_groovy_testbuild");
        assert_eq!(master.change_sources.len(), 1);
        assert_eq!(master.change_sources[0].category(), Some(name.as_str()));
        assert!(master.change_sources[0].poll_at_launch());
        assert_eq!(master.schedulers[0].change_filter.category, name);
        assert_eq!(master.schedulers[0].builder_names, vec![name.clone()]);
    }

    #[test]
    fn test_pr_mode_registers_pr_poller() {
        let (master, name) = assemble(&spec(false));
        assert_eq!(name, "navigation_groovy_pr_testbuild");
        assert_eq!(master.change_sources[0].name(), name);
        assert_eq!(master.change_sources[0].category(), Some(name.as_str()));
    }

    #[test]
    fn test_pr_mode_rejects_plain_clone_url() {
        let mut bad = spec(false);
        bad.url = "https://github.com/ros-planning/navigation.git".to_string();
        let mut master = MasterConfig::new();
        let err =
            ros_testbuild(&mut master, &bad, Arc::new(HttpClientPool::new())).unwrap_err();
        assert!(matches!(err, Error::MalformedSourceUrl(_)));
        // Nothing half-registered.
        assert!(master.change_sources.is_empty());
        assert!(master.builders.is_empty());
    }

    #[test]
    fn test_pipeline_has_five_steps_in_order() {
        let (master, name) = assemble(&spec(true));
        let builder = master.builder(&name).unwrap();
        let steps = builder.pipeline.steps();
        assert_eq!(steps.len(), 5);
        assert!(matches!(steps[0], Step::Shell(_)));
        assert!(matches!(steps[1], Step::Checkout(_)));
        assert!(matches!(steps[2], Step::FileDownload(_)));
        assert!(matches!(steps[3], Step::Shell(_)));
        assert!(matches!(steps[4], Step::Shell(_)));
    }

    #[test]
    fn test_cleanup_and_script_fetch_hidden_on_success() {
        let (master, name) = assemble(&spec(true));
        let steps = master.builder(&name).unwrap().pipeline.steps().to_vec();
        assert!(steps[0].hidden_on_success());
        assert!(steps[2].hidden_on_success());
        assert!(!steps[4].hidden_on_success());
    }

    #[test]
    fn test_checkout_is_late_bound_with_spec_defaults() {
        let (master, name) = assemble(&spec(true));
        let steps = master.builder(&name).unwrap().pipeline.steps();
        let Step::Checkout(checkout) = &steps[1] else {
            panic!("expected checkout step");
        };
        assert_eq!(checkout.repo_url.property, "repository");
        assert_eq!(checkout.repo_url.default, "git@github.com:ros-planning/navigation.git");
        assert_eq!(checkout.branch.property, "branch");
        assert_eq!(checkout.branch.default, "groovy-devel");
        assert_eq!(checkout.workdir, "/tmp/navigation_groovy_testbuild/src/navigation");
        assert!(checkout.always_use_latest);
        assert_eq!(checkout.mode, CheckoutMode::Full);
    }

    #[test]
    fn test_environment_update_includes_keys() {
        let (master, name) = assemble(&spec(true));
        let steps = master.builder(&name).unwrap().pipeline.steps();
        let Step::Shell(update) = &steps[3] else {
            panic!("expected shell step");
        };
        let command: Vec<String> = update.command.iter().map(|a| a.to_string()).collect();
        assert_eq!(command, vec!["cowbuilder-update.py", "precise", "amd64", "ros.key"]);
    }

    #[test]
    fn test_chroot_invocation_and_tests_log() {
        let (master, name) = assemble(&spec(true));
        let steps = master.builder(&name).unwrap().pipeline.steps();
        let Step::Shell(build) = &steps[4] else {
            panic!("expected shell step");
        };
        assert_eq!(build.name.as_deref(), Some("navigation-build"));
        let command: Vec<String> = build.command.iter().map(|a| a.to_string()).collect();
        assert_eq!(
            command,
            vec![
                "sudo",
                "cowbuilder",
                "--execute",
                "%(prop:builddir)s/testbuild.py",
                "--distribution",
                "precise",
                "--architecture",
                "amd64",
                "--bindmounts",
                "/tmp/navigation_groovy_testbuild",
                "--basepath",
                "/var/cache/pbuilder/base-precise-amd64.cow",
                "--override-config",
                "--othermirror",
                "deb http://repo.example.com precise main",
                "--",
                "/tmp/navigation_groovy_testbuild",
                "groovy",
            ]
        );
        assert_eq!(
            build.logfiles.get("tests").unwrap(),
            "/tmp/navigation_groovy_testbuild/testresults"
        );
    }

    #[test]
    fn test_builder_binds_workers_and_locks() {
        let (master, name) = assemble(&spec(true));
        let builder = master.builder(&name).unwrap();
        assert_eq!(builder.worker_names, vec!["worker1", "worker2"]);
        assert_eq!(builder.locks, vec!["cowbuilder"]);
    }

    #[test]
    fn test_same_job_in_both_modes_does_not_collide() {
        let mut master = MasterConfig::new();
        let pool = Arc::new(HttpClientPool::new());
        let a = ros_testbuild(&mut master, &spec(true), pool.clone()).unwrap();
        let b = ros_testbuild(&mut master, &spec(false), pool).unwrap();
        assert_ne!(a, b);
        assert_eq!(master.builders.len(), 2);
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let mut master = MasterConfig::new();
        let pool = Arc::new(HttpClientPool::new());
        ros_testbuild(&mut master, &spec(true), pool.clone()).unwrap();
        let err = ros_testbuild(&mut master, &spec(true), pool).unwrap_err();
        assert!(matches!(err, Error::DuplicateProject(_)));
    }
}
