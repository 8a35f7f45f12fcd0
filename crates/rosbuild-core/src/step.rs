//! Build step and pipeline definitions.
//!
//! Steps are pure descriptions handed to the executing framework; nothing
//! here runs a command. Arguments can be literal strings or templates that
//! the framework interpolates from build properties at run time.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A command argument, resolved by the framework when the step runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Argument {
    /// Used verbatim.
    Literal(String),
    /// Template interpolated from build properties, e.g.
    /// `%(prop:builddir)s/testbuild.py`.
    Interpolate(String),
}

impl Argument {
    pub fn literal(value: impl Into<String>) -> Self {
        Argument::Literal(value.into())
    }

    pub fn interpolate(template: impl Into<String>) -> Self {
        Argument::Interpolate(template.into())
    }
}

impl From<&str> for Argument {
    fn from(value: &str) -> Self {
        Argument::Literal(value.to_string())
    }
}

impl From<String> for Argument {
    fn from(value: String) -> Self {
        Argument::Literal(value)
    }
}

impl std::fmt::Display for Argument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Argument::Literal(s) => f.write_str(s),
            Argument::Interpolate(t) => f.write_str(t),
        }
    }
}

/// A value late-bound from a build property, with a configured default.
///
/// Lets a triggering change event override e.g. the repository and branch
/// of a checkout without changing the job definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prop {
    pub property: String,
    pub default: String,
}

impl Prop {
    pub fn with_default(property: impl Into<String>, default: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            default: default.into(),
        }
    }
}

/// A shell command executed on the worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShellStep {
    /// Step name shown in the build; defaults to the command itself.
    pub name: Option<String>,
    pub command: Vec<Argument>,
    /// Hide this step from the visible step list when it succeeds.
    pub hide_on_success: bool,
    /// Named log streams captured from files on the worker.
    pub logfiles: HashMap<String, String>,
    /// Description shown once the step completes.
    pub description_done: Vec<String>,
}

impl ShellStep {
    pub fn new(command: Vec<Argument>) -> Self {
        Self {
            name: None,
            command,
            hide_on_success: false,
            logfiles: HashMap::new(),
            description_done: Vec::new(),
        }
    }
}

/// Checkout mode for a git step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckoutMode {
    /// Fresh full clone every build.
    Full,
    /// Reuse an existing clone.
    Incremental,
}

/// A git checkout on the worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutStep {
    /// Repository URL, overridable by the `repository` build property.
    pub repo_url: Prop,
    /// Branch, overridable by the `branch` build property.
    pub branch: Prop,
    pub workdir: String,
    pub mode: CheckoutMode,
    /// Always fetch the latest revision instead of the one recorded on the
    /// triggering change.
    pub always_use_latest: bool,
}

/// A file transferred from the master to the worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileDownloadStep {
    pub name: String,
    /// Path on the master, relative to its base directory.
    pub master_src: String,
    /// Destination path on the worker.
    pub worker_dest: Argument,
    pub hide_on_success: bool,
}

/// A single step in a build pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Step {
    Shell(ShellStep),
    Checkout(CheckoutStep),
    FileDownload(FileDownloadStep),
}

impl Step {
    pub fn name(&self) -> Option<&str> {
        match self {
            Step::Shell(s) => s.name.as_deref(),
            Step::Checkout(_) => None,
            Step::FileDownload(s) => Some(&s.name),
        }
    }

    /// Whether this step is removed from the visible step list when it
    /// succeeds. Depends only on the step itself, never on siblings.
    pub fn hidden_on_success(&self) -> bool {
        match self {
            Step::Shell(s) => s.hide_on_success,
            Step::Checkout(_) => false,
            Step::FileDownload(s) => s.hide_on_success,
        }
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Step::Shell(s) => {
                let command: Vec<String> = s.command.iter().map(|a| a.to_string()).collect();
                write!(f, "shell: {}", command.join(" "))
            }
            Step::Checkout(s) => {
                write!(f, "checkout: {} @ {} -> {}", s.repo_url.default, s.branch.default, s.workdir)
            }
            Step::FileDownload(s) => {
                write!(f, "download: {} -> {}", s.master_src, s.worker_dest)
            }
        }
    }
}

/// An ordered, immutable sequence of build steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildPipeline {
    steps: Vec<Step>,
}

impl BuildPipeline {
    pub fn new(steps: Vec<Step>) -> Self {
        Self { steps }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_on_success_is_per_step() {
        let hidden = Step::Shell(ShellStep {
            hide_on_success: true,
            ..ShellStep::new(vec!["rm".into(), "-rf".into(), "/tmp/x".into()])
        });
        let visible = Step::Shell(ShellStep::new(vec!["make".into()]));
        assert!(hidden.hidden_on_success());
        assert!(!visible.hidden_on_success());
    }

    #[test]
    fn test_interpolate_argument_keeps_template() {
        let arg = Argument::interpolate("%(prop:builddir)s/testbuild.py");
        assert_eq!(arg.to_string(), "%(prop:builddir)s/testbuild.py");
    }
}
