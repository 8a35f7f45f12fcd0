//! Pull-request metadata and filtering.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;

/// An account on the hosting service.
#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    pub login: String,
}

/// A repository referenced from a pull request.
#[derive(Debug, Clone, Deserialize)]
pub struct RepoRef {
    pub name: String,
    pub full_name: String,
    pub owner: Account,
}

/// One side of a pull request (head or base).
#[derive(Debug, Clone, Deserialize)]
pub struct GitRef {
    #[serde(rename = "ref")]
    pub branch: String,
    pub sha: String,
    pub repo: RepoRef,
}

/// Open pull-request metadata as returned by the hosting service.
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub state: String,
    pub html_url: String,
    pub user: Account,
    pub head: GitRef,
    pub base: GitRef,
    pub updated_at: DateTime<Utc>,
}

/// Predicate over pull-request metadata.
///
/// A non-callable configuration value (plain `true`/`false`) is wrapped as
/// a constant predicate returning that truth value.
#[derive(Clone)]
pub enum PrFilter {
    Constant(bool),
    Predicate(Arc<dyn Fn(&PullRequest) -> bool + Send + Sync>),
}

impl PrFilter {
    pub fn accepts(&self, pr: &PullRequest) -> bool {
        match self {
            PrFilter::Constant(value) => *value,
            PrFilter::Predicate(f) => f(pr),
        }
    }

    pub fn predicate(f: impl Fn(&PullRequest) -> bool + Send + Sync + 'static) -> Self {
        PrFilter::Predicate(Arc::new(f))
    }
}

impl Default for PrFilter {
    fn default() -> Self {
        PrFilter::Constant(true)
    }
}

impl From<bool> for PrFilter {
    fn from(value: bool) -> Self {
        PrFilter::Constant(value)
    }
}

impl std::fmt::Debug for PrFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrFilter::Constant(value) => write!(f, "PrFilter::Constant({})", value),
            PrFilter::Predicate(_) => write!(f, "PrFilter::Predicate(..)"),
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_pr(number: u64, base_branch: &str) -> PullRequest {
    PullRequest {
        number,
        title: format!("PR #{}", number),
        state: "open".to_string(),
        html_url: format!("https://github.com/ros-planning/navigation/pull/{}", number),
        user: Account {
            login: "contributor".to_string(),
        },
        head: GitRef {
            branch: "feature".to_string(),
            sha: "abc123".to_string(),
            repo: RepoRef {
                name: "navigation".to_string(),
                full_name: "contributor/navigation".to_string(),
                owner: Account {
                    login: "contributor".to_string(),
                },
            },
        },
        base: GitRef {
            branch: base_branch.to_string(),
            sha: "def456".to_string(),
            repo: RepoRef {
                name: "navigation".to_string(),
                full_name: "ros-planning/navigation".to_string(),
                owner: Account {
                    login: "ros-planning".to_string(),
                },
            },
        },
        updated_at: Utc::now(),
    }
}
