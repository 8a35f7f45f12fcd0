//! Pull-request change source configuration.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use rosbuild_core::master::ChangeSource;
use rosbuild_core::secret::{Secret, SecretRef, SecretStore};
use rosbuild_core::{Error, Result};

use crate::client::HttpClientPool;
use crate::pull_request::{PrFilter, PullRequest};

/// Public API root of the hosted service, used when no base URL is given.
pub const HOSTED_BASE_URL: &str = "https://api.github.com";

/// Default time between polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(600);

/// Which remote URL style checkout links use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkStyle {
    Https,
    Ssh,
}

impl LinkStyle {
    pub fn clone_url(&self, owner: &str, repo: &str) -> String {
        match self {
            LinkStyle::Https => format!("https://github.com/{}/{}.git", owner, repo),
            LinkStyle::Ssh => format!("git@github.com:{}/{}.git", owner, repo),
        }
    }
}

impl std::str::FromStr for LinkStyle {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "https" => Ok(LinkStyle::Https),
            "ssh" => Ok(LinkStyle::Ssh),
            other => Err(Error::InvalidValue {
                field: "repository_type".to_string(),
                message: format!("unknown link style: {}", other),
            }),
        }
    }
}

/// Settings for one pull-request poller instance.
#[derive(Debug, Clone)]
pub struct PrPollerSettings {
    pub owner: String,
    pub repo: String,
    /// Base branches to watch; `None` is unrestricted.
    pub branches: Option<Vec<String>>,
    pub poll_interval: Duration,
    /// Category attached to emitted changes; defaults to the repo name.
    pub category: Option<String>,
    /// API root; defaults to [`HOSTED_BASE_URL`]. A trailing slash is
    /// stripped before use.
    pub base_url: Option<String>,
    pub filter: PrFilter,
    pub token: Option<SecretRef>,
    pub poll_at_launch: bool,
    /// Check out the merge ref of the base repository instead of the
    /// contributor's head repository.
    pub magic_link: bool,
    pub repository_style: LinkStyle,
    /// Change properties copied through from pull-request metadata.
    pub property_whitelist: Vec<String>,
}

impl PrPollerSettings {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            branches: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            category: None,
            base_url: None,
            filter: PrFilter::default(),
            token: None,
            poll_at_launch: false,
            magic_link: false,
            repository_style: LinkStyle::Https,
            property_whitelist: Vec::new(),
        }
    }
}

struct Configured {
    base_url: String,
    client: reqwest::Client,
    token: Option<Secret>,
}

/// A pull-request poller instance bound to one (owner, repo) pair.
///
/// Carries an explicit caller-supplied `name` so several instances can
/// watch overlapping repositories with different branches, filters or
/// credentials. Until [`ChangeSource::reconfigure`] runs, no partially
/// initialized state is observable: polling accessors fail with
/// [`Error::NotConfigured`].
pub struct PrChangeSource {
    name: String,
    category: String,
    settings: PrPollerSettings,
    pool: Arc<HttpClientPool>,
    configured: Option<Configured>,
}

impl PrChangeSource {
    pub fn new(
        name: impl Into<String>,
        settings: PrPollerSettings,
        pool: Arc<HttpClientPool>,
    ) -> Self {
        let category = settings
            .category
            .clone()
            .unwrap_or_else(|| settings.repo.clone());
        Self {
            name: name.into(),
            category,
            settings,
            pool,
            configured: None,
        }
    }

    pub fn settings(&self) -> &PrPollerSettings {
        &self.settings
    }

    pub fn poll_interval(&self) -> Duration {
        self.settings.poll_interval
    }

    /// The API root this instance polls, with any trailing slash stripped.
    pub fn base_url(&self) -> String {
        let base = self
            .settings
            .base_url
            .as_deref()
            .unwrap_or(HOSTED_BASE_URL);
        base.strip_suffix('/').unwrap_or(base).to_string()
    }

    fn configured(&self) -> Result<&Configured> {
        self.configured
            .as_ref()
            .ok_or_else(|| Error::NotConfigured(self.name.clone()))
    }

    /// Whether a token has been rendered for this instance.
    pub fn has_token(&self) -> bool {
        self.configured
            .as_ref()
            .is_some_and(|c| c.token.is_some())
    }

    /// Whether this instance wants changes for the given pull request,
    /// combining the branch restriction and the filter predicate.
    pub fn wants(&self, pr: &PullRequest) -> bool {
        let branch_ok = match &self.settings.branches {
            None => true,
            Some(branches) => branches.iter().any(|b| *b == pr.base.branch),
        };
        branch_ok && self.settings.filter.accepts(pr)
    }

    /// The clone URL a change for this pull request would check out.
    pub fn checkout_url(&self, pr: &PullRequest) -> String {
        if self.settings.magic_link {
            // The merge ref lives on the base repository.
            LinkStyle::Https.clone_url(&pr.base.repo.owner.login, &pr.base.repo.name)
        } else {
            self.settings
                .repository_style
                .clone_url(&pr.head.repo.owner.login, &pr.head.repo.name)
        }
    }

    /// The branch a change for this pull request would check out.
    pub fn checkout_branch(&self, pr: &PullRequest) -> String {
        if self.settings.magic_link {
            format!("refs/pull/{}/merge", pr.number)
        } else {
            pr.head.branch.clone()
        }
    }

    /// Fetch the open pull requests for the bound repository.
    ///
    /// This is the outbound call the framework's poll loop makes; diffing
    /// against last-seen state and change emission stay with the
    /// framework.
    pub async fn open_pull_requests(&self) -> Result<Vec<PullRequest>> {
        let state = self.configured()?;
        let url = format!(
            "{}/repos/{}/{}/pulls?state=open",
            state.base_url, self.settings.owner, self.settings.repo
        );

        debug!(name = %self.name, url = %url, "fetching open pull requests");
        let response = state
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::Http(format!(
                "GET {} returned {}",
                url,
                response.status()
            )));
        }

        response
            .json::<Vec<PullRequest>>()
            .await
            .map_err(|e| Error::Http(e.to_string()))
    }
}

#[async_trait]
impl ChangeSource for PrChangeSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn category(&self) -> Option<&str> {
        Some(&self.category)
    }

    fn poll_at_launch(&self) -> bool {
        self.settings.poll_at_launch
    }

    async fn reconfigure(&mut self, secrets: &dyn SecretStore) -> Result<()> {
        let base_url = self.base_url();
        url::Url::parse(&base_url).map_err(|e| Error::InvalidValue {
            field: "base_url".to_string(),
            message: e.to_string(),
        })?;

        let token = match &self.settings.token {
            Some(reference) => Some(secrets.render(reference.name()).await?),
            None => None,
        };

        let client = self.pool.acquire(&base_url, token.as_ref()).await?;
        self.configured = Some(Configured {
            base_url,
            client,
            token,
        });

        debug!(
            name = %self.name,
            owner = %self.settings.owner,
            repo = %self.settings.repo,
            category = %self.category,
            "pull-request poller configured"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pull_request::sample_pr;
    use rosbuild_core::secret::StaticSecretStore;

    fn source(settings: PrPollerSettings) -> PrChangeSource {
        PrChangeSource::new("test-poller", settings, Arc::new(HttpClientPool::new()))
    }

    #[test]
    fn test_base_url_trailing_slash_stripped() {
        let mut settings = PrPollerSettings::new("ros-planning", "navigation");
        settings.base_url = Some("https://api.example.com/".to_string());
        assert_eq!(source(settings).base_url(), "https://api.example.com");
    }

    #[test]
    fn test_base_url_defaults_to_hosted_service() {
        let settings = PrPollerSettings::new("ros-planning", "navigation");
        assert_eq!(source(settings).base_url(), "https://api.github.com");
    }

    #[test]
    fn test_category_defaults_to_repo_name() {
        let settings = PrPollerSettings::new("ros-planning", "navigation");
        assert_eq!(source(settings).category(), Some("navigation"));
    }

    #[test]
    fn test_explicit_category_wins() {
        let mut settings = PrPollerSettings::new("ros-planning", "navigation");
        settings.category = Some("navigation_groovy_pr_testbuild".to_string());
        assert_eq!(
            source(settings).category(),
            Some("navigation_groovy_pr_testbuild")
        );
    }

    #[test]
    fn test_wants_respects_branch_restriction() {
        let mut settings = PrPollerSettings::new("ros-planning", "navigation");
        settings.branches = Some(vec!["groovy-devel".to_string()]);
        let source = source(settings);
        assert!(source.wants(&sample_pr(1, "groovy-devel")));
        assert!(!source.wants(&sample_pr(2, "hydro-devel")));
    }

    #[test]
    fn test_wants_respects_filter() {
        let mut settings = PrPollerSettings::new("ros-planning", "navigation");
        settings.filter = PrFilter::from(false);
        assert!(!source(settings).wants(&sample_pr(1, "main")));
    }

    #[test]
    fn test_checkout_link_styles() {
        let mut settings = PrPollerSettings::new("ros-planning", "navigation");
        settings.repository_style = LinkStyle::Ssh;
        let source = source(settings);
        let pr = sample_pr(7, "groovy-devel");
        assert_eq!(source.checkout_url(&pr), "git@github.com:contributor/navigation.git");
        assert_eq!(source.checkout_branch(&pr), "feature");
    }

    #[test]
    fn test_magic_link_uses_base_merge_ref() {
        let mut settings = PrPollerSettings::new("ros-planning", "navigation");
        settings.magic_link = true;
        let source = source(settings);
        let pr = sample_pr(7, "groovy-devel");
        assert_eq!(
            source.checkout_url(&pr),
            "https://github.com/ros-planning/navigation.git"
        );
        assert_eq!(source.checkout_branch(&pr), "refs/pull/7/merge");
    }

    #[tokio::test]
    async fn test_reconfigure_renders_token_and_acquires_client() {
        let pool = Arc::new(HttpClientPool::new());
        let mut settings = PrPollerSettings::new("ros-planning", "navigation");
        settings.token = Some(SecretRef::new("OathToken"));
        let mut source = PrChangeSource::new("pr-poller", settings, pool.clone());

        let secrets = StaticSecretStore::new().with_secret("OathToken", "tok123");
        source.reconfigure(&secrets).await.unwrap();
        assert!(source.has_token());
        assert_eq!(pool.len().await, 1);

        // Reconfiguration reuses the shared client.
        source.reconfigure(&secrets).await.unwrap();
        assert_eq!(pool.len().await, 1);
    }

    #[tokio::test]
    async fn test_reconfigure_fails_fatally_on_missing_secret() {
        let mut settings = PrPollerSettings::new("ros-planning", "navigation");
        settings.token = Some(SecretRef::new("OathToken"));
        let mut source = source(settings);

        let secrets = StaticSecretStore::new();
        let err = source.reconfigure(&secrets).await.unwrap_err();
        assert!(matches!(err, Error::SecretRender { .. }));
        // No partial initialization is observable.
        assert!(source.open_pull_requests().await.is_err());
    }

    #[tokio::test]
    async fn test_fetch_before_configuration_is_rejected() {
        let settings = PrPollerSettings::new("ros-planning", "navigation");
        let err = source(settings).open_pull_requests().await.unwrap_err();
        assert!(matches!(err, Error::NotConfigured(_)));
    }
}
