//! Secret references and storage abstraction.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{Error, Result};

/// Secret names this configuration expects a store to be able to render.
pub const RECOGNIZED_SECRETS: [&str; 3] = ["sshPrivateKey", "sshHostKey", "OathToken"];

/// A rendered secret value.
///
/// The value is never exposed through `Debug` or `Display` and is not
/// serializable; callers must go through [`Secret::expose`] to read it.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Read the plaintext value. Keep the result out of logs.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}

impl std::fmt::Display for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("<redacted>")
    }
}

impl From<String> for Secret {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A named reference to a secret, resolved through a [`SecretStore`] at
/// configuration time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretRef(String);

impl SecretRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

/// Trait for secret rendering backends.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Render a secret by name. Failure is fatal for the configuration
    /// that requested it.
    async fn render(&self, name: &str) -> Result<Secret>;
}

/// Secret store backed by environment variables.
///
/// A secret named `OathToken` with prefix `ROSBUILD_SECRET_` is read from
/// `ROSBUILD_SECRET_OathToken`.
pub struct EnvSecretStore {
    prefix: String,
}

impl EnvSecretStore {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

#[async_trait]
impl SecretStore for EnvSecretStore {
    async fn render(&self, name: &str) -> Result<Secret> {
        let var = format!("{}{}", self.prefix, name);
        std::env::var(&var)
            .map(Secret::new)
            .map_err(|_| Error::SecretRender {
                name: name.to_string(),
                message: format!("environment variable {} is not set", var),
            })
    }
}

/// In-memory secret store.
#[derive(Default)]
pub struct StaticSecretStore {
    secrets: HashMap<String, String>,
}

impl StaticSecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.secrets.insert(name.into(), value.into());
        self
    }
}

#[async_trait]
impl SecretStore for StaticSecretStore {
    async fn render(&self, name: &str) -> Result<Secret> {
        self.secrets
            .get(name)
            .map(|v| Secret::new(v.clone()))
            .ok_or_else(|| Error::SecretRender {
                name: name.to_string(),
                message: "no such secret".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_and_display_redact() {
        let secret = Secret::new("hunter2");
        assert_eq!(format!("{:?}", secret), "Secret(<redacted>)");
        assert_eq!(format!("{}", secret), "<redacted>");
        assert_eq!(secret.expose(), "hunter2");
    }

    #[tokio::test]
    async fn test_static_store_renders_known_secret() {
        let store = StaticSecretStore::new().with_secret("OathToken", "tok123");
        let secret = store.render("OathToken").await.unwrap();
        assert_eq!(secret.expose(), "tok123");
    }

    #[tokio::test]
    async fn test_static_store_missing_secret_is_fatal() {
        let store = StaticSecretStore::new();
        let err = store.render("sshHostKey").await.unwrap_err();
        assert!(matches!(err, Error::SecretRender { .. }));
    }
}
