//! Shared HTTP clients for hosting-service polls.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, USER_AGENT};
use reqwest::Client;
use std::collections::HashMap;
use tokio::sync::Mutex;

use rosbuild_core::secret::Secret;
use rosbuild_core::{Error, Result};

/// User agent sent on every poll request.
pub const POLLER_USER_AGENT: &str = "Buildbot";

#[derive(Clone, PartialEq, Eq, Hash)]
struct PoolKey {
    base_url: String,
    auth: Option<String>,
}

/// Pool of HTTP clients shared across change sources.
///
/// Acquisition is idempotent per (base URL, credentials): repeated
/// acquisition for the same pair reuses one client. Pollers against the
/// same base URL with different tokens get distinct clients.
#[derive(Default)]
pub struct HttpClientPool {
    clients: Mutex<HashMap<PoolKey, Client>>,
}

impl HttpClientPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, base_url: &str, token: Option<&Secret>) -> Result<Client> {
        let key = PoolKey {
            base_url: base_url.to_string(),
            auth: token.map(|t| format!("token {}", t.expose())),
        };

        let mut clients = self.clients.lock().await;
        if let Some(client) = clients.get(&key) {
            return Ok(client.clone());
        }

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(POLLER_USER_AGENT));
        if let Some(auth) = &key.auth {
            let mut value =
                HeaderValue::from_str(auth).map_err(|e| Error::Http(e.to_string()))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;
        clients.insert(key, client.clone());
        Ok(client)
    }

    /// Number of distinct clients currently held.
    pub async fn len(&self) -> usize {
        self.clients.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_acquire_is_idempotent_per_base_url() {
        let pool = HttpClientPool::new();
        pool.acquire("https://api.github.com", None).await.unwrap();
        pool.acquire("https://api.github.com", None).await.unwrap();
        assert_eq!(pool.len().await, 1);
    }

    #[tokio::test]
    async fn test_distinct_tokens_get_distinct_clients() {
        let pool = HttpClientPool::new();
        let a = Secret::new("token-a");
        let b = Secret::new("token-b");
        pool.acquire("https://api.github.com", Some(&a)).await.unwrap();
        pool.acquire("https://api.github.com", Some(&b)).await.unwrap();
        pool.acquire("https://api.github.com", Some(&a)).await.unwrap();
        assert_eq!(pool.len().await, 2);
    }
}
