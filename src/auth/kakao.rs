//! Kakao OAuth token revocation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};
use url::Url;

use super::IdentityProvider;
use crate::error::{Error, Result};
use crate::storage::{ACCESS_TOKEN_KEY, DurableStore};

/// Default Kakao API host.
pub const DEFAULT_KAKAO_API_URL: &str = "https://kapi.kakao.com";

const LOGOUT_PATH: &str = "/v1/user/logout";

/// Kakao identity provider.
///
/// The access token is the one persisted by the login flow under
/// [`ACCESS_TOKEN_KEY`]; revocation calls Kakao's user logout endpoint.
#[derive(Debug, Clone)]
pub struct KakaoAuth {
    api_url: Url,
    http: reqwest::Client,
    store: Arc<dyn DurableStore>,
}

impl KakaoAuth {
    /// Create a provider against the given Kakao API host.
    pub fn new(api_url: impl AsRef<str>, store: Arc<dyn DurableStore>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Self::with_client(api_url, http, store)
    }

    /// Create a provider with a custom reqwest client.
    pub fn with_client(
        api_url: impl AsRef<str>,
        http: reqwest::Client,
        store: Arc<dyn DurableStore>,
    ) -> Result<Self> {
        Ok(Self {
            api_url: Url::parse(api_url.as_ref())?,
            http,
            store,
        })
    }

    #[must_use]
    pub fn api_url(&self) -> &Url {
        &self.api_url
    }
}

#[async_trait]
impl IdentityProvider for KakaoAuth {
    async fn access_token(&self) -> Option<String> {
        match self.store.get(ACCESS_TOKEN_KEY).await {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(e) => {
                warn!(name: "auth.kakao.token_read_failed", error = %e, "Could not read access token");
                None
            }
        }
    }

    async fn logout(&self) -> Result<()> {
        let token = self.access_token().await.ok_or(Error::NotAuthenticated)?;
        let url = self.api_url.join(LOGOUT_PATH)?;

        let response = self.http.post(url).bearer_auth(token).send().await?;
        let status = response.status();
        if status.is_success() {
            debug!(name: "auth.kakao.logout", "Kakao session revoked");
            Ok(())
        } else {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".into());
            Err(Error::Api {
                status: status.as_u16(),
                message,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[tokio::test]
    async fn test_access_token_from_store() {
        let store = Arc::new(MemoryStore::with_entries([(ACCESS_TOKEN_KEY, "abc")]));
        let kakao = KakaoAuth::new(DEFAULT_KAKAO_API_URL, store).unwrap();
        assert_eq!(kakao.access_token().await.as_deref(), Some("abc"));
    }

    #[tokio::test]
    async fn test_empty_token_counts_as_absent() {
        let store = Arc::new(MemoryStore::with_entries([(ACCESS_TOKEN_KEY, "")]));
        let kakao = KakaoAuth::new(DEFAULT_KAKAO_API_URL, store).unwrap();
        assert!(kakao.access_token().await.is_none());
        assert!(matches!(kakao.logout().await, Err(Error::NotAuthenticated)));
    }

    #[test]
    fn test_invalid_api_url() {
        let store = Arc::new(MemoryStore::new());
        assert!(KakaoAuth::new("not a url", store).is_err());
    }
}
