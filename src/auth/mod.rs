//! Third-party identity provider integration.
//!
//! The dashboard signs users in through Kakao OAuth. The session store only
//! needs two things from the provider during logout: whether a token is
//! present, and a way to revoke it.

mod kakao;

pub use kakao::KakaoAuth;

use async_trait::async_trait;

use crate::error::Result;

#[async_trait]
pub trait IdentityProvider: Send + Sync + std::fmt::Debug {
    /// The provider's current access token, if one is held.
    async fn access_token(&self) -> Option<String>;

    /// Revoke the provider-side session for the current access token.
    async fn logout(&self) -> Result<()>;
}
