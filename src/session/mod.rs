//! Authentication session state.
//!
//! This module is the single source of truth for who is logged in. State is
//! derived from durable storage at startup and changes only through the
//! [`AuthAction`] intents applied by [`SessionStore`].
//!
//! # Architecture
//!
//! - [`SessionState`]: immutable snapshot of the current identity
//! - [`AuthAction`] and [`reduce`]: the closed set of transitions
//! - [`SessionStore`]: shared container with login/logout side effects
//! - [`Credentials`]: persisted identity written by the login flow
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use smartfarm_dash::auth::KakaoAuth;
//! use smartfarm_dash::session::{SessionStore, UserName};
//! use smartfarm_dash::storage::MemoryStore;
//!
//! # async fn example() -> smartfarm_dash::Result<()> {
//! let storage = Arc::new(MemoryStore::new());
//! let kakao = Arc::new(KakaoAuth::new("https://kapi.kakao.com", storage.clone())?);
//! let store = SessionStore::initialize(storage, kakao).await;
//!
//! store.login(UserName::new("farmer")?).await;
//! assert!(store.state().is_authenticated());
//! # Ok(())
//! # }
//! ```

mod credentials;
mod state;
mod store;

pub use credentials::{Credentials, current_access_token};
pub use state::{AuthAction, SessionState, UserName, reduce};
pub use store::SessionStore;
