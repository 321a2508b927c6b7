//! Durable client-side key/value storage.
//!
//! Persisted identity survives restarts of the dashboard. The session store
//! reads the user name from here at startup and clears every identity key on
//! logout.
//!
//! # Architecture
//!
//! - [`DurableStore`]: async key/value seam used by the session and API layers
//! - [`FileStore`]: JSON file on disk, the default for the CLI
//! - [`MemoryStore`]: process-local map, used by tests and embedders

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;

use crate::error::Result;

/// Key holding the logged-in user's display name.
pub const NAME_KEY: &str = "name";
/// Key holding the third-party access token.
pub const ACCESS_TOKEN_KEY: &str = "accessToken";
/// Key holding the access token's expiration time (RFC3339).
pub const EXPIRATION_TIME_KEY: &str = "expirationTime";

/// Every key that makes up a persisted identity, in removal order.
pub const IDENTITY_KEYS: [&str; 3] = [NAME_KEY, ACCESS_TOKEN_KEY, EXPIRATION_TIME_KEY];

#[async_trait]
pub trait DurableStore: Send + Sync + std::fmt::Debug {
    /// Read a value, `None` when the key was never written or was removed.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a key. Removing an absent key is not an error.
    async fn remove(&self, key: &str) -> Result<()>;
}
