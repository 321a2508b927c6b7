//! Shared session container.

use std::sync::Arc;

use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

use super::state::{AuthAction, SessionState, UserName, reduce};
use crate::auth::IdentityProvider;
use crate::storage::{DurableStore, IDENTITY_KEYS, NAME_KEY};

/// Process-wide authentication state.
///
/// Cloning is cheap and every clone observes the same state. Consumers read
/// through [`SessionStore::state`] or [`SessionStore::subscribe`]; only
/// [`SessionStore::initialize`], [`SessionStore::login`] and
/// [`SessionStore::logout`] mutate it.
#[derive(Debug, Clone)]
pub struct SessionStore {
    inner: Arc<SessionStoreInner>,
}

#[derive(Debug)]
struct SessionStoreInner {
    state: watch::Sender<SessionState>,
    storage: Arc<dyn DurableStore>,
    provider: Arc<dyn IdentityProvider>,
    /// Serializes mutators so a login cannot interleave with a logout.
    mutation: Mutex<()>,
}

impl SessionStore {
    /// Build the store and restore any persisted user name.
    ///
    /// A storage read failure is logged and leaves the session anonymous.
    pub async fn initialize(
        storage: Arc<dyn DurableStore>,
        provider: Arc<dyn IdentityProvider>,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::anonymous());
        let store = Self {
            inner: Arc::new(SessionStoreInner {
                state,
                storage,
                provider,
                mutation: Mutex::new(()),
            }),
        };

        match store.inner.storage.get(NAME_KEY).await {
            Ok(Some(stored)) => match UserName::new(stored) {
                Ok(name) => {
                    info!(name: "session.restored", user = %name, "Restored persisted session");
                    store.dispatch(AuthAction::Login(name));
                }
                Err(_) => debug!(name: "session.restore.blank", "Ignoring blank persisted name"),
            },
            Ok(None) => debug!(name: "session.restore.none", "No persisted session"),
            Err(e) => {
                warn!(name: "session.restore.failed", error = %e, "Could not read persisted session");
            }
        }

        store
    }

    /// Mark `name` as the logged-in user.
    ///
    /// Persisting credentials is the login flow's job; see
    /// [`Credentials::persist`](super::Credentials::persist).
    pub async fn login(&self, name: UserName) {
        let _guard = self.inner.mutation.lock().await;
        info!(name: "session.login", user = %name, "User logged in");
        self.dispatch(AuthAction::Login(name));
    }

    /// Revoke the provider session, clear persisted identity, reset state.
    ///
    /// Every step runs even when an earlier one fails; failures are logged.
    pub async fn logout(&self) {
        let _guard = self.inner.mutation.lock().await;

        if self.inner.provider.access_token().await.is_some() {
            match self.inner.provider.logout().await {
                Ok(()) => debug!(name: "session.logout.revoked", "Provider token revoked"),
                Err(e) => warn!(
                    name: "session.logout.revoke_failed",
                    error = %e,
                    "Provider token revocation failed; continuing local logout"
                ),
            }
        }

        for key in IDENTITY_KEYS {
            if let Err(e) = self.inner.storage.remove(key).await {
                warn!(
                    name: "session.logout.storage_failed",
                    key,
                    error = %e,
                    "Could not remove persisted identity key"
                );
            }
        }

        self.dispatch(AuthAction::Logout);
        info!(name: "session.logout", "User logged out");
    }

    /// Current state snapshot.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    /// Receiver notified on every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    fn dispatch(&self, action: AuthAction) {
        self.inner.state.send_modify(|state| *state = reduce(state, action));
    }
}
