//! Smart-farm dashboard client core
//!
//! Native client for the agricultural monitoring dashboard: Kakao-backed
//! login state, live prediction feeds over WebSocket, and the environment
//! sensor API.
//!
//! # Architecture
//!
//! - **Session**: reducer-style authentication state restored from durable storage
//! - **Channel**: one receive-only connection per subscription, latest valid message wins
//! - **API**: bearer-authenticated REST client for sensor history and machine operation logs
//!
//! # Modules
//!
//! - [`auth`]: third-party identity provider (Kakao)
//! - [`channel`]: live channel subscriptions
//! - [`session`]: authentication state container
//! - [`storage`]: durable key/value storage
//! - [`api`]: dashboard REST client

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::cargo_common_metadata)]
#![allow(clippy::multiple_crate_versions)]

pub mod api;
pub mod auth;
pub mod channel;
pub mod config;
pub mod error;
pub mod session;
pub mod storage;
pub mod telemetry;

pub use error::{Error, Result};

use std::sync::Arc;
use std::time::Duration;

use crate::api::DashboardClient;
use crate::auth::KakaoAuth;
use crate::channel::{Subscriber, WsConnector};
use crate::config::AppConfig;
use crate::session::SessionStore;
use crate::storage::{DurableStore, FileStore};

/// Application context shared by every consumer.
///
/// Consumers receive the context explicitly instead of reaching for global
/// state. A context built with [`AppContext::new`] has no session store until
/// one is provided; asking for it before then is reported as
/// [`Error::SessionStoreMissing`] rather than an anonymous session.
#[derive(Debug, Clone)]
pub struct AppContext {
    /// Global Configuration
    pub config: Arc<AppConfig>,
    /// Durable storage shared by session, provider and API client
    pub storage: Arc<dyn DurableStore>,
    session: Option<SessionStore>,
}

impl AppContext {
    /// Context without a session store.
    pub fn new(config: AppConfig, storage: Arc<dyn DurableStore>) -> Self {
        Self {
            config: Arc::new(config),
            storage,
            session: None,
        }
    }

    /// Wire the default stack: file storage, Kakao provider, restored session.
    pub async fn bootstrap(config: AppConfig) -> Result<Self> {
        let storage: Arc<dyn DurableStore> = Arc::new(FileStore::new(&config.storage.path));
        let kakao = Arc::new(KakaoAuth::new(
            &config.auth.kakao_api_url,
            Arc::clone(&storage),
        )?);

        let session = SessionStore::initialize(Arc::clone(&storage), kakao).await;

        let mut ctx = Self::new(config, storage);
        ctx.provide_session(session);
        Ok(ctx)
    }

    pub fn provide_session(&mut self, session: SessionStore) {
        self.session = Some(session);
    }

    /// The session store, if one was provided.
    pub fn session(&self) -> Result<&SessionStore> {
        self.session.as_ref().ok_or(Error::SessionStoreMissing)
    }

    /// Dashboard API client using this context's storage for credentials.
    pub fn dashboard_client(&self) -> Result<DashboardClient> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.config.api.timeout_secs))
            .build()?;
        DashboardClient::with_client(&self.config.api.base_url, http, Arc::clone(&self.storage))
    }

    /// WebSocket subscriber with the configured reconnect policy.
    pub fn subscriber(&self) -> Subscriber {
        Subscriber::new(Arc::new(WsConnector::new()))
            .with_reconnect(self.config.channel.reconnect_policy())
    }
}
