//! Subscription lifecycle and message handling.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::StreamExt;
use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use super::transport::{Connector, Frame};
use super::{FieldSet, Record, field_set};
use crate::error::Result;

/// Transport-level connection status.
///
/// This is independent of whether a value has arrived: a subscription can
/// be `Closed` while still holding the last good value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelStatus {
    Connecting,
    Open,
    /// The peer closed the connection or the subscription was cancelled.
    Closed,
    /// The transport failed and a reconnect is pending; carries the error text.
    Errored(String),
    /// The transport failed and no further attempt will be made.
    Failed(String),
}

impl ChannelStatus {
    /// True once the connection task has stopped for good.
    ///
    /// `Closed` is final only when reconnects are disabled, since a
    /// reconnecting task passes through it on the way back to `Connecting`.
    #[must_use]
    pub fn is_terminal(&self, policy: ReconnectPolicy) -> bool {
        match self {
            Self::Failed(_) => true,
            Self::Closed => policy.max_attempts == 0,
            Self::Connecting | Self::Open | Self::Errored(_) => false,
        }
    }
}

/// Point-in-time view of a subscription.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSnapshot {
    /// Latest accepted record, `None` until the first valid message.
    pub value: Option<Record>,
    /// Number of messages accepted so far.
    pub accepted: u64,
    pub status: ChannelStatus,
}

impl ChannelSnapshot {
    fn initial() -> Self {
        Self {
            value: None,
            accepted: 0,
            status: ChannelStatus::Connecting,
        }
    }

    /// True until a valid message has been accepted.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.value.is_none()
    }
}

/// What happened to one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    /// The record replaced the current value.
    Accepted,
    /// Not a JSON object.
    Malformed,
    /// A required field was absent.
    MissingField(String),
    /// The subscription was already closed.
    Closed,
}

/// Reconnection behaviour after the transport drops.
///
/// Reconnects never reset the current value or the loading flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReconnectPolicy {
    /// Consecutive failed attempts allowed before giving up. Zero disables reconnects.
    pub max_attempts: u32,
    pub delay: Duration,
}

impl ReconnectPolicy {
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }
}

/// State shared between a [`Subscription`] handle and its connection task.
#[derive(Debug)]
struct ChannelCore {
    expected_fields: FieldSet,
    closed: AtomicBool,
    state: watch::Sender<ChannelSnapshot>,
}

impl ChannelCore {
    fn handle_message(&self, text: &str) -> MessageOutcome {
        if self.closed.load(Ordering::Acquire) {
            return MessageOutcome::Closed;
        }

        let record = match serde_json::from_str::<serde_json::Value>(text) {
            Ok(serde_json::Value::Object(record)) => record,
            Ok(_) | Err(_) => {
                debug!(name: "channel.message.discarded", reason = "malformed", "Discarded message");
                return MessageOutcome::Malformed;
            }
        };

        if let Some(missing) = self
            .expected_fields
            .iter()
            .find(|field| !record.contains_key(field.as_str()))
        {
            debug!(
                name: "channel.message.discarded",
                reason = "missing_field",
                field = %missing,
                "Discarded message"
            );
            return MessageOutcome::MissingField(missing.clone());
        }

        // Re-checked under the state lock so nothing lands after unsubscribe returns.
        let accepted = self.state.send_if_modified(|snapshot| {
            if self.closed.load(Ordering::Acquire) {
                return false;
            }
            snapshot.value = Some(record);
            snapshot.accepted += 1;
            true
        });
        if accepted {
            MessageOutcome::Accepted
        } else {
            MessageOutcome::Closed
        }
    }

    fn set_status(&self, status: ChannelStatus) {
        self.state.send_if_modified(|snapshot| {
            if self.closed.load(Ordering::Acquire) || snapshot.status == status {
                false
            } else {
                snapshot.status = status;
                true
            }
        });
    }
}

/// Opens subscriptions through a [`Connector`].
#[derive(Debug, Clone)]
pub struct Subscriber {
    connector: Arc<dyn Connector>,
    reconnect: ReconnectPolicy,
}

impl Subscriber {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            reconnect: ReconnectPolicy::disabled(),
        }
    }

    #[must_use]
    pub fn with_reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }

    /// Open a subscription to `endpoint` accepting only messages with every field in `expected_fields`.
    ///
    /// Must be called from within a tokio runtime; the connection runs on a
    /// spawned task owned by the returned handle.
    pub fn subscribe<I, S>(&self, endpoint: Url, expected_fields: I) -> Subscription
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let (state, _) = watch::channel(ChannelSnapshot::initial());
        let core = Arc::new(ChannelCore {
            expected_fields: field_set(expected_fields),
            closed: AtomicBool::new(false),
            state,
        });
        let cancel = CancellationToken::new();

        info!(
            name: "channel.subscribe",
            endpoint = %endpoint,
            fields = ?core.expected_fields,
            "Opening live channel"
        );

        tokio::spawn(run_connection(
            Arc::clone(&self.connector),
            endpoint.clone(),
            Arc::clone(&core),
            cancel.clone(),
            self.reconnect,
        ));

        Subscription {
            endpoint,
            core,
            cancel,
        }
    }
}

/// Handle to one live connection.
///
/// Dropping the handle unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    endpoint: Url,
    core: Arc<ChannelCore>,
    cancel: CancellationToken,
}

impl Subscription {
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    #[must_use]
    pub fn expected_fields(&self) -> &FieldSet {
        &self.core.expected_fields
    }

    /// Whether this subscription serves exactly these parameters.
    #[must_use]
    pub fn matches(&self, endpoint: &Url, expected_fields: &FieldSet) -> bool {
        &self.endpoint == endpoint && &self.core.expected_fields == expected_fields
    }

    /// Latest accepted record.
    #[must_use]
    pub fn current_value(&self) -> Option<Record> {
        self.core.state.borrow().value.clone()
    }

    /// Latest accepted record decoded as `T`.
    pub fn current_as<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        self.current_value()
            .map(|record| serde_json::from_value(serde_json::Value::Object(record)))
            .transpose()
            .map_err(Into::into)
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.core.state.borrow().is_loading()
    }

    #[must_use]
    pub fn status(&self) -> ChannelStatus {
        self.core.state.borrow().status.clone()
    }

    #[must_use]
    pub fn snapshot(&self) -> ChannelSnapshot {
        self.core.state.borrow().clone()
    }

    /// Receiver notified whenever the value or status changes.
    ///
    /// The receiver starts out marked changed, so the first `changed()`
    /// yields the current snapshot even if the connection task already
    /// moved on before the receiver existed.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<ChannelSnapshot> {
        let mut rx = self.core.state.subscribe();
        rx.mark_changed();
        rx
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.core.closed.load(Ordering::Acquire)
    }

    /// Feed one inbound text message through validation.
    ///
    /// This is the handler the connection task calls for every text frame.
    /// Embedders driving their own transport may call it directly.
    pub fn deliver(&self, text: &str) -> MessageOutcome {
        self.core.handle_message(text)
    }

    /// Close the connection. Later messages are ignored. Safe to call repeatedly.
    pub fn unsubscribe(&self) {
        if self.core.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.cancel.cancel();
        self.core.state.send_modify(|snapshot| snapshot.status = ChannelStatus::Closed);
        info!(name: "channel.unsubscribe", endpoint = %self.endpoint, "Closed live channel");
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

async fn run_connection(
    connector: Arc<dyn Connector>,
    endpoint: Url,
    core: Arc<ChannelCore>,
    cancel: CancellationToken,
    policy: ReconnectPolicy,
) {
    let mut failures: u32 = 0;

    loop {
        core.set_status(ChannelStatus::Connecting);

        let connected = tokio::select! {
            () = cancel.cancelled() => return,
            result = connector.connect(&endpoint) => result,
        };

        let failure = match connected {
            Ok(mut frames) => {
                failures = 0;
                core.set_status(ChannelStatus::Open);

                loop {
                    let next = tokio::select! {
                        () = cancel.cancelled() => return,
                        next = frames.next() => next,
                    };
                    match next {
                        Some(Ok(Frame::Text(text))) => {
                            core.handle_message(&text);
                        }
                        Some(Ok(Frame::Close)) | None => {
                            debug!(name: "channel.closed", endpoint = %endpoint, "Peer closed live channel");
                            break None;
                        }
                        Some(Err(e)) => {
                            warn!(name: "channel.error", endpoint = %endpoint, error = %e, "Live channel failed");
                            break Some(e.to_string());
                        }
                    }
                }
            }
            Err(e) => {
                failures += 1;
                warn!(
                    name: "channel.connect_failed",
                    endpoint = %endpoint,
                    attempt = failures,
                    error = %e,
                    "Could not open live channel"
                );
                Some(e.to_string())
            }
        };

        let retry = policy.max_attempts > 0 && failures < policy.max_attempts;
        match failure {
            Some(reason) if retry => core.set_status(ChannelStatus::Errored(reason)),
            Some(reason) => {
                warn!(
                    name: "channel.gave_up",
                    endpoint = %endpoint,
                    attempts = failures,
                    "Live channel stopped"
                );
                core.set_status(ChannelStatus::Failed(reason));
                return;
            }
            None => {
                core.set_status(ChannelStatus::Closed);
                if !retry {
                    return;
                }
            }
        }

        tokio::select! {
            () = cancel.cancelled() => return,
            () = tokio::time::sleep(policy.delay) => {}
        }
        debug!(name: "channel.reconnect", endpoint = %endpoint, "Reconnecting live channel");
    }
}
