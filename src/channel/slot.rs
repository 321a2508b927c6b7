//! Parameter-scoped subscription holder.

use url::Url;

use super::subscription::{Subscriber, Subscription};
use super::{FieldSet, field_set};

/// Holds at most one subscription for a consumer.
///
/// Requesting the same endpoint and field set again reuses the open
/// connection; any change tears the old one down first, so no state carries
/// over between parameter sets.
#[derive(Debug)]
pub struct ChannelSlot {
    subscriber: Subscriber,
    current: Option<Subscription>,
}

impl ChannelSlot {
    #[must_use]
    pub fn new(subscriber: Subscriber) -> Self {
        Self {
            subscriber,
            current: None,
        }
    }

    /// Subscription for `(endpoint, expected_fields)`, opening one if needed.
    pub fn request<I, S>(&mut self, endpoint: Url, expected_fields: I) -> &Subscription
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields: FieldSet = field_set(expected_fields);

        if let Some(stale) = self
            .current
            .take_if(|sub| !sub.matches(&endpoint, &fields))
        {
            stale.unsubscribe();
        }

        let subscriber = &self.subscriber;
        self.current
            .get_or_insert_with(|| subscriber.subscribe(endpoint, fields))
    }

    /// Close the held subscription, if any.
    pub fn release(&mut self) {
        if let Some(sub) = self.current.take() {
            sub.unsubscribe();
        }
    }

    #[must_use]
    pub fn current(&self) -> Option<&Subscription> {
        self.current.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use futures::StreamExt;

    use super::*;
    use crate::channel::{Connector, FrameStream};
    use crate::error::Result;

    /// Counts connections; each stream stays open forever.
    #[derive(Debug, Default)]
    struct CountingConnector {
        connects: AtomicUsize,
    }

    #[async_trait]
    impl Connector for CountingConnector {
        async fn connect(&self, _endpoint: &Url) -> Result<FrameStream> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            Ok(futures::stream::pending().boxed())
        }
    }

    fn url(path: &str) -> Url {
        Url::parse(&format!("ws://localhost:8002/{path}")).unwrap()
    }

    #[tokio::test]
    async fn test_same_parameters_reuse_subscription() {
        let mut slot = ChannelSlot::new(Subscriber::new(Arc::new(CountingConnector::default())));

        slot.request(url("apple"), ["image", "prediction"])
            .deliver(r#"{"image":"a","prediction":1}"#);
        // Field order does not matter.
        let sub = slot.request(url("apple"), ["prediction", "image"]);

        assert!(!sub.is_loading());
    }

    #[tokio::test]
    async fn test_changed_endpoint_starts_fresh() {
        let mut slot = ChannelSlot::new(Subscriber::new(Arc::new(CountingConnector::default())));

        slot.request(url("apple"), ["image"])
            .deliver(r#"{"image":"a"}"#);
        let sub = slot.request(url("pear"), ["image"]);

        assert!(sub.is_loading());
        assert_eq!(sub.endpoint().path(), "/pear");
    }

    #[tokio::test]
    async fn test_changed_fields_starts_fresh() {
        let mut slot = ChannelSlot::new(Subscriber::new(Arc::new(CountingConnector::default())));

        slot.request(url("apple"), ["image"])
            .deliver(r#"{"image":"a"}"#);
        let sub = slot.request(url("apple"), ["image", "prediction"]);

        assert!(sub.is_loading());
    }

    #[tokio::test]
    async fn test_release_closes() {
        let connector = Arc::new(CountingConnector::default());
        let mut slot = ChannelSlot::new(Subscriber::new(connector.clone()));

        slot.request(url("apple"), ["image"]);
        for _ in 0..10 {
            if connector.connects.load(Ordering::SeqCst) == 1 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(connector.connects.load(Ordering::SeqCst), 1);

        slot.release();
        slot.release();
        assert!(slot.current().is_none());
    }
}
