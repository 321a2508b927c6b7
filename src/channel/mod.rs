//! Live data channel subscriptions.
//!
//! A [`Subscription`] keeps one receive-only connection open to a server
//! endpoint and exposes the most recent message that carried every expected
//! field. Messages missing a field are dropped without touching state.
//!
//! # Architecture
//!
//! - [`Connector`]: opens a transport and yields inbound [`Frame`]s
//! - [`WsConnector`]: WebSocket implementation over `tokio-tungstenite`
//! - [`Subscriber`]: spawns one connection task per subscription
//! - [`Subscription`]: handle owning the connection; closing it is final
//! - [`ChannelSlot`]: replaces the subscription when its parameters change
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use smartfarm_dash::channel::{PricePrediction, Subscriber, WsConnector};
//!
//! # async fn example() -> smartfarm_dash::Result<()> {
//! let subscriber = Subscriber::new(Arc::new(WsConnector::new()));
//! let subscription = subscriber.subscribe(
//!     "ws://localhost:8002/apple".parse()?,
//!     ["image", "prediction"],
//! );
//!
//! let mut updates = subscription.watch();
//! updates.wait_for(|snapshot| !snapshot.is_loading()).await.ok();
//! let latest: Option<PricePrediction> = subscription.current_as()?;
//! # Ok(())
//! # }
//! ```

mod slot;
mod subscription;
mod transport;

pub use slot::ChannelSlot;
pub use subscription::{
    ChannelSnapshot, ChannelStatus, MessageOutcome, ReconnectPolicy, Subscriber, Subscription,
};
pub use transport::{Connector, Frame, FrameStream, WsConnector};

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A decoded inbound message.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Names of the fields a message must carry to be accepted.
pub type FieldSet = BTreeSet<String>;

/// Build a [`FieldSet`] from any list of names.
pub fn field_set<I, S>(fields: I) -> FieldSet
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    fields.into_iter().map(Into::into).collect()
}

/// Payload of the apple price prediction channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePrediction {
    /// Base64 encoded PNG of the prediction chart.
    pub image: String,
    /// Prediction data; the schema is owned by the model server.
    pub prediction: serde_json::Value,
}

impl PricePrediction {
    /// Fields a prediction message must carry.
    pub const FIELDS: [&'static str; 2] = ["image", "prediction"];
}
