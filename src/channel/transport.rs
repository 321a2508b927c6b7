//! Channel transports.

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use tokio_tungstenite::tungstenite::Message;
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};

/// An inbound transport event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A textual message.
    Text(String),
    /// The peer closed the connection.
    Close,
}

/// Inbound frames of one connection. The stream ending means the connection is gone.
pub type FrameStream = BoxStream<'static, Result<Frame>>;

#[async_trait]
pub trait Connector: Send + Sync + std::fmt::Debug {
    /// Open a connection to `endpoint`.
    ///
    /// Dropping the returned stream must close the connection.
    async fn connect(&self, endpoint: &Url) -> Result<FrameStream>;
}

/// WebSocket [`Connector`].
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

impl WsConnector {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, endpoint: &Url) -> Result<FrameStream> {
        match endpoint.scheme() {
            "ws" | "wss" => {}
            other => return Err(Error::UnsupportedScheme(other.to_string())),
        }

        let (socket, response) = tokio_tungstenite::connect_async(endpoint.as_str()).await?;
        debug!(
            name: "channel.ws.connected",
            endpoint = %endpoint,
            status = response.status().as_u16(),
            "WebSocket handshake complete"
        );

        let frames = socket.filter_map(|message| async move {
            match message {
                Ok(Message::Text(text)) => Some(Ok(Frame::Text(text))),
                // Some servers send JSON as binary frames.
                Ok(Message::Binary(bytes)) => String::from_utf8(bytes).ok().map(|t| Ok(Frame::Text(t))),
                Ok(Message::Close(_)) => Some(Ok(Frame::Close)),
                Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => None,
                Err(e) => Some(Err(Error::from(e))),
            }
        });

        Ok(frames.boxed())
    }
}
