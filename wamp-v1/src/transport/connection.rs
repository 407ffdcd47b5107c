use std::fmt::Debug;

use anyhow::{
    Error,
    Result,
};
use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;

/// The capability to send text frames to a connected peer.
///
/// This is all the listener requires from a transport. Hosts with their own transport implement
/// this trait and drive [`crate::listener::Listener::serve`] with the text frames they receive.
#[async_trait]
pub trait Connection: Send + Sync + Debug {
    /// Sends a serialized message to the peer.
    async fn send_message(&self, text: String) -> Result<()>;
}

/// A [`Connection`] that queues outgoing messages on a channel, drained by a separate writer.
///
/// Sending never waits on the network, so a slow peer cannot stall the engine.
#[derive(Debug, Clone)]
pub struct ChannelConnection {
    message_tx: UnboundedSender<String>,
}

impl ChannelConnection {
    /// Creates a new connection over the given channel.
    pub fn new(message_tx: UnboundedSender<String>) -> Self {
        Self { message_tx }
    }
}

#[async_trait]
impl Connection for ChannelConnection {
    async fn send_message(&self, text: String) -> Result<()> {
        self.message_tx.send(text).map_err(Error::new)
    }
}
