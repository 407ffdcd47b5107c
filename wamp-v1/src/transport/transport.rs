use std::fmt::Debug;

use anyhow::{
    Error,
    Result,
};
use futures_util::{
    Sink,
    Stream,
};

/// A unit of data exchanged over a [`Transport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportData {
    /// A keep-alive probe. Received pings are echoed back; sent pings become pongs.
    Ping(Vec<u8>),
    /// One serialized WAMP v1 frame.
    Text(String),
}

/// A bidirectional, ordered channel of WAMP v1 text frames.
///
/// Streams end when the remote side closes. Data that cannot be WAMP v1 (such as binary WebSocket
/// messages) is reported as a stream error, which ends the connection.
pub trait Transport:
    Send + Stream<Item = Result<TransportData>> + Sink<TransportData, Error = Error> + Unpin + Debug
{
}
