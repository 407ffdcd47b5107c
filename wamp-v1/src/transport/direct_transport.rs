use std::{
    pin::Pin,
    task,
};

use anyhow::{
    Error,
    Result,
};
use futures_util::{
    Sink,
    Stream,
};
use tokio::sync::mpsc::{
    UnboundedReceiver,
    UnboundedSender,
    unbounded_channel,
};

use crate::transport::transport::{
    Transport,
    TransportData,
};

/// A transport over in-process channels, for connecting a client and a listener in the same
/// process.
#[derive(Debug)]
pub struct DirectTransport {
    message_tx: UnboundedSender<String>,
    message_rx: UnboundedReceiver<String>,
}

impl DirectTransport {
    /// Creates two transports connected to each other.
    pub fn pair() -> (Self, Self) {
        let (a_to_b_tx, a_to_b_rx) = unbounded_channel();
        let (b_to_a_tx, b_to_a_rx) = unbounded_channel();
        (
            Self {
                message_tx: a_to_b_tx,
                message_rx: b_to_a_rx,
            },
            Self {
                message_tx: b_to_a_tx,
                message_rx: a_to_b_rx,
            },
        )
    }
}

impl Transport for DirectTransport {}

impl Stream for DirectTransport {
    type Item = Result<TransportData>;

    fn poll_next(
        mut self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
    ) -> task::Poll<Option<Self::Item>> {
        self.message_rx
            .poll_recv(cx)
            .map(|text| text.map(|text| Ok(TransportData::Text(text))))
    }
}

impl Sink<TransportData> for DirectTransport {
    type Error = Error;

    fn poll_ready(
        self: Pin<&mut Self>,
        _: &mut task::Context<'_>,
    ) -> task::Poll<std::result::Result<(), Self::Error>> {
        task::Poll::Ready(Ok(()))
    }

    fn start_send(
        self: Pin<&mut Self>,
        item: TransportData,
    ) -> std::result::Result<(), Self::Error> {
        match item {
            // Nothing pings over a channel.
            TransportData::Ping(_) => Ok(()),
            TransportData::Text(text) => self.message_tx.send(text).map_err(Error::new),
        }
    }

    fn poll_flush(
        self: Pin<&mut Self>,
        _: &mut task::Context<'_>,
    ) -> task::Poll<std::result::Result<(), Self::Error>> {
        task::Poll::Ready(Ok(()))
    }

    fn poll_close(
        mut self: Pin<&mut Self>,
        _: &mut task::Context<'_>,
    ) -> task::Poll<std::result::Result<(), Self::Error>> {
        self.message_rx.close();
        task::Poll::Ready(Ok(()))
    }
}
