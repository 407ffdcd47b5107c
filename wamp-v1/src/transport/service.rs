use anyhow::{
    Error,
    Result,
};
use futures_util::{
    SinkExt,
    StreamExt,
};
use log::{
    debug,
    error,
};
use tokio::{
    sync::{
        broadcast,
        mpsc::{
            UnboundedReceiver,
            UnboundedSender,
            unbounded_channel,
        },
    },
    task::JoinHandle,
};

use crate::transport::{
    connection::ChannelConnection,
    transport::{
        Transport,
        TransportData,
    },
};

/// A handle to an asynchronously-running [`Service`].
pub struct ServiceHandle {
    start_handle: JoinHandle<()>,
    cancel_tx: broadcast::Sender<()>,
    message_tx: UnboundedSender<String>,
}

impl ServiceHandle {
    /// Joins the task running the service.
    pub async fn join(self) -> Result<()> {
        self.start_handle.await.map_err(Error::new)
    }

    /// Cancels the service, closing the underlying transport.
    pub fn cancel(&self) -> Result<()> {
        self.cancel_tx.send(()).map(|_| ()).map_err(Error::new)
    }

    /// A connection for sending messages through the service.
    pub fn connection(&self) -> ChannelConnection {
        ChannelConnection::new(self.message_tx.clone())
    }
}

/// The asynchronous service that pumps text frames over an underlying transport.
///
/// Received frames are passed to a channel for the listener or client to process. Outgoing frames
/// are queued on another channel and written in order. The service ends when the transport closes,
/// fails, or the service is canceled; in every case the incoming channel is closed, which tells the
/// owner the connection is gone.
pub struct Service {
    name: String,
    transport: Box<dyn Transport>,
    incoming_tx: UnboundedSender<String>,
    cancel_tx: broadcast::Sender<()>,
    cancel_rx: broadcast::Receiver<()>,
    message_tx: UnboundedSender<String>,
    message_rx: UnboundedReceiver<String>,
}

impl Service {
    /// Creates a new service over the given transport.
    ///
    /// Also returns the channel of incoming text frames.
    pub fn new(name: String, transport: Box<dyn Transport>) -> (Self, UnboundedReceiver<String>) {
        let (incoming_tx, incoming_rx) = unbounded_channel();
        let (cancel_tx, cancel_rx) = broadcast::channel(1);
        let (message_tx, message_rx) = unbounded_channel();
        (
            Self {
                name,
                transport,
                incoming_tx,
                cancel_tx,
                cancel_rx,
                message_tx,
                message_rx,
            },
            incoming_rx,
        )
    }

    /// Starts the service asynchronously.
    ///
    /// This method takes ownership of the service. All future interactions with the service should
    /// be made through the returned handle.
    pub fn start(self) -> ServiceHandle {
        let cancel_tx = self.cancel_tx.clone();
        let message_tx = self.message_tx.clone();
        let start_handle = tokio::spawn(self.run());
        ServiceHandle {
            start_handle,
            cancel_tx,
            message_tx,
        }
    }

    async fn run(mut self) {
        if let Err(err) = self.service_loop().await {
            error!("Service {} failed: {err:#}", self.name);
        }
        // Ignore errors with the transport, since it may already be closed.
        self.transport.close().await.ok();
        debug!("Service {} ended", self.name);
    }

    async fn service_loop(&mut self) -> Result<()> {
        loop {
            tokio::select! {
                data = self.transport.next() => {
                    match data {
                        Some(Ok(TransportData::Ping(data))) => {
                            self.transport.send(TransportData::Ping(data)).await?;
                        }
                        Some(Ok(TransportData::Text(text))) => {
                            if self.incoming_tx.send(text).is_err() {
                                // Nobody is reading anymore.
                                return Ok(());
                            }
                        }
                        Some(Err(err)) => return Err(err),
                        None => return Ok(()),
                    }
                }
                text = self.message_rx.recv() => {
                    match text {
                        Some(text) => self.transport.send(TransportData::Text(text)).await?,
                        // Unreachable while the service holds its own sender.
                        None => return Ok(()),
                    }
                }
                _ = self.cancel_rx.recv() => {
                    // Flush what was queued before cancellation, such as a final CALLERROR.
                    while let Ok(text) = self.message_rx.try_recv() {
                        self.transport.send(TransportData::Text(text)).await?;
                    }
                    return Ok(());
                }
            }
        }
    }
}
