use std::{
    sync::Arc,
    time::Duration,
};

use anyhow::{
    Error,
    Result,
};
use log::{
    debug,
    info,
    warn,
};
use serde::{
    Serialize,
    de::DeserializeOwned,
};
use thiserror::Error;
use tokio::{
    sync::{
        Mutex,
        RwLock,
        broadcast,
        mpsc::UnboundedReceiver,
        oneshot,
    },
    task::JoinHandle,
};

use crate::{
    client::web_socket_connector,
    core::{
        error::{
            InteractionError,
            error_from_uri_and_description,
        },
        hash::HashMap,
        id::{
            IdAllocator,
            RandomIdAllocator,
            SessionId,
        },
        prefix::PrefixTable,
        types::{
            List,
            Value,
        },
        uri::Uri,
    },
    listener::DirectConnection,
    message::message::{
        CallMessage,
        Message,
        PROTOCOL_VERSION,
        PrefixMessage,
        PublishMessage,
        PublishRecipients,
        SubscribeMessage,
        UnsubscribeMessage,
        WelcomeMessage,
    },
    serializer::serializer::{
        Serializer,
        new_serializer,
    },
    transport::{
        connection::{
            ChannelConnection,
            Connection,
        },
        service::{
            Service,
            ServiceHandle,
        },
        transport::Transport,
        web_socket_transport::WebSocketTransport,
    },
};

const DEFAULT_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "-", env!("CARGO_PKG_VERSION"));

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Configuration for a [`Client`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Name of the client, mostly for logging.
    pub name: String,
    /// Agent name, sent in the WebSocket handshake.
    pub agent: String,
    /// Default deadline for procedure calls.
    pub call_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_AGENT.to_owned(),
            agent: DEFAULT_AGENT.to_owned(),
            call_timeout: None,
        }
    }
}

/// An event received for a subscribed topic.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceivedEvent {
    pub topic: Uri,
    pub event: Value,
}

/// A subscription to a topic.
#[derive(Debug)]
pub struct Subscription {
    /// The resolved topic URI.
    pub topic: Uri,
    /// The event receiver channel.
    pub event_rx: broadcast::Receiver<ReceivedEvent>,
}

/// Error for a client no longer being connected to its listener.
#[derive(Debug, Error)]
#[error("client is not connected")]
pub struct ClientNotConnectedError;

#[derive(Default)]
struct ClientState {
    prefixes: RwLock<PrefixTable>,
    subscriptions: Mutex<HashMap<Uri, broadcast::Sender<ReceivedEvent>>>,
    pending_calls: Mutex<HashMap<String, oneshot::Sender<Result<Value>>>>,
}

/// A WAMP v1 client that connects to a listener, subscribes to and publishes events, and calls
/// procedures.
///
/// The session is established on connect: the listener's WELCOME message is awaited before the
/// client is returned.
pub struct Client {
    config: ClientConfig,
    session_id: SessionId,
    server_ident: String,
    connection: ChannelConnection,
    serializer: Box<dyn Serializer>,
    id_allocator: Box<dyn IdAllocator>,
    state: Arc<ClientState>,
    service: Option<ServiceHandle>,
    reader: Option<JoinHandle<()>>,
}

impl Client {
    /// Connects to a listener over WebSocket.
    pub async fn connect(config: ClientConfig, uri: &str) -> Result<Self> {
        let stream = web_socket_connector::connect(&config, uri).await?;
        info!(
            "WAMP connection established with {uri} for client {}",
            config.name
        );
        Self::connect_transport(config, Box::new(WebSocketTransport::new(stream))).await
    }

    /// Connects to a listener in the same process.
    pub async fn direct_connect(config: ClientConfig, connection: DirectConnection) -> Result<Self> {
        Self::connect_transport(config, connection.transport()).await
    }

    /// Connects to a listener over an established transport.
    pub async fn connect_transport(config: ClientConfig, transport: Box<dyn Transport>) -> Result<Self> {
        let serializer = new_serializer();
        let (service, mut incoming_rx) = Service::new(config.name.clone(), transport);
        let service = service.start();
        let welcome = match Self::wait_for_welcome(&*serializer, &mut incoming_rx).await {
            Ok(welcome) => welcome,
            Err(err) => {
                service.cancel().ok();
                service.join().await.ok();
                return Err(err);
            }
        };
        info!(
            "Client {} joined session {} on {}",
            config.name, welcome.session_id, welcome.server_ident
        );

        let state = Arc::new(ClientState::default());
        let reader = tokio::spawn(Self::read_messages(
            config.name.clone(),
            new_serializer(),
            state.clone(),
            incoming_rx,
        ));
        Ok(Self {
            connection: service.connection(),
            session_id: welcome.session_id,
            server_ident: welcome.server_ident,
            config,
            serializer,
            id_allocator: Box::new(RandomIdAllocator::default()),
            state,
            service: Some(service),
            reader: Some(reader),
        })
    }

    async fn wait_for_welcome(
        serializer: &dyn Serializer,
        incoming_rx: &mut UnboundedReceiver<String>,
    ) -> Result<WelcomeMessage> {
        let text = incoming_rx
            .recv()
            .await
            .ok_or_else(|| Error::msg("connection closed before the session was established"))?;
        let frame = serializer.deserialize(&text)?;
        let welcome = match Message::decode(&frame)? {
            Message::Welcome(welcome) => welcome,
            message => {
                return Err(InteractionError::ProtocolViolation(format!(
                    "expected WELCOME message, received {}",
                    message.message_name()
                ))
                .into());
            }
        };
        if welcome.protocol_version != PROTOCOL_VERSION {
            return Err(InteractionError::ProtocolViolation(format!(
                "unsupported protocol version {}",
                welcome.protocol_version
            ))
            .into());
        }
        Ok(welcome)
    }

    async fn read_messages(
        name: String,
        serializer: Box<dyn Serializer>,
        state: Arc<ClientState>,
        mut incoming_rx: UnboundedReceiver<String>,
    ) {
        while let Some(text) = incoming_rx.recv().await {
            let message = match serializer
                .deserialize(&text)
                .and_then(|frame| Message::decode(&frame).map_err(Error::new))
            {
                Ok(message) => message,
                Err(err) => {
                    warn!("Client {name} dropping malformed message: {err:#}");
                    continue;
                }
            };
            match message {
                Message::Event(message) => {
                    let topic = match state.prefixes.read().await.resolve(&message.topic) {
                        Ok(topic) => topic,
                        Err(err) => {
                            warn!("Client {name} dropping event: {err}");
                            continue;
                        }
                    };
                    if let Some(event_tx) = state.subscriptions.lock().await.get(&topic) {
                        // No receivers is fine.
                        event_tx
                            .send(ReceivedEvent {
                                topic,
                                event: message.event,
                            })
                            .ok();
                    }
                }
                Message::CallResult(message) => {
                    if let Some(result_tx) = state.pending_calls.lock().await.remove(&message.call_id)
                    {
                        result_tx.send(Ok(message.result)).ok();
                    }
                }
                Message::CallError(message) => {
                    if let Some(result_tx) = state.pending_calls.lock().await.remove(&message.call_id)
                    {
                        result_tx
                            .send(Err(error_from_uri_and_description(
                                &message.error_uri,
                                message.error_description,
                                message.error_details,
                            )))
                            .ok();
                    }
                }
                message => {
                    debug!(
                        "Client {name} dropping unexpected {} message",
                        message.message_name()
                    );
                }
            }
        }
        // Waiting callers see their channels close.
        state.pending_calls.lock().await.clear();
        debug!("Client {name} stopped reading messages");
    }

    /// The session ID, as given by the listener.
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// The listener's server ident.
    pub fn server_ident(&self) -> &str {
        &self.server_ident
    }

    async fn send(&self, message: Message) -> Result<()> {
        let text = self.serializer.serialize_message(&message)?;
        self.connection
            .send_message(text)
            .await
            .map_err(|_| Error::new(ClientNotConnectedError))
    }

    /// Resolves a prefix, CURIE, or URI with the prefixes this client has established.
    pub async fn resolve(&self, token: &str) -> Result<Uri> {
        self.state
            .prefixes
            .read()
            .await
            .resolve(token)
            .map_err(Error::new)
    }

    /// Establishes a prefix for the session, on both sides of the connection.
    pub async fn prefix(&self, prefix: &str, uri: &str) -> Result<()> {
        self.state.prefixes.write().await.set_prefix(prefix, uri)?;
        self.send(Message::Prefix(PrefixMessage {
            prefix: prefix.to_owned(),
            uri: uri.to_owned(),
        }))
        .await
    }

    /// Subscribes to a topic.
    ///
    /// Subscribing to the same topic again shares the existing subscription.
    pub async fn subscribe(&self, topic: &str) -> Result<Subscription> {
        let topic = self.resolve(topic).await?;
        let mut subscriptions = self.state.subscriptions.lock().await;
        if let Some(event_tx) = subscriptions.get(&topic) {
            return Ok(Subscription {
                topic,
                event_rx: event_tx.subscribe(),
            });
        }
        self.send(Message::Subscribe(SubscribeMessage {
            topic: topic.to_string(),
        }))
        .await?;
        let (event_tx, event_rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        subscriptions.insert(topic.clone(), event_tx);
        Ok(Subscription { topic, event_rx })
    }

    /// Unsubscribes from a topic.
    ///
    /// Every [`Subscription`] to the topic stops receiving events.
    pub async fn unsubscribe(&self, topic: &str) -> Result<()> {
        let topic = self.resolve(topic).await?;
        if self.state.subscriptions.lock().await.remove(&topic).is_none() {
            return Err(Error::msg(format!("not subscribed to {topic}")));
        }
        self.send(Message::Unsubscribe(UnsubscribeMessage {
            topic: topic.into(),
        }))
        .await
    }

    /// Publishes an event to a topic, selecting receivers with `recipients`.
    pub async fn publish(
        &self,
        topic: &str,
        event: Value,
        recipients: PublishRecipients,
    ) -> Result<()> {
        let topic = self.resolve(topic).await?;
        self.send(Message::Publish(PublishMessage {
            topic: topic.into(),
            event,
            recipients,
        }))
        .await
    }

    /// Publishes an event to every subscriber of a topic, including this client.
    pub async fn publish_all(&self, topic: &str, event: Value) -> Result<()> {
        self.publish(topic, event, PublishRecipients::All).await
    }

    /// Publishes an event to every other subscriber of a topic.
    pub async fn publish_except_me(&self, topic: &str, event: Value) -> Result<()> {
        self.publish(topic, event, PublishRecipients::ExcludeMe)
            .await
    }

    /// Publishes an event to only the given subscribers of a topic.
    pub async fn publish_to(
        &self,
        topic: &str,
        event: Value,
        eligibles: Vec<SessionId>,
    ) -> Result<()> {
        self.publish(
            topic,
            event,
            PublishRecipients::Targeted {
                excludes: Vec::default(),
                eligibles,
            },
        )
        .await
    }

    /// Publishes an event to every subscriber of a topic except the given sessions.
    pub async fn publish_except(
        &self,
        topic: &str,
        event: Value,
        excludes: Vec<SessionId>,
    ) -> Result<()> {
        self.publish(
            topic,
            event,
            PublishRecipients::Targeted {
                excludes,
                eligibles: Vec::default(),
            },
        )
        .await
    }

    /// Calls a procedure, subject to the configured call timeout.
    ///
    /// A CALLERROR from the listener is returned as an error, which can be downcast to the
    /// matching error type. Unknown error URIs produce an [`crate::core::error::RpcError`].
    pub async fn call(&self, procedure: &str, arguments: List) -> Result<Value> {
        self.call_with_timeout(procedure, arguments, self.config.call_timeout)
            .await
    }

    /// Calls a procedure with an explicit deadline.
    pub async fn call_with_timeout(
        &self,
        procedure: &str,
        arguments: List,
        timeout: Option<Duration>,
    ) -> Result<Value> {
        let procedure = self.resolve(procedure).await?;
        let call_id = self.id_allocator.generate_id().await;
        let (result_tx, result_rx) = oneshot::channel();
        self.state
            .pending_calls
            .lock()
            .await
            .insert(call_id.clone(), result_tx);

        let sent = self
            .send(Message::Call(CallMessage {
                call_id: call_id.clone(),
                procedure: procedure.into(),
                arguments,
            }))
            .await;
        if let Err(err) = sent {
            self.state.pending_calls.lock().await.remove(&call_id);
            return Err(err);
        }

        let result = match timeout {
            Some(timeout) => match tokio::time::timeout(timeout, result_rx).await {
                Ok(result) => result,
                Err(_) => {
                    self.state.pending_calls.lock().await.remove(&call_id);
                    return Err(InteractionError::Timeout.into());
                }
            },
            None => result_rx.await,
        };
        result.map_err(|_| Error::new(ClientNotConnectedError))?
    }

    /// Calls a procedure with strongly-typed input and output.
    ///
    /// A tuple input is passed as positional arguments, `()` as no arguments, and anything else as
    /// a single argument.
    pub async fn call_typed<I, O>(&self, procedure: &str, input: I) -> Result<O>
    where
        I: Serialize,
        O: DeserializeOwned,
    {
        let arguments = match serde_json::to_value(input)? {
            Value::Null => List::default(),
            Value::Array(arguments) => arguments,
            argument => vec![argument],
        };
        let result = self.call(procedure, arguments).await?;
        serde_json::from_value(result).map_err(Error::new)
    }

    /// Disconnects from the listener, ending the session.
    ///
    /// Calls still waiting for a result fail with [`ClientNotConnectedError`].
    pub async fn disconnect(mut self) -> Result<()> {
        if let Some(service) = self.service.take() {
            // The service may have already ended on its own.
            service.cancel().ok();
            service.join().await?;
        }
        if let Some(reader) = self.reader.take() {
            reader.await?;
        }
        info!("Client {} disconnected", self.config.name);
        Ok(())
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        if let Some(service) = &self.service {
            service.cancel().ok();
        }
    }
}
