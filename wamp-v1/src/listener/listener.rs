use std::{
    net::{
        IpAddr,
        Ipv4Addr,
        SocketAddr,
    },
    sync::Arc,
    time::Duration,
};

use anyhow::{
    Error,
    Result,
};
use log::{
    debug,
    error,
    info,
    warn,
};
use tokio::{
    net::{
        TcpListener,
        TcpStream,
    },
    sync::{
        broadcast,
        mpsc::UnboundedReceiver,
    },
    task::JoinHandle,
};

use crate::{
    core::{
        error::InteractionError,
        id::{
            IdAllocator,
            RandomIdAllocator,
            SessionId,
        },
        prefix::PrefixTable,
        uri::Uri,
    },
    listener::{
        call::CallManager,
        observer::ListenerObserver,
        procedure::ProcedureManager,
        session::{
            Session,
            SessionManager,
        },
        topic::TopicManager,
        web_socket_acceptor,
    },
    message::{
        common::welcome_message,
        message::Message,
    },
    serializer::serializer::{
        Serializer,
        new_serializer,
    },
    transport::{
        connection::Connection,
        direct_transport::DirectTransport,
        service::Service,
        transport::Transport,
        web_socket_transport::WebSocketTransport,
    },
};

/// The server ident sent in WELCOME messages by default.
pub const DEFAULT_SERVER_IDENT: &str =
    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Configuration for a [`Listener`].
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    /// IP address the listener starts on.
    pub address: IpAddr,
    /// Network port the listener starts on.
    pub port: u16,
    /// Server name and version, communicated to clients.
    pub server_ident: String,
    /// Whether topics must be created and removed explicitly.
    ///
    /// If unset, a topic is created by its first subscription and removed when its last subscriber
    /// leaves.
    pub fixed_topics: bool,
    /// Deadline for each procedure call.
    pub call_timeout: Option<Duration>,
    /// URI that unresolvable CURIEs resolve to, making every session's prefix table fault-tolerant.
    pub default_uri: Option<Uri>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            address: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            port: 0,
            server_ident: DEFAULT_SERVER_IDENT.to_owned(),
            fixed_topics: false,
            call_timeout: None,
            default_uri: None,
        }
    }
}

/// A direct connection made to a listener, managed externally in the same process.
#[derive(Debug)]
pub struct DirectConnection {
    transport: DirectTransport,
}

impl DirectConnection {
    /// The transport to the listener.
    pub fn transport(self) -> Box<dyn Transport> {
        Box::new(self.transport)
    }
}

/// A handle to an asynchronously-running [`Listener`].
pub struct ListenerHandle {
    listener: Arc<Listener>,
    start_handle: JoinHandle<()>,
    local_addr: SocketAddr,
    cancel_tx: broadcast::Sender<()>,
}

impl ListenerHandle {
    /// Joins the listener task, effectively waiting for the listener to stop altogether.
    pub async fn join(self) -> Result<()> {
        self.start_handle.await.map_err(Error::new)
    }

    /// Cancels the listener.
    ///
    /// Cancellation is asynchronous. Use [`Self::join`] to wait for the listener to stop.
    pub fn cancel(&self) -> Result<()> {
        self.cancel_tx.send(()).map(|_| ()).map_err(Error::new)
    }

    /// Cancels the listener and waits for it to stop.
    pub async fn stop(self) -> Result<()> {
        self.cancel()?;
        self.join().await
    }

    /// The local address of the listener.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// The running listener, for registering procedures, managing topics, and publishing.
    pub fn listener(&self) -> &Arc<Listener> {
        &self.listener
    }

    /// Starts a direct connection to the listener.
    pub fn direct_connect(&self) -> DirectConnection {
        self.listener.direct_connect()
    }
}

/// A WAMP v1 listener (a.k.a., server) that hosts sessions, topics, and procedures.
///
/// The listener is the protocol engine: it is driven by [`Self::on_connected`],
/// [`Self::on_received`], and [`Self::on_disconnected`] for each connection, which
/// [`Self::serve`] does for any [`Connection`]. [`Self::start`] additionally accepts WebSocket
/// connections over TCP.
pub struct Listener {
    pub(crate) config: ListenerConfig,
    pub(crate) observer: Box<dyn ListenerObserver>,
    pub(crate) sessions: SessionManager,
    pub(crate) topics: TopicManager,
    pub(crate) procedures: ProcedureManager,
    pub(crate) calls: CallManager,
    pub(crate) serializer: Box<dyn Serializer>,
    id_allocator: Box<dyn IdAllocator>,
    cancel_tx: broadcast::Sender<()>,
}

impl Listener {
    /// Creates a new [`Listener`].
    pub fn new(config: ListenerConfig, observer: Box<dyn ListenerObserver>) -> Self {
        let (cancel_tx, _) = broadcast::channel(1);
        Self {
            config,
            observer,
            sessions: SessionManager::default(),
            topics: TopicManager::default(),
            procedures: ProcedureManager::default(),
            calls: CallManager::default(),
            serializer: new_serializer(),
            id_allocator: Box::new(RandomIdAllocator::default()),
            cancel_tx,
        }
    }

    /// The listener configuration.
    pub fn config(&self) -> &ListenerConfig {
        &self.config
    }

    /// Looks up a live session.
    pub fn session(&self, id: &SessionId) -> Option<Arc<Session>> {
        self.sessions.get(id)
    }

    /// The IDs of all live sessions.
    pub fn sessions(&self) -> Vec<SessionId> {
        self.sessions.ids()
    }

    /// Starts accepting WebSocket connections asynchronously.
    ///
    /// The returned handle can be used to stop the listener.
    pub async fn start(self: Arc<Self>) -> Result<ListenerHandle> {
        let addr = format!("{}:{}", self.config.address, self.config.port);
        info!(
            "Starting listener {} at {addr}: {:?}",
            self.config.server_ident, self.config
        );
        let tcp_listener = TcpListener::bind(&addr).await?;
        let local_addr = tcp_listener.local_addr()?;
        let start_handle = tokio::spawn(self.clone().handle_connections(tcp_listener));
        Ok(ListenerHandle {
            cancel_tx: self.cancel_tx.clone(),
            listener: self,
            start_handle,
            local_addr,
        })
    }

    async fn handle_connections(self: Arc<Self>, tcp_listener: TcpListener) {
        self.connection_loop(tcp_listener).await;
        self.shut_down();
    }

    async fn connection_loop(self: &Arc<Self>, tcp_listener: TcpListener) {
        let mut cancel_rx = self.cancel_tx.subscribe();
        loop {
            tokio::select! {
                accept = tcp_listener.accept() => {
                    let (stream, addr) = match accept {
                        Ok((stream, addr)) => (stream, addr),
                        Err(err) => {
                            error!("Failed to accept TCP connection: {err}");
                            break;
                        }
                    };
                    tokio::spawn(self.clone().handle_connection(stream, addr));
                }
                _ = cancel_rx.recv() => {
                    break;
                }
            }
        }
    }

    async fn handle_connection(self: Arc<Self>, stream: TcpStream, addr: SocketAddr) {
        debug!("Incoming TCP connection from {addr}");
        let stream = match web_socket_acceptor::accept(stream).await {
            Ok(stream) => stream,
            Err(err) => {
                error!("Failed to accept WebSocket connection from {addr}: {err}");
                return;
            }
        };
        debug!("WAMP connection established with {addr}");
        self.serve_transport(addr.to_string(), Box::new(WebSocketTransport::new(stream)))
            .await;
    }

    async fn serve_transport(self: Arc<Self>, name: String, transport: Box<dyn Transport>) {
        let (service, incoming_rx) = Service::new(name.clone(), transport);
        let service = service.start();
        if let Err(err) = self
            .serve(Arc::new(service.connection()), incoming_rx)
            .await
        {
            warn!("Closing connection {name}: {err:#}");
        }
        // The service may have already ended on its own.
        service.cancel().ok();
        if let Err(err) = service.join().await {
            error!("Failed to join service for connection {name}: {err}");
        }
    }

    fn shut_down(&self) {
        let aborted = self.calls.abort_all();
        info!(
            "Listener {} stopped, aborted {aborted} in-flight calls",
            self.config.server_ident
        );
    }

    /// Starts a direct connection to the listener over in-process channels.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn direct_connect(self: &Arc<Self>) -> DirectConnection {
        let (listener_transport, client_transport) = DirectTransport::pair();
        tokio::spawn(
            self.clone()
                .serve_transport("direct".to_owned(), Box::new(listener_transport)),
        );
        DirectConnection {
            transport: client_transport,
        }
    }

    /// Runs a session over a connection until `incoming` closes or the listener is stopped.
    ///
    /// Each text frame received from `incoming` is handled with [`Self::on_received`]. An error is
    /// returned only for protocol-fatal conditions, after which the caller should close the
    /// underlying transport.
    pub async fn serve(
        self: &Arc<Self>,
        connection: Arc<dyn Connection>,
        mut incoming: UnboundedReceiver<String>,
    ) -> Result<()> {
        let mut cancel_rx = self.cancel_tx.subscribe();
        let session = self.on_connected(connection).await?;
        let result = loop {
            tokio::select! {
                text = incoming.recv() => {
                    match text {
                        Some(text) => {
                            if let Err(err) = self.on_received(&session, &text).await {
                                break Err(err);
                            }
                        }
                        None => break Ok(()),
                    }
                }
                _ = cancel_rx.recv() => break Ok(()),
            }
        };
        self.on_disconnected(session.id()).await;
        result
    }

    /// Establishes a session for a new connection.
    ///
    /// The session is registered under a fresh random ID, and the peer is sent a WELCOME message.
    pub async fn on_connected(&self, connection: Arc<dyn Connection>) -> Result<Arc<Session>> {
        let prefixes = match &self.config.default_uri {
            Some(uri) => PrefixTable::with_default_uri(uri)?,
            None => PrefixTable::default(),
        };
        let session = loop {
            let id = SessionId::from(self.id_allocator.generate_id().await);
            let session = Arc::new(Session::new(id, connection.clone(), prefixes.clone()));
            if self.sessions.insert(session.clone()) {
                break session;
            }
        };

        let welcome = welcome_message(session.id().clone(), &self.config.server_ident);
        if let Err(err) = self.send(&session, &welcome).await {
            self.sessions.remove(session.id());
            return Err(err);
        }

        info!("Session {} established", session.id());
        self.observer.session_created(session.id()).await;
        Ok(session)
    }

    /// Closes a session.
    ///
    /// The session's subscriptions are dropped, which may remove topics. Returns `false` if the
    /// session was not registered.
    pub async fn on_disconnected(&self, id: &SessionId) -> bool {
        let session = match self.sessions.remove(id) {
            Some(session) => session,
            None => return false,
        };
        for topic in session.take_subscriptions().await {
            self.remove_subscriber(&topic, id).await;
        }
        info!("Session {id} closed");
        self.observer.session_closed(id).await;
        true
    }

    /// Handles a text frame received from a session's peer.
    ///
    /// Malformed messages and failed requests are logged and dropped. An error is returned only if
    /// the text is not a frame at all, which is fatal for the connection.
    pub async fn on_received(self: &Arc<Self>, session: &Arc<Session>, text: &str) -> Result<()> {
        let frame = self.serializer.deserialize(text).map_err(|err| {
            InteractionError::ProtocolViolation(format!("failed to deserialize frame: {err}"))
        })?;
        let message = match Message::decode(&frame) {
            Ok(message) => message,
            Err(err) => {
                warn!(
                    "Dropping malformed message from session {}: {err}: {:?}",
                    session.id(),
                    err.frame
                );
                return Ok(());
            }
        };
        debug!(
            "Received {} message from session {}",
            message.message_name(),
            session.id()
        );
        if let Err(err) = self.handle_message(session, message).await {
            warn!("Failed to handle message from session {}: {err:#}", session.id());
        }
        Ok(())
    }

    async fn handle_message(self: &Arc<Self>, session: &Arc<Session>, message: Message) -> Result<()> {
        match message {
            Message::Prefix(message) => {
                session
                    .prefixes_mut()
                    .await
                    .set_prefix(message.prefix, &message.uri)?;
            }
            Message::Call(message) => self.dispatch_call(session, message).await,
            Message::Subscribe(message) => {
                let topic = session.prefixes().await.resolve(&message.topic)?;
                self.subscribe(topic, session.id()).await;
            }
            Message::Unsubscribe(message) => {
                let topic = session.prefixes().await.resolve(&message.topic)?;
                self.unsubscribe(&topic, session.id()).await;
            }
            Message::Publish(message) => {
                let topic = session.prefixes().await.resolve(&message.topic)?;
                self.publish(
                    &topic,
                    Some(session.id()),
                    message.event,
                    &message.recipients.into(),
                )
                .await;
            }
            message => {
                debug!(
                    "Dropping {} message, which is not sent to listeners",
                    message.message_name()
                );
            }
        }
        Ok(())
    }

    /// Serializes and sends a message to a session.
    pub(crate) async fn send(&self, session: &Session, message: &Message) -> Result<()> {
        let text = self.serializer.serialize_message(message)?;
        session.send_message(text).await
    }
}

#[cfg(test)]
mod listener_test {
    use std::sync::Arc;

    use serde_json::json;
    use tokio::sync::mpsc::{
        UnboundedReceiver,
        unbounded_channel,
    };

    use crate::{
        core::{
            id::SessionId,
            uri::Uri,
        },
        listener::{
            listener::{
                DEFAULT_SERVER_IDENT,
                Listener,
                ListenerConfig,
            },
            observer::EmptyListenerObserver,
            session::Session,
        },
        transport::connection::ChannelConnection,
    };

    fn listener(config: ListenerConfig) -> Arc<Listener> {
        Arc::new(Listener::new(config, Box::new(EmptyListenerObserver::default())))
    }

    async fn connect(listener: &Arc<Listener>) -> (Arc<Session>, UnboundedReceiver<String>) {
        let (message_tx, message_rx) = unbounded_channel();
        let session = listener
            .on_connected(Arc::new(ChannelConnection::new(message_tx)))
            .await
            .unwrap();
        (session, message_rx)
    }

    fn frame(text: &str) -> serde_json::Value {
        serde_json::from_str(text).unwrap()
    }

    #[tokio::test]
    async fn sends_welcome_on_connect() {
        let listener = listener(ListenerConfig::default());
        let (session, mut message_rx) = connect(&listener).await;
        pretty_assertions::assert_eq!(session.id().as_str().len(), 16);
        pretty_assertions::assert_eq!(
            frame(&message_rx.recv().await.unwrap()),
            json!([0, session.id().as_str(), 1, DEFAULT_SERVER_IDENT])
        );
        pretty_assertions::assert_eq!(listener.sessions(), vec![session.id().clone()]);
    }

    #[tokio::test]
    async fn unregisters_session_on_disconnect() {
        let listener = listener(ListenerConfig::default());
        let (session, _message_rx) = connect(&listener).await;
        assert!(listener.on_disconnected(session.id()).await);
        assert!(!listener.on_disconnected(session.id()).await);
        assert!(listener.session(session.id()).is_none());
    }

    #[tokio::test]
    async fn prunes_subscriptions_on_disconnect() {
        let listener = listener(ListenerConfig::default());
        let (a, _a_rx) = connect(&listener).await;
        let (b, _b_rx) = connect(&listener).await;
        let topic = Uri::try_from("http://example.com/event").unwrap();
        assert!(listener.subscribe(topic.clone(), a.id()).await);
        assert!(listener.subscribe(topic.clone(), b.id()).await);

        listener.on_disconnected(a.id()).await;
        pretty_assertions::assert_eq!(
            listener.subscribers(&topic).await,
            Some(vec![b.id().clone()])
        );
        listener.on_disconnected(b.id()).await;
        assert!(listener.topics().await.is_empty());
    }

    #[tokio::test]
    async fn only_fails_on_frames_that_are_not_arrays() {
        let listener = listener(ListenerConfig::default());
        let (session, _message_rx) = connect(&listener).await;
        assert_matches::assert_matches!(listener.on_received(&session, "[99]").await, Ok(()));
        assert_matches::assert_matches!(listener.on_received(&session, "[5]").await, Ok(()));
        assert_matches::assert_matches!(
            listener.on_received(&session, r#"[5, "not a uri"]"#).await,
            Ok(())
        );
        assert_matches::assert_matches!(
            listener.on_received(&session, r#"[8, "http://example.com/event", 1]"#).await,
            Ok(())
        );
        assert_matches::assert_matches!(listener.on_received(&session, r#"{"a": 1}"#).await, Err(_));
        assert_matches::assert_matches!(listener.on_received(&session, "[5,").await, Err(_));
    }

    #[tokio::test]
    async fn resolves_prefixes_per_session() {
        let listener = listener(ListenerConfig::default());
        let (a, _a_rx) = connect(&listener).await;
        let (b, _b_rx) = connect(&listener).await;
        assert_matches::assert_matches!(
            listener
                .on_received(&a, r#"[1, "event", "http://example.com/event#"]"#)
                .await,
            Ok(())
        );
        assert_matches::assert_matches!(
            listener.on_received(&a, r#"[5, "event:a"]"#).await,
            Ok(())
        );
        assert_matches::assert_matches!(
            listener.on_received(&b, r#"[5, "event:a"]"#).await,
            Ok(())
        );
        let mut topics = listener.topics().await;
        topics.sort();
        pretty_assertions::assert_eq!(
            topics,
            vec![
                Uri::try_from("event:a").unwrap(),
                Uri::try_from("http://example.com/event#a").unwrap(),
            ]
        );
    }

    #[tokio::test]
    async fn fault_tolerant_prefixes_use_default_uri() {
        let listener = listener(ListenerConfig {
            default_uri: Some(Uri::try_from("http://example.com/unknown").unwrap()),
            ..Default::default()
        });
        let (session, _message_rx) = connect(&listener).await;
        assert_matches::assert_matches!(
            listener.on_received(&session, r#"[5, "not a uri"]"#).await,
            Ok(())
        );
        pretty_assertions::assert_eq!(
            listener.topics().await,
            vec![Uri::try_from("http://example.com/unknown").unwrap()]
        );
        pretty_assertions::assert_eq!(
            listener
                .subscribers(&Uri::try_from("http://example.com/unknown").unwrap())
                .await,
            Some(vec![SessionId::from(session.id().as_str())])
        );
    }
}
