use anyhow::{
    Error,
    Result,
};
use async_trait::async_trait;

use crate::core::{
    id::SessionId,
    types::Value,
    uri::Uri,
};

/// A procedure call, as reported to a [`ListenerObserver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallInfo {
    /// The call ID chosen by the caller.
    pub call_id: String,
    /// The resolved procedure URI.
    pub procedure: Uri,
    /// The calling session.
    pub session: SessionId,
}

/// Hooks into the lifecycle of sessions, topics, publications, and calls on a
/// [`crate::listener::Listener`].
///
/// Hooks ending in `-ing` run before the step and can cancel it by returning an error. The rest run
/// after the step completed. Hooks are never called while the listener holds a lock, so they may
/// call back into the listener.
///
/// Every hook has an empty default implementation.
#[async_trait]
pub trait ListenerObserver: Send + Sync {
    /// A session was established.
    async fn session_created(&self, _session: &SessionId) {}

    /// A session was closed.
    async fn session_closed(&self, _session: &SessionId) {}

    /// A topic is about to be created explicitly.
    async fn topic_creating(&self, _topic: &Uri) -> Result<()> {
        Ok(())
    }

    /// A topic was created, explicitly or by the first subscription.
    async fn topic_created(&self, _topic: &Uri) {}

    /// A topic was removed, explicitly or when its last subscriber left.
    async fn topic_removed(&self, _topic: &Uri) {}

    /// A session is about to subscribe to a topic.
    async fn subscribing(&self, _topic: &Uri, _session: &SessionId) -> Result<()> {
        Ok(())
    }

    /// A session subscribed to a topic.
    async fn subscribed(&self, _topic: &Uri, _session: &SessionId) {}

    /// A session unsubscribed from a topic.
    async fn unsubscribed(&self, _topic: &Uri, _session: &SessionId) {}

    /// An event is about to be published.
    ///
    /// The receivers computed from the topic's subscribers may be modified freely.
    async fn publishing(
        &self,
        _topic: &Uri,
        _publisher: Option<&SessionId>,
        _receivers: &mut Vec<SessionId>,
    ) -> Result<()> {
        Ok(())
    }

    /// An event was published to the given receivers.
    ///
    /// Only sessions that were registered and sent the event are reported.
    async fn published(
        &self,
        _topic: &Uri,
        _publisher: Option<&SessionId>,
        _receivers: &[SessionId],
    ) {
    }

    /// A procedure is about to be invoked.
    ///
    /// Cancellation answers the caller with a `wamp.error.canceled` error without running the
    /// procedure.
    async fn call_invoking(&self, _call: &CallInfo) -> Result<()> {
        Ok(())
    }

    /// A procedure call finished.
    async fn call_invoked(&self, _call: &CallInfo, _result: &Result<Value, Error>) {}
}

/// Default implementation of [`ListenerObserver`] with empty hooks.
#[derive(Debug, Default)]
pub struct EmptyListenerObserver {}

impl ListenerObserver for EmptyListenerObserver {}
