use std::sync::Arc;

use anyhow::Result;
use dashmap::{
    DashMap,
    mapref::entry::Entry,
};
use tokio::sync::{
    Mutex,
    RwLock,
    RwLockReadGuard,
    RwLockWriteGuard,
};

use crate::{
    core::{
        hash::HashSet,
        id::SessionId,
        prefix::PrefixTable,
        uri::Uri,
    },
    transport::connection::Connection,
};

/// The listener's view of one connected peer.
///
/// Owns the peer's prefix table and remembers which topics it subscribed to, so that its
/// subscriptions can be dropped when it disconnects.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    connection: Arc<dyn Connection>,
    prefixes: RwLock<PrefixTable>,
    subscriptions: Mutex<HashSet<Uri>>,
}

impl Session {
    pub(crate) fn new(
        id: SessionId,
        connection: Arc<dyn Connection>,
        prefixes: PrefixTable,
    ) -> Self {
        Self {
            id,
            connection,
            prefixes: RwLock::new(prefixes),
            subscriptions: Mutex::new(HashSet::default()),
        }
    }

    /// The session ID.
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Sends serialized text to the peer.
    pub async fn send_message(&self, text: String) -> Result<()> {
        self.connection.send_message(text).await
    }

    /// Read access to the session's prefix table.
    pub async fn prefixes(&self) -> RwLockReadGuard<'_, PrefixTable> {
        self.prefixes.read().await
    }

    pub(crate) async fn prefixes_mut(&self) -> RwLockWriteGuard<'_, PrefixTable> {
        self.prefixes.write().await
    }

    /// The topics the session is subscribed to.
    pub async fn subscriptions(&self) -> Vec<Uri> {
        self.subscriptions.lock().await.iter().cloned().collect()
    }

    pub(crate) async fn record_subscription(&self, topic: Uri) {
        self.subscriptions.lock().await.insert(topic);
    }

    pub(crate) async fn forget_subscription(&self, topic: &Uri) {
        self.subscriptions.lock().await.remove(topic);
    }

    pub(crate) async fn take_subscriptions(&self) -> Vec<Uri> {
        self.subscriptions.lock().await.drain().collect()
    }
}

/// The registry of live sessions.
///
/// Lookups happen on every publication and call, so the map is sharded for cheap concurrent reads.
#[derive(Debug, Default)]
pub struct SessionManager {
    sessions: DashMap<SessionId, Arc<Session>>,
}

impl SessionManager {
    /// Registers a session, unless its ID is already taken.
    pub fn insert(&self, session: Arc<Session>) -> bool {
        match self.sessions.entry(session.id().clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                entry.insert(session);
                true
            }
        }
    }

    /// Unregisters a session.
    pub fn remove(&self, id: &SessionId) -> Option<Arc<Session>> {
        self.sessions.remove(id).map(|(_, session)| session)
    }

    /// Looks up a session.
    pub fn get(&self, id: &SessionId) -> Option<Arc<Session>> {
        self.sessions.get(id).map(|session| session.value().clone())
    }

    /// Checks if a session is registered.
    pub fn contains(&self, id: &SessionId) -> bool {
        self.sessions.contains_key(id)
    }

    /// The IDs of all registered sessions.
    pub fn ids(&self) -> Vec<SessionId> {
        self.sessions.iter().map(|entry| entry.key().clone()).collect()
    }

    /// The number of registered sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Checks if no sessions are registered.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Unregisters every session.
    pub fn drain(&self) -> Vec<Arc<Session>> {
        let ids = self.ids();
        ids.iter().filter_map(|id| self.remove(id)).collect()
    }
}
