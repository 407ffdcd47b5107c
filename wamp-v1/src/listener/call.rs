use std::future::Future;

use dashmap::{
    DashMap,
    mapref::entry::Entry,
};
use tokio::task::AbortHandle;

use crate::core::id::SessionId;

/// Identifies an in-flight call.
///
/// Call IDs are chosen by callers, so they are only unique per session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallKey {
    pub session: SessionId,
    pub call_id: String,
}

/// The table of calls currently executing, each on its own task.
#[derive(Debug, Default)]
pub struct CallManager {
    calls: DashMap<CallKey, AbortHandle>,
}

impl CallManager {
    /// Checks if a call is in flight.
    pub fn contains(&self, key: &CallKey) -> bool {
        self.calls.contains_key(key)
    }

    /// Spawns the task executing a call and records it as in flight.
    ///
    /// The entry is held while spawning, so the task cannot observe its own call as missing. Returns
    /// `false`, without spawning anything, if the call is already in flight.
    pub fn start<F>(&self, key: CallKey, call: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        match self.calls.entry(key) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                entry.insert(tokio::spawn(call).abort_handle());
                true
            }
        }
    }

    /// Removes a finished call.
    pub fn finish(&self, key: &CallKey) {
        self.calls.remove(key);
    }

    /// The number of calls in flight.
    pub fn len(&self) -> usize {
        self.calls.len()
    }

    /// Checks if no calls are in flight.
    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Aborts every call in flight.
    ///
    /// Returns the number of aborted calls.
    pub fn abort_all(&self) -> usize {
        let keys = self
            .calls
            .iter()
            .map(|entry| entry.key().clone())
            .collect::<Vec<_>>();
        let mut aborted = 0;
        for key in keys {
            if let Some((_, handle)) = self.calls.remove(&key) {
                handle.abort();
                aborted += 1;
            }
        }
        aborted
    }
}
