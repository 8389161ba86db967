//! One live relay per browser session.
//!
//! Every relay registers under its session's socket key. Registering again
//! for the same key (a reload, or a fresh connection after login or logout)
//! signals the previous relay to stop, so identities never mix on one key.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, oneshot};

use crate::backend::types::ChatRole;

/// Registry key for one side of a session's chat. A session holding both
/// identities can run a customer relay and an admin relay side by side.
#[must_use]
pub fn relay_key(socket_key: &str, role: ChatRole) -> String {
    format!("{socket_key}:{}", role.as_str())
}

struct Entry {
    generation: u64,
    shutdown: oneshot::Sender<()>,
}

#[derive(Default)]
struct Inner {
    next_generation: u64,
    relays: HashMap<String, Entry>,
}

/// Shared map from socket key to the live relay.
#[derive(Clone, Default)]
pub struct SocketRegistry {
    inner: Arc<Mutex<Inner>>,
}

/// Handed to a newly registered relay.
///
/// `shutdown` resolves when a newer relay takes over the key.
pub struct RelayTicket {
    pub key: String,
    pub generation: u64,
    pub shutdown: oneshot::Receiver<()>,
}

impl SocketRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a relay for `key`, shutting down any relay already there.
    pub async fn register(&self, key: &str) -> RelayTicket {
        let (tx, rx) = oneshot::channel();
        let mut inner = self.inner.lock().await;
        inner.next_generation += 1;
        let generation = inner.next_generation;

        let previous = inner.relays.insert(
            key.to_string(),
            Entry {
                generation,
                shutdown: tx,
            },
        );
        if let Some(previous) = previous {
            tracing::debug!(key, generation = previous.generation, "Replacing chat relay");
            // The old relay may already be gone.
            let _ = previous.shutdown.send(());
        }

        RelayTicket {
            key: key.to_string(),
            generation,
            shutdown: rx,
        }
    }

    /// Forget a relay that has finished. A newer relay for the same key is
    /// left alone.
    pub async fn release(&self, key: &str, generation: u64) {
        let mut inner = self.inner.lock().await;
        if inner
            .relays
            .get(key)
            .is_some_and(|entry| entry.generation == generation)
        {
            inner.relays.remove(key);
        }
    }

    /// Stop the relay for `key`, if any.
    pub async fn shutdown(&self, key: &str) {
        let removed = self.inner.lock().await.relays.remove(key);
        if let Some(entry) = removed {
            let _ = entry.shutdown.send(());
        }
    }

    /// Number of live relays.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.relays.len()
    }

    /// Whether no relay is live.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
