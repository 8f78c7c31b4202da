//! Session registry
//!
//! The registry is the process-wide record of which channels have a game
//! running. Starting a game atomically checks the channel's allow-list and
//! that no other session holds the channel, then hands out a
//! [`Registration`] whose lease frees the channel when dropped.

use std::{
    collections::{HashMap, HashSet},
    fmt::{Debug, Display},
    hash::Hash,
    ops::{Deref, DerefMut},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use derive_where::derive_where;
use thiserror::Error;
use tracing::debug;

use crate::{chat::ChannelId, session::SessionId};

/// Reasons a game cannot start in a channel
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refusal {
    /// Another session holds the channel
    #[error("a game is already running in this channel")]
    AlreadyRunning,
    /// The channel is not on the allow-list
    #[error("games are not allowed in this channel")]
    ChannelNotAllowed,
}

#[derive(Debug)]
struct Inner<K: Eq + Hash> {
    allowed: HashSet<K>,
    active: Mutex<HashMap<K, SessionId>>,
}

impl<K: Eq + Hash> Inner<K> {
    fn active(&self) -> MutexGuard<'_, HashMap<K, SessionId>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Tracks the live session of every channel
///
/// Clones share the same record.
#[derive_where(Clone)]
#[derive_where(Debug; K: Debug)]
pub struct Registry<K: Eq + Hash> {
    inner: Arc<Inner<K>>,
}

/// Registry keyed by chat channel
pub type ChannelRegistry = Registry<ChannelId>;

impl<K: Eq + Hash + Clone + Display> Registry<K> {
    /// Creates a registry where games may run in the `allowed` channels
    pub fn new(allowed: impl IntoIterator<Item = K>) -> Self {
        Self {
            inner: Arc::new(Inner {
                allowed: allowed.into_iter().collect(),
                active: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Whether games may run in `channel`
    pub fn is_allowed(&self, channel: &K) -> bool {
        self.inner.allowed.contains(channel)
    }

    /// Whether a session currently holds `channel`
    pub fn is_active(&self, channel: &K) -> bool {
        self.inner.active().contains_key(channel)
    }

    /// Identifier of the session holding `channel`
    pub fn session_id(&self, channel: &K) -> Option<SessionId> {
        self.inner.active().get(channel).copied()
    }

    /// Number of channels with a live session
    pub fn active_count(&self) -> usize {
        self.inner.active().len()
    }

    /// Claims `channel` for a new session built by `factory`
    ///
    /// Checking that the channel is free and recording the claim happen
    /// under one lock, so two concurrent calls for the same channel cannot
    /// both succeed. The factory runs after the claim with the new
    /// session's id.
    ///
    /// # Errors
    ///
    /// Returns [`Refusal::ChannelNotAllowed`] for a channel outside the
    /// allow-list and [`Refusal::AlreadyRunning`] if another session holds
    /// the channel. No session is built in either case.
    pub fn try_start<S>(
        &self,
        channel: K,
        factory: impl FnOnce(SessionId) -> S,
    ) -> Result<Registration<K, S>, Refusal> {
        if !self.is_allowed(&channel) {
            debug!(%channel, "refused game in channel outside the allow-list");
            return Err(Refusal::ChannelNotAllowed);
        }

        let id = {
            let mut active = self.inner.active();
            if let Some(running) = active.get(&channel) {
                debug!(%channel, %running, "refused game, channel busy");
                return Err(Refusal::AlreadyRunning);
            }
            let id = SessionId::new();
            active.insert(channel.clone(), id);
            id
        };
        debug!(%channel, session = %id, "claimed channel");

        let lease = Lease {
            inner: Arc::clone(&self.inner),
            channel,
            id,
        };

        Ok(Registration {
            session: factory(id),
            lease,
        })
    }
}

/// Claim on a channel, released when dropped
#[derive_where(Debug; K: Debug)]
pub struct Lease<K: Eq + Hash> {
    inner: Arc<Inner<K>>,
    channel: K,
    id: SessionId,
}

impl<K: Eq + Hash> Lease<K> {
    /// The claimed channel
    pub fn channel(&self) -> &K {
        &self.channel
    }

    /// The session holding the claim
    pub fn id(&self) -> SessionId {
        self.id
    }
}

impl<K: Eq + Hash> Drop for Lease<K> {
    fn drop(&mut self) {
        let mut active = self.inner.active();
        if active.get(&self.channel) == Some(&self.id) {
            active.remove(&self.channel);
        }
        debug!(session = %self.id, "released channel");
    }
}

/// A session together with its claim on the channel
#[derive_where(Debug; K: Debug, S: Debug)]
pub struct Registration<K: Eq + Hash, S> {
    session: S,
    lease: Lease<K>,
}

impl<K: Eq + Hash, S> Registration<K, S> {
    /// The registered session
    pub fn session(&self) -> &S {
        &self.session
    }

    /// The registered session, mutably
    pub fn session_mut(&mut self) -> &mut S {
        &mut self.session
    }

    /// The claim on the channel
    pub fn lease(&self) -> &Lease<K> {
        &self.lease
    }

    /// Splits the session from its claim
    pub fn into_parts(self) -> (S, Lease<K>) {
        (self.session, self.lease)
    }
}

impl<K: Eq + Hash, S> Deref for Registration<K, S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.session
    }
}

impl<K: Eq + Hash, S> DerefMut for Registration<K, S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.session
    }
}
