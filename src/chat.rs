//! Chat platform collaborator
//!
//! This module defines what the game needs from a chat platform: sending
//! text to a channel, waiting for the next message that satisfies a
//! predicate, and knowing who wrote a message. [`LocalChat`] implements it
//! in-process on top of tokio channels so that a platform adapter only has
//! to pump messages in and text out.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{
    broadcast::{self, error::RecvError},
    mpsc,
};
use tracing::warn;

/// Identifier of a chat channel
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::From,
    derive_more::FromStr,
)]
#[serde(transparent)]
pub struct ChannelId(u64);

impl ChannelId {
    /// Wraps a platform channel identifier
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// The platform channel identifier
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// The user who wrote a message
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
#[display("{name}")]
pub struct Author {
    /// Stable platform identifier, used to key scores
    pub id: u64,
    /// Name shown in announcements
    pub name: String,
}

impl Author {
    /// Creates an author
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// An inbound chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Channel the message was posted in
    pub channel: ChannelId,
    /// Who wrote it
    pub author: Author,
    /// Raw text of the message
    pub content: String,
}

impl Message {
    /// Creates a message
    pub fn new(channel: ChannelId, author: Author, content: impl Into<String>) -> Self {
        Self {
            channel,
            author,
            content: content.into(),
        }
    }
}

/// Outcome of waiting for a qualifying message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// The first message that satisfied the predicate
    Answered(Message),
    /// No qualifying message arrived in time
    TimedOut,
}

/// Failures talking to the chat platform
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The connection to the platform is gone
    #[error("chat transport closed")]
    Closed,
    /// The platform rejected or failed an operation
    #[error("chat platform error: {0}")]
    Platform(String),
}

/// Predicate deciding whether an inbound message ends a wait
pub type MessageFilter<'a> = &'a (dyn Fn(&Message) -> bool + Send + Sync);

/// What a game needs from a chat platform
#[async_trait]
pub trait Chat: Send + Sync {
    /// Sends text to a channel
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the text could not be delivered.
    async fn send_text(&self, channel: ChannelId, text: &str) -> Result<(), TransportError>;

    /// Waits for the next message in `channel` accepted by `predicate`
    ///
    /// The predicate is evaluated for each message as it arrives and the
    /// first accepted message wins. Rejected messages do not extend the
    /// wait; after `timeout` the result is [`Reply::TimedOut`].
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the platform stops delivering
    /// messages.
    async fn wait_for_message(
        &self,
        channel: ChannelId,
        predicate: MessageFilter<'_>,
        timeout: Duration,
    ) -> Result<Reply, TransportError>;
}

/// Text sent by a game, waiting to be delivered by the platform adapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outgoing {
    /// Destination channel
    pub channel: ChannelId,
    /// Text to post
    pub text: String,
}

/// In-process chat hub
///
/// Inbound messages are fanned out to every pending wait through a
/// broadcast channel per chat channel, so traffic in one channel never
/// pushes unread messages out of another. Outbound text is queued on an
/// unbounded channel whose receiver is handed out by [`LocalChat::new`]. A
/// wait only sees messages published after it started.
#[derive(Debug, Clone)]
pub struct LocalChat {
    inbound: Arc<Mutex<HashMap<ChannelId, broadcast::Sender<Message>>>>,
    capacity: usize,
    outbound: mpsc::UnboundedSender<Outgoing>,
}

impl LocalChat {
    /// Creates a hub buffering up to `capacity` inbound messages per waiter
    /// and channel
    pub fn new(capacity: usize) -> (Self, mpsc::UnboundedReceiver<Outgoing>) {
        let (outbound, receiver) = mpsc::unbounded_channel();
        let chat = Self {
            inbound: Arc::default(),
            capacity: capacity.max(1),
            outbound,
        };
        (chat, receiver)
    }

    fn channels(&self) -> MutexGuard<'_, HashMap<ChannelId, broadcast::Sender<Message>>> {
        self.inbound.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn subscribe(&self, channel: ChannelId) -> broadcast::Receiver<Message> {
        self.channels()
            .entry(channel)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Delivers an inbound message, returning how many waits received it
    pub fn publish(&self, message: Message) -> usize {
        let mut channels = self.channels();
        let Some(sender) = channels.get(&message.channel) else {
            return 0;
        };
        if sender.receiver_count() == 0 {
            channels.remove(&message.channel);
            return 0;
        }
        sender.send(message).unwrap_or(0)
    }

    /// Number of waits currently listening for messages, across channels
    pub fn listener_count(&self) -> usize {
        self.channels()
            .values()
            .map(broadcast::Sender::receiver_count)
            .sum()
    }
}

#[async_trait]
impl Chat for LocalChat {
    async fn send_text(&self, channel: ChannelId, text: &str) -> Result<(), TransportError> {
        self.outbound
            .send(Outgoing {
                channel,
                text: text.to_owned(),
            })
            .map_err(|_| TransportError::Closed)
    }

    async fn wait_for_message(
        &self,
        channel: ChannelId,
        predicate: MessageFilter<'_>,
        timeout: Duration,
    ) -> Result<Reply, TransportError> {
        let mut receiver = self.subscribe(channel);

        let first_match = async {
            loop {
                match receiver.recv().await {
                    Ok(message) if message.channel == channel && predicate(&message) => {
                        return Ok(message);
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(%channel, skipped, "message listener lagged behind");
                    }
                    Err(RecvError::Closed) => return Err(TransportError::Closed),
                }
            }
        };

        match tokio::time::timeout(timeout, first_match).await {
            Ok(result) => result.map(Reply::Answered),
            Err(_) => Ok(Reply::TimedOut),
        }
    }
}
