//! Delivery seam between the core and the transport layer.
//!
//! The core never talks to connections directly. It hands a
//! [`ChangeEvent`] and a [`SubscriberToken`] to a [`Delivery`]
//! implementation and only cares whether the push succeeded.

use crate::core::PuzzleId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};
use thiserror::Error;
use tokio::sync::mpsc;

/// Opaque subscriber identity, tied to one transport connection.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriberToken(String);

impl SubscriberToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubscriberToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SubscriberToken {
    fn from(token: &str) -> Self {
        Self::new(token)
    }
}

/// Event pushed to subscribers after a committed transition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    pub puzzle_id: PuzzleId,
    pub new_state: String,
    pub available_actions: Vec<String>,
}

/// Why one delivery failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    #[error("Subscriber '{0}' is no longer connected")]
    Disconnected(SubscriberToken),

    #[error("Delivery to '{token}' failed: {message}")]
    Failed {
        token: SubscriberToken,
        message: String,
    },

    #[error("Delivery to '{0}' timed out")]
    TimedOut(SubscriberToken),
}

/// Pushes one event to one subscriber.
#[async_trait]
pub trait Delivery: Send + Sync {
    async fn send(
        &self,
        subscriber: &SubscriberToken,
        event: &ChangeEvent,
    ) -> Result<(), DeliveryError>;
}

/// In-process delivery over unbounded tokio channels.
///
/// Each connected subscriber gets a receiver; dropping the receiver is how
/// a connection goes away. Events reach one receiver in the order they were
/// sent.
#[derive(Debug, Default)]
pub struct ChannelDelivery {
    senders: Mutex<HashMap<SubscriberToken, mpsc::UnboundedSender<ChangeEvent>>>,
}

impl ChannelDelivery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a connection for `token`, replacing any previous one.
    pub fn connect(&self, token: SubscriberToken) -> mpsc::UnboundedReceiver<ChangeEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.senders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(token, tx);
        rx
    }

    /// Close the connection for `token`.
    pub fn disconnect(&self, token: &SubscriberToken) -> bool {
        self.senders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(token)
            .is_some()
    }

    pub fn is_connected(&self, token: &SubscriberToken) -> bool {
        self.senders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(token)
            .is_some_and(|tx| !tx.is_closed())
    }
}

#[async_trait]
impl Delivery for ChannelDelivery {
    async fn send(
        &self,
        subscriber: &SubscriberToken,
        event: &ChangeEvent,
    ) -> Result<(), DeliveryError> {
        let mut senders = self.senders.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(tx) = senders.get(subscriber) else {
            return Err(DeliveryError::Disconnected(subscriber.clone()));
        };
        if tx.send(event.clone()).is_err() {
            senders.remove(subscriber);
            return Err(DeliveryError::Disconnected(subscriber.clone()));
        }
        Ok(())
    }
}
