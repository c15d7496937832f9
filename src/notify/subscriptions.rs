//! Subscriber bookkeeping.
//!
//! # Pruning policy
//!
//! Tokens are removed in two ways:
//! - **Lazily**, by the dispatcher, when a delivery to the token fails.
//! - **Eagerly**, by [`SubscriptionIndex::unsubscribe_all`], when the
//!   transport reports that a connection closed.
//!
//! Topics with no subscribers left are dropped.

use crate::notify::delivery::SubscriberToken;
use crate::notify::uri::ResourceUri;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Maps resource identifiers to the tokens subscribed to them.
#[derive(Debug, Default)]
pub struct SubscriptionIndex {
    topics: Mutex<HashMap<ResourceUri, BTreeSet<SubscriberToken>>>,
}

impl SubscriptionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn topics(&self) -> MutexGuard<'_, HashMap<ResourceUri, BTreeSet<SubscriberToken>>> {
        self.topics.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add `token` under `uri`. Returns `false` if it was already there.
    pub fn subscribe(&self, uri: &ResourceUri, token: SubscriberToken) -> bool {
        let added = self.topics().entry(uri.clone()).or_default().insert(token);
        tracing::debug!(%uri, added, "subscribe");
        added
    }

    /// Remove `token` from `uri`. Returns `false` if it was not there.
    pub fn unsubscribe(&self, uri: &ResourceUri, token: &SubscriberToken) -> bool {
        let mut topics = self.topics();
        let Some(tokens) = topics.get_mut(uri) else {
            return false;
        };
        let removed = tokens.remove(token);
        if tokens.is_empty() {
            topics.remove(uri);
        }
        removed
    }

    /// Remove `token` from every topic. Returns how many topics it left.
    pub fn unsubscribe_all(&self, token: &SubscriberToken) -> usize {
        let mut topics = self.topics();
        let mut removed = 0;
        topics.retain(|_, tokens| {
            if tokens.remove(token) {
                removed += 1;
            }
            !tokens.is_empty()
        });
        if removed > 0 {
            tracing::debug!(subscriber = %token, topics = removed, "subscriber dropped");
        }
        removed
    }

    /// Drop a whole topic, e.g. when its puzzle is gone.
    pub fn remove_topic(&self, uri: &ResourceUri) -> usize {
        self.topics().remove(uri).map_or(0, |tokens| tokens.len())
    }

    pub fn clear(&self) {
        self.topics().clear();
    }

    /// Snapshot of the tokens subscribed to `uri`, in token order.
    pub fn subscribers(&self, uri: &ResourceUri) -> Vec<SubscriberToken> {
        self.topics()
            .get(uri)
            .map(|tokens| tokens.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn is_subscribed(&self, uri: &ResourceUri, token: &SubscriberToken) -> bool {
        self.topics()
            .get(uri)
            .is_some_and(|tokens| tokens.contains(token))
    }

    /// Number of topics with at least one subscriber.
    pub fn topic_count(&self) -> usize {
        self.topics().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PuzzleId;
    use crate::notify::uri::derive_uri;

    fn uri() -> ResourceUri {
        derive_uri(&PuzzleId::new_random())
    }

    #[test]
    fn subscribe_is_idempotent() {
        let index = SubscriptionIndex::new();
        let topic = uri();

        assert!(index.subscribe(&topic, "sess-1".into()));
        assert!(!index.subscribe(&topic, "sess-1".into()));
        assert_eq!(index.subscribers(&topic).len(), 1);
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let index = SubscriptionIndex::new();
        let topic = uri();
        let token = SubscriberToken::new("sess-1");
        index.subscribe(&topic, token.clone());

        assert!(index.unsubscribe(&topic, &token));
        assert!(!index.unsubscribe(&topic, &token));
        assert!(!index.is_subscribed(&topic, &token));
    }

    #[test]
    fn empty_topics_are_dropped() {
        let index = SubscriptionIndex::new();
        let topic = uri();
        let token = SubscriberToken::new("sess-1");

        index.subscribe(&topic, token.clone());
        assert_eq!(index.topic_count(), 1);

        index.unsubscribe(&topic, &token);
        assert_eq!(index.topic_count(), 0);
    }

    #[test]
    fn unsubscribe_all_leaves_other_tokens() {
        let index = SubscriptionIndex::new();
        let (a, b) = (uri(), uri());
        let gone = SubscriberToken::new("gone");
        let stays = SubscriberToken::new("stays");

        index.subscribe(&a, gone.clone());
        index.subscribe(&b, gone.clone());
        index.subscribe(&b, stays.clone());

        assert_eq!(index.unsubscribe_all(&gone), 2);
        assert_eq!(index.topic_count(), 1);
        assert_eq!(index.subscribers(&b), vec![stays]);
        assert!(index.subscribers(&a).is_empty());
    }

    #[test]
    fn remove_topic_reports_dropped_tokens() {
        let index = SubscriptionIndex::new();
        let topic = uri();
        index.subscribe(&topic, "x".into());
        index.subscribe(&topic, "y".into());

        assert_eq!(index.remove_topic(&topic), 2);
        assert_eq!(index.remove_topic(&topic), 0);
    }

    #[test]
    fn unknown_topic_has_no_subscribers() {
        let index = SubscriptionIndex::new();
        assert!(index.subscribers(&uri()).is_empty());
        assert!(!index.unsubscribe(&uri(), &"x".into()));
    }
}
