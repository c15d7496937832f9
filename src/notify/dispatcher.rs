//! Change notification fan-out.

use crate::core::PuzzleId;
use crate::notify::delivery::{ChangeEvent, Delivery, DeliveryError, SubscriberToken};
use crate::notify::subscriptions::SubscriptionIndex;
use crate::notify::uri::derive_uri;
use crate::snapshot::PuzzleSnapshot;
use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Duration;

/// Outcome of one fan-out.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Subscribers the event reached
    pub delivered: Vec<SubscriberToken>,
    /// Subscribers removed because delivery failed
    pub pruned: Vec<SubscriberToken>,
}

/// Delivers change events to every live subscriber of a puzzle.
///
/// Deliveries to all subscribers run concurrently, each bounded by the
/// delivery timeout, so one stalled subscriber costs at most one timeout for
/// the whole fan-out. A failed or timed-out delivery prunes that subscriber
/// and never affects the others.
pub struct NotificationDispatcher {
    index: Arc<SubscriptionIndex>,
    delivery: Arc<dyn Delivery>,
    timeout: Duration,
}

impl NotificationDispatcher {
    pub fn new(
        index: Arc<SubscriptionIndex>,
        delivery: Arc<dyn Delivery>,
        timeout: Duration,
    ) -> Self {
        Self {
            index,
            delivery,
            timeout,
        }
    }

    pub fn index(&self) -> &Arc<SubscriptionIndex> {
        &self.index
    }

    /// Notify subscribers of `puzzle_id` about its new state.
    pub async fn on_puzzle_changed(
        &self,
        puzzle_id: PuzzleId,
        snapshot: &PuzzleSnapshot,
    ) -> DispatchReport {
        let uri = derive_uri(&puzzle_id);
        let event = ChangeEvent {
            puzzle_id,
            new_state: snapshot.current_state.clone(),
            available_actions: snapshot.available_actions.clone(),
        };

        let subscribers = self.index.subscribers(&uri);
        let results = join_all(subscribers.iter().map(|token| self.deliver(token, &event))).await;

        let mut report = DispatchReport::default();
        for (token, result) in subscribers.into_iter().zip(results) {
            match result {
                Ok(()) => report.delivered.push(token),
                Err(err) => {
                    tracing::warn!(
                        %puzzle_id,
                        subscriber = %token,
                        error = %err,
                        "pruning subscriber"
                    );
                    self.index.unsubscribe(&uri, &token);
                    report.pruned.push(token);
                }
            }
        }

        tracing::debug!(
            %puzzle_id,
            delivered = report.delivered.len(),
            pruned = report.pruned.len(),
            "change dispatched"
        );
        report
    }

    async fn deliver(
        &self,
        token: &SubscriberToken,
        event: &ChangeEvent,
    ) -> Result<(), DeliveryError> {
        tokio::time::timeout(self.timeout, self.delivery.send(token, event))
            .await
            .unwrap_or_else(|_| Err(DeliveryError::TimedOut(token.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::delivery::ChannelDelivery;
    use async_trait::async_trait;

    fn snapshot(id: PuzzleId, state: &str) -> PuzzleSnapshot {
        PuzzleSnapshot {
            puzzle_id: id,
            current_state: state.to_string(),
            available_actions: vec![],
        }
    }

    struct Stalled;

    #[async_trait]
    impl Delivery for Stalled {
        async fn send(
            &self,
            _subscriber: &SubscriberToken,
            _event: &ChangeEvent,
        ) -> Result<(), DeliveryError> {
            std::future::pending::<()>().await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn delivers_to_every_live_subscriber() {
        let index = Arc::new(SubscriptionIndex::new());
        let delivery = Arc::new(ChannelDelivery::new());
        let dispatcher =
            NotificationDispatcher::new(index.clone(), delivery.clone(), Duration::from_secs(1));
        let id = PuzzleId::new_random();

        let mut a = delivery.connect("a".into());
        let mut b = delivery.connect("b".into());
        index.subscribe(&derive_uri(&id), "a".into());
        index.subscribe(&derive_uri(&id), "b".into());

        let report = dispatcher.on_puzzle_changed(id, &snapshot(id, "Opened")).await;

        assert_eq!(report.delivered.len(), 2);
        assert!(report.pruned.is_empty());
        assert_eq!(a.recv().await.unwrap().new_state, "Opened");
        assert_eq!(b.recv().await.unwrap().puzzle_id, id);
    }

    #[tokio::test]
    async fn dead_subscriber_is_pruned_and_others_still_receive() {
        let index = Arc::new(SubscriptionIndex::new());
        let delivery = Arc::new(ChannelDelivery::new());
        let dispatcher =
            NotificationDispatcher::new(index.clone(), delivery.clone(), Duration::from_secs(1));
        let id = PuzzleId::new_random();
        let uri = derive_uri(&id);

        drop(delivery.connect("a-dead".into()));
        let mut live = delivery.connect("b-live".into());
        index.subscribe(&uri, "a-dead".into());
        index.subscribe(&uri, "b-live".into());

        let report = dispatcher.on_puzzle_changed(id, &snapshot(id, "Opened")).await;

        assert_eq!(report.pruned, vec![SubscriberToken::new("a-dead")]);
        assert_eq!(report.delivered, vec![SubscriberToken::new("b-live")]);
        assert_eq!(live.recv().await.unwrap().new_state, "Opened");
        assert_eq!(index.subscribers(&uri), vec![SubscriberToken::new("b-live")]);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_delivery_times_out_and_is_pruned() {
        let index = Arc::new(SubscriptionIndex::new());
        let dispatcher = NotificationDispatcher::new(
            index.clone(),
            Arc::new(Stalled),
            Duration::from_millis(20),
        );
        let id = PuzzleId::new_random();
        index.subscribe(&derive_uri(&id), "slow".into());

        let report = dispatcher.on_puzzle_changed(id, &snapshot(id, "Opened")).await;

        assert_eq!(report.pruned, vec![SubscriberToken::new("slow")]);
        assert_eq!(index.topic_count(), 0);
    }

    /// Stalls only for tokens starting with "slow".
    struct Mixed {
        live: ChannelDelivery,
    }

    #[async_trait]
    impl Delivery for Mixed {
        async fn send(
            &self,
            subscriber: &SubscriberToken,
            event: &ChangeEvent,
        ) -> Result<(), DeliveryError> {
            if subscriber.as_str().starts_with("slow") {
                std::future::pending::<()>().await;
            }
            self.live.send(subscriber, event).await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_subscribers_cost_one_timeout_in_total() {
        let index = Arc::new(SubscriptionIndex::new());
        let delivery = Arc::new(Mixed {
            live: ChannelDelivery::new(),
        });
        let mut live = delivery.live.connect("live".into());
        let dispatcher =
            NotificationDispatcher::new(index.clone(), delivery, Duration::from_secs(2));
        let id = PuzzleId::new_random();
        let uri = derive_uri(&id);
        for token in ["slow-1", "slow-2", "slow-3", "slow-4", "slow-5", "live"] {
            index.subscribe(&uri, token.into());
        }

        let started = tokio::time::Instant::now();
        let report = dispatcher.on_puzzle_changed(id, &snapshot(id, "Opened")).await;

        assert!(started.elapsed() < Duration::from_secs(3));
        assert_eq!(report.delivered, vec![SubscriberToken::new("live")]);
        assert_eq!(report.pruned.len(), 5);
        assert_eq!(live.try_recv().unwrap().new_state, "Opened");
        assert_eq!(index.subscribers(&uri), vec![SubscriberToken::new("live")]);
    }

    #[tokio::test]
    async fn no_subscribers_is_empty_report() {
        let dispatcher = NotificationDispatcher::new(
            Arc::new(SubscriptionIndex::new()),
            Arc::new(ChannelDelivery::new()),
            Duration::from_secs(1),
        );
        let id = PuzzleId::new_random();

        let report = dispatcher.on_puzzle_changed(id, &snapshot(id, "A")).await;
        assert_eq!(report, DispatchReport::default());
    }
}
