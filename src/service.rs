//! Registry-aware facade.
//!
//! [`PuzzleService`] wires the registry, the guard oracle and the
//! notification dispatcher together. It is what a transport layer calls:
//! every method takes plain ids, names and tokens and returns the structured
//! results from [`crate::snapshot`].
//!
//! ## Ordering
//!
//! Change events are dispatched while the puzzle's transition lock is still
//! held, so a subscriber sees events for one puzzle in commit order.

use crate::config::{GuardPolicy, Settings, SettingsError};
use crate::core::{GuardOracle, PuzzleId};
use crate::definition::PuzzleDefinition;
use crate::notify::{
    derive_uri, Delivery, NotificationDispatcher, SubscriberToken, SubscriptionIndex,
};
use crate::puzzle::{ActionOutcome, TransitionError};
use crate::registry::{PuzzleRegistry, RegistryError};
use crate::snapshot::{ActionResult, AddResult, PuzzleSnapshot};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

/// Errors surfaced to callers of the service.
///
/// Guard cancellation is not an error; it is reported through
/// [`ActionResult::cancel_reason`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("Puzzle not found: {0}")]
    NotFound(PuzzleId),

    #[error(transparent)]
    InvalidAction(#[from] TransitionError),
}

impl From<RegistryError> for ServiceError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(id) => Self::NotFound(id),
            RegistryError::Transition(err) => Self::InvalidAction(err),
        }
    }
}

/// Puzzle registry plus change notification.
pub struct PuzzleService {
    registry: Arc<PuzzleRegistry>,
    subscriptions: Arc<SubscriptionIndex>,
    dispatcher: NotificationDispatcher,
    oracle: Arc<dyn GuardOracle>,
    policy: GuardPolicy,
}

impl PuzzleService {
    /// Create a service with an empty registry and no subscriptions.
    ///
    /// Fails if `settings` do not validate.
    pub fn new(
        settings: &Settings,
        oracle: Arc<dyn GuardOracle>,
        delivery: Arc<dyn Delivery>,
    ) -> Result<Self, SettingsError> {
        settings.validate()?;
        let subscriptions = Arc::new(SubscriptionIndex::new());
        let dispatcher = NotificationDispatcher::new(
            subscriptions.clone(),
            delivery,
            settings.delivery_timeout(),
        );

        Ok(Self {
            registry: Arc::new(PuzzleRegistry::with_history_limit(settings.history_limit)),
            subscriptions,
            dispatcher,
            oracle,
            policy: settings.guard_policy(),
        })
    }

    pub fn registry(&self) -> &Arc<PuzzleRegistry> {
        &self.registry
    }

    pub fn subscriptions(&self) -> &Arc<SubscriptionIndex> {
        &self.subscriptions
    }

    /// Validate raw JSON configuration and register a puzzle.
    pub fn add_puzzle(&self, raw: &str) -> AddResult {
        match PuzzleDefinition::from_json_str(raw) {
            Ok(definition) => AddResult::added(self.registry.add_puzzle(definition)),
            Err(err) => {
                tracing::debug!(error = %err, "definition rejected");
                AddResult::failed(err)
            }
        }
    }

    /// Same as [`PuzzleService::add_puzzle`] for an already-parsed record.
    pub fn add_puzzle_value(&self, raw: &Value) -> AddResult {
        match PuzzleDefinition::from_value(raw) {
            Ok(definition) => AddResult::added(self.registry.add_puzzle(definition)),
            Err(err) => AddResult::failed(err),
        }
    }

    /// Register a puzzle from a definition built in code.
    pub fn add_definition(&self, definition: PuzzleDefinition) -> PuzzleId {
        self.registry.add_puzzle(definition)
    }

    pub async fn snapshot(&self, id: &PuzzleId) -> Result<PuzzleSnapshot, ServiceError> {
        Ok(self.registry.snapshot(id).await?)
    }

    /// Attempt `action` on puzzle `id` and notify subscribers on success.
    ///
    /// Delivery failures never fail the action; dead subscribers are pruned.
    pub async fn perform_action(
        &self,
        id: &PuzzleId,
        action: &str,
    ) -> Result<ActionResult, ServiceError> {
        let mut puzzle = self.registry.lock(id).await?;
        let outcome = puzzle
            .perform_action(action, self.oracle.as_ref(), &self.policy)
            .await?;

        let snapshot = puzzle.snapshot();
        if let ActionOutcome::Committed(_) = &outcome {
            self.dispatcher.on_puzzle_changed(*id, &snapshot).await;
        }
        drop(puzzle);

        Ok(ActionResult::from_outcome(outcome, snapshot.current_state))
    }

    /// Subscribe `token` to changes of puzzle `id`.
    ///
    /// Returns `false` if it was already subscribed. The puzzle is checked
    /// again after inserting, so a subscription racing `remove_puzzle` or
    /// `clear_all` never outlives its puzzle.
    pub fn subscribe(&self, id: &PuzzleId, token: SubscriberToken) -> Result<bool, ServiceError> {
        if !self.registry.contains(id) {
            return Err(ServiceError::NotFound(*id));
        }
        let uri = derive_uri(id);
        let added = self.subscriptions.subscribe(&uri, token.clone());
        if !self.registry.contains(id) {
            self.subscriptions.unsubscribe(&uri, &token);
            return Err(ServiceError::NotFound(*id));
        }
        Ok(added)
    }

    /// Remove one subscription. Unknown pairs are a no-op.
    pub fn unsubscribe(&self, id: &PuzzleId, token: &SubscriberToken) -> bool {
        self.subscriptions.unsubscribe(&derive_uri(id), token)
    }

    /// Forget `token` everywhere, e.g. when its connection closed.
    pub fn disconnect(&self, token: &SubscriberToken) -> usize {
        self.subscriptions.unsubscribe_all(token)
    }

    /// Remove one puzzle together with its subscriptions.
    pub fn remove_puzzle(&self, id: &PuzzleId) -> bool {
        let removed = self.registry.remove_puzzle(id);
        if removed {
            self.subscriptions.remove_topic(&derive_uri(id));
        }
        removed
    }

    /// Administrative reset: drop every puzzle and every subscription.
    pub fn clear_all(&self) {
        self.registry.clear_all();
        self.subscriptions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::AllowAll;
    use crate::notify::ChannelDelivery;

    const DOOR: &str = r#"{
        "initialState": "Closed",
        "states": {
            "Closed": { "actions": { "Open": { "targetState": "Opened" } } },
            "Opened": { "actions": { "Close": { "targetState": "Closed" } } }
        }
    }"#;

    fn service() -> (PuzzleService, Arc<ChannelDelivery>) {
        let delivery = Arc::new(ChannelDelivery::new());
        let service =
            PuzzleService::new(&Settings::default(), Arc::new(AllowAll), delivery.clone())
                .unwrap();
        (service, delivery)
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let settings = Settings {
            guard_timeout_ms: 0,
            ..Settings::default()
        };

        let result = PuzzleService::new(
            &settings,
            Arc::new(AllowAll),
            Arc::new(ChannelDelivery::new()),
        );
        assert!(matches!(
            result,
            Err(SettingsError::ZeroTimeout("guard_timeout_ms"))
        ));
    }

    #[tokio::test]
    async fn service_puzzles_use_history_limit() {
        let settings = Settings {
            history_limit: 7,
            ..Settings::default()
        };
        let service = PuzzleService::new(
            &settings,
            Arc::new(AllowAll),
            Arc::new(ChannelDelivery::new()),
        )
        .unwrap();
        let id = service.add_puzzle(DOOR).puzzle_id.unwrap();

        let puzzle = service.registry().get_puzzle(&id).await.unwrap();
        assert_eq!(puzzle.history().limit(), Some(7));
    }

    #[test]
    fn add_puzzle_reports_id() {
        let (service, _) = service();
        let result = service.add_puzzle(DOOR);

        assert!(result.success);
        assert!(service.registry().contains(&result.puzzle_id.unwrap()));
    }

    #[test]
    fn add_puzzle_reports_config_error() {
        let (service, _) = service();
        let result = service.add_puzzle(r#"{ "states": {} }"#);

        assert!(!result.success);
        assert!(result.puzzle_id.is_none());
        assert!(result.error.unwrap().contains("Initial state not specified"));
        assert_eq!(service.registry().count_puzzles(), 0);
    }

    #[tokio::test]
    async fn subscribe_requires_existing_puzzle() {
        let (service, _) = service();
        let id = PuzzleId::new_random();

        assert_eq!(
            service.subscribe(&id, "sess-1".into()),
            Err(ServiceError::NotFound(id))
        );
    }

    #[tokio::test]
    async fn unknown_puzzle_action_is_not_found() {
        let (service, _) = service();
        let id = PuzzleId::new_random();

        assert_eq!(
            service.perform_action(&id, "Open").await,
            Err(ServiceError::NotFound(id))
        );
    }

    #[tokio::test]
    async fn invalid_action_sends_nothing() {
        let (service, delivery) = service();
        let id = service.add_puzzle(DOOR).puzzle_id.unwrap();
        let mut rx = delivery.connect("sess-1".into());
        service.subscribe(&id, "sess-1".into()).unwrap();

        let err = service.perform_action(&id, "Close").await.unwrap_err();

        assert!(matches!(err, ServiceError::InvalidAction(_)));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn remove_puzzle_drops_its_topic() {
        let (service, _) = service();
        let id = service.add_puzzle(DOOR).puzzle_id.unwrap();
        service.subscribe(&id, "sess-1".into()).unwrap();

        assert!(service.remove_puzzle(&id));
        assert_eq!(service.subscriptions().topic_count(), 0);
    }

    #[tokio::test]
    async fn disconnect_stops_delivery_everywhere() {
        let (service, delivery) = service();
        let a = service.add_puzzle(DOOR).puzzle_id.unwrap();
        let b = service.add_puzzle(DOOR).puzzle_id.unwrap();
        let mut rx = delivery.connect("sess-1".into());
        service.subscribe(&a, "sess-1".into()).unwrap();
        service.subscribe(&b, "sess-1".into()).unwrap();

        assert_eq!(service.disconnect(&"sess-1".into()), 2);

        service.perform_action(&a, "Open").await.unwrap();
        service.perform_action(&b, "Open").await.unwrap();
        assert!(rx.try_recv().is_err());
    }
}
