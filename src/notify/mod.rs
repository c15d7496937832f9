//! Subscriptions and change notification.
//!
//! Observers subscribe to a puzzle's [`ResourceUri`]; after every committed
//! transition the [`NotificationDispatcher`] pushes a [`ChangeEvent`] to each
//! of them through an injected [`Delivery`]. A subscriber whose delivery
//! fails is pruned without affecting the others.

mod delivery;
mod dispatcher;
mod subscriptions;
mod uri;

pub use delivery::{ChangeEvent, ChannelDelivery, Delivery, DeliveryError, SubscriberToken};
pub use dispatcher::{DispatchReport, NotificationDispatcher};
pub use subscriptions::SubscriptionIndex;
pub use uri::{derive_uri, extract_id, ResourceUri, UriError, URI_PREFIX};
