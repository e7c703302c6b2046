//! Validation notifications
//!
//! A small message bus with one channel per event kind. Publishing is
//! synchronous: every subscriber registered on the channel at the time of
//! the call receives the event, in subscription order, before `publish`
//! returns.

use crate::core::amount::Amount;
use crate::crypto::Hash256;
use crate::sidechain::{Epoch, SidechainId};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, RwLock};

/// Channels of the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventKind {
    BlockConnected,
    BlockDisconnected,
    SidechainUpdated,
}

impl EventKind {
    pub const ALL: [EventKind; 3] = [
        EventKind::BlockConnected,
        EventKind::BlockDisconnected,
        EventKind::SidechainUpdated,
    ];
}

/// Events published while the chain moves
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum ValidationEvent {
    /// A block was connected and its undo log stored
    BlockConnected {
        block: Hash256,
        height: u32,
        tx_count: usize,
        undo_size: usize,
    },
    /// The tip was disconnected
    BlockDisconnected {
        block: Hash256,
        height: u32,
        /// False if the undo data did not match the state exactly
        clean: bool,
    },
    /// A sidechain record changed; `exists` is false once it was removed
    SidechainUpdated {
        sidechain: SidechainId,
        block: Hash256,
        exists: bool,
        balance: Amount,
        last_certificate_epoch: Epoch,
    },
}

impl ValidationEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ValidationEvent::BlockConnected { .. } => EventKind::BlockConnected,
            ValidationEvent::BlockDisconnected { .. } => EventKind::BlockDisconnected,
            ValidationEvent::SidechainUpdated { .. } => EventKind::SidechainUpdated,
        }
    }
}

/// Receives events from the channels it subscribed to
pub trait ValidationSubscriber: Send + Sync {
    fn on_event(&self, event: &ValidationEvent);
}

impl<F> ValidationSubscriber for F
where
    F: Fn(&ValidationEvent) + Send + Sync,
{
    fn on_event(&self, event: &ValidationEvent) {
        self(event)
    }
}

/// Handle returned by `subscribe`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

#[derive(Default)]
struct Channels {
    next_id: u64,
    /// Ids are handed out in increasing order, so map order is subscription order
    subscribers: BTreeMap<EventKind, BTreeMap<SubscriptionId, Arc<dyn ValidationSubscriber>>>,
}

/// Bus for validation events
#[derive(Default)]
pub struct ValidationBus {
    channels: RwLock<Channels>,
}

impl ValidationBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(
        &self,
        kind: EventKind,
        subscriber: Arc<dyn ValidationSubscriber>,
    ) -> SubscriptionId {
        let mut channels = self.channels.write().unwrap_or_else(|e| e.into_inner());
        let id = SubscriptionId(channels.next_id);
        channels.next_id += 1;
        channels
            .subscribers
            .entry(kind)
            .or_default()
            .insert(id, subscriber);
        log::debug!("{} subscribed to {:?}", id, kind);
        id
    }

    /// Returns false if `id` was not subscribed
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut channels = self.channels.write().unwrap_or_else(|e| e.into_inner());
        channels
            .subscribers
            .values_mut()
            .any(|subs| subs.remove(&id).is_some())
    }

    pub fn unsubscribe_all(&self) {
        let mut channels = self.channels.write().unwrap_or_else(|e| e.into_inner());
        channels.subscribers.clear();
    }

    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        let channels = self.channels.read().unwrap_or_else(|e| e.into_inner());
        channels.subscribers.get(&kind).map_or(0, BTreeMap::len)
    }

    /// Deliver `event` on its channel. Subscribers are snapshotted first, so
    /// a subscriber may subscribe or unsubscribe from inside its callback.
    pub fn publish(&self, event: &ValidationEvent) {
        let targets: Vec<Arc<dyn ValidationSubscriber>> = {
            let channels = self.channels.read().unwrap_or_else(|e| e.into_inner());
            channels
                .subscribers
                .get(&event.kind())
                .map(|subs| subs.values().cloned().collect())
                .unwrap_or_default()
        };
        for subscriber in targets {
            subscriber.on_event(event);
        }
    }
}

impl fmt::Debug for ValidationBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_map();
        for kind in EventKind::ALL {
            list.entry(&kind, &self.subscriber_count(kind));
        }
        list.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn connected(height: u32) -> ValidationEvent {
        ValidationEvent::BlockConnected {
            block: Hash256::digest(&height.to_le_bytes()),
            height,
            tx_count: 1,
            undo_size: 40,
        }
    }

    fn recorder(log: &Arc<Mutex<Vec<String>>>, name: &'static str) -> Arc<dyn ValidationSubscriber> {
        let log = Arc::clone(log);
        Arc::new(move |event: &ValidationEvent| {
            log.lock().unwrap().push(format!("{}:{:?}", name, event.kind()));
        })
    }

    #[test]
    fn test_delivery_in_subscription_order() {
        let bus = ValidationBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        bus.subscribe(EventKind::BlockConnected, recorder(&log, "a"));
        bus.subscribe(EventKind::BlockConnected, recorder(&log, "b"));

        bus.publish(&connected(1));
        assert_eq!(
            *log.lock().unwrap(),
            vec!["a:BlockConnected", "b:BlockConnected"]
        );
    }

    #[test]
    fn test_channels_are_separate() {
        let bus = ValidationBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        bus.subscribe(EventKind::BlockDisconnected, recorder(&log, "d"));

        bus.publish(&connected(1));
        assert!(log.lock().unwrap().is_empty());

        bus.publish(&ValidationEvent::BlockDisconnected {
            block: Hash256::ZERO,
            height: 1,
            clean: true,
        });
        assert_eq!(*log.lock().unwrap(), vec!["d:BlockDisconnected"]);
    }

    #[test]
    fn test_unsubscribe() {
        let bus = ValidationBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let a = bus.subscribe(EventKind::BlockConnected, recorder(&log, "a"));
        bus.subscribe(EventKind::BlockConnected, recorder(&log, "b"));

        assert!(bus.unsubscribe(a));
        assert!(!bus.unsubscribe(a));
        bus.publish(&connected(2));
        assert_eq!(*log.lock().unwrap(), vec!["b:BlockConnected"]);

        bus.unsubscribe_all();
        assert_eq!(bus.subscriber_count(EventKind::BlockConnected), 0);
        bus.publish(&connected(3));
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_subscribers_snapshotted_at_publish() {
        let bus = Arc::new(ValidationBus::new());
        let log = Arc::new(Mutex::new(Vec::new()));

        let inner_bus = Arc::clone(&bus);
        let inner_log = Arc::clone(&log);
        bus.subscribe(
            EventKind::BlockConnected,
            Arc::new(move |_: &ValidationEvent| {
                inner_bus.subscribe(EventKind::BlockConnected, recorder(&inner_log, "late"));
            }),
        );

        // The late subscriber misses the event that registered it
        bus.publish(&connected(1));
        assert!(log.lock().unwrap().is_empty());
        assert_eq!(bus.subscriber_count(EventKind::BlockConnected), 2);

        bus.publish(&connected(2));
        assert_eq!(*log.lock().unwrap(), vec!["late:BlockConnected"]);
    }

    #[test]
    fn test_event_json_shape() {
        let json = serde_json::to_value(connected(7)).unwrap();
        assert_eq!(json["type"], "BlockConnected");
        assert_eq!(json["data"]["height"], 7);
    }
}
