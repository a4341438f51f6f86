//! Publish-subscribe fan-out for alert and track events.
//!
//! Each subscriber owns a bounded queue. Publish never waits: a full queue
//! drops the event for that subscriber only and bumps its drop counter, and
//! a subscriber whose drops pass the grace threshold is disconnected.
//! Events delivered to a single subscriber arrive in publication order; no
//! cross-subscriber ordering is guaranteed.

use dashmap::DashMap;
use skywatch_core::models::Event;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;

pub struct EventBus {
    subscribers: DashMap<u64, Subscriber>,
    next_id: AtomicU64,
    queue_depth: usize,
    drop_grace: u64,
}

struct Subscriber {
    tx: mpsc::Sender<Event>,
    drops: AtomicU64,
}

/// A live subscription. Dropping the handle alone does not detach; call
/// `EventBus::unsubscribe` (the WS handler does this on socket close).
pub struct Subscription {
    pub id: u64,
    pub rx: mpsc::Receiver<Event>,
}

impl EventBus {
    pub fn new(queue_depth: usize, drop_grace: u64) -> Self {
        Self {
            subscribers: DashMap::new(),
            next_id: AtomicU64::new(1),
            queue_depth: queue_depth.max(1),
            drop_grace,
        }
    }

    /// Attach a new subscriber.
    pub fn subscribe(&self) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::channel(self.queue_depth);
        self.subscribers.insert(
            id,
            Subscriber {
                tx,
                drops: AtomicU64::new(0),
            },
        );
        tracing::debug!("Subscriber {} attached", id);
        Subscription { id, rx }
    }

    /// Detach a subscriber and release its queue.
    pub fn unsubscribe(&self, id: u64) {
        if self.subscribers.remove(&id).is_some() {
            tracing::debug!("Subscriber {} detached", id);
        }
    }

    /// Deliver an event to every subscriber without blocking.
    pub fn publish(&self, event: &Event) {
        let mut evict = Vec::new();

        for entry in self.subscribers.iter() {
            let subscriber = entry.value();
            match subscriber.tx.try_send(event.clone()) {
                Ok(_) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    let dropped = subscriber.drops.fetch_add(1, Ordering::Relaxed) + 1;
                    if dropped > self.drop_grace {
                        evict.push((*entry.key(), dropped));
                    }
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    evict.push((*entry.key(), subscriber.drops.load(Ordering::Relaxed)));
                }
            }
        }

        for (id, dropped) in evict {
            if self.subscribers.remove(&id).is_some() {
                tracing::warn!(
                    "Disconnecting subscriber {} after {} dropped events",
                    id,
                    dropped
                );
            }
        }
    }

    /// Total events dropped for a subscriber so far.
    pub fn dropped_events(&self, id: u64) -> Option<u64> {
        self.subscribers
            .get(&id)
            .map(|entry| entry.drops.load(Ordering::Relaxed))
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use skywatch_core::models::{Alert, ThreatLevel};

    fn alert_event(id: i64) -> Event {
        Event::Alert(Alert {
            id,
            flight_id: id,
            transponder_id: "VT-SAL".to_string(),
            region_id: Some(1),
            severity: ThreatLevel::High,
            message: format!("alert {}", id),
            threat_reasons: vec!["Inside restricted zone".to_string()],
            recommended_action: "monitor and contact via radio".to_string(),
            resolved: false,
            created_at: Utc::now(),
        })
    }

    #[tokio::test]
    async fn events_arrive_in_publication_order() {
        let bus = EventBus::new(16, 8);
        let mut sub = bus.subscribe();

        for i in 0..10 {
            bus.publish(&alert_event(i));
        }

        for expected in 0..10 {
            match sub.rx.recv().await.unwrap() {
                Event::Alert(alert) => assert_eq!(alert.id, expected),
                other => panic!("unexpected event: {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn slow_subscriber_drops_without_blocking() {
        let bus = EventBus::new(4, 100);
        let sub = bus.subscribe();

        // Never drained: the queue fills after 4 events, the rest drop.
        for i in 0..10 {
            bus.publish(&alert_event(i));
        }

        assert_eq!(bus.dropped_events(sub.id), Some(6));
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn slow_subscriber_does_not_stall_others() {
        let bus = EventBus::new(2, 100);
        let _slow = bus.subscribe();
        let mut fast = bus.subscribe();

        for i in 0..6 {
            bus.publish(&alert_event(i));
            // The fast subscriber drains as it goes.
            match fast.rx.recv().await.unwrap() {
                Event::Alert(alert) => assert_eq!(alert.id, i),
                other => panic!("unexpected event: {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn subscriber_past_grace_is_disconnected() {
        let bus = EventBus::new(1, 2);
        let _sub = bus.subscribe();

        // 1 queued, then 3 drops; grace is 2, so the 3rd drop evicts.
        for i in 0..4 {
            bus.publish(&alert_event(i));
        }

        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn unsubscribe_detaches() {
        let bus = EventBus::new(4, 8);
        let sub = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);
        bus.unsubscribe(sub.id);
        assert_eq!(bus.subscriber_count(), 0);
    }
}
