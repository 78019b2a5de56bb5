use lotwise_domain::events::{BookingEvent, EngineEvent, SpotEvent};
use tokio::sync::broadcast;
use tracing::debug;

/// In-process fan-out of availability and booking changes, backing the SSE
/// stream and driver notifications. Publishing with no subscribers is fine.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<EngineEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.tx.subscribe()
    }

    pub fn publish_spot(&self, event: SpotEvent) {
        debug!(space_id = %event.space_id, spot = %event.spot_label, "spot event");
        let _ = self.tx.send(EngineEvent::Spot(event));
    }

    pub fn publish_booking(&self, event: BookingEvent) {
        debug!(booking_id = %event.booking_id, status = ?event.status, "booking event");
        let _ = self.tx.send(EngineEvent::Booking(event));
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use lotwise_domain::events::SpotEventKind;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_subscribers_see_published_events() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();

        bus.publish_spot(SpotEvent {
            space_id: Uuid::new_v4(),
            spot_label: "A1".to_string(),
            kind: SpotEventKind::Released,
            at: Utc::now(),
        });

        match rx.recv().await.unwrap() {
            EngineEvent::Spot(e) => assert_eq!(e.spot_label, "A1"),
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
