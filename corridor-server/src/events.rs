//! Journey event broadcast (dashboards subscribe over SSE)

use serde::Serialize;
use tokio::sync::broadcast;

use corridor_core::{GeoPoint, JourneyClosure, JourneyIdentity, JourneyStatus, JourneyUpdate, Severity};

/// Buffered events per subscriber before it starts lagging
const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum JourneyEvent {
    RideStarted {
        session_id: String,
        start_location: GeoPoint,
        end_location: GeoPoint,
    },
    RideUpdate(JourneyUpdate),
    RideEnded {
        session_id: String,
        peak_severity: Severity,
        purged: bool,
    },
    RideAbandoned {
        session_id: String,
    },
}

impl JourneyEvent {
    pub fn started(identity: &JourneyIdentity) -> Self {
        JourneyEvent::RideStarted {
            session_id: identity.session_id.clone(),
            start_location: identity.start,
            end_location: identity.end,
        }
    }

    /// `ride_ended` or `ride_abandoned` for a terminal transition
    pub fn closed(closure: &JourneyClosure) -> Self {
        match closure.status {
            JourneyStatus::Abandoned => JourneyEvent::RideAbandoned {
                session_id: closure.session_id.clone(),
            },
            _ => JourneyEvent::RideEnded {
                session_id: closure.session_id.clone(),
                peak_severity: closure.peak_severity,
                purged: closure.purge,
            },
        }
    }

    /// SSE event name
    pub fn name(&self) -> &'static str {
        match self {
            JourneyEvent::RideStarted { .. } => "ride_started",
            JourneyEvent::RideUpdate(_) => "ride_update",
            JourneyEvent::RideEnded { .. } => "ride_ended",
            JourneyEvent::RideAbandoned { .. } => "ride_abandoned",
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventHub {
    sender: broadcast::Sender<JourneyEvent>,
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

impl EventHub {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Fire and forget; nobody listening is fine
    pub fn publish(&self, event: JourneyEvent) {
        let name = event.name();
        match self.sender.send(event) {
            Ok(receivers) => tracing::debug!("Published {} to {} subscriber(s)", name, receivers),
            Err(_) => tracing::trace!("Published {} with no subscribers", name),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JourneyEvent> {
        self.sender.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscriber_receives_published_event() {
        let hub = EventHub::new();
        let mut rx = hub.subscribe();

        hub.publish(JourneyEvent::RideAbandoned { session_id: "r1".to_string() });

        let event = rx.recv().await.unwrap();
        assert_eq!(event.name(), "ride_abandoned");
    }

    #[test]
    fn test_publish_without_subscribers_is_silent() {
        let hub = EventHub::new();
        hub.publish(JourneyEvent::RideAbandoned { session_id: "r1".to_string() });
    }

    #[test]
    fn test_event_json_shape() {
        let event = JourneyEvent::RideEnded {
            session_id: "r1".to_string(),
            peak_severity: Severity::Elevated,
            purged: false,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "ride_ended");
        assert_eq!(json["sessionId"], "r1");
        assert_eq!(json["peakSeverity"], "ELEVATED");
    }
}
