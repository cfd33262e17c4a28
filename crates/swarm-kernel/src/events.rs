//! Observer events emitted by the coordinator.
//!
//! This is the only coupling between the scheduling core and whatever
//! watches it (dashboards, log sinks, run statistics).

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::api::SubmitErrorKind;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SwarmEvent {
    AgentStarted {
        agent_name: String,
    },
    PlacementAccepted {
        agent_name: String,
        x: i32,
        y: i32,
        color: u8,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        note: Option<String>,
    },
    PlacementSkipped {
        agent_name: String,
        x: i32,
        y: i32,
        reason: String,
    },
    AgentError {
        agent_name: String,
        error: String,
        kind: SubmitErrorKind,
    },
    CoordinatorStopped,
}

impl SwarmEvent {
    pub fn agent_name(&self) -> Option<&str> {
        match self {
            SwarmEvent::AgentStarted { agent_name }
            | SwarmEvent::PlacementAccepted { agent_name, .. }
            | SwarmEvent::PlacementSkipped { agent_name, .. }
            | SwarmEvent::AgentError { agent_name, .. } => Some(agent_name),
            SwarmEvent::CoordinatorStopped => None,
        }
    }
}

/// Fan-out of [`SwarmEvent`]s to any number of subscribers.
///
/// Subscribers that fall more than `capacity` events behind lose the oldest
/// ones (`RecvError::Lagged`).
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<SwarmEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event. Returns how many subscribers will see it; zero
    /// subscribers is fine.
    pub fn emit(&self, event: SwarmEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SwarmEvent> {
        self.sender.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_error_wire_shape() {
        let event = SwarmEvent::AgentError {
            agent_name: "Zen".to_string(),
            error: "rate limited: slow down".to_string(),
            kind: SubmitErrorKind::RateLimited,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "agent_error");
        assert_eq!(json["agent_name"], "Zen");
        assert_eq!(json["kind"], "rate_limited");
    }

    #[test]
    fn test_emit_without_subscribers() {
        let bus = EventBus::new(4);
        assert_eq!(bus.emit(SwarmEvent::CoordinatorStopped), 0);

        let mut rx = bus.subscribe();
        assert_eq!(bus.emit(SwarmEvent::CoordinatorStopped), 1);
        assert_eq!(rx.try_recv().unwrap(), SwarmEvent::CoordinatorStopped);
    }
}
