use crate::domain::event::DomainEvent;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Events per receiver before a slow panel falls behind and reloads instead
const BACKLOG: usize = 64;

/// Fan-out of group and session changes to whoever is listening
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<DomainEvent>,
}

pub type SharedEventBus = Arc<EventBus>;

impl EventBus {
    pub fn new(backlog: usize) -> Self {
        let (sender, _) = broadcast::channel(backlog);
        Self { sender }
    }

    pub fn shared() -> SharedEventBus {
        Arc::new(Self::new(BACKLOG))
    }

    /// Returns how many listeners got the event. Zero is normal for the CLI.
    pub fn publish(&self, event: DomainEvent) -> usize {
        let name = event.event_name();
        let group_id = event.group_id().map(str::to_string);
        match self.sender.send(event) {
            Ok(listeners) => {
                tracing::debug!(event = name, group_id = ?group_id, listeners, "Published");
                listeners
            }
            Err(_) => {
                tracing::trace!(event = name, "Nobody listening");
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.sender.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_without_listeners_still_publishes() {
        let bus = EventBus::new(4);
        assert_eq!(bus.publish(DomainEvent::SessionResolved { user_id: None }), 0);
    }

    #[tokio::test]
    async fn test_panel_sees_creation_then_members() {
        let bus = EventBus::shared();
        let mut panel = bus.subscribe();

        let delivered = bus.publish(DomainEvent::GroupCreated {
            group_id: "g1".into(),
            name: "Raid".into(),
        });
        assert_eq!(delivered, 1);
        bus.publish(DomainEvent::MembersAdded {
            group_id: "g1".into(),
            count: 2,
        });

        assert_eq!(panel.recv().await.unwrap().event_name(), "group_created");
        assert_eq!(panel.recv().await.unwrap().group_id(), Some("g1"));
    }

    #[test]
    fn test_slow_listener_lags() {
        let bus = EventBus::new(1);
        let mut panel = bus.subscribe();
        for count in 0..3 {
            bus.publish(DomainEvent::MembersAdded {
                group_id: "g1".into(),
                count,
            });
        }
        assert!(matches!(
            panel.try_recv(),
            Err(broadcast::error::TryRecvError::Lagged(_))
        ));
    }
}
