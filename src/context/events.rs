//! Notifications for observers outside the context.

use std::sync::mpsc::{channel, Receiver, Sender};

use crate::layers::{ProfileId, Region};

/// Something observers of a context may react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextEvent {
    ActiveProfileChanged { context: String, profile: ProfileId },
    ProfileAdded { profile: ProfileId },
    ProfileRemoved { profile: ProfileId },
    LayerChanged {
        profile: ProfileId,
        region: Region,
        index: usize,
    },
}

/// Fan-out of [`ContextEvent`]s to any number of receivers.
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Vec<Sender<ContextEvent>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> Receiver<ContextEvent> {
        let (tx, rx) = channel();
        self.subscribers.push(tx);
        rx
    }

    /// Deliver to every live receiver, dropping the ones that hung up.
    pub fn emit(&mut self, event: ContextEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_reaches_every_subscriber() {
        let mut bus = EventBus::new();
        let a = bus.subscribe();
        let b = bus.subscribe();

        bus.emit(ContextEvent::ProfileAdded {
            profile: ProfileId::from("racing"),
        });

        assert!(a.try_recv().is_ok());
        assert!(b.try_recv().is_ok());
    }

    #[test]
    fn test_disconnected_subscribers_are_pruned() {
        let mut bus = EventBus::new();
        let kept = bus.subscribe();
        drop(bus.subscribe());

        bus.emit(ContextEvent::ProfileRemoved {
            profile: ProfileId::from("old"),
        });

        assert_eq!(bus.subscriber_count(), 1);
        assert_eq!(
            kept.try_recv().unwrap(),
            ContextEvent::ProfileRemoved {
                profile: ProfileId::from("old")
            }
        );
    }
}
