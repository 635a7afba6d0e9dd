use std::sync::mpsc::{self, Receiver, Sender};

/// Change notifications published by the [`Inspector`](super::Inspector)
/// after each mutation of mirror, expand or selection state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MirrorEvent {
    TreeReset,
    RootsReplaced { count: usize },
    NodesMerged { target: String, ids: Vec<String> },
    Expanded { id: String, expanded: bool },
    SelectionChanged { id: Option<String> },
    DetailLoaded { id: String },
    DetailCleared,
    TreeUnsupported { target: String },
}

/// Fan-out of [`MirrorEvent`]s to any number of observers.
#[derive(Debug, Default)]
pub struct ChangeFeed {
    subscribers: Vec<Sender<MirrorEvent>>,
}

impl ChangeFeed {
    pub fn subscribe(&mut self) -> Receiver<MirrorEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn publish(&mut self, event: MirrorEvent) {
        // Dropped receivers unsubscribe implicitly.
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
    fn publish_reaches_every_subscriber() {
        let mut feed = ChangeFeed::default();
        let a = feed.subscribe();
        let b = feed.subscribe();
        feed.publish(MirrorEvent::TreeReset);
        assert_eq!(a.try_recv().unwrap(), MirrorEvent::TreeReset);
        assert_eq!(b.try_recv().unwrap(), MirrorEvent::TreeReset);
    }

    #[test]
    fn dropped_receiver_is_pruned() {
        let mut feed = ChangeFeed::default();
        let keep = feed.subscribe();
        drop(feed.subscribe());
        feed.publish(MirrorEvent::DetailCleared);
        assert_eq!(feed.subscriber_count(), 1);
        assert_eq!(keep.try_recv().unwrap(), MirrorEvent::DetailCleared);
    }
}
