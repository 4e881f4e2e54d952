//! One-to-many notification of UI-facing events

/// Handle identifying one subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Registry of event subscribers
///
/// Every subscriber gets its own unbounded channel. Emitting clones the event
/// once per live subscriber, in subscription order. Subscribers whose
/// receiver was dropped are pruned on the next emit.
#[derive(Debug)]
pub struct Observers<T> {
    next_id: u64,
    subscribers: Vec<(SubscriptionId, flume::Sender<T>)>,
}

impl<T: Clone> Observers<T> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            subscribers: Vec::new(),
        }
    }

    /// Register a new subscriber
    pub fn subscribe(&mut self) -> (SubscriptionId, flume::Receiver<T>) {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        let (tx, rx) = flume::unbounded();
        self.subscribers.push((id, tx));
        (id, rx)
    }

    /// Remove a subscriber, returns false if it was not registered
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub_id, _)| *sub_id != id);
        self.subscribers.len() != before
    }

    /// Deliver an event to every live subscriber
    pub fn emit(&mut self, event: &T) {
        self.subscribers
            .retain(|(_, tx)| tx.send(event.clone()).is_ok());
    }

    /// Number of registered subscribers
    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}

impl<T: Clone> Default for Observers<T> {
    fn default() -> Self {
        Self::new()
    }
}
