//! A minimal observer list used to notify interested parties of a change
//! without coupling them to the emitter.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

type Slot<E> = Box<dyn FnMut(&E)>;

pub struct Signal<E> {
    slots: Vec<(ConnectionId, Slot<E>)>,
    next_id: u64,
}

impl<E> Default for Signal<E> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            next_id: 0,
        }
    }
}

impl<E> fmt::Debug for Signal<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("connections", &self.slots.len())
            .finish()
    }
}

impl<E> Signal<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `slot`; it is called on every [`Signal::emit`] in connection
    /// order until disconnected.
    pub fn connect(&mut self, slot: impl FnMut(&E) + 'static) -> ConnectionId {
        let id = ConnectionId(self.next_id);
        self.next_id += 1;
        self.slots.push((id, Box::new(slot)));
        id
    }

    /// Returns `false` when `id` was not connected.
    pub fn disconnect(&mut self, id: ConnectionId) -> bool {
        let before = self.slots.len();
        self.slots.retain(|(slot_id, _)| *slot_id != id);
        self.slots.len() != before
    }

    pub fn emit(&mut self, event: &E) {
        for (_, slot) in &mut self.slots {
            slot(event);
        }
    }

    pub fn connection_count(&self) -> usize {
        self.slots.len()
    }
}
