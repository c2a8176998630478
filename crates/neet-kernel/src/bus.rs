//! The message bus: an ordered, drain-once queue of terminal messages.

use std::sync::{Mutex, MutexGuard, PoisonError};

use neet_types::TerminalMessage;

/// Append-only queue drained by the front-end.
///
/// Producers push in production order; `drain` hands everything over and
/// leaves the queue empty, so each message is delivered exactly once.
#[derive(Debug, Default)]
pub struct MessageBus {
    queue: Mutex<Vec<TerminalMessage>>,
}

impl MessageBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<TerminalMessage>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, message: TerminalMessage) {
        tracing::trace!(?message, "bus push");
        self.lock().push(message);
    }

    /// Append a batch of messages contiguously.
    pub fn extend(&self, messages: impl IntoIterator<Item = TerminalMessage>) {
        self.lock().extend(messages);
    }

    /// Take every pending message.
    pub fn drain(&self) -> Vec<TerminalMessage> {
        std::mem::take(&mut *self.lock())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_empties_queue() {
        let bus = MessageBus::new();
        bus.push(TerminalMessage::output("a"));
        bus.push(TerminalMessage::ClearScreen);

        let first = bus.drain();
        assert_eq!(first, vec![TerminalMessage::output("a"), TerminalMessage::ClearScreen]);
        assert!(bus.drain().is_empty());
    }

    #[test]
    fn extend_keeps_order() {
        let bus = MessageBus::new();
        bus.push(TerminalMessage::output("1"));
        bus.extend(vec![TerminalMessage::output("2"), TerminalMessage::output("3")]);
        let texts: Vec<_> = bus
            .drain()
            .iter()
            .filter_map(|m| m.text().map(str::to_string))
            .collect();
        assert_eq!(texts, vec!["1", "2", "3"]);
    }

    #[test]
    fn len_tracks_pending() {
        let bus = MessageBus::new();
        assert!(bus.is_empty());
        bus.push(TerminalMessage::output("x"));
        assert_eq!(bus.len(), 1);
    }
}
