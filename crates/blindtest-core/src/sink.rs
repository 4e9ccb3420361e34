//! Event sink trait and implementations.
//!
//! The engine hands every [`GameEvent`] to an [`EventSink`]. Hosts usually
//! use the unbounded channel implementation and drain the receiver in
//! their own loop; tests record into a `Vec`.

use blindtest_types::GameEvent;
use tokio::sync::mpsc;
use tracing::debug;

/// Receiver side of the channel returned by [`event_channel`].
pub type EventReceiver = mpsc::UnboundedReceiver<GameEvent>;

/// Sender side of the channel returned by [`event_channel`].
pub type EventSender = mpsc::UnboundedSender<GameEvent>;

/// Listener for engine events.
pub trait EventSink: Send {
    /// Deliver one event.
    fn emit(&mut self, event: GameEvent);
}

/// Records events in emission order.
impl EventSink for Vec<GameEvent> {
    fn emit(&mut self, event: GameEvent) {
        self.push(event);
    }
}

impl EventSink for EventSender {
    fn emit(&mut self, event: GameEvent) {
        if let Err(err) = self.send(event) {
            debug!(
                round_number = err.0.round_number(),
                "event receiver dropped, discarding event"
            );
        }
    }
}

/// A sink that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpSink;

impl EventSink for NoOpSink {
    fn emit(&mut self, _event: GameEvent) {}
}

/// Create an unbounded event channel.
pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

#[cfg(test)]
mod tests {
    use blindtest_types::RoundStart;

    use super::*;

    fn start_event() -> GameEvent {
        GameEvent::RoundStart(RoundStart {
            round_number: 1,
            title: String::from("T"),
            artists: vec![String::from("A")],
        })
    }

    #[test]
    fn vec_sink_records_in_order() {
        let mut sink: Vec<GameEvent> = Vec::new();
        sink.emit(start_event());
        sink.emit(start_event());
        assert_eq!(sink.len(), 2);
    }

    #[test]
    fn channel_sink_delivers() {
        let (mut tx, mut rx) = event_channel();
        tx.emit(start_event());
        assert_eq!(rx.try_recv().ok(), Some(start_event()));
    }

    #[test]
    fn channel_sink_tolerates_dropped_receiver() {
        let (mut tx, rx) = event_channel();
        drop(rx);
        tx.emit(start_event());
    }
}
