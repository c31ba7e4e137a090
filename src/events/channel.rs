//! Event channel implementation using crossbeam-channel.
//!
//! Provides a thread-safe way to send events from the core library
//! to any presentation layer.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

use super::Event;

/// Capacity of the channel returned by [`EventChannel::new`].
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Sends events from the core library.
///
/// This is a thin wrapper around crossbeam's Sender that can be
/// cloned and sent across threads.
#[derive(Clone)]
pub struct EventSender {
    inner: Sender<Event>,
}

impl EventSender {
    /// Send an event without ever blocking.
    ///
    /// When the channel is full or the receiver is gone the event is
    /// dropped. Returns whether the event was delivered.
    pub fn send(&self, event: Event) -> bool {
        match self.inner.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

/// Receives events from the core library.
///
/// Events are lossy: only the most recent snapshot is guaranteed to be
/// accurate.
pub struct EventReceiver {
    inner: Receiver<Event>,
}

impl EventReceiver {
    /// Block until the next event is received
    pub fn recv(&self) -> Option<Event> {
        self.inner.recv().ok()
    }

    /// Try to receive an event without blocking
    pub fn try_recv(&self) -> Option<Event> {
        self.inner.try_recv().ok()
    }

    /// Returns an iterator over received events
    pub fn iter(&self) -> impl Iterator<Item = Event> + '_ {
        self.inner.iter()
    }
}

/// A channel for communication between the core library and UI layers.
pub struct EventChannel;

impl EventChannel {
    /// Create a bounded event channel with the default capacity.
    pub fn new() -> (EventSender, EventReceiver) {
        Self::bounded(DEFAULT_EVENT_CAPACITY)
    }

    /// Create a bounded event channel with the specified capacity.
    pub fn bounded(capacity: usize) -> (EventSender, EventReceiver) {
        let (sender, receiver) = bounded(capacity);
        (
            EventSender { inner: sender },
            EventReceiver { inner: receiver },
        )
    }
}

impl Default for EventChannel {
    fn default() -> Self {
        EventChannel
    }
}

/// A no-op event sender for when you don't need progress reporting.
pub fn null_sender() -> EventSender {
    let (sender, _receiver) = EventChannel::bounded(1);
    sender
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{PipelineEvent, PipelinePhase, ProgressSnapshot};
    use std::thread;

    fn snapshot(processed: usize) -> Event {
        Event::Progress(ProgressSnapshot {
            phase: PipelinePhase::Hashing,
            processed,
            total: 10,
            photos: processed,
            videos: 0,
            music: 0,
            current: format!("/media/{processed}.jpg"),
        })
    }

    #[test]
    fn events_can_be_sent_across_threads() {
        let (sender, receiver) = EventChannel::new();

        let handle = thread::spawn(move || {
            sender.send(snapshot(5));
        });
        handle.join().unwrap();

        match receiver.recv().unwrap() {
            Event::Progress(p) => assert_eq!(p.processed, 5),
            _ => panic!("Wrong event type"),
        }
    }

    #[test]
    fn null_sender_does_not_panic() {
        let sender = null_sender();
        sender.send(Event::Pipeline(PipelineEvent::Started));
    }

    #[test]
    fn full_channel_drops_instead_of_blocking() {
        let (sender, receiver) = EventChannel::bounded(2);

        assert!(sender.send(snapshot(1)));
        assert!(sender.send(snapshot(2)));
        assert!(!sender.send(snapshot(3)));

        assert!(receiver.try_recv().is_some());
        assert!(receiver.try_recv().is_some());
        assert!(receiver.try_recv().is_none());
    }
}
