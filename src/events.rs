// Channel-based event fan-out
//
// `EventRelay` adapts the delegate contract onto a tokio channel for
// callers that would rather consume a stream of state changes than
// implement `WatchDelegate` themselves.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::types::DeviceSnapshot;
use crate::watcher::WatchDelegate;

/// One observed device state transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateChangeEvent {
    pub device: DeviceSnapshot,
    pub is_on: bool,
}

/// A `WatchDelegate` that forwards every state change into an unbounded
/// channel. Set it as the watcher's delegate and consume the receiver:
///
/// ```no_run
/// use mediawatch::{DeviceWatcher, EventRelay, WatchDelegate};
/// use std::sync::Arc;
///
/// # async fn run() {
/// let (relay, mut events) = EventRelay::channel();
/// let delegate: Arc<dyn WatchDelegate> = relay;
/// let watcher = DeviceWatcher::system(&[], Some(&delegate));
/// watcher.start();
/// while let Some(event) = events.recv().await {
///     println!("{} is now {}", event.device.name, event.is_on);
/// }
/// # }
/// ```
pub struct EventRelay {
    sender: mpsc::UnboundedSender<StateChangeEvent>,
}

impl EventRelay {
    /// Create a relay and the receiving half of its channel
    pub fn channel() -> (
        Arc<EventRelay>,
        mpsc::UnboundedReceiver<StateChangeEvent>,
    ) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Arc::new(EventRelay { sender }), receiver)
    }

    fn forward(&self, device: &DeviceSnapshot, is_on: bool) {
        // The receiver may already be gone; state changes are fire-and-forget
        let _ = self.sender.send(StateChangeEvent {
            device: device.clone(),
            is_on,
        });
    }
}

impl WatchDelegate for EventRelay {
    fn on_camera_state_changed(&self, device: &DeviceSnapshot, is_on: bool) {
        self.forward(device, is_on);
    }

    fn on_microphone_state_changed(&self, device: &DeviceSnapshot, is_on: bool) {
        self.forward(device, is_on);
    }

    fn on_speaker_state_changed(&self, device: &DeviceSnapshot, is_on: bool) {
        self.forward(device, is_on);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DeviceKind;

    fn snapshot(id: u32, is_on: bool) -> DeviceSnapshot {
        DeviceSnapshot {
            id,
            kind: DeviceKind::Microphone,
            name: format!("Mic {id}"),
            manufacturer: None,
            location: None,
            is_on,
        }
    }

    #[tokio::test]
    async fn relay_delivers_events_in_order() {
        let (relay, mut events) = EventRelay::channel();

        relay.on_microphone_state_changed(&snapshot(1, true), true);
        relay.on_microphone_state_changed(&snapshot(1, false), false);
        relay.on_camera_state_changed(&snapshot(2, true), true);

        assert_eq!(events.recv().await.unwrap().is_on, true);
        assert_eq!(events.recv().await.unwrap().is_on, false);
        assert_eq!(events.recv().await.unwrap().device.id, 2);
    }

    #[tokio::test]
    async fn dropped_receiver_does_not_panic_the_sender() {
        let (relay, events) = EventRelay::channel();
        drop(events);

        relay.on_speaker_state_changed(&snapshot(3, true), true);
    }

    #[test]
    fn event_serializes_with_stable_field_names() {
        let event = StateChangeEvent {
            device: snapshot(5, true),
            is_on: true,
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["device"]["id"], 5);
        assert_eq!(json["device"]["kind"], "microphone");
        assert_eq!(json["is_on"], true);
    }
}
