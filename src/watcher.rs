// Aggregate watch session across all device kinds
//
// `DeviceWatcher` owns the device collections discovered at construction and
// fans a single delegate out to every watched device. Observers implement
// `WatchDelegate` for just the kinds they care about; the other callbacks
// default to no-ops.

use std::sync::{Arc, Mutex, Weak};

use tracing::info;

use crate::device::Device;
use crate::host::Hosts;
use crate::registry::DeviceRegistry;
use crate::types::{DeviceKind, DeviceSnapshot};

/// Receiver of device state-change reports.
///
/// The delegate is shared read-only by all devices of a watcher and may be
/// invoked concurrently from different devices' notification threads; it is
/// responsible for its own synchronization.
pub trait WatchDelegate: Send + Sync {
    /// A camera device turned on or off
    fn on_camera_state_changed(&self, _device: &DeviceSnapshot, _is_on: bool) {}

    /// A microphone device turned on or off
    fn on_microphone_state_changed(&self, _device: &DeviceSnapshot, _is_on: bool) {}

    /// A speaker device turned on or off
    fn on_speaker_state_changed(&self, _device: &DeviceSnapshot, _is_on: bool) {}
}

/// Aggregate controller over every discovered device of the watched kinds.
///
/// Explicitly constructed and explicitly owned; multiple independent
/// watchers are safe to construct, though production use typically creates
/// one. Dropping the watcher stops the watch session.
pub struct DeviceWatcher {
    cameras: Vec<Device>,
    microphones: Vec<Device>,
    speakers: Vec<Device>,
    delegate: Mutex<Option<Weak<dyn WatchDelegate>>>,
}

impl DeviceWatcher {
    /// Discover devices of the requested kinds through the given accessors.
    /// An empty `kinds` selection watches all kinds. Does not start
    /// watching.
    pub fn new(
        kinds: &[DeviceKind],
        delegate: Option<&Arc<dyn WatchDelegate>>,
        hosts: Hosts,
    ) -> Self {
        let kinds: &[DeviceKind] = if kinds.is_empty() {
            &DeviceKind::ALL
        } else {
            kinds
        };
        let weak = delegate.map(Arc::downgrade);

        let mut cameras = Vec::new();
        let mut microphones = Vec::new();
        let mut speakers = Vec::new();
        for kind in kinds {
            let host = match kind {
                DeviceKind::Camera => &hosts.video,
                DeviceKind::Microphone | DeviceKind::Speaker => &hosts.audio,
            };
            let devices = DeviceRegistry::new(*kind, Arc::clone(host)).enumerate(weak.as_ref());
            match kind {
                DeviceKind::Camera => cameras = devices,
                DeviceKind::Microphone => microphones = devices,
                DeviceKind::Speaker => speakers = devices,
            }
        }

        info!(
            cameras = cameras.len(),
            microphones = microphones.len(),
            speakers = speakers.len(),
            "discovered devices"
        );

        DeviceWatcher {
            cameras,
            microphones,
            speakers,
            delegate: Mutex::new(weak),
        }
    }

    /// Watcher over the real system accessors for this platform
    pub fn system(kinds: &[DeviceKind], delegate: Option<&Arc<dyn WatchDelegate>>) -> Self {
        Self::new(kinds, delegate, Hosts::system())
    }

    /// Start watching every owned device
    pub fn start(&self) {
        let delegate = self.delegate.lock().unwrap().clone();
        for device in self.all_devices() {
            device.set_delegate(delegate.clone());
            device.set_watched(true);
        }
        info!("device watching started");
    }

    /// Stop watching every owned device. Safe to call repeatedly, and
    /// called implicitly on drop.
    pub fn stop(&self) {
        for device in self.all_devices() {
            device.set_delegate(None);
            device.set_watched(false);
        }
        info!("device watching stopped");
    }

    /// True if any owned device currently has a live subscription
    pub fn is_watching(&self) -> bool {
        self.all_devices().any(|device| device.is_watched())
    }

    /// Replace the shared delegate. Propagates to currently-watched devices
    /// only; unwatched devices keep no delegate, so a later `start()`
    /// re-propagates.
    pub fn set_delegate(&self, delegate: Option<&Arc<dyn WatchDelegate>>) {
        let weak = delegate.map(Arc::downgrade);
        *self.delegate.lock().unwrap() = weak.clone();
        for device in self.all_devices() {
            if device.is_watched() {
                device.set_delegate(weak.clone());
            } else {
                device.set_delegate(None);
            }
        }
    }

    /// Cameras discovered at construction, in enumeration order
    pub fn cameras(&self) -> &[Device] {
        &self.cameras
    }

    /// Microphones discovered at construction, in enumeration order
    pub fn microphones(&self) -> &[Device] {
        &self.microphones
    }

    /// Speakers discovered at construction, in enumeration order
    pub fn speakers(&self) -> &[Device] {
        &self.speakers
    }

    fn all_devices(&self) -> impl Iterator<Item = &Device> {
        self.cameras
            .iter()
            .chain(self.microphones.iter())
            .chain(self.speakers.iter())
    }
}

impl Drop for DeviceWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for DeviceWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceWatcher")
            .field("cameras", &self.cameras.len())
            .field("microphones", &self.microphones.len())
            .field("speakers", &self.speakers.len())
            .field("is_watching", &self.is_watching())
            .finish()
    }
}
