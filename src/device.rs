// Per-device state tracking and property-change watching
//
// One `Device` owns one hardware endpoint's identity, its cached on/off
// state, and at most one live property-change subscription. The
// read-modify-notify sequence runs under a per-device lock so notifications
// for the same device apply in a strict order even when the host delivers
// them from multiple threads.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};

use tracing::{debug, warn};

use crate::host::{
    PropertyCallback, PropertyHost, PropertyHostExt, RawDeviceId, Selector, SubscriptionId,
};
use crate::types::{CameraLocation, DeviceKind, DeviceSnapshot};
use crate::watcher::WatchDelegate;

/// One watched hardware endpoint. Cheap to clone; clones share state.
///
/// Devices are constructed by [`DeviceRegistry`](crate::DeviceRegistry)
/// during enumeration, never directly. Identity fields (`name`,
/// `manufacturer`, `location`) are fetched once at construction and fall
/// back to documented defaults when the host cannot provide them;
/// construction itself never fails.
#[derive(Clone)]
pub struct Device {
    inner: Arc<DeviceInner>,
}

struct DeviceInner {
    id: RawDeviceId,
    kind: DeviceKind,
    name: String,
    manufacturer: Option<String>,
    location: Option<CameraLocation>,
    host: Arc<dyn PropertyHost>,
    /// Last observed value of the watched property
    is_on: AtomicBool,
    delegate: RwLock<Option<Weak<dyn WatchDelegate>>>,
    /// Live registration, exclusively owned; `Some` iff the device is watched
    subscription: Mutex<Option<SubscriptionId>>,
    /// Serializes the read-modify-notify sequence for this device
    notify_gate: Mutex<()>,
}

impl Device {
    /// Fetch identity and initial state for `id` and wrap it as a `Device`.
    /// Missing properties degrade to defaults: `name = "?"`, no
    /// manufacturer, `location = Unknown`, `is_on = false`.
    pub(crate) fn probe(
        kind: DeviceKind,
        id: RawDeviceId,
        host: Arc<dyn PropertyHost>,
        delegate: Option<Weak<dyn WatchDelegate>>,
    ) -> Self {
        let name = host
            .read(id, Selector::Name)
            .ok()
            .and_then(|value| value.as_text().map(str::to_owned))
            .unwrap_or_else(|| "?".to_string());

        let manufacturer = host
            .read(id, Selector::Manufacturer)
            .ok()
            .and_then(|value| value.as_text().map(str::to_owned));

        let location = match kind {
            DeviceKind::Camera => Some(
                host.read(id, Selector::Location)
                    .ok()
                    .and_then(|value| value.as_uint())
                    .map(CameraLocation::from_code)
                    .unwrap_or(CameraLocation::Unknown),
            ),
            _ => None,
        };

        let is_on = host
            .read(id, Selector::IsRunningSomewhere)
            .ok()
            .and_then(|value| value.as_flag())
            .unwrap_or(false);

        crate::device_debug!("probed {} {}: \"{}\" (on: {})", kind, id, name, is_on);

        Device {
            inner: Arc::new(DeviceInner {
                id,
                kind,
                name,
                manufacturer,
                location,
                host,
                is_on: AtomicBool::new(is_on),
                delegate: RwLock::new(delegate),
                subscription: Mutex::new(None),
                notify_gate: Mutex::new(()),
            }),
        }
    }

    /// Host-assigned object id, stable for the current session
    pub fn id(&self) -> RawDeviceId {
        self.inner.id
    }

    pub fn kind(&self) -> DeviceKind {
        self.inner.kind
    }

    /// Human-readable label; `"?"` if the host could not provide one
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn manufacturer(&self) -> Option<&str> {
        self.inner.manufacturer.as_deref()
    }

    /// Physical placement; `Some` for cameras only
    pub fn location(&self) -> Option<CameraLocation> {
        self.inner.location
    }

    /// Whether the device is currently running somewhere on the system
    pub fn is_on(&self) -> bool {
        self.inner.is_on.load(Ordering::Acquire)
    }

    /// Whether a live property-change subscription exists for this device
    pub fn is_watched(&self) -> bool {
        self.inner.subscription.lock().unwrap().is_some()
    }

    /// Start or stop watching the device's running state. Idempotent in
    /// both directions; watching again replaces the old subscription.
    pub fn set_watched(&self, watched: bool) {
        if watched {
            self.inner.watch();
        } else {
            self.inner.unwatch();
        }
    }

    /// Value capture of the device's identity and current state
    pub fn snapshot(&self) -> DeviceSnapshot {
        self.inner.snapshot(self.is_on())
    }

    pub(crate) fn set_delegate(&self, delegate: Option<Weak<dyn WatchDelegate>>) {
        *self.inner.delegate.write().unwrap() = delegate;
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("id", &self.inner.id)
            .field("kind", &self.inner.kind)
            .field("name", &self.inner.name)
            .field("is_on", &self.is_on())
            .field("is_watched", &self.is_watched())
            .finish()
    }
}

impl DeviceInner {
    fn watch(self: &Arc<Self>) {
        // Replace any existing registration so at most one is ever live
        self.unwatch();

        let weak = Arc::downgrade(self);
        let callback: PropertyCallback = Box::new(move |changed: &[Selector]| {
            if let Some(inner) = weak.upgrade() {
                inner.handle_property_change(changed);
            }
        });

        match self
            .host
            .subscribe(self.id, Selector::IsRunningSomewhere, callback)
        {
            Ok(id) => {
                *self.subscription.lock().unwrap() = Some(id);
                debug!(device = self.id, kind = %self.kind, "watching device");
            }
            Err(err) => {
                warn!(
                    device = self.id,
                    kind = %self.kind,
                    "failed to register property listener: {err}"
                );
            }
        }
    }

    fn unwatch(&self) {
        let token = self.subscription.lock().unwrap().take();
        if let Some(id) = token {
            self.host.unsubscribe(id);
            debug!(device = self.id, kind = %self.kind, "unwatched device");
        }
    }

    /// Invoked by the host when watched properties change, potentially off
    /// the caller's thread. Re-reads the current value, updates the cache,
    /// and notifies the delegate only on an actual transition.
    fn handle_property_change(&self, changed: &[Selector]) {
        for selector in changed {
            if *selector != Selector::IsRunningSomewhere {
                continue;
            }

            let _ordered = self.notify_gate.lock().unwrap();
            let now_on = self
                .host
                .read(self.id, Selector::IsRunningSomewhere)
                .ok()
                .and_then(|value| value.as_flag())
                .unwrap_or(false);
            let was_on = self.is_on.swap(now_on, Ordering::AcqRel);

            if was_on != now_on {
                debug!(device = self.id, kind = %self.kind, on = now_on, "device state changed");
                self.notify_delegate(now_on);
            }
        }
    }

    fn notify_delegate(&self, is_on: bool) {
        let delegate = self
            .delegate
            .read()
            .unwrap()
            .as_ref()
            .and_then(Weak::upgrade);
        if let Some(delegate) = delegate {
            let snapshot = self.snapshot(is_on);
            match self.kind {
                DeviceKind::Camera => delegate.on_camera_state_changed(&snapshot, is_on),
                DeviceKind::Microphone => delegate.on_microphone_state_changed(&snapshot, is_on),
                DeviceKind::Speaker => delegate.on_speaker_state_changed(&snapshot, is_on),
            }
        }
    }

    fn snapshot(&self, is_on: bool) -> DeviceSnapshot {
        DeviceSnapshot {
            id: self.id,
            kind: self.kind,
            name: self.name.clone(),
            manufacturer: self.manufacturer.clone(),
            location: self.location,
            is_on,
        }
    }
}

impl Drop for DeviceInner {
    fn drop(&mut self) {
        let token = self.subscription.get_mut().unwrap().take();
        if let Some(id) = token {
            self.host.unsubscribe(id);
        }
    }
}
