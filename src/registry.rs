// Device discovery and enumeration
//
// Enumerates the raw device list for one kind, applies the kind's admission
// filter, and constructs `Device` instances. Enumeration happens once,
// synchronously, at registry invocation time; there is no live add/remove
// detection afterward.

use std::sync::{Arc, Weak};

use tracing::warn;

use crate::device::Device;
use crate::host::{HostError, PropertyHost, PropertyHostExt, RawDeviceId, Selector};
use crate::types::DeviceKind;
use crate::watcher::WatchDelegate;

/// Per-kind device enumerator
pub struct DeviceRegistry {
    kind: DeviceKind,
    host: Arc<dyn PropertyHost>,
}

impl DeviceRegistry {
    pub fn new(kind: DeviceKind, host: Arc<dyn PropertyHost>) -> Self {
        DeviceRegistry { kind, host }
    }

    /// Enumerate all qualifying devices currently present, pre-attaching
    /// `delegate` to each constructed device when given.
    ///
    /// The host may report a device-list size that is stale by the time the
    /// data is fetched; a `SizeMismatch` fetch is retried until a consistent
    /// read succeeds. Any other failure yields an empty list.
    pub fn enumerate(&self, delegate: Option<&Weak<dyn WatchDelegate>>) -> Vec<Device> {
        let ids = loop {
            match self.host.enumerate() {
                Ok(ids) => break ids,
                // Device list resized between size query and fetch
                Err(HostError::SizeMismatch) => continue,
                Err(err) => {
                    warn!(kind = %self.kind, "device enumeration unavailable: {err}");
                    return Vec::new();
                }
            }
        };

        crate::device_debug!("host reported {} raw {} candidates", ids.len(), self.kind);

        let devices: Vec<Device> = ids
            .into_iter()
            .filter(|id| self.admits(*id))
            .map(|id| {
                Device::probe(
                    self.kind,
                    id,
                    Arc::clone(&self.host),
                    delegate.cloned(),
                )
            })
            .collect();

        crate::device_debug!("enumerated {} {} device(s)", devices.len(), self.kind);
        devices
    }

    /// Kind-specific admission filter. Audio endpoints share one raw device
    /// list, so microphones keep only input-capable devices and speakers
    /// only output-capable ones; cameras admit everything.
    fn admits(&self, id: RawDeviceId) -> bool {
        match self.kind {
            DeviceKind::Camera => true,
            DeviceKind::Microphone => self.channel_count(id, Selector::InputStreamConfiguration) > 0,
            DeviceKind::Speaker => self.channel_count(id, Selector::OutputStreamConfiguration) > 0,
        }
    }

    fn channel_count(&self, id: RawDeviceId, selector: Selector) -> u32 {
        self.host
            .read(id, selector)
            .ok()
            .and_then(|value| value.as_uint())
            .unwrap_or(0)
    }
}
