// Property accessor boundary over the host media subsystem
//
// Everything the watcher core knows about the operating system goes through
// the `PropertyHost` trait: typed property reads, change subscriptions, and
// raw device enumeration. Real implementations live in this module's
// platform submodules; tests substitute mocks or scripted fakes.

use std::sync::Arc;

#[cfg(target_os = "macos")]
pub mod coreaudio;
#[cfg(target_os = "macos")]
pub mod coremediaio;

/// Host-assigned object id for one device endpoint
pub type RawDeviceId = u32;

/// Properties the watcher addresses on a device.
///
/// A closed set: each host maps these onto its own selector/scope constants
/// and refuses anything it does not understand with [`HostError::NoData`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Selector {
    /// Human-readable device name
    Name,
    /// Human-readable manufacturer name
    Manufacturer,
    /// Whether the device is running in at least one process system-wide
    IsRunningSomewhere,
    /// Physical placement code (cameras)
    Location,
    /// Input-scope stream configuration, decoded to a total channel count
    InputStreamConfiguration,
    /// Output-scope stream configuration, decoded to a total channel count
    OutputStreamConfiguration,
}

/// Typed decode of a raw property payload
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Text(String),
    Flag(bool),
    Uint(u32),
}

impl PropertyValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            PropertyValue::Flag(flag) => Some(*flag),
            _ => None,
        }
    }

    pub fn as_uint(&self) -> Option<u32> {
        match self {
            PropertyValue::Uint(value) => Some(*value),
            _ => None,
        }
    }
}

/// Errors at the accessor boundary.
///
/// None of these cross the crate's public surface: callers recover with
/// documented defaults (missing data), retries (size mismatch), or empty
/// enumerations (unsupported platform).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    #[error("property has no data")]
    NoData,
    #[error("property size changed between size query and data fetch")]
    SizeMismatch,
    #[error("host subsystem returned status {0}")]
    Status(i32),
    #[error("host subsystem not available on this platform")]
    Unsupported,
}

/// Token for one live property-change registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Callback invoked by the host when watched properties change. Receives the
/// selectors the host reported as changed; may run on any thread.
pub type PropertyCallback = Box<dyn Fn(&[Selector]) + Send + Sync>;

/// Typed get/watch/unwatch primitives over the host media subsystem
#[cfg_attr(test, mockall::automock)]
pub trait PropertyHost: Send + Sync {
    /// Byte size of the property's current payload
    fn query_size(&self, device: RawDeviceId, selector: Selector) -> Result<usize, HostError>;

    /// Fetch and decode the property payload. `size` is the byte count a
    /// prior `query_size` reported; the host fails with
    /// [`HostError::SizeMismatch`] if the payload resized in between.
    fn query_value(
        &self,
        device: RawDeviceId,
        selector: Selector,
        size: usize,
    ) -> Result<PropertyValue, HostError>;

    /// Register a change listener for one property on one device. The
    /// returned id stays live until `unsubscribe`.
    fn subscribe(
        &self,
        device: RawDeviceId,
        selector: Selector,
        callback: PropertyCallback,
    ) -> Result<SubscriptionId, HostError>;

    /// Tear down a registration. Synchronous: once this returns, no further
    /// callback for the registration will fire.
    fn unsubscribe(&self, id: SubscriptionId);

    /// All raw device ids currently present in this host's global scope.
    /// Fails with [`HostError::SizeMismatch`] when the list resized during
    /// the fetch; the caller retries until a consistent read succeeds.
    fn enumerate(&self) -> Result<Vec<RawDeviceId>, HostError>;
}

/// Size-then-value read with the size-mismatch retry folded in
pub trait PropertyHostExt {
    fn read(&self, device: RawDeviceId, selector: Selector) -> Result<PropertyValue, HostError>;
}

impl<T: PropertyHost + ?Sized> PropertyHostExt for T {
    fn read(&self, device: RawDeviceId, selector: Selector) -> Result<PropertyValue, HostError> {
        loop {
            let size = self.query_size(device, selector)?;
            match self.query_value(device, selector, size) {
                Err(HostError::SizeMismatch) => continue,
                other => return other,
            }
        }
    }
}

/// The accessor pair the watcher runs against: one host for video devices
/// (cameras), one for audio devices (microphones and speakers).
#[derive(Clone)]
pub struct Hosts {
    pub video: Arc<dyn PropertyHost>,
    pub audio: Arc<dyn PropertyHost>,
}

impl Hosts {
    /// The real system accessors for this platform
    #[cfg(target_os = "macos")]
    pub fn system() -> Self {
        Hosts {
            video: Arc::new(coremediaio::CoreMediaHost::new()),
            audio: Arc::new(coreaudio::CoreAudioHost::new()),
        }
    }

    /// Stub accessors; every operation fails with `Unsupported`, so
    /// enumeration yields empty device lists
    #[cfg(not(target_os = "macos"))]
    pub fn system() -> Self {
        let host = Arc::new(UnsupportedHost);
        Hosts {
            video: host.clone(),
            audio: host,
        }
    }
}

/// Non-macOS stub implementation
#[cfg(not(target_os = "macos"))]
pub struct UnsupportedHost;

#[cfg(not(target_os = "macos"))]
impl PropertyHost for UnsupportedHost {
    fn query_size(&self, _device: RawDeviceId, _selector: Selector) -> Result<usize, HostError> {
        Err(HostError::Unsupported)
    }

    fn query_value(
        &self,
        _device: RawDeviceId,
        _selector: Selector,
        _size: usize,
    ) -> Result<PropertyValue, HostError> {
        Err(HostError::Unsupported)
    }

    fn subscribe(
        &self,
        _device: RawDeviceId,
        _selector: Selector,
        _callback: PropertyCallback,
    ) -> Result<SubscriptionId, HostError> {
        Err(HostError::Unsupported)
    }

    fn unsubscribe(&self, _id: SubscriptionId) {}

    fn enumerate(&self) -> Result<Vec<RawDeviceId>, HostError> {
        Err(HostError::Unsupported)
    }
}
