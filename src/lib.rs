//! Real-time camera, microphone and speaker activity monitoring.
//!
//! Enumerates the audio/video hardware present on the system, watches each
//! device's "running somewhere" state through the host media subsystem's
//! property-change notifications, and reports on/off transitions to a
//! delegate. Built for privacy-indicator style applications that need to
//! know, in real time, whether any camera or microphone is active
//! system-wide.
//!
//! ```no_run
//! use mediawatch::{DeviceKind, DeviceSnapshot, DeviceWatcher, WatchDelegate};
//! use std::sync::Arc;
//!
//! struct Indicator;
//!
//! impl WatchDelegate for Indicator {
//!     fn on_camera_state_changed(&self, device: &DeviceSnapshot, is_on: bool) {
//!         println!("{} turned {}", device.name, if is_on { "on" } else { "off" });
//!     }
//! }
//!
//! let delegate: Arc<dyn WatchDelegate> = Arc::new(Indicator);
//! let watcher = DeviceWatcher::system(&[DeviceKind::Camera], Some(&delegate));
//! watcher.start();
//! ```
//!
//! The watcher does not control devices and keeps no history; it only
//! tracks the current on/off state of what was present at construction.

pub mod device;
pub mod events;
pub mod host;
pub mod log;
pub mod registry;
pub mod types;
pub mod watcher;

// Re-export the core types for external use
pub use device::Device;
pub use events::{EventRelay, StateChangeEvent};
pub use host::{Hosts, PropertyHost, PropertyHostExt};
pub use registry::DeviceRegistry;
pub use types::{CameraLocation, DeviceKind, DeviceSnapshot};
pub use watcher::{DeviceWatcher, WatchDelegate};
