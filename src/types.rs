// Core device types for audio/video activity monitoring
//
// This module contains the fundamental data structures shared across the
// watcher subsystem: device kinds, camera placement codes, and the
// serializable device snapshot handed to delegates and event consumers.

use serde::{Deserialize, Serialize};

use crate::host::RawDeviceId;

/// Hardware device categories tracked by the watcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    Camera,
    Microphone,
    Speaker,
}

impl DeviceKind {
    /// All kinds, in the order the watcher stores them
    pub const ALL: [DeviceKind; 3] = [
        DeviceKind::Camera,
        DeviceKind::Microphone,
        DeviceKind::Speaker,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            DeviceKind::Camera => "camera",
            DeviceKind::Microphone => "microphone",
            DeviceKind::Speaker => "speaker",
        }
    }
}

impl std::fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Physical placement of a camera, as reported by the host subsystem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraLocation {
    BuiltInDisplay,
    ExternalDisplay,
    ExternalDevice,
    ExternalWirelessDevice,
    Unknown,
}

impl CameraLocation {
    /// Map a host-reported location code. Codes outside the defined set
    /// resolve to `Unknown`.
    pub fn from_code(code: u32) -> Self {
        match code {
            1 => CameraLocation::BuiltInDisplay,
            2 => CameraLocation::ExternalDisplay,
            3 => CameraLocation::ExternalDevice,
            4 => CameraLocation::ExternalWirelessDevice,
            _ => CameraLocation::Unknown,
        }
    }
}

impl std::fmt::Display for CameraLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            CameraLocation::BuiltInDisplay => "Built-in",
            CameraLocation::ExternalDisplay => "External Display",
            CameraLocation::ExternalDevice => "External Device",
            CameraLocation::ExternalWirelessDevice => "External Wireless",
            CameraLocation::Unknown => "Unknown",
        };
        f.write_str(text)
    }
}

/// Serializable capture of a device's identity and current activity state.
///
/// This is the value handed to [`WatchDelegate`](crate::WatchDelegate)
/// callbacks and embedded in [`StateChangeEvent`](crate::StateChangeEvent)s,
/// so it can be shipped straight to a UI layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    /// Host-assigned object id, stable for the current session
    pub id: RawDeviceId,
    pub kind: DeviceKind,
    /// Human-readable label; `"?"` if the host could not provide one
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    /// Physical placement; cameras only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<CameraLocation>,
    /// Whether the device is running somewhere on the system
    pub is_on: bool,
}
