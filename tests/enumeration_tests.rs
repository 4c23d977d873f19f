// Registry enumeration: admission filters, retry-on-resize, and identity
// defaults for devices with unreadable properties.

mod common;

use std::sync::Arc;

use common::{add_audio_device, add_camera, FakeHost};
use mediawatch::host::{PropertyHost, PropertyValue, Selector};
use mediawatch::registry::DeviceRegistry;
use mediawatch::types::{CameraLocation, DeviceKind};

fn registry(kind: DeviceKind, host: &Arc<FakeHost>) -> DeviceRegistry {
    DeviceRegistry::new(kind, Arc::clone(host) as Arc<dyn PropertyHost>)
}

#[test]
fn microphone_enumeration_keeps_only_input_capable_devices() {
    let host = FakeHost::new();
    add_audio_device(&host, 10, "Display Audio", 0, 2);
    add_audio_device(&host, 11, "Built-in Microphone", 2, 0);
    add_audio_device(&host, 12, "HDMI Out", 0, 8);
    add_audio_device(&host, 13, "USB Headset", 1, 2);

    let devices = registry(DeviceKind::Microphone, &host).enumerate(None);

    let ids: Vec<_> = devices.iter().map(|d| d.id()).collect();
    assert_eq!(ids, vec![11, 13]);
    assert!(devices.iter().all(|d| d.kind() == DeviceKind::Microphone));
}

#[test]
fn speaker_enumeration_keeps_only_output_capable_devices() {
    let host = FakeHost::new();
    add_audio_device(&host, 10, "Built-in Microphone", 2, 0);
    add_audio_device(&host, 11, "Built-in Speakers", 0, 2);
    add_audio_device(&host, 12, "USB Headset", 1, 2);

    let devices = registry(DeviceKind::Speaker, &host).enumerate(None);

    let ids: Vec<_> = devices.iter().map(|d| d.id()).collect();
    assert_eq!(ids, vec![11, 12]);
}

#[test]
fn camera_enumeration_admits_every_reported_device() {
    let host = FakeHost::new();
    add_camera(&host, 1, "FaceTime HD Camera", false);
    add_camera(&host, 2, "External Webcam", true);

    let devices = registry(DeviceKind::Camera, &host).enumerate(None);

    assert_eq!(devices.len(), 2);
    assert_eq!(devices[0].name(), "FaceTime HD Camera");
    assert!(!devices[0].is_on());
    assert!(devices[1].is_on());
}

#[test]
fn enumeration_retries_while_the_device_list_resizes() {
    let host = FakeHost::new();
    add_camera(&host, 1, "FaceTime HD Camera", false);
    host.fail_enumerations(3);

    let devices = registry(DeviceKind::Camera, &host).enumerate(None);

    assert_eq!(devices.len(), 1);
}

#[test]
fn unreadable_name_degrades_to_placeholder() {
    let host = FakeHost::new();
    host.add_device(
        7,
        &[(Selector::IsRunningSomewhere, PropertyValue::Flag(false))],
    );

    let devices = registry(DeviceKind::Camera, &host).enumerate(None);

    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].name(), "?");
    assert_eq!(devices[0].location(), Some(CameraLocation::Unknown));
    assert!(!devices[0].is_on());
}

#[test]
fn unrecognized_location_codes_resolve_to_unknown() {
    let host = FakeHost::new();
    host.add_device(
        8,
        &[
            (Selector::Name, PropertyValue::Text("Mystery Cam".into())),
            (Selector::IsRunningSomewhere, PropertyValue::Flag(false)),
            (Selector::Location, PropertyValue::Uint(777)),
        ],
    );

    let devices = registry(DeviceKind::Camera, &host).enumerate(None);

    assert_eq!(devices[0].location(), Some(CameraLocation::Unknown));
}

#[test]
fn camera_location_codes_map_to_placements() {
    let host = FakeHost::new();
    for (id, code) in [(1u32, 1u32), (2, 2), (3, 3), (4, 4)] {
        host.add_device(
            id,
            &[
                (Selector::Name, PropertyValue::Text(format!("Camera {id}"))),
                (Selector::IsRunningSomewhere, PropertyValue::Flag(false)),
                (Selector::Location, PropertyValue::Uint(code)),
            ],
        );
    }

    let devices = registry(DeviceKind::Camera, &host).enumerate(None);

    let locations: Vec<_> = devices.iter().filter_map(|d| d.location()).collect();
    assert_eq!(
        locations,
        vec![
            CameraLocation::BuiltInDisplay,
            CameraLocation::ExternalDisplay,
            CameraLocation::ExternalDevice,
            CameraLocation::ExternalWirelessDevice,
        ]
    );
}

#[test]
fn microphone_with_unreadable_stream_configuration_is_filtered_out() {
    let host = FakeHost::new();
    host.add_device(
        9,
        &[
            (Selector::Name, PropertyValue::Text("Ghost Device".into())),
            (Selector::IsRunningSomewhere, PropertyValue::Flag(false)),
        ],
    );

    let devices = registry(DeviceKind::Microphone, &host).enumerate(None);

    assert!(devices.is_empty());
}
