// Shared test fixtures: a scripted property host and a recording delegate.
//
// `FakeHost` plays the host media subsystem: tests script per-device
// property tables, flip values at runtime, and fire property-change
// notifications by hand while the fake records every subscribe/unsubscribe
// for leak accounting.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use mediawatch::host::{
    HostError, PropertyCallback, PropertyHost, PropertyValue, RawDeviceId, Selector,
    SubscriptionId,
};
use mediawatch::types::{DeviceKind, DeviceSnapshot};
use mediawatch::watcher::WatchDelegate;

type SharedCallback = Arc<dyn Fn(&[Selector]) + Send + Sync>;

/// Install the test tracing subscriber; honors `RUST_LOG`, ignores
/// repeat initialization across tests
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Default)]
struct FakeState {
    devices: Vec<RawDeviceId>,
    properties: HashMap<(RawDeviceId, Selector), PropertyValue>,
    subscriptions: HashMap<u64, (RawDeviceId, Selector, SharedCallback)>,
    pending_enumerate_mismatches: u32,
    subscribe_calls: u64,
    unsubscribe_calls: u64,
}

#[derive(Default)]
pub struct FakeHost {
    state: Mutex<FakeState>,
    next_id: AtomicU64,
}

impl FakeHost {
    pub fn new() -> Arc<FakeHost> {
        Arc::new(FakeHost::default())
    }

    /// Add a raw device with the given property table
    pub fn add_device(&self, id: RawDeviceId, properties: &[(Selector, PropertyValue)]) {
        let mut state = self.state.lock().unwrap();
        state.devices.push(id);
        for (selector, value) in properties {
            state.properties.insert((id, *selector), value.clone());
        }
    }

    /// Overwrite one property's current value
    pub fn set_value(&self, id: RawDeviceId, selector: Selector, value: PropertyValue) {
        self.state
            .lock()
            .unwrap()
            .properties
            .insert((id, selector), value);
    }

    /// Script the next `times` enumerations to fail with `SizeMismatch`
    pub fn fail_enumerations(&self, times: u32) {
        self.state.lock().unwrap().pending_enumerate_mismatches = times;
    }

    /// Deliver a property-change notification to every live registration
    /// for `device`, the way the host fires listeners from its own threads
    pub fn notify(&self, device: RawDeviceId, changed: &[Selector]) {
        let callbacks: Vec<SharedCallback> = {
            let state = self.state.lock().unwrap();
            state
                .subscriptions
                .values()
                .filter(|(id, selector, _)| *id == device && changed.contains(selector))
                .map(|(_, _, callback)| Arc::clone(callback))
                .collect()
        };
        for callback in callbacks {
            callback(changed);
        }
    }

    /// Flip the running state and fire the matching notification
    pub fn set_running(&self, device: RawDeviceId, running: bool) {
        self.set_value(
            device,
            Selector::IsRunningSomewhere,
            PropertyValue::Flag(running),
        );
        self.notify(device, &[Selector::IsRunningSomewhere]);
    }

    pub fn subscribe_calls(&self) -> u64 {
        self.state.lock().unwrap().subscribe_calls
    }

    pub fn unsubscribe_calls(&self) -> u64 {
        self.state.lock().unwrap().unsubscribe_calls
    }

    /// Live registrations currently held for `device`
    pub fn live_subscriptions(&self, device: RawDeviceId) -> usize {
        self.state
            .lock()
            .unwrap()
            .subscriptions
            .values()
            .filter(|(id, _, _)| *id == device)
            .count()
    }
}

impl PropertyHost for FakeHost {
    fn query_size(&self, device: RawDeviceId, selector: Selector) -> Result<usize, HostError> {
        let state = self.state.lock().unwrap();
        match state.properties.get(&(device, selector)) {
            Some(PropertyValue::Text(_)) => Ok(8),
            Some(_) => Ok(4),
            None => Err(HostError::NoData),
        }
    }

    fn query_value(
        &self,
        device: RawDeviceId,
        selector: Selector,
        _size: usize,
    ) -> Result<PropertyValue, HostError> {
        let state = self.state.lock().unwrap();
        state
            .properties
            .get(&(device, selector))
            .cloned()
            .ok_or(HostError::NoData)
    }

    fn subscribe(
        &self,
        device: RawDeviceId,
        selector: Selector,
        callback: PropertyCallback,
    ) -> Result<SubscriptionId, HostError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut state = self.state.lock().unwrap();
        state.subscribe_calls += 1;
        state
            .subscriptions
            .insert(id, (device, selector, Arc::from(callback)));
        Ok(SubscriptionId(id))
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        let mut state = self.state.lock().unwrap();
        state.unsubscribe_calls += 1;
        state.subscriptions.remove(&id.0);
    }

    fn enumerate(&self) -> Result<Vec<RawDeviceId>, HostError> {
        let mut state = self.state.lock().unwrap();
        if state.pending_enumerate_mismatches > 0 {
            state.pending_enumerate_mismatches -= 1;
            return Err(HostError::SizeMismatch);
        }
        Ok(state.devices.clone())
    }
}

/// Script a camera device with a name and initial running state
pub fn add_camera(host: &FakeHost, id: RawDeviceId, name: &str, running: bool) {
    host.add_device(
        id,
        &[
            (Selector::Name, PropertyValue::Text(name.into())),
            (Selector::IsRunningSomewhere, PropertyValue::Flag(running)),
            (Selector::Location, PropertyValue::Uint(1)),
        ],
    );
}

/// Script an audio device with the given input/output channel counts
pub fn add_audio_device(
    host: &FakeHost,
    id: RawDeviceId,
    name: &str,
    input_channels: u32,
    output_channels: u32,
) {
    host.add_device(
        id,
        &[
            (Selector::Name, PropertyValue::Text(name.into())),
            (Selector::IsRunningSomewhere, PropertyValue::Flag(false)),
            (
                Selector::InputStreamConfiguration,
                PropertyValue::Uint(input_channels),
            ),
            (
                Selector::OutputStreamConfiguration,
                PropertyValue::Uint(output_channels),
            ),
        ],
    );
}

/// Delegate that records every state-change call it receives
#[derive(Default)]
pub struct RecordingDelegate {
    calls: Mutex<Vec<(DeviceKind, RawDeviceId, bool)>>,
}

impl RecordingDelegate {
    pub fn new() -> Arc<RecordingDelegate> {
        Arc::new(RecordingDelegate::default())
    }

    pub fn calls(&self) -> Vec<(DeviceKind, RawDeviceId, bool)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl WatchDelegate for RecordingDelegate {
    fn on_camera_state_changed(&self, device: &DeviceSnapshot, is_on: bool) {
        self.calls
            .lock()
            .unwrap()
            .push((DeviceKind::Camera, device.id, is_on));
    }

    fn on_microphone_state_changed(&self, device: &DeviceSnapshot, is_on: bool) {
        self.calls
            .lock()
            .unwrap()
            .push((DeviceKind::Microphone, device.id, is_on));
    }

    fn on_speaker_state_changed(&self, device: &DeviceSnapshot, is_on: bool) {
        self.calls
            .lock()
            .unwrap()
            .push((DeviceKind::Speaker, device.id, is_on));
    }
}
