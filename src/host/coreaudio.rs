// macOS CoreAudio property accessor (microphones and speakers)
//
// Direct AudioObject API integration: size-then-value property queries,
// CFString decoding, AudioBufferList channel counting, and property
// listener registration routed back to boxed Rust callbacks.

use std::collections::HashMap;
use std::ffi::c_void;
use std::mem;
use std::ptr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use core_foundation::base::TCFType;
use core_foundation::string::{CFString, CFStringRef};
use coreaudio_sys::{
    kAudioDevicePropertyDeviceIsRunningSomewhere, kAudioDevicePropertyDeviceManufacturerCFString,
    kAudioDevicePropertyDeviceNameCFString, kAudioDevicePropertyStreamConfiguration,
    kAudioHardwareBadPropertySizeError, kAudioHardwarePropertyDevices,
    kAudioObjectPropertyElementMaster, kAudioObjectPropertyElementWildcard,
    kAudioObjectPropertyScopeGlobal, kAudioObjectPropertyScopeInput,
    kAudioObjectPropertyScopeOutput, kAudioObjectPropertyScopeWildcard, kAudioObjectSystemObject,
    AudioBufferList, AudioObjectAddPropertyListener, AudioObjectGetPropertyData,
    AudioObjectGetPropertyDataSize, AudioObjectID, AudioObjectPropertyAddress,
    AudioObjectRemovePropertyListener, OSStatus,
};

use super::{
    HostError, PropertyCallback, PropertyHost, PropertyValue, RawDeviceId, Selector,
    SubscriptionId,
};

struct ListenerCtx {
    callback: PropertyCallback,
}

struct ListenerEntry {
    device: AudioObjectID,
    address: AudioObjectPropertyAddress,
    ctx: *mut ListenerCtx,
}

/// CoreAudio-backed accessor for audio devices
pub struct CoreAudioHost {
    next_id: AtomicU64,
    listeners: Mutex<HashMap<u64, ListenerEntry>>,
}

// Listener contexts are heap boxes owned by this host; the raw pointers in
// the table are only dereferenced by CoreAudio until removal.
unsafe impl Send for CoreAudioHost {}
unsafe impl Sync for CoreAudioHost {}

impl CoreAudioHost {
    pub fn new() -> Self {
        CoreAudioHost {
            next_id: AtomicU64::new(1),
            listeners: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for CoreAudioHost {
    fn default() -> Self {
        Self::new()
    }
}

fn address_for(selector: Selector) -> Option<AudioObjectPropertyAddress> {
    let (raw, scope, element) = match selector {
        Selector::Name => (
            kAudioDevicePropertyDeviceNameCFString,
            kAudioObjectPropertyScopeWildcard,
            kAudioObjectPropertyElementWildcard,
        ),
        Selector::Manufacturer => (
            kAudioDevicePropertyDeviceManufacturerCFString,
            kAudioObjectPropertyScopeWildcard,
            kAudioObjectPropertyElementWildcard,
        ),
        Selector::IsRunningSomewhere => (
            kAudioDevicePropertyDeviceIsRunningSomewhere,
            kAudioObjectPropertyScopeWildcard,
            kAudioObjectPropertyElementWildcard,
        ),
        Selector::InputStreamConfiguration => (
            kAudioDevicePropertyStreamConfiguration,
            kAudioObjectPropertyScopeInput,
            kAudioObjectPropertyElementMaster,
        ),
        Selector::OutputStreamConfiguration => (
            kAudioDevicePropertyStreamConfiguration,
            kAudioObjectPropertyScopeOutput,
            kAudioObjectPropertyElementMaster,
        ),
        // Placement is a CoreMediaIO concept; audio devices have no counterpart
        Selector::Location => return None,
    };
    Some(AudioObjectPropertyAddress {
        mSelector: raw,
        mScope: scope,
        mElement: element,
    })
}

fn selector_from_raw(raw: u32) -> Option<Selector> {
    match raw {
        kAudioDevicePropertyDeviceNameCFString => Some(Selector::Name),
        kAudioDevicePropertyDeviceManufacturerCFString => Some(Selector::Manufacturer),
        kAudioDevicePropertyDeviceIsRunningSomewhere => Some(Selector::IsRunningSomewhere),
        _ => None,
    }
}

fn status_error(status: OSStatus) -> HostError {
    if status == kAudioHardwareBadPropertySizeError as OSStatus {
        HostError::SizeMismatch
    } else {
        HostError::Status(status)
    }
}

/// Decode a CFStringRef-bearing payload. The property follows the create
/// rule: the host owns the returned reference and must release it.
unsafe fn decode_cf_string(data: &[u8]) -> Result<PropertyValue, HostError> {
    if data.len() < mem::size_of::<CFStringRef>() {
        return Err(HostError::NoData);
    }
    let string_ref = ptr::read_unaligned(data.as_ptr() as *const CFStringRef);
    if string_ref.is_null() {
        return Err(HostError::NoData);
    }
    let text = CFString::wrap_under_create_rule(string_ref).to_string();
    Ok(PropertyValue::Text(text))
}

fn decode_u32(data: &[u8]) -> Result<u32, HostError> {
    if data.len() < mem::size_of::<u32>() {
        return Err(HostError::NoData);
    }
    Ok(unsafe { ptr::read_unaligned(data.as_ptr() as *const u32) })
}

/// Sum the channels of every buffer in an AudioBufferList payload
fn decode_channel_count(data: &[u8]) -> Result<u32, HostError> {
    if data.len() < mem::size_of::<u32>() {
        return Err(HostError::NoData);
    }
    unsafe {
        let list = data.as_ptr() as *const AudioBufferList;
        let buffer_count = (*list).mNumberBuffers as usize;
        let buffers = (*list).mBuffers.as_ptr();
        let mut channels = 0u32;
        for index in 0..buffer_count {
            channels += (*buffers.add(index)).mNumberChannels;
        }
        Ok(channels)
    }
}

unsafe extern "C" fn property_listener(
    _object: AudioObjectID,
    number_addresses: u32,
    addresses: *const AudioObjectPropertyAddress,
    client_data: *mut c_void,
) -> OSStatus {
    if client_data.is_null() || addresses.is_null() {
        return 0;
    }
    let ctx = &*(client_data as *const ListenerCtx);
    let mut changed = Vec::with_capacity(number_addresses as usize);
    for index in 0..number_addresses as usize {
        let address = &*addresses.add(index);
        if let Some(selector) = selector_from_raw(address.mSelector) {
            changed.push(selector);
        }
    }
    if !changed.is_empty() {
        (ctx.callback)(&changed);
    }
    0
}

impl PropertyHost for CoreAudioHost {
    fn query_size(&self, device: RawDeviceId, selector: Selector) -> Result<usize, HostError> {
        let address = address_for(selector).ok_or(HostError::NoData)?;
        let mut data_size: u32 = 0;
        let status = unsafe {
            AudioObjectGetPropertyDataSize(
                device,
                &address,
                0,
                ptr::null(),
                &mut data_size,
            )
        };
        if status != 0 {
            return Err(status_error(status));
        }
        if data_size == 0 {
            return Err(HostError::NoData);
        }
        Ok(data_size as usize)
    }

    fn query_value(
        &self,
        device: RawDeviceId,
        selector: Selector,
        size: usize,
    ) -> Result<PropertyValue, HostError> {
        let address = address_for(selector).ok_or(HostError::NoData)?;
        let mut data = vec![0u8; size];
        let mut io_size = size as u32;
        let status = unsafe {
            AudioObjectGetPropertyData(
                device,
                &address,
                0,
                ptr::null(),
                &mut io_size,
                data.as_mut_ptr() as *mut c_void,
            )
        };
        if status != 0 {
            return Err(status_error(status));
        }
        data.truncate(io_size as usize);

        match selector {
            Selector::Name | Selector::Manufacturer => unsafe { decode_cf_string(&data) },
            Selector::IsRunningSomewhere => Ok(PropertyValue::Flag(decode_u32(&data)? != 0)),
            Selector::InputStreamConfiguration | Selector::OutputStreamConfiguration => {
                Ok(PropertyValue::Uint(decode_channel_count(&data)?))
            }
            Selector::Location => Err(HostError::NoData),
        }
    }

    fn subscribe(
        &self,
        device: RawDeviceId,
        selector: Selector,
        callback: PropertyCallback,
    ) -> Result<SubscriptionId, HostError> {
        let address = address_for(selector).ok_or(HostError::NoData)?;
        let ctx = Box::into_raw(Box::new(ListenerCtx { callback }));
        let status = unsafe {
            AudioObjectAddPropertyListener(
                device,
                &address,
                Some(property_listener),
                ctx as *mut c_void,
            )
        };
        if status != 0 {
            unsafe { drop(Box::from_raw(ctx)) };
            return Err(status_error(status));
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.lock().unwrap().insert(
            id,
            ListenerEntry {
                device,
                address,
                ctx,
            },
        );
        Ok(SubscriptionId(id))
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        let entry = self.listeners.lock().unwrap().remove(&id.0);
        if let Some(entry) = entry {
            unsafe {
                AudioObjectRemovePropertyListener(
                    entry.device,
                    &entry.address,
                    Some(property_listener),
                    entry.ctx as *mut c_void,
                );
                drop(Box::from_raw(entry.ctx));
            }
        }
    }

    fn enumerate(&self) -> Result<Vec<RawDeviceId>, HostError> {
        let address = AudioObjectPropertyAddress {
            mSelector: kAudioHardwarePropertyDevices,
            mScope: kAudioObjectPropertyScopeGlobal,
            mElement: kAudioObjectPropertyElementMaster,
        };

        let mut data_size: u32 = 0;
        let status = unsafe {
            AudioObjectGetPropertyDataSize(
                kAudioObjectSystemObject,
                &address,
                0,
                ptr::null(),
                &mut data_size,
            )
        };
        if status != 0 {
            return Err(status_error(status));
        }

        let device_count = data_size as usize / mem::size_of::<AudioObjectID>();
        if device_count == 0 {
            return Ok(Vec::new());
        }

        let mut device_ids: Vec<AudioObjectID> = vec![0; device_count];
        let mut actual_size = data_size;
        let status = unsafe {
            AudioObjectGetPropertyData(
                kAudioObjectSystemObject,
                &address,
                0,
                ptr::null(),
                &mut actual_size,
                device_ids.as_mut_ptr() as *mut c_void,
            )
        };
        if status != 0 {
            return Err(status_error(status));
        }

        device_ids.truncate(actual_size as usize / mem::size_of::<AudioObjectID>());
        Ok(device_ids)
    }
}

impl Drop for CoreAudioHost {
    fn drop(&mut self) {
        let entries: Vec<ListenerEntry> = self.listeners.lock().unwrap().drain().map(|(_, e)| e).collect();
        for entry in entries {
            unsafe {
                AudioObjectRemovePropertyListener(
                    entry.device,
                    &entry.address,
                    Some(property_listener),
                    entry.ctx as *mut c_void,
                );
                drop(Box::from_raw(entry.ctx));
            }
        }
    }
}
