// macOS CoreMediaIO property accessor (cameras)
//
// CoreMediaIO has no bindings in the crates ecosystem, so the handful of
// CMIOObject symbols this host needs are declared manually, FourCC
// constants included.

#![allow(non_upper_case_globals)]
#![allow(non_snake_case)]

use std::collections::HashMap;
use std::ffi::c_void;
use std::mem;
use std::ptr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use core_foundation::base::TCFType;
use core_foundation::string::{CFString, CFStringRef};

use super::{
    HostError, PropertyCallback, PropertyHost, PropertyValue, RawDeviceId, Selector,
    SubscriptionId,
};

pub type OSStatus = i32;
pub type CMIOObjectID = u32;

#[repr(C)]
#[derive(Clone, Copy)]
pub struct CMIOObjectPropertyAddress {
    pub mSelector: u32,
    pub mScope: u32,
    pub mElement: u32,
}

pub type CMIOObjectPropertyListenerProc = Option<
    unsafe extern "C" fn(CMIOObjectID, u32, *const CMIOObjectPropertyAddress, *mut c_void) -> OSStatus,
>;

pub const kCMIOObjectSystemObject: CMIOObjectID = 1;

pub const kCMIOHardwarePropertyDevices: u32 = 0x64657623; // 'dev#'
pub const kCMIOObjectPropertyName: u32 = 0x6C6E616D; // 'lnam'
pub const kCMIOObjectPropertyManufacturer: u32 = 0x6C6D616B; // 'lmak'
pub const kCMIODevicePropertyDeviceIsRunningSomewhere: u32 = 0x676F6E65; // 'gone'
pub const kCMIODevicePropertyLocation: u32 = 0x6C6F6320; // 'loc '

pub const kCMIOObjectPropertyScopeGlobal: u32 = 0x676C6F62; // 'glob'
pub const kCMIOObjectPropertyScopeWildcard: u32 = 0x2A2A2A2A; // '****'
pub const kCMIOObjectPropertyElementMaster: u32 = 0;
pub const kCMIOObjectPropertyElementWildcard: u32 = 0xFFFF_FFFF;

pub const kCMIOHardwareBadPropertySizeError: u32 = 0x2173697A; // '!siz'

#[link(name = "CoreMediaIO", kind = "framework")]
extern "C" {
    fn CMIOObjectGetPropertyDataSize(
        objectID: CMIOObjectID,
        address: *const CMIOObjectPropertyAddress,
        qualifierDataSize: u32,
        qualifierData: *const c_void,
        dataSize: *mut u32,
    ) -> OSStatus;

    fn CMIOObjectGetPropertyData(
        objectID: CMIOObjectID,
        address: *const CMIOObjectPropertyAddress,
        qualifierDataSize: u32,
        qualifierData: *const c_void,
        dataSize: u32,
        dataUsed: *mut u32,
        data: *mut c_void,
    ) -> OSStatus;

    fn CMIOObjectAddPropertyListener(
        objectID: CMIOObjectID,
        address: *const CMIOObjectPropertyAddress,
        listener: CMIOObjectPropertyListenerProc,
        clientData: *mut c_void,
    ) -> OSStatus;

    fn CMIOObjectRemovePropertyListener(
        objectID: CMIOObjectID,
        address: *const CMIOObjectPropertyAddress,
        listener: CMIOObjectPropertyListenerProc,
        clientData: *mut c_void,
    ) -> OSStatus;
}

struct ListenerCtx {
    callback: PropertyCallback,
}

struct ListenerEntry {
    device: CMIOObjectID,
    address: CMIOObjectPropertyAddress,
    ctx: *mut ListenerCtx,
}

/// CoreMediaIO-backed accessor for video devices
pub struct CoreMediaHost {
    next_id: AtomicU64,
    listeners: Mutex<HashMap<u64, ListenerEntry>>,
}

// Listener contexts are heap boxes owned by this host; the raw pointers in
// the table are only dereferenced by CoreMediaIO until removal.
unsafe impl Send for CoreMediaHost {}
unsafe impl Sync for CoreMediaHost {}

impl CoreMediaHost {
    pub fn new() -> Self {
        CoreMediaHost {
            next_id: AtomicU64::new(1),
            listeners: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for CoreMediaHost {
    fn default() -> Self {
        Self::new()
    }
}

fn address_for(selector: Selector) -> Option<CMIOObjectPropertyAddress> {
    let raw = match selector {
        Selector::Name => kCMIOObjectPropertyName,
        Selector::Manufacturer => kCMIOObjectPropertyManufacturer,
        Selector::IsRunningSomewhere => kCMIODevicePropertyDeviceIsRunningSomewhere,
        Selector::Location => kCMIODevicePropertyLocation,
        // Channel probing is an audio-host concern
        Selector::InputStreamConfiguration | Selector::OutputStreamConfiguration => return None,
    };
    Some(CMIOObjectPropertyAddress {
        mSelector: raw,
        mScope: kCMIOObjectPropertyScopeWildcard,
        mElement: kCMIOObjectPropertyElementWildcard,
    })
}

fn selector_from_raw(raw: u32) -> Option<Selector> {
    match raw {
        kCMIOObjectPropertyName => Some(Selector::Name),
        kCMIOObjectPropertyManufacturer => Some(Selector::Manufacturer),
        kCMIODevicePropertyDeviceIsRunningSomewhere => Some(Selector::IsRunningSomewhere),
        kCMIODevicePropertyLocation => Some(Selector::Location),
        _ => None,
    }
}

fn status_error(status: OSStatus) -> HostError {
    if status == kCMIOHardwareBadPropertySizeError as OSStatus {
        HostError::SizeMismatch
    } else {
        HostError::Status(status)
    }
}

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

unsafe extern "C" fn property_listener(
    _object: CMIOObjectID,
    number_addresses: u32,
    addresses: *const CMIOObjectPropertyAddress,
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

impl PropertyHost for CoreMediaHost {
    fn query_size(&self, device: RawDeviceId, selector: Selector) -> Result<usize, HostError> {
        let address = address_for(selector).ok_or(HostError::NoData)?;
        let mut data_size: u32 = 0;
        let status = unsafe {
            CMIOObjectGetPropertyDataSize(device, &address, 0, ptr::null(), &mut data_size)
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
        let mut data_used: u32 = 0;
        let status = unsafe {
            CMIOObjectGetPropertyData(
                device,
                &address,
                0,
                ptr::null(),
                size as u32,
                &mut data_used,
                data.as_mut_ptr() as *mut c_void,
            )
        };
        if status != 0 {
            return Err(status_error(status));
        }
        data.truncate(data_used as usize);

        match selector {
            Selector::Name | Selector::Manufacturer => unsafe { decode_cf_string(&data) },
            Selector::IsRunningSomewhere => Ok(PropertyValue::Flag(decode_u32(&data)? != 0)),
            Selector::Location => Ok(PropertyValue::Uint(decode_u32(&data)?)),
            Selector::InputStreamConfiguration | Selector::OutputStreamConfiguration => {
                Err(HostError::NoData)
            }
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
            CMIOObjectAddPropertyListener(
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
                CMIOObjectRemovePropertyListener(
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
        let address = CMIOObjectPropertyAddress {
            mSelector: kCMIOHardwarePropertyDevices,
            mScope: kCMIOObjectPropertyScopeGlobal,
            mElement: kCMIOObjectPropertyElementMaster,
        };

        let mut data_size: u32 = 0;
        let status = unsafe {
            CMIOObjectGetPropertyDataSize(
                kCMIOObjectSystemObject,
                &address,
                0,
                ptr::null(),
                &mut data_size,
            )
        };
        if status != 0 {
            return Err(status_error(status));
        }

        let device_count = data_size as usize / mem::size_of::<CMIOObjectID>();
        if device_count == 0 {
            return Ok(Vec::new());
        }

        let mut device_ids: Vec<CMIOObjectID> = vec![0; device_count];
        let mut data_used: u32 = 0;
        let status = unsafe {
            CMIOObjectGetPropertyData(
                kCMIOObjectSystemObject,
                &address,
                0,
                ptr::null(),
                data_size,
                &mut data_used,
                device_ids.as_mut_ptr() as *mut c_void,
            )
        };
        if status != 0 {
            return Err(status_error(status));
        }

        device_ids.truncate(data_used as usize / mem::size_of::<CMIOObjectID>());
        Ok(device_ids)
    }
}

impl Drop for CoreMediaHost {
    fn drop(&mut self) {
        let entries: Vec<ListenerEntry> = self.listeners.lock().unwrap().drain().map(|(_, e)| e).collect();
        for entry in entries {
            unsafe {
                CMIOObjectRemovePropertyListener(
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
