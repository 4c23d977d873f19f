use std::sync::atomic::{AtomicBool, Ordering};

/// Global flag to control device debug logging
pub static DEVICE_DEBUG_ENABLED: AtomicBool = AtomicBool::new(false);

/// Set device debug logging on/off
pub fn set_device_debug(enabled: bool) {
    DEVICE_DEBUG_ENABLED.store(enabled, Ordering::Relaxed);
}

/// Check if device debug logging is enabled
pub fn is_device_debug_enabled() -> bool {
    DEVICE_DEBUG_ENABLED.load(Ordering::Relaxed)
}

/// Device debug macro - only prints if device debug is enabled
#[macro_export]
macro_rules! device_debug {
    ($($arg:tt)*) => {
        if $crate::log::DEVICE_DEBUG_ENABLED.load(std::sync::atomic::Ordering::Relaxed) {
            println!($($arg)*);
        }
    };
}
