//! Device capability probing
//!
//! Decides what a device is (mouse / touchpad / trackball / cursor /
//! ignored) and which driver features it exposes. Nothing here is cached:
//! driver modules can load and unload independently of device lifetime, so
//! every answer is recomputed from the live device and property state.

use std::collections::HashSet;

use tracing::debug;

use crate::backend::{Backend, DeviceId, DeviceInfo, DeviceSource};
use crate::codec;
use crate::props;

/// Coarse device classification used by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClass {
    Mouse,
    Touchpad,
    Trackball,
    Cursor,
    Ignored,
}

/// A device is ignored when it is blacklisted, its source is outside the
/// pointing classes, or it is the server's own virtual test pointer.
pub fn is_ignored(blacklist: &HashSet<DeviceId>, device: &DeviceInfo) -> bool {
    if blacklist.contains(&device.id) {
        debug!("device {} ({}) is blacklisted", device.name, device.id);
        return true;
    }

    if !matches!(
        device.source,
        DeviceSource::Mouse | DeviceSource::Touchpad | DeviceSource::Cursor
    ) {
        return true;
    }

    device.name == props::XTEST_POINTER_NAME
}

pub fn classify(
    backend: &dyn Backend,
    blacklist: &HashSet<DeviceId>,
    device: &DeviceInfo,
) -> DeviceClass {
    if is_ignored(blacklist, device) {
        return DeviceClass::Ignored;
    }
    if is_touchpad(backend, device) {
        return DeviceClass::Touchpad;
    }
    if is_trackball(device) {
        return DeviceClass::Trackball;
    }
    if device.source == DeviceSource::Cursor {
        return DeviceClass::Cursor;
    }
    DeviceClass::Mouse
}

/// A short read of the named property succeeding (whatever the value) means
/// the driver feature is present on this device.
pub fn supports(backend: &dyn Backend, device: &DeviceInfo, property_name: &str) -> bool {
    let Some(prop) = backend.resolve_atom(property_name) else {
        return false;
    };
    matches!(backend.get_property(device.id, prop), Ok(Some(_)))
}

/// True when the device identifies as a touchpad through either driver
/// family: the XI touchpad source, the legacy "Synaptics Off" signature, or
/// the libinput tapping capability property.
pub fn is_touchpad(backend: &dyn Backend, device: &DeviceInfo) -> bool {
    device.source == DeviceSource::Touchpad
        || supports(backend, device, props::SYNAPTICS_OFF)
        || supports(backend, device, props::LIBINPUT_TAPPING)
}

/// Trackball detection from legacy device class metadata: the TRACKBALL type
/// atom, or a device name carrying "trackball".
pub fn is_trackball(device: &DeviceInfo) -> bool {
    device.type_name == props::TRACKBALL_TYPE
        || device.name.to_lowercase().contains("trackball")
}

/// Whether the legacy ButtonClass record reports any buttons.
pub fn has_buttons(device: &DeviceInfo) -> bool {
    device.num_buttons > 0
}

/// Pads reporting the `[1, 0, 0]` capability signature have one physical
/// button; tap actions and button-map swaps are skipped for them.
pub fn touchpad_has_single_button(backend: &dyn Backend, device: &DeviceInfo) -> bool {
    match codec::read_u8(backend, device, props::SYNAPTICS_CAPABILITIES) {
        Some(data) if data.len() >= 3 => data[0] == 1 && data[1] == 0 && data[2] == 0,
        _ => false,
    }
}

pub fn mouse_is_present(devices: &[DeviceInfo]) -> bool {
    devices
        .iter()
        .any(|d| d.source == DeviceSource::Mouse && d.name != props::XTEST_POINTER_NAME)
}

pub fn touchscreen_is_present(devices: &[DeviceInfo]) -> bool {
    devices.iter().any(|d| d.source == DeviceSource::Touchscreen)
}

pub fn touchpad_is_present(devices: &[DeviceInfo]) -> bool {
    devices.iter().any(|d| d.source == DeviceSource::Touchpad)
}

/// Ids of devices the server currently has disabled.
pub fn disabled_devices(devices: &[DeviceInfo]) -> Vec<DeviceId> {
    devices.iter().filter(|d| !d.enabled).map(|d| d.id).collect()
}
