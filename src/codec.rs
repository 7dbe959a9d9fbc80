//! Typed read-modify-write operations over device properties
//!
//! Every operation here is best effort: an unresolvable property name or an
//! absent property is a silent no-op (that is the normal "driver feature not
//! present" signal), while a driver-rejected access logs a warning and
//! degrades to a no-op. Nothing in this module panics or propagates an error
//! past its caller, so one broken device never aborts the dispatch loop.

use tracing::{debug, warn};

use crate::backend::{Backend, DeviceInfo, PropertyData, PtrFeedback};

/// Starting capacity for button-map reads; grown to the driver-reported
/// length when the map is larger.
const BUTTON_MAP_CAPACITY: usize = 16;

/// Read a property's raw bytes. `None` when the property (or its atom) is
/// absent, not 8-bit formatted, or the access was rejected.
pub fn read_u8(backend: &dyn Backend, device: &DeviceInfo, prop_name: &str) -> Option<Vec<u8>> {
    let prop = backend.resolve_atom(prop_name)?;
    match backend.get_property(device.id, prop) {
        Ok(Some(PropertyData::U8(data))) => Some(data),
        Ok(_) => None,
        Err(e) => {
            warn!("Error while getting {} on \"{}\": {}", prop_name, device.name, e);
            None
        }
    }
}

/// Read one byte of an 8-bit property as a boolean. Absent property or
/// out-of-range index reads as `false`.
pub fn read_bool(backend: &dyn Backend, device: &DeviceInfo, prop_name: &str, index: usize) -> bool {
    read_u8(backend, device, prop_name)
        .and_then(|data| data.get(index).copied())
        .map(|v| v != 0)
        .unwrap_or(false)
}

/// Set one byte of an 8-bit property, preserving the rest of the array.
pub fn write_bool(
    backend: &dyn Backend,
    device: &DeviceInfo,
    prop_name: &str,
    index: usize,
    value: bool,
) -> bool {
    debug!("Setting {} on {} to {}", prop_name, device.name, value as u8);
    modify_u8(backend, device, prop_name, index + 1, |data| {
        data[index] = value as u8;
    })
}

/// Read-modify-write an 8-bit property. The closure runs only when the
/// property exists and holds at least `min_items` bytes; shorter state is
/// skipped rather than risk writing a layout the driver never advertised.
pub fn modify_u8(
    backend: &dyn Backend,
    device: &DeviceInfo,
    prop_name: &str,
    min_items: usize,
    f: impl FnOnce(&mut [u8]),
) -> bool {
    let Some(prop) = backend.resolve_atom(prop_name) else {
        return false;
    };
    let mut data = match backend.get_property(device.id, prop) {
        Ok(Some(PropertyData::U8(data))) => data,
        Ok(_) => return false,
        Err(e) => {
            warn!("Error while getting {} on \"{}\": {}", prop_name, device.name, e);
            return false;
        }
    };
    if data.len() < min_items {
        debug!(
            "{} on \"{}\" holds {} items, expected at least {}; skipping",
            prop_name,
            device.name,
            data.len(),
            min_items
        );
        return false;
    }

    f(&mut data);

    match backend.change_property(device.id, prop, &PropertyData::U8(data)) {
        Ok(()) => true,
        Err(e) => {
            warn!("Error while setting {} on \"{}\": {}", prop_name, device.name, e);
            false
        }
    }
}

/// Like [`modify_u8`], but the closure also receives the value of a second,
/// driver-default property. No-op when either property is absent; used by
/// the "driver default" click/scroll modes that copy the default mask.
pub fn modify_u8_with_default(
    backend: &dyn Backend,
    device: &DeviceInfo,
    prop_name: &str,
    default_name: &str,
    min_items: usize,
    f: impl FnOnce(&mut [u8], &[u8]),
) -> bool {
    let Some(default_data) = read_u8(backend, device, default_name) else {
        return false;
    };
    modify_u8(backend, device, prop_name, min_items, |data| {
        f(data, &default_data)
    })
}

/// Read-modify-write a 32-bit integer property.
pub fn modify_i32(
    backend: &dyn Backend,
    device: &DeviceInfo,
    prop_name: &str,
    min_items: usize,
    f: impl FnOnce(&mut [i32]),
) -> bool {
    let Some(prop) = backend.resolve_atom(prop_name) else {
        return false;
    };
    let mut data = match backend.get_property(device.id, prop) {
        Ok(Some(PropertyData::I32(data))) => data,
        Ok(_) => return false,
        Err(e) => {
            warn!("Error while getting {} on \"{}\": {}", prop_name, device.name, e);
            return false;
        }
    };
    if data.len() < min_items {
        debug!(
            "{} on \"{}\" holds {} items, expected at least {}; skipping",
            prop_name,
            device.name,
            data.len(),
            min_items
        );
        return false;
    }

    f(&mut data);

    match backend.change_property(device.id, prop, &PropertyData::I32(data)) {
        Ok(()) => true,
        Err(e) => {
            warn!("Error while setting {} on \"{}\": {}", prop_name, device.name, e);
            false
        }
    }
}

/// Set the first item of a 32-bit float property, preserving any further
/// items the driver keeps there.
pub fn write_f32(backend: &dyn Backend, device: &DeviceInfo, prop_name: &str, value: f32) -> bool {
    let Some(prop) = backend.resolve_atom(prop_name) else {
        return false;
    };
    let mut data = match backend.get_property(device.id, prop) {
        Ok(Some(PropertyData::F32(data))) if !data.is_empty() => data,
        Ok(_) => return false,
        Err(e) => {
            warn!("Error while getting {} on \"{}\": {}", prop_name, device.name, e);
            return false;
        }
    };

    data[0] = value;

    match backend.change_property(device.id, prop, &PropertyData::F32(data)) {
        Ok(()) => true,
        Err(e) => {
            warn!("Error while setting {} on \"{}\": {}", prop_name, device.name, e);
            false
        }
    }
}

/// Fetch the device's full button map. The driver reports the true length
/// even when it truncates the output, so the read loops, growing capacity to
/// the reported length, until the whole map fits.
pub fn read_button_map(backend: &dyn Backend, device: &DeviceInfo) -> Option<Vec<u8>> {
    let mut capacity = BUTTON_MAP_CAPACITY;
    loop {
        let mut map = vec![0u8; capacity];
        let reported = match backend.get_button_mapping(device.id, &mut map) {
            Ok(n) => n,
            Err(e) => {
                warn!("Error reading button map on \"{}\": {}", device.name, e);
                return None;
            }
        };
        if reported <= capacity {
            map.truncate(reported);
            return Some(map);
        }
        capacity = reported;
    }
}

/// Replace the device's button map.
pub fn write_button_map(backend: &dyn Backend, device: &DeviceInfo, map: &[u8]) -> bool {
    match backend.set_button_mapping(device.id, map) {
        Ok(()) => true,
        Err(e) => {
            warn!("Error writing button map on \"{}\": {}", device.name, e);
            false
        }
    }
}

/// Rewrite the device's first pointer feedback record with the given
/// acceleration ratio and threshold (`-1` fields mean "unset").
pub fn write_pointer_feedback(
    backend: &dyn Backend,
    device: &DeviceInfo,
    accel_num: i32,
    accel_denom: i32,
    threshold: i32,
) -> bool {
    let feedbacks = match backend.pointer_feedbacks(device.id) {
        Ok(f) => f,
        Err(e) => {
            warn!("Error setting acceleration on \"{}\": {}", device.name, e);
            return false;
        }
    };
    let Some(current) = feedbacks.into_iter().next() else {
        return false;
    };

    debug!(
        "Setting accel {}/{}, threshold {} for device '{}'",
        accel_num, accel_denom, threshold, device.name
    );

    let feedback = PtrFeedback {
        id: current.id,
        accel_num,
        accel_denom,
        threshold,
    };
    match backend.change_pointer_feedback(device.id, &feedback) {
        Ok(()) => true,
        Err(e) => {
            warn!("Error setting acceleration on \"{}\": {}", device.name, e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::{device_info, MockBackend};
    use crate::backend::DeviceSource;

    fn mouse(backend: &MockBackend) -> DeviceInfo {
        let info = device_info(1, "Test Mouse", DeviceSource::Mouse);
        backend.add_device(info.clone());
        info
    }

    #[test]
    fn test_write_bool_absent_property_is_noop() {
        let backend = MockBackend::new();
        let dev = mouse(&backend);

        // atom not even defined
        assert!(!write_bool(&backend, &dev, "libinput Tapping Enabled", 0, true));
        // atom defined but property missing on the device
        backend.define_atom("libinput Tapping Enabled");
        assert!(!write_bool(&backend, &dev, "libinput Tapping Enabled", 0, true));
        assert_eq!(backend.write_count(), 0);
    }

    #[test]
    fn test_write_bool_preserves_siblings() {
        let backend = MockBackend::new();
        let dev = mouse(&backend);
        backend.set_prop(1, "Synaptics Edge Scrolling", PropertyData::U8(vec![0, 1]));

        assert!(write_bool(&backend, &dev, "Synaptics Edge Scrolling", 0, true));
        assert_eq!(
            backend.prop(1, "Synaptics Edge Scrolling"),
            Some(PropertyData::U8(vec![1, 1]))
        );
    }

    #[test]
    fn test_write_bool_out_of_range_index_skips() {
        let backend = MockBackend::new();
        let dev = mouse(&backend);
        backend.set_prop(1, "Evdev Middle Button Emulation", PropertyData::U8(vec![0]));

        assert!(!write_bool(&backend, &dev, "Evdev Middle Button Emulation", 3, true));
        assert_eq!(backend.write_count(), 0);
    }

    #[test]
    fn test_read_bool_defaults_false() {
        let backend = MockBackend::new();
        let dev = mouse(&backend);
        assert!(!read_bool(&backend, &dev, "libinput Send Events Modes Available", 1));

        backend.set_prop(
            1,
            "libinput Send Events Modes Available",
            PropertyData::U8(vec![1, 1]),
        );
        assert!(read_bool(&backend, &dev, "libinput Send Events Modes Available", 1));
    }

    #[test]
    fn test_rejected_write_degrades_to_noop() {
        let backend = MockBackend::new();
        let dev = mouse(&backend);
        backend.set_prop(1, "libinput Tapping Enabled", PropertyData::U8(vec![0]));
        backend.fail_writes(1, true);

        assert!(!write_bool(&backend, &dev, "libinput Tapping Enabled", 0, true));
        // state unchanged
        assert_eq!(
            backend.prop(1, "libinput Tapping Enabled"),
            Some(PropertyData::U8(vec![0]))
        );
    }

    #[test]
    fn test_button_map_grows_to_reported_length() {
        let backend = MockBackend::new();
        let dev = mouse(&backend);
        let big: Vec<u8> = (1..=24).collect();
        backend.set_button_map(1, big.clone());

        let map = read_button_map(&backend, &dev).unwrap();
        assert_eq!(map, big);
        // first read truncated at 16, second fetched all 24
        assert_eq!(backend.button_map_reads(), 2);
    }

    #[test]
    fn test_button_map_small_reads_once() {
        let backend = MockBackend::new();
        let dev = mouse(&backend);
        backend.set_button_map(1, vec![1, 2, 3]);

        let map = read_button_map(&backend, &dev).unwrap();
        assert_eq!(map, vec![1, 2, 3]);
        assert_eq!(backend.button_map_reads(), 1);
    }

    #[test]
    fn test_modify_u8_with_default_needs_both_properties() {
        let backend = MockBackend::new();
        let dev = mouse(&backend);
        backend.set_prop(1, "libinput Click Method Enabled", PropertyData::U8(vec![1, 0]));

        // default property missing: no-op
        assert!(!modify_u8_with_default(
            &backend,
            &dev,
            "libinput Click Method Enabled",
            "libinput Click Method Enabled Default",
            2,
            |data, def| data.copy_from_slice(def),
        ));

        backend.set_prop(
            1,
            "libinput Click Method Enabled Default",
            PropertyData::U8(vec![0, 1]),
        );
        assert!(modify_u8_with_default(
            &backend,
            &dev,
            "libinput Click Method Enabled",
            "libinput Click Method Enabled Default",
            2,
            |data, def| data.copy_from_slice(def),
        ));
        assert_eq!(
            backend.prop(1, "libinput Click Method Enabled"),
            Some(PropertyData::U8(vec![0, 1]))
        );
    }

    #[test]
    fn test_write_f32_requires_float_layout() {
        let backend = MockBackend::new();
        let dev = mouse(&backend);
        backend.set_prop(1, "libinput Accel Speed", PropertyData::U8(vec![0]));

        // wrong layout: treated as absent
        assert!(!write_f32(&backend, &dev, "libinput Accel Speed", 0.5));

        backend.set_prop(1, "libinput Accel Speed", PropertyData::F32(vec![0.0]));
        assert!(write_f32(&backend, &dev, "libinput Accel Speed", 0.5));
        assert_eq!(
            backend.prop(1, "libinput Accel Speed"),
            Some(PropertyData::F32(vec![0.5]))
        );
    }

    #[test]
    fn test_pointer_feedback_rewrites_first_record() {
        let backend = MockBackend::new();
        let dev = mouse(&backend);
        backend.set_feedbacks(
            1,
            vec![PtrFeedback {
                id: 0,
                accel_num: 2,
                accel_denom: 1,
                threshold: 4,
            }],
        );

        assert!(write_pointer_feedback(&backend, &dev, 11, 2, -1));
        assert_eq!(
            backend.feedbacks(1)[0],
            PtrFeedback {
                id: 0,
                accel_num: 11,
                accel_denom: 2,
                threshold: -1
            }
        );
    }

    #[test]
    fn test_pointer_feedback_absent_is_noop() {
        let backend = MockBackend::new();
        let dev = mouse(&backend);
        assert!(!write_pointer_feedback(&backend, &dev, 2, 1, -1));
    }
}
