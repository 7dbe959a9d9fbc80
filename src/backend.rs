//! Device backend abstraction
//!
//! The daemon never talks to hardware directly; everything goes through the
//! display server's input extension. This module defines the trait boundary
//! for that connection: device enumeration, atom resolution, and the
//! primitive per-device property operations the codec builds on.
//!
//! The production implementation lives in [`crate::xinput`]; tests use the
//! in-memory mock at the bottom of this file.

use std::fmt;

/// XInput device identifier (an XID).
pub type DeviceId = u64;

/// Resolved property handle (an X atom). Handles are only meaningful for the
/// connection that resolved them and must be re-resolved per call.
pub type Atom = u64;

/// Where a device's events come from, derived from its XI type atom.
///
/// Trackballs report the `TRACKBALL` type atom but behave as mice for every
/// setting except wheel emulation, so they map to `Mouse` here and are told
/// apart by [`crate::probe::is_trackball`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceSource {
    Mouse,
    Touchpad,
    Touchscreen,
    Cursor,
    Keyboard,
    Other,
}

/// A pointing device as listed by the display server.
///
/// Snapshots are re-listed on every poll; nothing here survives a detach.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    /// XInput device id
    pub id: DeviceId,
    /// Device name as reported by the server
    pub name: String,
    /// Source class derived from the XI type atom
    pub source: DeviceSource,
    /// Raw XI type atom name (e.g. "MOUSE", "TRACKBALL")
    pub type_name: String,
    /// Button count from the legacy ButtonClass record, 0 if none
    pub num_buttons: u16,
    /// Server-side enabled state (the "Device Enabled" property)
    pub enabled: bool,
}

/// Decoded device property value.
///
/// The three layouts cover everything the supported drivers expose: 8-bit
/// integer arrays (booleans, bitmasks, action tables), 32-bit integer arrays
/// (scroll distances), and 32-bit floats (the libinput acceleration scalar).
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyData {
    U8(Vec<u8>),
    I32(Vec<i32>),
    F32(Vec<f32>),
}

impl PropertyData {
    pub fn len(&self) -> usize {
        match self {
            PropertyData::U8(v) => v.len(),
            PropertyData::I32(v) => v.len(),
            PropertyData::F32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Legacy pointer feedback record. Only the acceleration ratio and threshold
/// are ever written; `-1` is the driver's "unset" sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PtrFeedback {
    /// Feedback id within the device's feedback list
    pub id: u64,
    pub accel_num: i32,
    pub accel_denom: i32,
    pub threshold: i32,
}

/// Backend error type
#[derive(Debug)]
pub enum BackendError {
    /// Display connection could not be established
    Connection(String),
    /// The server does not speak the input extension
    Unsupported,
    /// The device disappeared between listing and use
    DeviceGone(DeviceId),
    /// The driver rejected the request (trapped protocol errors)
    Rejected { errors: u32 },
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::Connection(msg) => write!(f, "display connection failed: {}", msg),
            BackendError::Unsupported => write!(f, "XInput extension not supported"),
            BackendError::DeviceGone(id) => write!(f, "device {} is gone", id),
            BackendError::Rejected { errors } => {
                write!(f, "driver rejected the request ({} protocol errors)", errors)
            }
        }
    }
}

impl std::error::Error for BackendError {}

/// The device-property protocol as this daemon consumes it.
///
/// Every operation is best effort: a property that does not exist reads as
/// `Ok(None)`, and protocol errors are trapped inside the implementation and
/// surfaced as [`BackendError::Rejected`] so a failure on one device never
/// takes down the dispatch loop.
pub trait Backend {
    /// True when the underlying protocol is available at all. A backend that
    /// answers false makes the whole subsystem an inert no-op.
    fn supported(&self) -> bool {
        true
    }

    /// List the current slave pointing devices.
    fn devices(&self) -> Vec<DeviceInfo>;

    /// Look up a single device by id.
    fn device(&self, id: DeviceId) -> Option<DeviceInfo> {
        self.devices().into_iter().find(|d| d.id == id)
    }

    /// Resolve a property name to a handle, only if it already exists.
    fn resolve_atom(&self, name: &str) -> Option<Atom>;

    /// Fetch a property's full value. `Ok(None)` means the device does not
    /// carry the property (or carries it in a layout we do not understand).
    fn get_property(&self, device: DeviceId, prop: Atom)
        -> Result<Option<PropertyData>, BackendError>;

    /// Replace a property's value, keeping its type and format.
    fn change_property(
        &self,
        device: DeviceId,
        prop: Atom,
        value: &PropertyData,
    ) -> Result<(), BackendError>;

    /// Fill `map` with the device's button map, truncating if the buffer is
    /// too small. Returns the number of buttons the driver reports, which may
    /// exceed `map.len()`; callers retry with a larger buffer.
    fn get_button_mapping(&self, device: DeviceId, map: &mut [u8])
        -> Result<usize, BackendError>;

    /// Replace the device's button map.
    fn set_button_mapping(&self, device: DeviceId, map: &[u8]) -> Result<(), BackendError>;

    /// List the device's pointer-class feedback records.
    fn pointer_feedbacks(&self, device: DeviceId) -> Result<Vec<PtrFeedback>, BackendError>;

    /// Rewrite one pointer feedback record (acceleration ratio + threshold).
    fn change_pointer_feedback(
        &self,
        device: DeviceId,
        feedback: &PtrFeedback,
    ) -> Result<(), BackendError>;

    /// Device-level enable/disable, keyed by id rather than a property write.
    fn set_device_enabled(&self, device: DeviceId, enabled: bool) -> Result<(), BackendError>;
}

// ============================================================================
// Mock backend (tests only)
// ============================================================================


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_data_len() {
        assert_eq!(PropertyData::U8(vec![1, 2, 3]).len(), 3);
        assert_eq!(PropertyData::I32(vec![7]).len(), 1);
        assert!(PropertyData::F32(vec![]).is_empty());
    }

    #[test]
    fn test_mock_atom_resolution() {
        let backend = mock::MockBackend::new();
        assert!(backend.resolve_atom("libinput Tapping Enabled").is_none());

        let atom = backend.define_atom("libinput Tapping Enabled");
        assert_eq!(backend.resolve_atom("libinput Tapping Enabled"), Some(atom));
        // re-defining is idempotent
        assert_eq!(backend.define_atom("libinput Tapping Enabled"), atom);
    }

    #[test]
    fn test_mock_property_roundtrip() {
        let backend = mock::MockBackend::new();
        backend.add_device(mock::device_info(4, "Test Mouse", DeviceSource::Mouse));
        backend.set_prop(4, "Device Enabled", PropertyData::U8(vec![1]));

        let atom = backend.resolve_atom("Device Enabled").unwrap();
        let data = backend.get_property(4, atom).unwrap().unwrap();
        assert_eq!(data, PropertyData::U8(vec![1]));

        backend.change_property(4, atom, &PropertyData::U8(vec![0])).unwrap();
        assert_eq!(backend.prop(4, "Device Enabled"), Some(PropertyData::U8(vec![0])));
        assert_eq!(backend.write_count(), 1);
    }

    #[test]
    fn test_mock_button_mapping_reports_true_length() {
        let backend = mock::MockBackend::new();
        backend.add_device(mock::device_info(2, "Big Mouse", DeviceSource::Mouse));
        backend.set_button_map(2, (1..=24).collect());

        let mut buf = [0u8; 16];
        let n = backend.get_button_mapping(2, &mut buf).unwrap();
        assert_eq!(n, 24);
        assert_eq!(&buf[..3], &[1, 2, 3]);
    }
}
