//! XInput backend over libX11/libXi
//!
//! Implements [`Backend`] against the classic XInput 1.x device protocol:
//! `XListInputDevices` for enumeration, `XGetDeviceProperty` /
//! `XChangeDeviceProperty` for the named-property codec, button mappings,
//! and pointer feedback records. Libraries are dlopen'd through `x11-dl`, so
//! the daemon runs (and degrades to a no-op) on hosts without libXi.
//!
//! Every native call sequence is wrapped in a scoped error trap: X reports
//! errors asynchronously, and a device yanked mid-operation must produce a
//! trapped `Rejected` error on this call, not an abort of the process or a
//! misattributed failure on the next one.
//!
//! SPDX-License-Identifier: GPL-3.0

use std::ffi::{CStr, CString};
use std::os::raw::{c_int, c_long, c_short, c_uchar, c_uint, c_ulong, c_void};
use std::ptr;
use std::sync::atomic::{AtomicU32, Ordering};

use tracing::debug;

use x11_dl::xinput::{XDevice, XDeviceInfo, XFeedbackControl, XFeedbackState, XInput};
use x11_dl::xlib::{self, Display, XErrorEvent, Xlib};

/// Type of an Xlib error handler as returned by `XSetErrorHandler` in x11-dl.
type XErrorHandler = Option<unsafe extern "C" fn(*mut Display, *mut XErrorEvent) -> c_int>;

use crate::backend::{
    Atom, Backend, BackendError, DeviceId, DeviceInfo, DeviceSource, PropertyData, PtrFeedback,
};
use crate::props;

// XInput class and feedback constants not exported by x11-dl's xinput
// module (X11/extensions/XI.h).
const BUTTON_CLASS: c_ulong = 1;
const PTR_FEEDBACK_CLASS: c_ulong = 1;
const DV_ACCEL_NUM: c_ulong = 1 << 0;
const DV_ACCEL_DENOM: c_ulong = 1 << 1;
const DV_THRESHOLD: c_ulong = 1 << 2;
const IS_X_EXTENSION_POINTER: c_int = 4;

/// Per-class header of an entry in `XDeviceInfo::inputclassinfo`
/// (X11/extensions/XInput.h, not exported by x11-dl).
#[repr(C)]
struct XAnyClassInfo {
    class: c_ulong,
    length: c_int,
}

#[repr(C)]
struct XButtonInfo {
    class: c_ulong,
    length: c_int,
    num_buttons: c_short,
}

#[repr(C)]
struct XPtrFeedbackState {
    class: c_ulong,
    length: c_int,
    id: c_ulong,
    accel_num: c_int,
    accel_denom: c_int,
    threshold: c_int,
}

#[repr(C)]
struct XPtrFeedbackControl {
    class: c_ulong,
    length: c_int,
    id: c_ulong,
    accel_num: c_int,
    accel_denom: c_int,
    threshold: c_int,
}

/// [`Backend`] implementation speaking XInput to the default display.
pub struct XInputBackend {
    xlib: Xlib,
    xinput: XInput,
    display: *mut Display,
}

impl XInputBackend {
    /// Open the default display and probe for the XInput extension.
    pub fn open() -> Result<Self, BackendError> {
        let xlib = Xlib::open().map_err(|e| BackendError::Connection(e.to_string()))?;
        let xinput = XInput::open().map_err(|e| BackendError::Connection(e.to_string()))?;

        let display = unsafe { (xlib.XOpenDisplay)(ptr::null()) };
        if display.is_null() {
            return Err(BackendError::Connection("cannot open display".to_string()));
        }

        let backend = Self {
            xlib,
            xinput,
            display,
        };

        if !backend.extension_present() {
            return Err(BackendError::Unsupported);
        }

        Ok(backend)
    }

    fn extension_present(&self) -> bool {
        let name = CString::new("XInputExtension").unwrap();
        unsafe {
            let version = (self.xinput.XGetExtensionVersion)(self.display, name.as_ptr());
            if version.is_null() {
                return false;
            }
            let present = (*version).present != 0;
            (self.xlib.XFree)(version as *mut c_void);
            present
        }
    }

    fn atom_name(&self, atom: xlib::Atom) -> String {
        if atom == 0 {
            return String::new();
        }
        let trap = ErrorTrap::new(self);
        let name_ptr = unsafe { (self.xlib.XGetAtomName)(self.display, atom) };
        trap.finish();
        if name_ptr.is_null() {
            return String::new();
        }
        let name = unsafe { CStr::from_ptr(name_ptr) }.to_string_lossy().into_owned();
        unsafe { (self.xlib.XFree)(name_ptr as *mut c_void) };
        name
    }

    fn float_atom(&self) -> Option<Atom> {
        self.resolve_atom("FLOAT")
    }

    /// Read the enabled flag from the server-side property; devices without
    /// it (pre-XI2 servers) count as enabled.
    fn device_enabled_flag(&self, id: DeviceId) -> bool {
        let Some(prop) = self.resolve_atom(props::DEVICE_ENABLED) else {
            return true;
        };
        match self.get_property(id, prop) {
            Ok(Some(PropertyData::U8(data))) => data.first().map(|v| *v != 0).unwrap_or(true),
            _ => true,
        }
    }

    /// Decode a fetched property into one of the layouts the codec handles.
    ///
    /// Format-32 data arrives from Xlib as an array of C longs; FLOAT
    /// properties carry the IEEE bits in the low 32 of each item.
    unsafe fn decode_property(
        &self,
        actual_type: xlib::Atom,
        actual_format: c_int,
        nitems: usize,
        data: *const c_uchar,
    ) -> Option<PropertyData> {
        if actual_type == xlib::XA_INTEGER && actual_format == 8 {
            let bytes = std::slice::from_raw_parts(data, nitems);
            return Some(PropertyData::U8(bytes.to_vec()));
        }
        if actual_type == xlib::XA_INTEGER && actual_format == 32 {
            let longs = std::slice::from_raw_parts(data as *const c_long, nitems);
            return Some(PropertyData::I32(longs.iter().map(|v| *v as i32).collect()));
        }
        if Some(actual_type) == self.float_atom() && actual_format == 32 {
            let longs = std::slice::from_raw_parts(data as *const c_long, nitems);
            return Some(PropertyData::F32(
                longs.iter().map(|v| f32::from_bits(*v as u32)).collect(),
            ));
        }
        None
    }
}

impl Drop for XInputBackend {
    fn drop(&mut self) {
        unsafe {
            (self.xlib.XCloseDisplay)(self.display);
        }
    }
}

impl Backend for XInputBackend {
    fn devices(&self) -> Vec<DeviceInfo> {
        let mut out = Vec::new();

        let trap = ErrorTrap::new(self);
        let mut count: c_int = 0;
        let list = unsafe { (self.xinput.XListInputDevices)(self.display, &mut count) };
        let errors = trap.finish();
        if errors > 0 || list.is_null() {
            return out;
        }

        for i in 0..count as isize {
            let info: &XDeviceInfo = unsafe { &*list.offset(i) };
            if info.use_ != IS_X_EXTENSION_POINTER {
                continue;
            }

            let name = if info.name.is_null() {
                String::new()
            } else {
                unsafe { CStr::from_ptr(info.name) }.to_string_lossy().into_owned()
            };
            let type_name = self.atom_name(info.type_);

            out.push(DeviceInfo {
                id: info.id as DeviceId,
                name,
                source: source_from_type(&type_name),
                type_name,
                num_buttons: unsafe { button_count(info) },
                enabled: true,
            });
        }

        unsafe { (self.xinput.XFreeDeviceList)(list) };

        for device in &mut out {
            device.enabled = self.device_enabled_flag(device.id);
        }

        out
    }

    fn resolve_atom(&self, name: &str) -> Option<Atom> {
        let cname = CString::new(name).ok()?;
        let atom =
            unsafe { (self.xlib.XInternAtom)(self.display, cname.as_ptr(), xlib::True) };
        if atom == 0 {
            None
        } else {
            Some(atom as Atom)
        }
    }

    fn get_property(
        &self,
        device: DeviceId,
        prop: Atom,
    ) -> Result<Option<PropertyData>, BackendError> {
        let dev = OpenDevice::open(self, device)?;

        // fetch the whole value, growing the request until nothing is left
        let mut length: c_long = 2;
        loop {
            let trap = ErrorTrap::new(self);
            let mut actual_type: xlib::Atom = 0;
            let mut actual_format: c_int = 0;
            let mut nitems: c_ulong = 0;
            let mut bytes_after: c_ulong = 0;
            let mut data: *mut c_uchar = ptr::null_mut();

            let rc = unsafe {
                (self.xinput.XGetDeviceProperty)(
                    self.display,
                    dev.raw,
                    prop as c_ulong,
                    0,
                    length,
                    xlib::False,
                    xlib::AnyPropertyType as c_ulong,
                    &mut actual_type,
                    &mut actual_format,
                    &mut nitems,
                    &mut bytes_after,
                    &mut data,
                )
            };
            let errors = trap.finish();

            let free_data = |data: *mut c_uchar| {
                if !data.is_null() {
                    unsafe { (self.xlib.XFree)(data as *mut c_void) };
                }
            };

            if errors > 0 {
                free_data(data);
                return Err(BackendError::Rejected { errors });
            }
            if rc != 0 || actual_type == 0 {
                free_data(data);
                return Ok(None);
            }
            if bytes_after > 0 {
                free_data(data);
                length += (bytes_after as c_long + 3) / 4;
                continue;
            }

            let decoded = unsafe {
                self.decode_property(actual_type, actual_format, nitems as usize, data)
            };
            free_data(data);
            return Ok(decoded);
        }
    }

    fn change_property(
        &self,
        device: DeviceId,
        prop: Atom,
        value: &PropertyData,
    ) -> Result<(), BackendError> {
        let dev = OpenDevice::open(self, device)?;

        let float_atom = if matches!(value, PropertyData::F32(_)) {
            // only present when the libinput driver already interned it
            match self.float_atom() {
                Some(atom) => Some(atom),
                None => return Ok(()),
            }
        } else {
            None
        };

        let trap = ErrorTrap::new(self);
        unsafe {
            match value {
                PropertyData::U8(bytes) => {
                    (self.xinput.XChangeDeviceProperty)(
                        self.display,
                        dev.raw,
                        prop as c_ulong,
                        xlib::XA_INTEGER,
                        8,
                        xlib::PropModeReplace,
                        bytes.as_ptr(),
                        bytes.len() as c_int,
                    );
                }
                PropertyData::I32(items) => {
                    let longs: Vec<c_long> = items.iter().map(|v| *v as c_long).collect();
                    (self.xinput.XChangeDeviceProperty)(
                        self.display,
                        dev.raw,
                        prop as c_ulong,
                        xlib::XA_INTEGER,
                        32,
                        xlib::PropModeReplace,
                        longs.as_ptr() as *const c_uchar,
                        items.len() as c_int,
                    );
                }
                PropertyData::F32(items) => {
                    let longs: Vec<c_long> =
                        items.iter().map(|v| v.to_bits() as c_long).collect();
                    (self.xinput.XChangeDeviceProperty)(
                        self.display,
                        dev.raw,
                        prop as c_ulong,
                        float_atom.unwrap() as c_ulong,
                        32,
                        xlib::PropModeReplace,
                        longs.as_ptr() as *const c_uchar,
                        items.len() as c_int,
                    );
                }
            }
        }
        let errors = trap.finish();

        if errors > 0 {
            Err(BackendError::Rejected { errors })
        } else {
            Ok(())
        }
    }

    fn get_button_mapping(
        &self,
        device: DeviceId,
        map: &mut [u8],
    ) -> Result<usize, BackendError> {
        let dev = OpenDevice::open(self, device)?;

        let trap = ErrorTrap::new(self);
        let reported = unsafe {
            (self.xinput.XGetDeviceButtonMapping)(
                self.display,
                dev.raw,
                map.as_mut_ptr(),
                map.len() as c_uint,
            )
        };
        let errors = trap.finish();

        if errors > 0 {
            Err(BackendError::Rejected { errors })
        } else {
            Ok(reported.max(0) as usize)
        }
    }

    fn set_button_mapping(&self, device: DeviceId, map: &[u8]) -> Result<(), BackendError> {
        let dev = OpenDevice::open(self, device)?;

        let mut buf = map.to_vec();
        let trap = ErrorTrap::new(self);
        unsafe {
            (self.xinput.XSetDeviceButtonMapping)(
                self.display,
                dev.raw,
                buf.as_mut_ptr(),
                buf.len() as c_int,
            );
        }
        let errors = trap.finish();

        if errors > 0 {
            Err(BackendError::Rejected { errors })
        } else {
            Ok(())
        }
    }

    fn pointer_feedbacks(&self, device: DeviceId) -> Result<Vec<PtrFeedback>, BackendError> {
        let dev = OpenDevice::open(self, device)?;

        let trap = ErrorTrap::new(self);
        let mut count: c_int = 0;
        let states = unsafe { (self.xinput.XGetFeedbackControl)(self.display, dev.raw, &mut count) };
        let errors = trap.finish();

        if errors > 0 {
            return Err(BackendError::Rejected { errors });
        }
        if states.is_null() {
            return Ok(Vec::new());
        }

        let mut out = Vec::new();
        unsafe {
            let mut cursor = states as *const u8;
            for _ in 0..count {
                let state = &*(cursor as *const XFeedbackState);
                if state.class == PTR_FEEDBACK_CLASS {
                    let ptr_state = &*(cursor as *const XPtrFeedbackState);
                    out.push(PtrFeedback {
                        id: ptr_state.id as u64,
                        accel_num: ptr_state.accel_num,
                        accel_denom: ptr_state.accel_denom,
                        threshold: ptr_state.threshold,
                    });
                }
                cursor = cursor.add(state.length as usize);
            }
            (self.xinput.XFreeFeedbackList)(states);
        }

        Ok(out)
    }

    fn change_pointer_feedback(
        &self,
        device: DeviceId,
        feedback: &PtrFeedback,
    ) -> Result<(), BackendError> {
        let dev = OpenDevice::open(self, device)?;

        let mut control = XPtrFeedbackControl {
            class: PTR_FEEDBACK_CLASS,
            length: std::mem::size_of::<XPtrFeedbackControl>() as c_int,
            id: feedback.id as c_ulong,
            accel_num: feedback.accel_num,
            accel_denom: feedback.accel_denom,
            threshold: feedback.threshold,
        };

        let trap = ErrorTrap::new(self);
        unsafe {
            (self.xinput.XChangeFeedbackControl)(
                self.display,
                dev.raw,
                DV_ACCEL_NUM | DV_ACCEL_DENOM | DV_THRESHOLD,
                &mut control as *mut XPtrFeedbackControl as *mut XFeedbackControl,
            );
        }
        let errors = trap.finish();

        if errors > 0 {
            Err(BackendError::Rejected { errors })
        } else {
            Ok(())
        }
    }

    fn set_device_enabled(&self, device: DeviceId, enabled: bool) -> Result<(), BackendError> {
        let Some(prop) = self.resolve_atom(props::DEVICE_ENABLED) else {
            return Ok(());
        };
        debug!("setting Device Enabled to {} on device {}", enabled as u8, device);
        match self.get_property(device, prop)? {
            Some(PropertyData::U8(mut data)) if !data.is_empty() => {
                data[0] = enabled as u8;
                self.change_property(device, prop, &PropertyData::U8(data))
            }
            _ => Ok(()),
        }
    }
}

/// Per-operation device handle; closed on drop, with a trap around the close
/// so a vanished device cannot take the process down.
struct OpenDevice<'a> {
    backend: &'a XInputBackend,
    raw: *mut XDevice,
}

impl<'a> OpenDevice<'a> {
    fn open(backend: &'a XInputBackend, id: DeviceId) -> Result<Self, BackendError> {
        let trap = ErrorTrap::new(backend);
        let raw = unsafe { (backend.xinput.XOpenDevice)(backend.display, id as c_ulong) };
        let errors = trap.finish();
        if errors > 0 || raw.is_null() {
            return Err(BackendError::DeviceGone(id));
        }
        Ok(Self { backend, raw })
    }
}

impl Drop for OpenDevice<'_> {
    fn drop(&mut self) {
        let trap = ErrorTrap::new(self.backend);
        unsafe {
            (self.backend.xinput.XCloseDevice)(self.backend.display, self.raw);
        }
        trap.finish();
    }
}

static TRAP_ERRORS: AtomicU32 = AtomicU32::new(0);

unsafe extern "C" fn count_error(_display: *mut Display, _event: *mut XErrorEvent) -> c_int {
    TRAP_ERRORS.fetch_add(1, Ordering::SeqCst);
    0
}

/// Scoped X error trap: armed on construction, disarmed (sync + restore the
/// previous handler + collect the error count) on `finish` or drop, so every
/// exit path accounts for its own errors. All property traffic happens on
/// the one control thread, so traps never overlap.
struct ErrorTrap<'a> {
    backend: &'a XInputBackend,
    previous: XErrorHandler,
    armed: bool,
}

impl<'a> ErrorTrap<'a> {
    fn new(backend: &'a XInputBackend) -> Self {
        TRAP_ERRORS.store(0, Ordering::SeqCst);
        let previous = unsafe { (backend.xlib.XSetErrorHandler)(Some(count_error)) };
        Self {
            backend,
            previous,
            armed: true,
        }
    }

    fn finish(mut self) -> u32 {
        self.disarm()
    }

    fn disarm(&mut self) -> u32 {
        if !self.armed {
            return 0;
        }
        self.armed = false;
        unsafe {
            (self.backend.xlib.XSync)(self.backend.display, xlib::False);
            (self.backend.xlib.XSetErrorHandler)(self.previous);
        }
        TRAP_ERRORS.swap(0, Ordering::SeqCst)
    }
}

impl Drop for ErrorTrap<'_> {
    fn drop(&mut self) {
        self.disarm();
    }
}

/// Map an XI type atom name to a device source. Trackballs fold into mice
/// (everything but wheel emulation treats them identically).
fn source_from_type(type_name: &str) -> DeviceSource {
    match type_name {
        "MOUSE" | "TRACKBALL" => DeviceSource::Mouse,
        "TOUCHPAD" => DeviceSource::Touchpad,
        "TOUCHSCREEN" => DeviceSource::Touchscreen,
        "CURSOR" => DeviceSource::Cursor,
        "KEYBOARD" => DeviceSource::Keyboard,
        _ => DeviceSource::Other,
    }
}

/// Walk the legacy input class list for a ButtonClass record.
unsafe fn button_count(info: &XDeviceInfo) -> u16 {
    let mut cursor = info.inputclassinfo as *const u8;
    if cursor.is_null() {
        return 0;
    }
    for _ in 0..info.num_classes {
        let any = &*(cursor as *const XAnyClassInfo);
        if any.class == BUTTON_CLASS {
            let button = &*(cursor as *const XButtonInfo);
            return button.num_buttons.max(0) as u16;
        }
        cursor = cursor.add(any.length as usize);
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_from_type() {
        assert_eq!(source_from_type("MOUSE"), DeviceSource::Mouse);
        assert_eq!(source_from_type("TRACKBALL"), DeviceSource::Mouse);
        assert_eq!(source_from_type("TOUCHPAD"), DeviceSource::Touchpad);
        assert_eq!(source_from_type("TOUCHSCREEN"), DeviceSource::Touchscreen);
        assert_eq!(source_from_type("CURSOR"), DeviceSource::Cursor);
        assert_eq!(source_from_type("KEYBOARD"), DeviceSource::Keyboard);
        assert_eq!(source_from_type("STYLUS"), DeviceSource::Other);
        assert_eq!(source_from_type(""), DeviceSource::Other);
    }

    #[test]
    fn test_feedback_masks_are_distinct() {
        assert_eq!(DV_ACCEL_NUM | DV_ACCEL_DENOM | DV_THRESHOLD, 0b111);
    }

    #[test]
    fn test_float_bits_roundtrip() {
        // the FLOAT property carries IEEE bits in the 32-bit items
        for v in [-1.0f32, -0.25, 0.0, 0.5, 1.0] {
            let as_long = v.to_bits() as c_long;
            assert_eq!(f32::from_bits(as_long as u32), v);
        }
    }
}
