//! XInput property names for the supported driver families.
//!
//! Property names resolve to atoms per call and only if the owning driver
//! module is loaded; an unresolvable name is the normal "feature absent"
//! signal, not an error.

// libinput driver properties
pub const LIBINPUT_LEFT_HANDED: &str = "libinput Left Handed Enabled";
pub const LIBINPUT_ACCEL_SPEED: &str = "libinput Accel Speed";
pub const LIBINPUT_TAPPING: &str = "libinput Tapping Enabled";
pub const LIBINPUT_CLICK_METHOD: &str = "libinput Click Method Enabled";
pub const LIBINPUT_CLICK_METHOD_DEFAULT: &str = "libinput Click Method Enabled Default";
pub const LIBINPUT_SCROLL_METHOD: &str = "libinput Scroll Method Enabled";
pub const LIBINPUT_SCROLL_METHOD_DEFAULT: &str = "libinput Scroll Method Enabled Default";
pub const LIBINPUT_NATURAL_SCROLL: &str = "libinput Natural Scrolling Enabled";
pub const LIBINPUT_MIDDLE_EMULATION: &str = "libinput Middle Emulation Enabled";
pub const LIBINPUT_DISABLE_WHILE_TYPING: &str = "libinput Disable While Typing Enabled";
pub const LIBINPUT_SEND_EVENTS_AVAILABLE: &str = "libinput Send Events Modes Available";
pub const LIBINPUT_SEND_EVENTS_ENABLED: &str = "libinput Send Events Mode Enabled";

/// Some libinput versions ship this property without the second T in
/// "Horizontal"; both spellings must be probed, typo first.
pub const LIBINPUT_HORIZ_SCROLL_TYPO: &str = "libinput Horizonal Scroll Enabled";
pub const LIBINPUT_HORIZ_SCROLL: &str = "libinput Horizontal Scroll Enabled";

// Synaptics driver properties
pub const SYNAPTICS_OFF: &str = "Synaptics Off";
pub const SYNAPTICS_CAPABILITIES: &str = "Synaptics Capabilities";
pub const SYNAPTICS_TAP_ACTION: &str = "Synaptics Tap Action";
pub const SYNAPTICS_CLICK_ACTION: &str = "Synaptics Click Action";
pub const SYNAPTICS_EDGE_SCROLLING: &str = "Synaptics Edge Scrolling";
pub const SYNAPTICS_TWO_FINGER_SCROLLING: &str = "Synaptics Two-Finger Scrolling";
pub const SYNAPTICS_SCROLLING_DISTANCE: &str = "Synaptics Scrolling Distance";

// evdev driver properties
pub const EVDEV_MIDDLE_BUTTON_EMULATION: &str = "Evdev Middle Button Emulation";
pub const EVDEV_WHEEL_EMULATION: &str = "Evdev Wheel Emulation";
pub const EVDEV_WHEEL_EMULATION_BUTTON: &str = "Evdev Wheel Emulation Button";

/// Server-side property backing the device enable/disable call.
pub const DEVICE_ENABLED: &str = "Device Enabled";

/// XI device type atom name carried by trackballs.
pub const TRACKBALL_TYPE: &str = "TRACKBALL";

/// The virtual test pointer owned by the X server itself; never configured.
pub const XTEST_POINTER_NAME: &str = "Virtual core XTEST pointer";
