//! Setting-to-property mappers
//!
//! One mapper per logical setting. Each applies every driver variant whose
//! property name resolves: on systems running both the legacy and the
//! libinput driver the same setting is written through both encodings, which
//! is deliberate. Handedness and acceleration are the exception: they prefer
//! the libinput property when the device exposes it, matching driver
//! behavior where the legacy path would fight the modern one.

use tracing::{debug, warn};

use crate::backend::{Backend, DeviceId, DeviceInfo};
use crate::codec;
use crate::probe;
use crate::props;
use crate::settings::{ClickpadClick, ScrollMethod, Settings};

// ============================================================================
// Pure payload math
// ============================================================================

/// Swap the button map so physical button 1 maps to the configured side.
///
/// Only acts when the current map has physical button 1 assigned to either
/// the left or the right logical button; any other permutation is left alone
/// rather than corrupted further. Applying this twice with opposite
/// handedness restores the original map.
pub fn configure_button_layout(buttons: &mut [u8], left_handed: bool) {
    const LEFT_BUTTON: u8 = 1;

    if buttons.is_empty() {
        return;
    }

    // buttons above 2 are scroll wheel directions or extras; the physical
    // right button is at most logical button 3
    let right_button = buttons.len().min(3) as u8;

    let current = buttons[LEFT_BUTTON as usize - 1];
    if current != LEFT_BUTTON && current != right_button {
        // unexpected permutation, swapping would corrupt it
        return;
    }

    if left_handed && current == LEFT_BUTTON {
        if let Some(slot) = buttons.iter_mut().find(|b| **b == right_button) {
            *slot = LEFT_BUTTON;
        }
        buttons[LEFT_BUTTON as usize - 1] = right_button;
    } else if !left_handed && current == right_button {
        if let Some(slot) = buttons.iter_mut().find(|b| **b == LEFT_BUTTON) {
            *slot = right_button;
        }
        buttons[LEFT_BUTTON as usize - 1] = LEFT_BUTTON;
    }
}

/// Legacy acceleration encoding: a rational approximated to the nearest 1/2
/// for values >= 1.0 (banding by fractional quarter), to the nearest 1/10
/// below 1.0. `(-1, -1)` encodes "unset".
pub fn legacy_accel(motion_acceleration: f64, custom: bool) -> (i32, i32) {
    if !custom {
        return (-1, -1);
    }

    if motion_acceleration >= 1.0 {
        let fraction = motion_acceleration - motion_acceleration.floor();
        if fraction < 0.25 {
            (motion_acceleration.floor() as i32, 1)
        } else if fraction < 0.5 {
            ((2.0 * motion_acceleration).ceil() as i32, 2)
        } else if fraction < 0.75 {
            ((2.0 * motion_acceleration).floor() as i32, 2)
        } else {
            (motion_acceleration.ceil() as i32, 1)
        }
    } else if motion_acceleration > 0.0 {
        ((motion_acceleration * 10.0).floor() as i32 + 1, 10)
    } else {
        (-1, -1)
    }
}

/// Modern acceleration encoding: linear remap of the 1.0-10.0 panel range
/// onto libinput's -1.0..1.0 speed. 0.0 encodes "unset".
pub fn libinput_accel(motion_acceleration: f64, custom: bool) -> f32 {
    if motion_acceleration == -1.0 || !custom {
        0.0
    } else {
        ((motion_acceleration - 1.0) * 2.0 / 9.0 - 1.0) as f32
    }
}

fn motion_config(settings: &Settings, touchpad: bool) -> (f64, bool, i32, bool) {
    if touchpad {
        (
            settings.touchpad.motion_acceleration,
            settings.touchpad.custom_acceleration,
            settings.touchpad.motion_threshold,
            settings.touchpad.custom_threshold,
        )
    } else {
        (
            settings.mouse.motion_acceleration,
            settings.mouse.custom_acceleration,
            settings.mouse.motion_threshold,
            settings.mouse.custom_threshold,
        )
    }
}

/// Write an 8-bit boolean only when the device is a touchpad.
fn touchpad_write_bool(
    backend: &dyn Backend,
    device: &DeviceInfo,
    prop_name: &str,
    index: usize,
    value: bool,
) {
    if probe::is_touchpad(backend, device) {
        codec::write_bool(backend, device, prop_name, index, value);
    }
}

fn touchpad_read_bool(
    backend: &dyn Backend,
    device: &DeviceInfo,
    prop_name: &str,
    index: usize,
) -> bool {
    probe::is_touchpad(backend, device) && codec::read_bool(backend, device, prop_name, index)
}

// ============================================================================
// Handedness
// ============================================================================

pub fn set_left_handed(
    backend: &dyn Backend,
    settings: &Settings,
    device: &DeviceInfo,
    mouse_left_handed: bool,
    touchpad_left_handed: bool,
) {
    if probe::supports(backend, device, props::LIBINPUT_LEFT_HANDED) {
        set_left_handed_libinput(backend, device, mouse_left_handed, touchpad_left_handed);
    } else {
        set_left_handed_legacy(backend, settings, device, mouse_left_handed, touchpad_left_handed);
    }
}

fn set_left_handed_libinput(
    backend: &dyn Backend,
    device: &DeviceInfo,
    mouse_left_handed: bool,
    touchpad_left_handed: bool,
) {
    let want_lefthanded = if probe::is_touchpad(backend, device) {
        touchpad_left_handed
    } else {
        mouse_left_handed
    };

    codec::write_bool(backend, device, props::LIBINPUT_LEFT_HANDED, 0, want_lefthanded);
}

fn set_left_handed_legacy(
    backend: &dyn Backend,
    settings: &Settings,
    device: &DeviceInfo,
    mouse_left_handed: bool,
    touchpad_left_handed: bool,
) {
    if !probe::has_buttons(device) {
        return;
    }

    debug!("setting handedness on {}", device.name);

    let left_handed;
    if probe::is_touchpad(backend, device) {
        // swap tap buttons around too, otherwise a tap would be a
        // right-click
        let tap = settings.touchpad.tap_to_click;
        let single_button = probe::touchpad_has_single_button(backend, device);

        left_handed = touchpad_left_handed;

        if tap && !single_button {
            set_tap_to_click(backend, device, tap, left_handed);
        }

        if single_button {
            return;
        }
    } else {
        left_handed = mouse_left_handed;
    }

    let Some(mut buttons) = codec::read_button_map(backend, device) else {
        return;
    };
    configure_button_layout(&mut buttons, left_handed);
    codec::write_button_map(backend, device, &buttons);
}

// ============================================================================
// Acceleration / threshold
// ============================================================================

pub fn set_motion(backend: &dyn Backend, settings: &Settings, device: &DeviceInfo) {
    if probe::supports(backend, device, props::LIBINPUT_ACCEL_SPEED) {
        set_motion_libinput(backend, settings, device);
    } else {
        set_motion_legacy(backend, settings, device);
    }
}

fn set_motion_legacy(backend: &dyn Backend, settings: &Settings, device: &DeviceInfo) {
    debug!("setting motion on {}", device.name);

    let (accel, custom, threshold, custom_threshold) =
        motion_config(settings, probe::is_touchpad(backend, device));

    let (numerator, denominator) = legacy_accel(accel, custom);
    let threshold = if custom_threshold { threshold } else { -1 };

    codec::write_pointer_feedback(backend, device, numerator, denominator, threshold);
}

fn set_motion_libinput(backend: &dyn Backend, settings: &Settings, device: &DeviceInfo) {
    debug!("setting motion on {}", device.name);

    let (accel, custom, _, _) = motion_config(settings, probe::is_touchpad(backend, device));

    codec::write_f32(
        backend,
        device,
        props::LIBINPUT_ACCEL_SPEED,
        libinput_accel(accel, custom),
    );
}

// ============================================================================
// Middle button emulation
// ============================================================================

pub fn set_middle_button(backend: &dyn Backend, device: &DeviceInfo, middle_button: bool) {
    if backend.resolve_atom(props::EVDEV_MIDDLE_BUTTON_EMULATION).is_some() {
        set_middle_button_evdev(backend, device, middle_button);
    }
    if backend.resolve_atom(props::LIBINPUT_MIDDLE_EMULATION).is_some() {
        set_middle_button_libinput(backend, device, middle_button);
    }
}

fn set_middle_button_evdev(backend: &dyn Backend, device: &DeviceInfo, middle_button: bool) {
    debug!("setting middle button on {}", device.name);
    codec::modify_u8(backend, device, props::EVDEV_MIDDLE_BUTTON_EMULATION, 1, |data| {
        data[0] = middle_button as u8;
    });
}

fn set_middle_button_libinput(backend: &dyn Backend, device: &DeviceInfo, middle_button: bool) {
    // synaptics never got this setting, so touchpads don't either
    if probe::is_touchpad(backend, device) {
        return;
    }
    debug!("setting middle button on {}", device.name);
    codec::write_bool(backend, device, props::LIBINPUT_MIDDLE_EMULATION, 0, middle_button);
}

// ============================================================================
// Tap to click
// ============================================================================

pub fn set_tap_to_click(backend: &dyn Backend, device: &DeviceInfo, state: bool, left_handed: bool) {
    if backend.resolve_atom(props::SYNAPTICS_TAP_ACTION).is_some() {
        set_tap_to_click_synaptics(backend, device, state, left_handed);
    }
    if backend.resolve_atom(props::LIBINPUT_TAPPING).is_some() {
        set_tap_to_click_libinput(backend, device, state);
    }
}

fn set_tap_to_click_synaptics(
    backend: &dyn Backend,
    device: &DeviceInfo,
    state: bool,
    left_handed: bool,
) {
    if !probe::is_touchpad(backend, device) {
        return;
    }

    debug!("setting tap to click on {}", device.name);

    codec::modify_u8(backend, device, props::SYNAPTICS_TAP_ACTION, 7, |data| {
        // MR mapping for corner tapping on the right side
        data[0] = if state { 2 } else { 0 };
        data[1] = if state { 3 } else { 0 };

        // RLM mapping for 1/2/3 fingers
        data[4] = match (state, left_handed) {
            (false, _) => 0,
            (true, false) => 1,
            (true, true) => 3,
        };
        data[5] = match (state, left_handed) {
            (false, _) => 0,
            (true, false) => 3,
            (true, true) => 1,
        };
        data[6] = if state { 2 } else { 0 };
    });
}

fn set_tap_to_click_libinput(backend: &dyn Backend, device: &DeviceInfo, state: bool) {
    debug!("setting tap to click on {}", device.name);
    touchpad_write_bool(backend, device, props::LIBINPUT_TAPPING, 0, state);
}

// ============================================================================
// Clickpad click actions
// ============================================================================

pub fn set_click_actions(
    backend: &dyn Backend,
    device: &DeviceInfo,
    clickpad_click: ClickpadClick,
    left_handed: bool,
) {
    if backend.resolve_atom(props::SYNAPTICS_CLICK_ACTION).is_some() {
        set_click_actions_synaptics(backend, device, clickpad_click, left_handed);
    }
    if backend.resolve_atom(props::LIBINPUT_CLICK_METHOD).is_some() {
        set_click_actions_libinput(backend, device, clickpad_click);
    }
}

fn set_click_actions_synaptics(
    backend: &dyn Backend,
    device: &DeviceInfo,
    clickpad_click: ClickpadClick,
    left_handed: bool,
) {
    if !probe::is_touchpad(backend, device) {
        return;
    }

    debug!("setting click actions on {}", device.name);

    let fingers = matches!(
        clickpad_click,
        ClickpadClick::Fingers | ClickpadClick::DriverDefault
    );
    codec::modify_u8(backend, device, props::SYNAPTICS_CLICK_ACTION, 3, |data| {
        data[0] = 1;
        data[1] = match (fingers, left_handed) {
            (false, _) => 0,
            (true, false) => 3,
            (true, true) => 1,
        };
        data[2] = if fingers { 2 } else { 0 };
    });
}

fn set_click_actions_libinput(
    backend: &dyn Backend,
    device: &DeviceInfo,
    clickpad_click: ClickpadClick,
) {
    if !probe::is_touchpad(backend, device) {
        return;
    }

    debug!("setting click actions on {}", device.name);

    match clickpad_click {
        ClickpadClick::DriverDefault => {
            codec::modify_u8_with_default(
                backend,
                device,
                props::LIBINPUT_CLICK_METHOD,
                props::LIBINPUT_CLICK_METHOD_DEFAULT,
                2,
                |data, default| {
                    data[0] = default.first().copied().unwrap_or(0);
                    data[1] = default.get(1).copied().unwrap_or(0);
                },
            );
        }
        _ => {
            codec::modify_u8(backend, device, props::LIBINPUT_CLICK_METHOD, 2, |data| {
                data[0] = (clickpad_click == ClickpadClick::ButtonAreas) as u8;
                data[1] = (clickpad_click == ClickpadClick::Fingers) as u8;
            });
        }
    }
}

// ============================================================================
// Scrolling
// ============================================================================

pub fn set_scrolling(
    backend: &dyn Backend,
    device: &DeviceInfo,
    method: ScrollMethod,
    horizontal_scroll: bool,
) {
    if backend.resolve_atom(props::SYNAPTICS_EDGE_SCROLLING).is_some() {
        set_scrolling_synaptics(backend, device, method, horizontal_scroll);
    }
    if backend.resolve_atom(props::LIBINPUT_SCROLL_METHOD).is_some() {
        set_scrolling_libinput(backend, device, method, horizontal_scroll);
    }
}

fn set_scrolling_synaptics(
    backend: &dyn Backend,
    device: &DeviceInfo,
    method: ScrollMethod,
    horizontal_scroll: bool,
) {
    let want_2fg = matches!(method, ScrollMethod::TwoFinger | ScrollMethod::DriverDefault);
    let want_edge = matches!(method, ScrollMethod::Edge | ScrollMethod::DriverDefault);

    touchpad_write_bool(backend, device, props::SYNAPTICS_EDGE_SCROLLING, 0, want_edge);
    touchpad_write_bool(
        backend,
        device,
        props::SYNAPTICS_EDGE_SCROLLING,
        1,
        want_edge && horizontal_scroll,
    );
    touchpad_write_bool(backend, device, props::SYNAPTICS_TWO_FINGER_SCROLLING, 0, want_2fg);
    touchpad_write_bool(
        backend,
        device,
        props::SYNAPTICS_TWO_FINGER_SCROLLING,
        1,
        want_2fg && horizontal_scroll,
    );
}

fn set_scrolling_libinput(
    backend: &dyn Backend,
    device: &DeviceInfo,
    method: ScrollMethod,
    horizontal_scroll: bool,
) {
    if !probe::is_touchpad(backend, device) {
        return;
    }

    debug!("setting scroll method on {}", device.name);

    match method {
        ScrollMethod::DriverDefault => {
            codec::modify_u8_with_default(
                backend,
                device,
                props::LIBINPUT_SCROLL_METHOD,
                props::LIBINPUT_SCROLL_METHOD_DEFAULT,
                3,
                |data, default| {
                    data[0] = default.first().copied().unwrap_or(0);
                    data[1] = default.get(1).copied().unwrap_or(0);
                    data[2] = default.get(2).copied().unwrap_or(0);
                },
            );
        }
        _ => {
            codec::modify_u8(backend, device, props::LIBINPUT_SCROLL_METHOD, 3, |data| {
                data[0] = (method == ScrollMethod::TwoFinger) as u8;
                data[1] = (method == ScrollMethod::Edge) as u8;
                data[2] = 0;
            });
        }
    }

    // some driver versions spell this property without the second T
    if backend.resolve_atom(props::LIBINPUT_HORIZ_SCROLL_TYPO).is_some() {
        touchpad_write_bool(
            backend,
            device,
            props::LIBINPUT_HORIZ_SCROLL_TYPO,
            0,
            horizontal_scroll,
        );
    } else {
        touchpad_write_bool(backend, device, props::LIBINPUT_HORIZ_SCROLL, 0, horizontal_scroll);
    }
}

// ============================================================================
// Natural scrolling
// ============================================================================

pub fn set_natural_scroll(backend: &dyn Backend, device: &DeviceInfo, natural_scroll: bool) {
    if backend.resolve_atom(props::SYNAPTICS_SCROLLING_DISTANCE).is_some() {
        set_natural_scroll_synaptics(backend, device, natural_scroll);
    }
    if backend.resolve_atom(props::LIBINPUT_NATURAL_SCROLL).is_some() {
        set_natural_scroll_libinput(backend, device, natural_scroll);
    }
}

fn set_natural_scroll_synaptics(backend: &dyn Backend, device: &DeviceInfo, natural_scroll: bool) {
    if !probe::is_touchpad(backend, device) {
        return;
    }

    debug!(
        "Trying to set {} for \"{}\"",
        if natural_scroll { "natural (reverse) scroll" } else { "normal scroll" },
        device.name
    );

    codec::modify_i32(backend, device, props::SYNAPTICS_SCROLLING_DISTANCE, 2, |distance| {
        if natural_scroll {
            distance[0] = -distance[0].abs();
            distance[1] = -distance[1].abs();
        } else {
            distance[0] = distance[0].abs();
            distance[1] = distance[1].abs();
        }
    });
}

fn set_natural_scroll_libinput(backend: &dyn Backend, device: &DeviceInfo, natural_scroll: bool) {
    debug!(
        "Trying to set {} for \"{}\"",
        if natural_scroll { "natural (reverse) scroll" } else { "normal scroll" },
        device.name
    );

    codec::write_bool(backend, device, props::LIBINPUT_NATURAL_SCROLL, 0, natural_scroll);
}

// ============================================================================
// Wheel emulation (trackballs)
// ============================================================================

pub fn set_scroll_wheel_button(backend: &dyn Backend, device: &DeviceInfo, button: i32) {
    if !probe::is_trackball(device) {
        return;
    }
    if backend.resolve_atom(props::EVDEV_WHEEL_EMULATION).is_none()
        || backend.resolve_atom(props::EVDEV_WHEEL_EMULATION_BUTTON).is_none()
    {
        return;
    }

    debug!("setting scroll wheel emulation on {}", device.name);

    codec::modify_u8(backend, device, props::EVDEV_WHEEL_EMULATION, 1, |data| {
        data[0] = (button > 0) as u8;
    });

    if button > 0 {
        codec::modify_u8(backend, device, props::EVDEV_WHEEL_EMULATION_BUTTON, 1, |data| {
            data[0] = button as u8;
        });
    }
}

// ============================================================================
// Touchpad enable/disable
// ============================================================================

pub fn set_touchpad_disabled(backend: &dyn Backend, device: &DeviceInfo) {
    debug!("Trying to set device disabled for \"{}\" ({})", device.name, device.id);

    if !probe::is_touchpad(backend, device) {
        return;
    }

    match backend.set_device_enabled(device.id, false) {
        Ok(()) => debug!("Disabled device \"{}\" ({})", device.name, device.id),
        Err(e) => warn!("Error disabling device \"{}\" ({}): {}", device.name, device.id, e),
    }
}

pub fn set_touchpad_enabled(backend: &dyn Backend, id: DeviceId) {
    debug!("Trying to set device enabled for {}", id);

    let Some(device) = backend.device(id) else {
        return;
    };
    if !probe::is_touchpad(backend, &device) {
        return;
    }

    match backend.set_device_enabled(id, true) {
        Ok(()) => debug!("Enabled device {}", id),
        Err(e) => warn!("Error enabling device \"{}\": {}", id, e),
    }
}

// ============================================================================
// Typing / external-mouse suppression (driver side)
// ============================================================================

pub fn set_disable_while_typing(backend: &dyn Backend, device: &DeviceInfo, state: bool) {
    touchpad_write_bool(backend, device, props::LIBINPUT_DISABLE_WHILE_TYPING, 0, state);
}

/// Suppress the touchpad while an external mouse is attached, where the
/// driver advertises the send-events mode for it.
pub fn set_send_events_disabled(backend: &dyn Backend, device: &DeviceInfo, state: bool) {
    if touchpad_read_bool(backend, device, props::LIBINPUT_SEND_EVENTS_AVAILABLE, 1) {
        touchpad_write_bool(backend, device, props::LIBINPUT_SEND_EVENTS_ENABLED, 1, state);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::{device_info, MockBackend};
    use crate::backend::{DeviceSource, PropertyData, PtrFeedback};

    fn add_mouse(backend: &MockBackend, id: u64) -> DeviceInfo {
        let info = device_info(id, "Test Mouse", DeviceSource::Mouse);
        backend.add_device(info.clone());
        info
    }

    fn add_touchpad(backend: &MockBackend, id: u64) -> DeviceInfo {
        let info = device_info(id, "Test Touchpad", DeviceSource::Touchpad);
        backend.add_device(info.clone());
        info
    }

    // ------------------------------------------------------------------
    // Button layout
    // ------------------------------------------------------------------

    #[test]
    fn test_button_layout_swaps_for_left_handed() {
        let mut map = [1u8, 2, 3];
        configure_button_layout(&mut map, true);
        assert_eq!(map, [3, 2, 1]);
    }

    #[test]
    fn test_button_layout_involution() {
        for original in [vec![1u8, 2, 3], vec![1u8, 2, 3, 4, 5, 6, 7], vec![3u8, 2, 1]] {
            let mut map = original.clone();
            configure_button_layout(&mut map, true);
            configure_button_layout(&mut map, false);
            // back to a right-handed layout regardless of start
            assert_eq!(map[0], 1);

            let mut map = original.clone();
            let left_handed = original[0] != 1;
            configure_button_layout(&mut map, left_handed);
            assert_eq!(map, original, "same-handedness apply must be identity");
        }
    }

    #[test]
    fn test_button_layout_refuses_weird_map() {
        // physical button 1 mapped to neither left nor right
        let mut map = [2u8, 1, 3];
        let original = map;
        configure_button_layout(&mut map, true);
        assert_eq!(map, original);
    }

    #[test]
    fn test_button_layout_two_buttons() {
        let mut map = [1u8, 2];
        configure_button_layout(&mut map, true);
        assert_eq!(map, [2, 1]);
        configure_button_layout(&mut map, false);
        assert_eq!(map, [1, 2]);
    }

    // ------------------------------------------------------------------
    // Acceleration math
    // ------------------------------------------------------------------

    #[test]
    fn test_libinput_accel_endpoints_and_monotonic() {
        assert_eq!(libinput_accel(1.0, true), -1.0);
        assert_eq!(libinput_accel(10.0, true), 1.0);

        let mut last = f32::MIN;
        let mut v = 1.0f64;
        while v <= 10.0 {
            let mapped = libinput_accel(v, true);
            assert!(mapped > last, "mapping must be strictly increasing");
            assert!((-1.0..=1.0).contains(&mapped));
            last = mapped;
            v += 0.25;
        }
    }

    #[test]
    fn test_libinput_accel_unset() {
        assert_eq!(libinput_accel(-1.0, true), 0.0);
        assert_eq!(libinput_accel(5.0, false), 0.0);
    }

    #[test]
    fn test_libinput_accel_midpoint() {
        // 5.5 maps to the exact middle of the range
        let mapped = libinput_accel(5.5, true);
        assert!(mapped.abs() < 1e-6, "got {}", mapped);
    }

    #[test]
    fn test_legacy_accel_below_one_within_tenth() {
        let mut v = 0.05f64;
        while v < 1.0 {
            let (num, denom) = legacy_accel(v, true);
            let decoded = num as f64 / denom as f64;
            assert!(
                (decoded - v).abs() <= 0.05 + 1e-9,
                "{} decoded as {}/{} = {}",
                v,
                num,
                denom,
                decoded
            );
            v += 0.037;
        }
    }

    #[test]
    fn test_legacy_accel_bands() {
        assert_eq!(legacy_accel(2.0, true), (2, 1));
        assert_eq!(legacy_accel(2.1, true), (2, 1));
        // fraction in [0.25, 0.5) rounds up to the next half
        assert_eq!(legacy_accel(2.3, true), (5, 2));
        // fraction in [0.5, 0.75) rounds down to the half
        assert_eq!(legacy_accel(5.5, true), (11, 2));
        // fraction >= 0.75 rounds up to the next integer
        assert_eq!(legacy_accel(2.8, true), (3, 1));
    }

    #[test]
    fn test_legacy_accel_unset() {
        assert_eq!(legacy_accel(5.0, false), (-1, -1));
        assert_eq!(legacy_accel(-1.0, true), (-1, -1));
        assert_eq!(legacy_accel(0.0, true), (-1, -1));
    }

    // ------------------------------------------------------------------
    // Handedness mapper
    // ------------------------------------------------------------------

    #[test]
    fn test_left_handed_prefers_libinput() {
        let backend = MockBackend::new();
        let dev = add_mouse(&backend, 1);
        backend.set_prop(1, props::LIBINPUT_LEFT_HANDED, PropertyData::U8(vec![0]));

        set_left_handed(&backend, &Settings::default(), &dev, true, false);

        let writes = backend.writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].property, props::LIBINPUT_LEFT_HANDED);
        assert_eq!(writes[0].data, PropertyData::U8(vec![1]));
        // the legacy path must never have been touched
        assert_eq!(backend.button_map_reads(), 0);
        assert_eq!(backend.button_map_writes(), 0);
    }

    #[test]
    fn test_left_handed_legacy_swaps_map() {
        let backend = MockBackend::new();
        let dev = add_mouse(&backend, 1);
        backend.set_button_map(1, vec![1, 2, 3, 4, 5]);

        set_left_handed(&backend, &Settings::default(), &dev, true, false);
        assert_eq!(backend.button_map(1), vec![3, 2, 1, 4, 5]);

        set_left_handed(&backend, &Settings::default(), &dev, false, false);
        assert_eq!(backend.button_map(1), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_left_handed_legacy_needs_buttons() {
        let backend = MockBackend::new();
        let mut info = device_info(1, "Buttonless", DeviceSource::Mouse);
        info.num_buttons = 0;
        backend.add_device(info.clone());

        set_left_handed(&backend, &Settings::default(), &info, true, false);
        assert_eq!(backend.button_map_reads(), 0);
    }

    #[test]
    fn test_left_handed_single_button_touchpad_keeps_map() {
        let backend = MockBackend::new();
        let dev = add_touchpad(&backend, 1);
        backend.set_prop(1, props::SYNAPTICS_CAPABILITIES, PropertyData::U8(vec![1, 0, 0]));

        set_left_handed(&backend, &Settings::default(), &dev, false, true);
        assert_eq!(backend.button_map_reads(), 0);
        assert_eq!(backend.button_map_writes(), 0);
    }

    #[test]
    fn test_left_handed_touchpad_mirrors_tap_actions() {
        let backend = MockBackend::new();
        let dev = add_touchpad(&backend, 1);
        backend.set_prop(1, props::SYNAPTICS_TAP_ACTION, PropertyData::U8(vec![0; 7]));

        set_left_handed(&backend, &Settings::default(), &dev, false, true);

        assert_eq!(
            backend.prop(1, props::SYNAPTICS_TAP_ACTION),
            Some(PropertyData::U8(vec![2, 3, 0, 0, 3, 1, 2]))
        );
        // and the button map was swapped as well
        assert_eq!(backend.button_map(1), vec![3, 2, 1]);
    }

    // ------------------------------------------------------------------
    // Motion mapper
    // ------------------------------------------------------------------

    #[test]
    fn test_motion_libinput_path() {
        let backend = MockBackend::new();
        let dev = add_mouse(&backend, 1);
        backend.set_prop(1, props::LIBINPUT_ACCEL_SPEED, PropertyData::F32(vec![0.25]));

        let mut settings = Settings::default();
        settings.mouse.custom_acceleration = true;
        settings.mouse.motion_acceleration = 5.5;

        set_motion(&backend, &settings, &dev);

        match backend.prop(1, props::LIBINPUT_ACCEL_SPEED) {
            Some(PropertyData::F32(data)) => assert!(data[0].abs() < 1e-6),
            other => panic!("unexpected property state: {:?}", other),
        }
    }

    #[test]
    fn test_motion_legacy_path() {
        let backend = MockBackend::new();
        let dev = add_mouse(&backend, 1);
        backend.set_feedbacks(
            1,
            vec![PtrFeedback { id: 0, accel_num: 2, accel_denom: 1, threshold: 4 }],
        );

        let mut settings = Settings::default();
        settings.mouse.custom_acceleration = true;
        settings.mouse.motion_acceleration = 5.5;

        set_motion(&backend, &settings, &dev);

        // 5.5 lands in the "fraction 0.5" band: 11/2
        assert_eq!(
            backend.feedbacks(1)[0],
            PtrFeedback { id: 0, accel_num: 11, accel_denom: 2, threshold: -1 }
        );
    }

    #[test]
    fn test_motion_legacy_custom_threshold() {
        let backend = MockBackend::new();
        let dev = add_mouse(&backend, 1);
        backend.set_feedbacks(
            1,
            vec![PtrFeedback { id: 0, accel_num: -1, accel_denom: -1, threshold: -1 }],
        );

        let mut settings = Settings::default();
        settings.mouse.custom_threshold = true;
        settings.mouse.motion_threshold = 6;

        set_motion(&backend, &settings, &dev);
        assert_eq!(backend.feedbacks(1)[0].threshold, 6);
        assert_eq!(backend.feedbacks(1)[0].accel_num, -1);
    }

    // ------------------------------------------------------------------
    // Middle button
    // ------------------------------------------------------------------

    #[test]
    fn test_middle_button_both_drivers_fire() {
        let backend = MockBackend::new();
        let dev = add_mouse(&backend, 1);
        backend.set_prop(1, props::EVDEV_MIDDLE_BUTTON_EMULATION, PropertyData::U8(vec![0]));
        backend.set_prop(1, props::LIBINPUT_MIDDLE_EMULATION, PropertyData::U8(vec![0]));

        set_middle_button(&backend, &dev, true);

        assert_eq!(
            backend.prop(1, props::EVDEV_MIDDLE_BUTTON_EMULATION),
            Some(PropertyData::U8(vec![1]))
        );
        assert_eq!(
            backend.prop(1, props::LIBINPUT_MIDDLE_EMULATION),
            Some(PropertyData::U8(vec![1]))
        );
    }

    #[test]
    fn test_middle_button_libinput_skips_touchpads() {
        let backend = MockBackend::new();
        let dev = add_touchpad(&backend, 1);
        backend.set_prop(1, props::LIBINPUT_MIDDLE_EMULATION, PropertyData::U8(vec![0]));

        set_middle_button(&backend, &dev, true);
        assert_eq!(
            backend.prop(1, props::LIBINPUT_MIDDLE_EMULATION),
            Some(PropertyData::U8(vec![0]))
        );
    }

    // ------------------------------------------------------------------
    // Tap to click
    // ------------------------------------------------------------------

    #[test]
    fn test_tap_action_payload() {
        let backend = MockBackend::new();
        let dev = add_touchpad(&backend, 1);
        backend.set_prop(1, props::SYNAPTICS_TAP_ACTION, PropertyData::U8(vec![9; 7]));

        set_tap_to_click(&backend, &dev, true, false);
        assert_eq!(
            backend.prop(1, props::SYNAPTICS_TAP_ACTION),
            Some(PropertyData::U8(vec![2, 3, 9, 9, 1, 3, 2]))
        );

        set_tap_to_click(&backend, &dev, false, false);
        assert_eq!(
            backend.prop(1, props::SYNAPTICS_TAP_ACTION),
            Some(PropertyData::U8(vec![0, 0, 9, 9, 0, 0, 0]))
        );
    }

    #[test]
    fn test_tap_to_click_skips_non_touchpad() {
        let backend = MockBackend::new();
        let dev = add_mouse(&backend, 1);
        backend.set_prop(1, props::SYNAPTICS_TAP_ACTION, PropertyData::U8(vec![0; 7]));

        set_tap_to_click(&backend, &dev, true, false);
        assert_eq!(
            backend.prop(1, props::SYNAPTICS_TAP_ACTION),
            Some(PropertyData::U8(vec![0; 7]))
        );
    }

    // ------------------------------------------------------------------
    // Click actions
    // ------------------------------------------------------------------

    #[test]
    fn test_click_actions_libinput_modes() {
        let backend = MockBackend::new();
        let dev = add_touchpad(&backend, 1);
        backend.set_prop(1, props::LIBINPUT_CLICK_METHOD, PropertyData::U8(vec![0, 0]));

        set_click_actions(&backend, &dev, ClickpadClick::ButtonAreas, false);
        assert_eq!(
            backend.prop(1, props::LIBINPUT_CLICK_METHOD),
            Some(PropertyData::U8(vec![1, 0]))
        );

        set_click_actions(&backend, &dev, ClickpadClick::Fingers, false);
        assert_eq!(
            backend.prop(1, props::LIBINPUT_CLICK_METHOD),
            Some(PropertyData::U8(vec![0, 1]))
        );

        set_click_actions(&backend, &dev, ClickpadClick::Disabled, false);
        assert_eq!(
            backend.prop(1, props::LIBINPUT_CLICK_METHOD),
            Some(PropertyData::U8(vec![0, 0]))
        );
    }

    #[test]
    fn test_click_actions_driver_default_copies_mask() {
        let backend = MockBackend::new();
        let dev = add_touchpad(&backend, 1);
        backend.set_prop(1, props::LIBINPUT_CLICK_METHOD, PropertyData::U8(vec![1, 0]));
        backend.set_prop(1, props::LIBINPUT_CLICK_METHOD_DEFAULT, PropertyData::U8(vec![0, 1]));

        set_click_actions(&backend, &dev, ClickpadClick::DriverDefault, false);
        assert_eq!(
            backend.prop(1, props::LIBINPUT_CLICK_METHOD),
            Some(PropertyData::U8(vec![0, 1]))
        );
    }

    #[test]
    fn test_click_actions_synaptics_left_handed() {
        let backend = MockBackend::new();
        let dev = add_touchpad(&backend, 1);
        backend.set_prop(1, props::SYNAPTICS_CLICK_ACTION, PropertyData::U8(vec![0, 0, 0]));

        set_click_actions(&backend, &dev, ClickpadClick::Fingers, true);
        assert_eq!(
            backend.prop(1, props::SYNAPTICS_CLICK_ACTION),
            Some(PropertyData::U8(vec![1, 1, 2]))
        );
    }

    // ------------------------------------------------------------------
    // Scrolling
    // ------------------------------------------------------------------

    #[test]
    fn test_scrolling_synaptics_booleans() {
        let backend = MockBackend::new();
        let dev = add_touchpad(&backend, 1);
        backend.set_prop(1, props::SYNAPTICS_EDGE_SCROLLING, PropertyData::U8(vec![0, 0, 0]));
        backend.set_prop(1, props::SYNAPTICS_TWO_FINGER_SCROLLING, PropertyData::U8(vec![0, 0]));

        set_scrolling(&backend, &dev, ScrollMethod::Edge, true);
        assert_eq!(
            backend.prop(1, props::SYNAPTICS_EDGE_SCROLLING),
            Some(PropertyData::U8(vec![1, 1, 0]))
        );
        assert_eq!(
            backend.prop(1, props::SYNAPTICS_TWO_FINGER_SCROLLING),
            Some(PropertyData::U8(vec![0, 0]))
        );

        set_scrolling(&backend, &dev, ScrollMethod::TwoFinger, false);
        assert_eq!(
            backend.prop(1, props::SYNAPTICS_EDGE_SCROLLING),
            Some(PropertyData::U8(vec![0, 0, 0]))
        );
        assert_eq!(
            backend.prop(1, props::SYNAPTICS_TWO_FINGER_SCROLLING),
            Some(PropertyData::U8(vec![1, 0]))
        );
    }

    #[test]
    fn test_scrolling_libinput_mask() {
        let backend = MockBackend::new();
        let dev = add_touchpad(&backend, 1);
        backend.set_prop(1, props::LIBINPUT_SCROLL_METHOD, PropertyData::U8(vec![0, 0, 1]));
        backend.set_prop(1, props::LIBINPUT_HORIZ_SCROLL, PropertyData::U8(vec![0]));

        set_scrolling(&backend, &dev, ScrollMethod::TwoFinger, true);
        assert_eq!(
            backend.prop(1, props::LIBINPUT_SCROLL_METHOD),
            Some(PropertyData::U8(vec![1, 0, 0]))
        );
        assert_eq!(
            backend.prop(1, props::LIBINPUT_HORIZ_SCROLL),
            Some(PropertyData::U8(vec![1]))
        );
    }

    #[test]
    fn test_scrolling_prefers_typo_spelling_when_present() {
        let backend = MockBackend::new();
        let dev = add_touchpad(&backend, 1);
        backend.set_prop(1, props::LIBINPUT_SCROLL_METHOD, PropertyData::U8(vec![0, 0, 0]));
        backend.set_prop(1, props::LIBINPUT_HORIZ_SCROLL_TYPO, PropertyData::U8(vec![0]));
        backend.set_prop(1, props::LIBINPUT_HORIZ_SCROLL, PropertyData::U8(vec![0]));

        set_scrolling(&backend, &dev, ScrollMethod::Disabled, true);
        assert_eq!(
            backend.prop(1, props::LIBINPUT_HORIZ_SCROLL_TYPO),
            Some(PropertyData::U8(vec![1]))
        );
        // correctly-spelled property untouched
        assert_eq!(
            backend.prop(1, props::LIBINPUT_HORIZ_SCROLL),
            Some(PropertyData::U8(vec![0]))
        );
    }

    // ------------------------------------------------------------------
    // Natural scrolling
    // ------------------------------------------------------------------

    #[test]
    fn test_natural_scroll_negates_and_restores_exactly() {
        let backend = MockBackend::new();
        let dev = add_touchpad(&backend, 1);
        backend.set_prop(1, props::SYNAPTICS_SCROLLING_DISTANCE, PropertyData::I32(vec![107, 107]));

        set_natural_scroll(&backend, &dev, true);
        assert_eq!(
            backend.prop(1, props::SYNAPTICS_SCROLLING_DISTANCE),
            Some(PropertyData::I32(vec![-107, -107]))
        );

        set_natural_scroll(&backend, &dev, false);
        assert_eq!(
            backend.prop(1, props::SYNAPTICS_SCROLLING_DISTANCE),
            Some(PropertyData::I32(vec![107, 107]))
        );
    }

    #[test]
    fn test_natural_scroll_idempotent() {
        let backend = MockBackend::new();
        let dev = add_touchpad(&backend, 1);
        backend.set_prop(1, props::SYNAPTICS_SCROLLING_DISTANCE, PropertyData::I32(vec![50, 80]));

        set_natural_scroll(&backend, &dev, true);
        set_natural_scroll(&backend, &dev, true);
        assert_eq!(
            backend.prop(1, props::SYNAPTICS_SCROLLING_DISTANCE),
            Some(PropertyData::I32(vec![-50, -80]))
        );
    }

    #[test]
    fn test_natural_scroll_libinput_boolean() {
        let backend = MockBackend::new();
        let dev = add_mouse(&backend, 1);
        backend.set_prop(1, props::LIBINPUT_NATURAL_SCROLL, PropertyData::U8(vec![0]));

        set_natural_scroll(&backend, &dev, true);
        assert_eq!(
            backend.prop(1, props::LIBINPUT_NATURAL_SCROLL),
            Some(PropertyData::U8(vec![1]))
        );
    }

    // ------------------------------------------------------------------
    // Wheel emulation
    // ------------------------------------------------------------------

    #[test]
    fn test_wheel_emulation_trackball_only() {
        let backend = MockBackend::new();
        let mouse = add_mouse(&backend, 1);
        backend.set_prop(1, props::EVDEV_WHEEL_EMULATION, PropertyData::U8(vec![0]));
        backend.set_prop(1, props::EVDEV_WHEEL_EMULATION_BUTTON, PropertyData::U8(vec![0]));

        set_scroll_wheel_button(&backend, &mouse, 8);
        assert_eq!(backend.write_count(), 0);

        let ball = {
            let mut info = device_info(2, "Logitech Trackball", DeviceSource::Mouse);
            info.type_name = props::TRACKBALL_TYPE.to_string();
            backend.add_device(info.clone());
            info
        };
        backend.set_prop(2, props::EVDEV_WHEEL_EMULATION, PropertyData::U8(vec![0]));
        backend.set_prop(2, props::EVDEV_WHEEL_EMULATION_BUTTON, PropertyData::U8(vec![0]));

        set_scroll_wheel_button(&backend, &ball, 8);
        assert_eq!(
            backend.prop(2, props::EVDEV_WHEEL_EMULATION),
            Some(PropertyData::U8(vec![1]))
        );
        assert_eq!(
            backend.prop(2, props::EVDEV_WHEEL_EMULATION_BUTTON),
            Some(PropertyData::U8(vec![8]))
        );
    }

    #[test]
    fn test_wheel_emulation_disabled_leaves_button() {
        let backend = MockBackend::new();
        let mut info = device_info(1, "Trackball", DeviceSource::Mouse);
        info.type_name = props::TRACKBALL_TYPE.to_string();
        backend.add_device(info.clone());
        backend.set_prop(1, props::EVDEV_WHEEL_EMULATION, PropertyData::U8(vec![1]));
        backend.set_prop(1, props::EVDEV_WHEEL_EMULATION_BUTTON, PropertyData::U8(vec![8]));

        set_scroll_wheel_button(&backend, &info, 0);
        assert_eq!(
            backend.prop(1, props::EVDEV_WHEEL_EMULATION),
            Some(PropertyData::U8(vec![0]))
        );
        assert_eq!(
            backend.prop(1, props::EVDEV_WHEEL_EMULATION_BUTTON),
            Some(PropertyData::U8(vec![8]))
        );
    }

    // ------------------------------------------------------------------
    // Enable/disable + suppression helpers
    // ------------------------------------------------------------------

    #[test]
    fn test_touchpad_disable_enable() {
        let backend = MockBackend::new();
        let pad = add_touchpad(&backend, 1);
        let mouse = add_mouse(&backend, 2);

        set_touchpad_disabled(&backend, &pad);
        set_touchpad_disabled(&backend, &mouse);
        assert_eq!(backend.enable_calls(), vec![(1, false)]);

        set_touchpad_enabled(&backend, 1);
        assert_eq!(backend.enable_calls(), vec![(1, false), (1, true)]);

        // unknown device id: silent no-op
        set_touchpad_enabled(&backend, 99);
        assert_eq!(backend.enable_calls().len(), 2);
    }

    #[test]
    fn test_send_events_needs_advertised_mode() {
        let backend = MockBackend::new();
        let pad = add_touchpad(&backend, 1);
        backend.set_prop(1, props::LIBINPUT_SEND_EVENTS_ENABLED, PropertyData::U8(vec![0, 0]));

        // mode not advertised: nothing written
        set_send_events_disabled(&backend, &pad, true);
        assert_eq!(
            backend.prop(1, props::LIBINPUT_SEND_EVENTS_ENABLED),
            Some(PropertyData::U8(vec![0, 0]))
        );

        backend.set_prop(1, props::LIBINPUT_SEND_EVENTS_AVAILABLE, PropertyData::U8(vec![1, 1]));
        set_send_events_disabled(&backend, &pad, true);
        assert_eq!(
            backend.prop(1, props::LIBINPUT_SEND_EVENTS_ENABLED),
            Some(PropertyData::U8(vec![0, 1]))
        );
    }
}
