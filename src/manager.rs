//! Pointer settings manager
//!
//! The single control point of the daemon: consumes configuration-change,
//! device-presence, and helper-exit events on one task and routes them to
//! the mappers. No error from per-device processing ever aborts the
//! dispatch loop; the worst outcome for a broken device is a logged warning.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::backend::{Backend, DeviceId, DeviceInfo};
use crate::command::{self, HotplugEvent};
use crate::helpers::{HelperKind, HelperSupervisor};
use crate::mappers;
use crate::probe;
use crate::props;
use crate::settings::{SettingKey, Settings, SettingsStore};

/// Device polling interval for hotplug detection (2 seconds)
pub const DEVICE_POLL_INTERVAL_SECS: u64 = 2;

/// Events processed by the manager's control loop.
#[derive(Debug)]
pub enum Event {
    /// Deferred startup task; queued by `start`, cancellable by `stop`
    Startup,
    /// One logical setting changed
    SettingChanged(SettingKey),
    /// A device appeared
    DeviceAdded(DeviceId),
    /// A device went away
    DeviceRemoved(DeviceId),
    /// A supervised helper process exited
    HelperExited {
        kind: HelperKind,
        status: Option<i32>,
    },
}

/// Owns the blacklist, the helper supervisor, and the dispatch logic. One
/// instance per daemon, constructed by the host and driven from a single
/// task.
pub struct MouseManager {
    backend: Arc<dyn Backend>,
    store: SettingsStore,
    helpers: HelperSupervisor,
    blacklist: HashSet<DeviceId>,
    /// Last-seen devices; removal events are resolved against this since the
    /// server no longer lists a detached device.
    known_devices: HashMap<DeviceId, DeviceInfo>,
    event_tx: mpsc::UnboundedSender<Event>,
    started: bool,
    stopped: bool,
    startup_done: bool,
}

impl MouseManager {
    pub fn new(
        backend: Arc<dyn Backend>,
        store: SettingsStore,
        event_tx: mpsc::UnboundedSender<Event>,
    ) -> Self {
        Self {
            backend,
            store,
            helpers: HelperSupervisor::new(event_tx.clone()),
            blacklist: HashSet::new(),
            known_devices: HashMap::new(),
            event_tx,
            started: false,
            stopped: false,
            startup_done: false,
        }
    }

    /// Queue the deferred startup pass. Succeeds as a no-op when the
    /// device-property protocol is entirely unsupported on this host.
    pub fn start(&mut self) -> Result<(), crate::backend::BackendError> {
        if self.started {
            return Ok(());
        }
        self.started = true;

        if !self.backend.supported() {
            debug!("XInput is not supported, not applying any settings");
            self.stopped = true;
            return Ok(());
        }

        let _ = self.event_tx.send(Event::Startup);
        Ok(())
    }

    /// Idempotent teardown: discards pending work and stops the pointer
    /// locator. syndaemon dies with the process via its parent-death signal.
    pub fn stop(&mut self) {
        if self.stopped {
            return;
        }
        debug!("Stopping mouse manager");
        self.stopped = true;
        self.helpers.shutdown();
    }

    /// Dispatch one event. Runs on the control task only.
    pub fn handle_event(&mut self, event: Event) {
        if self.stopped || !self.started {
            return;
        }
        match event {
            Event::Startup => self.on_startup(),
            Event::SettingChanged(key) => self.on_setting_changed(key),
            Event::DeviceAdded(id) => {
                if let Some(device) = self.backend.device(id) {
                    self.known_devices.insert(id, device.clone());
                    self.on_device_added(device);
                }
            }
            Event::DeviceRemoved(id) => {
                let device = self
                    .known_devices
                    .remove(&id)
                    .or_else(|| self.backend.device(id));
                if let Some(device) = device {
                    self.on_device_removed(device);
                }
            }
            Event::HelperExited { kind, status } => self.helpers.on_exited(kind, status),
        }
    }

    /// Diff the current device list against the last poll and synthesize
    /// attach/detach handling. Inert until the startup pass has run so the
    /// initial population goes through the `present` path instead.
    pub fn poll_devices(&mut self) {
        if self.stopped || !self.startup_done {
            return;
        }

        let current: HashMap<DeviceId, DeviceInfo> = self
            .backend
            .devices()
            .into_iter()
            .map(|d| (d.id, d))
            .collect();

        let removed: Vec<DeviceInfo> = self
            .known_devices
            .values()
            .filter(|d| !current.contains_key(&d.id))
            .cloned()
            .collect();
        let added: Vec<DeviceInfo> = current
            .values()
            .filter(|d| !self.known_devices.contains_key(&d.id))
            .cloned()
            .collect();

        self.known_devices = current;

        for device in removed {
            debug!("device \"{}\" ({}) detached", device.name, device.id);
            self.on_device_removed(device);
        }
        for device in added {
            debug!("device \"{}\" ({}) attached", device.name, device.id);
            self.on_device_added(device);
        }
    }

    // ------------------------------------------------------------------
    // Event handlers
    // ------------------------------------------------------------------

    fn on_startup(&mut self) {
        debug!("applying initial pointer settings");

        let settings = self.store.snapshot();

        self.apply_locate_pointer(&settings);
        self.apply_mousetweaks(&settings);
        self.apply_disable_while_typing(&settings);
        self.apply_disable_with_external_mouse(&settings);

        for device in self.backend.devices() {
            self.known_devices.insert(device.id, device.clone());
            if probe::is_ignored(&self.blacklist, &device) {
                continue;
            }
            if command::run_custom_command(&settings.hotplug_command, &device, HotplugEvent::Present)
            {
                self.blacklist.insert(device.id);
            } else {
                self.apply_device_settings(&settings, &device);
            }
        }

        self.ensure_touchpad_active();

        if self.store.snapshot().touchpad.touchpad_enabled {
            for id in probe::disabled_devices(&self.backend.devices()) {
                mappers::set_touchpad_enabled(self.backend.as_ref(), id);
            }
        }

        self.startup_done = true;
    }

    fn on_setting_changed(&mut self, key: SettingKey) {
        use SettingKey::*;

        let settings = self.store.snapshot();

        match key {
            DwellClickEnabled | SecondaryClickEnabled => {
                self.apply_mousetweaks(&settings);
                return;
            }
            LocatePointer => {
                self.apply_locate_pointer(&settings);
                return;
            }
            DisableWhileTyping => {
                self.apply_disable_while_typing(&settings);
                return;
            }
            DisableWithExternalMouse => {
                self.apply_disable_with_external_mouse(&settings);
                return;
            }
            HotplugCommand => return,
            ScrollWheelEmulationButton => {
                for device in self.active_devices() {
                    mappers::set_scroll_wheel_button(
                        self.backend.as_ref(),
                        &device,
                        settings.trackball.scroll_wheel_emulation_button,
                    );
                }
                return;
            }
            _ => {}
        }

        if Self::is_mouse_key(key) {
            self.on_mouse_setting_changed(key, &settings);
        } else {
            self.on_touchpad_setting_changed(key, &settings);
        }
    }

    fn on_mouse_setting_changed(&mut self, key: SettingKey, settings: &Settings) {
        use SettingKey::*;

        let backend = self.backend.clone();
        let mouse_left_handed = settings.mouse.left_handed;

        for device in self.active_devices() {
            if probe::is_touchpad(backend.as_ref(), &device) {
                continue;
            }
            match key {
                MouseLeftHanded => mappers::set_left_handed(
                    backend.as_ref(),
                    settings,
                    &device,
                    mouse_left_handed,
                    settings.touchpad_handedness(mouse_left_handed),
                ),
                MouseCustomAcceleration | MouseMotionAcceleration | MouseCustomThreshold
                | MouseMotionThreshold => mappers::set_motion(backend.as_ref(), settings, &device),
                MiddleButtonEnabled => mappers::set_middle_button(
                    backend.as_ref(),
                    &device,
                    settings.mouse.middle_button_enabled,
                ),
                MouseNaturalScroll => mappers::set_natural_scroll(
                    backend.as_ref(),
                    &device,
                    settings.mouse.natural_scroll,
                ),
                _ => {}
            }
        }
    }

    fn on_touchpad_setting_changed(&mut self, key: SettingKey, settings: &Settings) {
        use SettingKey::*;

        let backend = self.backend.clone();
        let mouse_left_handed = settings.mouse.left_handed;
        let touchpad_left_handed = settings.touchpad_handedness(mouse_left_handed);

        for device in self.active_devices() {
            if !probe::is_touchpad(backend.as_ref(), &device) {
                continue;
            }
            match key {
                TapToClick => mappers::set_tap_to_click(
                    backend.as_ref(),
                    &device,
                    settings.touchpad.tap_to_click,
                    touchpad_left_handed,
                ),
                ClickpadClickKey => mappers::set_click_actions(
                    backend.as_ref(),
                    &device,
                    settings.touchpad.clickpad_click,
                    touchpad_left_handed,
                ),
                ScrollingMethod | HorizontalScrolling => mappers::set_scrolling(
                    backend.as_ref(),
                    &device,
                    settings.touchpad.scrolling_method,
                    settings.touchpad.horizontal_scrolling,
                ),
                TouchpadEnabled => {
                    if settings.touchpad.touchpad_enabled {
                        mappers::set_touchpad_enabled(backend.as_ref(), device.id);
                    } else {
                        mappers::set_touchpad_disabled(backend.as_ref(), &device);
                    }
                }
                TouchpadCustomAcceleration | TouchpadMotionAcceleration
                | TouchpadCustomThreshold | TouchpadMotionThreshold => {
                    mappers::set_motion(backend.as_ref(), settings, &device)
                }
                TouchpadLeftHanded => mappers::set_left_handed(
                    backend.as_ref(),
                    settings,
                    &device,
                    mouse_left_handed,
                    touchpad_left_handed,
                ),
                TouchpadNaturalScroll => mappers::set_natural_scroll(
                    backend.as_ref(),
                    &device,
                    settings.touchpad.natural_scroll,
                ),
                _ => {}
            }
        }

        // re-enabling also wakes up pads the server had disabled earlier
        if key == TouchpadEnabled && settings.touchpad.touchpad_enabled {
            for id in probe::disabled_devices(&backend.devices()) {
                mappers::set_touchpad_enabled(backend.as_ref(), id);
            }
        }
    }

    fn on_device_added(&mut self, device: DeviceInfo) {
        if probe::is_ignored(&self.blacklist, &device) {
            return;
        }

        let settings = self.store.snapshot();

        if command::run_custom_command(&settings.hotplug_command, &device, HotplugEvent::Added) {
            self.blacklist.insert(device.id);
        } else {
            self.apply_device_settings(&settings, &device);
        }

        // a touchpad may have appeared, or a mouse the suppression rules
        // care about
        self.apply_disable_while_typing(&settings);
        self.apply_disable_with_external_mouse(&settings);
        self.ensure_touchpad_active();
    }

    fn on_device_removed(&mut self, device: DeviceInfo) {
        self.blacklist.remove(&device.id);

        if probe::is_ignored(&self.blacklist, &device) {
            return;
        }

        let settings = self.store.snapshot();
        command::run_custom_command(&settings.hotplug_command, &device, HotplugEvent::Removed);

        self.apply_disable_while_typing(&settings);
        self.ensure_touchpad_active();
    }

    // ------------------------------------------------------------------
    // Application helpers
    // ------------------------------------------------------------------

    /// Apply the full current setting set to one device.
    fn apply_device_settings(&self, settings: &Settings, device: &DeviceInfo) {
        let backend = self.backend.as_ref();

        let mouse_left_handed = settings.mouse.left_handed;
        let touchpad_left_handed = settings.touchpad_handedness(mouse_left_handed);

        mappers::set_left_handed(
            backend,
            settings,
            device,
            mouse_left_handed,
            touchpad_left_handed,
        );
        mappers::set_motion(backend, settings, device);
        mappers::set_middle_button(backend, device, settings.mouse.middle_button_enabled);

        mappers::set_tap_to_click(
            backend,
            device,
            settings.touchpad.tap_to_click,
            touchpad_left_handed,
        );
        mappers::set_click_actions(
            backend,
            device,
            settings.touchpad.clickpad_click,
            touchpad_left_handed,
        );
        mappers::set_scrolling(
            backend,
            device,
            settings.touchpad.scrolling_method,
            settings.touchpad.horizontal_scrolling,
        );

        let natural_scroll = if probe::is_touchpad(backend, device) {
            settings.touchpad.natural_scroll
        } else {
            settings.mouse.natural_scroll
        };
        mappers::set_natural_scroll(backend, device, natural_scroll);

        if !settings.touchpad.touchpad_enabled {
            mappers::set_touchpad_disabled(backend, device);
        }

        mappers::set_scroll_wheel_button(
            backend,
            device,
            settings.trackball.scroll_wheel_emulation_button,
        );
    }

    /// Re-enable the touchpad when no other pointing device is present.
    fn ensure_touchpad_active(&mut self) {
        let devices = self.backend.devices();
        if !probe::mouse_is_present(&devices)
            && !probe::touchscreen_is_present(&devices)
            && probe::touchpad_is_present(&devices)
        {
            self.set_setting(|s| s.touchpad.touchpad_enabled = true);
        }
    }

    fn apply_disable_while_typing(&mut self, settings: &Settings) {
        let state = settings.touchpad.disable_while_typing;
        let backend = self.backend.clone();

        if backend.resolve_atom(props::SYNAPTICS_OFF).is_some() {
            let desired = state && probe::touchpad_is_present(&backend.devices());
            if let Err(e) = self.helpers.reconcile_syndaemon(desired) {
                warn!("{}", e);
                self.set_setting(|s| s.touchpad.disable_while_typing = false);
            }
        }

        if backend.resolve_atom(props::LIBINPUT_DISABLE_WHILE_TYPING).is_some() {
            for device in self.active_devices() {
                mappers::set_disable_while_typing(backend.as_ref(), &device, state);
            }
        }
    }

    fn apply_disable_with_external_mouse(&mut self, settings: &Settings) {
        let state = settings.touchpad.disable_with_external_mouse;
        let backend = self.backend.clone();
        for device in self.active_devices() {
            mappers::set_send_events_disabled(backend.as_ref(), &device, state);
        }
    }

    fn apply_locate_pointer(&mut self, settings: &Settings) {
        if let Err(e) = self.helpers.reconcile_locate_pointer(settings.mouse.locate_pointer) {
            warn!("{}", e);
            self.set_setting(|s| s.mouse.locate_pointer = false);
        }
    }

    fn apply_mousetweaks(&mut self, settings: &Settings) {
        let dwell = settings.a11y.dwell_click_enabled;
        let secondary = settings.a11y.secondary_click_enabled;

        if let Err(e) = self.helpers.reconcile_mousetweaks(dwell || secondary) {
            warn!("Error enabling mouse accessibility features ({})", e);
            if dwell {
                self.set_setting(|s| s.a11y.dwell_click_enabled = false);
            } else if secondary {
                self.set_setting(|s| s.a11y.secondary_click_enabled = false);
            }
        }
    }

    /// Write back a setting the daemon itself changes (resets, auto
    /// re-enable) and queue the resulting change events, exactly as if an
    /// external writer had changed them.
    fn set_setting<F: FnOnce(&mut Settings)>(&self, f: F) {
        match self.store.update(f) {
            Ok(keys) => {
                for key in keys {
                    let _ = self.event_tx.send(Event::SettingChanged(key));
                }
            }
            Err(e) => warn!("failed to update settings: {}", e),
        }
    }

    fn active_devices(&self) -> Vec<DeviceInfo> {
        self.backend
            .devices()
            .into_iter()
            .filter(|d| !probe::is_ignored(&self.blacklist, d))
            .collect()
    }

    fn is_mouse_key(key: SettingKey) -> bool {
        use SettingKey::*;
        matches!(
            key,
            MouseLeftHanded
                | MouseCustomAcceleration
                | MouseMotionAcceleration
                | MouseCustomThreshold
                | MouseMotionThreshold
                | MiddleButtonEnabled
                | MouseNaturalScroll
        )
    }
}
