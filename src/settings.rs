//! Settings store for pointerd
//!
//! Typed settings for the mouse / touchpad / trackball / accessibility
//! groups, persisted as JSON at `~/.config/pointerd/settings.json`. Key names
//! follow the desktop schema keys they mirror (`left-handed`,
//! `scrolling-method`, ...). The store supports hot-reload: `reload` diffs
//! the file against the in-memory state and reports which keys changed, and
//! `update` performs the few writes the daemon itself makes (resetting a
//! setting it could not honor, forcing the touchpad back on).

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

// ============================================================================
// Constants
// ============================================================================

/// Default config directory name
const SETTINGS_DIR: &str = "pointerd";

/// Default config file name
const SETTINGS_FILE: &str = "settings.json";

/// Acceleration panel range upper bound
const MAX_MOTION_ACCELERATION: f64 = 10.0;

// ============================================================================
// Enums
// ============================================================================

/// Touchpad handedness: explicit, or mirroring the mouse setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TouchpadHandedness {
    Right,
    Left,
    Mouse,
}

/// Clickpad click behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClickpadClick {
    Disabled,
    /// Software button areas at the bottom of the pad
    ButtonAreas,
    /// Click with 1/2/3 fingers for left/right/middle
    Fingers,
    /// Leave whatever the driver picked as its default
    DriverDefault,
}

/// Touchpad scrolling method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScrollMethod {
    Disabled,
    TwoFinger,
    Edge,
    DriverDefault,
}

// ============================================================================
// Setting groups
// ============================================================================

fn default_unset_accel() -> f64 {
    -1.0
}
fn default_unset_threshold() -> i32 {
    -1
}
fn default_true() -> bool {
    true
}
fn default_touchpad_handedness() -> TouchpadHandedness {
    TouchpadHandedness::Mouse
}
fn default_clickpad_click() -> ClickpadClick {
    ClickpadClick::DriverDefault
}
fn default_scroll_method() -> ScrollMethod {
    ScrollMethod::TwoFinger
}

/// Mouse settings group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MouseSettings {
    #[serde(default)]
    pub left_handed: bool,

    #[serde(default)]
    pub custom_acceleration: bool,

    /// 1.0-10.0, or -1.0 for "unset"
    #[serde(default = "default_unset_accel")]
    pub motion_acceleration: f64,

    #[serde(default)]
    pub custom_threshold: bool,

    #[serde(default = "default_unset_threshold")]
    pub motion_threshold: i32,

    #[serde(default)]
    pub middle_button_enabled: bool,

    #[serde(default)]
    pub natural_scroll: bool,

    /// Run the pointer-locator helper
    #[serde(default)]
    pub locate_pointer: bool,
}

impl Default for MouseSettings {
    fn default() -> Self {
        Self {
            left_handed: false,
            custom_acceleration: false,
            motion_acceleration: -1.0,
            custom_threshold: false,
            motion_threshold: -1,
            middle_button_enabled: false,
            natural_scroll: false,
            locate_pointer: false,
        }
    }
}

/// Touchpad settings group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TouchpadSettings {
    #[serde(default = "default_touchpad_handedness")]
    pub left_handed: TouchpadHandedness,

    #[serde(default)]
    pub custom_acceleration: bool,

    #[serde(default = "default_unset_accel")]
    pub motion_acceleration: f64,

    #[serde(default)]
    pub custom_threshold: bool,

    #[serde(default = "default_unset_threshold")]
    pub motion_threshold: i32,

    /// Run the typing-disable helper / driver equivalent
    #[serde(default)]
    pub disable_while_typing: bool,

    #[serde(default = "default_true")]
    pub tap_to_click: bool,

    #[serde(default = "default_clickpad_click")]
    pub clickpad_click: ClickpadClick,

    #[serde(default = "default_scroll_method")]
    pub scrolling_method: ScrollMethod,

    #[serde(default = "default_true")]
    pub horizontal_scrolling: bool,

    #[serde(default)]
    pub natural_scroll: bool,

    #[serde(default = "default_true")]
    pub touchpad_enabled: bool,

    #[serde(default)]
    pub disable_with_external_mouse: bool,
}

impl Default for TouchpadSettings {
    fn default() -> Self {
        Self {
            left_handed: TouchpadHandedness::Mouse,
            custom_acceleration: false,
            motion_acceleration: -1.0,
            custom_threshold: false,
            motion_threshold: -1,
            disable_while_typing: false,
            tap_to_click: true,
            clickpad_click: ClickpadClick::DriverDefault,
            scrolling_method: ScrollMethod::TwoFinger,
            horizontal_scrolling: true,
            natural_scroll: false,
            touchpad_enabled: true,
            disable_with_external_mouse: false,
        }
    }
}

/// Trackball settings group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TrackballSettings {
    /// Physical button synthesizing wheel events while held; 0 disables
    #[serde(default)]
    pub scroll_wheel_emulation_button: i32,
}

impl Default for TrackballSettings {
    fn default() -> Self {
        Self {
            scroll_wheel_emulation_button: 0,
        }
    }
}

/// Mouse accessibility settings group (drives the click-assist daemon)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct A11ySettings {
    #[serde(default)]
    pub dwell_click_enabled: bool,

    #[serde(default)]
    pub secondary_click_enabled: bool,
}

impl Default for A11ySettings {
    fn default() -> Self {
        Self {
            dwell_click_enabled: false,
            secondary_click_enabled: false,
        }
    }
}

// ============================================================================
// Main settings structure
// ============================================================================

/// All pointer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Settings {
    #[serde(default)]
    pub mouse: MouseSettings,

    #[serde(default)]
    pub touchpad: TouchpadSettings,

    #[serde(default)]
    pub trackball: TrackballSettings,

    #[serde(default)]
    pub a11y: A11ySettings,

    /// Command consulted on device hotplug; non-zero exit blacklists the
    /// device. Empty string disables the hook.
    #[serde(default)]
    pub hotplug_command: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mouse: MouseSettings::default(),
            touchpad: TouchpadSettings::default(),
            trackball: TrackballSettings::default(),
            a11y: A11ySettings::default(),
            hotplug_command: String::new(),
        }
    }
}

impl Settings {
    /// Clamp values into their valid ranges.
    pub fn validate(&mut self) {
        clamp_accel(&mut self.mouse.motion_acceleration);
        clamp_accel(&mut self.touchpad.motion_acceleration);
        if self.mouse.motion_threshold < -1 {
            self.mouse.motion_threshold = -1;
        }
        if self.touchpad.motion_threshold < -1 {
            self.touchpad.motion_threshold = -1;
        }
        self.trackball.scroll_wheel_emulation_button =
            self.trackball.scroll_wheel_emulation_button.clamp(0, 255);
    }

    /// Resolve the touchpad's tri-state handedness against the mouse setting.
    pub fn touchpad_handedness(&self, mouse_left_handed: bool) -> bool {
        match self.touchpad.left_handed {
            TouchpadHandedness::Right => false,
            TouchpadHandedness::Left => true,
            TouchpadHandedness::Mouse => mouse_left_handed,
        }
    }

    /// Keys whose values differ between `self` and `new`.
    pub fn changed_keys(&self, new: &Settings) -> Vec<SettingKey> {
        use SettingKey::*;
        let mut keys = Vec::new();

        if self.mouse.left_handed != new.mouse.left_handed {
            keys.push(MouseLeftHanded);
        }
        if self.mouse.custom_acceleration != new.mouse.custom_acceleration {
            keys.push(MouseCustomAcceleration);
        }
        if self.mouse.motion_acceleration != new.mouse.motion_acceleration {
            keys.push(MouseMotionAcceleration);
        }
        if self.mouse.custom_threshold != new.mouse.custom_threshold {
            keys.push(MouseCustomThreshold);
        }
        if self.mouse.motion_threshold != new.mouse.motion_threshold {
            keys.push(MouseMotionThreshold);
        }
        if self.mouse.middle_button_enabled != new.mouse.middle_button_enabled {
            keys.push(MiddleButtonEnabled);
        }
        if self.mouse.natural_scroll != new.mouse.natural_scroll {
            keys.push(MouseNaturalScroll);
        }
        if self.mouse.locate_pointer != new.mouse.locate_pointer {
            keys.push(LocatePointer);
        }

        if self.touchpad.left_handed != new.touchpad.left_handed {
            keys.push(TouchpadLeftHanded);
        }
        if self.touchpad.custom_acceleration != new.touchpad.custom_acceleration {
            keys.push(TouchpadCustomAcceleration);
        }
        if self.touchpad.motion_acceleration != new.touchpad.motion_acceleration {
            keys.push(TouchpadMotionAcceleration);
        }
        if self.touchpad.custom_threshold != new.touchpad.custom_threshold {
            keys.push(TouchpadCustomThreshold);
        }
        if self.touchpad.motion_threshold != new.touchpad.motion_threshold {
            keys.push(TouchpadMotionThreshold);
        }
        if self.touchpad.disable_while_typing != new.touchpad.disable_while_typing {
            keys.push(DisableWhileTyping);
        }
        if self.touchpad.tap_to_click != new.touchpad.tap_to_click {
            keys.push(TapToClick);
        }
        if self.touchpad.clickpad_click != new.touchpad.clickpad_click {
            keys.push(ClickpadClickKey);
        }
        if self.touchpad.scrolling_method != new.touchpad.scrolling_method {
            keys.push(ScrollingMethod);
        }
        if self.touchpad.horizontal_scrolling != new.touchpad.horizontal_scrolling {
            keys.push(HorizontalScrolling);
        }
        if self.touchpad.natural_scroll != new.touchpad.natural_scroll {
            keys.push(TouchpadNaturalScroll);
        }
        if self.touchpad.touchpad_enabled != new.touchpad.touchpad_enabled {
            keys.push(TouchpadEnabled);
        }
        if self.touchpad.disable_with_external_mouse != new.touchpad.disable_with_external_mouse {
            keys.push(DisableWithExternalMouse);
        }

        if self.trackball.scroll_wheel_emulation_button
            != new.trackball.scroll_wheel_emulation_button
        {
            keys.push(ScrollWheelEmulationButton);
        }

        if self.a11y.dwell_click_enabled != new.a11y.dwell_click_enabled {
            keys.push(DwellClickEnabled);
        }
        if self.a11y.secondary_click_enabled != new.a11y.secondary_click_enabled {
            keys.push(SecondaryClickEnabled);
        }

        if self.hotplug_command != new.hotplug_command {
            keys.push(HotplugCommand);
        }

        keys
    }
}

fn clamp_accel(value: &mut f64) {
    if *value > MAX_MOTION_ACCELERATION {
        *value = MAX_MOTION_ACCELERATION;
    } else if *value < 0.0 && *value != -1.0 {
        *value = -1.0;
    }
}

/// Identity of a single logical setting, used in change notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKey {
    MouseLeftHanded,
    MouseCustomAcceleration,
    MouseMotionAcceleration,
    MouseCustomThreshold,
    MouseMotionThreshold,
    MiddleButtonEnabled,
    MouseNaturalScroll,
    LocatePointer,
    TouchpadLeftHanded,
    TouchpadCustomAcceleration,
    TouchpadMotionAcceleration,
    TouchpadCustomThreshold,
    TouchpadMotionThreshold,
    DisableWhileTyping,
    TapToClick,
    ClickpadClickKey,
    ScrollingMethod,
    HorizontalScrolling,
    TouchpadNaturalScroll,
    TouchpadEnabled,
    DisableWithExternalMouse,
    ScrollWheelEmulationButton,
    DwellClickEnabled,
    SecondaryClickEnabled,
    HotplugCommand,
}

// ============================================================================
// Settings store
// ============================================================================

/// Shared, file-backed settings handle.
#[derive(Clone)]
pub struct SettingsStore {
    inner: Arc<RwLock<Settings>>,
    path: Option<PathBuf>,
}

impl SettingsStore {
    /// In-memory store with no backing file (used in tests and as the
    /// fallback when no config directory can be determined).
    pub fn in_memory(mut settings: Settings) -> Self {
        settings.validate();
        Self {
            inner: Arc::new(RwLock::new(settings)),
            path: None,
        }
    }

    /// Default settings file path.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join(SETTINGS_DIR).join(SETTINGS_FILE))
    }

    /// Load from the default location, falling back to an in-memory store
    /// when no config directory exists.
    pub fn load_default() -> Result<Self, SettingsError> {
        match Self::default_path() {
            Some(path) => Self::load(&path),
            None => {
                tracing::warn!("Could not determine config directory, using defaults");
                Ok(Self::in_memory(Settings::default()))
            }
        }
    }

    /// Load from a file path. A missing file yields defaults (and remembers
    /// the path so later writes create it).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::info!(path = %path.display(), "Settings file not found, using defaults");
            return Ok(Self {
                inner: Arc::new(RwLock::new(Settings::default())),
                path: Some(path.to_path_buf()),
            });
        }

        let contents = fs::read_to_string(path).map_err(SettingsError::Io)?;
        let mut settings: Settings =
            serde_json::from_str(&contents).map_err(SettingsError::Parse)?;
        settings.validate();

        tracing::info!(path = %path.display(), "Settings loaded");

        Ok(Self {
            inner: Arc::new(RwLock::new(settings)),
            path: Some(path.to_path_buf()),
        })
    }

    /// Backing file path, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Current settings snapshot.
    pub fn snapshot(&self) -> Settings {
        self.inner.read().unwrap().clone()
    }

    /// Re-read the backing file and swap it in, reporting which keys changed.
    pub fn reload(&self) -> Result<Vec<SettingKey>, SettingsError> {
        let Some(path) = &self.path else {
            return Ok(Vec::new());
        };
        if !path.exists() {
            return Ok(Vec::new());
        }

        let contents = fs::read_to_string(path).map_err(SettingsError::Io)?;
        let mut new: Settings = serde_json::from_str(&contents).map_err(SettingsError::Parse)?;
        new.validate();

        let mut guard = self.inner.write().unwrap();
        let keys = guard.changed_keys(&new);
        *guard = new;
        Ok(keys)
    }

    /// Mutate the settings, persist them, and report which keys changed.
    /// This is the path for the daemon's own writes (resets, auto re-enable).
    pub fn update<F: FnOnce(&mut Settings)>(&self, f: F) -> Result<Vec<SettingKey>, SettingsError> {
        let (keys, snapshot) = {
            let mut guard = self.inner.write().unwrap();
            let mut new = guard.clone();
            f(&mut new);
            new.validate();
            let keys = guard.changed_keys(&new);
            *guard = new.clone();
            (keys, new)
        };

        if !keys.is_empty() {
            if let Some(path) = &self.path {
                Self::persist(&snapshot, path)?;
            }
        }
        Ok(keys)
    }

    fn persist(settings: &Settings, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(SettingsError::Io)?;
        }
        let contents = serde_json::to_string_pretty(settings).map_err(SettingsError::Parse)?;
        fs::write(path, contents).map_err(SettingsError::Io)?;
        tracing::debug!(path = %path.display(), "Settings saved");
        Ok(())
    }
}

// ============================================================================
// Error types
// ============================================================================

/// Settings error type
#[derive(Debug)]
pub enum SettingsError {
    /// I/O error reading/writing file
    Io(std::io::Error),
    /// JSON parsing error
    Parse(serde_json::Error),
}

impl std::fmt::Display for SettingsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingsError::Io(e) => write!(f, "I/O error: {}", e),
            SettingsError::Parse(e) => write!(f, "Parse error: {}", e),
        }
    }
}

impl std::error::Error for SettingsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SettingsError::Io(e) => Some(e),
            SettingsError::Parse(e) => Some(e),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert!(!settings.mouse.left_handed);
        assert_eq!(settings.mouse.motion_acceleration, -1.0);
        assert!(settings.touchpad.tap_to_click);
        assert!(settings.touchpad.touchpad_enabled);
        assert_eq!(settings.touchpad.left_handed, TouchpadHandedness::Mouse);
        assert_eq!(settings.touchpad.scrolling_method, ScrollMethod::TwoFinger);
        assert_eq!(settings.trackball.scroll_wheel_emulation_button, 0);
        assert!(settings.hotplug_command.is_empty());
    }

    #[test]
    fn test_json_partial_parse_fills_defaults() {
        let json = r#"{
            "mouse": { "left-handed": true, "motion-acceleration": 5.5 },
            "touchpad": { "scrolling-method": "edge" }
        }"#;

        let settings: Settings = serde_json::from_str(json).unwrap();
        assert!(settings.mouse.left_handed);
        assert_eq!(settings.mouse.motion_acceleration, 5.5);
        assert_eq!(settings.touchpad.scrolling_method, ScrollMethod::Edge);
        // defaults fill the rest
        assert!(settings.touchpad.tap_to_click);
        assert_eq!(settings.touchpad.clickpad_click, ClickpadClick::DriverDefault);
    }

    #[test]
    fn test_json_minimal() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_validation_clamps() {
        let mut settings = Settings::default();
        settings.mouse.motion_acceleration = 42.0;
        settings.touchpad.motion_acceleration = -3.0;
        settings.trackball.scroll_wheel_emulation_button = 4096;
        settings.validate();

        assert_eq!(settings.mouse.motion_acceleration, 10.0);
        assert_eq!(settings.touchpad.motion_acceleration, -1.0);
        assert_eq!(settings.trackball.scroll_wheel_emulation_button, 255);
    }

    #[test]
    fn test_touchpad_handedness_resolution() {
        let mut settings = Settings::default();

        settings.touchpad.left_handed = TouchpadHandedness::Mouse;
        assert!(settings.touchpad_handedness(true));
        assert!(!settings.touchpad_handedness(false));

        settings.touchpad.left_handed = TouchpadHandedness::Left;
        assert!(settings.touchpad_handedness(false));

        settings.touchpad.left_handed = TouchpadHandedness::Right;
        assert!(!settings.touchpad_handedness(true));
    }

    #[test]
    fn test_changed_keys() {
        let old = Settings::default();
        let mut new = old.clone();
        new.mouse.left_handed = true;
        new.touchpad.touchpad_enabled = false;
        new.a11y.dwell_click_enabled = true;

        let keys = old.changed_keys(&new);
        assert_eq!(
            keys,
            vec![
                SettingKey::MouseLeftHanded,
                SettingKey::TouchpadEnabled,
                SettingKey::DwellClickEnabled,
            ]
        );

        assert!(old.changed_keys(&old.clone()).is_empty());
    }

    #[test]
    fn test_store_update_reports_keys_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let store = SettingsStore::load(&path).unwrap();

        let keys = store
            .update(|s| s.touchpad.touchpad_enabled = false)
            .unwrap();
        assert_eq!(keys, vec![SettingKey::TouchpadEnabled]);
        assert!(!store.snapshot().touchpad.touchpad_enabled);

        // a fresh store sees the persisted value
        let store2 = SettingsStore::load(&path).unwrap();
        assert!(!store2.snapshot().touchpad.touchpad_enabled);

        // no-op update reports no keys
        let keys = store.update(|_| {}).unwrap();
        assert!(keys.is_empty());
    }

    #[test]
    fn test_store_reload_diffs_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let store = SettingsStore::load(&path).unwrap();

        fs::write(&path, r#"{"mouse": {"natural-scroll": true}}"#).unwrap();
        let keys = store.reload().unwrap();
        assert_eq!(keys, vec![SettingKey::MouseNaturalScroll]);
        assert!(store.snapshot().mouse.natural_scroll);

        // same contents again: no changes
        let keys = store.reload().unwrap();
        assert!(keys.is_empty());
    }

    #[test]
    fn test_store_reload_rejects_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let store = SettingsStore::load(&path).unwrap();

        fs::write(&path, "{not json").unwrap();
        assert!(matches!(store.reload(), Err(SettingsError::Parse(_))));
        // in-memory state untouched
        assert_eq!(store.snapshot(), Settings::default());
    }

    #[test]
    fn test_in_memory_store_has_no_path() {
        let store = SettingsStore::in_memory(Settings::default());
        assert!(store.path().is_none());
        assert!(store.reload().unwrap().is_empty());
        let keys = store.update(|s| s.mouse.locate_pointer = true).unwrap();
        assert_eq!(keys, vec![SettingKey::LocatePointer]);
    }
}
