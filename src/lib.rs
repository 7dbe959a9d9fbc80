//! pointerd library
//!
//! Public API for testing and integration.

pub mod backend;
pub mod codec;
pub mod command;
pub mod helpers;
pub mod manager;
pub mod mappers;
pub mod probe;
pub mod props;
pub mod settings;
pub mod xinput;

/// Re-export commonly used types
pub use backend::{
    Atom, Backend, BackendError, DeviceId, DeviceInfo, DeviceSource, PropertyData, PtrFeedback,
};
pub use command::HotplugEvent;
pub use helpers::{HelperKind, HelperSupervisor};
pub use manager::{Event, MouseManager, DEVICE_POLL_INTERVAL_SECS};
pub use probe::DeviceClass;
pub use settings::{SettingKey, Settings, SettingsError, SettingsStore};
pub use xinput::XInputBackend;
