//! Device hotplug command hook
//!
//! A user-configured command consulted when a device shows up or goes away.
//! A non-zero exit status on `added`/`present` means "hands off": the device
//! is blacklisted until it is detached.

use std::process::Command;

use tracing::debug;

use crate::backend::DeviceInfo;

/// Hotplug event tag passed to the command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotplugEvent {
    /// Device attached while running
    Added,
    /// Device detached
    Removed,
    /// Device already present at startup
    Present,
}

impl HotplugEvent {
    pub fn tag(self) -> &'static str {
        match self {
            HotplugEvent::Added => "added",
            HotplugEvent::Removed => "removed",
            HotplugEvent::Present => "present",
        }
    }
}

/// Run the hotplug command for a device. Returns true when the command
/// refuses the device (non-zero exit). An empty command or a command that
/// cannot run never refuses.
pub fn run_custom_command(command: &str, device: &DeviceInfo, event: HotplugEvent) -> bool {
    if command.is_empty() {
        return false;
    }

    debug!(
        "running {} (-t {} -i {}) for \"{}\"",
        command,
        event.tag(),
        device.id,
        device.name
    );

    match Command::new(command)
        .arg("-t")
        .arg(event.tag())
        .arg("-i")
        .arg(device.id.to_string())
        .arg(&device.name)
        .status()
    {
        Ok(status) => !status.success(),
        Err(e) => {
            debug!("hotplug command {} did not run: {}", command, e);
            false
        }
    }
}
