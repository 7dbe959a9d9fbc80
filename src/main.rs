//! pointerd
//!
//! A daemon that applies pointing-device settings (handedness, acceleration,
//! tap-to-click, scrolling, wheel emulation, touchpad enable/disable) to X11
//! input devices through XInput device properties, covering the legacy
//! Synaptics/evdev drivers and the modern libinput driver side by side.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use notify::{RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::time::{interval, Duration};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use pointerd::{
    backend::Backend,
    manager::{Event, MouseManager, DEVICE_POLL_INTERVAL_SECS},
    settings::SettingsStore,
    xinput::XInputBackend,
};

/// pointerd - pointing device settings daemon for X11
#[derive(Parser, Debug)]
#[command(name = "pointerd")]
#[command(version, about, long_about = None)]
struct Args {
    /// Settings file path (defaults to ~/.config/pointerd/settings.json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// List pointing devices and exit
    #[arg(long)]
    list_devices: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("pointerd starting...");

    // No XInput on this host means there is nothing meaningful to
    // configure; starting is then a no-op success.
    let backend = match XInputBackend::open() {
        Ok(backend) => Arc::new(backend),
        Err(e) => {
            info!("XInput unavailable, not applying any settings: {}", e);
            return Ok(());
        }
    };

    if args.list_devices {
        list_devices(backend.as_ref());
        return Ok(());
    }

    // Load settings (supports hot-reload via the file watcher below)
    let store = match &args.config {
        Some(path) => SettingsStore::load(path),
        None => SettingsStore::load_default(),
    };
    let store = match store {
        Ok(store) => {
            info!("Settings loaded successfully");
            store
        }
        Err(e) => {
            warn!("Failed to load settings, using defaults: {}", e);
            SettingsStore::in_memory(Default::default())
        }
    };

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

    // Watch the settings file and deliver per-key change events
    let _watcher = match spawn_settings_watcher(&store, event_tx.clone()) {
        Ok(watcher) => watcher,
        Err(e) => {
            warn!("Settings watcher unavailable, changes need a restart: {}", e);
            None
        }
    };

    let mut manager = MouseManager::new(backend, store, event_tx.clone());
    manager.start()?;

    info!("pointerd ready");

    // Single control loop: settings/device/helper events plus the device
    // poll tick, until shutdown
    let mut poll = interval(Duration::from_secs(DEVICE_POLL_INTERVAL_SECS));
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received, exiting...");
                break;
            }
            event = event_rx.recv() => {
                match event {
                    Some(event) => manager.handle_event(event),
                    None => break,
                }
            }
            _ = poll.tick() => {
                manager.poll_devices();
            }
        }
    }

    manager.stop();
    Ok(())
}

/// Watch the settings file's directory; on any change touching the file,
/// reload and queue the changed keys as events.
fn spawn_settings_watcher(
    store: &SettingsStore,
    event_tx: mpsc::UnboundedSender<Event>,
) -> notify::Result<Option<notify::RecommendedWatcher>> {
    let Some(path) = store.path().map(|p| p.to_path_buf()) else {
        return Ok(None);
    };
    let Some(dir) = path.parent().map(|p| p.to_path_buf()) else {
        return Ok(None);
    };
    std::fs::create_dir_all(&dir).ok();

    let store = store.clone();
    let file_name = path.file_name().map(|n| n.to_os_string());

    let mut watcher = notify::recommended_watcher(move |result: notify::Result<notify::Event>| {
        let Ok(event) = result else {
            return;
        };
        let ours = event
            .paths
            .iter()
            .any(|p| p.file_name().map(|n| Some(n.to_os_string()) == file_name).unwrap_or(false));
        if !ours {
            return;
        }
        match store.reload() {
            Ok(keys) => {
                for key in keys {
                    let _ = event_tx.send(Event::SettingChanged(key));
                }
            }
            Err(e) => warn!("Failed to reload settings: {}", e),
        }
    })?;

    watcher.watch(&dir, RecursiveMode::NonRecursive)?;
    Ok(Some(watcher))
}

/// Print the current pointing devices
fn list_devices(backend: &dyn Backend) {
    let devices = backend.devices();

    if devices.is_empty() {
        println!("No pointing devices found.");
        return;
    }

    println!("Found {} pointing device(s):\n", devices.len());

    for (i, device) in devices.iter().enumerate() {
        println!("{}. {}", i + 1, device.name);
        println!("   Id:      {}", device.id);
        let type_name = if device.type_name.is_empty() { "-" } else { device.type_name.as_str() };
        println!("   Type:    {}", type_name);
        println!("   Buttons: {}", device.num_buttons);
        println!("   Enabled: {}", device.enabled);
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::parse_from(["pointerd"]);
        assert!(args.config.is_none());
        assert!(!args.verbose);
        assert!(!args.list_devices);
    }

    #[test]
    fn test_args_verbose() {
        let args = Args::parse_from(["pointerd", "--verbose"]);
        assert!(args.verbose);
    }

    #[test]
    fn test_args_config_path() {
        let args = Args::parse_from(["pointerd", "--config", "/tmp/p.json"]);
        assert_eq!(args.config, Some(PathBuf::from("/tmp/p.json")));
    }

    #[test]
    fn test_args_list_devices() {
        let args = Args::parse_from(["pointerd", "--list-devices"]);
        assert!(args.list_devices);
    }

    #[test]
    fn test_device_poll_interval() {
        assert_eq!(DEVICE_POLL_INTERVAL_SECS, 2);
    }
}
