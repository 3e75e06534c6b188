//! Startup / teardown orchestration
//!
//! open device → grab probe → create virtual keyboard → install signal
//! handlers → event loop → teardown. Teardown runs on every path.

use log::{info, warn};
use std::path::Path;

use crate::config::Config;
use crate::error::MouseKeysError;
use crate::event_loop::{EventLoop, LoopOutcome};
use crate::input::keycodes;
use crate::input::{GrabStatus, PhysicalDevice};
use crate::signals::{self, CancelToken};
use crate::synth::Synthesizer;
use crate::uinput::VirtualKeyboard;

/// Handles acquired during startup, released in [`Resources::teardown`]
#[derive(Default)]
struct Resources {
    physical: Option<PhysicalDevice>,
    virtual_kbd: Option<VirtualKeyboard>,
}

impl Resources {
    /// Close the physical device and destroy the virtual keyboard.
    /// Safe to call repeatedly and with any subset of handles acquired.
    fn teardown(&mut self) {
        if let Some(dev) = self.physical.take() {
            info!("Closing {}", dev.path().display());
            drop(dev);
        }
        if let Some(mut kbd) = self.virtual_kbd.take() {
            kbd.destroy();
        }
    }
}

impl Drop for Resources {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Run the remapper on `device_path` until cancellation, unplug or failure
pub fn run(device_path: &Path, config: &Config) -> Result<LoopOutcome, MouseKeysError> {
    let mut resources = Resources::default();
    let result = run_with(&mut resources, device_path, config);
    resources.teardown();
    result
}

fn run_with(
    resources: &mut Resources,
    device_path: &Path,
    config: &Config,
) -> Result<LoopOutcome, MouseKeysError> {
    let table = config
        .mapping_table()
        .map_err(|e| MouseKeysError::Config(format!("{:#}", e)))?;

    // 1. Physical device
    let physical = resources.physical.insert(PhysicalDevice::open(device_path)?);

    // 2. Advisory grab probe
    match physical.probe_grab() {
        GrabStatus::Available => {}
        GrabStatus::Held => {
            warn!("{} is grabbed by another process", device_path.display());
            print_grab_banner(device_path);
        }
        GrabStatus::Unknown(e) => {
            warn!("Grab probe on {} failed: {}", device_path.display(), e);
        }
    }

    // 3. Virtual keyboard with every key the table can emit
    let virtual_kbd = resources.virtual_kbd.insert(VirtualKeyboard::create(
        config.uinput_path(),
        &config.identity(),
        &table.capabilities(),
    )?);

    // 4. Cancellation
    let cancel = CancelToken::new();
    signals::install_cancel_handlers(&cancel)?;

    // 5. Event loop
    let synth = Synthesizer::new(config.event_delay());
    info!("Remapping {}", physical.path().display());
    for action in table.actions() {
        info!(
            "  {} -> {}",
            keycodes::describe(action.source_button()),
            keycodes::describe_chord(action.key_sequence())
        );
    }
    let mut event_loop = EventLoop::new(physical, virtual_kbd, &table, &synth, cancel);
    event_loop.run()
}

fn print_grab_banner(device_path: &Path) {
    println!("***********************************************");
    println!("  This device is grabbed by another process.");
    println!("  No events are available to mousekeys while the other");
    println!("  grab is active.");
    println!("  In most cases, this is caused by an X driver,");
    println!("  try VT-switching and re-run mousekeys again.");
    println!("  Run the following command to see processes with");
    println!("  an open fd on this device");
    println!(" \"fuser -v {}\"", device_path.display());
    println!("***********************************************");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_without_uinput() -> Config {
        let mut config = Config::default();
        config.device.uinput_path = "/nonexistent/uinput".into();
        config
    }

    #[test]
    fn test_missing_device_is_open_error() {
        let result = run(Path::new("/nonexistent/input/event0"), &Config::default());
        assert!(matches!(result, Err(MouseKeysError::DeviceOpen { .. })));
    }

    #[test]
    fn test_creation_failure_tears_down() {
        let result = run(Path::new("/dev/null"), &config_without_uinput());
        assert!(matches!(result, Err(MouseKeysError::DeviceCreation { .. })));
    }

    #[test]
    fn test_teardown_repeated_and_partial() {
        let mut resources = Resources::default();
        resources.teardown();
        resources.physical = Some(PhysicalDevice::open(Path::new("/dev/null")).unwrap());
        resources.teardown();
        assert!(resources.physical.is_none());
        resources.teardown();
    }

    #[test]
    fn test_invalid_mapping_rejected_before_open() {
        let mut config = Config::default();
        config.mapping.clear();
        let result = run(Path::new("/nonexistent/input/event0"), &config);
        assert!(matches!(result, Err(MouseKeysError::Config(_))));
    }
}
