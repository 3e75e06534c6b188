//! Configuration file management
//!
//! Loads TOML configuration: virtual device identity, injection timing and the
//! button → key-chord mapping table.
//! Default config path: ~/.config/mousekeys/config.toml

use anyhow::{anyhow, bail, Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::input::keycodes::{self, KEY_MAX};
use crate::mapping::{ButtonAction, MappingTable};
use crate::uinput::{DeviceIdentity, UINPUT_MAX_NAME_SIZE};

/// Application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Virtual device settings
    pub device: DeviceConfig,
    /// Injection timing
    pub timing: TimingConfig,
    /// Button mappings, first match wins
    pub mapping: Vec<MappingEntry>,
}

/// Virtual keyboard identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Name shown to tools that enumerate input devices
    pub name: String,
    /// Bus type (0x03 = USB)
    pub bustype: u16,
    pub vendor: u16,
    pub product: u16,
    pub version: u16,
    /// uinput character device
    pub uinput_path: String,
}

/// Injection timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Pause after every injected record in microseconds.
    /// Some applications drop keys that arrive in a tight burst.
    pub event_delay_us: u64,
}

/// One `[[mapping]]` entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingEntry {
    /// Source button: name (BTN_EXTRA) or code (0x114)
    pub button: String,
    /// Keys pressed together, in order
    pub keys: Vec<String>,
}

impl MappingEntry {
    fn new(button: &str, keys: &[&str]) -> Self {
        Self {
            button: button.to_string(),
            keys: keys.iter().map(|k| k.to_string()).collect(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device: DeviceConfig::default(),
            timing: TimingConfig::default(),
            mapping: vec![
                MappingEntry::new("BTN_EXTRA", &["KEY_LEFTCTRL", "KEY_PAGEDOWN"]),
                MappingEntry::new("BTN_SIDE", &["KEY_LEFTCTRL", "KEY_PAGEUP"]),
            ],
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: "MouseMapperPseudoDevice".to_string(),
            bustype: 0x03,
            vendor: 0x1234,
            product: 0x5678,
            version: 0,
            uinput_path: "/dev/uinput".to_string(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            event_delay_us: 1000,
        }
    }
}

/// Commented template written by `--init-config`
const CONFIG_TEMPLATE: &str = r#"# mousekeys configuration

[device]
# Name of the virtual keyboard as seen by other input tools
name = "MouseMapperPseudoDevice"
bustype = 0x03
vendor = 0x1234
product = 0x5678
version = 0
uinput_path = "/dev/uinput"

[timing]
# Pause after each injected event (microseconds)
event_delay_us = 1000

# Buttons and keys use names from linux/input-event-codes.h or numeric codes.
# Keys are pressed in order, then released in the same order.

[[mapping]]
button = "BTN_EXTRA"
keys = ["KEY_LEFTCTRL", "KEY_PAGEDOWN"]

[[mapping]]
button = "BTN_SIDE"
keys = ["KEY_LEFTCTRL", "KEY_PAGEUP"]
"#;

impl Config {
    /// System-wide config path
    const SYSTEM_CONFIG_PATH: &'static str = "/etc/mousekeys/config.toml";

    /// Get the path that would be used for loading config
    /// Returns None if using built-in defaults
    pub fn config_path() -> Option<PathBuf> {
        // 1. MOUSEKEYS_CONFIG environment variable
        if let Ok(path) = std::env::var("MOUSEKEYS_CONFIG") {
            let p = Path::new(&path);
            if p.exists() {
                return Some(p.to_path_buf());
            }
        }

        // 2. User config: ~/.config/mousekeys/config.toml
        if let Some(path) = default_config_path() {
            if path.exists() {
                return Some(path);
            }
        }

        // 3. System config: /etc/mousekeys/config.toml
        let system_config = Path::new(Self::SYSTEM_CONFIG_PATH);
        if system_config.exists() {
            return Some(system_config.to_path_buf());
        }

        None
    }

    /// Load configuration with priority:
    /// 1. `explicit` path (errors are fatal)
    /// 2. MOUSEKEYS_CONFIG environment variable
    /// 3. ~/.config/mousekeys/config.toml (user config)
    /// 4. /etc/mousekeys/config.toml (system config)
    /// 5. Built-in defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            let config = Self::load_from_file(path)?;
            info!("Loaded config: {}", path.display());
            return Ok(config);
        }

        if let Some(path) = Self::config_path() {
            match Self::load_from_file(&path) {
                Ok(config) => {
                    info!("Loaded config: {}", path.display());
                    return Ok(config);
                }
                Err(e) => {
                    warn!("Failed to load config {}: {:#}", path.display(), e);
                }
            }
        }
        info!("Using built-in default config");
        Ok(Self::default())
    }

    /// Load and validate settings from specified path
    fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    /// Parse and validate TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configs the event loop cannot run with
    pub fn validate(&self) -> Result<()> {
        self.mapping_table()?;
        if self.device.name.is_empty() {
            bail!("device.name must not be empty");
        }
        if self.device.name.len() >= UINPUT_MAX_NAME_SIZE {
            warn!(
                "device.name longer than {} bytes will be truncated",
                UINPUT_MAX_NAME_SIZE - 1
            );
        }
        Ok(())
    }

    /// Resolve names and build the mapping table
    pub fn mapping_table(&self) -> Result<MappingTable> {
        if self.mapping.is_empty() {
            bail!("no [[mapping]] entries configured");
        }
        let actions = self
            .mapping
            .iter()
            .map(|entry| {
                let button = resolve_code(&entry.button)?;
                let keys = entry
                    .keys
                    .iter()
                    .map(|k| resolve_code(k))
                    .collect::<Result<Vec<_>>>()?;
                ButtonAction::new(button, keys)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(MappingTable::new(actions))
    }

    pub fn identity(&self) -> DeviceIdentity {
        DeviceIdentity {
            name: self.device.name.clone(),
            bustype: self.device.bustype,
            vendor: self.device.vendor,
            product: self.device.product,
            version: self.device.version,
        }
    }

    pub fn uinput_path(&self) -> &Path {
        Path::new(&self.device.uinput_path)
    }

    pub fn event_delay(&self) -> Duration {
        Duration::from_micros(self.timing.event_delay_us)
    }

    /// Effective configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    /// Write the commented default template to the user config path
    ///
    /// Refuses to overwrite an existing file unless `force` is set.
    pub fn write_default_config(force: bool) -> Result<PathBuf> {
        let path = default_config_path()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;
        Self::write_template(&path, force)?;
        Ok(path)
    }

    fn write_template(path: &Path, force: bool) -> Result<()> {
        if path.exists() && !force {
            bail!(
                "Config file already exists: {} (use --force to overwrite)",
                path.display()
            );
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(path, CONFIG_TEMPLATE)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Config written: {}", path.display());
        Ok(())
    }
}

fn resolve_code(name: &str) -> Result<u16> {
    let code = keycodes::parse_code(name).ok_or_else(|| anyhow!("unknown key name: {}", name))?;
    if code > KEY_MAX {
        bail!("code {} (0x{:x}) exceeds KEY_MAX", name, code);
    }
    Ok(code)
}

/// User config path (~/.config/mousekeys/config.toml)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("mousekeys").join("config.toml"))
}
