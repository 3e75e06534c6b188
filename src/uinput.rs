//! uinput virtual keyboard
//!
//! Creates the synthetic keyboard that injected chords come from.
//! Registration order: EV_KEY event bit, every key bit, UI_DEV_SETUP,
//! then UI_DEV_CREATE makes the device visible.

use log::{debug, info, warn};
use std::collections::BTreeSet;
use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::Path;

use crate::error::MouseKeysError;
use crate::input::keycodes::{self, EV_KEY};
use crate::input::InputEvent;
use crate::ioctl_helpers::{ioctl_no_arg, ioctl_with_int_arg, ioctl_with_ref_arg};
use crate::synth::{write_record, EventSink};

// uinput ioctls from <linux/uinput.h>
const UI_DEV_CREATE: libc::c_ulong = 0x5501;
const UI_DEV_DESTROY: libc::c_ulong = 0x5502;
/// _IOW('U', 3, struct uinput_setup)
const UI_DEV_SETUP: libc::c_ulong = 0x405C_5503;
const UI_SET_EVBIT: libc::c_ulong = 0x4004_5564;
const UI_SET_KEYBIT: libc::c_ulong = 0x4004_5565;

pub const UINPUT_MAX_NAME_SIZE: usize = 80;

#[repr(C)]
struct InputId {
    bustype: u16,
    vendor: u16,
    product: u16,
    version: u16,
}

#[repr(C)]
struct UinputSetup {
    id: InputId,
    name: [libc::c_char; UINPUT_MAX_NAME_SIZE],
    ff_effects_max: u32,
}

/// Name and id the virtual device is registered with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub name: String,
    pub bustype: u16,
    pub vendor: u16,
    pub product: u16,
    pub version: u16,
}

impl DeviceIdentity {
    fn to_setup(&self) -> UinputSetup {
        let mut name = [0 as libc::c_char; UINPUT_MAX_NAME_SIZE];
        // Keep the trailing NUL
        for (dst, &src) in name
            .iter_mut()
            .zip(self.name.as_bytes().iter().take(UINPUT_MAX_NAME_SIZE - 1))
        {
            *dst = src as libc::c_char;
        }
        UinputSetup {
            id: InputId {
                bustype: self.bustype,
                vendor: self.vendor,
                product: self.product,
                version: self.version,
            },
            name,
            ff_effects_max: 0,
        }
    }
}

/// Registered uinput keyboard
///
/// Destroyed exactly once, either through [`VirtualKeyboard::destroy`] or on drop.
pub struct VirtualKeyboard {
    file: Option<File>,
    /// UI_DEV_CREATE succeeded, so UI_DEV_DESTROY is owed
    created: bool,
}

impl VirtualKeyboard {
    /// Open the uinput facility, declare `keys` and create the device
    pub fn create(
        uinput_path: &Path,
        identity: &DeviceIdentity,
        keys: &BTreeSet<u16>,
    ) -> Result<Self, MouseKeysError> {
        let file = OpenOptions::new()
            .write(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(uinput_path)
            .map_err(|source| MouseKeysError::DeviceCreation {
                step: "open uinput",
                source,
            })?;

        // Dropping `keyboard` on any error below closes the half-registered device
        let fd = file.as_raw_fd();
        let mut keyboard = Self {
            file: Some(file),
            created: false,
        };
        keyboard.register(fd, identity, keys)?;
        info!(
            "Virtual keyboard created: \"{}\" ({:04x}:{:04x}, {} keys)",
            identity.name,
            identity.vendor,
            identity.product,
            keys.len()
        );
        Ok(keyboard)
    }

    fn register(
        &mut self,
        fd: RawFd,
        identity: &DeviceIdentity,
        keys: &BTreeSet<u16>,
    ) -> Result<(), MouseKeysError> {
        ioctl_with_int_arg(fd, UI_SET_EVBIT, EV_KEY as libc::c_int, "UI_SET_EVBIT")
            .map_err(|e| creation_error("UI_SET_EVBIT", e))?;

        for &key in keys {
            ioctl_with_int_arg(fd, UI_SET_KEYBIT, key as libc::c_int, "UI_SET_KEYBIT")
                .map_err(|e| creation_error("UI_SET_KEYBIT", e))?;
            debug!("Declared key {}", keycodes::describe(key));
        }

        let setup = identity.to_setup();
        ioctl_with_ref_arg(fd, UI_DEV_SETUP, &setup, "UI_DEV_SETUP")
            .map_err(|e| creation_error("UI_DEV_SETUP", e))?;

        ioctl_no_arg(fd, UI_DEV_CREATE, "UI_DEV_CREATE")
            .map_err(|e| creation_error("UI_DEV_CREATE", e))?;
        self.created = true;
        Ok(())
    }

    /// Whether the handle still owns an open uinput connection
    #[cfg(test)]
    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    /// Remove the device and close the connection.
    ///
    /// Safe to call more than once. A failing UI_DEV_DESTROY is only logged;
    /// closing the descriptor removes the device anyway.
    pub fn destroy(&mut self) {
        let Some(file) = self.file.take() else {
            return;
        };
        if self.created {
            if let Err(e) = ioctl_no_arg(file.as_raw_fd(), UI_DEV_DESTROY, "UI_DEV_DESTROY") {
                warn!("UI_DEV_DESTROY failed: {}", e);
            }
            self.created = false;
        }
        drop(file);
        info!("Virtual keyboard destroyed");
    }

    #[cfg(test)]
    fn from_file(file: File, created: bool) -> Self {
        Self {
            file: Some(file),
            created,
        }
    }
}

fn creation_error(step: &'static str, source: io::Error) -> MouseKeysError {
    MouseKeysError::DeviceCreation { step, source }
}

impl EventSink for VirtualKeyboard {
    fn write_event(&mut self, event: &InputEvent) -> io::Result<()> {
        let file = self
            .file
            .as_ref()
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotConnected))?;
        write_record(file.as_raw_fd(), &event.to_bytes())
    }
}

impl Drop for VirtualKeyboard {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::keycodes::*;
    use crate::input::RECORD_SIZE;
    use std::io::Read;
    use std::os::unix::net::UnixStream;

    fn identity() -> DeviceIdentity {
        DeviceIdentity {
            name: "MouseMapperPseudoDevice".into(),
            bustype: 0x03,
            vendor: 0x1234,
            product: 0x5678,
            version: 0,
        }
    }

    fn socket_file() -> (File, UnixStream) {
        let (a, b) = UnixStream::pair().unwrap();
        (File::from(std::os::fd::OwnedFd::from(a)), b)
    }

    #[test]
    fn test_setup_struct_layout() {
        // Must match sizeof(struct uinput_setup) encoded in UI_DEV_SETUP
        assert_eq!(std::mem::size_of::<UinputSetup>(), 92);
        assert_eq!((UI_DEV_SETUP >> 16) & 0x3fff, 92);
    }

    #[test]
    fn test_setup_name_truncated_with_nul() {
        let mut id = identity();
        id.name = "x".repeat(200);
        let setup = id.to_setup();
        assert_eq!(setup.name[UINPUT_MAX_NAME_SIZE - 2], b'x' as libc::c_char);
        assert_eq!(setup.name[UINPUT_MAX_NAME_SIZE - 1], 0);
        assert_eq!(setup.id.vendor, 0x1234);
        assert_eq!(setup.id.product, 0x5678);
    }

    #[test]
    fn test_create_without_uinput_fails() {
        let keys: BTreeSet<u16> = [KEY_LEFTCTRL].into_iter().collect();
        let err = VirtualKeyboard::create(Path::new("/nonexistent/uinput"), &identity(), &keys)
            .err()
            .unwrap();
        assert!(matches!(
            err,
            MouseKeysError::DeviceCreation { step: "open uinput", .. }
        ));
    }

    #[test]
    fn test_create_rejected_by_non_uinput_node() {
        // /dev/null opens fine but rejects UI_SET_EVBIT
        let keys: BTreeSet<u16> = [KEY_LEFTCTRL].into_iter().collect();
        let err = VirtualKeyboard::create(Path::new("/dev/null"), &identity(), &keys)
            .err()
            .unwrap();
        assert!(matches!(
            err,
            MouseKeysError::DeviceCreation { step: "UI_SET_EVBIT", .. }
        ));
    }

    #[test]
    fn test_destroy_is_idempotent() {
        let (file, _peer) = socket_file();
        // UI_DEV_DESTROY fails on a socket; the error is swallowed
        let mut kbd = VirtualKeyboard::from_file(file, true);
        kbd.destroy();
        assert!(!kbd.is_open());
        kbd.destroy();
        drop(kbd);
    }

    #[test]
    fn test_destroy_partially_created() {
        let (file, _peer) = socket_file();
        let mut kbd = VirtualKeyboard::from_file(file, false);
        kbd.destroy();
        assert!(!kbd.is_open());
    }

    #[test]
    fn test_write_after_destroy_fails() {
        let (file, _peer) = socket_file();
        let mut kbd = VirtualKeyboard::from_file(file, false);
        kbd.destroy();
        assert!(kbd.write_event(&InputEvent::sync()).is_err());
    }

    #[test]
    fn test_write_event_sends_full_record() {
        let (file, mut peer) = socket_file();
        let mut kbd = VirtualKeyboard::from_file(file, false);
        kbd.write_event(&InputEvent::key_press(KEY_PAGEDOWN)).unwrap();

        let mut buf = [0u8; RECORD_SIZE];
        peer.read_exact(&mut buf).unwrap();
        assert_eq!(
            InputEvent::from_bytes(&buf),
            Some(InputEvent::key_press(KEY_PAGEDOWN))
        );
    }
}
