//! Physical input device
//!
//! Opens /dev/input/eventN read-only and non-blocking, probes for a
//! competing exclusive grab, and feeds raw records to the event loop.

use log::{debug, info};
use nix::errno::Errno;
use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

use crate::error::MouseKeysError;
use crate::event_loop::EventSource;
use crate::ioctl_helpers::ioctl_with_int_arg;

/// _IOW('E', 0x90, int)
const EVIOCGRAB: libc::c_ulong = 0x4004_4590;

/// Result of the transient grab probe
#[derive(Debug)]
pub enum GrabStatus {
    /// Nobody else holds an exclusive grab
    Available,
    /// Another process holds an exclusive grab (EBUSY)
    Held,
    /// The grab ioctl failed for another reason
    Unknown(io::Error),
}

/// Open evdev node, owned for the lifetime of the process
pub struct PhysicalDevice {
    file: File,
    path: PathBuf,
}

impl PhysicalDevice {
    /// Open the device node for non-blocking read-only access
    pub fn open(path: &Path) -> Result<Self, MouseKeysError> {
        let file = OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(path)
            .map_err(|source| MouseKeysError::DeviceOpen {
                path: path.to_path_buf(),
                source,
            })?;

        info!("Input device opened: {}", path.display());
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Grab and immediately ungrab the device.
    ///
    /// Only detects contention; the device is never kept grabbed.
    pub fn probe_grab(&self) -> GrabStatus {
        let fd = self.file.as_raw_fd();
        match ioctl_with_int_arg(fd, EVIOCGRAB, 1, "EVIOCGRAB") {
            Ok(()) => {
                if let Err(e) = ioctl_with_int_arg(fd, EVIOCGRAB, 0, "EVIOCGRAB release") {
                    debug!("Releasing probe grab failed: {}", e);
                }
                GrabStatus::Available
            }
            Err(e) if e.raw_os_error() == Some(libc::EBUSY) => GrabStatus::Held,
            Err(e) => GrabStatus::Unknown(e),
        }
    }
}

impl EventSource for PhysicalDevice {
    fn wait_readable(&mut self) -> nix::Result<()> {
        let mut pfd = libc::pollfd {
            fd: self.file.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        };
        // No timeout: data, a signal, or device removal ends the wait
        let ret = unsafe { libc::poll(&mut pfd, 1, -1) };
        if ret < 0 {
            return Err(Errno::last());
        }
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> nix::Result<usize> {
        nix::unistd::read(self.file.as_raw_fd(), buf)
    }
}

impl Drop for PhysicalDevice {
    fn drop(&mut self) {
        debug!("Input device closed: {}", self.path.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_missing_device() {
        let err = PhysicalDevice::open(Path::new("/nonexistent/input/event0"))
            .err()
            .unwrap();
        match err {
            MouseKeysError::DeviceOpen { path, source } => {
                assert_eq!(path, Path::new("/nonexistent/input/event0"));
                assert_eq!(source.kind(), io::ErrorKind::NotFound);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_probe_grab_on_non_evdev_file() {
        // /dev/null rejects EVIOCGRAB with ENOTTY: not contention
        let dev = PhysicalDevice::open(Path::new("/dev/null")).unwrap();
        assert!(matches!(dev.probe_grab(), GrabStatus::Unknown(_)));
    }

    #[test]
    fn test_read_from_empty_nonblocking_device() {
        let mut dev = PhysicalDevice::open(Path::new("/dev/null")).unwrap();
        let mut buf = [0u8; 32];
        assert_eq!(dev.read(&mut buf), Ok(0));
    }
}
