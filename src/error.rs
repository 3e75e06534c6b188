//! Error taxonomy
//!
//! Every fatal condition unwinds to the lifecycle teardown as one of these.
//! Grab contention and device removal are not errors (see `input::device`
//! and `event_loop::LoopOutcome`).

use std::io;
use std::path::PathBuf;

use nix::errno::Errno;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MouseKeysError {
    /// Wrong invocation
    #[error("{0}")]
    Argument(String),

    /// Mapping or device settings unusable
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Physical input device could not be opened
    #[error("cannot open {}: {source}", path.display())]
    DeviceOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A uinput setup step was rejected
    #[error("failed to create uinput keyboard device ({step}): {source}")]
    DeviceCreation {
        step: &'static str,
        #[source]
        source: io::Error,
    },

    /// Short or failed read from the physical device
    #[error("error reading input device: expected {expected} bytes, got {got}")]
    MalformedRead {
        expected: usize,
        got: usize,
        #[source]
        source: Option<Errno>,
    },

    /// Readability wait failed for a reason other than a signal
    #[error("waiting for input device failed: {0}")]
    Wait(#[source] Errno),

    /// Write to the virtual device did not complete
    #[error("failed to inject event (type {kind}, code {code}): {source}")]
    Injection {
        kind: u16,
        code: u16,
        #[source]
        source: io::Error,
    },

    /// Cancellation handlers could not be installed
    #[error("failed to install signal handlers: {0}")]
    Signal(#[source] Errno),
}

impl MouseKeysError {
    /// Extra advice shown after the error message, if any
    pub fn hint(&self) -> Option<String> {
        match self {
            MouseKeysError::DeviceOpen { path, source }
                if source.kind() == io::ErrorKind::PermissionDenied
                    && !nix::unistd::getuid().is_root() =>
            {
                Some(format!(
                    "You do not have access to {}. Try running mousekeys as root instead.",
                    path.display()
                ))
            }
            MouseKeysError::DeviceCreation { source, .. }
                if source.kind() == io::ErrorKind::PermissionDenied =>
            {
                Some("Write access to /dev/uinput is required (root or the uinput group).".into())
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_read_message() {
        let err = MouseKeysError::MalformedRead {
            expected: 24,
            got: 7,
            source: None,
        };
        assert_eq!(
            err.to_string(),
            "error reading input device: expected 24 bytes, got 7"
        );
        assert!(err.hint().is_none());
    }

    #[test]
    fn test_device_open_message() {
        let err = MouseKeysError::DeviceOpen {
            path: PathBuf::from("/dev/input/event99"),
            source: io::Error::from(io::ErrorKind::NotFound),
        };
        assert!(err.to_string().starts_with("cannot open /dev/input/event99"));
    }
}
