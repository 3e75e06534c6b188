//! Checked wrappers for ioctl system calls
//!
//! Keeps the unsafe `libc::ioctl` calls for evdev and uinput in one place.
//! Errors are returned as `io::Error` from errno; callers attach the step name.

use log::trace;
use std::io;
use std::os::unix::io::RawFd;

fn check(ret: libc::c_int, fd: RawFd, cmd_name: &str) -> io::Result<()> {
    if ret < 0 {
        let err = io::Error::last_os_error();
        trace!("{} failed on fd {}: {}", cmd_name, fd, err);
        Err(err)
    } else {
        Ok(())
    }
}

/// Execute an ioctl command that takes no argument.
///
/// # Arguments
/// * `fd` - File descriptor
/// * `cmd` - ioctl command number
/// * `cmd_name` - Human-readable name for trace output
pub fn ioctl_no_arg(fd: RawFd, cmd: libc::c_ulong, cmd_name: &str) -> io::Result<()> {
    let ret = unsafe { libc::ioctl(fd, cmd) };
    check(ret, fd, cmd_name)
}

/// Execute an ioctl command with a const argument (passed by reference).
///
/// The argument type must match what the ioctl expects.
pub fn ioctl_with_ref_arg<T>(
    fd: RawFd,
    cmd: libc::c_ulong,
    arg: &T,
    cmd_name: &str,
) -> io::Result<()> {
    let ret = unsafe { libc::ioctl(fd, cmd, arg as *const T) };
    check(ret, fd, cmd_name)
}

/// Execute an ioctl command with an integer argument, retrying on EINTR.
pub fn ioctl_with_int_arg(
    fd: RawFd,
    cmd: libc::c_ulong,
    arg: libc::c_int,
    cmd_name: &str,
) -> io::Result<()> {
    loop {
        let ret = unsafe { libc::ioctl(fd, cmd, arg) };
        match check(ret, fd, cmd_name) {
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            other => return other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::io::AsRawFd;
    use std::os::unix::net::UnixStream;

    // 'E' 0x90: EVIOCGRAB, not understood by sockets
    const EVIOCGRAB: libc::c_ulong = 0x4004_4590;

    #[test]
    fn test_rejected_ioctl_reports_errno() {
        let (a, _b) = UnixStream::pair().unwrap();
        let err = ioctl_with_int_arg(a.as_raw_fd(), EVIOCGRAB, 1, "EVIOCGRAB").unwrap_err();
        assert!(err.raw_os_error().is_some());
    }

    #[test]
    fn test_bad_fd() {
        let err = ioctl_no_arg(-1, 0x5501, "UI_DEV_CREATE").unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::EBADF));
    }
}
