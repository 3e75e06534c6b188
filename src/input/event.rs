//! Input event records
//!
//! `struct input_event` as read from /dev/input/eventN and written to /dev/uinput,
//! plus the bounded batch buffer used by the event loop.

use std::mem;

use super::keycodes::{EV_KEY, EV_SYN, SYN_REPORT, VALUE_PRESS, VALUE_RELEASE};

/// Number of records read per batch
pub const BATCH_RECORDS: usize = 64;

/// Size of one kernel `input_event` record in bytes
pub const RECORD_SIZE: usize = mem::size_of::<RawInputEvent>();

/// Kernel `struct input_event` layout
#[repr(C)]
#[derive(Clone, Copy)]
struct RawInputEvent {
    time: libc::timeval,
    type_: u16,
    code: u16,
    value: i32,
}

/// A single input event, without its timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputEvent {
    /// Event type (EV_KEY, EV_SYN, ...)
    pub kind: u16,
    /// Key / button / axis code
    pub code: u16,
    /// 0 = release, 1 = press, 2 = repeat for EV_KEY
    pub value: i32,
}

impl InputEvent {
    pub const fn new(kind: u16, code: u16, value: i32) -> Self {
        Self { kind, code, value }
    }

    pub const fn key_press(code: u16) -> Self {
        Self::new(EV_KEY, code, VALUE_PRESS)
    }

    pub const fn key_release(code: u16) -> Self {
        Self::new(EV_KEY, code, VALUE_RELEASE)
    }

    /// SYN_REPORT marker
    pub const fn sync() -> Self {
        Self::new(EV_SYN, SYN_REPORT, 0)
    }

    /// Decode one record. `bytes` must hold at least [`RECORD_SIZE`] bytes.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < RECORD_SIZE {
            return None;
        }
        // Byte buffers carry no alignment guarantee
        let raw = unsafe { std::ptr::read_unaligned(bytes.as_ptr() as *const RawInputEvent) };
        Some(Self {
            kind: raw.type_,
            code: raw.code,
            value: raw.value,
        })
    }

    /// Encode as a kernel record with a zero timestamp (uinput fills it in)
    pub fn to_bytes(&self) -> [u8; RECORD_SIZE] {
        let raw = RawInputEvent {
            time: libc::timeval {
                tv_sec: 0,
                tv_usec: 0,
            },
            type_: self.kind,
            code: self.code,
            value: self.value,
        };
        let mut out = [0u8; RECORD_SIZE];
        unsafe {
            std::ptr::copy_nonoverlapping(
                &raw as *const RawInputEvent as *const u8,
                out.as_mut_ptr(),
                RECORD_SIZE,
            );
        }
        out
    }
}

/// Bounded read buffer holding up to [`BATCH_RECORDS`] records
///
/// A trailing partial record is kept at the front of the buffer and completed
/// by the next read.
pub struct RecordBuffer {
    buf: Box<[u8]>,
    /// Bytes of an incomplete record carried over from the last batch
    pending: usize,
}

impl RecordBuffer {
    pub fn new() -> Self {
        Self {
            buf: vec![0u8; RECORD_SIZE * BATCH_RECORDS].into_boxed_slice(),
            pending: 0,
        }
    }

    /// Space available for the next read
    pub fn spare_mut(&mut self) -> &mut [u8] {
        &mut self.buf[self.pending..]
    }

    /// Bytes carried over from the previous read
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Account for `n` freshly read bytes and move every complete record into `out`.
    ///
    /// Returns the number of bytes that were available (carried + read).
    pub fn commit(&mut self, n: usize, out: &mut Vec<InputEvent>) -> usize {
        let available = (self.pending + n).min(self.buf.len());
        let complete = available / RECORD_SIZE * RECORD_SIZE;

        out.extend(
            self.buf[..complete]
                .chunks_exact(RECORD_SIZE)
                .filter_map(InputEvent::from_bytes),
        );

        let rest = available - complete;
        self.buf.copy_within(complete..available, 0);
        self.pending = rest;
        available
    }
}

impl Default for RecordBuffer {
    fn default() -> Self {
        Self::new()
    }
}
