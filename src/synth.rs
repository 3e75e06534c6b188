//! Key-chord synthesis
//!
//! Turns a key sequence into a press / sync / release / sync burst on an
//! [`EventSink`] (the virtual keyboard, or a recorder in tests).

use log::{debug, warn};
use nix::errno::Errno;
use std::io;
use std::os::unix::io::RawFd;
use std::time::Duration;

use crate::error::MouseKeysError;
use crate::input::keycodes;
use crate::input::InputEvent;

/// Destination for synthesized events
pub trait EventSink {
    /// Transmit one complete record
    fn write_event(&mut self, event: &InputEvent) -> io::Result<()>;
}

/// Write a whole record, retrying partial writes.
///
/// Fails if the descriptor reports an error before the record is complete.
pub fn write_record(fd: RawFd, mut bytes: &[u8]) -> io::Result<()> {
    while !bytes.is_empty() {
        match nix::unistd::write(fd, bytes) {
            Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
            Ok(n) => bytes = &bytes[n..],
            Err(Errno::EINTR) => continue,
            Err(e) => return Err(io::Error::from(e)),
        }
    }
    Ok(())
}

/// Emits press/release bursts with a fixed pause after every record
pub struct Synthesizer {
    /// Some applications drop keys delivered in too tight a burst
    event_delay: Duration,
}

impl Synthesizer {
    pub fn new(event_delay: Duration) -> Self {
        Self { event_delay }
    }

    /// Press every key in order, sync, release every key in the same order, sync.
    ///
    /// On a write failure after some keys were pressed, one best-effort release
    /// of those keys is attempted before the error is returned.
    pub fn press_sequence<S: EventSink>(
        &self,
        sink: &mut S,
        keys: &[u16],
    ) -> Result<(), MouseKeysError> {
        debug!("Injecting chord: {}", keycodes::describe_chord(keys));

        let mut pressed = 0;
        for &key in keys {
            if let Err(e) = self.put(sink, InputEvent::key_press(key)) {
                self.release_after_failure(sink, &keys[..pressed]);
                return Err(e);
            }
            pressed += 1;
        }
        if let Err(e) = self.put(sink, InputEvent::sync()) {
            self.release_after_failure(sink, keys);
            return Err(e);
        }

        for &key in keys {
            if let Err(e) = self.put(sink, InputEvent::key_release(key)) {
                self.release_after_failure(sink, keys);
                return Err(e);
            }
        }
        self.put(sink, InputEvent::sync())
    }

    fn put<S: EventSink>(&self, sink: &mut S, event: InputEvent) -> Result<(), MouseKeysError> {
        sink.write_event(&event)
            .map_err(|source| MouseKeysError::Injection {
                kind: event.kind,
                code: event.code,
                source,
            })?;
        if !self.event_delay.is_zero() {
            std::thread::sleep(self.event_delay);
        }
        Ok(())
    }

    fn release_after_failure<S: EventSink>(&self, sink: &mut S, pressed: &[u16]) {
        if pressed.is_empty() {
            return;
        }
        warn!("Injection failed mid-chord, releasing {} key(s)", pressed.len());
        for &key in pressed {
            let _ = sink.write_event(&InputEvent::key_release(key));
        }
        let _ = sink.write_event(&InputEvent::sync());
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::input::keycodes::*;
    use crate::input::RECORD_SIZE;
    use std::io::Read;
    use std::os::unix::io::AsRawFd;
    use std::os::unix::net::UnixStream;

    /// Records every event; optionally fails the Nth write
    #[derive(Default)]
    pub(crate) struct RecordingSink {
        pub events: Vec<InputEvent>,
        pub fail_at: Option<usize>,
        pub writes: usize,
    }

    impl EventSink for RecordingSink {
        fn write_event(&mut self, event: &InputEvent) -> io::Result<()> {
            let n = self.writes;
            self.writes += 1;
            if self.fail_at == Some(n) {
                return Err(io::Error::from_raw_os_error(libc::EIO));
            }
            self.events.push(*event);
            Ok(())
        }
    }

    fn synth() -> Synthesizer {
        Synthesizer::new(Duration::ZERO)
    }

    #[test]
    fn test_burst_order() {
        let mut sink = RecordingSink::default();
        synth()
            .press_sequence(&mut sink, &[KEY_LEFTCTRL, KEY_PAGEDOWN])
            .unwrap();
        assert_eq!(
            sink.events,
            vec![
                InputEvent::key_press(KEY_LEFTCTRL),
                InputEvent::key_press(KEY_PAGEDOWN),
                InputEvent::sync(),
                InputEvent::key_release(KEY_LEFTCTRL),
                InputEvent::key_release(KEY_PAGEDOWN),
                InputEvent::sync(),
            ]
        );
    }

    #[test]
    fn test_burst_length_is_2n_plus_2() {
        for n in 1..=5usize {
            let keys: Vec<u16> = (0..n as u16).map(|i| 30 + i).collect();
            let mut sink = RecordingSink::default();
            synth().press_sequence(&mut sink, &keys).unwrap();
            assert_eq!(sink.events.len(), 2 * n + 2);
            assert_eq!(sink.events[n], InputEvent::sync());
            assert_eq!(sink.events[2 * n + 1], InputEvent::sync());
        }
    }

    #[test]
    fn test_duplicate_keys_allowed() {
        let mut sink = RecordingSink::default();
        synth().press_sequence(&mut sink, &[KEY_UP, KEY_UP]).unwrap();
        assert_eq!(sink.events.len(), 6);
    }

    #[test]
    fn test_failure_between_phases_releases_keys() {
        // writes: press ctrl(0), press pgdn(1), sync(2), release ctrl(3) fails
        let mut sink = RecordingSink {
            fail_at: Some(3),
            ..Default::default()
        };
        let err = synth()
            .press_sequence(&mut sink, &[KEY_LEFTCTRL, KEY_PAGEDOWN])
            .unwrap_err();
        assert!(matches!(
            err,
            MouseKeysError::Injection { kind: EV_KEY, code: KEY_LEFTCTRL, .. }
        ));
        assert_eq!(
            &sink.events[3..],
            &[
                InputEvent::key_release(KEY_LEFTCTRL),
                InputEvent::key_release(KEY_PAGEDOWN),
                InputEvent::sync(),
            ]
        );
    }

    #[test]
    fn test_failure_on_first_press_emits_nothing() {
        let mut sink = RecordingSink {
            fail_at: Some(0),
            ..Default::default()
        };
        assert!(synth().press_sequence(&mut sink, &[KEY_HOME]).is_err());
        assert!(sink.events.is_empty());
    }

    #[test]
    fn test_write_record_delivers_whole_record() {
        let (tx, mut rx) = UnixStream::pair().unwrap();
        let bytes = InputEvent::key_press(KEY_PAGEUP).to_bytes();
        write_record(tx.as_raw_fd(), &bytes).unwrap();

        let mut out = [0u8; RECORD_SIZE];
        rx.read_exact(&mut out).unwrap();
        assert_eq!(
            InputEvent::from_bytes(&out),
            Some(InputEvent::key_press(KEY_PAGEUP))
        );
    }

    #[test]
    fn test_write_record_to_closed_peer_fails() {
        let (tx, rx) = UnixStream::pair().unwrap();
        drop(rx);
        let bytes = InputEvent::sync().to_bytes();
        assert!(write_record(tx.as_raw_fd(), &bytes).is_err());
    }
}
