//! Input event loop
//!
//! Blocks on the physical device, drains one batch of records at a time and
//! fires the mapped key chord for every button press.
//!
//! ```text
//!  WAITING ──readable──▶ DRAINING ──batch done──▶ WAITING
//!     │                     │
//!     │ ENODEV              │ cancel observed
//!     ▼                     ▼
//!  TERMINATED ◀──────── STOPPING
//! ```

use log::{debug, info, trace};
use nix::errno::Errno;

use crate::error::MouseKeysError;
use crate::input::keycodes::{self, VALUE_PRESS};
use crate::input::{InputEvent, RecordBuffer, RECORD_SIZE};
use crate::mapping::MappingTable;
use crate::signals::CancelToken;
use crate::synth::{EventSink, Synthesizer};

/// Source of raw `input_event` bytes
pub trait EventSource {
    /// Block until the source is readable. Returns `Err(EINTR)` when a signal
    /// interrupts the wait.
    fn wait_readable(&mut self) -> nix::Result<()>;

    /// Non-blocking read of raw record bytes
    fn read(&mut self, buf: &mut [u8]) -> nix::Result<usize>;
}

/// Loop state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Waiting,
    Draining,
    Stopping,
    Terminated,
}

/// Why the loop ended without error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopOutcome {
    /// Stop requested through the cancel token
    Cancelled,
    /// The device reported ENODEV (unplugged)
    DeviceRemoved,
}

pub struct EventLoop<'a, Src, Sink> {
    source: &'a mut Src,
    sink: &'a mut Sink,
    table: &'a MappingTable,
    synth: &'a Synthesizer,
    cancel: CancelToken,
    state: LoopState,
    buffer: RecordBuffer,
    batch: Vec<InputEvent>,
}

impl<'a, Src: EventSource, Sink: EventSink> EventLoop<'a, Src, Sink> {
    pub fn new(
        source: &'a mut Src,
        sink: &'a mut Sink,
        table: &'a MappingTable,
        synth: &'a Synthesizer,
        cancel: CancelToken,
    ) -> Self {
        Self {
            source,
            sink,
            table,
            synth,
            cancel,
            state: LoopState::Waiting,
            buffer: RecordBuffer::new(),
            batch: Vec::new(),
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    fn transition(&mut self, next: LoopState) {
        if self.state != next {
            trace!("event loop: {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }

    /// Run until cancelled, the device disappears, or a fatal error occurs.
    pub fn run(&mut self) -> Result<LoopOutcome, MouseKeysError> {
        let result = self.run_inner();
        self.transition(LoopState::Terminated);
        result
    }

    fn run_inner(&mut self) -> Result<LoopOutcome, MouseKeysError> {
        loop {
            if self.cancel.is_cancelled() {
                self.transition(LoopState::Stopping);
                info!("Stop requested, leaving event loop");
                return Ok(LoopOutcome::Cancelled);
            }

            self.transition(LoopState::Waiting);
            match self.source.wait_readable() {
                Ok(()) => {}
                // Interrupted by a signal: re-check the token
                Err(Errno::EINTR) => continue,
                Err(e) => return Err(MouseKeysError::Wait(e)),
            }
            if self.cancel.is_cancelled() {
                continue;
            }

            self.transition(LoopState::Draining);
            let n = match self.source.read(self.buffer.spare_mut()) {
                Ok(n) => n,
                Err(Errno::ENODEV) => {
                    info!("Input device removed, shutting down");
                    return Ok(LoopOutcome::DeviceRemoved);
                }
                Err(Errno::EAGAIN) | Err(Errno::EINTR) => {
                    trace!("Spurious wakeup, nothing to read");
                    continue;
                }
                Err(e) => {
                    return Err(MouseKeysError::MalformedRead {
                        expected: RECORD_SIZE,
                        got: self.buffer.pending(),
                        source: Some(e),
                    })
                }
            };

            self.batch.clear();
            let available = self.buffer.commit(n, &mut self.batch);
            if available < RECORD_SIZE {
                return Err(MouseKeysError::MalformedRead {
                    expected: RECORD_SIZE,
                    got: available,
                    source: None,
                });
            }

            self.process_batch()?;
            // Cancellation during the batch is honored at the top of the loop
            if self.cancel.is_cancelled() {
                self.transition(LoopState::Stopping);
            }
        }
    }

    /// Fire the mapped chord for every press record in the batch
    fn process_batch(&mut self) -> Result<(), MouseKeysError> {
        let batch = std::mem::take(&mut self.batch);
        let result = batch
            .iter()
            .try_for_each(|event| self.handle_event(event));
        self.batch = batch;
        result
    }

    fn handle_event(&mut self, event: &InputEvent) -> Result<(), MouseKeysError> {
        if event.kind != self.table.event_kind() || event.value != VALUE_PRESS {
            return Ok(());
        }
        if let Some(action) = self.table.lookup(event.code) {
            debug!("{} pressed", keycodes::describe(event.code));
            self.synth
                .press_sequence(&mut *self.sink, action.key_sequence())?;
        }
        Ok(())
    }
}
