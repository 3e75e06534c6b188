//! Input handling
//!
//! - Physical evdev device access (open, grab probe, batched reads)
//! - `input_event` record layout
//! - Linux event code constants

pub mod device;
pub mod event;
pub mod keycodes;

pub use device::{GrabStatus, PhysicalDevice};
pub use event::{InputEvent, RecordBuffer, RECORD_SIZE};
