//! Cooperative cancellation
//!
//! SIGINT/SIGTERM only flip a [`CancelToken`]; the event loop polls it.

use log::info;
use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use crate::error::MouseKeysError;

/// Flag shared with the signal handler (set once at startup)
static SIGNAL_FLAG: OnceLock<Arc<AtomicBool>> = OnceLock::new();

/// Shared stop request
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Install SIGINT and SIGTERM handlers that cancel `token`.
///
/// Installed without SA_RESTART: a blocking poll() returns EINTR.
/// Only the first token ever installed is signalled.
pub fn install_cancel_handlers(token: &CancelToken) -> Result<(), MouseKeysError> {
    let _ = SIGNAL_FLAG.set(token.flag.clone());

    let action = SigAction::new(
        SigHandler::Handler(cancel_signal_handler),
        SaFlags::empty(),
        SigSet::empty(),
    );
    for signal in [Signal::SIGINT, Signal::SIGTERM] {
        unsafe { sigaction(signal, &action) }.map_err(MouseKeysError::Signal)?;
    }
    info!("Signal handlers installed (SIGINT, SIGTERM)");
    Ok(())
}

extern "C" fn cancel_signal_handler(_signo: libc::c_int) {
    if let Some(flag) = SIGNAL_FLAG.get() {
        flag.store(true, Ordering::SeqCst);
    }
}
