//! Shared break/panic signalling between the emulation loop, the CPUs and
//! the host signal handler.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// Break flag plus a one-slot panic message.
///
/// The flag may be set from a signal handler or another thread (it is an
/// atomic); the message slot is only ever filled by emulation code running
/// on the main loop. Both are consumed strictly between instructions.
#[derive(Default)]
pub struct BreakSignal {
    flag: AtomicBool,
    message: Mutex<Option<String>>,
}

impl BreakSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a break into the debugger (SIGINT path).
    pub fn request_break(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Record a fatal emulation fault and request a break.
    ///
    /// A later fault overwrites an unreported earlier one.
    pub fn panic(&self, message: String) {
        *self.message.lock().unwrap() = Some(message);
        self.flag.store(true, Ordering::Release);
    }

    /// True if a break has been requested and not yet taken.
    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Consume the break request, returning whether one was pending.
    pub fn take(&self) -> bool {
        self.flag.swap(false, Ordering::AcqRel)
    }

    /// Consume the pending panic message, if any.
    pub fn take_message(&self) -> Option<String> {
        self.message.lock().unwrap().take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn break_request_is_consumed_once() {
        let signal = BreakSignal::new();
        assert!(!signal.is_set());
        signal.request_break();
        assert!(signal.is_set());
        assert!(signal.take());
        assert!(!signal.take());
    }

    #[test]
    fn panic_sets_flag_and_message() {
        let signal = BreakSignal::new();
        signal.panic("DAA not implemented!".to_string());
        assert!(signal.take());
        assert_eq!(signal.take_message().as_deref(), Some("DAA not implemented!"));
        assert_eq!(signal.take_message(), None);
    }
}
