//! Wall-clock pacing.
//!
//! A timer thread posts a wake message every 13,353 microseconds; the main
//! loop blocks on it whenever the master's sync counter crosses its quantum.
//! Pending wakes coalesce (the channel holds one), so a slow stretch does
//! not bank extra speed afterwards. Without a pacer the loop free-runs.

use std::sync::mpsc::{Receiver, TrySendError, sync_channel};
use std::thread;
use std::time::Duration;

/// Timer period matching the emulated clock: 8192 cycles at 613.4 kHz.
const TICK: Duration = Duration::from_micros(13_353);

pub struct Pacer {
    wake: Receiver<()>,
}

impl Pacer {
    pub fn start() -> Self {
        let (tx, wake) = sync_channel::<()>(1);
        thread::Builder::new()
            .name("pacer".to_string())
            .spawn(move || {
                loop {
                    thread::sleep(TICK);
                    match tx.try_send(()) {
                        Ok(()) | Err(TrySendError::Full(())) => {}
                        Err(TrySendError::Disconnected(())) => break,
                    }
                }
            })
            .expect("failed to spawn pacer thread");
        Self { wake }
    }

    /// Block until the next timer tick.
    pub fn wait(&self) {
        let _ = self.wake.recv();
    }
}
