//! Piezo speaker on slave P15, modelled as a 1-bit sample stream.
//!
//! Every MCU cycle pushes one of {+1, 0, -1} into a bounded ring shared
//! with the host audio thread: +1 while the pin is high, -1 while it is low
//! and the silence counter is still running, 0 once silence has saturated.
//! The mixer averages 14 ring entries per output sample, which lands the
//! 612.9 kHz cycle stream on 44.1 kHz mono.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::cpu::Hd6301;
use crate::cpu::hd6301::reg;
use crate::mem::Memory;

/// MCU cycles folded into each host audio sample.
pub const SAMPLE_FACTOR: usize = 14;
/// Ring capacity; comfortably above the host buffer size times the factor.
pub const FIFO_SIZE: usize = 32768;
/// Low cycles until the stream decays to true silence.
const OFF_TICK_COUNT: u32 = 2000;

/// Sample ring shared between the emulation loop and the audio callback.
pub type PiezoRing = Arc<Mutex<VecDeque<i8>>>;

pub struct Piezo {
    ring: PiezoRing,
    off_ticks: u32,
    sync_catchup: u16,
}

impl Piezo {
    pub fn new() -> Self {
        Self {
            ring: Arc::new(Mutex::new(VecDeque::with_capacity(FIFO_SIZE))),
            off_ticks: OFF_TICK_COUNT,
            sync_catchup: 0,
        }
    }

    /// Clone the ring handle for the audio consumer.
    pub fn ring(&self) -> PiezoRing {
        Arc::clone(&self.ring)
    }

    /// Push one sample per MCU cycle since the last step. New samples are
    /// dropped when the ring is full.
    pub fn step(&mut self, slave: &Hd6301, slave_mem: &Memory) {
        let mut ring = self.ring.lock().unwrap();
        while self.sync_catchup != slave.sync_counter {
            let sample = if slave_mem.peek(reg::PORT_1) & 0x20 != 0 {
                self.off_ticks = 0;
                1
            } else if self.off_ticks >= OFF_TICK_COUNT {
                0
            } else {
                self.off_ticks += 1;
                -1
            };

            if ring.len() < FIFO_SIZE {
                ring.push_back(sample);
            }
            self.sync_catchup = self.sync_catchup.wrapping_add(1);
        }
    }
}

impl Default for Piezo {
    fn default() -> Self {
        Self::new()
    }
}

/// Consumer side: folds ring entries into host audio samples.
pub struct PiezoMixer {
    ring: PiezoRing,
    volume: i16,
}

impl PiezoMixer {
    pub fn new(ring: PiezoRing, volume: i16) -> Self {
        Self { ring, volume }
    }

    /// Average [`SAMPLE_FACTOR`] ring entries; an empty ring reads neutral.
    fn mix(&mut self) -> i16 {
        let mut ring = self.ring.lock().unwrap();
        let mut sample: i16 = 0;
        for _ in 0..SAMPLE_FACTOR {
            sample += ring.pop_front().unwrap_or(0) as i16;
        }
        sample / SAMPLE_FACTOR as i16
    }

    /// Next sample as unsigned 8-bit PCM centred on 127.
    pub fn next_u8(&mut self) -> u8 {
        (127 + self.mix() * self.volume) as u8
    }

    /// Next sample as float PCM normalized by 128.
    pub fn next_f32(&mut self) -> f32 {
        self.mix() as f32 * (self.volume as f32 / 128.0)
    }
}
