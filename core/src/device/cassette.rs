//! External cassette interface on the slave MCU.
//!
//! Two half-duplex channels: save taps slave P33, load drives slave P32.
//! Both sides speak canonical 44,100 Hz mono 8-bit unsigned RIFF/WAVE, with
//! the MCU-clock bitstream decimated 14:1. The header is written with zero
//! chunk sizes when a save opens and patched with the real byte count when
//! the idle threshold closes it. Header fields are explicit little-endian
//! bytes; nothing here depends on host byte order.

use std::fmt;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::cpu::Hd6301;
use crate::cpu::hd6301::reg;
use crate::mem::Memory;

/// HX-20 clock rate, the internal sample rate of both channels.
pub const INTERNAL_SAMPLE_RATE: u32 = 612_900;
pub const WAV_SAMPLE_RATE: u32 = 44_100;
/// MCU cycles per WAV sample (612,900 / 44,100, rounded).
pub const SAMPLE_FACTOR: u32 = 14;
/// Consecutive low samples before a save closes itself.
const SAVE_IDLE_STOP: u32 = 500_000;

const HEADER_SIZE: usize = 44;

/// Seekable sink for the WAV save side (the header is patched on close).
pub trait WavSink: Write + Seek {}
impl<T: Write + Seek> WavSink for T {}

#[derive(Debug)]
pub enum CassetteError {
    /// A channel is already attached to a file.
    Busy,
    Io(io::Error),
    /// Not a RIFF/WAVE stream.
    NotWav,
    /// Playable input is mono 8-bit 44,100 Hz only.
    UnsupportedFormat,
}

impl fmt::Display for CassetteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Busy => write!(f, "cassette transfer already in progress"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::NotWav => write!(f, "not a WAV file"),
            Self::UnsupportedFormat => {
                write!(f, "only mono 8-bit {WAV_SAMPLE_RATE} Hz WAV input is supported")
            }
        }
    }
}

impl std::error::Error for CassetteError {}

impl From<io::Error> for CassetteError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

fn encode_header(data_bytes: u32) -> [u8; HEADER_SIZE] {
    let mut header = [0u8; HEADER_SIZE];
    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&(data_bytes.wrapping_add(36)).to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");
    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&16u32.to_le_bytes()); // fmt subchunk size
    header[20..22].copy_from_slice(&1u16.to_le_bytes()); // PCM
    header[22..24].copy_from_slice(&1u16.to_le_bytes()); // mono
    header[24..28].copy_from_slice(&WAV_SAMPLE_RATE.to_le_bytes());
    header[28..32].copy_from_slice(&WAV_SAMPLE_RATE.to_le_bytes()); // byte rate
    header[32..34].copy_from_slice(&1u16.to_le_bytes()); // block align
    header[34..36].copy_from_slice(&8u16.to_le_bytes()); // bits per sample
    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&data_bytes.to_le_bytes());
    header
}

struct SaveChannel {
    sink: Box<dyn WavSink>,
    sample_count: u32,
    internal_count: u32,
    idle_count: u32,
    high_seen: bool,
}

struct LoadChannel {
    source: Box<dyn Read>,
    internal_count: u32,
    sample: u8,
}

pub struct Cassette {
    save: Option<SaveChannel>,
    load: Option<LoadChannel>,
    sync_catchup: u16,
}

impl Cassette {
    pub fn new() -> Self {
        Self {
            save: None,
            load: None,
            sync_catchup: 0,
        }
    }

    pub fn save_active(&self) -> bool {
        self.save.is_some()
    }

    pub fn load_active(&self) -> bool {
        self.load.is_some()
    }

    /// Start saving into a new WAV file.
    pub fn save_file(&mut self, path: &Path) -> Result<(), CassetteError> {
        self.save_sink(Box::new(File::create(path)?))
    }

    /// Start saving into any seekable sink (for testing).
    pub fn save_sink(&mut self, mut sink: Box<dyn WavSink>) -> Result<(), CassetteError> {
        if self.save.is_some() {
            return Err(CassetteError::Busy);
        }
        sink.write_all(&encode_header(0))?;
        self.save = Some(SaveChannel {
            sink,
            sample_count: 0,
            internal_count: 0,
            idle_count: 0,
            high_seen: false,
        });
        Ok(())
    }

    /// Start replaying a WAV file.
    pub fn load_file(&mut self, path: &Path) -> Result<(), CassetteError> {
        self.load_source(Box::new(File::open(path)?))
    }

    /// Start replaying from any byte source (for testing).
    pub fn load_source(&mut self, mut source: Box<dyn Read>) -> Result<(), CassetteError> {
        if self.load.is_some() {
            return Err(CassetteError::Busy);
        }

        let mut header = [0u8; HEADER_SIZE];
        source.read_exact(&mut header).map_err(|_| CassetteError::NotWav)?;
        if &header[0..4] != b"RIFF" {
            return Err(CassetteError::NotWav);
        }
        let sample_rate = u32::from_le_bytes(header[24..28].try_into().unwrap());
        let channels = u16::from_le_bytes(header[22..24].try_into().unwrap());
        let bits = u16::from_le_bytes(header[34..36].try_into().unwrap());
        if sample_rate != WAV_SAMPLE_RATE || channels != 1 || bits != 8 {
            return Err(CassetteError::UnsupportedFormat);
        }

        self.load = Some(LoadChannel {
            source,
            internal_count: 0,
            sample: 0,
        });
        Ok(())
    }

    fn patch_header(channel: &mut SaveChannel) -> io::Result<()> {
        let header = encode_header(channel.sample_count);
        channel.sink.seek(SeekFrom::Start(4))?;
        channel.sink.write_all(&header[4..8])?;
        channel.sink.seek(SeekFrom::Start(40))?;
        channel.sink.write_all(&header[40..44])?;
        channel.sink.flush()
    }

    /// Patch the header with the final sizes and close the save channel.
    fn stop_save(channel: &mut SaveChannel) {
        if let Err(e) = Self::patch_header(channel) {
            log::warn!("cassette: failed to finalize WAV header: {e}");
        }
    }

    fn save_sample(channel: &mut SaveChannel, level: bool) {
        channel.internal_count += 1;
        if channel.internal_count % SAMPLE_FACTOR == 0 {
            let sample = if level { [0xFFu8] } else { [0x00u8] };
            if let Err(e) = channel.sink.write_all(&sample) {
                log::warn!("cassette: sample write failed: {e}");
                return;
            }
            channel.sample_count += 1;
        }
    }

    fn load_sample(channel: &mut LoadChannel) -> Result<bool, ()> {
        channel.internal_count += 1;
        if channel.internal_count % SAMPLE_FACTOR == 0 {
            let mut byte = [0u8];
            match channel.source.read(&mut byte) {
                Ok(1) => channel.sample = byte[0],
                // Short read: close the handle and substitute silence.
                _ => return Err(()),
            }
        }
        Ok(channel.sample > 128)
    }

    /// Catch up with the slave MCU's sync counter, one cycle at a time.
    pub fn step(&mut self, slave: &Hd6301, slave_mem: &mut Memory) {
        while self.sync_catchup != slave.sync_counter {
            if let Some(channel) = self.save.as_mut() {
                if slave_mem.peek(reg::PORT_3) & 0x08 != 0 {
                    // P33 high.
                    Self::save_sample(channel, true);
                    channel.idle_count = 0;
                    channel.high_seen = true;
                } else if channel.high_seen {
                    // Leading low samples before the first high are skipped.
                    Self::save_sample(channel, false);
                    channel.idle_count += 1;
                    if channel.idle_count >= SAVE_IDLE_STOP {
                        Self::stop_save(channel);
                        self.save = None;
                    }
                }
            }

            if let Some(channel) = self.load.as_mut() {
                match Self::load_sample(channel) {
                    Ok(true) => slave_mem.poke(reg::PORT_3, slave_mem.peek(reg::PORT_3) | 0x04),
                    Ok(false) => slave_mem.poke(reg::PORT_3, slave_mem.peek(reg::PORT_3) & !0x04),
                    Err(()) => {
                        slave_mem.poke(reg::PORT_3, slave_mem.peek(reg::PORT_3) & !0x04);
                        self.load = None;
                    }
                }
            }

            self.sync_catchup = self.sync_catchup.wrapping_add(1);
        }
    }
}

impl Default for Cassette {
    fn default() -> Self {
        Self::new()
    }
}
