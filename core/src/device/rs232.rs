//! Bit-banged RS-232C on the HX-20's serial port, one bit every 512 MCU
//! cycles (1200 baud at the 612.9 kHz slave clock).
//!
//! The load side shifts file bytes LSB-first onto slave P20 through
//! start/bit/stop/idle slots; on EOF a 0x1A byte is substituted and the file
//! closes after its frame completes. The save side samples master P21, but
//! only on cycles where the CPU flagged the pin as freshly driven; a 0x1A
//! data byte closes the save file instead of being written.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

use crate::cpu::Hd6301;
use crate::cpu::hd6301::reg;
use crate::mem::Memory;

/// MCU cycles per bit slot.
const BIT_CYCLES: u16 = 512;
/// Soft end-of-file marker in the byte stream.
const EOF_BYTE: u8 = 0x1A;

#[derive(Clone, Copy, PartialEq)]
enum SaveState {
    WaitStart,
    Bit(u8),
    Stop,
}

#[derive(Clone, Copy, PartialEq)]
enum LoadState {
    /// Line held high after power-up, before the first frame.
    Init,
    Start,
    Bit(u8),
    Stop,
    /// An extra idle slot between frames; the receiver needs it.
    Idle,
}

pub struct Rs232 {
    save_sink: Option<Box<dyn Write>>,
    save_state: SaveState,
    save_byte: u8,

    load_source: Option<Box<dyn Read>>,
    load_state: LoadState,
    load_byte: u8,
    load_eof: bool,
    bit_clock: u16,

    sync_catchup: u16,
}

impl Rs232 {
    pub fn new() -> Self {
        Self {
            save_sink: None,
            save_state: SaveState::WaitStart,
            save_byte: 0,
            load_source: None,
            load_state: LoadState::Init,
            load_byte: 0,
            load_eof: false,
            bit_clock: 0,
            sync_catchup: 0,
        }
    }

    pub fn save_active(&self) -> bool {
        self.save_sink.is_some()
    }

    pub fn load_active(&self) -> bool {
        self.load_source.is_some()
    }

    pub fn load_file(&mut self, path: &Path) -> io::Result<()> {
        self.attach_load(Box::new(File::open(path)?))
    }

    pub fn save_file(&mut self, path: &Path) -> io::Result<()> {
        self.attach_save(Box::new(File::create(path)?))
    }

    /// Attach a byte source to the load channel (for testing).
    pub fn attach_load(&mut self, source: Box<dyn Read>) -> io::Result<()> {
        if self.load_source.is_some() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                "RS-232 load already in progress",
            ));
        }
        self.load_eof = false;
        self.load_source = Some(source);
        Ok(())
    }

    /// Attach a byte sink to the save channel (for testing).
    pub fn attach_save(&mut self, sink: Box<dyn Write>) -> io::Result<()> {
        if self.save_sink.is_some() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                "RS-232 save already in progress",
            ));
        }
        self.save_sink = Some(sink);
        Ok(())
    }

    fn save_tick(&mut self, bit: bool) {
        match self.save_state {
            SaveState::WaitStart => {
                if !bit {
                    self.save_byte = 0;
                    self.save_state = SaveState::Bit(0);
                }
            }
            SaveState::Bit(n) => {
                self.save_byte |= (bit as u8) << n;
                self.save_state = if n < 7 { SaveState::Bit(n + 1) } else { SaveState::Stop };
            }
            SaveState::Stop => {
                if self.save_byte == EOF_BYTE {
                    self.save_sink = None;
                } else if let Some(sink) = self.save_sink.as_mut() {
                    // A failed write drops the byte; the stream self-heals.
                    if let Err(e) = sink.write_all(&[self.save_byte]) {
                        log::warn!("rs232: save write failed: {e}");
                    }
                }
                self.save_state = SaveState::WaitStart;
            }
        }
    }

    fn load_slot(&mut self, slave_mem: &mut Memory) {
        let set_p20 = |mem: &mut Memory, high: bool| {
            let port = mem.peek(reg::PORT_2);
            mem.poke(reg::PORT_2, if high { port | 0x01 } else { port & !0x01 });
        };

        match self.load_state {
            LoadState::Init => set_p20(slave_mem, true),
            LoadState::Start => {
                let mut byte = [0u8];
                let source = self.load_source.as_mut().unwrap();
                self.load_byte = match source.read(&mut byte) {
                    Ok(1) => byte[0],
                    _ => {
                        self.load_eof = true;
                        EOF_BYTE
                    }
                };
                set_p20(slave_mem, false);
            }
            LoadState::Bit(n) => set_p20(slave_mem, (self.load_byte >> n) & 1 != 0),
            LoadState::Stop | LoadState::Idle => set_p20(slave_mem, true),
        }

        self.load_state = match self.load_state {
            LoadState::Init | LoadState::Idle => LoadState::Start,
            LoadState::Start => LoadState::Bit(0),
            LoadState::Bit(n) if n < 7 => LoadState::Bit(n + 1),
            LoadState::Bit(_) => LoadState::Stop,
            LoadState::Stop => LoadState::Idle,
        };

        // The frame is complete once the idle slot has been queued.
        if self.load_state == LoadState::Start && self.load_eof {
            self.load_source = None;
        }
    }

    /// Advance both channels to the slave MCU's sync counter.
    pub fn step(
        &mut self,
        master: &mut Hd6301,
        master_mem: &Memory,
        slave: &Hd6301,
        slave_mem: &mut Memory,
    ) {
        while self.sync_catchup != slave.sync_counter {
            if self.save_sink.is_some() && master.p21_set {
                let bit = master_mem.peek(reg::PORT_2) & 0x02 != 0;
                self.save_tick(bit);
                master.p21_set = false;
            }

            if self.load_source.is_none() {
                self.sync_catchup = self.sync_catchup.wrapping_add(1);
                self.bit_clock = BIT_CYCLES; // Keep the bit clock primed.
                continue;
            }

            self.bit_clock += 1;
            if self.bit_clock > BIT_CYCLES {
                self.bit_clock = 0;
                self.load_slot(slave_mem);
            }

            self.sync_catchup = self.sync_catchup.wrapping_add(1);
        }
    }
}

impl Default for Rs232 {
    fn default() -> Self {
        Self::new()
    }
}
