//! Automatic program loading through the firmware's keyboard injection
//! locations.
//!
//! The monitor firmware polls a small auto-key block in master RAM:
//! KYISFL/KYISCN arm the mechanism, KYISPN reads 2 when the firmware wants
//! the next key, and KYISTK holds the injected keystrokes. A BASIC text
//! file is typed in byte by byte followed by `RUN`; an S-record file is
//! converted line by line into monitor set commands. The first injected
//! key selects BASIC ('2') or the MONITOR ('1') from the startup menu.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

use hx20_core::mem::Memory;

const KYISFL: u16 = 0x0165;
const KYISCN: u16 = 0x0166;
const KYISPN: u16 = 0x0167;
const KYISTK_0: u16 = 0x016F;
const KYISTK_1: u16 = 0x0170;

const BASIC_RUN: &[u8] = b"RUN";

enum State {
    BasicFile,
    BasicRun { index: usize },
    SrecNext,
    SrecLine { line: Vec<u8>, index: usize },
    End,
    Done,
}

pub struct Autoload {
    reader: BufReader<File>,
    state: State,
    startup_key: u8,
}

impl Autoload {
    /// Autoload a BASIC program text file.
    pub fn basic(path: &Path) -> io::Result<Self> {
        Ok(Self {
            reader: BufReader::new(File::open(path)?),
            state: State::BasicFile,
            startup_key: b'2',
        })
    }

    /// Autoload an S-record file into the MONITOR.
    pub fn srec(path: &Path) -> io::Result<Self> {
        Ok(Self {
            reader: BufReader::new(File::open(path)?),
            state: State::SrecNext,
            startup_key: b'1',
        })
    }

    /// Arm the firmware's auto-key block and queue the startup menu key.
    pub fn prime(&self, master_mem: &mut Memory) {
        master_mem.poke(KYISFL, 0x0A);
        master_mem.poke(KYISCN, 2);
        master_mem.poke(KYISTK_0, self.startup_key);
    }

    /// Loading keeps warp mode on until the final keystroke is delivered.
    pub fn wants_warp(&self) -> bool {
        !matches!(self.state, State::Done)
    }

    fn next_file_byte(&mut self) -> Option<u8> {
        let mut byte = [0u8];
        match self.reader.read(&mut byte) {
            Ok(1) => Some(byte[0]),
            _ => None,
        }
    }

    /// Convert the next S1 record into a monitor set command:
    /// `S<addr>\r` then one `XX\r` per data byte, terminated by `.\r`.
    fn next_srec_line(&mut self) -> Option<Vec<u8>> {
        let mut line = String::new();
        loop {
            line.clear();
            if self.reader.read_line(&mut line).ok()? == 0 {
                return None; // EOF
            }
            let record = line.trim_end();
            if !record.starts_with("S1") {
                continue; // Only 16-bit load addresses are supported.
            }
            let Some(count_field) = record.get(2..4) else {
                continue;
            };
            let Ok(byte_count) = u8::from_str_radix(count_field, 16) else {
                continue;
            };
            let Some(address) = record.get(4..8) else {
                continue;
            };

            let mut out = Vec::new();
            out.extend_from_slice(b"S");
            out.extend_from_slice(address.as_bytes());
            out.push(b'\r');

            // Data bytes sit between the address and the checksum.
            let data_end = (byte_count as usize) * 2 + 2;
            let mut i = 8;
            while i + 2 <= data_end && record.len() >= i + 2 {
                out.extend_from_slice(record[i..i + 2].as_bytes());
                out.push(b'\r');
                i += 2;
            }

            out.extend_from_slice(b".\r");
            return Some(out);
        }
    }

    /// Feed one keystroke whenever the firmware signals it is ready.
    pub fn step(&mut self, master_mem: &mut Memory) {
        if master_mem.peek(KYISPN) != 2 {
            return;
        }

        match &mut self.state {
            State::BasicFile => {
                let key = match self.next_file_byte() {
                    Some(byte) => byte,
                    None => {
                        self.state = if BASIC_RUN.len() > 1 {
                            State::BasicRun { index: 1 }
                        } else {
                            State::End
                        };
                        BASIC_RUN[0]
                    }
                };
                master_mem.poke(KYISTK_1, key);
                master_mem.poke(KYISPN, 1);
            }

            State::BasicRun { index } => {
                let key = BASIC_RUN[*index];
                *index += 1;
                if *index >= BASIC_RUN.len() {
                    self.state = State::End;
                }
                master_mem.poke(KYISTK_1, key);
                master_mem.poke(KYISPN, 1);
            }

            State::SrecNext => {
                self.state = match self.next_srec_line() {
                    Some(line) => State::SrecLine { line, index: 0 },
                    None => State::End,
                };
            }

            State::SrecLine { line, index } => {
                let key = line[*index];
                *index += 1;
                if *index >= line.len() {
                    self.state = State::SrecNext;
                }
                master_mem.poke(KYISTK_1, key);
                master_mem.poke(KYISPN, 1);
            }

            State::End => {
                master_mem.poke(KYISTK_1, b'\r');
                self.state = State::Done;
            }

            State::Done => {}
        }
    }
}
