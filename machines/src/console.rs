//! Console collaborator: the keyboard matrix the master scans and the LCD
//! controller cluster it writes to.
//!
//! Rendering and host keymap translation live outside this crate; what is
//! here is the machine-facing boundary. The keyboard is an 8-row matrix
//! with two return gates per row, active low. The LCD is six 40-column
//! bands driven by controllers 1..=6, decoded onto a 120x32 pixel surface
//! that a front-end may read. A read-address command arms a serial window
//! that answers the addressed pixel back on keyboard return gate B bit 7.

use std::str::FromStr;
use std::sync::Arc;

use hx20_core::cpu::hd6301::{Hd6301, reg, vector};
use hx20_core::mem::{LcdWrite, Memory, io};
use hx20_core::signal::BreakSignal;

pub const LCD_COLUMNS: usize = 120;
pub const LCD_ROWS: usize = 32;

/// Macro-ticks a key stays pressed before it auto-releases.
const KEYBOARD_RELEASE: u32 = 500;
/// Ticks the LCD serial read window stays armed.
const LCD_SERIAL_WINDOW: u32 = 10000;

const GATE_A: usize = 0;
const GATE_B: usize = 1;

/// Matrix scancodes. The low six bits of 0x00..=0x3F select row and gate-A
/// bit directly; the 0x40 block maps onto gate B.
pub mod scancode {
    pub const KEY_0: u8 = 0x00;
    pub const KEY_1: u8 = 0x01;
    pub const KEY_2: u8 = 0x02;
    pub const KEY_3: u8 = 0x03;
    pub const KEY_4: u8 = 0x04;
    pub const KEY_5: u8 = 0x05;
    pub const KEY_6: u8 = 0x06;
    pub const KEY_7: u8 = 0x07;
    pub const KEY_8: u8 = 0x08;
    pub const KEY_9: u8 = 0x09;
    pub const COLON: u8 = 0x0A;
    pub const SEMICOLON: u8 = 0x0B;
    pub const COMMA: u8 = 0x0C;
    pub const MINUS: u8 = 0x0D;
    pub const PERIOD: u8 = 0x0E;
    pub const SLASH: u8 = 0x0F;
    pub const AT: u8 = 0x10;
    pub const A: u8 = 0x11;
    pub const B: u8 = 0x12;
    pub const C: u8 = 0x13;
    pub const D: u8 = 0x14;
    pub const E: u8 = 0x15;
    pub const F: u8 = 0x16;
    pub const G: u8 = 0x17;
    pub const H: u8 = 0x18;
    pub const I: u8 = 0x19;
    pub const J: u8 = 0x1A;
    pub const K: u8 = 0x1B;
    pub const L: u8 = 0x1C;
    pub const M: u8 = 0x1D;
    pub const N: u8 = 0x1E;
    pub const O: u8 = 0x1F;
    pub const P: u8 = 0x20;
    pub const Q: u8 = 0x21;
    pub const R: u8 = 0x22;
    pub const S: u8 = 0x23;
    pub const T: u8 = 0x24;
    pub const U: u8 = 0x25;
    pub const V: u8 = 0x26;
    pub const W: u8 = 0x27;
    pub const X: u8 = 0x28;
    pub const Y: u8 = 0x29;
    pub const Z: u8 = 0x2A;
    pub const BRACKET_LEFT: u8 = 0x2B;
    pub const BRACKET_RIGHT: u8 = 0x2C;
    pub const BACKSLASH: u8 = 0x2D;
    pub const RIGHT: u8 = 0x2E;
    pub const LEFT: u8 = 0x2F;
    pub const RETURN: u8 = 0x30;
    pub const SPACE: u8 = 0x31;
    pub const TAB: u8 = 0x32;
    pub const NUM: u8 = 0x35;
    pub const CAPS: u8 = 0x37;
    pub const CLEAR: u8 = 0x38;
    pub const SCRN: u8 = 0x39;
    pub const BREAK: u8 = 0x3A;
    pub const PAUSE: u8 = 0x3B;
    pub const DEL: u8 = 0x3C;
    pub const MENU: u8 = 0x3D;
    pub const PF1: u8 = 0x40;
    pub const PF2: u8 = 0x41;
    pub const PF3: u8 = 0x42;
    pub const PF4: u8 = 0x43;
    pub const PF5: u8 = 0x44;
    pub const FEED: u8 = 0x45;
    pub const DIP1: u8 = 0x48;
    pub const DIP2: u8 = 0x49;
    pub const DIP3: u8 = 0x4A;
    pub const DIP4: u8 = 0x4B;
    pub const SHIFT: u8 = 0x4D;
    pub const CTRL: u8 = 0x4E;
    pub const PRINTER: u8 = 0x4F;
}

/// Character set selected by the DIP switches held at reset.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Charset {
    #[default]
    Us,
    Fr,
    De,
    Gb,
    Dk,
    Se,
    It,
    Es,
}

impl Charset {
    fn dip_scancodes(self) -> &'static [u8] {
        use scancode::{DIP1, DIP2, DIP3};
        match self {
            Self::Us => &[DIP1, DIP2, DIP3],
            Self::Fr => &[DIP2, DIP3],
            Self::De => &[DIP1, DIP3],
            Self::Gb => &[DIP3],
            Self::Dk => &[DIP1, DIP2],
            Self::Se => &[DIP2],
            Self::It => &[DIP1],
            Self::Es => &[],
        }
    }
}

impl FromStr for Charset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "US" => Ok(Self::Us),
            "FR" => Ok(Self::Fr),
            "DE" => Ok(Self::De),
            "GB" => Ok(Self::Gb),
            "DK" => Ok(Self::Dk),
            "SE" => Ok(Self::Se),
            "IT" => Ok(Self::It),
            "ES" => Ok(Self::Es),
            other => Err(format!("unknown character set: {other}")),
        }
    }
}

pub struct Console {
    /// 8 scan rows, gates A and B each; pressed key clears one bit.
    matrix: [[u8; 2]; 8],
    charset: Charset,
    hold_cycles: u32,

    // LCD controller decode state.
    lcd_controller: u8,
    lcd_command: bool,
    lcd_cmd64_seen: bool,
    lcd_cmd63_seen: bool,
    lcd_row: usize,
    lcd_col: usize,
    lcd_pixel_col: Option<usize>,
    lcd_pixel_row: usize,
    lcd_serial_cycles_left: u32,

    pixels: [[bool; LCD_COLUMNS]; LCD_ROWS],

    break_signal: Arc<BreakSignal>,
}

impl Console {
    pub fn new(charset: Charset, break_signal: Arc<BreakSignal>) -> Self {
        let mut console = Self {
            matrix: [[0xFF; 2]; 8],
            charset,
            hold_cycles: 0,
            lcd_controller: 0,
            lcd_command: false,
            lcd_cmd64_seen: false,
            lcd_cmd63_seen: false,
            lcd_row: 0,
            lcd_col: 0,
            lcd_pixel_col: None,
            lcd_pixel_row: 0,
            lcd_serial_cycles_left: 0,
            pixels: [[false; LCD_COLUMNS]; LCD_ROWS],
            break_signal,
        };
        console.release_keys();
        console
    }

    /// The LCD pixel surface, for front-ends that render it.
    pub fn pixels(&self) -> &[[bool; LCD_COLUMNS]; LCD_ROWS] {
        &self.pixels
    }

    /// Clear the matrix back to the idle image: everything released except
    /// the charset DIP switches, which stay held.
    pub fn release_keys(&mut self) {
        self.matrix = [[0xFF; 2]; 8];
        for &dip in self.charset.dip_scancodes() {
            self.set_key(dip);
        }
    }

    fn set_key(&mut self, code: u8) {
        match code {
            0x00..=0x3F => {
                self.matrix[(code >> 3) as usize][GATE_A] &= !(1 << (code & 0x07));
            }
            scancode::PF1..=scancode::FEED => {
                self.matrix[(code - scancode::PF1) as usize][GATE_B] &= 0xFE;
            }
            scancode::DIP1..=scancode::DIP4 => {
                self.matrix[(code - scancode::DIP1) as usize][GATE_B] &= 0xFD;
            }
            scancode::SHIFT => self.matrix[5][GATE_B] &= 0xFD,
            scancode::CTRL => self.matrix[6][GATE_B] &= 0xFD,
            scancode::PRINTER => self.matrix[7][GATE_B] &= 0xFD,
            _ => self
                .break_signal
                .panic(format!("Unknown scancode: {code}")),
        }
    }

    /// Press one key: latch it into the matrix and, when the interrupt mask
    /// in the port-26 feedback byte is open, pull P15 low and raise the IRQ
    /// vector so the firmware starts scanning.
    pub fn press_key(&mut self, code: u8, master: &mut Hd6301, master_mem: &mut Memory) {
        self.release_keys();
        self.set_key(code);
        self.hold_cycles = 0;

        if master_mem.peek(io::PORT_26_FB) & 0x10 != 0 {
            master_mem.poke(reg::PORT_1, master_mem.peek(reg::PORT_1) & !0x20);
            master.irq(master_mem, vector::IRQ);
        }
    }

    /// One macro-tick of console work: answer keyboard scanning, drain the
    /// LCD write queue, drive the serial read-back window, and auto-release
    /// held keys.
    pub fn step(&mut self, master_mem: &mut Memory) {
        // Re-raise the keyboard interrupt line once the mask closes.
        if master_mem.peek(io::PORT_26_FB) & 0x10 == 0 {
            master_mem.poke(reg::PORT_1, master_mem.peek(reg::PORT_1) | 0x20);
        }

        while let Some(write) = master_mem.take_lcd_write() {
            match write {
                LcdWrite::Select(value) => self.lcd_select(value),
                LcdWrite::Data(value) => self.lcd_data(value),
            }
        }

        self.scan_response(master_mem);

        // Serial read of LCD data: the addressed pixel arrives on the BUSY
        // (SO) line, keyboard return gate B bit 7.
        if self.lcd_serial_cycles_left > 0 {
            let on = self.pixels[self.lcd_row.min(LCD_ROWS - 1)][self.lcd_col.min(LCD_COLUMNS - 1)];
            let gate_b = master_mem.peek(io::KRTN_GATE_B);
            master_mem.poke(
                io::KRTN_GATE_B,
                if on { gate_b | 0x80 } else { gate_b & !0x80 },
            );
            self.lcd_serial_cycles_left -= 1;
        }

        self.hold_cycles += 1;
        if self.hold_cycles > KEYBOARD_RELEASE {
            self.release_keys();
        }
    }

    fn scan_response(&mut self, master_mem: &mut Memory) {
        let row = match master_mem.peek(io::KSC_GATE) {
            0x00 | 0xFF => {
                master_mem.poke(io::KRTN_GATE_A, 0xFF);
                master_mem.poke(io::KRTN_GATE_B, 0xFF);
                return;
            }
            0xFE => 0,
            0xFD => 1,
            0xFB => 2,
            0xF7 => 3,
            0xEF => 4,
            0xDF => 5,
            0xBF => 6,
            0x7F => 7,
            other => {
                self.break_signal
                    .panic(format!("Invalid keyboard scanning line: 0x{other:02x}"));
                return;
            }
        };
        master_mem.poke(io::KRTN_GATE_A, self.matrix[row][GATE_A]);
        master_mem.poke(io::KRTN_GATE_B, self.matrix[row][GATE_B]);
    }

    /// Port 26 write: controller id in the low 3 bits, command/data
    /// selector in bit 3.
    pub fn lcd_select(&mut self, value: u8) {
        self.lcd_controller = value & 0x07;
        self.lcd_command = (value >> 3) & 1 != 0;
    }

    /// Column offset of the selected controller's 40-column band.
    fn band_col(&self, value: u8, base: u8) -> Option<usize> {
        let offset = match self.lcd_controller {
            1 | 4 => 0,
            2 | 5 => 40,
            3 | 6 => 80,
            _ => return None,
        };
        value.checked_sub(base).map(|delta| delta as usize + offset)
    }

    fn band_row(&self, upper: bool) -> usize {
        let half = if self.lcd_controller <= 3 { 0 } else { 16 };
        if upper { half } else { half + 8 }
    }

    /// Decode a 0x64/0x63 address operand into the write/read position.
    fn lcd_update_row_col(&mut self, value: u8) {
        if self.lcd_controller == 0 || self.lcd_controller == 7 {
            return;
        }
        if value < 0xC0 {
            self.lcd_row = self.band_row(true);
            if let Some(col) = self.band_col(value, 0x80) {
                self.lcd_col = col;
            }
        } else {
            self.lcd_row = self.band_row(false);
            if let Some(col) = self.band_col(value, 0xC0) {
                self.lcd_col = col;
            }
        }
    }

    fn set_pixel(&mut self, row: usize, col: usize, on: bool) {
        if row < LCD_ROWS && col < LCD_COLUMNS {
            self.pixels[row][col] = on;
        }
    }

    /// Port 0x2A write: a command or 8-pixel data column, depending on the
    /// selector latched by the last port 26 write.
    pub fn lcd_data(&mut self, value: u8) {
        if self.lcd_command {
            if value == 0x64 {
                self.lcd_cmd64_seen = true;
            } else if value == 0x63 {
                self.lcd_cmd63_seen = true;
            } else if self.lcd_cmd64_seen {
                // Request to write to the LCD.
                self.lcd_update_row_col(value);
                self.lcd_cmd64_seen = false;
            } else if self.lcd_cmd63_seen {
                // Request to read from the LCD: arm the serial window.
                self.lcd_update_row_col(value);
                self.lcd_serial_cycles_left = LCD_SERIAL_WINDOW;
                self.lcd_cmd63_seen = false;
            } else if let Some(col) = self.lcd_pixel_col {
                // Second half of a direct pixel command: exact row plus
                // on/off selection.
                if (0x20..=0x3C).contains(&value) {
                    self.lcd_pixel_row += ((value - 0x20) / 4) as usize;
                    self.set_pixel(self.lcd_pixel_row, col, false);
                } else if (0x40..=0x5C).contains(&value) {
                    self.lcd_pixel_row += ((value - 0x40) / 4) as usize;
                    self.set_pixel(self.lcd_pixel_row, col, true);
                }
                self.lcd_pixel_col = None;
            } else if (0x80..=0xA7).contains(&value) {
                // First half: column and upper base row.
                self.lcd_pixel_col = self.band_col(value, 0x80);
                self.lcd_pixel_row = self.band_row(true);
            } else if (0xC0..=0xE7).contains(&value) {
                self.lcd_pixel_col = self.band_col(value, 0xC0);
                self.lcd_pixel_row = self.band_row(false);
            }
        } else {
            // Data byte: 8 vertical pixels, column auto-increments.
            for i in 0..8 {
                self.set_pixel(self.lcd_row + i, self.lcd_col, (value >> i) & 1 != 0);
            }
            self.lcd_col += 1;
        }
    }
}
