//! The HX-20 system: two HD6301 MCUs on a serial channel plus everything
//! wired to them.
//!
//! `tick()` is one macro-tick of the fixed schedule: master instruction,
//! slave instruction, SCI routing, peripheral catch-up, GPIO glue, autoload
//! injection. Pacing and debugger entry are the caller's business, observed
//! between ticks.

use std::path::Path;
use std::sync::Arc;

use hx20_core::cpu::hd6301::{Hd6301, reg};
use hx20_core::device::{Cassette, Piezo, Printer, Rs232, SerialBridge};
use hx20_core::mem::{Memory, RAM_MAX_DEFAULT, RAM_MAX_EXPANSION, io};
use hx20_core::signal::BreakSignal;
use hx20_core::trace::{SciDirection, SciTrace};

use crate::autoload::Autoload;
use crate::console::{Charset, Console};
use crate::rom_loader::{self, RomLoadError, SystemRoms};

pub struct Hx20 {
    pub master: Hd6301,
    pub master_mem: Memory,
    pub slave: Hd6301,
    pub slave_mem: Memory,

    pub rs232: Rs232,
    pub cassette: Cassette,
    pub piezo: Piezo,
    pub printer: Option<Printer>,
    pub serial: Option<SerialBridge>,
    pub console: Console,

    pub sci_trace: SciTrace,
    autoload: Option<Autoload>,
    break_signal: Arc<BreakSignal>,
}

impl Hx20 {
    /// Build the machine. ROMs are loaded separately; peripherals that need
    /// host resources (printer, external serial) attach afterwards.
    pub fn new(ram_expansion: bool, charset: Charset, break_signal: Arc<BreakSignal>) -> Self {
        let ram_max = if ram_expansion { RAM_MAX_EXPANSION } else { RAM_MAX_DEFAULT };
        let mut master_mem = Memory::new(ram_max);
        let slave_mem = Memory::new(0);

        // Power-on images the firmware expects before its first scan.
        master_mem.poke(io::KRTN_GATE_A, 0xFF); // No return lines high.
        master_mem.poke(io::KRTN_GATE_B, 0xFF);
        master_mem.poke(reg::PORT_1, 0xF8); // Clear interrupt lines.

        // Prime the RAM-top words (RMBADR and BSWTAD) so the Ctrl+@ cold
        // initialization is not needed.
        let ram_top = ram_max.wrapping_add(1);
        master_mem.poke(0x012C, (ram_top >> 8) as u8);
        master_mem.poke(0x012D, ram_top as u8);
        master_mem.poke(0x0134, (ram_top >> 8) as u8);
        master_mem.poke(0x0135, ram_top as u8);

        Self {
            master: Hd6301::new(0, Arc::clone(&break_signal)),
            master_mem,
            slave: Hd6301::new(1, Arc::clone(&break_signal)),
            slave_mem,
            rs232: Rs232::new(),
            cassette: Cassette::new(),
            piezo: Piezo::new(),
            printer: None,
            serial: None,
            console: Console::new(charset, Arc::clone(&break_signal)),
            sci_trace: SciTrace::new(),
            autoload: None,
            break_signal,
        }
    }

    pub fn break_signal(&self) -> &Arc<BreakSignal> {
        &self.break_signal
    }

    /// Load and validate the five system ROM images.
    pub fn load_system_roms(&mut self, roms: &SystemRoms) -> Result<(), RomLoadError> {
        rom_loader::load_roms(&rom_loader::MASTER_ROMS, roms, &mut self.master_mem)?;
        rom_loader::load_roms(&rom_loader::SLAVE_ROMS, roms, &mut self.slave_mem)?;
        Ok(())
    }

    /// Load an option ROM image into the master's option socket.
    pub fn load_option_rom(&mut self, path: &Path) -> std::io::Result<()> {
        self.master_mem
            .load_file(path, rom_loader::OPTION_ROM_ADDRESS)?;
        Ok(())
    }

    /// Attach an autoload source and arm the firmware's auto-key block.
    pub fn set_autoload(&mut self, autoload: Autoload) {
        autoload.prime(&mut self.master_mem);
        self.autoload = Some(autoload);
    }

    /// True while an autoload wants the machine running at full speed.
    pub fn autoload_warp(&self) -> bool {
        self.autoload.as_ref().is_some_and(Autoload::wants_warp)
    }

    /// Reset both MCUs through their reset vectors.
    pub fn reset(&mut self) {
        self.master.reset(&mut self.master_mem);
        self.slave.reset(&mut self.slave_mem);
    }

    /// One macro-tick.
    pub fn tick(&mut self) {
        self.master.step(&mut self.master_mem);
        self.slave.step(&mut self.slave_mem);

        if self.master_mem.peek(reg::PORT_2) & 0x04 != 0 {
            // Master P22 high: the SCI channel is internal.
            if let Some(byte) = self.master.transmit_shift_register.take() {
                self.sci_trace
                    .add(SciDirection::MasterToSlave, byte, self.master.counter);
                self.slave.sci_receive(&mut self.slave_mem, byte);
            }
            if let Some(byte) = self.slave.transmit_shift_register.take() {
                self.sci_trace
                    .add(SciDirection::SlaveToMaster, byte, self.master.counter);
                self.master.sci_receive(&mut self.master_mem, byte);
            }
        } else if let Some(bridge) = self.serial.as_mut() {
            // Master P22 low: the master's SCI is bridged to the host TTY.
            bridge.step(&mut self.master, &mut self.master_mem, &mut self.sci_trace);
        }

        self.rs232
            .step(&mut self.master, &self.master_mem, &self.slave, &mut self.slave_mem);
        self.piezo.step(&self.slave, &self.slave_mem);
        self.console.step(&mut self.master_mem);
        self.cassette.step(&self.slave, &mut self.slave_mem);
        if let Some(printer) = self.printer.as_mut() {
            printer.step(&self.slave, &mut self.slave_mem);
        }

        // Slave P34 mirrors onto master P12 (the BUSY / wake line).
        if self.slave_mem.peek(reg::PORT_3) & 0x10 != 0 {
            self.master_mem
                .poke(reg::PORT_1, self.master_mem.peek(reg::PORT_1) | 0x04);
        } else {
            self.master_mem
                .poke(reg::PORT_1, self.master_mem.peek(reg::PORT_1) & !0x04);
        }

        if let Some(autoload) = self.autoload.as_mut() {
            autoload.step(&mut self.master_mem);
        }
    }
}
