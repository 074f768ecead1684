//! Micro-printer head timing and dot-row accumulation.

use std::sync::{Arc, Mutex};

use hx20_core::cpu::hd6301::{Hd6301, reg};
use hx20_core::device::Printer;
use hx20_core::mem::Memory;
use hx20_core::signal::BreakSignal;

#[derive(Clone)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    fn new() -> Self {
        Self(Arc::new(Mutex::new(Vec::new())))
    }

    fn contents(&self) -> Vec<u8> {
        self.0.lock().unwrap().clone()
    }
}

impl std::io::Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }
    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn slave() -> (Hd6301, Memory) {
    let signal = Arc::new(BreakSignal::new());
    let mut mem = Memory::new(0);
    let mut cpu = Hd6301::new(1, signal);
    cpu.reset(&mut mem);
    (cpu, mem)
}

/// Run one 369-cycle head pulse with the dot-drive bits preset.
/// P14 low keeps the motor powered.
fn pulse(printer: &mut Printer, cpu: &mut Hd6301, mem: &mut Memory, dots: u8) {
    mem.poke(reg::PORT_1, (mem.peek(reg::PORT_1) & 0xE0) | dots);
    cpu.sync_counter = cpu.sync_counter.wrapping_add(369);
    printer.step(cpu, mem);
}

#[test]
fn single_dot_column_prints_one_hash() {
    let buf = SharedBuf::new();
    let (mut cpu, mut mem) = slave();
    let mut printer = Printer::with_writer(Box::new(buf.clone()));

    // One full revolution: P12 drives its band at head positions 58..=61,
    // which is dot column 14 + 36 = 50.
    for head in 0..252u32 {
        let dots = if (58..62).contains(&head) { 0x04 } else { 0x00 };
        pulse(&mut printer, &mut cpu, &mut mem, dots);
    }

    let output = buf.contents();
    let text = String::from_utf8(output).unwrap();
    let line = text.lines().next().expect("one line flushed");
    assert_eq!(line.len(), 144);
    for (i, cell) in line.chars().enumerate() {
        if i == 50 {
            assert_eq!(cell, '#', "column {i}");
        } else {
            assert_eq!(cell, ' ', "column {i}");
        }
    }
}

#[test]
fn motor_off_freezes_the_head() {
    let buf = SharedBuf::new();
    let (mut cpu, mut mem) = slave();
    let mut printer = Printer::with_writer(Box::new(buf.clone()));

    // P14 high: motor off, no pulses, no output.
    mem.poke(reg::PORT_1, 0x10);
    cpu.sync_counter = cpu.sync_counter.wrapping_add((369u32 * 300) as u16);
    printer.step(&mut cpu, &mut mem);

    assert!(buf.contents().is_empty());
}

#[test]
fn timing_signal_toggles_and_reset_signal_tracks_head() {
    let (mut cpu, mut mem) = slave();
    let buf = SharedBuf::new();
    let mut printer = Printer::with_writer(Box::new(buf));

    pulse(&mut printer, &mut cpu, &mut mem, 0x00);
    let p17_first = mem.peek(reg::PORT_1) & 0x80;
    // Head position 0 is inside the reset window.
    assert_ne!(mem.peek(reg::PORT_1) & 0x40, 0);

    pulse(&mut printer, &mut cpu, &mut mem, 0x00);
    let p17_second = mem.peek(reg::PORT_1) & 0x80;
    assert_ne!(p17_first, p17_second);

    // Run the head past position 72: the reset signal drops.
    for _ in 0..72 {
        pulse(&mut printer, &mut cpu, &mut mem, 0x00);
    }
    assert_eq!(mem.peek(reg::PORT_1) & 0x40, 0);
}

#[test]
fn dot_bands_map_to_their_column_offsets() {
    let buf = SharedBuf::new();
    let (mut cpu, mut mem) = slave();
    let mut printer = Printer::with_writer(Box::new(buf.clone()));

    // Head position 2 is dot column 0 of each band.
    for head in 0..252u32 {
        let dots = match head {
            2 => 0x08,  // P13 -> column 0
            6 => 0x04,  // P12 -> column 36+1
            10 => 0x02, // P11 -> column 72+2
            14 => 0x01, // P10 -> column 108+3
            _ => 0x00,
        };
        pulse(&mut printer, &mut cpu, &mut mem, dots);
    }

    let text = String::from_utf8(buf.contents()).unwrap();
    let line = text.lines().next().unwrap();
    let hashes: Vec<usize> = line
        .char_indices()
        .filter(|(_, c)| *c == '#')
        .map(|(i, _)| i)
        .collect();
    assert_eq!(hashes, vec![0, 37, 74, 111]);
}
