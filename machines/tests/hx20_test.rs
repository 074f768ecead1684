//! System-level wiring: SCI routing, GPIO glue and autoload injection.

use std::sync::Arc;

use hx20_core::cpu::hd6301::{reg, trcsr, vector};
use hx20_core::signal::BreakSignal;
use hx20_machines::console::Charset;
use hx20_machines::{Autoload, Hx20};

const ORIGIN: u16 = 0x1000;

/// Machine with both CPUs parked on branch-to-self programs.
fn machine() -> Hx20 {
    let signal = Arc::new(BreakSignal::new());
    let mut hx20 = Hx20::new(false, Charset::Us, signal);

    hx20.master_mem.write_area(vector::RESET.1, &ORIGIN.to_be_bytes());
    hx20.master_mem.write_area(ORIGIN, &[0x20, 0xFE]); // BRA to self
    hx20.slave_mem.write_area(vector::RESET.1, &0xF000u16.to_be_bytes());
    hx20.slave_mem.write_area(0xF000, &[0x20, 0xFE]); // BRA to self
    hx20.reset();
    hx20
}

#[test]
fn sci_loopback_master_to_slave() {
    let mut hx20 = machine();
    // P22 high: the channel is internal.
    hx20.master_mem.poke(reg::PORT_2, 0x04);
    // Master program: LDAA #$5A; STAA TDR; BRA to self.
    hx20.master_mem
        .write_area(ORIGIN, &[0x86, 0x5A, 0x97, 0x13, 0x20, 0xFE]);

    hx20.tick(); // LDAA
    assert_eq!(hx20.slave_mem.peek(reg::RDR), 0x00);

    hx20.tick(); // STAA TDR; the bus routes the byte this tick.
    assert_eq!(hx20.slave_mem.peek(reg::RDR), 0x5A);
    assert_ne!(hx20.slave_mem.peek(reg::TRCSR) & trcsr::RDRF, 0);
    assert_eq!(hx20.master.transmit_shift_register, None);
}

#[test]
fn sci_loopback_slave_to_master() {
    let mut hx20 = machine();
    hx20.master_mem.poke(reg::PORT_2, 0x04);
    hx20.slave_mem
        .write_area(0xF000, &[0x86, 0xC3, 0x97, 0x13, 0x20, 0xFE]);

    hx20.tick();
    hx20.tick();
    assert_eq!(hx20.master_mem.peek(reg::RDR), 0xC3);
    assert_ne!(hx20.master_mem.peek(reg::TRCSR) & trcsr::RDRF, 0);
    assert_eq!(hx20.slave.transmit_shift_register, None);
}

#[test]
fn sci_frames_are_traced() {
    let mut hx20 = machine();
    hx20.master_mem.poke(reg::PORT_2, 0x04);
    hx20.master_mem
        .write_area(ORIGIN, &[0x86, 0x5A, 0x97, 0x13, 0x20, 0xFE]);

    hx20.tick();
    hx20.tick();

    let mut out = Vec::new();
    hx20.sci_trace.dump(&mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("Master  --> Slave : 0x5a"), "{text}");
}

#[test]
fn pending_tx_is_held_while_p22_low_without_bridge() {
    let mut hx20 = machine();
    // P22 low and no external bridge attached: the byte stays in the
    // shift register and the slave never sees it.
    hx20.master_mem
        .write_area(ORIGIN, &[0x86, 0x5A, 0x97, 0x13, 0x20, 0xFE]);

    hx20.tick();
    hx20.tick();
    hx20.tick();
    assert_eq!(hx20.master.transmit_shift_register, Some(0x5A));
    assert_eq!(hx20.slave_mem.peek(reg::RDR), 0x00);
}

#[test]
fn slave_p34_mirrors_onto_master_p12() {
    let mut hx20 = machine();

    hx20.slave_mem.poke(reg::PORT_3, 0x10);
    hx20.tick();
    assert_ne!(hx20.master_mem.peek(reg::PORT_1) & 0x04, 0);

    hx20.slave_mem.poke(reg::PORT_3, 0x00);
    hx20.tick();
    assert_eq!(hx20.master_mem.peek(reg::PORT_1) & 0x04, 0);
}

#[test]
fn power_on_memory_images() {
    let signal = Arc::new(BreakSignal::new());
    let hx20 = Hx20::new(false, Charset::Us, signal);

    assert_eq!(hx20.master_mem.peek(hx20_core::mem::io::KRTN_GATE_A), 0xFF);
    assert_eq!(hx20.master_mem.peek(hx20_core::mem::io::KRTN_GATE_B), 0xFF);
    assert_eq!(hx20.master_mem.peek(reg::PORT_1), 0xF8);
    // RAM-top words primed for a 16K machine: 0x4000.
    assert_eq!(hx20.master_mem.peek(0x012C), 0x40);
    assert_eq!(hx20.master_mem.peek(0x012D), 0x00);
    assert_eq!(hx20.master_mem.peek(0x0134), 0x40);
    assert_eq!(hx20.master_mem.peek(0x0135), 0x00);
}

#[test]
fn expansion_primes_the_larger_ram_top() {
    let signal = Arc::new(BreakSignal::new());
    let hx20 = Hx20::new(true, Charset::Us, signal);
    assert_eq!(hx20.master_mem.peek(0x012C), 0x80);
    assert_eq!(hx20.master_mem.peek(0x012D), 0x00);
}

#[test]
fn autoload_feeds_keys_through_the_firmware_block() {
    let dir = std::env::temp_dir().join("hx20_autoload_test");
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("prog.bas");
    std::fs::write(&path, b"A").unwrap();

    let mut hx20 = machine();
    hx20.set_autoload(Autoload::basic(&path).unwrap());

    // Priming selects BASIC from the startup menu.
    assert_eq!(hx20.master_mem.peek(0x0165), 0x0A);
    assert_eq!(hx20.master_mem.peek(0x0166), 2);
    assert_eq!(hx20.master_mem.peek(0x016F), b'2');
    assert!(hx20.autoload_warp());

    // The firmware signals readiness by writing 2 into KYISPN.
    hx20.master_mem.poke(0x0167, 2);
    hx20.tick();
    assert_eq!(hx20.master_mem.peek(0x0170), b'A');
    assert_eq!(hx20.master_mem.peek(0x0167), 1);

    // File exhausted: "RUN" follows, then a final carriage return.
    for expected in [b'R', b'U', b'N'] {
        hx20.master_mem.poke(0x0167, 2);
        hx20.tick();
        assert_eq!(hx20.master_mem.peek(0x0170), expected);
    }
    hx20.master_mem.poke(0x0167, 2);
    hx20.tick();
    assert_eq!(hx20.master_mem.peek(0x0170), b'\r');
    assert!(!hx20.autoload_warp());

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn srec_autoload_converts_s1_records() {
    let dir = std::env::temp_dir().join("hx20_srec_test");
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("prog.srec");
    // S1 record: count 05, address 1000, data DE AD, checksum (unchecked).
    std::fs::write(&path, b"S0030000FC\nS1051000DEAD98\nS9030000FC\n").unwrap();

    let mut hx20 = machine();
    hx20.set_autoload(Autoload::srec(&path).unwrap());
    assert_eq!(hx20.master_mem.peek(0x016F), b'1'); // MONITOR key

    let mut typed = Vec::new();
    // The S-record machine needs one tick to fetch the line, then types it.
    for _ in 0..32 {
        hx20.master_mem.poke(0x0167, 2);
        hx20.tick();
        if hx20.master_mem.peek(0x0167) == 1 {
            typed.push(hx20.master_mem.peek(0x0170));
            hx20.master_mem.poke(0x0167, 0);
        }
        if !hx20.autoload_warp() {
            break;
        }
    }

    let text = String::from_utf8(typed).unwrap();
    assert!(text.starts_with("S1000\rDE\rAD\r.\r"), "{text:?}");

    std::fs::remove_dir_all(&dir).unwrap();
}
