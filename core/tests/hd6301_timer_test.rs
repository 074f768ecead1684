//! Free-running counter: per-opcode cycle accounting, FRC mirroring,
//! output compare and input capture.

use hx20_core::cpu::hd6301::{CC_RESERVED, CcFlag, reg, tcsr};

mod common;
use common::{ORIGIN, setup};

/// Representative opcodes from every group with their fixed cycle costs.
const CYCLE_SAMPLES: &[(&[u8], u64)] = &[
    (&[0x01], 1),             // NOP
    (&[0x04], 1),             // LSRD
    (&[0x06], 1),             // TAP
    (&[0x08], 1),             // INX
    (&[0x10], 1),             // SBA
    (&[0x16], 1),             // TAB
    (&[0x18], 2),             // XGDX
    (&[0x1A], 4),             // SLP
    (&[0x1B], 1),             // ABA
    (&[0x20, 0x00], 3),       // BRA
    (&[0x26, 0x00], 3),       // BNE (untaken costs the same)
    (&[0x30], 1),             // TSX
    (&[0x32], 3),             // PULA
    (&[0x36], 4),             // PSHA
    (&[0x38], 4),             // PULX
    (&[0x39], 5),             // RTS
    (&[0x3B], 10),            // RTI
    (&[0x3C], 5),             // PSHX
    (&[0x3D], 7),             // MUL
    (&[0x40], 1),             // NEGA
    (&[0x50], 1),             // NEGB
    (&[0x60, 0x00], 6),       // NEG idx
    (&[0x61, 0x00, 0x00], 7), // AIM idx
    (&[0x6B, 0x00, 0x00], 5), // TIM idx
    (&[0x6D, 0x00], 4),       // TST idx
    (&[0x6E, 0x00], 3),       // JMP idx
    (&[0x6F, 0x00], 5),       // CLR idx
    (&[0x70, 0x00, 0x20], 6), // NEG ext
    (&[0x71, 0x00, 0x20], 6), // AIM dir
    (&[0x7B, 0x00, 0x20], 4), // TIM dir
    (&[0x7E, 0x10, 0x00], 3), // JMP ext
    (&[0x80, 0x00], 2),       // SUBA imm
    (&[0x83, 0x00, 0x00], 3), // SUBD imm
    (&[0x8C, 0x00, 0x00], 3), // CPX imm
    (&[0x8D, 0x00], 5),       // BSR
    (&[0x8E, 0x01, 0x00], 3), // LDS imm
    (&[0x90, 0x80], 3),       // SUBA dir
    (&[0x97, 0x80], 3),       // STAA dir
    (&[0x9D, 0x80], 5),       // JSR dir
    (&[0xA0, 0x00], 4),       // SUBA idx
    (&[0xA3, 0x00], 5),       // SUBD idx
    (&[0xAD, 0x00], 5),       // JSR idx
    (&[0xB0, 0x00, 0x20], 4), // SUBA ext
    (&[0xBD, 0x10, 0x00], 6), // JSR ext
    (&[0xC3, 0x00, 0x00], 3), // ADDD imm
    (&[0xCC, 0x00, 0x00], 3), // LDD imm
    (&[0xCE, 0x00, 0x00], 3), // LDX imm
    (&[0xDD, 0x80], 4),       // STD dir
    (&[0xEC, 0x00], 5),       // LDD idx
    (&[0xFD, 0x00, 0x20], 5), // STD ext
    (&[0xFF, 0x00, 0x20], 5), // STX ext
];

#[test]
fn opcode_cycle_costs_match_the_table() {
    for (program, cycles) in CYCLE_SAMPLES {
        let (mut cpu, mut mem, _) = setup();
        cpu.sp = 0x01F0;
        mem.write_area(ORIGIN, program);
        let before = cpu.counter;
        cpu.step(&mut mem);
        assert_eq!(
            cpu.counter as u64 - before as u64,
            *cycles,
            "opcode {:02x}",
            program[0]
        );
    }
}

#[test]
fn counter_mirrors_into_frc_bytes() {
    let (mut cpu, mut mem, _) = setup();
    cpu.counter = 0x1233;
    mem.write_area(ORIGIN, &[0x01]); // NOP
    cpu.step(&mut mem);
    assert_eq!(cpu.counter, 0x1234);
    assert_eq!(mem.peek(reg::FRC_HIGH), 0x12);
    assert_eq!(mem.peek(reg::FRC_LOW), 0x34);
}

#[test]
fn sync_counter_tracks_cycles_and_wraps() {
    let (mut cpu, mut mem, _) = setup();
    cpu.sync_counter = 0xFFFF;
    mem.write_area(ORIGIN, &[0x18]); // XGDX (2 cycles)
    cpu.step(&mut mem);
    assert_eq!(cpu.sync_counter, 0x0001);
}

#[test]
fn ocf_sets_on_exact_compare_match() {
    let (mut cpu, mut mem, _) = setup();
    cpu.counter = 0x00FE;
    mem.poke(reg::OCR_HIGH, 0x01);
    mem.poke(reg::OCR_LOW, 0x00);
    mem.write_area(ORIGIN, &[0x01, 0x01, 0x01]); // NOPs

    cpu.step(&mut mem); // 0x00FF: no match yet
    assert_eq!(mem.peek(reg::TCSR) & tcsr::OCF, 0);

    cpu.step(&mut mem); // 0x0100: match
    assert_ne!(mem.peek(reg::TCSR) & tcsr::OCF, 0);
}

#[test]
fn ocr_write_clears_armed_ocf() {
    let (mut cpu, mut mem, _) = setup();
    mem.poke(reg::TCSR, tcsr::OCF);
    // LDAA TCSR (arms the clear); STAA OCR_HIGH (completes it)
    mem.write_area(ORIGIN, &[0x96, 0x08, 0x97, 0x0B]);

    cpu.step(&mut mem);
    assert_ne!(mem.peek(reg::TCSR) & tcsr::OCF, 0);
    cpu.step(&mut mem);
    assert_eq!(mem.peek(reg::TCSR) & tcsr::OCF, 0);
}

#[test]
fn ocr_write_without_arming_keeps_ocf() {
    let (mut cpu, mut mem, _) = setup();
    mem.poke(reg::TCSR, tcsr::OCF);
    mem.write_area(ORIGIN, &[0x86, 0x02, 0x97, 0x0B]); // LDAA #$02; STAA OCR_HIGH
    cpu.step(&mut mem);
    cpu.step(&mut mem);
    assert_ne!(mem.peek(reg::TCSR) & tcsr::OCF, 0);
    assert_eq!(mem.peek(reg::OCR_HIGH), 0x02);
}

// =============================================================================
// Input capture on P20
// =============================================================================

#[test]
fn rising_edge_latches_icr_when_iedg_set() {
    let (mut cpu, mut mem, _) = setup();
    mem.poke(reg::TCSR, tcsr::IEDG);
    mem.write_area(ORIGIN, &[0x01, 0x01]); // NOPs

    cpu.step(&mut mem); // P20 low, nothing happens.
    assert_eq!(mem.peek(reg::TCSR) & tcsr::ICF, 0);

    mem.poke(reg::PORT_2, mem.peek(reg::PORT_2) | 0x01);
    cpu.step(&mut mem);
    assert_ne!(mem.peek(reg::TCSR) & tcsr::ICF, 0);
    let latched = u16::from_be_bytes([mem.peek(reg::ICR_HIGH), mem.peek(reg::ICR_LOW)]);
    assert_eq!(latched, cpu.counter);
}

#[test]
fn falling_edge_latches_icr_when_iedg_clear() {
    let (mut cpu, mut mem, _) = setup();
    mem.poke(reg::PORT_2, 0x01);
    mem.write_area(ORIGIN, &[0x01, 0x01, 0x01]); // NOPs

    cpu.step(&mut mem); // Establish high as the previous level.
    mem.poke(reg::PORT_2, 0x00);
    cpu.step(&mut mem);
    assert_ne!(mem.peek(reg::TCSR) & tcsr::ICF, 0);
}

#[test]
fn rising_edge_ignored_when_iedg_clear() {
    let (mut cpu, mut mem, _) = setup();
    mem.write_area(ORIGIN, &[0x01, 0x01]); // NOPs
    cpu.step(&mut mem);
    mem.poke(reg::PORT_2, 0x01);
    cpu.step(&mut mem);
    assert_eq!(mem.peek(reg::TCSR) & tcsr::ICF, 0);
}

#[test]
fn icr_high_read_clears_icf_after_tcsr_read() {
    let (mut cpu, mut mem, _) = setup();
    mem.poke(reg::TCSR, tcsr::ICF);
    // LDAA TCSR (arms); LDAA ICR_HIGH (clears)
    mem.write_area(ORIGIN, &[0x96, 0x08, 0x96, 0x0D]);
    cpu.step(&mut mem);
    assert_ne!(mem.peek(reg::TCSR) & tcsr::ICF, 0);
    cpu.step(&mut mem);
    assert_eq!(mem.peek(reg::TCSR) & tcsr::ICF, 0);
}

#[test]
fn slp_advances_one_cycle_per_step() {
    let (mut cpu, mut mem, _) = setup();
    cpu.cc = CC_RESERVED | CcFlag::I as u8;
    mem.write_area(ORIGIN, &[0x1A]); // SLP (4 cycles)
    cpu.step(&mut mem);
    let after_slp = cpu.counter;
    assert_eq!(after_slp, 4);
    cpu.step(&mut mem);
    assert_eq!(cpu.counter, after_slp + 1);
}
