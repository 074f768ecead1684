//! Interactive debugger prompt.
//!
//! Entered between instructions when the break signal fires (SIGINT, a
//! fatal emulation fault, or break-on-start). Continuing resumes from the
//! exact next instruction with no state loss.

use std::io::{self, Write};
use std::path::Path;

use hx20_core::cpu::hd6301::reg;
use hx20_core::mem::Memory;
use hx20_machines::Hx20;

/// What the main loop should do after the prompt returns.
pub enum Action {
    Continue,
    Step,
    Quit,
}

fn help() {
    println!("Debugger Commands:");
    println!("  q        - Quit");
    println!("  ? | h    - Help");
    println!("  c        - Continue");
    println!("  s        - Step");
    println!("  w        - Warp Mode Toggle");
    println!("  t        - Master MCU Trace");
    println!("  r        - Slave MCU Trace");
    println!("  m        - Master MCU RAM");
    println!("  n        - Slave MCU RAM");
    println!("  p        - Master MCU Ports");
    println!("  o        - Slave MCU Ports");
    println!("  x        - MCU Internals");
    println!("  v        - Variables");
    println!("  u        - SCI Trace");
    println!("  l <file> - Load file into RS-232                - Prior: LOAD\"COM0:(48N1F)\"");
    println!("  k <file> - Save file from RS-232                - After: SAVE\"COM0:(68N1F)\",A");
    println!("  g <file> - Load file into External Cassette In  - Prior: LOAD\"CAS1:\"");
    println!("  f <file> - Save file from External Cassette Out - After: SAVE\"CAS1:FILENAME\"");
}

fn port_dump_set(no: u8, direction: u8, value: u8) {
    for i in 0..8 {
        println!(
            "  P{}{} {}--{} {}",
            no,
            i,
            if (direction >> i) & 1 != 0 { ' ' } else { '<' },
            if (direction >> i) & 1 != 0 { '>' } else { ' ' },
            (value >> i) & 1
        );
    }
}

fn port_dump(mem: &Memory) {
    port_dump_set(1, mem.peek(reg::DDR_1), mem.peek(reg::PORT_1));
    port_dump_set(2, mem.peek(reg::DDR_2), mem.peek(reg::PORT_2));
    port_dump_set(3, mem.peek(reg::DDR_3), mem.peek(reg::PORT_3));
    port_dump_set(4, mem.peek(reg::DDR_4), mem.peek(reg::PORT_4));

    let tcsr = mem.peek(reg::TCSR);
    println!("  TCSR.OLVL : {}", tcsr & 1);
    println!("  TCSR.IEDG : {}", (tcsr >> 1) & 1);
    println!("  TCSR.ETOI : {}", (tcsr >> 2) & 1);
    println!("  TCSR.EOCI : {}", (tcsr >> 3) & 1);
    println!("  TCSR.EICI : {}", (tcsr >> 4) & 1);
    println!("  TCSR.TOF  : {}", (tcsr >> 5) & 1);
    println!("  TCSR.OCF  : {}", (tcsr >> 6) & 1);
    println!("  TCSR.ICF  : {}", (tcsr >> 7) & 1);

    let p3csr = mem.peek(reg::P3CSR);
    println!("  P3CSR.LATCH : {}", (p3csr >> 3) & 1);
    println!("  P3CSR.OSS   : {}", (p3csr >> 4) & 1);
    println!("  P3CSR.IS3I  : {}", (p3csr >> 6) & 1);
    println!("  P3CSR.IS3   : {}", (p3csr >> 7) & 1);

    let rmcr = mem.peek(reg::RMCR);
    println!("  RMCR.SS0 : {}", rmcr & 1);
    println!("  RMCR.SS1 : {}", (rmcr >> 1) & 1);
    println!("  RMCR.CC0 : {}", (rmcr >> 2) & 1);
    println!("  RMCR.CC1 : {}", (rmcr >> 3) & 1);

    let trcsr = mem.peek(reg::TRCSR);
    println!("  TRCSR.WU   : {}", trcsr & 1);
    println!("  TRCSR.TE   : {}", (trcsr >> 1) & 1);
    println!("  TRCSR.TIE  : {}", (trcsr >> 2) & 1);
    println!("  TRCSR.RE   : {}", (trcsr >> 3) & 1);
    println!("  TRCSR.RIE  : {}", (trcsr >> 4) & 1);
    println!("  TRCSR.TDRE : {}", (trcsr >> 5) & 1);
    println!("  TRCSR.ORFE : {}", (trcsr >> 6) & 1);
    println!("  TRCSR.RDRF : {}", (trcsr >> 7) & 1);

    let ram_ctrl = mem.peek(reg::RAM_CTRL);
    println!("  RAM.RAME : {}", (ram_ctrl >> 6) & 1);
    println!("  RAM.STBY : {}", (ram_ctrl >> 7) & 1);

    println!(
        "  FRC : 0x{:02x}{:02x}",
        mem.peek(reg::FRC_HIGH),
        mem.peek(reg::FRC_LOW)
    );
    println!(
        "  OCR : 0x{:02x}{:02x}",
        mem.peek(reg::OCR_HIGH),
        mem.peek(reg::OCR_LOW)
    );
    println!(
        "  ICR : 0x{:02x}{:02x}",
        mem.peek(reg::ICR_HIGH),
        mem.peek(reg::ICR_LOW)
    );
    println!("  RDR : 0x{:02x}", mem.peek(reg::RDR));
    println!("  TDR : 0x{:02x}", mem.peek(reg::TDR));
}

fn variable_ktb_dump(mem: &Memory, address: u16) {
    for i in 0..10u16 {
        let byte = mem.peek(address + i);
        let bits: String = (0..8).map(|b| if (byte >> b) & 1 != 0 { '1' } else { '0' }).collect();
        println!("    {bits}");
    }
}

/// Keyboard-handling firmware variables in master RAM.
fn variable_dump(mem: &Memory) {
    println!("Keyboard:");
    println!("  KSTKSZ: {}", mem.peek(0x140));
    println!("  KICNT1: {}", mem.peek(0x141));
    println!("  KICNT2: {}", mem.peek(0x142));
    println!(
        "  KICNTM: {}",
        (mem.peek(0x143) as u16) * 0x100 + mem.peek(0x144) as u16
    );
    println!("  NEWKTB:");
    variable_ktb_dump(mem, 0x145);
    println!("  OLDKTB:");
    variable_ktb_dump(mem, 0x14F);
    println!("  CHKKTB:");
    variable_ktb_dump(mem, 0x159);
    println!("  KYISAD: 0x{:02x}{:02x}", mem.peek(0x163), mem.peek(0x164));
    println!("  KYISFL: 0x{:02x}", mem.peek(0x165));
    println!("  KYISCN: {}", mem.peek(0x166));
    println!("  KYISPN: {}", mem.peek(0x167));
    println!("  STKCNT: {}", mem.peek(0x168));
    println!("  KEYMOD: 0x{:02x}", mem.peek(0x169));
    println!("  ONKFLG: 0x{:02x}", mem.peek(0x16A));
    println!("  KPRFLG: {}", mem.peek(0x16B));
    println!("  KEYRPT: {}", mem.peek(0x16C));
    println!("  CKEYRD: 0x{:02x}{:02x}", mem.peek(0x16D), mem.peek(0x16E));
    println!("  KYISTK:");
    for row in 0..2u16 {
        let keys: String = (0..9u16)
            .map(|i| format!("0x{:02x},", mem.peek(0x16F + row * 9 + i)))
            .collect();
        println!("    {keys}");
    }
}

/// Run the prompt until the user continues, steps or quits.
pub fn run(hx20: &mut Hx20, warp_mode: &mut bool) -> Action {
    let stdin = io::stdin();
    println!();

    loop {
        print!("{:04x}:{:04x}> ", hx20.master.counter, hx20.master.pc);
        let _ = io::stdout().flush();

        let mut input = String::new();
        match stdin.read_line(&mut input) {
            Ok(0) => return Action::Quit, // EOF
            Ok(_) => {}
            Err(_) => continue,
        }

        let mut words = input.split_whitespace();
        let Some(command) = words.next() else {
            continue;
        };
        let argument = words.next();

        match command.chars().next().unwrap_or(' ') {
            'q' => return Action::Quit,
            '?' | 'h' => help(),
            'c' => return Action::Continue,
            's' => return Action::Step,

            'w' => {
                *warp_mode = !*warp_mode;
                println!("Warp Mode: {}", if *warp_mode { "On" } else { "Off" });
            }

            't' => {
                println!("Master Trace:");
                let _ = hx20.master.trace_dump(&mut io::stdout());
            }
            'r' => {
                println!("Slave Trace:");
                let _ = hx20.slave.trace_dump(&mut io::stdout());
            }

            'm' => {
                println!("Master RAM:");
                let _ = hx20.master_mem.dump(&mut io::stdout(), 0x0000, 0x7FFF);
            }
            'n' => {
                println!("Slave RAM:");
                let _ = hx20.slave_mem.dump(&mut io::stdout(), 0x0000, 0x01FF);
            }

            'p' => {
                println!("Master Ports:");
                port_dump(&hx20.master_mem);
            }
            'o' => {
                println!("Slave Ports:");
                port_dump(&hx20.slave_mem);
            }

            'x' => {
                let _ = hx20.master.dump(&mut io::stdout());
                let _ = hx20.slave.dump(&mut io::stdout());
            }

            'v' => variable_dump(&hx20.master_mem),

            'u' => {
                let _ = hx20.sci_trace.dump(&mut io::stdout());
            }

            'l' => match argument {
                Some(file) => {
                    if let Err(e) = hx20.rs232.load_file(Path::new(file)) {
                        println!("Failed to load file into RS-232! {e}");
                    }
                }
                None => println!("Specify filename!"),
            },
            'k' => match argument {
                Some(file) => {
                    if let Err(e) = hx20.rs232.save_file(Path::new(file)) {
                        println!("Failed to save file from RS-232! {e}");
                    }
                }
                None => println!("Specify filename!"),
            },
            'g' => match argument {
                Some(file) => {
                    if let Err(e) = hx20.cassette.load_file(Path::new(file)) {
                        println!("Failed to load cassette file! {e}");
                    }
                }
                None => println!("Specify filename!"),
            },
            'f' => match argument {
                Some(file) => {
                    if let Err(e) = hx20.cassette.save_file(Path::new(file)) {
                        println!("Failed to save cassette file! {e}");
                    }
                }
                None => println!("Specify filename!"),
            },

            _ => {}
        }
    }
}
