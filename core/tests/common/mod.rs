use std::sync::Arc;

use hx20_core::cpu::hd6301::{Hd6301, vector};
use hx20_core::mem::{Memory, RAM_MAX_DEFAULT};
use hx20_core::signal::BreakSignal;

/// Program origin used by the tests.
pub const ORIGIN: u16 = 0x1000;

/// Fresh CPU and memory, reset through a vector pointing at [`ORIGIN`].
pub fn setup() -> (Hd6301, Memory, Arc<BreakSignal>) {
    let signal = Arc::new(BreakSignal::new());
    let mut mem = Memory::new(RAM_MAX_DEFAULT);
    mem.write_area(vector::RESET.1, &ORIGIN.to_be_bytes());
    let mut cpu = Hd6301::new(0, Arc::clone(&signal));
    cpu.reset(&mut mem);
    (cpu, mem, signal)
}

#[allow(dead_code)]
pub fn step_n(cpu: &mut Hd6301, mem: &mut Memory, n: usize) {
    for _ in 0..n {
        cpu.step(mem);
    }
}
