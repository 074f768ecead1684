//! Jump and jump-to-subroutine forms. Loads and stores proper live in the
//! addressing helpers; these are the control-transfer memory operations.

use super::Hd6301;
use crate::mem::Memory;

impl Hd6301 {
    pub(crate) fn op_jmp_idx(&mut self, mem: &mut Memory) {
        self.trace_op("jmp", format!("{:02x},x", mem.peek(self.pc)));
        let address = (self.fetch(mem) as u16).wrapping_add(self.x);
        self.pc = address;
    }

    pub(crate) fn op_jmp_ext(&mut self, mem: &mut Memory) {
        self.trace_op(
            "jmp",
            format!("{:02x}{:02x}", mem.peek(self.pc), mem.peek(self.pc.wrapping_add(1))),
        );
        let address = self.fetch16(mem);
        self.pc = address;
    }

    fn jsr(&mut self, mem: &mut Memory, address: u16) {
        self.push(mem, self.pc as u8);
        self.push(mem, (self.pc >> 8) as u8);
        self.pc = address;
    }

    pub(crate) fn op_jsr_dir(&mut self, mem: &mut Memory) {
        self.trace_op("jsr", format!("{:02x}", mem.peek(self.pc)));
        let address = self.fetch(mem) as u16;
        self.jsr(mem, address);
    }

    pub(crate) fn op_jsr_idx(&mut self, mem: &mut Memory) {
        self.trace_op("jsr", format!("{:02x},x", mem.peek(self.pc)));
        let address = (self.fetch(mem) as u16).wrapping_add(self.x);
        self.jsr(mem, address);
    }

    pub(crate) fn op_jsr_ext(&mut self, mem: &mut Memory) {
        self.trace_op(
            "jsr",
            format!("{:02x}{:02x}", mem.peek(self.pc), mem.peek(self.pc.wrapping_add(1))),
        );
        let address = self.fetch16(mem);
        self.jsr(mem, address);
    }
}
