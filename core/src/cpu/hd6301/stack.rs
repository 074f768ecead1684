//! Stack pushes/pulls and the subroutine/interrupt returns.
//!
//! The stack descends; pushes write then decrement, pulls increment then
//! read. The interrupt frame is PC, X, A, B, CCR from the top down; RTI
//! pops it in reverse.

use super::{CC_RESERVED, Hd6301};
use crate::mem::Memory;

impl Hd6301 {
    pub(crate) fn op_psha(&mut self, mem: &mut Memory) {
        self.trace_inherent("psha");
        let a = self.a;
        self.push(mem, a);
    }

    pub(crate) fn op_pshb(&mut self, mem: &mut Memory) {
        self.trace_inherent("pshb");
        let b = self.b;
        self.push(mem, b);
    }

    pub(crate) fn op_pshx(&mut self, mem: &mut Memory) {
        self.trace_inherent("pshx");
        let x = self.x;
        self.push(mem, x as u8);
        self.push(mem, (x >> 8) as u8);
    }

    pub(crate) fn op_pula(&mut self, mem: &mut Memory) {
        self.trace_inherent("pula");
        self.a = self.pull(mem);
    }

    pub(crate) fn op_pulb(&mut self, mem: &mut Memory) {
        self.trace_inherent("pulb");
        self.b = self.pull(mem);
    }

    pub(crate) fn op_pulx(&mut self, mem: &mut Memory) {
        self.trace_inherent("pulx");
        let high = self.pull(mem);
        let low = self.pull(mem);
        self.x = u16::from_be_bytes([high, low]);
    }

    pub(crate) fn op_rts(&mut self, mem: &mut Memory) {
        self.trace_inherent("rts");
        let high = self.pull(mem);
        let low = self.pull(mem);
        self.pc = u16::from_be_bytes([high, low]);
    }

    /// RTI: the exact inverse of interrupt entry.
    pub(crate) fn op_rti(&mut self, mem: &mut Memory) {
        self.trace_inherent("rti");
        self.cc = self.pull(mem) | CC_RESERVED;
        self.b = self.pull(mem);
        self.a = self.pull(mem);
        let x_high = self.pull(mem);
        let x_low = self.pull(mem);
        self.x = u16::from_be_bytes([x_high, x_low]);
        let pc_high = self.pull(mem);
        let pc_low = self.pull(mem);
        self.pc = u16::from_be_bytes([pc_high, pc_low]);
    }

    pub(crate) fn op_tsx(&mut self) {
        self.trace_inherent("tsx");
        self.x = self.sp.wrapping_add(1);
    }

    pub(crate) fn op_txs(&mut self) {
        self.trace_inherent("txs");
        self.sp = self.x.wrapping_sub(1);
    }

    pub(crate) fn op_ins(&mut self) {
        self.trace_inherent("ins");
        self.sp = self.sp.wrapping_add(1);
    }

    pub(crate) fn op_des(&mut self) {
        self.trace_inherent("des");
        self.sp = self.sp.wrapping_sub(1);
    }
}
