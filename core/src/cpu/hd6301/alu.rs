//! Addressing-mode plumbing shared by the ALU opcode groups.
//!
//! Each helper traces the instruction with its mode-specific operand
//! rendering, resolves the effective address, and hands the operand to a
//! small operation function. Operand order and effective-address arithmetic
//! follow the HD6301 encoding: direct is a zero-page byte, extended is a
//! big-endian word, indexed adds an unsigned byte to X, and the AIM/OIM/
//! EIM/TIM group takes its immediate byte before the address byte.

mod binary;
mod shift;
mod unary;
mod word;

use super::{CcFlag, Hd6301};
use crate::mem::Memory;

impl Hd6301 {
    /// N and Z from an 8-bit result with V cleared (loads, stores, logic).
    #[inline]
    pub(crate) fn flags_load8(&mut self, value: u8) {
        self.set_flag(CcFlag::N, value & 0x80 != 0);
        self.set_flag(CcFlag::Z, value == 0);
        self.set_flag(CcFlag::V, false);
    }

    /// N and Z from a 16-bit result with V cleared.
    #[inline]
    pub(crate) fn flags_load16(&mut self, value: u16) {
        self.set_flag(CcFlag::N, value & 0x8000 != 0);
        self.set_flag(CcFlag::Z, value == 0);
        self.set_flag(CcFlag::V, false);
    }

    // --- Effective addresses (operand already traced) ---

    #[inline]
    fn ea_dir(&mut self, mem: &mut Memory) -> u16 {
        self.fetch(mem) as u16
    }

    #[inline]
    fn ea_ext(&mut self, mem: &mut Memory) -> u16 {
        self.fetch16(mem)
    }

    #[inline]
    fn ea_idx(&mut self, mem: &mut Memory) -> u16 {
        (self.fetch(mem) as u16).wrapping_add(self.x)
    }

    // --- 8-bit ALU reads ---

    pub(crate) fn alu_imm(&mut self, mem: &mut Memory, name: &str, op: fn(&mut Self, u8)) {
        self.trace_op(name, format!("#{:02x}", mem.peek(self.pc)));
        let value = self.fetch(mem);
        op(self, value);
    }

    pub(crate) fn alu_dir(&mut self, mem: &mut Memory, name: &str, op: fn(&mut Self, u8)) {
        self.trace_op(name, format!("{:02x}", mem.peek(self.pc)));
        let address = self.ea_dir(mem);
        let value = self.mem_read(mem, address);
        op(self, value);
    }

    pub(crate) fn alu_idx(&mut self, mem: &mut Memory, name: &str, op: fn(&mut Self, u8)) {
        self.trace_op(name, format!("{:02x},x", mem.peek(self.pc)));
        let address = self.ea_idx(mem);
        let value = self.mem_read(mem, address);
        op(self, value);
    }

    pub(crate) fn alu_ext(&mut self, mem: &mut Memory, name: &str, op: fn(&mut Self, u8)) {
        self.trace_op(
            name,
            format!("{:02x}{:02x}", mem.peek(self.pc), mem.peek(self.pc.wrapping_add(1))),
        );
        let address = self.ea_ext(mem);
        let value = self.mem_read(mem, address);
        op(self, value);
    }

    // --- 16-bit ALU reads ---

    pub(crate) fn alu16_imm(&mut self, mem: &mut Memory, name: &str, op: fn(&mut Self, u16)) {
        self.trace_op(
            name,
            format!("#{:02x}{:02x}", mem.peek(self.pc), mem.peek(self.pc.wrapping_add(1))),
        );
        let value = self.fetch16(mem);
        op(self, value);
    }

    pub(crate) fn alu16_dir(&mut self, mem: &mut Memory, name: &str, op: fn(&mut Self, u16)) {
        self.trace_op(name, format!("{:02x}", mem.peek(self.pc)));
        let address = self.ea_dir(mem);
        let value = self.mem_read16(mem, address);
        op(self, value);
    }

    pub(crate) fn alu16_idx(&mut self, mem: &mut Memory, name: &str, op: fn(&mut Self, u16)) {
        self.trace_op(name, format!("{:02x},x", mem.peek(self.pc)));
        let address = self.ea_idx(mem);
        let value = self.mem_read16(mem, address);
        op(self, value);
    }

    pub(crate) fn alu16_ext(&mut self, mem: &mut Memory, name: &str, op: fn(&mut Self, u16)) {
        self.trace_op(
            name,
            format!("{:02x}{:02x}", mem.peek(self.pc), mem.peek(self.pc.wrapping_add(1))),
        );
        let address = self.ea_ext(mem);
        let value = self.mem_read16(mem, address);
        op(self, value);
    }

    // --- Stores ---

    fn store8(&mut self, mem: &mut Memory, address: u16, value: u8) {
        self.mem_write(mem, address, value);
        self.flags_load8(value);
    }

    pub(crate) fn store_dir(&mut self, mem: &mut Memory, name: &str, get: fn(&Self) -> u8) {
        self.trace_op(name, format!("{:02x}", mem.peek(self.pc)));
        let address = self.ea_dir(mem);
        self.store8(mem, address, get(self));
    }

    pub(crate) fn store_idx(&mut self, mem: &mut Memory, name: &str, get: fn(&Self) -> u8) {
        self.trace_op(name, format!("{:02x},x", mem.peek(self.pc)));
        let address = self.ea_idx(mem);
        self.store8(mem, address, get(self));
    }

    pub(crate) fn store_ext(&mut self, mem: &mut Memory, name: &str, get: fn(&Self) -> u8) {
        self.trace_op(
            name,
            format!("{:02x}{:02x}", mem.peek(self.pc), mem.peek(self.pc.wrapping_add(1))),
        );
        let address = self.ea_ext(mem);
        self.store8(mem, address, get(self));
    }

    fn store16(&mut self, mem: &mut Memory, address: u16, value: u16) {
        self.mem_write(mem, address, (value >> 8) as u8);
        self.mem_write(mem, address.wrapping_add(1), value as u8);
        self.flags_load16(value);
    }

    pub(crate) fn store16_dir(&mut self, mem: &mut Memory, name: &str, get: fn(&Self) -> u16) {
        self.trace_op(name, format!("{:02x}", mem.peek(self.pc)));
        let address = self.ea_dir(mem);
        self.store16(mem, address, get(self));
    }

    pub(crate) fn store16_idx(&mut self, mem: &mut Memory, name: &str, get: fn(&Self) -> u16) {
        self.trace_op(name, format!("{:02x},x", mem.peek(self.pc)));
        let address = self.ea_idx(mem);
        self.store16(mem, address, get(self));
    }

    pub(crate) fn store16_ext(&mut self, mem: &mut Memory, name: &str, get: fn(&Self) -> u16) {
        self.trace_op(
            name,
            format!("{:02x}{:02x}", mem.peek(self.pc), mem.peek(self.pc.wrapping_add(1))),
        );
        let address = self.ea_ext(mem);
        self.store16(mem, address, get(self));
    }

    // --- Read-modify-write ---

    pub(crate) fn rmw_idx(&mut self, mem: &mut Memory, name: &str, op: fn(&mut Self, u8) -> u8) {
        self.trace_op(name, format!("{:02x},x", mem.peek(self.pc)));
        let address = self.ea_idx(mem);
        let value = self.mem_read(mem, address);
        let result = op(self, value);
        self.mem_write(mem, address, result);
    }

    pub(crate) fn rmw_ext(&mut self, mem: &mut Memory, name: &str, op: fn(&mut Self, u8) -> u8) {
        self.trace_op(
            name,
            format!("{:02x}{:02x}", mem.peek(self.pc), mem.peek(self.pc.wrapping_add(1))),
        );
        let address = self.ea_ext(mem);
        let value = self.mem_read(mem, address);
        let result = op(self, value);
        self.mem_write(mem, address, result);
    }

    /// Inherent unary on accumulator A.
    pub(crate) fn unary_a(&mut self, name: &str, op: fn(&mut Self, u8) -> u8) {
        self.trace_inherent(name);
        let value = self.a;
        self.a = op(self, value);
    }

    /// Inherent unary on accumulator B.
    pub(crate) fn unary_b(&mut self, name: &str, op: fn(&mut Self, u8) -> u8) {
        self.trace_inherent(name);
        let value = self.b;
        self.b = op(self, value);
    }

    // --- AIM/OIM/EIM/TIM: immediate byte, then address byte ---

    pub(crate) fn imm_rmw_idx(&mut self, mem: &mut Memory, name: &str, op: fn(u8, u8) -> u8) {
        self.trace_op(
            name,
            format!("#{:02x}, {:02x},x", mem.peek(self.pc), mem.peek(self.pc.wrapping_add(1))),
        );
        let imm = self.fetch(mem);
        let address = self.ea_idx(mem);
        let result = op(imm, self.mem_read(mem, address));
        self.mem_write(mem, address, result);
        self.flags_load8(result);
    }

    pub(crate) fn imm_rmw_dir(&mut self, mem: &mut Memory, name: &str, op: fn(u8, u8) -> u8) {
        self.trace_op(
            name,
            format!("#{:02x}, {:02x}", mem.peek(self.pc), mem.peek(self.pc.wrapping_add(1))),
        );
        let imm = self.fetch(mem);
        let address = self.ea_dir(mem);
        let result = op(imm, self.mem_read(mem, address));
        self.mem_write(mem, address, result);
        self.flags_load8(result);
    }

    pub(crate) fn tim_idx(&mut self, mem: &mut Memory) {
        self.trace_op(
            "tim",
            format!("#{:02x}, {:02x},x", mem.peek(self.pc), mem.peek(self.pc.wrapping_add(1))),
        );
        let imm = self.fetch(mem);
        let address = self.ea_idx(mem);
        let result = imm & self.mem_read(mem, address);
        self.flags_load8(result);
    }

    pub(crate) fn tim_dir(&mut self, mem: &mut Memory) {
        self.trace_op(
            "tim",
            format!("#{:02x}, {:02x}", mem.peek(self.pc), mem.peek(self.pc.wrapping_add(1))),
        );
        let imm = self.fetch(mem);
        let address = self.ea_dir(mem);
        let result = imm & self.mem_read(mem, address);
        self.flags_load8(result);
    }

    // --- TST and CLR memory forms (no modify / no read) ---

    pub(crate) fn tst_idx(&mut self, mem: &mut Memory) {
        self.trace_op("tst", format!("{:02x},x", mem.peek(self.pc)));
        let address = self.ea_idx(mem);
        let value = self.mem_read(mem, address);
        self.tst8(value);
    }

    pub(crate) fn tst_ext(&mut self, mem: &mut Memory) {
        self.trace_op(
            "tst",
            format!("{:02x}{:02x}", mem.peek(self.pc), mem.peek(self.pc.wrapping_add(1))),
        );
        let address = self.ea_ext(mem);
        let value = self.mem_read(mem, address);
        self.tst8(value);
    }

    pub(crate) fn clr_idx(&mut self, mem: &mut Memory) {
        self.trace_op("clr", format!("{:02x},x", mem.peek(self.pc)));
        let address = self.ea_idx(mem);
        self.mem_write(mem, address, 0);
        self.clr_flags();
    }

    pub(crate) fn clr_ext(&mut self, mem: &mut Memory) {
        self.trace_op(
            "clr",
            format!("{:02x}{:02x}", mem.peek(self.pc), mem.peek(self.pc.wrapping_add(1))),
        );
        let address = self.ea_ext(mem);
        self.mem_write(mem, address, 0);
        self.clr_flags();
    }
}
