//! External high-speed serial bridge.
//!
//! When master P22 is low the master's SCI is detached from the slave and
//! bridged to a host TTY instead. The bridge drains the master's transmit
//! shift register into a bounded TX FIFO every tick, and every 128 sync
//! cycles (8 bits at 38,400 baud) moves one byte in each direction: RX FIFO
//! to the master's SCI receiver, TX FIFO to the host port. One non-blocking
//! port read per tick keeps the RX FIFO fed.

use std::collections::VecDeque;

use crate::cpu::Hd6301;
use crate::mem::Memory;
use crate::trace::{SciDirection, SciTrace};

pub const RX_FIFO_SIZE: usize = 16384;
pub const TX_FIFO_SIZE: usize = 1024;

/// Host-side byte port. Both directions are non-blocking: `read_byte`
/// returns `None` when nothing is pending, `write_byte` returns false when
/// the port cannot take the byte right now (it is retried next slot).
pub trait SerialPort {
    fn read_byte(&mut self) -> Option<u8>;
    fn write_byte(&mut self, byte: u8) -> bool;
}

pub struct SerialBridge {
    port: Box<dyn SerialPort>,
    rx_fifo: VecDeque<u8>,
    tx_fifo: VecDeque<u8>,
}

impl SerialBridge {
    pub fn new(port: Box<dyn SerialPort>) -> Self {
        Self {
            port,
            rx_fifo: VecDeque::with_capacity(RX_FIFO_SIZE),
            tx_fifo: VecDeque::with_capacity(TX_FIFO_SIZE),
        }
    }

    /// One bus tick of bridge traffic.
    pub fn step(&mut self, master: &mut Hd6301, master_mem: &mut Memory, sci_trace: &mut SciTrace) {
        if let Some(byte) = master.transmit_shift_register.take() {
            sci_trace.add(SciDirection::MasterToExternal, byte, master.counter);
            if self.tx_fifo.len() < TX_FIFO_SIZE {
                self.tx_fifo.push_back(byte);
            }
        }

        // One byte each way per 8-bit frame at 38,400 baud.
        if master.sync_counter % 128 == 0 {
            if let Some(byte) = self.rx_fifo.pop_front() {
                sci_trace.add(SciDirection::ExternalToMaster, byte, master.counter);
                master.sci_receive(master_mem, byte);
            }

            if let Some(byte) = self.tx_fifo.front().copied() {
                if self.port.write_byte(byte) {
                    self.tx_fifo.pop_front();
                }
            }
        }

        if let Some(byte) = self.port.read_byte() {
            if self.rx_fifo.len() < RX_FIFO_SIZE {
                self.rx_fifo.push_back(byte);
            }
        }
    }
}
