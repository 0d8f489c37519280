//! I2C slave protocol for the register file.
//!
//! The host selects a starting offset with the first byte it writes after a
//! START; every further byte in the transaction is read or written at the next
//! offset, wrapping at the end of the register file. A read that is not
//! preceded by an offset byte continues where the last transaction left off.
//!
//! The engine never NACKs. Out-of-range offsets wrap, writes to read-only
//! bytes are dropped, and a malformed transaction is forgotten at the next
//! START or STOP. A repeated START ends the previous transfer the same way a
//! STOP does, so the next written byte is an offset again.
//!
//! `buffered_counter` is transactional: it is loaded from the authoritative
//! [`Counter`] when a transaction starts, and written back when the transfer
//! ends only if the host wrote one of its bytes.

use crate::registers::{Counter, Field, RegisterFile, STATUS_OFFSET};

/// Slave peripheral status sampled at the top of the interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TargetStatus {
    /// The slave was addressed after a START or repeated START.
    pub start: bool,
    /// A data byte was received, or one is wanted.
    pub data: bool,
    /// Direction of the data event: the host is reading.
    pub host_reads: bool,
    /// The host issued a STOP.
    pub stop: bool,
}

/// Hardware access for the I2C slave peripheral.
pub trait I2cTarget {
    /// Samples the interrupt status.
    fn status(&mut self) -> TargetStatus;

    /// Takes the byte the host wrote.
    fn read_data(&mut self) -> u8;

    /// Hands the host the byte it asked for.
    fn write_data(&mut self, byte: u8);

    /// Clears the STOP condition.
    fn acknowledge_stop(&mut self);
}

/// Transfer state between interrupts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferState {
    /// No transfer open since the last START or STOP.
    Idle,
    /// The offset byte has been received.
    Addressed,
    /// Data bytes are flowing.
    Streaming,
}

/// Interrupt-driven register access for the host.
#[derive(Debug)]
pub struct I2cSlaveProtocol {
    state: TransferState,
    offset: usize,
    counter_touched: bool,
}

impl I2cSlaveProtocol {
    pub const fn new() -> Self {
        Self {
            state: TransferState::Idle,
            offset: 0,
            counter_touched: false,
        }
    }

    pub fn state(&self) -> TransferState {
        self.state
    }

    /// Offset the next data byte will use.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Slave interrupt handler.
    pub fn on_interrupt<B: I2cTarget, const LEDS: usize>(
        &mut self,
        bus: &mut B,
        registers: &RegisterFile<LEDS>,
        counter: &Counter,
    ) {
        let status = bus.status();

        if status.start {
            self.on_start(registers, counter);
        }

        if status.data {
            if status.host_reads {
                let byte = self.on_read(registers, counter);
                bus.write_data(byte);
            } else {
                let byte = bus.read_data();
                self.on_write(byte, registers, counter);
            }
        }

        if status.stop {
            self.on_stop(registers, counter);
            bus.acknowledge_stop();
        }
    }

    /// Handles a byte written by the host.
    pub fn on_write<const LEDS: usize>(
        &mut self,
        byte: u8,
        registers: &RegisterFile<LEDS>,
        counter: &Counter,
    ) {
        if self.state == TransferState::Idle {
            self.begin(registers, counter);
            self.offset = byte as usize % RegisterFile::<LEDS>::SIZE;
            self.state = TransferState::Addressed;
            return;
        }

        if registers.write_byte(self.offset, byte) == Some(Field::BufferedCounter) {
            self.counter_touched = true;
        }
        self.advance::<LEDS>();
    }

    /// Produces the next byte the host reads.
    pub fn on_read<const LEDS: usize>(
        &mut self,
        registers: &RegisterFile<LEDS>,
        counter: &Counter,
    ) -> u8 {
        if self.state == TransferState::Idle {
            self.begin(registers, counter);
        }

        let byte = if self.offset == STATUS_OFFSET {
            registers.read_status_clearing().bits()
        } else {
            registers.read_byte(self.offset)
        };
        self.advance::<LEDS>();
        byte
    }

    /// Address match after a START or repeated START.
    ///
    /// Closes any transfer still open, so the next written byte selects the
    /// offset.
    pub fn on_start<const LEDS: usize>(&mut self, registers: &RegisterFile<LEDS>, counter: &Counter) {
        if self.state != TransferState::Idle {
            self.on_stop(registers, counter);
        }
    }

    /// Ends the transaction, committing a host-written counter.
    pub fn on_stop<const LEDS: usize>(&mut self, registers: &RegisterFile<LEDS>, counter: &Counter) {
        if self.counter_touched {
            let value = registers.buffered_counter();
            counter.set(value);

            #[cfg(feature = "defmt")]
            defmt::debug!("i2c: host set counter to {}", value);
        }
        self.counter_touched = false;
        self.state = TransferState::Idle;
    }

    fn begin<const LEDS: usize>(&mut self, registers: &RegisterFile<LEDS>, counter: &Counter) {
        registers.set_buffered_counter(counter.get());
        self.counter_touched = false;
    }

    fn advance<const LEDS: usize>(&mut self) {
        self.offset = (self.offset + 1) % RegisterFile::<LEDS>::SIZE;
        self.state = TransferState::Streaming;
    }
}

impl Default for I2cSlaveProtocol {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_byte_wraps_modulo_size() {
        let registers = RegisterFile::<6>::new();
        let counter = Counter::new(0);
        let mut protocol = I2cSlaveProtocol::new();

        protocol.on_write(0x19 + 3, &registers, &counter);

        assert_eq!(protocol.state(), TransferState::Addressed);
        assert_eq!(protocol.offset(), 3);
    }

    #[test]
    fn offset_wraps_after_last_byte() {
        let registers = RegisterFile::<6>::new();
        let counter = Counter::new(0);
        let mut protocol = I2cSlaveProtocol::new();

        protocol.on_write(0x18, &registers, &counter);
        protocol.on_write(0xAB, &registers, &counter);

        assert_eq!(registers.led_level(5), 0xAB);
        assert_eq!(protocol.offset(), 0);
        assert_eq!(protocol.state(), TransferState::Streaming);
    }

    #[test]
    fn restart_commits_counter_and_expects_new_offset() {
        let registers = RegisterFile::<6>::new();
        let counter = Counter::new(0);
        let mut protocol = I2cSlaveProtocol::new();

        protocol.on_write(0x00, &registers, &counter);
        protocol.on_write(0x2A, &registers, &counter);
        protocol.on_start(&registers, &counter);

        assert_eq!(counter.get(), 0x2A);
        assert_eq!(protocol.state(), TransferState::Idle);

        protocol.on_write(0x10, &registers, &counter);
        assert_eq!(protocol.state(), TransferState::Addressed);
        assert_eq!(protocol.offset(), 0x10);
    }

    #[test]
    fn stop_returns_to_idle_without_moving_offset() {
        let registers = RegisterFile::<6>::new();
        let counter = Counter::new(0);
        let mut protocol = I2cSlaveProtocol::new();

        protocol.on_write(0x08, &registers, &counter);
        protocol.on_write(0x01, &registers, &counter);
        protocol.on_stop(&registers, &counter);

        assert_eq!(protocol.state(), TransferState::Idle);
        assert_eq!(protocol.offset(), 0x09);
    }
}
