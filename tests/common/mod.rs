//! Shared test infrastructure for charlie-ring integration tests

#![allow(dead_code)] // Items used across multiple test files; Rust analyzes per-file

use charlie_ring::{
    ButtonPin, Device, EncoderDecoder, I2cSlaveProtocol, I2cTarget, LedPorts, LedTimer,
    PORT_COUNT, QuadraturePins, QuadratureSample, TargetStatus,
};

/// Device wired as `DEMO_TRIANGLE`.
pub type DemoDevice = Device<3, 6>;

// ============================================================================
// Mock I2C Slave
// ============================================================================

/// Mock slave peripheral: one scripted event per interrupt
#[derive(Default)]
pub struct MockI2cBus {
    status: TargetStatus,
    received: u8,
    last_sent: Option<u8>,
    sent: heapless::Vec<u8, 64>,
    stops_acknowledged: usize,
}

impl MockI2cBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> &[u8] {
        &self.sent
    }

    pub fn stops_acknowledged(&self) -> usize {
        self.stops_acknowledged
    }
}

impl I2cTarget for MockI2cBus {
    fn status(&mut self) -> TargetStatus {
        self.status
    }

    fn read_data(&mut self) -> u8 {
        self.received
    }

    fn write_data(&mut self, byte: u8) {
        self.last_sent = Some(byte);
        let _ = self.sent.push(byte);
    }

    fn acknowledge_stop(&mut self) {
        self.stops_acknowledged += 1;
        self.status.stop = false;
    }
}

/// Plays the host side of I2C transactions against a device
pub struct Host {
    pub protocol: I2cSlaveProtocol,
    pub bus: MockI2cBus,
}

impl Host {
    pub fn new() -> Self {
        Self {
            protocol: I2cSlaveProtocol::new(),
            bus: MockI2cBus::new(),
        }
    }

    /// Host writes `bytes` without ending the transaction
    pub fn write<const PINS: usize, const LEDS: usize>(
        &mut self,
        device: &Device<PINS, LEDS>,
        bytes: &[u8],
    ) {
        for &byte in bytes {
            self.bus.status = TargetStatus {
                data: true,
                ..TargetStatus::default()
            };
            self.bus.received = byte;
            device.on_i2c(&mut self.protocol, &mut self.bus);
        }
    }

    /// Host reads `count` bytes without ending the transaction
    pub fn read<const PINS: usize, const LEDS: usize>(
        &mut self,
        device: &Device<PINS, LEDS>,
        count: usize,
    ) -> heapless::Vec<u8, 64> {
        let mut bytes = heapless::Vec::new();
        for _ in 0..count {
            self.bus.status = TargetStatus {
                data: true,
                host_reads: true,
                ..TargetStatus::default()
            };
            device.on_i2c(&mut self.protocol, &mut self.bus);
            let _ = bytes.push(self.bus.last_sent.take().expect("slave sent a byte"));
        }
        bytes
    }

    /// Host issues START (or repeated START) and the slave address matches
    pub fn start<const PINS: usize, const LEDS: usize>(&mut self, device: &Device<PINS, LEDS>) {
        self.bus.status = TargetStatus {
            start: true,
            ..TargetStatus::default()
        };
        device.on_i2c(&mut self.protocol, &mut self.bus);
    }

    /// Host issues STOP
    pub fn stop<const PINS: usize, const LEDS: usize>(&mut self, device: &Device<PINS, LEDS>) {
        self.bus.status = TargetStatus {
            stop: true,
            ..TargetStatus::default()
        };
        device.on_i2c(&mut self.protocol, &mut self.bus);
    }

    /// START, offset byte, data bytes, STOP
    pub fn write_registers<const PINS: usize, const LEDS: usize>(
        &mut self,
        device: &Device<PINS, LEDS>,
        offset: u8,
        data: &[u8],
    ) {
        self.start(device);
        self.write(device, &[offset]);
        self.write(device, data);
        self.stop(device);
    }

    /// START, offset byte, repeated START, `count` reads, STOP
    pub fn read_registers<const PINS: usize, const LEDS: usize>(
        &mut self,
        device: &Device<PINS, LEDS>,
        offset: u8,
        count: usize,
    ) -> heapless::Vec<u8, 64> {
        self.start(device);
        self.write(device, &[offset]);
        self.start(device);
        let bytes = self.read(device, count);
        self.stop(device);
        bytes
    }
}

// ============================================================================
// Mock Encoder Pins
// ============================================================================

/// Mock encoder pins with latched changed flags
#[derive(Default)]
pub struct MockPins {
    a: bool,
    b: bool,
    a_changed: bool,
    b_changed: bool,
}

impl MockPins {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the pins to `(a, b)`, latching the changed flags
    pub fn set(&mut self, a: bool, b: bool) {
        self.a_changed |= a != self.a;
        self.b_changed |= b != self.b;
        self.a = a;
        self.b = b;
    }

    /// Moves the pins and runs the edge handler, as the MCU would
    pub fn drive(&mut self, decoder: &EncoderDecoder, a: bool, b: bool) {
        self.set(a, b);
        decoder.on_edge(self);
    }

    /// Drives one `(A, B)` state per step
    pub fn drive_all(&mut self, decoder: &EncoderDecoder, states: &[(u8, u8)]) {
        for &(a, b) in states {
            self.drive(decoder, a != 0, b != 0);
        }
    }
}

impl QuadraturePins for MockPins {
    fn sample(&mut self) -> QuadratureSample {
        QuadratureSample {
            a: self.a,
            b: self.b,
            a_changed: self.a_changed,
            b_changed: self.b_changed,
        }
    }

    fn clear_changed(&mut self) {
        self.a_changed = false;
        self.b_changed = false;
    }
}

/// One full forward quadrature cycle, starting after (0,0)
pub const FORWARD_CYCLE: [(u8, u8); 4] = [(1, 0), (1, 1), (0, 1), (0, 0)];

/// One full backward quadrature cycle, starting after (0,0)
pub const BACKWARD_CYCLE: [(u8, u8); 4] = [(0, 1), (1, 1), (1, 0), (0, 0)];

// ============================================================================
// Mock Button
// ============================================================================

#[derive(Default)]
pub struct MockButton {
    pub held: bool,
}

impl ButtonPin for MockButton {
    fn is_held(&mut self) -> bool {
        self.held
    }
}

// ============================================================================
// Mock LED Ports and Timer
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortWrite {
    Levels([u8; PORT_COUNT]),
    Outputs([u8; PORT_COUNT]),
}

/// Mock port registers that record every write
#[derive(Default)]
pub struct MockPorts {
    pub levels: [u8; PORT_COUNT],
    pub outputs: [u8; PORT_COUNT],
    history: heapless::Vec<PortWrite, 128>,
}

impl MockPorts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> &[PortWrite] {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Pins currently driven low: outputs whose level is 0
    pub fn sinking(&self) -> [u8; PORT_COUNT] {
        core::array::from_fn(|port| self.outputs[port] & !self.levels[port])
    }
}

impl LedPorts for MockPorts {
    fn set_levels(&mut self, levels: &[u8; PORT_COUNT]) {
        self.levels = *levels;
        let _ = self.history.push(PortWrite::Levels(*levels));
    }

    fn set_outputs(&mut self, outputs: &[u8; PORT_COUNT]) {
        self.outputs = *outputs;
        let _ = self.history.push(PortWrite::Outputs(*outputs));
    }
}

/// Mock timer tracking the armed compare value
#[derive(Default)]
pub struct MockTimer {
    pub running: bool,
    pub compare: Option<u8>,
    pub resets: usize,
}

impl MockTimer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LedTimer for MockTimer {
    fn stop_and_reset(&mut self) {
        self.running = false;
        self.resets += 1;
    }

    fn set_compare(&mut self, value: u8) {
        self.compare = Some(value);
    }

    fn disable_compare(&mut self) {
        self.compare = None;
    }

    fn start(&mut self) {
        self.running = true;
    }
}
