//! Quadrature decoding for the rotary encoder.
//!
//! The A and B pins sit on different ports, and the MCU groups pin-change
//! interrupts by port, so [`EncoderDecoder::on_edge`] is registered against
//! every port vector that can fire for either pin. It samples both pins and
//! both changed flags on every call, so it gives the right answer whichever
//! vector invoked it, including one where neither pin actually changed.

use portable_atomic::{AtomicI8, Ordering};

use crate::critical::InterruptGuard;

/// One sample of the encoder pins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct QuadratureSample {
    /// Live level of pin A.
    pub a: bool,
    /// Live level of pin B.
    pub b: bool,
    /// Pin A changed since the flags were last cleared.
    pub a_changed: bool,
    /// Pin B changed since the flags were last cleared.
    pub b_changed: bool,
}

impl QuadratureSample {
    /// Packs the sample as `A B A_changed B_changed`, A in bit 3.
    pub const fn code(self) -> usize {
        (self.a as usize) << 3
            | (self.b as usize) << 2
            | (self.a_changed as usize) << 1
            | self.b_changed as usize
    }
}

/// Hardware access for the encoder pins.
pub trait QuadraturePins {
    /// Reads both pin levels and both changed flags.
    fn sample(&mut self) -> QuadratureSample;

    /// Clears both changed flags.
    fn clear_changed(&mut self);
}

/// Step for every `A B A_changed B_changed` code.
///
/// A single edge on A counts forward when A and B now differ, a single edge
/// on B counts forward when they now match. No edge, or both at once, is not
/// a valid single-edge transition and counts 0.
const TRANSITIONS: [i8; 16] = [
    0, 1, -1, 0, // A=0 B=0
    0, -1, 1, 0, // A=0 B=1
    0, -1, 1, 0, // A=1 B=0
    0, 1, -1, 0, // A=1 B=1
];

/// Returns the step a sample represents: `+1`, `-1` or `0`.
pub const fn step(sample: QuadratureSample) -> i8 {
    TRANSITIONS[sample.code()]
}

/// Accumulates encoder steps between main-loop reads.
///
/// `on_edge` is the only writer; the main loop reads and resets the delta with
/// interrupts masked. The delta wraps silently at the `i8` limits.
pub struct EncoderDecoder {
    delta: AtomicI8,
}

impl EncoderDecoder {
    pub const fn new() -> Self {
        Self {
            delta: AtomicI8::new(0),
        }
    }

    /// Pin-change handler, shared by every port vector covering A or B.
    pub fn on_edge<P: QuadraturePins>(&self, pins: &mut P) {
        let sample = pins.sample();
        pins.clear_changed();

        // Sole writer, and the main loop only resets with interrupts masked.
        let delta = self.delta.load(Ordering::Relaxed);
        self.delta
            .store(delta.wrapping_add(step(sample)), Ordering::Relaxed);
    }

    /// Returns the accumulated delta and resets it to zero.
    pub fn take_delta(&self, _masked: &InterruptGuard) -> i8 {
        let delta = self.delta.load(Ordering::Relaxed);
        self.delta.store(0, Ordering::Relaxed);
        delta
    }

    /// Returns the accumulated delta without resetting it.
    pub fn delta(&self) -> i8 {
        self.delta.load(Ordering::Relaxed)
    }
}

impl Default for EncoderDecoder {
    fn default() -> Self {
        Self::new()
    }
}
