//! Timer-driven charlieplex refresh.
//!
//! Each timer period draws one group. The overflow interrupt moves to the next
//! group: it configures the anode, applies the group's first item and arms the
//! compare match. Each compare interrupt applies the next item, releasing the
//! LEDs whose on-time has run out, until the sentinel is reached.
//!
//! A newly published [`ScheduleSet`] is only adopted at the start of group 0,
//! so a full cycle is always drawn from a single set.

use portable_atomic::{AtomicU8, Ordering};

use crate::config::PORT_COUNT;
use crate::mailbox::Mailbox;
use crate::schedule::{SENTINEL_CMP, ScheduleSet, empty_set};

/// Hardware access for the LED port registers.
pub trait LedPorts {
    /// Writes the output level image of every port.
    fn set_levels(&mut self, levels: &[u8; PORT_COUNT]);

    /// Writes the direction image of every port; set bits are outputs.
    fn set_outputs(&mut self, outputs: &[u8; PORT_COUNT]);
}

/// Hardware access for the refresh timer.
pub trait LedTimer {
    /// Stops the timer and clears its count.
    fn stop_and_reset(&mut self);

    /// Arms the compare match at `value`.
    fn set_compare(&mut self, value: u8);

    /// Disarms the compare match.
    fn disable_compare(&mut self);

    fn start(&mut self);
}

/// Full refresh cycles completed, wrapping.
///
/// Advanced by the overflow handler at the start of every cycle; the main loop
/// uses it to run the style once per cycle.
#[derive(Debug, Default)]
pub struct CycleCounter(AtomicU8);

impl CycleCounter {
    pub const fn new() -> Self {
        Self(AtomicU8::new(0))
    }

    pub fn get(&self) -> u8 {
        self.0.load(Ordering::Relaxed)
    }

    pub(crate) fn advance(&self) {
        // Single writer: the overflow interrupt.
        let cycles = self.0.load(Ordering::Relaxed);
        self.0.store(cycles.wrapping_add(1), Ordering::Relaxed);
    }
}

/// Interrupt-side state of the refresh.
///
/// Owns the active schedule set; only the timer interrupts touch it.
pub struct TimerCycleDriver<const PINS: usize> {
    active: ScheduleSet<PINS>,
    group: usize,
    drawing: usize,
    item: usize,
}

impl<const PINS: usize> TimerCycleDriver<PINS> {
    /// A driver with every group dark, about to start group 0.
    ///
    /// Fails to compile for fewer than two pins.
    pub const fn new() -> Self {
        const { assert!(PINS >= 2, "a charlieplex needs at least two pins") };
        Self {
            active: empty_set(),
            group: 0,
            drawing: 0,
            item: 0,
        }
    }

    /// The set currently being drawn.
    pub fn active(&self) -> &ScheduleSet<PINS> {
        &self.active
    }

    /// Group the next overflow will draw.
    pub fn next_group(&self) -> usize {
        self.group
    }

    /// Group being drawn in the current period.
    pub fn drawing(&self) -> usize {
        self.drawing
    }

    /// Index of the item currently applied.
    pub fn item(&self) -> usize {
        self.item
    }

    /// Timer overflow handler: starts the next group's period.
    pub fn on_overflow<P: LedPorts, T: LedTimer>(
        &mut self,
        ports: &mut P,
        timer: &mut T,
        pending: &Mailbox<ScheduleSet<PINS>>,
        cycles: &CycleCounter,
    ) {
        timer.stop_and_reset();

        if self.group == 0 {
            cycles.advance();
            if pending.take_with(|set| self.active.clone_from(set)) {
                #[cfg(feature = "defmt")]
                defmt::trace!("driver: adopted new schedule set");
            }
        }

        let schedule = &self.active[self.group];
        ports.set_levels(&schedule.high_pin());
        ports.set_outputs(&schedule.outputs(0));
        program_compare(timer, schedule.item(0).next_cmp);

        self.drawing = self.group;
        self.item = 0;
        self.group = (self.group + 1) % PINS;

        timer.start();
    }

    /// Timer compare handler: applies the drawing group's next item.
    pub fn on_compare<P: LedPorts, T: LedTimer>(&mut self, ports: &mut P, timer: &mut T) {
        let schedule = &self.active[self.drawing];
        if schedule.item(self.item).is_sentinel() {
            timer.disable_compare();
            return;
        }

        self.item += 1;
        ports.set_outputs(&schedule.outputs(self.item));
        program_compare(timer, schedule.item(self.item).next_cmp);
    }
}

impl<const PINS: usize> Default for TimerCycleDriver<PINS> {
    fn default() -> Self {
        Self::new()
    }
}

fn program_compare<T: LedTimer>(timer: &mut T, next_cmp: u8) {
    if next_cmp == SENTINEL_CMP {
        timer.disable_compare();
    } else {
        timer.set_compare(next_cmp);
    }
}
